#![allow(dead_code)]

use async_trait::async_trait;
use gitvault_client::gitvault_core::models::Principal;
use gitvault_client::gitvault_core::VaultError;
use gitvault_client::services::{
    ApiRequest, ApiResponse, MemoryCredentialStore, StoredSession, Transport,
};
use http::StatusCode;
use secrecy::{ExposeSecret, Secret};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const STALE_TOKEN: &str = "stale-access";
pub const FRESH_TOKEN: &str = "fresh-access";

type Handler = Box<dyn Fn(&ApiRequest) -> Result<ApiResponse, VaultError> + Send + Sync>;

/// Scripted transport. Calls are recorded before any configured delay so
/// tests can observe in-flight requests.
pub struct MockTransport {
    handler: Handler,
    delays: HashMap<String, Duration>,
    calls: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    pub fn new(
        handler: impl Fn(&ApiRequest) -> Result<ApiResponse, VaultError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            delays: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, path: &str, delay: Duration) -> Self {
        self.delays.insert(path.to_string(), delay);
        self
    }

    pub fn calls(&self) -> Vec<ApiRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.calls().iter().filter(|c| c.path == path).count()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, VaultError> {
        self.calls.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delays.get(&request.path) {
            tokio::time::sleep(*delay).await;
        }
        (self.handler)(&request)
    }
}

pub fn ok(data: Value) -> Result<ApiResponse, VaultError> {
    Ok(ApiResponse::json(
        StatusCode::OK,
        &json!({"statusCode": 200, "data": data, "message": "Success", "success": true}),
    ))
}

pub fn fail(status: u16, message: &str) -> Result<ApiResponse, VaultError> {
    let status = StatusCode::from_u16(status).unwrap();
    Ok(ApiResponse::json(
        status,
        &json!({"statusCode": status.as_u16(), "data": null, "message": message, "success": false}),
    ))
}

pub fn bearer(request: &ApiRequest) -> Option<String> {
    request.bearer.as_ref().map(|b| b.expose_secret().clone())
}

pub fn principal(id: &str) -> Principal {
    Principal {
        id: id.to_string(),
        username: id.to_string(),
        email: format!("{}@example.com", id),
    }
}

pub fn signed_in_store(principal_id: &str, token: &str) -> Arc<MemoryCredentialStore> {
    Arc::new(MemoryCredentialStore::with_session(StoredSession {
        principal: principal(principal_id),
        access_token: Secret::new(token.to_string()),
    }))
}

/// Repository document as the API returns it.
pub fn repo_json(id: &str, owner: &str, visibility: &str, grants: &[(&str, &str, &str)]) -> Value {
    let collaborators: Vec<Value> = grants
        .iter()
        .map(|(grant_id, user, role)| json!({"_id": grant_id, "user": {"_id": user}, "role": role}))
        .collect();
    json!({
        "_id": id,
        "name": format!("{}-name", id),
        "visibility": visibility,
        "owner": {"_id": owner, "username": owner},
        "collaborators": collaborators,
        "updatedAt": "2025-06-01T00:00:00Z"
    })
}
