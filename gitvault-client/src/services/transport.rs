//! Transport collaborator: sends one HTTP request and reports the status.
//!
//! Status codes are never turned into errors here; only connection-level
//! failures are. Interpreting 401s is the session manager's job.

use async_trait::async_trait;
use gitvault_core::observability::{current_traceparent, REQUEST_ID_HEADER, TRACEPARENT_HEADER};
use gitvault_core::VaultError;
use http::{Method, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use crate::config::ApiSettings;

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<serde_json::Value>,
    pub bearer: Option<Secret<String>>,
    /// Shared by the first attempt and its retry.
    pub request_id: String,
    /// Whether a 401 may trigger credential renewal.
    pub renewable: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            bearer: None,
            request_id: uuid::Uuid::new_v4().to_string(),
            renewable: true,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(Method::POST, path).with_json(body)
    }

    pub fn put(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(Method::PUT, path).with_json(body)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Auth endpoints opt out: a 401 there is a real answer, not an expired credential.
    pub fn without_renewal(mut self) -> Self {
        self.renewable = false;
        self
    }
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

/// Server envelope: `{ statusCode, data, message, success }`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: Vec<u8>) -> Self {
        Self { status, body }
    }

    pub fn json(status: StatusCode, value: &serde_json::Value) -> Self {
        Self {
            status,
            body: value.to_string().into_bytes(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Error for a non-success response, carrying the server's message when present.
    pub fn error(&self) -> VaultError {
        let message = serde_json::from_slice::<ErrorBody>(&self.body)
            .ok()
            .and_then(|b| b.message)
            .unwrap_or_else(|| {
                self.status
                    .canonical_reason()
                    .unwrap_or("Something went wrong")
                    .to_string()
            });
        VaultError::from_status(self.status.as_u16(), message)
    }

    /// Unwrap the envelope's `data`, or map the status onto the error taxonomy.
    pub fn into_data<T: DeserializeOwned>(self) -> Result<T, VaultError> {
        if !self.is_success() {
            return Err(self.error());
        }
        self.data()
    }

    /// Parse the envelope's `data` without looking at the status.
    pub fn data<T: DeserializeOwned>(&self) -> Result<T, VaultError> {
        let envelope: Envelope<T> = serde_json::from_slice(&self.body)?;
        Ok(envelope.data)
    }

    pub fn into_unit(self) -> Result<(), VaultError> {
        if self.is_success() {
            Ok(())
        } else {
            Err(self.error())
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, VaultError>;
}

/// reqwest-backed transport. Its cookie jar is the only place the refresh
/// cookie lives; it is never written to disk.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(settings: &ApiSettings) -> Result<Self, VaultError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|e| VaultError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, VaultError> {
        let url = self.url(&request.path);

        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .header(REQUEST_ID_HEADER, request.request_id.as_str());

        if let Some(traceparent) = current_traceparent() {
            builder = builder.header(TRACEPARENT_HEADER, traceparent);
        }
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token.expose_secret());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::error!("Failed to send {} request to {}: {}", request.method, url, e);
            VaultError::Network(e.to_string())
        })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| VaultError::Network(format!("Failed to read response body: {}", e)))?;

        Ok(ApiResponse::new(status, body.to_vec()))
    }
}
