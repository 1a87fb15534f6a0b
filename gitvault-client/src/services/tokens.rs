//! Personal access token lifecycle: issue with one-time reveal, masked
//! listing, idempotent revocation.

use chrono::Utc;
use gitvault_core::models::{fingerprint_of, PersonalAccessToken};
use gitvault_core::VaultError;
use http::StatusCode;
use secrecy::{ExposeSecret, Secret};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use validator::Validate;

use crate::dtos::tokens::{IssueTokenPayload, IssueTokenRequest};
use crate::services::session::SessionManager;
use crate::services::transport::ApiRequest;

const ISSUE_PATH: &str = "/pat/create";
const LIST_PATH: &str = "/pat/myPats";

/// Raw token handed out exactly once. `reveal` consumes it.
pub struct OneTimeSecret(Secret<String>);

impl OneTimeSecret {
    pub fn reveal(self) -> Secret<String> {
        self.0
    }
}

impl fmt::Debug for OneTimeSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OneTimeSecret([REDACTED])")
    }
}

#[derive(Debug)]
pub struct IssuedToken {
    pub metadata: PersonalAccessToken,
    pub secret: OneTimeSecret,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevokeOutcome {
    Revoked,
    /// The server no longer knew the token; treated as success.
    AlreadyRevoked,
}

#[derive(Clone)]
pub struct TokenClient {
    session: SessionManager,
    cache: Arc<Mutex<Vec<PersonalAccessToken>>>,
}

impl TokenClient {
    pub fn new(session: SessionManager) -> Self {
        Self {
            session,
            cache: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn cache(&self) -> MutexGuard<'_, Vec<PersonalAccessToken>> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Metadata from the last list, plus issues and minus revocations since.
    pub fn cached(&self) -> Vec<PersonalAccessToken> {
        self.cache().clone()
    }

    pub async fn list(&self) -> Result<Vec<PersonalAccessToken>, VaultError> {
        let tokens: Vec<PersonalAccessToken> = self
            .session
            .send(ApiRequest::get(LIST_PATH))
            .await?
            .into_data()?;
        *self.cache() = tokens.clone();
        Ok(tokens)
    }

    pub async fn issue(&self, label: &str) -> Result<IssuedToken, VaultError> {
        let body = IssueTokenRequest::new(label);
        body.validate()?;

        let payload: IssueTokenPayload = self
            .session
            .send(ApiRequest::post(ISSUE_PATH, serde_json::to_value(&body)?))
            .await?
            .into_data()?;

        let fingerprint = match payload.fingerprint.filter(|f| !f.is_empty()) {
            Some(fingerprint) => fingerprint,
            None => fingerprint_of(payload.token.expose_secret()),
        };
        let metadata = PersonalAccessToken {
            id: payload.id,
            label: payload.label,
            fingerprint: Some(fingerprint),
            created_at: payload.created_at.unwrap_or_else(Utc::now),
            expires_at: payload.expires_at,
        };

        self.cache().push(metadata.clone());
        metrics::counter!("gitvault_pat_issued_total").increment(1);
        tracing::info!(token_id = %metadata.id, "Personal access token issued");

        Ok(IssuedToken {
            metadata,
            secret: OneTimeSecret(payload.token),
        })
    }

    pub async fn revoke(&self, token_id: &str) -> Result<RevokeOutcome, VaultError> {
        let token_id = token_id.trim();
        if token_id.is_empty() {
            return Err(VaultError::Validation("Token id is required".to_string()));
        }

        let response = self
            .session
            .send(ApiRequest::delete(format!("/pat/{}", token_id)))
            .await?;

        let outcome = if response.is_success() {
            RevokeOutcome::Revoked
        } else if response.status == StatusCode::NOT_FOUND {
            RevokeOutcome::AlreadyRevoked
        } else {
            return Err(response.error());
        };

        self.cache().retain(|t| t.id != token_id);
        let label = match outcome {
            RevokeOutcome::Revoked => "revoked",
            RevokeOutcome::AlreadyRevoked => "already_revoked",
        };
        metrics::counter!("gitvault_pat_revoked_total", "outcome" => label).increment(1);
        tracing::info!(token_id = %token_id, outcome = label, "Personal access token revoked");
        Ok(outcome)
    }
}
