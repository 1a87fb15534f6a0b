use chrono::{DateTime, Utc};
use secrecy::Secret;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Serialize, Validate)]
pub struct IssueTokenRequest {
    #[validate(length(min = 1, max = 100, message = "Label must be between 1 and 100 characters"))]
    pub label: String,
}

impl IssueTokenRequest {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.trim().to_string(),
        }
    }
}

/// Issuance response: the only payload that ever carries the raw token.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueTokenPayload {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub label: String,
    pub token: Secret<String>,
    #[serde(alias = "tokenHash", default)]
    pub fingerprint: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
}
