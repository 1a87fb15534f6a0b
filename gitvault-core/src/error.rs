use thiserror::Error;

/// Errors surfaced by the GitVault client core.
///
/// Every variant carries owned strings so a single outcome can be cloned out
/// to all callers awaiting a shared session renewal.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VaultError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Session expired, sign in again")]
    SessionExpired,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("Credential storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl VaultError {
    /// Map a non-success HTTP status and server message onto the taxonomy.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            400 | 422 => VaultError::Validation(message),
            401 => VaultError::Unauthorized(message),
            403 => VaultError::Forbidden(message),
            404 => VaultError::NotFound(message),
            409 => VaultError::Conflict(message),
            _ => VaultError::Api { status, message },
        }
    }

    /// Failures the user may simply retry. The core itself never retries them.
    pub fn is_transient(&self) -> bool {
        match self {
            VaultError::Network(_) => true,
            VaultError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            VaultError::Unauthorized(_) | VaultError::SessionExpired => Some(401),
            VaultError::Forbidden(_) => Some(403),
            VaultError::NotFound(_) => Some(404),
            VaultError::Conflict(_) => Some(409),
            VaultError::Validation(_) => Some(422),
            VaultError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<validator::ValidationErrors> for VaultError {
    fn from(err: validator::ValidationErrors) -> Self {
        VaultError::Validation(err.to_string())
    }
}

impl From<serde_json::Error> for VaultError {
    fn from(err: serde_json::Error) -> Self {
        VaultError::Decode(err.to_string())
    }
}

impl From<std::io::Error> for VaultError {
    fn from(err: std::io::Error) -> Self {
        VaultError::Storage(err.to_string())
    }
}

pub type Result<T, E = VaultError> = std::result::Result<T, E>;
