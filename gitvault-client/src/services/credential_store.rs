//! Holder of the access credential and the signed-in principal.
//!
//! The refresh credential has no slot here; it lives only in the transport's
//! cookie jar.

use gitvault_core::models::Principal;
use gitvault_core::VaultError;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone)]
pub struct StoredSession {
    pub principal: Principal,
    pub access_token: Secret<String>,
}

pub trait CredentialStore: Send + Sync {
    fn session(&self) -> Option<StoredSession>;

    /// Replace the principal and access credential together.
    fn set_session(&self, session: StoredSession) -> Result<(), VaultError>;

    /// Swap the access credential of the current session. Fails when no
    /// session exists so a renewal can never create a principal-less session.
    fn set_access_token(&self, token: Secret<String>) -> Result<(), VaultError>;

    fn clear(&self) -> Result<(), VaultError>;

    fn access_token(&self) -> Option<Secret<String>> {
        self.session().map(|s| s.access_token)
    }

    fn principal(&self) -> Option<Principal> {
        self.session().map(|s| s.principal)
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Default)]
pub struct MemoryCredentialStore {
    session: RwLock<Option<StoredSession>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: StoredSession) -> Self {
        Self {
            session: RwLock::new(Some(session)),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn session(&self) -> Option<StoredSession> {
        read(&self.session).clone()
    }

    fn set_session(&self, session: StoredSession) -> Result<(), VaultError> {
        *write(&self.session) = Some(session);
        Ok(())
    }

    fn set_access_token(&self, token: Secret<String>) -> Result<(), VaultError> {
        match write(&self.session).as_mut() {
            Some(session) => {
                session.access_token = token;
                Ok(())
            }
            None => Err(VaultError::SessionExpired),
        }
    }

    fn clear(&self) -> Result<(), VaultError> {
        *write(&self.session) = None;
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct PersistedSession {
    principal: Principal,
    access_token: String,
}

/// JSON-file store so a session survives process restarts.
pub struct FileCredentialStore {
    path: PathBuf,
    session: RwLock<Option<StoredSession>>,
}

impl FileCredentialStore {
    /// Open the store, loading any session persisted at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, VaultError> {
        let path = path.into();
        let session = match std::fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<PersistedSession>(&bytes) {
                Ok(persisted) => Some(StoredSession {
                    principal: persisted.principal,
                    access_token: Secret::new(persisted.access_token),
                }),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable credential file");
                    None
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            session: RwLock::new(session),
        })
    }

    fn persist(&self, session: &StoredSession) -> Result<(), VaultError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let persisted = PersistedSession {
            principal: session.principal.clone(),
            access_token: session.access_token.expose_secret().clone(),
        };
        std::fs::write(&self.path, serde_json::to_vec(&persisted)?)?;
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn session(&self) -> Option<StoredSession> {
        read(&self.session).clone()
    }

    fn set_session(&self, session: StoredSession) -> Result<(), VaultError> {
        let mut guard = write(&self.session);
        self.persist(&session)?;
        *guard = Some(session);
        Ok(())
    }

    fn set_access_token(&self, token: Secret<String>) -> Result<(), VaultError> {
        let mut guard = write(&self.session);
        let session = guard.as_mut().ok_or(VaultError::SessionExpired)?;
        session.access_token = token;
        self.persist(session)
    }

    fn clear(&self) -> Result<(), VaultError> {
        // Memory first: a failed unlink must not leave the client authenticated.
        *write(&self.session) = None;
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
