//! gitvault-client: session, access-control and token orchestration over the
//! GitVault REST API.
pub mod config;
pub mod dtos;
pub mod services;

use config::Settings;
use gitvault_core::VaultError;
use services::{
    CollaboratorClient, CredentialStore, DashboardService, FileCredentialStore, HttpTransport,
    MemoryCredentialStore, RepositoryClient, SessionManager, TokenClient, Transport,
};
use std::sync::Arc;

pub use gitvault_core;

/// Every client wired to one shared session.
#[derive(Clone)]
pub struct VaultClient {
    pub session: SessionManager,
    pub repositories: RepositoryClient,
    pub collaborators: CollaboratorClient,
    pub tokens: TokenClient,
    pub dashboard: DashboardService,
}

impl VaultClient {
    pub fn new(transport: Arc<dyn Transport>, store: Arc<dyn CredentialStore>) -> Self {
        let session = SessionManager::new(transport, store);
        let repositories = RepositoryClient::new(session.clone());
        let tokens = TokenClient::new(session.clone());
        Self {
            collaborators: CollaboratorClient::new(session.clone()),
            dashboard: DashboardService::new(session.clone(), repositories.clone(), tokens.clone()),
            repositories,
            tokens,
            session,
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, VaultError> {
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(&settings.api)?);
        let store: Arc<dyn CredentialStore> = match &settings.storage.credentials_path {
            Some(path) => Arc::new(FileCredentialStore::open(path)?),
            None => Arc::new(MemoryCredentialStore::new()),
        };
        Ok(Self::new(transport, store))
    }
}
