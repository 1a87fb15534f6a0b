pub mod collaborators;
pub mod credential_store;
pub mod dashboard;
pub mod repositories;
pub mod session;
pub mod tokens;
pub mod transport;

pub use collaborators::{CollaboratorClient, CollaboratorRoster};
pub use credential_store::{CredentialStore, FileCredentialStore, MemoryCredentialStore, StoredSession};
pub use dashboard::{DashboardService, DashboardSnapshot, RecentRepository};
pub use repositories::RepositoryClient;
pub use session::{SessionEvent, SessionManager, SignOutReason};
pub use tokens::{IssuedToken, OneTimeSecret, RevokeOutcome, TokenClient};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Transport};
