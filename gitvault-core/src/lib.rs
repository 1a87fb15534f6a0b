//! gitvault-core: access-control, credential and posture domain shared by the
//! GitVault client.
pub mod authz;
pub mod error;
pub mod models;
pub mod observability;
pub mod posture;

pub use authz::{authorize, effective_permissions, resolve_role, Action, Permissions, Role};
pub use error::{Result, VaultError};
pub use posture::{score, PostureTier, SecurityCounts, SecurityPosture};

pub use chrono;
pub use tracing;
