pub mod principal;
pub mod repository;
pub mod token;

pub use principal::{deserialize_principal_id, Principal};
pub use repository::{CollaboratorGrant, Membership, Repository, Visibility};
pub use token::{fingerprint_of, mask, PersonalAccessToken, TokenStatus};
