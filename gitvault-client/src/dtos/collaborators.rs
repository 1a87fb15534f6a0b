use gitvault_core::models::{deserialize_principal_id, CollaboratorGrant};
use gitvault_core::Role;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Serialize, Validate)]
pub struct AddCollaboratorRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    pub role: Role,
}

impl AddCollaboratorRequest {
    pub fn new(email: &str, role: Role) -> Self {
        Self {
            email: email.trim().to_string(),
            role,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UpdateRoleRequest {
    pub role: Role,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterPayload {
    #[serde(deserialize_with = "deserialize_principal_id")]
    pub owner: String,
    #[serde(default)]
    pub collaborators: Vec<CollaboratorGrant>,
    #[serde(default)]
    pub is_owner: bool,
    #[serde(default)]
    pub is_admin: bool,
}
