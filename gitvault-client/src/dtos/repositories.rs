use gitvault_core::models::Visibility;
use serde::Serialize;

#[derive(Debug, Default, Serialize)]
pub struct UpdateRepositoryRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
