use gitvault_core::models::{Repository, Visibility};
use gitvault_core::{authorize, Action, VaultError};

use crate::dtos::repositories::UpdateRepositoryRequest;
use crate::services::session::SessionManager;
use crate::services::transport::ApiRequest;

const MY_REPOS_PATH: &str = "/repos/my";

#[derive(Clone)]
pub struct RepositoryClient {
    session: SessionManager,
}

impl RepositoryClient {
    pub fn new(session: SessionManager) -> Self {
        Self { session }
    }

    pub async fn list_mine(&self) -> Result<Vec<Repository>, VaultError> {
        self.session
            .send(ApiRequest::get(MY_REPOS_PATH))
            .await?
            .into_data()
    }

    pub async fn get(&self, repo_id: &str) -> Result<Repository, VaultError> {
        self.session
            .send(ApiRequest::get(format!("/repos/{}", repo_id)))
            .await?
            .into_data()
    }

    /// Change visibility. Returns the repository as it now stands; no call is
    /// made when the visibility is already `visibility`.
    pub async fn set_visibility(
        &self,
        repo: &Repository,
        visibility: Visibility,
    ) -> Result<Repository, VaultError> {
        authorize(self.session.principal().as_ref(), repo, Action::UpdateSettings)?;
        if repo.visibility == visibility {
            return Ok(repo.clone());
        }

        let body = UpdateRepositoryRequest {
            visibility: Some(visibility),
            ..Default::default()
        };
        self.update(repo, &body).await?;
        tracing::info!(repository_id = %repo.id, visibility = visibility.as_str(), "Repository visibility changed");

        let mut updated = repo.clone();
        updated.visibility = visibility;
        Ok(updated)
    }

    pub async fn update_description(
        &self,
        repo: &Repository,
        description: &str,
    ) -> Result<Repository, VaultError> {
        authorize(self.session.principal().as_ref(), repo, Action::UpdateSettings)?;
        let description = description.trim().to_string();
        if repo.description.as_deref().unwrap_or("") == description {
            return Ok(repo.clone());
        }

        let body = UpdateRepositoryRequest {
            description: Some(description.clone()),
            ..Default::default()
        };
        self.update(repo, &body).await?;

        let mut updated = repo.clone();
        updated.description = Some(description);
        Ok(updated)
    }

    /// Delete a repository. `confirm_name` must repeat the repository name.
    pub async fn delete(&self, repo: &Repository, confirm_name: &str) -> Result<(), VaultError> {
        authorize(self.session.principal().as_ref(), repo, Action::DeleteRepository)?;
        if confirm_name.trim() != repo.name {
            return Err(VaultError::Validation(format!(
                "Type '{}' to confirm deletion",
                repo.name
            )));
        }

        self.session
            .send(ApiRequest::delete(format!("/repos/{}", repo.id)))
            .await?
            .into_unit()?;
        tracing::info!(repository_id = %repo.id, "Repository deleted");
        Ok(())
    }

    async fn update(&self, repo: &Repository, body: &UpdateRepositoryRequest) -> Result<(), VaultError> {
        self.session
            .send(ApiRequest::put(
                format!("/repos/{}", repo.id),
                serde_json::to_value(body)?,
            ))
            .await?
            .into_unit()
    }
}
