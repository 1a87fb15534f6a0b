use gitvault_core::models::{CollaboratorGrant, Membership, Repository};
use gitvault_core::{authorize, Action, Role, VaultError};
use validator::Validate;

use crate::dtos::collaborators::{AddCollaboratorRequest, RosterPayload, UpdateRoleRequest};
use crate::services::session::SessionManager;
use crate::services::transport::ApiRequest;

/// Collaborators of one repository as the server reports them, with the
/// caller's own standing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollaboratorRoster {
    pub membership: Membership,
    pub is_owner: bool,
    pub is_admin: bool,
}

impl CollaboratorRoster {
    pub fn can_manage(&self) -> bool {
        self.is_owner || self.is_admin
    }
}

#[derive(Clone)]
pub struct CollaboratorClient {
    session: SessionManager,
}

fn assignable(role: Role) -> Result<Role, VaultError> {
    if role.is_assignable() {
        Ok(role)
    } else {
        Err(VaultError::Validation(
            "Ownership cannot be granted to a collaborator".to_string(),
        ))
    }
}

fn grant_id(raw: &str) -> Result<&str, VaultError> {
    let id = raw.trim();
    if id.is_empty() {
        return Err(VaultError::Validation("Collaborator id is required".to_string()));
    }
    Ok(id)
}

impl CollaboratorClient {
    pub fn new(session: SessionManager) -> Self {
        Self { session }
    }

    fn gate(&self, repo: &Repository) -> Result<(), VaultError> {
        authorize(self.session.principal().as_ref(), repo, Action::ManageCollaborators).map(|_| ())
    }

    pub async fn list(&self, repo_id: &str) -> Result<CollaboratorRoster, VaultError> {
        let payload: RosterPayload = self
            .session
            .send(ApiRequest::get(format!("/repos/{}/collaborators/get", repo_id)))
            .await?
            .into_data()?;

        Ok(CollaboratorRoster {
            membership: Membership::new(payload.owner, payload.collaborators),
            is_owner: payload.is_owner,
            is_admin: payload.is_admin,
        })
    }

    pub async fn add(
        &self,
        repo: &Repository,
        email: &str,
        role: Role,
    ) -> Result<CollaboratorGrant, VaultError> {
        let body = AddCollaboratorRequest::new(email, assignable(role)?);
        body.validate()?;
        self.gate(repo)?;

        let grant: CollaboratorGrant = self
            .session
            .send(ApiRequest::post(
                format!("/repos/{}/collaborators/add", repo.id),
                serde_json::to_value(&body)?,
            ))
            .await?
            .into_data()?;
        tracing::info!(repository_id = %repo.id, grant_id = %grant.id, role = %grant.role, "Collaborator added");
        Ok(grant)
    }

    /// Change a grant's role. Nothing is sent when the grant already holds `role`.
    pub async fn update_role(
        &self,
        repo: &Repository,
        grant_id_raw: &str,
        role: Role,
    ) -> Result<(), VaultError> {
        let id = grant_id(grant_id_raw)?;
        let role = assignable(role)?;
        self.gate(repo)?;

        if repo.membership.grant(id).map(|g| g.role) == Some(role) {
            return Ok(());
        }

        self.session
            .send(ApiRequest::put(
                format!("/repos/{}/collaborators/{}/role", repo.id, id),
                serde_json::to_value(UpdateRoleRequest { role })?,
            ))
            .await?
            .into_unit()?;
        tracing::info!(repository_id = %repo.id, grant_id = %id, role = %role, "Collaborator role updated");
        Ok(())
    }

    pub async fn remove(&self, repo: &Repository, grant_id_raw: &str) -> Result<(), VaultError> {
        let id = grant_id(grant_id_raw)?;
        self.gate(repo)?;

        self.session
            .send(ApiRequest::delete(format!(
                "/repos/{}/collaborators/{}",
                repo.id, id
            )))
            .await?
            .into_unit()?;
        tracing::info!(repository_id = %repo.id, grant_id = %id, "Collaborator removed");
        Ok(())
    }
}
