//! Role derivation and the fixed permission matrix.
//!
//! These checks only shape what the client attempts; the server stays
//! authoritative and may still reject a locally permitted call.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::VaultError;
use crate::models::{Principal, Repository, Visibility};

/// Repository role, ordered by precedence: `Owner > Admin > Write > Read`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Role {
    Read,
    Write,
    Admin,
    Owner,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Read => "read",
            Role::Write => "write",
            Role::Admin => "admin",
            Role::Owner => "owner",
        }
    }

    /// Ownership is never granted through a collaborator grant.
    pub fn is_assignable(&self) -> bool {
        !matches!(self, Role::Owner)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "read" => Ok(Role::Read),
            "write" => Ok(Role::Write),
            "admin" => Ok(Role::Admin),
            "owner" => Ok(Role::Owner),
            other => Err(VaultError::Validation(format!("Unknown role '{}'", other))),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = VaultError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    View,
    ClonePull,
    Push,
    ManageCollaborators,
    /// Visibility and description changes share the collaborator-management gate.
    UpdateSettings,
    DeleteRepository,
}

impl Action {
    fn describe(&self) -> &'static str {
        match self {
            Action::View => "view this repository",
            Action::ClonePull => "clone or pull this repository",
            Action::Push => "push to this repository",
            Action::ManageCollaborators => "manage collaborators",
            Action::UpdateSettings => "update repository settings",
            Action::DeleteRepository => "delete this repository",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Permissions {
    pub view: bool,
    pub clone_pull: bool,
    pub push: bool,
    pub manage_collaborators: bool,
    pub delete_repository: bool,
}

impl Permissions {
    pub const NONE: Permissions = Permissions {
        view: false,
        clone_pull: false,
        push: false,
        manage_collaborators: false,
        delete_repository: false,
    };

    /// Public repository, no relationship: read-only.
    pub const PUBLIC_VISITOR: Permissions = Permissions {
        view: true,
        clone_pull: true,
        push: false,
        manage_collaborators: false,
        delete_repository: false,
    };

    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Owner => Permissions {
                view: true,
                clone_pull: true,
                push: true,
                manage_collaborators: true,
                delete_repository: true,
            },
            Role::Admin => Permissions {
                view: true,
                clone_pull: true,
                push: true,
                manage_collaborators: true,
                delete_repository: false,
            },
            Role::Write => Permissions {
                view: true,
                clone_pull: true,
                push: true,
                manage_collaborators: false,
                delete_repository: false,
            },
            Role::Read => Permissions::PUBLIC_VISITOR,
        }
    }

    pub fn for_access(role: Option<Role>, visibility: Visibility) -> Self {
        match (role, visibility) {
            (Some(role), _) => Permissions::for_role(role),
            (None, Visibility::Public) => Permissions::PUBLIC_VISITOR,
            (None, Visibility::Private) => Permissions::NONE,
        }
    }

    pub fn allows(&self, action: Action) -> bool {
        match action {
            Action::View => self.view,
            Action::ClonePull => self.clone_pull,
            Action::Push => self.push,
            Action::ManageCollaborators | Action::UpdateSettings => self.manage_collaborators,
            Action::DeleteRepository => self.delete_repository,
        }
    }
}

/// Effective role of `principal` on `repository`, if any.
pub fn resolve_role(principal: &Principal, repository: &Repository) -> Option<Role> {
    let membership = &repository.membership;
    if membership.owner_id() == principal.id {
        return Some(Role::Owner);
    }
    membership.grant_for(&principal.id).map(|grant| grant.role)
}

/// Permission set for an optional (anonymous) principal.
pub fn effective_permissions(principal: Option<&Principal>, repository: &Repository) -> Permissions {
    let role = principal.and_then(|p| resolve_role(p, repository));
    Permissions::for_access(role, repository.visibility)
}

/// Gate a mutating call before it is attempted.
pub fn authorize(
    principal: Option<&Principal>,
    repository: &Repository,
    action: Action,
) -> Result<Permissions, VaultError> {
    let permissions = effective_permissions(principal, repository);
    if permissions.allows(action) {
        Ok(permissions)
    } else {
        tracing::debug!(
            repository_id = %repository.id,
            action = ?action,
            "Action blocked by local permission check"
        );
        Err(VaultError::Forbidden(format!(
            "You do not have permission to {} '{}'",
            action.describe(),
            repository.name
        )))
    }
}
