use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::authz::Role;
use crate::models::principal::{NormalizedRef, PrincipalRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }
}

/// One principal's role on one repository.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "GrantWire")]
pub struct CollaboratorGrant {
    /// Grant id, used by the update/remove endpoints.
    pub id: String,
    pub principal_id: String,
    pub role: Role,
    pub username: Option<String>,
    pub email: Option<String>,
}

#[derive(Deserialize)]
struct GrantWire {
    #[serde(rename = "_id", alias = "id")]
    id: String,
    user: PrincipalRef,
    role: Role,
}

impl From<GrantWire> for CollaboratorGrant {
    fn from(wire: GrantWire) -> Self {
        let user = NormalizedRef::from(wire.user);
        Self {
            id: wire.id,
            principal_id: user.id,
            role: wire.role,
            username: user.username,
            email: user.email,
        }
    }
}

/// Owner plus collaborator grants of a repository.
///
/// Construction guarantees the owner never appears as a grant and that each
/// principal holds at most one grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    owner_id: String,
    grants: Vec<CollaboratorGrant>,
}

impl Membership {
    pub fn new(
        owner_id: impl Into<String>,
        grants: impl IntoIterator<Item = CollaboratorGrant>,
    ) -> Self {
        let owner_id = owner_id.into();
        let mut seen = HashSet::new();
        let mut kept = Vec::new();

        for grant in grants {
            if grant.principal_id == owner_id {
                tracing::warn!(
                    grant_id = %grant.id,
                    "Dropping collaborator grant bound to the repository owner"
                );
                continue;
            }
            if !seen.insert(grant.principal_id.clone()) {
                tracing::warn!(
                    grant_id = %grant.id,
                    principal_id = %grant.principal_id,
                    "Dropping duplicate collaborator grant"
                );
                continue;
            }
            kept.push(grant);
        }

        Self {
            owner_id,
            grants: kept,
        }
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn grants(&self) -> &[CollaboratorGrant] {
        &self.grants
    }

    pub fn grant_for(&self, principal_id: &str) -> Option<&CollaboratorGrant> {
        self.grants.iter().find(|g| g.principal_id == principal_id)
    }

    pub fn grant(&self, grant_id: &str) -> Option<&CollaboratorGrant> {
        self.grants.iter().find(|g| g.id == grant_id)
    }

    pub fn collaborator_count(&self) -> usize {
        self.grants.len()
    }

    pub fn set_role(&mut self, grant_id: &str, role: Role) -> bool {
        match self.grants.iter_mut().find(|g| g.id == grant_id) {
            Some(grant) => {
                grant.role = role;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, grant_id: &str) -> Option<CollaboratorGrant> {
        let idx = self.grants.iter().position(|g| g.id == grant_id)?;
        Some(self.grants.remove(idx))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RepositoryWire")]
pub struct Repository {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub visibility: Visibility,
    pub membership: Membership,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepositoryWire {
    #[serde(rename = "_id", alias = "id")]
    id: String,
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    visibility: Visibility,
    owner: PrincipalRef,
    #[serde(default)]
    collaborators: Vec<CollaboratorGrant>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

impl From<RepositoryWire> for Repository {
    fn from(wire: RepositoryWire) -> Self {
        let owner = NormalizedRef::from(wire.owner);
        Self {
            id: wire.id,
            name: wire.name,
            description: wire.description,
            visibility: wire.visibility,
            membership: Membership::new(owner.id, wire.collaborators),
            updated_at: wire.updated_at,
        }
    }
}

impl Repository {
    pub fn is_private(&self) -> bool {
        self.visibility == Visibility::Private
    }
}
