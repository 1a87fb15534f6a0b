//! Dashboard aggregate: the principal's repositories and tokens, fetched
//! together and scored.

use chrono::{DateTime, Utc};
use gitvault_core::models::{PersonalAccessToken, Repository};
use gitvault_core::{resolve_role, score, Role, SecurityCounts, SecurityPosture, VaultError};

use crate::services::repositories::RepositoryClient;
use crate::services::session::SessionManager;
use crate::services::tokens::TokenClient;

const RECENT_LIMIT: usize = 5;

#[derive(Debug, Clone)]
pub struct DashboardSnapshot {
    pub repositories: Vec<Repository>,
    pub tokens: Vec<PersonalAccessToken>,
    pub counts: SecurityCounts,
    pub posture: SecurityPosture,
    pub taken_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentRepository {
    pub repository: Repository,
    pub role: Option<Role>,
}

#[derive(Clone)]
pub struct DashboardService {
    session: SessionManager,
    repositories: RepositoryClient,
    tokens: TokenClient,
}

impl DashboardService {
    pub fn new(session: SessionManager, repositories: RepositoryClient, tokens: TokenClient) -> Self {
        Self {
            session,
            repositories,
            tokens,
        }
    }

    pub async fn snapshot(&self) -> Result<DashboardSnapshot, VaultError> {
        let (repositories, tokens) =
            tokio::try_join!(self.repositories.list_mine(), self.tokens.list())?;

        let taken_at = Utc::now();
        let counts = SecurityCounts::from_inventory(&repositories, &tokens, taken_at);
        let posture = score(&counts);
        tracing::debug!(score = posture.score, "Security posture computed");

        Ok(DashboardSnapshot {
            repositories,
            tokens,
            counts,
            posture,
            taken_at,
        })
    }

    pub async fn posture(&self) -> Result<SecurityPosture, VaultError> {
        Ok(self.snapshot().await?.posture)
    }

    /// Most recently updated repositories first, with the caller's role on each.
    pub fn recent(&self, snapshot: &DashboardSnapshot) -> Vec<RecentRepository> {
        let principal = self.session.principal();
        let mut repositories = snapshot.repositories.clone();
        repositories.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        repositories
            .into_iter()
            .take(RECENT_LIMIT)
            .map(|repository| RecentRepository {
                role: principal.as_ref().and_then(|p| resolve_role(p, &repository)),
                repository,
            })
            .collect()
    }
}
