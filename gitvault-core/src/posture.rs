//! Security posture score for the dashboard.
//!
//! A pure snapshot recomputed from current counts; nothing here is persisted.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{PersonalAccessToken, Repository};

const MAX_SCORE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SecurityCounts {
    pub total_repos: u32,
    pub private_repos: u32,
    pub public_repos: u32,
    pub total_collaborators: u32,
    pub active_tokens: u32,
}

impl SecurityCounts {
    /// Derive counts from the principal's repositories and tokens. Tokens
    /// expired at `now` are listed but do not count as active.
    pub fn from_inventory(
        repos: &[Repository],
        tokens: &[PersonalAccessToken],
        now: DateTime<Utc>,
    ) -> Self {
        let private_repos = repos.iter().filter(|r| r.is_private()).count();
        let total_collaborators: usize = repos
            .iter()
            .map(|r| r.membership.collaborator_count())
            .sum();
        let active_tokens = tokens.iter().filter(|t| !t.is_expired_at(now)).count();

        Self {
            total_repos: repos.len() as u32,
            private_repos: private_repos as u32,
            public_repos: (repos.len() - private_repos) as u32,
            total_collaborators: total_collaborators as u32,
            active_tokens: active_tokens as u32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Finding {
    Strength(&'static str),
    Concern(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PostureTier {
    Healthy,
    Fair,
    AtRisk,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecurityPosture {
    pub score: u8,
    pub strengths: Vec<String>,
    pub concerns: Vec<String>,
}

impl SecurityPosture {
    pub fn tier(&self) -> PostureTier {
        match self.score {
            80..=u8::MAX => PostureTier::Healthy,
            60..=79 => PostureTier::Fair,
            _ => PostureTier::AtRisk,
        }
    }
}

fn token_hygiene(c: &SecurityCounts) -> (u32, Finding) {
    match c.active_tokens {
        0 => (25, Finding::Strength("No active tokens - Good security practice")),
        1..=2 => (20, Finding::Strength("Limited tokens active")),
        3..=5 => (10, Finding::Concern("Multiple tokens active - Review periodically")),
        _ => (0, Finding::Concern("Too many active tokens - Security risk")),
    }
}

fn visibility_mix(c: &SecurityCounts) -> (u32, Finding) {
    if c.total_repos == 0 {
        return (0, Finding::Concern("No repositories to assess visibility"));
    }
    // Ratio thresholds compared in integers: public/total <= 3/10, <= 6/10.
    let public = u64::from(c.public_repos) * 10;
    let total = u64::from(c.total_repos);
    if c.public_repos == 0 {
        (30, Finding::Strength("All repositories are private"))
    } else if public <= total * 3 {
        (25, Finding::Strength("Most repositories are private"))
    } else if public <= total * 6 {
        (15, Finding::Concern("Many public repositories - Review access"))
    } else {
        (5, Finding::Concern("Too many public repositories - Security concern"))
    }
}

fn repository_count(c: &SecurityCounts) -> (u32, Finding) {
    match c.total_repos {
        0 => (0, Finding::Concern("No repositories yet")),
        1..=5 => (20, Finding::Strength("Well-managed repository count")),
        6..=15 => (15, Finding::Strength("Active repository management")),
        _ => (10, Finding::Concern("Many repositories - Ensure regular maintenance")),
    }
}

fn collaboration_exposure(c: &SecurityCounts) -> (u32, Finding) {
    if c.total_repos == 0 {
        return (0, Finding::Concern("No repositories to assess collaboration"));
    }
    let collaborators = u64::from(c.total_collaborators);
    let total = u64::from(c.total_repos);
    if collaborators == 0 {
        (15, Finding::Strength("No external collaborators"))
    } else if collaborators <= total * 2 {
        (12, Finding::Strength("Limited collaborators per repo"))
    } else if collaborators <= total * 5 {
        (8, Finding::Concern("Review collaborator permissions"))
    } else {
        (3, Finding::Concern("Too many collaborators - Review access"))
    }
}

fn activity_bonus(c: &SecurityCounts) -> (u32, Finding) {
    if c.total_repos > 0 && c.private_repos > 0 {
        (10, Finding::Strength("Active account with private repos"))
    } else if c.total_repos > 0 {
        (5, Finding::Concern("No private repositories"))
    } else {
        (0, Finding::Concern("No account activity yet"))
    }
}

/// Score the counts. Each rule contributes points and exactly one finding.
pub fn score(counts: &SecurityCounts) -> SecurityPosture {
    let rules: [fn(&SecurityCounts) -> (u32, Finding); 5] = [
        token_hygiene,
        visibility_mix,
        repository_count,
        collaboration_exposure,
        activity_bonus,
    ];

    let mut total = 0;
    let mut strengths = Vec::new();
    let mut concerns = Vec::new();

    for rule in rules {
        let (points, finding) = rule(counts);
        total += points;
        match finding {
            Finding::Strength(s) => strengths.push(s.to_string()),
            Finding::Concern(s) => concerns.push(s.to_string()),
        }
    }

    SecurityPosture {
        score: total.min(MAX_SCORE) as u8,
        strengths,
        concerns,
    }
}
