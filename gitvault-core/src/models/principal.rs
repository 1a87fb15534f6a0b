use serde::{Deserialize, Deserializer, Serialize};

/// The signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub username: String,
    pub email: String,
}

impl Principal {
    pub fn display_name(&self) -> String {
        if !self.username.trim().is_empty() {
            return self.username.clone();
        }
        self.email.split('@').next().unwrap_or("User").to_string()
    }
}

/// A principal reference as the API sends it: either a bare identifier or
/// an embedded (possibly partial) user document.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum PrincipalRef {
    Bare(String),
    Embedded(PrincipalSummary),
}

#[derive(Debug, Deserialize)]
pub(crate) struct PrincipalSummary {
    #[serde(rename = "_id", alias = "id")]
    id: String,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

/// Normalized reference: the id plus whatever contact details were embedded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct NormalizedRef {
    pub id: String,
    pub username: Option<String>,
    pub email: Option<String>,
}

impl From<PrincipalRef> for NormalizedRef {
    fn from(value: PrincipalRef) -> Self {
        match value {
            PrincipalRef::Bare(id) => NormalizedRef {
                id,
                ..Default::default()
            },
            PrincipalRef::Embedded(summary) => NormalizedRef {
                id: summary.id,
                username: summary.username,
                email: summary.email,
            },
        }
    }
}

/// `deserialize_with` helper collapsing either wire shape into the id alone.
pub fn deserialize_principal_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    PrincipalRef::deserialize(deserializer).map(|r| NormalizedRef::from(r).id)
}
