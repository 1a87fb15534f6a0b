//! Personal access token metadata, masking and expiry display.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const MASK_CHAR: char = '•';
const MASK_PREFIX_LEN: usize = 8;
const MASK_SUFFIX_LEN: usize = 4;
const MASK_FILLER_LEN: usize = 14;
const MASK_FALLBACK_LEN: usize = 32;

/// Listed token metadata. Never carries the raw secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalAccessToken {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub label: String,
    #[serde(rename = "tokenHash", alias = "fingerprint", default)]
    pub fingerprint: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStatus {
    Active,
    Inactive,
}

impl PersonalAccessToken {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Expired tokens stay listed but are shown as inactive.
    pub fn status(&self, now: DateTime<Utc>) -> TokenStatus {
        if self.is_expired_at(now) {
            TokenStatus::Inactive
        } else {
            TokenStatus::Active
        }
    }

    pub fn masked(&self) -> String {
        mask(self.fingerprint.as_deref())
    }

    pub fn expiry_label(&self, now: DateTime<Utc>) -> String {
        let remaining = self.expires_at - now;
        if remaining.num_milliseconds() < 0 {
            return "Expired".to_string();
        }

        let days = remaining.num_days();
        match days {
            0 => "Expires today".to_string(),
            1 => "Expires tomorrow".to_string(),
            d if d < 7 => format!("Expires in {} days", d),
            d if d < 30 => format!("Expires in {} weeks", d / 7),
            d => format!("Expires in {} months", d / 30),
        }
    }

    pub fn created_label(&self, now: DateTime<Utc>) -> String {
        let seconds = (now - self.created_at).num_seconds();
        const INTERVALS: [(&str, i64); 6] = [
            ("year", 31_536_000),
            ("month", 2_592_000),
            ("week", 604_800),
            ("day", 86_400),
            ("hour", 3_600),
            ("minute", 60),
        ];

        for (unit, unit_seconds) in INTERVALS {
            let count = seconds / unit_seconds;
            if count >= 1 {
                let plural = if count > 1 { "s" } else { "" };
                return format!("{} {}{} ago", count, unit, plural);
            }
        }
        "just now".to_string()
    }
}

/// Mask a fingerprint for display: first 8 and last 4 characters around a
/// fixed filler. Short or missing fingerprints collapse to a full mask.
///
/// Re-masking a masked value returns it unchanged.
pub fn mask(fingerprint: Option<&str>) -> String {
    let chars: Vec<char> = match fingerprint {
        Some(v) => v.chars().collect(),
        None => Vec::new(),
    };

    if chars.len() < MASK_PREFIX_LEN + MASK_SUFFIX_LEN || chars.iter().all(|c| *c == MASK_CHAR) {
        return MASK_CHAR.to_string().repeat(MASK_FALLBACK_LEN);
    }

    let prefix: String = chars[..MASK_PREFIX_LEN].iter().collect();
    let suffix: String = chars[chars.len() - MASK_SUFFIX_LEN..].iter().collect();
    format!(
        "{}{}{}",
        prefix,
        MASK_CHAR.to_string().repeat(MASK_FILLER_LEN),
        suffix
    )
}

/// SHA-256 hex fingerprint of a raw token.
pub fn fingerprint_of(raw_token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_token.as_bytes());
    hex::encode(hasher.finalize())
}
