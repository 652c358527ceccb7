// --- File: crates/slotwise_vault/src/token.rs ---
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Calendar OAuth credentials. Only ever stored as a vault blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthToken {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Expiry as epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

impl OAuthToken {
    /// Expired tokens carry an expiry at or before `now`. Tokens without one never expire.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry_date
            .map(|expiry| expiry <= now.timestamp_millis())
            .unwrap_or(false)
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.is_some()
    }
}
