use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::providers::TokenSet;

/// Seconds of slack before the embedded expiry at which a token is treated as expired.
const EXPIRY_SKEW_SECS: i64 = 30;

/// A decoded access token plus the expiry metadata it carries.
///
/// Serialized form is the JSON blob stored in `drive_tokens.access_token`:
/// `{"access_token", "token_type", "expires_in", "scope", "created"}`.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Unix timestamp at which the token was issued.
    #[serde(default)]
    pub created: i64,
}

fn default_token_type() -> String {
    "Bearer".into()
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("created", &self.created)
            .finish()
    }
}

impl Credential {
    pub fn from_token_set(tokens: TokenSet, issued_at: DateTime<Utc>) -> Self {
        Self {
            access_token: tokens.access_token,
            token_type: tokens.token_type,
            expires_in: tokens.expires_in,
            scope: tokens.scope,
            created: issued_at.timestamp(),
        }
    }

    pub fn from_blob(blob: &str) -> Result<Self, AppError> {
        serde_json::from_str(blob)
            .map_err(|e| AppError::Internal(format!("unreadable access token blob: {e}")))
    }

    pub fn to_blob(&self) -> Result<String, AppError> {
        serde_json::to_string(self)
            .map_err(|e| AppError::Internal(format!("failed to serialize access token: {e}")))
    }

    /// A token without `expires_in` is always expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_in {
            Some(secs) => self.created + secs as i64 - EXPIRY_SKEW_SECS < now.timestamp(),
            None => true,
        }
    }

    pub fn bearer(&self) -> &str {
        &self.access_token
    }
}
