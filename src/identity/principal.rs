use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The authenticated identity issued by the external provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Principal {
    pub uid: String,
    pub email: String,
    pub email_verified: bool,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl Principal {
    /// Fallback display name: the local part of the email address.
    pub fn email_local_part(&self) -> &str {
        self.email.split('@').next().unwrap_or(&self.email)
    }
}

/// Provider-issued token pair with its expiry instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSet {
    pub id_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl TokenSet {
    /// Whether the ID token is expired or about to expire. A 60-second margin
    /// keeps a token from going stale between being read and being used.
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - now < chrono::Duration::seconds(60)
    }
}
