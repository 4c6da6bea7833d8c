use chrono::{DateTime, Utc};

/// Server-side session entry.
///
/// `token_hash` is the SHA-256 digest of the session id held by the client;
/// the raw id is never stored. `principal` is the serialized identity the
/// session points to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub token_hash: String,
    pub principal: String,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
