//! Session identity: turning principals into server-side sessions and back.
//!
//! The client only ever holds an opaque random session id. The store keeps
//! the SHA-256 hex digest of that id together with the serialized principal
//! (its id) and a sliding expiry.

use std::sync::Arc;

use argon2::password_hash::rand_core::{OsRng, RngCore};
use base64::Engine;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use folio_db::db::SessionStore;
use folio_db::model::session::SessionRecord;

use super::credential::CredentialStore;
use super::principal::Principal;
use crate::error::{ServiceError, ServiceResult};

/// Serialized identity: the principal id as a string. Holds nothing mutable
/// so renames and password changes do not invalidate sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The opaque session id handed to the client.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionId(String);

impl std::fmt::Debug for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionId(<redacted>)")
    }
}

impl SessionId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

/// ## Summary
/// Generates a random 256-bit session id, base64url encoded.
///
/// ## Errors
/// Returns an error if the OS random source fails.
pub fn generate_session_id() -> ServiceResult<SessionId> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| ServiceError::InvalidConfiguration(format!("Random source failed: {e}")))?;
    Ok(SessionId(
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes),
    ))
}

/// Hash a session id so raw values never touch the store.
#[must_use]
pub fn hash_session_id(session_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(session_id.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Clone)]
pub struct SessionManager {
    sessions: Arc<dyn SessionStore>,
    credentials: Arc<dyn CredentialStore>,
    ttl: chrono::Duration,
}

impl SessionManager {
    /// ## Errors
    /// Returns `InvalidConfiguration` if the TTL does not fit a timestamp offset.
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        credentials: Arc<dyn CredentialStore>,
        ttl: std::time::Duration,
    ) -> ServiceResult<Self> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| ServiceError::InvalidConfiguration(format!("Session TTL: {e}")))?;
        Ok(Self {
            sessions,
            credentials,
            ttl,
        })
    }

    #[must_use]
    pub fn serialize(principal: &Principal) -> SessionToken {
        SessionToken(principal.id.to_string())
    }

    /// ## Summary
    /// Re-fetches the principal behind a token.
    ///
    /// Returns `None` if the token does not parse or the record is gone.
    ///
    /// ## Errors
    /// Returns an error only if the credential lookup fails.
    #[tracing::instrument(skip(self))]
    pub async fn deserialize(&self, token: &SessionToken) -> ServiceResult<Option<Principal>> {
        let Ok(id) = uuid::Uuid::parse_str(token.as_str()) else {
            tracing::debug!("Session token is not a principal id");
            return Ok(None);
        };
        let record = self.credentials.find_by_id(id).await?;
        if record.is_none() {
            tracing::debug!(user_id = %id, "Session principal no longer exists");
        }
        Ok(record.map(super::principal::CredentialRecord::into_principal))
    }

    /// ## Summary
    /// Starts a new session for `principal`.
    ///
    /// ## Errors
    /// Returns an error if the id cannot be generated or stored.
    #[tracing::instrument(skip(self, principal), fields(user_id = %principal.id))]
    pub async fn establish(&self, principal: &Principal) -> ServiceResult<SessionId> {
        self.establish_at(principal, Utc::now()).await
    }

    /// ## Summary
    /// Resolves a session id to its principal, sliding the expiry forward.
    ///
    /// ## Errors
    /// Returns an error if the session or credential store fails.
    #[tracing::instrument(skip_all)]
    pub async fn restore(&self, session_id: &str) -> ServiceResult<Option<Principal>> {
        self.restore_at(session_id, Utc::now()).await
    }

    /// ## Summary
    /// Ends a session. Unknown ids are ignored.
    ///
    /// ## Errors
    /// Returns an error if the session store fails.
    #[tracing::instrument(skip_all)]
    pub async fn end(&self, session_id: &str) -> ServiceResult<()> {
        if self.sessions.remove(&hash_session_id(session_id)).await? {
            tracing::debug!("Session ended");
        }
        Ok(())
    }

    /// ## Summary
    /// Drops every expired session.
    ///
    /// ## Errors
    /// Returns an error if the session store fails.
    pub async fn purge_expired(&self) -> ServiceResult<u64> {
        Ok(self.sessions.purge_expired(Utc::now()).await?)
    }

    async fn establish_at(
        &self,
        principal: &Principal,
        now: DateTime<Utc>,
    ) -> ServiceResult<SessionId> {
        let session_id = generate_session_id()?;
        self.sessions
            .insert(SessionRecord {
                token_hash: hash_session_id(session_id.as_str()),
                principal: Self::serialize(principal).0,
                expires_at: now + self.ttl,
            })
            .await?;
        tracing::debug!("Session established");
        Ok(session_id)
    }

    async fn restore_at(
        &self,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> ServiceResult<Option<Principal>> {
        let token_hash = hash_session_id(session_id);
        let Some(record) = self.sessions.find_active(&token_hash, now).await? else {
            return Ok(None);
        };

        if !self.sessions.touch(&token_hash, now + self.ttl).await? {
            return Ok(None);
        }

        let principal = self
            .deserialize(&SessionToken::new(record.principal))
            .await?;
        if principal.is_none() {
            self.sessions.remove(&token_hash).await?;
        }
        Ok(principal)
    }
}
