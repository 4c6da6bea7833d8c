//! Verified identities and the credential records they are derived from.

use serde::{Deserialize, Serialize};

use folio_db::model::document::{Document, DocumentId};

/// Principal ids are the ids of the backing user documents.
pub type PrincipalId = DocumentId;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Member,
    Admin,
}

impl Role {
    /// Returns `true` for roles that bypass ownership checks.
    #[must_use]
    pub const fn is_elevated(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Member => write!(f, "member"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

/// A verified actor. Only produced by authentication or session restore;
/// anonymous requests carry no `Principal` at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub id: PrincipalId,
    pub username: String,
    pub role: Role,
}

/// A principal together with its stored password hash.
///
/// Never leaves the credential store and the authentication step.
#[derive(Clone)]
pub struct CredentialRecord {
    principal: Principal,
    password_hash: String,
}

impl std::fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("principal", &self.principal)
            .field("password_hash", &"<redacted>")
            .finish()
    }
}

impl CredentialRecord {
    #[must_use]
    pub fn new(principal: Principal, password_hash: String) -> Self {
        Self {
            principal,
            password_hash,
        }
    }

    /// ## Summary
    /// Reads a credential record out of a `users` document.
    ///
    /// Returns `None` if the document lacks a username or password hash. An
    /// unknown or missing role reads as `member`.
    #[must_use]
    pub fn from_document(doc: &Document) -> Option<Self> {
        let username = doc.get_str("username")?;
        let password_hash = doc.get_str("password")?;
        let role = doc
            .get("role")
            .cloned()
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or_default();

        Some(Self::new(
            Principal {
                id: doc.id,
                username: username.to_string(),
                role,
            },
            password_hash.to_string(),
        ))
    }

    #[must_use]
    pub fn id(&self) -> PrincipalId {
        self.principal.id
    }

    #[must_use]
    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    /// Drops the password hash.
    #[must_use]
    pub fn into_principal(self) -> Principal {
        self.principal
    }
}
