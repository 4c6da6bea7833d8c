//! Per-request access gate applied before resource handlers run.
//!
//! Decisions are computed fresh on every call. The gate never mutates the
//! resource or the session.

use folio_db::db::Collection;
use folio_db::model::document::DocumentId;

use super::principal::{Principal, PrincipalId};
use crate::error::ServiceResult;
use crate::resource::articles;

/// Rule configured for a protected route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessRule {
    /// Any verified principal.
    Authenticated,
    /// The resource owner, or a principal with an elevated role.
    OwnerOrElevated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    AuthenticationRequired,
    NotOwner,
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AuthenticationRequired => write!(f, "authentication required"),
            Self::NotOwner => write!(f, "not the owner"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    Deny(DenyReason),
}

impl AccessDecision {
    #[must_use]
    pub const fn is_allowed(self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// How ownership is read from a collection's documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// A user owns its own document.
    SelfOwned,
    /// Owned by the principal recorded in the `ownerId` field.
    OwnerField,
}

/// A protected collection together with its ownership model.
#[derive(Debug, Clone)]
pub struct GuardedCollection {
    collection: Collection,
    ownership: Ownership,
}

impl GuardedCollection {
    #[must_use]
    pub fn new(collection: Collection, ownership: Ownership) -> Self {
        Self {
            collection,
            ownership,
        }
    }

    /// ## Summary
    /// Looks up the owner of a resource.
    ///
    /// The outer `Option` is `None` if the resource does not exist; the inner
    /// one is `None` if it exists but has no recorded owner.
    ///
    /// ## Errors
    /// Returns an error if the store fails.
    pub async fn owner_of(&self, id: DocumentId) -> ServiceResult<Option<Option<PrincipalId>>> {
        let Some(doc) = self.collection.find_one(id).await? else {
            return Ok(None);
        };
        Ok(Some(match self.ownership {
            Ownership::SelfOwned => Some(doc.id),
            Ownership::OwnerField => articles::owner_of(&doc),
        }))
    }
}

/// ## Summary
/// Evaluates `rule` for `principal` against resource `id` in `target`.
///
/// - no principal: `Deny(AuthenticationRequired)` without touching the store;
/// - resource missing: `Allow`, leaving the not-found answer to the handler;
/// - otherwise the rule decides.
///
/// ## Errors
/// Returns an error if the ownership lookup fails. Such failures are never
/// turned into a decision.
#[tracing::instrument(skip(principal, target), fields(user_id = ?principal.map(|p| p.id)))]
pub async fn check(
    principal: Option<&Principal>,
    target: &GuardedCollection,
    id: DocumentId,
    rule: AccessRule,
) -> ServiceResult<AccessDecision> {
    let Some(principal) = principal else {
        return Ok(AccessDecision::Deny(DenyReason::AuthenticationRequired));
    };

    let decision = match rule {
        AccessRule::Authenticated => AccessDecision::Allow,
        AccessRule::OwnerOrElevated => match target.owner_of(id).await? {
            None => AccessDecision::Allow,
            Some(_) if principal.role.is_elevated() => AccessDecision::Allow,
            Some(Some(owner)) if owner == principal.id => AccessDecision::Allow,
            Some(_) => AccessDecision::Deny(DenyReason::NotOwner),
        },
    };

    tracing::trace!(?decision, "Access decision");
    Ok(decision)
}
