use std::sync::Arc;

use thiserror::Error;

use folio_core::config::BootstrapAdminConfig;

use super::credential::CredentialStore;
use super::password::password_matches_blocking;
use super::principal::{CredentialRecord, Principal, Role};
use crate::error::{ServiceError, ServiceResult};
use crate::resource::{UserInput, UserService};

/// Why a login attempt failed.
///
/// Both variants render identically; the distinction is only for trace logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("Invalid credentials")]
    NoSuchPrincipal,
    #[error("Invalid credentials")]
    BadCredential,
}

/// Verifies username / password pairs against the credential store.
#[derive(Clone)]
pub struct Authenticator {
    credentials: Arc<dyn CredentialStore>,
}

impl Authenticator {
    #[must_use]
    pub fn new(credentials: Arc<dyn CredentialStore>) -> Self {
        Self { credentials }
    }

    /// ## Summary
    /// Authenticates a username / password pair.
    ///
    /// The inner result carries the expected outcomes: the verified
    /// `Principal` (without its hash) or a `Rejection`.
    ///
    /// ## Errors
    /// Returns an error only if the credential lookup or the hashing task fails.
    #[tracing::instrument(skip(self, password))]
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> ServiceResult<Result<Principal, Rejection>> {
        let Some(record) = self.credentials.find_by_username(username).await? else {
            tracing::trace!(rejection = ?Rejection::NoSuchPrincipal, "Login rejected");
            return Ok(Err(Rejection::NoSuchPrincipal));
        };

        let matches =
            password_matches_blocking(password.to_string(), record.password_hash().to_string())
                .await?;
        if !matches {
            tracing::trace!(user_id = %record.id(), rejection = ?Rejection::BadCredential, "Login rejected");
            return Ok(Err(Rejection::BadCredential));
        }

        let principal = record.into_principal();
        tracing::debug!(user_id = %principal.id, "Login accepted");
        Ok(Ok(principal))
    }
}

/// ## Summary
/// Makes sure the configured bootstrap account exists with the admin role.
///
/// An existing user with the same username is left untouched.
///
/// ## Errors
/// Returns an error if the user cannot be looked up or created.
#[tracing::instrument(skip(users, config), fields(username = %config.username))]
pub async fn ensure_bootstrap_admin(
    users: &UserService,
    config: &BootstrapAdminConfig,
) -> ServiceResult<Principal> {
    if let Some(doc) = users.find_by_username(&config.username).await? {
        let record = CredentialRecord::from_document(&doc).ok_or_else(|| {
            ServiceError::InvalidConfiguration(format!(
                "Bootstrap user {} exists without credentials",
                config.username
            ))
        })?;
        tracing::debug!(user_id = %record.id(), "Bootstrap admin already exists");
        return Ok(record.into_principal());
    }

    let input = UserInput {
        name: Some(config.name.clone()),
        username: Some(config.username.clone()),
        email: None,
        password: Some(config.password.clone()),
    };
    let id = users.create_with_role(input, Role::Admin).await?;
    tracing::info!(user_id = %id, "Bootstrap admin created");

    Ok(Principal {
        id,
        username: config.username.clone(),
        role: Role::Admin,
    })
}
