use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::password_hash::rand_core::OsRng;
use argon2::{Algorithm, Argon2, Params, Version};

use crate::error::{ServiceError, ServiceResult};

/// Argon2id with the crate's default cost parameters. Digests record their
/// own parameters, so older hashes keep verifying if these change.
fn hasher() -> Argon2<'static> {
    Argon2::new(Algorithm::Argon2id, Version::V0x13, Params::default())
}

/// ## Summary
/// Produces a PHC-format Argon2id digest with a fresh random salt.
///
/// ## Errors
/// Returns `PasswordHashError` if hashing fails.
pub fn hash_password(password: &str) -> ServiceResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    hasher()
        .hash_password(password.as_bytes(), &salt)
        .map(|digest| digest.to_string())
        .map_err(|e| ServiceError::PasswordHashError(format!("Failed to hash password: {e}")))
}

/// ## Summary
/// Checks `password` against a stored PHC digest.
///
/// ## Errors
/// Returns `PasswordHashError` if the digest cannot be parsed and
/// `NotAuthenticated` if the password does not match.
pub fn verify_password(password: &str, password_hash: &str) -> ServiceResult<()> {
    let digest = PasswordHash::new(password_hash)
        .map_err(|e| ServiceError::PasswordHashError(format!("Invalid password hash: {e}")))?;

    if let Err(err) = hasher().verify_password(password.as_bytes(), &digest) {
        tracing::trace!(%err, "Password mismatch");
        return Err(ServiceError::NotAuthenticated);
    }
    Ok(())
}

/// ## Summary
/// Match / no-match check. A malformed stored hash counts as no match.
#[must_use]
pub fn password_matches(password: &str, password_hash: &str) -> bool {
    match verify_password(password, password_hash) {
        Ok(()) => true,
        Err(ServiceError::PasswordHashError(reason)) => {
            tracing::warn!(%reason, "Stored password hash is malformed");
            false
        }
        Err(_) => false,
    }
}

/// ## Summary
/// Hashes a password on the blocking thread pool.
///
/// ## Errors
/// Returns an error if hashing fails or the blocking task panics.
pub async fn hash_password_blocking(password: String) -> ServiceResult<String> {
    tokio::task::spawn_blocking(move || hash_password(&password)).await?
}

/// ## Summary
/// Runs [`password_matches`] on the blocking thread pool.
///
/// ## Errors
/// Returns an error only if the blocking task panics.
pub async fn password_matches_blocking(password: String, password_hash: String) -> ServiceResult<bool> {
    Ok(tokio::task::spawn_blocking(move || password_matches(&password, &password_hash)).await?)
}
