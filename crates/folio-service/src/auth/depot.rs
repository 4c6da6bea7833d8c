//! Depot helpers for reading the request's identity in Salvo handlers.

use crate::error::{ServiceError, ServiceResult};

use super::principal::Principal;

pub mod depot_keys {
    pub const AUTHENTICATED_PRINCIPAL: &str = "__authenticated_principal";
    pub const SESSION_ID: &str = "__session_id";
}

/// Get the authenticated principal from the depot, if any.
#[must_use]
pub fn get_principal_from_depot(depot: &salvo::Depot) -> Option<&Principal> {
    depot
        .get::<Principal>(depot_keys::AUTHENTICATED_PRINCIPAL)
        .ok()
}

/// Get the authenticated principal from the depot.
///
/// ## Errors
///
/// Returns `NotAuthenticated` if the request is anonymous.
pub fn require_principal(depot: &salvo::Depot) -> ServiceResult<&Principal> {
    get_principal_from_depot(depot).ok_or(ServiceError::NotAuthenticated)
}

/// Get the raw session id presented with the request, if any.
#[must_use]
pub fn get_session_id_from_depot(depot: &salvo::Depot) -> Option<&str> {
    depot
        .get::<String>(depot_keys::SESSION_ID)
        .ok()
        .map(String::as_str)
}
