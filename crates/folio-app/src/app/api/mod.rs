mod articles;
mod auth;
mod healthcheck;
mod users;
mod whoami;

use salvo::{Request, Router};
use serde::de::DeserializeOwned;

use folio_db::model::document::DocumentId;

use crate::error::{AppError, AppResult};
use crate::middleware::session::SessionMiddleware;

// Re-export route constants from core
pub use folio_core::constants::{
    ARTICLES_ROUTE_COMPONENT, ARTICLES_ROUTE_PREFIX, CURSOR_ROUTE_COMPONENT,
    LOGIN_ROUTE_COMPONENT, LOGOUT_ROUTE_COMPONENT, STATS_ROUTE_COMPONENT,
    USERS_ROUTE_COMPONENT, USERS_ROUTE_PREFIX, WHOAMI_ROUTE_COMPONENT,
};

/// ## Summary
/// Constructs the API router. Every route sees the restored session.
#[must_use]
pub fn routes() -> Router {
    Router::new()
        .hoop(SessionMiddleware)
        .push(healthcheck::routes())
        .push(auth::routes())
        .push(whoami::routes())
        .push(users::routes())
        .push(articles::routes())
}

/// ## Summary
/// Reads the `{id}` path parameter. Ids that are not UUIDs cannot name a
/// document, so they are reported as not found.
///
/// ## Errors
/// Returns `NotFound(resource)` if the parameter is missing or malformed.
fn path_id(req: &Request, resource: &'static str) -> AppResult<DocumentId> {
    req.param::<DocumentId>("id")
        .ok_or(AppError::NotFound(resource))
}

/// ## Summary
/// Parses a JSON or urlencoded form body.
///
/// ## Errors
/// Returns `BadRequest` if the body is missing, has another content type,
/// or does not deserialize.
async fn parse_input<T>(req: &mut Request) -> AppResult<T>
where
    T: DeserializeOwned + Send,
{
    req.parse_body::<T>().await.map_err(|e| {
        tracing::debug!(error = %e, "Failed to parse request body");
        AppError::BadRequest("Invalid request body".to_string())
    })
}
