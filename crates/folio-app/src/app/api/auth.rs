use salvo::http::StatusCode;
use salvo::writing::Json;
use salvo::{Depot, Request, Response, Router, handler};
use serde::{Deserialize, Serialize};

use folio_core::constants::{LOGIN_ROUTE_COMPONENT, LOGOUT_ROUTE_COMPONENT};
use folio_service::auth::{Principal, get_session_id_from_depot};

use super::parse_input;
use crate::config::get_config_from_depot;
use crate::error::{AppError, AppResult};
use crate::middleware::session::{cleared_session_cookie, session_cookie};
use crate::services::get_services_from_depot;

/// ## Summary
/// Login request payload. Missing fields are treated as empty and fail
/// verification like any other wrong credential.
#[derive(Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// ## Summary
/// Login response payload
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub status: &'static str,
    pub user: Principal,
}

/// ## Summary
/// POST /login - Verify a username and password and start a session
///
/// ## Side Effects
/// - Ends the session presented with the request, if any
/// - Stores a new session and sets the session cookie
///
/// ## Errors
/// Returns HTTP 400 if the body cannot be parsed
/// Returns HTTP 401 with "Invalid credentials" for an unknown user or a wrong password
/// Returns HTTP 500 if a store operation fails
#[handler]
async fn login(req: &mut Request, depot: &mut Depot, res: &mut Response) -> AppResult<()> {
    tracing::debug!("Processing login request");

    let services = get_services_from_depot(depot)?;
    let config = get_config_from_depot(depot)?;
    let login_request: LoginRequest = parse_input(req).await?;

    let principal = match services
        .authenticator
        .authenticate(&login_request.username, &login_request.password)
        .await?
    {
        Ok(principal) => principal,
        Err(rejection) => {
            tracing::trace!(?rejection, "Login rejected");
            return Err(AppError::InvalidCredentials);
        }
    };

    // A new login always gets a fresh id.
    if let Some(previous) = get_session_id_from_depot(depot) {
        services.sessions.end(previous).await?;
    }

    let session_id = services.sessions.establish(&principal).await?;
    res.add_cookie(session_cookie(&config.session, session_id.into_string()));

    tracing::info!(user_id = %principal.id, "User logged in");
    res.render(Json(LoginResponse {
        status: "ok",
        user: principal,
    }));
    Ok(())
}

/// ## Summary
/// GET|POST /logout - End the current session
///
/// The cookie is cleared even if no session was found.
///
/// ## Errors
/// Returns HTTP 500 if the session store fails
#[handler]
async fn logout(depot: &mut Depot, res: &mut Response) -> AppResult<()> {
    let services = get_services_from_depot(depot)?;
    let config = get_config_from_depot(depot)?;

    if let Some(session_id) = get_session_id_from_depot(depot) {
        services.sessions.end(session_id).await?;
    }

    res.add_cookie(cleared_session_cookie(&config.session));
    res.status_code(StatusCode::NO_CONTENT);
    Ok(())
}

#[must_use]
pub fn routes() -> Router {
    Router::new()
        .push(Router::with_path(LOGIN_ROUTE_COMPONENT).post(login))
        .push(
            Router::with_path(LOGOUT_ROUTE_COMPONENT)
                .get(logout)
                .post(logout),
        )
}
