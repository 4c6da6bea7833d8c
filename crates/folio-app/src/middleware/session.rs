use salvo::Depot;
use salvo::http::cookie::time::Duration;
use salvo::http::cookie::{Cookie, SameSite};

use folio_core::config::SessionConfig;
use folio_service::auth::depot::depot_keys;

use crate::config::get_config_from_depot;
use crate::error::AppError;
use crate::services::get_services_from_depot;

/// ## Summary
/// Session middleware that restores the principal behind the session cookie
/// and stores it in the depot. Requests without a valid session continue
/// anonymously; protected routes reject them later.
///
/// ## Side Effects
/// Inserts the principal under `depot_keys::AUTHENTICATED_PRINCIPAL` and the
/// presented session id under `depot_keys::SESSION_ID`. Restoring a session
/// slides its expiry forward.
///
/// ## Errors
/// Returns an HTTP 500 response if the session or user store fails.
#[salvo::async_trait]
impl salvo::Handler for SessionMiddleware {
    #[tracing::instrument(skip(self, req, depot, res, ctrl), fields(
        method = %req.method(),
        path = %req.uri().path()
    ))]
    async fn handle(
        &self,
        req: &mut salvo::Request,
        depot: &mut Depot,
        res: &mut salvo::Response,
        ctrl: &mut salvo::FlowCtrl,
    ) {
        tracing::trace!("Restoring session");

        let config = match get_config_from_depot(depot) {
            Ok(cfg) => cfg,
            Err(e) => {
                e.render_into(res);
                ctrl.skip_rest();
                return;
            }
        };

        let services = match get_services_from_depot(depot) {
            Ok(s) => s,
            Err(e) => {
                e.render_into(res);
                ctrl.skip_rest();
                return;
            }
        };

        let Some(session_id) = req
            .cookie(&config.session.cookie_name)
            .map(|cookie| cookie.value().to_string())
        else {
            return;
        };

        match services.sessions.restore(&session_id).await {
            Ok(Some(principal)) => {
                tracing::debug!(user_id = %principal.id, "Session restored");
                res.add_cookie(session_cookie(&config.session, session_id.clone()));
                depot.insert(depot_keys::AUTHENTICATED_PRINCIPAL, principal);
            }
            Ok(None) => {
                tracing::debug!("Session cookie does not resolve to a principal, treating as anonymous");
            }
            Err(e) => {
                AppError::from(e).render_into(res);
                ctrl.skip_rest();
                return;
            }
        }

        depot.insert(depot_keys::SESSION_ID, session_id);
    }
}

/// ## Summary
/// Middleware handler for cookie sessions. Mount it above every route that
/// needs to know who is calling.
pub struct SessionMiddleware;

/// ## Summary
/// Builds the `HttpOnly` session cookie. Its lifetime matches the server-side
/// TTL and is refreshed whenever the session slides.
#[must_use]
pub fn session_cookie(config: &SessionConfig, session_id: String) -> Cookie<'static> {
    let ttl = i64::try_from(config.ttl_seconds).unwrap_or(i64::MAX);
    Cookie::build((config.cookie_name.clone(), session_id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.secure)
        .max_age(Duration::seconds(ttl))
        .build()
}

/// Builds a cookie that makes the client drop its session id.
#[must_use]
pub fn cleared_session_cookie(config: &SessionConfig) -> Cookie<'static> {
    Cookie::build((config.cookie_name.clone(), String::new()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.secure)
        .max_age(Duration::ZERO)
        .build()
}
