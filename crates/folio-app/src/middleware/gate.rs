use salvo::Depot;
use salvo::http::Method;

use folio_service::auth::gate::{self, AccessDecision, AccessRule, DenyReason};
use folio_service::auth::get_principal_from_depot;

use crate::error::AppError;
use crate::services::get_services_from_depot;

/// Which guarded collection a gate protects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateTarget {
    Users,
    Articles,
}

/// ## Summary
/// Access gate for `/{collection}/{id}` routes. Reads need an authenticated
/// principal; mutations need the owner or an elevated role.
pub struct AccessGate {
    target: GateTarget,
}

impl AccessGate {
    #[must_use]
    pub const fn new(target: GateTarget) -> Self {
        Self { target }
    }
}

/// The rule applied to a method, or `None` if the gate lets it through.
#[must_use]
pub fn rule_for(method: &Method) -> Option<AccessRule> {
    match *method {
        Method::GET | Method::HEAD => Some(AccessRule::Authenticated),
        Method::PUT | Method::PATCH | Method::DELETE => Some(AccessRule::OwnerOrElevated),
        _ => None,
    }
}

/// ## Summary
/// Evaluates the route's rule for the depot principal before the handler runs.
///
/// A malformed id is left to the handler, which answers 404, except that an
/// anonymous caller is still rejected first.
///
/// ## Errors
/// Renders 401 for anonymous callers, 403 for non-owners, and 500 if the
/// ownership lookup fails.
#[salvo::async_trait]
impl salvo::Handler for AccessGate {
    #[tracing::instrument(skip(self, req, depot, res, ctrl), fields(
        target = ?self.target,
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
        let Some(rule) = rule_for(req.method()) else {
            return;
        };

        let services = match get_services_from_depot(depot) {
            Ok(s) => s,
            Err(e) => {
                e.render_into(res);
                ctrl.skip_rest();
                return;
            }
        };
        let principal = get_principal_from_depot(depot);

        let Some(id) = req.param::<uuid::Uuid>("id") else {
            if principal.is_none() {
                AppError::AuthenticationRequired.render_into(res);
                ctrl.skip_rest();
            }
            return;
        };

        let target = match self.target {
            GateTarget::Users => &services.guarded_users,
            GateTarget::Articles => &services.guarded_articles,
        };

        match gate::check(principal, target, id, rule).await {
            Ok(AccessDecision::Allow) => {}
            Ok(AccessDecision::Deny(reason)) => {
                tracing::debug!(%reason, "Access denied");
                let err = match reason {
                    DenyReason::AuthenticationRequired => AppError::AuthenticationRequired,
                    DenyReason::NotOwner => AppError::Forbidden,
                };
                err.render_into(res);
                ctrl.skip_rest();
            }
            Err(e) => {
                AppError::from(e).render_into(res);
                ctrl.skip_rest();
            }
        }
    }
}
