pub mod api;

use std::sync::Arc;

use salvo::Router;
use salvo::logging::Logger;

use crate::config::{ConfigHandler, Settings};
use crate::services::{AppServices, ServicesHandler};

/// ## Summary
/// Assembles the full application router: request logging, depot providers,
/// and the API routes.
#[must_use]
pub fn router(settings: Settings, services: Arc<AppServices>) -> Router {
    Router::new()
        .hoop(Logger::new())
        .hoop(ConfigHandler { settings })
        .hoop(ServicesHandler { services })
        .push(api::routes())
}
