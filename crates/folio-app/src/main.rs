use std::sync::Arc;
use std::time::Duration;

use folio_app::app::router;
use folio_app::services::{AppServices, open_stores};
use folio_core::config::load_config;
use folio_service::auth::{SessionManager, ensure_bootstrap_admin};
use salvo::Listener;
use salvo::conn::TcpListener;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt};

/// Drops expired sessions every `period`. Restores already ignore them; this
/// only keeps the store from growing.
fn spawn_session_reaper(sessions: SessionManager, period: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            match sessions.purge_expired().await {
                Ok(0) => {}
                Ok(purged) => tracing::debug!(purged, "Expired sessions purged"),
                Err(e) => tracing::warn!(error = %e, "Failed to purge expired sessions"),
            }
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (filter_layer, filter_handle) = reload::Layer::new(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .init();

    tracing::info!("Starting Folio server");

    let config = load_config()?;

    tracing::info!(config = ?config, "Configuration loaded");

    if let Ok(filter) = EnvFilter::try_new(config.logging.level.as_str()) {
        if let Err(e) = filter_handle.modify(|current| *current = filter) {
            tracing::warn!(error = %e, "Failed to update log filter from config");
        }
    } else {
        tracing::warn!(level = %config.logging.level, "Invalid log level in config, keeping debug");
    }

    let (documents, sessions) = open_stores(&config.database).await?;
    let services = AppServices::new(documents, sessions, &config.session)?;

    if let Some(admin) = &config.auth.bootstrap_admin {
        ensure_bootstrap_admin(&services.users, admin).await?;
    }

    spawn_session_reaper(services.sessions.clone(), config.session.ttl());

    let bind_addr = config.server.bind_addr();
    let acceptor = TcpListener::new(bind_addr.clone()).bind().await;

    let router = router(config, Arc::new(services));

    tracing::info!("Server listening on {bind_addr}");

    let server = salvo::Server::new(acceptor);
    let handle = server.handle();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for shutdown signal");
            return;
        }
        tracing::info!("Shutdown signal received");
        handle.stop_graceful(None);
    });
    server.serve(router).await;

    Ok(())
}
