use std::sync::Arc;

use salvo::async_trait;

use folio_core::config::{DatabaseConfig, SessionConfig, StorageBackend};
use folio_core::constants::{ARTICLES_COLLECTION, USERS_COLLECTION};
use folio_core::error::CoreError;
use folio_db::db::connection::create_pool;
use folio_db::db::memory::{MemoryDocumentStore, MemorySessionStore};
use folio_db::db::migrate::run_migrations;
use folio_db::db::postgres::{PgDocumentStore, PgSessionStore};
use folio_db::db::{Collection, DocumentStore, SessionStore};
use folio_service::auth::{
    Authenticator, DocumentCredentialStore, GuardedCollection, Ownership, SessionManager,
};
use folio_service::error::ServiceResult;
use folio_service::resource::{ArticleService, UserService};

use crate::error::AppResult;

/// Everything a request handler needs, built once at startup.
#[derive(Clone)]
pub struct AppServices {
    pub users: UserService,
    pub articles: ArticleService,
    pub authenticator: Authenticator,
    pub sessions: SessionManager,
    pub guarded_users: GuardedCollection,
    pub guarded_articles: GuardedCollection,
}

impl AppServices {
    /// ## Summary
    /// Wires the resource and auth services over the given stores.
    ///
    /// ## Errors
    /// Returns an error if the session TTL is out of range.
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        sessions: Arc<dyn SessionStore>,
        session_config: &SessionConfig,
    ) -> ServiceResult<Self> {
        let users = Collection::new(Arc::clone(&documents), USERS_COLLECTION);
        let articles = Collection::new(documents, ARTICLES_COLLECTION);
        let credentials = Arc::new(DocumentCredentialStore::new(users.clone()));

        Ok(Self {
            users: UserService::new(users.clone()),
            articles: ArticleService::new(articles.clone()),
            authenticator: Authenticator::new(credentials.clone()),
            sessions: SessionManager::new(sessions, credentials, session_config.ttl())?,
            guarded_users: GuardedCollection::new(users, Ownership::SelfOwned),
            guarded_articles: GuardedCollection::new(articles, Ownership::OwnerField),
        })
    }

    /// ## Summary
    /// Services over fresh in-memory stores.
    ///
    /// ## Errors
    /// Returns an error if the session TTL is out of range.
    pub fn in_memory(session_config: &SessionConfig) -> ServiceResult<Self> {
        Self::new(
            Arc::new(MemoryDocumentStore::new()),
            Arc::new(MemorySessionStore::new()),
            session_config,
        )
    }
}

/// ## Summary
/// Opens the configured storage backend. For PostgreSQL the embedded
/// migrations are applied before the pool is handed out.
///
/// ## Errors
/// Returns an error if the database is unreachable or a migration fails.
pub async fn open_stores(
    config: &DatabaseConfig,
) -> anyhow::Result<(Arc<dyn DocumentStore>, Arc<dyn SessionStore>)> {
    match config.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            Ok((
                Arc::new(MemoryDocumentStore::new()),
                Arc::new(MemorySessionStore::new()),
            ))
        }
        StorageBackend::Postgres => {
            let url = config
                .url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("database.url is not set"))?;

            run_migrations(url).await?;
            let pool = create_pool(url, u32::from(config.max_connections)).await?;
            tracing::info!("Database connection pool created.");

            Ok((
                Arc::new(PgDocumentStore::new(pool.clone())),
                Arc::new(PgSessionStore::new(pool)),
            ))
        }
    }
}

pub struct ServicesHandler {
    pub services: Arc<AppServices>,
}

#[async_trait]
impl salvo::Handler for ServicesHandler {
    #[tracing::instrument(skip(self, _req, depot, _res, _ctrl))]
    async fn handle(
        &self,
        _req: &mut salvo::Request,
        depot: &mut salvo::Depot,
        _res: &mut salvo::Response,
        _ctrl: &mut salvo::FlowCtrl,
    ) {
        depot.inject(Arc::clone(&self.services));
    }
}

/// ## Summary
/// Retrieves the application services from the depot.
///
/// ## Errors
/// Returns an error if the services are not found in the depot.
pub fn get_services_from_depot(depot: &salvo::Depot) -> AppResult<Arc<AppServices>> {
    depot
        .obtain::<Arc<AppServices>>()
        .cloned()
        .map_err(|_err| CoreError::InvariantViolation("Services not found in depot").into())
}
