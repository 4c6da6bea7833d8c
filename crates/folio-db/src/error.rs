use thiserror::Error;

/// Database layer errors
#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] diesel::result::Error),

    #[error("Pool error: {0}")]
    PoolError(#[from] diesel_async::pooled_connection::bb8::RunError),

    #[error("Unique constraint violated: {0}")]
    Conflict(String),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error("Malformed document {id}: {reason}")]
    MalformedDocument { id: uuid::Uuid, reason: String },

    #[error(transparent)]
    CoreError(#[from] folio_core::error::CoreError),
}

pub type DbResult<T> = std::result::Result<T, DbError>;
