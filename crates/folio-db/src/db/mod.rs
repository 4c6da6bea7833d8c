use crate::error::DbResult;
use std::future::Future;
use std::pin::Pin;

pub mod aggregate;
pub mod collection;
pub mod connection;
pub mod memory;
pub mod migrate;
pub mod postgres;
pub mod schema;
pub mod store;

pub use collection::{Collection, Cursor};
pub use store::{DocumentStore, SessionStore};

pub trait DbProvider: Send + Sync {
    fn get_connection<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = DbResult<connection::DbConnection<'a>>> + Send + 'a>>;
}
