//! Storage traits implemented by every backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::db::aggregate::{Pipeline, Stage};
use crate::error::DbResult;
use crate::model::{
    document::{Document, DocumentId, Fields, Filter},
    session::SessionRecord,
};

/// Page size used when a default method has to walk a whole collection.
pub const SCAN_BATCH_SIZE: usize = 256;

/// Document store holding named collections of JSON documents.
///
/// Counts follow the usual document-database conventions: `update_*` and
/// `replace_one` return the number of matched documents, `delete_*` the
/// number of deleted ones.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find_one(&self, collection: &str, id: DocumentId) -> DbResult<Option<Document>>;

    async fn insert_one(&self, collection: &str, fields: Fields) -> DbResult<DocumentId>;

    async fn insert_many(&self, collection: &str, docs: Vec<Fields>) -> DbResult<Vec<DocumentId>>;

    /// Merges `patch` into the top-level fields of the document.
    async fn update_one(&self, collection: &str, id: DocumentId, patch: Fields) -> DbResult<u64>;

    async fn update_many(&self, collection: &str, filter: &Filter, patch: Fields)
    -> DbResult<u64>;

    /// Replaces the whole body, keeping the id.
    async fn replace_one(&self, collection: &str, id: DocumentId, fields: Fields)
    -> DbResult<u64>;

    async fn delete_one(&self, collection: &str, id: DocumentId) -> DbResult<u64>;

    async fn delete_many(&self, collection: &str, filter: &Filter) -> DbResult<u64>;

    /// Returns up to `limit` matching documents with ids strictly greater than
    /// `after`, ordered by id.
    async fn find_page(
        &self,
        collection: &str,
        filter: &Filter,
        after: Option<DocumentId>,
        limit: usize,
    ) -> DbResult<Vec<Document>>;

    async fn find_first(&self, collection: &str, filter: &Filter) -> DbResult<Option<Document>> {
        Ok(self
            .find_page(collection, filter, None, 1)
            .await?
            .into_iter()
            .next())
    }

    /// ## Summary
    /// Runs an aggregation pipeline over the collection.
    ///
    /// A leading `Match` stage is pushed down into the scan; the remaining
    /// stages are evaluated over the scanned records.
    async fn aggregate(&self, collection: &str, pipeline: &Pipeline) -> DbResult<Vec<Fields>> {
        let (filter, rest) = match pipeline.stages() {
            [Stage::Match(filter), rest @ ..] => (filter.clone(), rest),
            stages => (Filter::all(), stages),
        };

        let mut records = Vec::new();
        let mut after = None;
        loop {
            let page = self
                .find_page(collection, &filter, after, SCAN_BATCH_SIZE)
                .await?;
            let Some(last) = page.last() else {
                break;
            };
            after = Some(last.id);
            let full_page = page.len() == SCAN_BATCH_SIZE;
            records.extend(page.into_iter().map(Document::into_record));
            if !full_page {
                break;
            }
        }

        Ok(Pipeline::run_stages(rest, records))
    }
}

/// Server-side session persistence keyed by the hashed session id.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, record: SessionRecord) -> DbResult<()>;

    /// Returns the entry if it exists and has not expired at `now`.
    /// Expired entries are removed when encountered.
    async fn find_active(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> DbResult<Option<SessionRecord>>;

    /// Moves the expiry of an existing entry. Returns `false` if it is gone.
    async fn touch(&self, token_hash: &str, expires_at: DateTime<Utc>) -> DbResult<bool>;

    /// Removes the entry. Returns `false` if there was nothing to remove.
    async fn remove(&self, token_hash: &str) -> DbResult<bool>;

    /// Removes every entry expired at `now`, returning how many were dropped.
    async fn purge_expired(&self, now: DateTime<Utc>) -> DbResult<u64>;
}
