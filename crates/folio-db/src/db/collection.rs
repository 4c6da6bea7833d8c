//! Named-collection handle and keyset cursor over a `DocumentStore`.

use std::sync::Arc;

use futures::{Stream, StreamExt, TryStreamExt, stream};

use crate::db::{aggregate::Pipeline, store::DocumentStore};
use crate::error::{DbError, DbResult};
use crate::model::document::{Document, DocumentId, Fields, Filter};

pub const DEFAULT_CURSOR_BATCH_SIZE: usize = 100;

/// A store bound to one collection name.
#[derive(Clone)]
pub struct Collection {
    store: Arc<dyn DocumentStore>,
    name: &'static str,
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection").field("name", &self.name).finish()
    }
}

impl Collection {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, name: &'static str) -> Self {
        Self { store, name }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// ## Errors
    /// Returns an error if the backend fails.
    pub async fn find_one(&self, id: DocumentId) -> DbResult<Option<Document>> {
        self.store.find_one(self.name, id).await
    }

    /// ## Errors
    /// Returns an error if the backend fails.
    pub async fn find_first(&self, filter: &Filter) -> DbResult<Option<Document>> {
        self.store.find_first(self.name, filter).await
    }

    /// ## Errors
    /// Returns an error if the backend fails.
    pub async fn insert_one(&self, fields: Fields) -> DbResult<DocumentId> {
        self.store.insert_one(self.name, fields).await
    }

    /// ## Errors
    /// Returns an error if the backend fails.
    pub async fn insert_many(&self, docs: Vec<Fields>) -> DbResult<Vec<DocumentId>> {
        self.store.insert_many(self.name, docs).await
    }

    /// ## Errors
    /// Returns an error if the backend fails.
    pub async fn update_one(&self, id: DocumentId, patch: Fields) -> DbResult<u64> {
        self.store.update_one(self.name, id, patch).await
    }

    /// ## Errors
    /// Returns an error if the backend fails.
    pub async fn update_many(&self, filter: &Filter, patch: Fields) -> DbResult<u64> {
        self.store.update_many(self.name, filter, patch).await
    }

    /// ## Errors
    /// Returns an error if the backend fails.
    pub async fn replace_one(&self, id: DocumentId, fields: Fields) -> DbResult<u64> {
        self.store.replace_one(self.name, id, fields).await
    }

    /// ## Errors
    /// Returns an error if the backend fails.
    pub async fn delete_one(&self, id: DocumentId) -> DbResult<u64> {
        self.store.delete_one(self.name, id).await
    }

    /// ## Errors
    /// Returns an error if the backend fails.
    pub async fn delete_many(&self, filter: &Filter) -> DbResult<u64> {
        self.store.delete_many(self.name, filter).await
    }

    /// ## Errors
    /// Returns an error if the backend fails.
    pub async fn aggregate(&self, pipeline: &Pipeline) -> DbResult<Vec<Fields>> {
        self.store.aggregate(self.name, pipeline).await
    }

    /// ## Summary
    /// Opens a lazy cursor over the matching documents. Nothing is read until
    /// the first batch is requested.
    #[must_use]
    pub fn find(&self, filter: Filter) -> Cursor {
        Cursor::new(self.clone(), filter, DEFAULT_CURSOR_BATCH_SIZE)
    }
}

/// Lazy, finite, restartable sequence of documents.
///
/// Pages by id (keyset), so documents inserted behind the cursor position are
/// not revisited and the sequence always terminates.
#[derive(Debug)]
pub struct Cursor {
    collection: Collection,
    filter: Filter,
    batch_size: usize,
    position: Option<DocumentId>,
    exhausted: bool,
}

impl Cursor {
    #[must_use]
    pub fn new(collection: Collection, filter: Filter, batch_size: usize) -> Self {
        Self {
            collection,
            filter,
            batch_size: batch_size.max(1),
            position: None,
            exhausted: false,
        }
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// ## Summary
    /// Fetches the next batch, or `None` once the sequence is exhausted.
    ///
    /// ## Errors
    /// Returns an error if the backend fails; the cursor position is unchanged.
    pub async fn next_batch(&mut self) -> DbResult<Option<Vec<Document>>> {
        if self.exhausted {
            return Ok(None);
        }

        let batch = self
            .collection
            .store
            .find_page(
                self.collection.name,
                &self.filter,
                self.position,
                self.batch_size,
            )
            .await?;

        if batch.len() < self.batch_size {
            self.exhausted = true;
        }
        match batch.last() {
            Some(last) => {
                self.position = Some(last.id);
                Ok(Some(batch))
            }
            None => Ok(None),
        }
    }

    /// Restarts the sequence from the beginning.
    pub fn rewind(&mut self) {
        self.position = None;
        self.exhausted = false;
    }

    /// ## Summary
    /// Drains the remaining documents into a vector.
    ///
    /// ## Errors
    /// Returns the first backend error encountered.
    pub async fn collect_all(&mut self) -> DbResult<Vec<Document>> {
        let mut out = Vec::new();
        while let Some(batch) = self.next_batch().await? {
            out.extend(batch);
        }
        Ok(out)
    }

    /// ## Summary
    /// Converts the cursor into a stream of documents.
    pub fn into_stream(self) -> impl Stream<Item = DbResult<Document>> + Send {
        stream::try_unfold(self, |mut cursor| async move {
            Ok::<_, DbError>(cursor.next_batch().await?.map(|batch| (batch, cursor)))
        })
        .map_ok(|batch| stream::iter(batch.into_iter().map(Ok::<_, DbError>)))
        .try_flatten()
        .boxed()
    }
}
