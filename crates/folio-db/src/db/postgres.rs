//! PostgreSQL backends. Documents live in a single table as JSONB bodies
//! keyed by collection name; sessions live in their own table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::expression_methods::PgJsonbExpressionMethods;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde_json::Value;

use crate::db::{
    DbProvider,
    connection::DbPool,
    schema::{document, session},
    store::{DocumentStore, SessionStore},
};
use crate::error::DbResult;
use crate::model::{
    document::{Document, DocumentId, Fields, Filter},
    row::{DocumentRow, NewDocumentRow, SessionRow},
    session::SessionRecord,
};

/// ## Summary
/// Returns a query selecting the documents of a collection that contain the
/// filter's fields. An empty filter is `{}`, which every object contains.
fn matching<'a>(
    collection: &'a str,
    filter: &Filter,
) -> document::BoxedQuery<'a, diesel::pg::Pg> {
    document::table
        .filter(document::collection.eq(collection))
        .filter(document::body.contains(filter.to_json()))
        .into_boxed()
}

fn page_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

#[derive(Clone)]
pub struct PgDocumentStore {
    pool: DbPool,
}

impl PgDocumentStore {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    #[tracing::instrument(skip(self))]
    async fn find_one(&self, collection: &str, id: DocumentId) -> DbResult<Option<Document>> {
        let mut conn = self.pool.get_connection().await?;
        let row = document::table
            .filter(document::collection.eq(collection))
            .filter(document::id.eq(id))
            .select(DocumentRow::as_select())
            .first(&mut conn)
            .await
            .optional()?;
        row.map(DocumentRow::into_document).transpose()
    }

    #[tracing::instrument(skip(self, fields))]
    async fn insert_one(&self, collection: &str, fields: Fields) -> DbResult<DocumentId> {
        let mut conn = self.pool.get_connection().await?;
        let id = uuid::Uuid::now_v7();
        diesel::insert_into(document::table)
            .values(&NewDocumentRow {
                id,
                collection,
                body: Value::Object(fields),
            })
            .execute(&mut conn)
            .await?;
        Ok(id)
    }

    #[tracing::instrument(skip(self, docs), fields(count = docs.len()))]
    async fn insert_many(&self, collection: &str, docs: Vec<Fields>) -> DbResult<Vec<DocumentId>> {
        if docs.is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<NewDocumentRow<'_>> = docs
            .into_iter()
            .map(|fields| NewDocumentRow {
                id: uuid::Uuid::now_v7(),
                collection,
                body: Value::Object(fields),
            })
            .collect();
        let ids = rows.iter().map(|row| row.id).collect();

        let mut conn = self.pool.get_connection().await?;
        diesel::insert_into(document::table)
            .values(&rows)
            .execute(&mut conn)
            .await?;
        Ok(ids)
    }

    #[tracing::instrument(skip(self, patch))]
    async fn update_one(&self, collection: &str, id: DocumentId, patch: Fields) -> DbResult<u64> {
        let mut conn = self.pool.get_connection().await?;
        let updated = diesel::update(
            document::table
                .filter(document::collection.eq(collection))
                .filter(document::id.eq(id)),
        )
        .set((
            document::body.eq(document::body.concat(Value::Object(patch))),
            document::updated_at.eq(Utc::now()),
        ))
        .execute(&mut conn)
        .await?;
        Ok(updated as u64)
    }

    #[tracing::instrument(skip(self, patch))]
    async fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        patch: Fields,
    ) -> DbResult<u64> {
        let mut conn = self.pool.get_connection().await?;
        let updated = diesel::update(
            document::table
                .filter(document::collection.eq(collection))
                .filter(document::body.contains(filter.to_json())),
        )
        .set((
            document::body.eq(document::body.concat(Value::Object(patch))),
            document::updated_at.eq(Utc::now()),
        ))
        .execute(&mut conn)
        .await?;
        Ok(updated as u64)
    }

    #[tracing::instrument(skip(self, fields))]
    async fn replace_one(
        &self,
        collection: &str,
        id: DocumentId,
        fields: Fields,
    ) -> DbResult<u64> {
        let mut conn = self.pool.get_connection().await?;
        let updated = diesel::update(
            document::table
                .filter(document::collection.eq(collection))
                .filter(document::id.eq(id)),
        )
        .set((
            document::body.eq(Value::Object(fields)),
            document::updated_at.eq(Utc::now()),
        ))
        .execute(&mut conn)
        .await?;
        Ok(updated as u64)
    }

    #[tracing::instrument(skip(self))]
    async fn delete_one(&self, collection: &str, id: DocumentId) -> DbResult<u64> {
        let mut conn = self.pool.get_connection().await?;
        let deleted = diesel::delete(
            document::table
                .filter(document::collection.eq(collection))
                .filter(document::id.eq(id)),
        )
        .execute(&mut conn)
        .await?;
        Ok(deleted as u64)
    }

    #[tracing::instrument(skip(self))]
    async fn delete_many(&self, collection: &str, filter: &Filter) -> DbResult<u64> {
        let mut conn = self.pool.get_connection().await?;
        let deleted = diesel::delete(
            document::table
                .filter(document::collection.eq(collection))
                .filter(document::body.contains(filter.to_json())),
        )
        .execute(&mut conn)
        .await?;
        Ok(deleted as u64)
    }

    #[tracing::instrument(skip(self))]
    async fn find_page(
        &self,
        collection: &str,
        filter: &Filter,
        after: Option<DocumentId>,
        limit: usize,
    ) -> DbResult<Vec<Document>> {
        let mut query = matching(collection, filter);
        if let Some(after) = after {
            query = query.filter(document::id.gt(after));
        }

        let mut conn = self.pool.get_connection().await?;
        let rows: Vec<DocumentRow> = query
            .order(document::id.asc())
            .limit(page_limit(limit))
            .select(DocumentRow::as_select())
            .load(&mut conn)
            .await?;

        rows.into_iter().map(DocumentRow::into_document).collect()
    }
}

#[derive(Clone)]
pub struct PgSessionStore {
    pool: DbPool,
}

impl PgSessionStore {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    #[tracing::instrument(skip_all)]
    async fn insert(&self, record: SessionRecord) -> DbResult<()> {
        let mut conn = self.pool.get_connection().await?;
        diesel::insert_into(session::table)
            .values(&SessionRow::from(record))
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, token_hash))]
    async fn find_active(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> DbResult<Option<SessionRecord>> {
        let mut conn = self.pool.get_connection().await?;
        let row = session::table
            .filter(session::token_hash.eq(token_hash))
            .filter(session::expires_at.gt(now))
            .select(SessionRow::as_select())
            .first(&mut conn)
            .await
            .optional()?;

        if row.is_none() {
            diesel::delete(
                session::table
                    .filter(session::token_hash.eq(token_hash))
                    .filter(session::expires_at.le(now)),
            )
            .execute(&mut conn)
            .await?;
        }

        Ok(row.map(SessionRecord::from))
    }

    #[tracing::instrument(skip(self, token_hash))]
    async fn touch(&self, token_hash: &str, expires_at: DateTime<Utc>) -> DbResult<bool> {
        let mut conn = self.pool.get_connection().await?;
        let updated = diesel::update(session::table.filter(session::token_hash.eq(token_hash)))
            .set(session::expires_at.eq(expires_at))
            .execute(&mut conn)
            .await?;
        Ok(updated > 0)
    }

    #[tracing::instrument(skip(self, token_hash))]
    async fn remove(&self, token_hash: &str) -> DbResult<bool> {
        let mut conn = self.pool.get_connection().await?;
        let deleted = diesel::delete(session::table.filter(session::token_hash.eq(token_hash)))
            .execute(&mut conn)
            .await?;
        Ok(deleted > 0)
    }

    #[tracing::instrument(skip(self))]
    async fn purge_expired(&self, now: DateTime<Utc>) -> DbResult<u64> {
        let mut conn = self.pool.get_connection().await?;
        let deleted = diesel::delete(session::table.filter(session::expires_at.le(now)))
            .execute(&mut conn)
            .await?;
        Ok(deleted as u64)
    }
}
