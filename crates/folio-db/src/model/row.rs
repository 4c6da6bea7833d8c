use diesel::{pg::Pg, prelude::*};

use crate::db::schema;
use crate::error::{DbError, DbResult};
use crate::model::{
    document::{Document, DocumentId},
    session::SessionRecord,
};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = schema::document)]
#[diesel(check_for_backend(Pg))]
pub struct DocumentRow {
    pub id: uuid::Uuid,
    pub collection: String,
    pub body: serde_json::Value,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl DocumentRow {
    /// ## Summary
    /// Converts the row into a `Document`.
    ///
    /// ## Errors
    /// Returns `MalformedDocument` if the stored body is not a JSON object.
    pub fn into_document(self) -> DbResult<Document> {
        match self.body {
            serde_json::Value::Object(fields) => Ok(Document::new(self.id, fields)),
            other => Err(DbError::MalformedDocument {
                id: self.id,
                reason: format!("body is not an object: {other}"),
            }),
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::document)]
pub struct NewDocumentRow<'a> {
    pub id: DocumentId,
    pub collection: &'a str,
    pub body: serde_json::Value,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = schema::session)]
#[diesel(check_for_backend(Pg))]
pub struct SessionRow {
    pub token_hash: String,
    pub principal: String,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

impl From<SessionRow> for SessionRecord {
    fn from(row: SessionRow) -> Self {
        Self {
            token_hash: row.token_hash,
            principal: row.principal,
            expires_at: row.expires_at,
        }
    }
}

impl From<SessionRecord> for SessionRow {
    fn from(record: SessionRecord) -> Self {
        Self {
            token_hash: record.token_hash,
            principal: record.principal,
            expires_at: record.expires_at,
        }
    }
}
