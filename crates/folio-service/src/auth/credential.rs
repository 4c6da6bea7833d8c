//! Credential lookups against the `users` collection.

use async_trait::async_trait;

use folio_db::db::Collection;
use folio_db::model::document::{Document, Filter};

use super::principal::{CredentialRecord, PrincipalId};
use crate::error::ServiceResult;

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> ServiceResult<Option<CredentialRecord>>;

    async fn find_by_id(&self, id: PrincipalId) -> ServiceResult<Option<CredentialRecord>>;
}

/// Reads credentials straight out of user documents.
#[derive(Debug, Clone)]
pub struct DocumentCredentialStore {
    users: Collection,
}

impl DocumentCredentialStore {
    #[must_use]
    pub fn new(users: Collection) -> Self {
        Self { users }
    }
}

fn to_record(doc: Option<Document>) -> Option<CredentialRecord> {
    let doc = doc?;
    let record = CredentialRecord::from_document(&doc);
    if record.is_none() {
        tracing::warn!(user_id = %doc.id, "User document has no usable credentials");
    }
    record
}

#[async_trait]
impl CredentialStore for DocumentCredentialStore {
    #[tracing::instrument(skip(self))]
    async fn find_by_username(&self, username: &str) -> ServiceResult<Option<CredentialRecord>> {
        let doc = self
            .users
            .find_first(&Filter::eq("username", username))
            .await?;
        Ok(to_record(doc))
    }

    #[tracing::instrument(skip(self))]
    async fn find_by_id(&self, id: PrincipalId) -> ServiceResult<Option<CredentialRecord>> {
        Ok(to_record(self.users.find_one(id).await?))
    }
}
