//! In-process backends for development and tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Bound;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use folio_core::constants::USERS_COLLECTION;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::db::store::{DocumentStore, SessionStore};
use crate::error::{DbError, DbResult};
use crate::model::{
    document::{Document, DocumentId, Fields, Filter},
    session::SessionRecord,
};

type CollectionMap = BTreeMap<DocumentId, Fields>;

const USERNAME_FIELD: &str = "username";

fn username_of(fields: &Fields) -> Option<&str> {
    fields.get(USERNAME_FIELD).and_then(Value::as_str)
}

fn username_conflict(username: &str) -> DbError {
    DbError::Conflict(format!("{USERS_COLLECTION}.{USERNAME_FIELD} = {username:?}"))
}

/// Same rule as `document_users_username_idx`: within `users`, no two
/// documents share a username. Checked under the collection's write lock.
fn check_username(
    collection: &str,
    docs: &CollectionMap,
    id: DocumentId,
    candidate: &Fields,
) -> DbResult<()> {
    if collection != USERS_COLLECTION {
        return Ok(());
    }
    let Some(username) = username_of(candidate) else {
        return Ok(());
    };
    let taken = docs
        .iter()
        .any(|(other, fields)| *other != id && username_of(fields) == Some(username));
    if taken {
        return Err(username_conflict(username));
    }
    Ok(())
}

/// Whole-collection form of [`check_username`] for bulk writes.
fn check_usernames(collection: &str, docs: &CollectionMap) -> DbResult<()> {
    if collection != USERS_COLLECTION {
        return Ok(());
    }
    let mut seen = HashSet::new();
    for username in docs.values().filter_map(username_of) {
        if !seen.insert(username) {
            return Err(username_conflict(username));
        }
    }
    Ok(())
}

#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, CollectionMap>>,
}

impl MemoryDocumentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn find_one(&self, collection: &str, id: DocumentId) -> DbResult<Option<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(&id))
            .map(|fields| Document::new(id, fields.clone())))
    }

    async fn insert_one(&self, collection: &str, fields: Fields) -> DbResult<DocumentId> {
        let id = uuid::Uuid::now_v7();
        let mut collections = self.collections.write().await;
        let target = collections.entry(collection.to_string()).or_default();
        check_username(collection, target, id, &fields)?;
        target.insert(id, fields);
        Ok(id)
    }

    async fn insert_many(&self, collection: &str, docs: Vec<Fields>) -> DbResult<Vec<DocumentId>> {
        let mut collections = self.collections.write().await;
        let target = collections.entry(collection.to_string()).or_default();

        // All or nothing, like a single multi-row INSERT.
        let mut next = target.clone();
        let mut ids = Vec::with_capacity(docs.len());
        for fields in docs {
            let id = uuid::Uuid::now_v7();
            next.insert(id, fields);
            ids.push(id);
        }
        check_usernames(collection, &next)?;
        *target = next;
        Ok(ids)
    }

    async fn update_one(&self, collection: &str, id: DocumentId, patch: Fields) -> DbResult<u64> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let Some(mut merged) = docs.get(&id).cloned() else {
            return Ok(0);
        };
        merged.extend(patch);
        check_username(collection, docs, id, &merged)?;
        docs.insert(id, merged);
        Ok(1)
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        patch: Fields,
    ) -> DbResult<u64> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let mut next = docs.clone();
        let mut matched = 0;
        for fields in next.values_mut().filter(|fields| filter.matches(fields)) {
            fields.extend(patch.clone());
            matched += 1;
        }
        check_usernames(collection, &next)?;
        *docs = next;
        Ok(matched)
    }

    async fn replace_one(
        &self,
        collection: &str,
        id: DocumentId,
        fields: Fields,
    ) -> DbResult<u64> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(0);
        };
        if !docs.contains_key(&id) {
            return Ok(0);
        }
        check_username(collection, docs, id, &fields)?;
        docs.insert(id, fields);
        Ok(1)
    }

    async fn delete_one(&self, collection: &str, id: DocumentId) -> DbResult<u64> {
        let mut collections = self.collections.write().await;
        let removed = collections
            .get_mut(collection)
            .and_then(|docs| docs.remove(&id));
        Ok(u64::from(removed.is_some()))
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> DbResult<u64> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|_, fields| !filter.matches(fields));
        Ok((before - docs.len()) as u64)
    }

    async fn find_page(
        &self,
        collection: &str,
        filter: &Filter,
        after: Option<DocumentId>,
        limit: usize,
    ) -> DbResult<Vec<Document>> {
        let collections = self.collections.read().await;
        let Some(docs) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let range = match after {
            Some(after) => docs.range((Bound::Excluded(after), Bound::Unbounded)),
            None => docs.range(..),
        };

        Ok(range
            .filter(|(_, fields)| filter.matches(fields))
            .take(limit)
            .map(|(id, fields)| Document::new(*id, fields.clone()))
            .collect())
    }
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, SessionRecord>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn insert(&self, record: SessionRecord) -> DbResult<()> {
        self.sessions
            .write()
            .await
            .insert(record.token_hash.clone(), record);
        Ok(())
    }

    async fn find_active(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> DbResult<Option<SessionRecord>> {
        let mut sessions = self.sessions.write().await;
        let Some(record) = sessions.get(token_hash).cloned() else {
            return Ok(None);
        };
        if record.is_expired(now) {
            sessions.remove(token_hash);
            return Ok(None);
        }
        Ok(Some(record))
    }

    async fn touch(&self, token_hash: &str, expires_at: DateTime<Utc>) -> DbResult<bool> {
        let mut sessions = self.sessions.write().await;
        let Some(record) = sessions.get_mut(token_hash) else {
            return Ok(false);
        };
        record.expires_at = expires_at;
        Ok(true)
    }

    async fn remove(&self, token_hash: &str) -> DbResult<bool> {
        Ok(self.sessions.write().await.remove(token_hash).is_some())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> DbResult<u64> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, record| !record.is_expired(now));
        Ok((before - sessions.len()) as u64)
    }
}
