use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use folio_db::db::Collection;
use folio_db::db::aggregate::{Accumulator, Expr, Pipeline};
use folio_db::model::document::{Document, DocumentId, Fields, Filter, Projection};

use super::{CREATED_AT_FIELD, as_f64, as_u64, non_blank, timestamp_now};
use crate::auth::principal::{Principal, PrincipalId};
use crate::error::{ServiceError, ServiceResult};

/// Field recording the id of the principal that created the article.
pub const OWNER_FIELD: &str = "ownerId";

pub const LIST_PROJECTION: Projection =
    Projection::fields(&["title", "author", CREATED_AT_FIELD]);
pub const DETAIL_PROJECTION: Projection =
    Projection::fields(&["title", "author", "content", OWNER_FIELD, CREATED_AT_FIELD]);
pub const CURSOR_PROJECTION: Projection = Projection::fields(&["title", "author"]);

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArticleInput {
    pub title: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
}

/// One row of the per-author statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorStats {
    #[serde(rename = "_id")]
    pub author: Value,
    pub total_articles: u64,
    pub avg_title_length: Option<f64>,
}

fn require_title(input: &ArticleInput) -> ServiceResult<&str> {
    non_blank(input.title.as_ref())
        .ok_or_else(|| ServiceError::ValidationError("Title is required".to_string()))
}

/// ## Summary
/// Reads the owner of an article document.
///
/// Returns `None` for articles without a parsable owner; only elevated
/// principals may mutate those.
#[must_use]
pub fn owner_of(doc: &Document) -> Option<PrincipalId> {
    doc.get_str(OWNER_FIELD)
        .and_then(|owner| uuid::Uuid::parse_str(owner).ok())
}

#[derive(Debug, Clone)]
pub struct ArticleService {
    articles: Collection,
}

impl ArticleService {
    #[must_use]
    pub fn new(articles: Collection) -> Self {
        Self { articles }
    }

    #[must_use]
    pub fn collection(&self) -> &Collection {
        &self.articles
    }

    /// ## Errors
    /// Returns an error if the store fails.
    pub async fn list(&self) -> ServiceResult<Vec<Document>> {
        let docs = self.articles.find(Filter::all()).collect_all().await?;
        Ok(docs.iter().map(|doc| doc.project(&LIST_PROJECTION)).collect())
    }

    /// ## Errors
    /// Returns an error if the store fails.
    pub async fn get(&self, id: DocumentId) -> ServiceResult<Option<Document>> {
        let doc = self.articles.find_one(id).await?;
        Ok(doc.map(|doc| doc.project(&DETAIL_PROJECTION)))
    }

    /// ## Summary
    /// Creates an article owned by `owner`. The author defaults to the
    /// owner's username and the content to an empty string.
    ///
    /// ## Errors
    /// Returns `ValidationError` if the title is missing.
    #[tracing::instrument(skip(self, owner), fields(owner_id = %owner.id))]
    pub async fn create(&self, input: ArticleInput, owner: &Principal) -> ServiceResult<DocumentId> {
        let fields = Self::new_article_fields(&input, owner)?;
        let id = self.articles.insert_one(fields).await?;
        tracing::info!(article_id = %id, "Article created");
        Ok(id)
    }

    /// ## Summary
    /// Replaces title, content and author. Owner and creation time are kept.
    ///
    /// Returns `false` if the article does not exist.
    ///
    /// ## Errors
    /// Returns `ValidationError` if the title is missing.
    #[tracing::instrument(skip(self))]
    pub async fn replace(&self, id: DocumentId, input: ArticleInput) -> ServiceResult<bool> {
        let title = require_title(&input)?;
        let Some(existing) = self.articles.find_one(id).await? else {
            return Ok(false);
        };

        let author = non_blank(input.author.as_ref())
            .map(Value::from)
            .or_else(|| existing.get("author").cloned())
            .unwrap_or_default();

        let mut fields = Fields::new();
        fields.insert("title".to_string(), Value::from(title));
        fields.insert(
            "content".to_string(),
            Value::from(input.content.clone().unwrap_or_default()),
        );
        fields.insert("author".to_string(), author);
        for kept in [OWNER_FIELD, CREATED_AT_FIELD] {
            if let Some(value) = existing.get(kept) {
                fields.insert(kept.to_string(), value.clone());
            }
        }

        Ok(self.articles.replace_one(id, fields).await? > 0)
    }

    /// ## Summary
    /// Sets the provided fields. The owner cannot be changed this way.
    ///
    /// Returns `false` if the article does not exist.
    ///
    /// ## Errors
    /// Returns `ValidationError` if the title is present but blank.
    #[tracing::instrument(skip(self))]
    pub async fn update(&self, id: DocumentId, input: ArticleInput) -> ServiceResult<bool> {
        let patch = Self::patch_fields(&input)?;
        Ok(self.articles.update_one(id, patch).await? > 0)
    }

    /// ## Errors
    /// Returns an error if the store fails.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: DocumentId) -> ServiceResult<bool> {
        let deleted = self.articles.delete_one(id).await?;
        if deleted > 0 {
            tracing::info!(article_id = %id, "Article deleted");
        }
        Ok(deleted > 0)
    }

    /// ## Errors
    /// Returns `ValidationError` if any input lacks a title; nothing is
    /// inserted in that case.
    #[tracing::instrument(skip(self, inputs, owner), fields(count = inputs.len()))]
    pub async fn insert_many(
        &self,
        inputs: Vec<ArticleInput>,
        owner: &Principal,
    ) -> ServiceResult<Vec<DocumentId>> {
        let batch = inputs
            .iter()
            .map(|input| Self::new_article_fields(input, owner))
            .collect::<ServiceResult<Vec<_>>>()?;
        Ok(self.articles.insert_many(batch).await?)
    }

    /// ## Errors
    /// Returns `ValidationError` if the title is present but blank.
    #[tracing::instrument(skip(self))]
    pub async fn update_many(&self, filter: &Filter, input: ArticleInput) -> ServiceResult<u64> {
        let patch = Self::patch_fields(&input)?;
        Ok(self.articles.update_many(filter, patch).await?)
    }

    /// ## Errors
    /// Returns an error if the store fails.
    #[tracing::instrument(skip(self))]
    pub async fn delete_many(&self, filter: &Filter) -> ServiceResult<u64> {
        Ok(self.articles.delete_many(filter).await?)
    }

    /// ## Summary
    /// Streams every article through a cursor, returning `title` and `author`.
    ///
    /// ## Errors
    /// Returns the first store error hit while draining the cursor.
    pub async fn cursor_list(&self) -> ServiceResult<Vec<Document>> {
        Ok(self
            .articles
            .find(Filter::all())
            .into_stream()
            .map_ok(|doc| doc.project(&CURSOR_PROJECTION))
            .try_collect()
            .await?)
    }

    /// ## Summary
    /// Per-author article count and mean title length, most prolific first.
    ///
    /// ## Errors
    /// Returns an error if the aggregation fails.
    pub async fn stats(&self) -> ServiceResult<Vec<AuthorStats>> {
        let pipeline = Pipeline::new()
            .group(
                Some("author"),
                vec![
                    ("totalArticles", Accumulator::Count),
                    (
                        "avgTitleLength",
                        Accumulator::Avg(Expr::StrLen("title".to_string())),
                    ),
                ],
            )
            .sort("totalArticles", true);

        Ok(self
            .articles
            .aggregate(&pipeline)
            .await?
            .into_iter()
            .map(|mut record| AuthorStats {
                author: record.remove("_id").unwrap_or_default(),
                total_articles: as_u64(record.get("totalArticles")),
                avg_title_length: as_f64(record.get("avgTitleLength")),
            })
            .collect())
    }

    fn new_article_fields(input: &ArticleInput, owner: &Principal) -> ServiceResult<Fields> {
        let title = require_title(input)?;
        let author = non_blank(input.author.as_ref()).unwrap_or(owner.username.as_str());

        let mut fields = Fields::new();
        fields.insert("title".to_string(), Value::from(title));
        fields.insert(
            "content".to_string(),
            Value::from(input.content.clone().unwrap_or_default()),
        );
        fields.insert("author".to_string(), Value::from(author));
        fields.insert(OWNER_FIELD.to_string(), Value::from(owner.id.to_string()));
        fields.insert(CREATED_AT_FIELD.to_string(), timestamp_now());
        Ok(fields)
    }

    fn patch_fields(input: &ArticleInput) -> ServiceResult<Fields> {
        let mut patch = Fields::new();
        if input.title.is_some() {
            patch.insert("title".to_string(), Value::from(require_title(input)?));
        }
        if let Some(content) = &input.content {
            patch.insert("content".to_string(), Value::from(content.as_str()));
        }
        if let Some(author) = non_blank(input.author.as_ref()) {
            patch.insert("author".to_string(), Value::from(author));
        }
        Ok(patch)
    }
}
