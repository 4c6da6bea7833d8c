use std::collections::HashSet;

use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use folio_db::db::Collection;
use folio_db::db::aggregate::{Accumulator, Expr, Pipeline};
use folio_db::model::document::{Document, DocumentId, Fields, Filter, Projection};

use super::{CREATED_AT_FIELD, as_f64, as_u64, conflict_on_duplicate, non_blank, timestamp_now};
use crate::auth::password::hash_password_blocking;
use crate::auth::principal::Role;
use crate::error::{ServiceError, ServiceResult};

pub const LIST_PROJECTION: Projection =
    Projection::fields(&["name", "username", "email", CREATED_AT_FIELD]);
pub const DETAIL_PROJECTION: Projection = LIST_PROJECTION;
pub const CURSOR_PROJECTION: Projection = Projection::fields(&["name", "email"]);

const DUPLICATE_USERNAME: &str = "Username already taken";

/// User fields accepted from clients. The role is never client-settable.
#[derive(Clone, Default, Deserialize)]
pub struct UserInput {
    pub name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl std::fmt::Debug for UserInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserInput")
            .field("name", &self.name)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_users: u64,
    pub avg_name_length: Option<f64>,
}

/// Required fields of a full user document, borrowed from the input.
struct CompleteUser<'a> {
    name: &'a str,
    username: &'a str,
    password: &'a str,
}

impl UserInput {
    fn complete(&self) -> ServiceResult<CompleteUser<'_>> {
        match (
            non_blank(self.name.as_ref()),
            non_blank(self.username.as_ref()),
            non_blank(self.password.as_ref()),
        ) {
            (Some(name), Some(username), Some(password)) => Ok(CompleteUser {
                name,
                username,
                password,
            }),
            _ => Err(ServiceError::ValidationError(
                "Missing required fields".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UserService {
    users: Collection,
}

impl UserService {
    #[must_use]
    pub fn new(users: Collection) -> Self {
        Self { users }
    }

    #[must_use]
    pub fn collection(&self) -> &Collection {
        &self.users
    }

    /// ## Summary
    /// Lists every user with the public list projection.
    ///
    /// ## Errors
    /// Returns an error if the store fails.
    pub async fn list(&self) -> ServiceResult<Vec<Document>> {
        let docs = self.users.find(Filter::all()).collect_all().await?;
        Ok(docs.iter().map(|doc| doc.project(&LIST_PROJECTION)).collect())
    }

    /// ## Errors
    /// Returns an error if the store fails.
    pub async fn get(&self, id: DocumentId) -> ServiceResult<Option<Document>> {
        let doc = self.users.find_one(id).await?;
        Ok(doc.map(|doc| doc.project(&DETAIL_PROJECTION)))
    }

    /// ## Errors
    /// Returns an error if the store fails.
    pub async fn find_by_username(&self, username: &str) -> ServiceResult<Option<Document>> {
        Ok(self
            .users
            .find_first(&Filter::eq("username", username))
            .await?)
    }

    /// ## Summary
    /// Registers a new member. The password is hashed before storage.
    ///
    /// ## Errors
    /// Returns `ValidationError` for missing fields and `Conflict` if the
    /// username is taken.
    #[tracing::instrument(skip(self))]
    pub async fn register(&self, input: UserInput) -> ServiceResult<DocumentId> {
        self.create_with_role(input, Role::Member).await
    }

    /// ## Summary
    /// Creates a user with an explicit role.
    ///
    /// ## Errors
    /// Returns `ValidationError` for missing fields and `Conflict` if the
    /// username is taken.
    #[tracing::instrument(skip(self))]
    pub async fn create_with_role(&self, input: UserInput, role: Role) -> ServiceResult<DocumentId> {
        let fields = Self::new_user_fields(&input, role).await?;
        self.ensure_username_free(input.username.as_deref().unwrap_or_default(), None)
            .await?;

        let id = conflict_on_duplicate(
            self.users.insert_one(fields).await.map_err(Into::into),
            DUPLICATE_USERNAME,
        )?;
        tracing::info!(user_id = %id, %role, "User created");
        Ok(id)
    }

    /// ## Summary
    /// Replaces the whole user document. The id, role and creation time of
    /// the existing document are kept.
    ///
    /// Returns `false` if the user does not exist.
    ///
    /// ## Errors
    /// Returns `ValidationError` for missing fields and `Conflict` if the new
    /// username belongs to someone else.
    #[tracing::instrument(skip(self))]
    pub async fn replace(&self, id: DocumentId, input: UserInput) -> ServiceResult<bool> {
        let user = input.complete()?;
        let password_hash = hash_password_blocking(user.password.to_string()).await?;
        let Some(existing) = self.users.find_one(id).await? else {
            return Ok(false);
        };
        self.ensure_username_free(user.username, Some(id)).await?;

        let mut fields = Fields::new();
        fields.insert("name".to_string(), Value::from(user.name));
        fields.insert("username".to_string(), Value::from(user.username));
        fields.insert(
            "email".to_string(),
            Value::from(input.email.clone().unwrap_or_default()),
        );
        fields.insert("password".to_string(), Value::from(password_hash));
        for kept in ["role", CREATED_AT_FIELD] {
            if let Some(value) = existing.get(kept) {
                fields.insert(kept.to_string(), value.clone());
            }
        }

        let matched = conflict_on_duplicate(
            self.users.replace_one(id, fields).await.map_err(Into::into),
            DUPLICATE_USERNAME,
        )?;
        Ok(matched > 0)
    }

    /// ## Summary
    /// Sets the provided fields, leaving the others untouched.
    ///
    /// Returns `false` if the user does not exist.
    ///
    /// ## Errors
    /// Returns `Conflict` if the new username belongs to someone else.
    #[tracing::instrument(skip(self))]
    pub async fn update(&self, id: DocumentId, input: UserInput) -> ServiceResult<bool> {
        let patch = Self::patch_fields(&input).await?;
        if let Some(username) = non_blank(input.username.as_ref()) {
            self.ensure_username_free(username, Some(id)).await?;
        }

        let matched = conflict_on_duplicate(
            self.users.update_one(id, patch).await.map_err(Into::into),
            DUPLICATE_USERNAME,
        )?;
        Ok(matched > 0)
    }

    /// ## Errors
    /// Returns an error if the store fails.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: DocumentId) -> ServiceResult<bool> {
        let deleted = self.users.delete_one(id).await?;
        if deleted > 0 {
            tracing::info!(user_id = %id, "User deleted");
        }
        Ok(deleted > 0)
    }

    /// ## Summary
    /// Registers several members at once.
    ///
    /// ## Errors
    /// Returns `ValidationError` if any input is incomplete and `Conflict` if
    /// any username is taken or repeated within the batch. Nothing is
    /// inserted in either case.
    #[tracing::instrument(skip(self, inputs), fields(count = inputs.len()))]
    pub async fn insert_many(&self, inputs: Vec<UserInput>) -> ServiceResult<Vec<DocumentId>> {
        let mut seen = HashSet::new();
        let mut batch = Vec::with_capacity(inputs.len());
        for input in &inputs {
            let fields = Self::new_user_fields(input, Role::Member).await?;
            let username = input.username.as_deref().unwrap_or_default();
            if !seen.insert(username) {
                return Err(ServiceError::Conflict(DUPLICATE_USERNAME.to_string()));
            }
            self.ensure_username_free(username, None).await?;
            batch.push(fields);
        }

        conflict_on_duplicate(
            self.users.insert_many(batch).await.map_err(Into::into),
            DUPLICATE_USERNAME,
        )
    }

    /// ## Summary
    /// Applies the provided fields to every matching user.
    ///
    /// ## Errors
    /// Returns `ValidationError` when the patch would give several users the
    /// same username.
    #[tracing::instrument(skip(self))]
    pub async fn update_many(&self, filter: &Filter, input: UserInput) -> ServiceResult<u64> {
        if non_blank(input.username.as_ref()).is_some() {
            return Err(ServiceError::ValidationError(
                "Username cannot be bulk-assigned".to_string(),
            ));
        }
        let patch = Self::patch_fields(&input).await?;
        Ok(self.users.update_many(filter, patch).await?)
    }

    /// ## Errors
    /// Returns an error if the store fails.
    #[tracing::instrument(skip(self))]
    pub async fn delete_many(&self, filter: &Filter) -> ServiceResult<u64> {
        Ok(self.users.delete_many(filter).await?)
    }

    /// ## Summary
    /// Streams every user through a cursor, returning `name` and `email` only.
    ///
    /// ## Errors
    /// Returns the first store error hit while draining the cursor.
    pub async fn cursor_list(&self) -> ServiceResult<Vec<Document>> {
        Ok(self
            .users
            .find(Filter::all())
            .into_stream()
            .map_ok(|doc| doc.project(&CURSOR_PROJECTION))
            .try_collect()
            .await?)
    }

    /// ## Summary
    /// Total user count and the mean name length in code points.
    ///
    /// ## Errors
    /// Returns an error if the aggregation fails.
    pub async fn stats(&self) -> ServiceResult<UserStats> {
        let pipeline = Pipeline::new().group(
            None,
            vec![
                ("totalUsers", Accumulator::Count),
                (
                    "avgNameLength",
                    Accumulator::Avg(Expr::StrLen("name".to_string())),
                ),
            ],
        );

        let summary = self.users.aggregate(&pipeline).await?.into_iter().next();
        Ok(summary.map_or(
            UserStats {
                total_users: 0,
                avg_name_length: None,
            },
            |record| UserStats {
                total_users: as_u64(record.get("totalUsers")),
                avg_name_length: as_f64(record.get("avgNameLength")),
            },
        ))
    }

    async fn ensure_username_free(
        &self,
        username: &str,
        owner: Option<DocumentId>,
    ) -> ServiceResult<()> {
        match self.find_by_username(username).await? {
            Some(doc) if Some(doc.id) != owner => {
                Err(ServiceError::Conflict(DUPLICATE_USERNAME.to_string()))
            }
            _ => Ok(()),
        }
    }

    async fn new_user_fields(input: &UserInput, role: Role) -> ServiceResult<Fields> {
        let user = input.complete()?;

        let mut fields = Fields::new();
        fields.insert("name".to_string(), Value::from(user.name));
        fields.insert("username".to_string(), Value::from(user.username));
        fields.insert(
            "email".to_string(),
            Value::from(input.email.clone().unwrap_or_default()),
        );
        fields.insert(
            "password".to_string(),
            Value::from(hash_password_blocking(user.password.to_string()).await?),
        );
        fields.insert("role".to_string(), Value::from(role.to_string()));
        fields.insert(CREATED_AT_FIELD.to_string(), timestamp_now());
        Ok(fields)
    }

    async fn patch_fields(input: &UserInput) -> ServiceResult<Fields> {
        let mut patch = Fields::new();
        for (key, value) in [
            ("name", input.name.as_ref()),
            ("username", input.username.as_ref()),
        ] {
            if let Some(value) = non_blank(value) {
                patch.insert(key.to_string(), Value::from(value));
            }
        }
        if let Some(email) = &input.email {
            patch.insert("email".to_string(), Value::from(email.as_str()));
        }
        if let Some(password) = non_blank(input.password.as_ref()) {
            patch.insert(
                "password".to_string(),
                Value::from(hash_password_blocking(password.to_string()).await?),
            );
        }
        Ok(patch)
    }
}
