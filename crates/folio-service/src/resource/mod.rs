//! Field-level data access for the `users` and `articles` collections.

pub mod articles;
pub mod users;

use chrono::{SecondsFormat, Utc};
use serde_json::Value;

use crate::error::{ServiceError, ServiceResult};

pub use articles::{ArticleInput, ArticleService, AuthorStats};
pub use users::{UserInput, UserService, UserStats};

/// Field holding the creation timestamp, as an RFC 3339 string.
pub const CREATED_AT_FIELD: &str = "createdAt";

/// Returns the value if it is present and not blank.
fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|s| !s.trim().is_empty())
}

fn timestamp_now() -> Value {
    Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Turns a unique-index violation from the database into a `Conflict`.
fn conflict_on_duplicate<T>(result: ServiceResult<T>, message: &str) -> ServiceResult<T> {
    match result {
        Err(err) if err.is_unique_violation() => Err(ServiceError::Conflict(message.to_string())),
        other => other,
    }
}

fn as_u64(value: Option<&Value>) -> u64 {
    value.and_then(Value::as_u64).unwrap_or_default()
}

fn as_f64(value: Option<&Value>) -> Option<f64> {
    value.and_then(Value::as_f64)
}
