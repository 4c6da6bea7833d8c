use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier of a stored document. Generated as UUID v7 so ids sort by
/// insertion time, which the keyset cursor relies on.
pub type DocumentId = uuid::Uuid;

/// Top-level fields of a document body.
pub type Fields = serde_json::Map<String, Value>;

/// A stored document: its id plus a flat JSON object body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    #[serde(flatten)]
    pub fields: Fields,
}

impl Document {
    #[must_use]
    pub fn new(id: DocumentId, fields: Fields) -> Self {
        Self { id, fields }
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    #[must_use]
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    /// ## Summary
    /// Returns a copy holding only the projected fields. The id is always kept.
    #[must_use]
    pub fn project(&self, projection: &Projection) -> Self {
        let fields = self
            .fields
            .iter()
            .filter(|(key, _)| projection.includes(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Self::new(self.id, fields)
    }

    /// ## Summary
    /// Flattens the document into a single record with the id under `_id`.
    #[must_use]
    pub fn into_record(self) -> Fields {
        let mut record = Fields::new();
        record.insert("_id".to_string(), Value::String(self.id.to_string()));
        record.extend(self.fields);
        record
    }
}

/// Equality filter on top-level fields. An empty filter matches every document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter(Fields);

impl Filter {
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::all().and_eq(field, value)
    }

    #[must_use]
    pub fn and_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn matches(&self, fields: &Fields) -> bool {
        self.0
            .iter()
            .all(|(key, expected)| fields.get(key) == Some(expected))
    }

    /// ## Summary
    /// The filter as a JSON object, suitable for JSONB containment.
    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

impl From<Fields> for Filter {
    fn from(fields: Fields) -> Self {
        Self(fields)
    }
}

/// Whitelist of top-level fields returned to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection(&'static [&'static str]);

impl Projection {
    #[must_use]
    pub const fn fields(fields: &'static [&'static str]) -> Self {
        Self(fields)
    }

    #[must_use]
    pub fn includes(&self, field: &str) -> bool {
        self.0.contains(&field)
    }
}
