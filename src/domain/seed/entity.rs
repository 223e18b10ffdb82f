//! Seed entity and related value types

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::DomainError;

/// Metadata document stored alongside a seed (always a JSON object)
pub type Metadata = Map<String, Value>;

/// Metadata key incremented each time a near-duplicate is merged into a seed
pub const UPDATE_COUNT_KEY: &str = "update_count";

/// Store-assigned seed identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeedId(i64);

impl SeedId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Parse a caller-supplied id; only positive integers are valid
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value.trim().parse::<i64>() {
            Ok(id) if id > 0 => Ok(Self(id)),
            _ => Err(DomainError::invalid_id(format!("invalid seed id '{}'", value))),
        }
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl From<i64> for SeedId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for SeedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tenant/user partition of a row; `None` means unscoped
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_user_id: Option<String>,
}

impl Scope {
    /// Build a scope from raw values, treating empty strings as absent
    pub fn new(app_id: Option<String>, external_user_id: Option<String>) -> Self {
        Self {
            app_id: non_empty(app_id),
            external_user_id: non_empty(external_user_id),
        }
    }

    pub fn unscoped() -> Self {
        Self::default()
    }

    pub fn with_app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = non_empty(Some(app_id.into()));
        self
    }

    pub fn with_external_user_id(mut self, external_user_id: impl Into<String>) -> Self {
        self.external_user_id = non_empty(Some(external_user_id.into()));
        self
    }

    pub fn app_id(&self) -> Option<&str> {
        self.app_id.as_deref()
    }

    pub fn external_user_id(&self) -> Option<&str> {
        self.external_user_id.as_deref()
    }

    /// Whether a row stored under `row` passes this scope used as a filter.
    ///
    /// Each component restricts only when present.
    pub fn admits(&self, row: &Scope) -> bool {
        if let Some(app_id) = self.app_id() {
            if row.app_id() != Some(app_id) {
                return false;
            }
        }

        if let Some(user_id) = self.external_user_id() {
            if row.external_user_id() != Some(user_id) {
                return false;
            }
        }

        true
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Write model for inserting or fully overwriting a seed
#[derive(Debug, Clone, PartialEq)]
pub struct NewSeed {
    pub content: String,
    pub embedding: Vec<f32>,
    pub metadata: Metadata,
    pub scope: Scope,
}

impl NewSeed {
    pub fn new(content: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            content: content.into(),
            embedding,
            metadata: Metadata::new(),
            scope: Scope::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }
}

/// A stored seed as returned by reads and searches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Seed {
    pub id: SeedId,
    pub content: String,
    pub metadata: Metadata,
    #[serde(flatten)]
    pub scope: Scope,
    pub created_at: DateTime<Utc>,
    /// Cosine similarity to the query; `0` outside similarity search
    pub score: f64,
}

/// What happened when a seed was stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "id", rename_all = "snake_case")]
pub enum StoreOutcome {
    /// A new row was created
    Inserted(SeedId),
    /// The content was merged into an existing near-duplicate row
    Updated(SeedId),
}

impl StoreOutcome {
    pub fn id(&self) -> SeedId {
        match self {
            Self::Inserted(id) | Self::Updated(id) => *id,
        }
    }
}

/// Convert caller-supplied metadata into a document; `null`/absent becomes `{}`
pub fn metadata_from_value(value: Option<Value>) -> Result<Metadata, DomainError> {
    match value {
        None | Some(Value::Null) => Ok(Metadata::new()),
        Some(Value::Object(map)) => Ok(map),
        Some(other) => Err(DomainError::validation(format!(
            "metadata must be a JSON object, got {}",
            json_type_name(&other)
        ))),
    }
}

/// Shallow merge: top-level keys of `patch` overwrite those in `target`
pub fn merge_metadata(target: &mut Metadata, patch: &Metadata) {
    for (key, value) in patch {
        target.insert(key.clone(), value.clone());
    }
}

/// Next value of a metadata counter; absent or non-numeric values count as 0
pub fn next_counter_value(metadata: &Metadata, key: &str) -> i64 {
    let current = match metadata.get(key) {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64))
            .unwrap_or(0),
        _ => 0,
    };

    current.saturating_add(1)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
