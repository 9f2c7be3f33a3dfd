//! The output union of the retrieval+generation backend.

use serde_json::Value;

/// What a query processor hands back for one query.
///
/// Produced once per dispatch and consumed once by the normalizer.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum BackendResult {
    /// The backend produced nothing.
    #[default]
    Absent,
    /// Plain text, passed through unchanged.
    Text(String),
    /// Any other JSON value: usually a mapping such as
    /// `{"response": "...", "sources": [...]}`.
    Structured(Value),
}

impl BackendResult {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

impl From<Value> for BackendResult {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Absent,
            Value::String(s) => Self::Text(s),
            other => Self::Structured(other),
        }
    }
}

impl From<String> for BackendResult {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for BackendResult {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl<T> From<Option<T>> for BackendResult
where
    T: Into<BackendResult>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Absent, Into::into)
    }
}
