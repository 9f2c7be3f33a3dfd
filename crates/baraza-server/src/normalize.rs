//! Turns any backend result into the one string the client hears and sees.

use baraza_types::{BackendResult, NO_RESPONSE_NOTICE};
use serde_json::Value;

/// Maps a backend result to display text. Total: every input yields a string.
///
/// - absent (or a JSON `null`) becomes [`NO_RESPONSE_NOTICE`]
/// - text, or a bare JSON string, is returned unchanged
/// - objects and arrays are encoded as compact JSON
/// - other scalars use their plain textual form
pub fn normalize(result: &BackendResult) -> String {
    match result {
        BackendResult::Absent | BackendResult::Structured(Value::Null) => {
            tracing::warn!("backend returned no result; sending default message");
            NO_RESPONSE_NOTICE.to_string()
        }
        BackendResult::Text(text) | BackendResult::Structured(Value::String(text)) => text.clone(),
        BackendResult::Structured(value @ (Value::Object(_) | Value::Array(_))) => {
            match serde_json::to_string(value) {
                Ok(json) => json,
                Err(e) => {
                    tracing::error!("failed to encode structured result as JSON: {}", e);
                    format!("{:?}", value)
                }
            }
        }
        BackendResult::Structured(scalar) => scalar.to_string(),
    }
}
