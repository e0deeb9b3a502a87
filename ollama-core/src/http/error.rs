//! HTTP error mapping utilities

use crate::error::OllamaError;
use serde_json::Value;
use uuid::Uuid;

/// Map a non-success HTTP status and response body to an error
pub fn map_http_error(status: u16, body: Option<String>, request_id: Uuid) -> OllamaError {
    let message = body
        .as_deref()
        .and_then(|b| serde_json::from_str::<Value>(b).ok())
        .and_then(|v| extract_error_message(&v))
        .or_else(|| body.filter(|b| !b.trim().is_empty()))
        .unwrap_or_else(|| format!("HTTP error {}", status));

    tracing::debug!(
        "Mapped HTTP {} to server error [request_id: {}]: {}",
        status,
        request_id,
        message
    );

    OllamaError::Server {
        status: Some(status),
        message,
    }
}

/// Extract the error message from a JSON error payload
///
/// Accepts `{"error": "..."}` and `{"error": {"message": "..."}}`.
pub fn extract_error_message(json: &Value) -> Option<String> {
    match json.get("error")? {
        Value::String(message) => Some(message.clone()),
        Value::Object(error) => error
            .get("message")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}
