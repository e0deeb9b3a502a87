//! Typing of decoded JSON records
//!
//! The record type is chosen by the caller from the request kind; the payload
//! is never inspected to guess it.

use crate::error::{OllamaError, Result};
use crate::http::error::extract_error_message;
use crate::protocol::{ChatResponse, GenerateResponse};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// A record type that can appear in a streamed response
pub trait StreamRecord: DeserializeOwned + Send + 'static {
    /// Human-readable record kind used in error messages
    const KIND: &'static str;

    /// Fields that must be present on every record
    const REQUIRED_FIELDS: &'static [&'static str];

    /// Whether this is the terminal record
    fn is_done(&self) -> bool;
}

impl StreamRecord for GenerateResponse {
    const KIND: &'static str = "generate";
    const REQUIRED_FIELDS: &'static [&'static str] = &["model", "created_at", "done"];

    fn is_done(&self) -> bool {
        self.done
    }
}

impl StreamRecord for ChatResponse {
    const KIND: &'static str = "chat";
    const REQUIRED_FIELDS: &'static [&'static str] = &["model", "created_at", "message", "done"];

    fn is_done(&self) -> bool {
        self.done
    }
}

/// Parse one JSON line into a typed record
///
/// A record carrying an `error` field is reported as a server error rather
/// than an empty content record.
pub fn parse_record<T: StreamRecord>(line: &str) -> Result<T> {
    let value: Value = serde_json::from_str(line).map_err(|e| OllamaError::MalformedResponse {
        field: None,
        message: format!("invalid JSON in {} record: {}", T::KIND, e),
    })?;

    let Some(object) = value.as_object() else {
        return Err(OllamaError::MalformedResponse {
            field: None,
            message: format!("expected a JSON object for {} record", T::KIND),
        });
    };

    if let Some(message) = extract_error_message(&value) {
        return Err(OllamaError::Server {
            status: None,
            message,
        });
    }

    if let Some(missing) = T::REQUIRED_FIELDS
        .iter()
        .find(|field| object.get(**field).map_or(true, Value::is_null))
    {
        return Err(OllamaError::missing_field(*missing));
    }

    serde_json::from_value(value).map_err(|e| OllamaError::MalformedResponse {
        field: None,
        message: format!("invalid {} record: {}", T::KIND, e),
    })
}

/// Parse a whole buffered response body as a single record
pub fn parse_body<T: StreamRecord>(body: &[u8]) -> Result<T> {
    let text = std::str::from_utf8(body)
        .map_err(|e| OllamaError::Decode(format!("response body is not UTF-8: {}", e)))?;
    parse_record(text.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Role;

    const TERMINAL: &str = r#"{"model":"llama3.2","created_at":"2024-08-04T19:22:45.499127Z","response":"","done":true,"done_reason":"stop","context":[1,2,3],"total_duration":10706818083,"load_duration":6338219291,"prompt_eval_count":26,"prompt_eval_duration":130079000,"eval_count":259,"eval_duration":4232710000}"#;

    #[test]
    fn test_parses_partial_generate_record() {
        let record: GenerateResponse = parse_record(
            r#"{"model":"llama3.2","created_at":"2024-08-04T08:52:19.385406455-07:00","response":"The","done":false}"#,
        )
        .unwrap();
        assert_eq!(record.response, "The");
        assert!(!record.is_done());
        assert!(record.usage.is_empty());
        assert!(record.thinking.is_none());
    }

    #[test]
    fn test_terminal_record_carries_usage() {
        let record: GenerateResponse = parse_record(TERMINAL).unwrap();
        assert!(record.done);
        assert_eq!(record.usage.total_duration, Some(10_706_818_083));
        assert_eq!(record.usage.load_duration, Some(6_338_219_291));
        assert_eq!(record.usage.prompt_eval_count, Some(26));
        assert_eq!(record.usage.eval_count, Some(259));
        assert_eq!(record.context, Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_reparse_is_idempotent() {
        let first: GenerateResponse = parse_record(TERMINAL).unwrap();
        let second: GenerateResponse = parse_record(TERMINAL).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_required_field_is_named() {
        let err = parse_record::<GenerateResponse>(r#"{"model":"llama3.2","done":false}"#)
            .unwrap_err();
        assert_eq!(err.field(), Some("created_at"));

        let err = parse_record::<ChatResponse>(
            r#"{"model":"llama3.2","created_at":"2024-08-04T19:22:45Z","done":false}"#,
        )
        .unwrap_err();
        assert_eq!(err.field(), Some("message"));
    }

    #[test]
    fn test_error_record_is_server_error() {
        let err = parse_record::<ChatResponse>(r#"{"error":"model requires more system memory"}"#)
            .unwrap_err();
        match err {
            OllamaError::Server { status, message } => {
                assert_eq!(status, None);
                assert_eq!(message, "model requires more system memory");
            }
            other => panic!("expected server error, got {:?}", other),
        }
    }

    #[test]
    fn test_chat_record_with_tool_call() {
        let record: ChatResponse = parse_record(
            r#"{"model":"llama3.2","created_at":"2024-08-04T19:22:45Z","message":{"role":"assistant","content":"","tool_calls":[{"function":{"name":"rgb_to_hex","arguments":{"red":"1.0","green":1,"blue":0}}}]},"done":false}"#,
        )
        .unwrap();
        assert_eq!(record.message.role, Role::Assistant);
        let call = &record.message.tool_calls()[0];
        assert_eq!(call.name(), "rgb_to_hex");
        assert_eq!(call.arguments()["red"], "1.0");
    }

    #[test]
    fn test_non_object_is_malformed() {
        let err = parse_record::<GenerateResponse>("[1,2,3]").unwrap_err();
        assert!(matches!(err, OllamaError::MalformedResponse { field: None, .. }));

        let err = parse_record::<GenerateResponse>("{not json").unwrap_err();
        assert!(matches!(err, OllamaError::MalformedResponse { field: None, .. }));
    }

    #[test]
    fn test_parse_body_rejects_bad_encoding() {
        let err = parse_body::<GenerateResponse>(b"\xFF{}").unwrap_err();
        assert!(matches!(err, OllamaError::Decode(_)));
    }
}
