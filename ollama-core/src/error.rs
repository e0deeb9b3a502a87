//! Error types for client operations

use thiserror::Error;

/// Result type for client operations
pub type Result<T> = std::result::Result<T, OllamaError>;

/// Boxed error returned by tool implementations
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur when talking to the server or running tools
#[derive(Debug, Error)]
pub enum OllamaError {
    /// Connection or network failure
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Byte stream is not valid UTF-8
    #[error("Decode error: {0}")]
    Decode(String),

    /// JSON record is missing a required field or is not a record at all
    #[error("Malformed response: {message}")]
    MalformedResponse {
        field: Option<String>,
        message: String,
    },

    /// The server answered with an error payload
    #[error("Server error{}: {message}", .status.map(|s| format!(" ({})", s)).unwrap_or_default())]
    Server {
        status: Option<u16>,
        message: String,
    },

    /// The model asked for a tool that was never registered
    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },

    /// A tool argument could not be converted to its declared type
    #[error("Invalid argument '{parameter}': {message}")]
    ArgumentType { parameter: String, message: String },

    /// A tool implementation failed
    #[error("Tool '{name}' failed: {source}")]
    ToolFailed {
        name: String,
        #[source]
        source: BoxError,
    },

    /// Request or tool result could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid client configuration
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Transport-level failures
#[derive(Debug, Error)]
pub enum TransportError {
    /// Could not connect to the server
    #[error("connection failed: {0}")]
    Connect(String),

    /// The request did not complete in time
    #[error("request timed out")]
    Timeout,

    /// Reading the response body failed
    #[error("failed to read response body: {0}")]
    Body(String),

    /// The connection closed before the terminal record arrived
    #[error("connection closed before the final record")]
    ClosedBeforeDone,

    /// Any other request failure
    #[error("{0}")]
    Request(String),
}

impl OllamaError {
    /// Build a malformed-response error for a missing required field
    pub fn missing_field(field: impl Into<String>) -> Self {
        let field = field.into();
        OllamaError::MalformedResponse {
            message: format!("missing required field '{}'", field),
            field: Some(field),
        }
    }

    /// Name of the offending field, if this is a missing-field error
    pub fn field(&self) -> Option<&str> {
        match self {
            OllamaError::MalformedResponse { field, .. } => field.as_deref(),
            _ => None,
        }
    }

    /// Whether the error came from the server rather than the client
    pub fn is_server_error(&self) -> bool {
        matches!(self, OllamaError::Server { .. })
    }

    /// HTTP status carried by a server error
    pub fn status(&self) -> Option<u16> {
        match self {
            OllamaError::Server { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for OllamaError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            OllamaError::Transport(TransportError::Timeout)
        } else if err.is_connect() {
            OllamaError::Transport(TransportError::Connect(err.to_string()))
        } else if err.is_body() || err.is_decode() {
            OllamaError::Transport(TransportError::Body(err.to_string()))
        } else if let Some(status) = err.status() {
            OllamaError::Server {
                status: Some(status.as_u16()),
                message: err.to_string(),
            }
        } else {
            OllamaError::Transport(TransportError::Request(err.to_string()))
        }
    }
}
