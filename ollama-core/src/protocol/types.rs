//! Core protocol types for generation and chat
//!
//! This module contains the request and response structures exchanged with
//! the server's `/api/generate` and `/api/chat` endpoints. The design
//! prioritizes:
//! - Type safety through enums and strong typing
//! - Tolerance of absent optional fields in streamed records
//! - Lossless pass-through of loosely typed values (`serde_json::Value`)

use chrono::{DateTime, Utc};
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions that guide the model's behavior
    System,
    /// User input message
    User,
    /// Assistant (model) response
    Assistant,
    /// Result of a tool invocation
    Tool,
}

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender
    pub role: Role,

    /// Text content (may be empty on streamed fragments)
    #[serde(default)]
    pub content: String,

    /// Intermediate reasoning emitted by thinking models
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,

    /// Tool calls requested by the assistant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,

    /// Base64-encoded images attached to the message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,

    /// Name of the tool that produced this message (tool role only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

impl Message {
    /// Create a message with the given role and content
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            thinking: None,
            tool_calls: None,
            images: None,
            tool_name: None,
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create a tool result message
    pub fn tool(content: impl Into<String>) -> Self {
        Self::new(Role::Tool, content)
    }

    /// Attach base64-encoded images
    pub fn with_images(mut self, images: Vec<String>) -> Self {
        self.images = Some(images);
        self
    }

    /// Attach tool calls
    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCall>) -> Self {
        self.tool_calls = Some(tool_calls);
        self
    }

    /// Set the name of the tool this result belongs to
    pub fn with_tool_name(mut self, name: impl Into<String>) -> Self {
        self.tool_name = Some(name.into());
        self
    }

    /// Set thinking text
    pub fn with_thinking(mut self, thinking: impl Into<String>) -> Self {
        self.thinking = Some(thinking.into());
        self
    }

    /// Tool calls carried by this message, empty if none
    pub fn tool_calls(&self) -> &[ToolCall] {
        self.tool_calls.as_deref().unwrap_or_default()
    }

    /// Whether the message requests any tool invocation
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls().is_empty()
    }
}

/// Tool call requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Server-assigned identifier, when provided
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Function information
    pub function: FunctionCall,
}

impl ToolCall {
    /// Create a tool call for a function with the given arguments
    pub fn new(name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            id: None,
            function: FunctionCall {
                index: None,
                name: name.into(),
                arguments,
            },
        }
    }

    /// Name of the requested function
    pub fn name(&self) -> &str {
        &self.function.name
    }

    /// Loosely typed arguments
    pub fn arguments(&self) -> &Map<String, Value> {
        &self.function.arguments
    }
}

/// Function invocation details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Position of the call within the response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,

    /// Name of the function to call
    pub name: String,

    /// Arguments keyed by parameter name
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

/// Tool declaration sent to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Type of tool (always "function")
    #[serde(rename = "type")]
    pub tool_type: String,

    /// Function definition
    pub function: FunctionDefinition,
}

/// Function definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    /// Function name
    pub name: String,

    /// Human-readable description
    pub description: String,

    /// Parameters schema (`type`, `properties`, `required`)
    pub parameters: Value,
}

/// Output format directive
#[derive(Debug, Clone, PartialEq)]
pub enum Format {
    /// Free-form JSON (`"json"`)
    Json,
    /// Output constrained by a JSON schema
    Schema(Value),
}

impl Serialize for Format {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Format::Json => serializer.serialize_str("json"),
            Format::Schema(schema) => schema.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Format {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        match value {
            Value::String(s) if s == "json" => Ok(Format::Json),
            Value::String(s) => Err(serde::de::Error::custom(format!(
                "unsupported format '{}'",
                s
            ))),
            schema => Ok(Format::Schema(schema)),
        }
    }
}

impl From<Value> for Format {
    fn from(schema: Value) -> Self {
        match schema {
            Value::String(s) if s == "json" => Format::Json,
            schema => Format::Schema(schema),
        }
    }
}

/// Model runtime options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Options {
    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Nucleus sampling parameter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    /// Top-k sampling parameter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,

    /// Seed for deterministic generation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,

    /// Maximum tokens to predict (-1 for unlimited)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<i32>,

    /// Context window size
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_ctx: Option<u32>,

    /// Repetition penalty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repeat_penalty: Option<f32>,

    /// Stop sequences
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,

    /// Options without a dedicated field
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Options {
    /// Set temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set seed
    pub fn with_seed(mut self, seed: i64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set context window size
    pub fn with_num_ctx(mut self, num_ctx: u32) -> Self {
        self.num_ctx = Some(num_ctx);
        self
    }

    /// Add a stop sequence
    pub fn with_stop_sequence(mut self, stop: impl Into<String>) -> Self {
        self.stop.get_or_insert_with(Vec::new).push(stop.into());
        self
    }

    /// Set an option that has no dedicated field
    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// Usage counters reported on the terminal record
///
/// All durations are nanoseconds as sent by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_duration: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_duration: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_eval_count: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_eval_duration: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_count: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_duration: Option<u64>,
}

impl Usage {
    /// Whether no counter is present
    pub fn is_empty(&self) -> bool {
        *self == Usage::default()
    }

    /// Total wall time of the request
    pub fn total(&self) -> Option<Duration> {
        self.total_duration.map(Duration::from_nanos)
    }

    /// Time spent loading the model
    pub fn load(&self) -> Option<Duration> {
        self.load_duration.map(Duration::from_nanos)
    }

    /// Generated tokens per second, when both counters are known
    pub fn tokens_per_second(&self) -> Option<f64> {
        match (self.eval_count, self.eval_duration) {
            (Some(count), Some(nanos)) if nanos > 0 => {
                Some(count as f64 / (nanos as f64 / 1_000_000_000.0))
            }
            _ => None,
        }
    }
}

/// Text generation request for `/api/generate`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// Model identifier
    pub model: String,

    /// Prompt text
    pub prompt: String,

    /// Text appended after the model response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,

    /// Base64-encoded images
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,

    /// Output format directive
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<Format>,

    /// Model runtime options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Options>,

    /// System prompt override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Prompt template override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,

    /// Context returned by a previous generation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Vec<i64>>,

    /// Skip prompt templating
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<bool>,

    /// How long the model stays loaded (e.g. "5m")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<String>,

    /// Enable or disable thinking output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub think: Option<bool>,

    /// Streaming flag, set by the client
    #[serde(default)]
    pub stream: bool,
}

impl GenerateRequest {
    /// Create a new generation request
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            suffix: None,
            images: None,
            format: None,
            options: None,
            system: None,
            template: None,
            context: None,
            raw: None,
            keep_alive: None,
            think: None,
            stream: false,
        }
    }

    /// Attach base64-encoded images
    pub fn with_images(mut self, images: Vec<String>) -> Self {
        self.images = Some(images);
        self
    }

    /// Set the output format
    pub fn with_format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    /// Set model options
    pub fn with_options(mut self, options: Options) -> Self {
        self.options = Some(options);
        self
    }

    /// Set the system prompt
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Continue from a previous generation's context
    pub fn with_context(mut self, context: Vec<i64>) -> Self {
        self.context = Some(context);
        self
    }

    /// Set the suffix
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    /// Enable or disable thinking
    pub fn with_think(mut self, think: bool) -> Self {
        self.think = Some(think);
        self
    }

    /// Set keep-alive duration
    pub fn with_keep_alive(mut self, keep_alive: impl Into<String>) -> Self {
        self.keep_alive = Some(keep_alive.into());
        self
    }
}

/// Chat request for `/api/chat`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Model identifier
    pub model: String,

    /// Conversation so far
    pub messages: Vec<Message>,

    /// Tool declarations available to the model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,

    /// Output format directive
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<Format>,

    /// Model runtime options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Options>,

    /// How long the model stays loaded (e.g. "5m")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<String>,

    /// Enable or disable thinking output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub think: Option<bool>,

    /// Streaming flag, set by the client
    #[serde(default)]
    pub stream: bool,
}

impl ChatRequest {
    /// Create a new chat request with model and messages
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            tools: None,
            format: None,
            options: None,
            keep_alive: None,
            think: None,
            stream: false,
        }
    }

    /// Append a message
    pub fn with_message(mut self, message: impl IntoMessage) -> Self {
        self.messages.push(message.into_message());
        self
    }

    /// Declare tools for the model
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = if tools.is_empty() { None } else { Some(tools) };
        self
    }

    /// Set the output format
    pub fn with_format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    /// Set model options
    pub fn with_options(mut self, options: Options) -> Self {
        self.options = Some(options);
        self
    }

    /// Enable or disable thinking
    pub fn with_think(mut self, think: bool) -> Self {
        self.think = Some(think);
        self
    }

    /// Set keep-alive duration
    pub fn with_keep_alive(mut self, keep_alive: impl Into<String>) -> Self {
        self.keep_alive = Some(keep_alive.into());
        self
    }
}

/// One generation record, partial or terminal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateResponse {
    /// Model that produced the record
    pub model: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Generated text fragment
    #[serde(default)]
    pub response: String,

    /// Thinking text fragment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,

    /// Whether this is the terminal record
    pub done: bool,

    /// Why generation stopped (terminal record only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done_reason: Option<String>,

    /// Conversation context for follow-up generations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Vec<i64>>,

    /// Usage counters (terminal record only)
    #[serde(flatten)]
    pub usage: Usage,
}

/// One chat record, partial or terminal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Model that produced the record
    pub model: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Assistant message fragment
    pub message: Message,

    /// Whether this is the terminal record
    pub done: bool,

    /// Why generation stopped (terminal record only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done_reason: Option<String>,

    /// Usage counters (terminal record only)
    #[serde(flatten)]
    pub usage: Usage,
}

// ============================================================================
// Convenience traits
// ============================================================================

/// Trait for converting types into messages
pub trait IntoMessage {
    /// Convert self into a Message
    fn into_message(self) -> Message;
}

impl IntoMessage for Message {
    fn into_message(self) -> Message {
        self
    }
}

impl IntoMessage for String {
    fn into_message(self) -> Message {
        Message::user(self)
    }
}

impl IntoMessage for &str {
    fn into_message(self) -> Message {
        Message::user(self)
    }
}
