//! Protocol module for request/response structures
//!
//! This module defines the data models exchanged with the server. These
//! structures are designed to be:
//! - Faithful to the server's JSON field names
//! - Tolerant of optional fields absent from streamed records
//! - Type-safe and serializable

pub mod models;
pub mod types;

pub use models::{
    CreateModelRequest, EmbedInput, EmbedRequest, EmbedResponse, ListModelsResponse,
    ListRunningModelsResponse, ModelDetails, ModelRequest, ModelSummary, RunningModel,
    ShowModelResponse, StatusResponse, VersionResponse,
};
pub use types::{
    ChatRequest, ChatResponse, Format, FunctionCall, FunctionDefinition, GenerateRequest,
    GenerateResponse, IntoMessage, Message, Options, Role, ToolCall, ToolDefinition, Usage,
};
