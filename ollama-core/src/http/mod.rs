//! HTTP transport layer
//!
//! This module implements the transport boundary of the client, handling:
//! - Endpoint paths and methods
//! - Buffered JSON exchanges and raw byte streams
//! - Error mapping for non-success statuses
//! - Request ID generation and correlation

pub mod client;
pub mod error;

use crate::error::{Result, TransportError};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use serde_json::Value;
use std::time::Duration;
use uuid::Uuid;

pub use client::HttpTransport;

/// Raw response body delivered chunk by chunk
///
/// Dropping the stream releases the underlying connection.
pub type ByteStream = BoxStream<'static, std::result::Result<Bytes, TransportError>>;

/// HTTP method used by an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
}

/// Server endpoint being called
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// Text generation
    Generate,
    /// Chat completion
    Chat,
    /// Embeddings
    Embed,
    /// Local models
    ListModels,
    /// Models loaded in memory
    ListRunningModels,
    /// Server version
    Version,
    /// Create a model
    CreateModel,
    /// Show model information
    ShowModel,
    /// Delete a model
    DeleteModel,
}

impl Endpoint {
    /// Get the path for this endpoint
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Generate => "/api/generate",
            Endpoint::Chat => "/api/chat",
            Endpoint::Embed => "/api/embed",
            Endpoint::ListModels => "/api/tags",
            Endpoint::ListRunningModels => "/api/ps",
            Endpoint::Version => "/api/version",
            Endpoint::CreateModel => "/api/create",
            Endpoint::ShowModel => "/api/show",
            Endpoint::DeleteModel => "/api/delete",
        }
    }

    /// Get the HTTP method for this endpoint
    pub fn method(&self) -> Method {
        match self {
            Endpoint::ListModels | Endpoint::ListRunningModels | Endpoint::Version => Method::Get,
            Endpoint::DeleteModel => Method::Delete,
            _ => Method::Post,
        }
    }
}

/// Options for an HTTP request
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// Endpoint being called
    pub endpoint: Endpoint,

    /// Unique request ID for correlation
    pub request_id: Uuid,

    /// Request timeout; `None` uses the transport default
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    /// Create new request options with a generated request ID
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            request_id: Uuid::new_v4(),
            timeout: None,
        }
    }

    /// Set the timeout for this request
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Transport used by the client to reach the server
///
/// Implementations map non-success statuses to [`crate::OllamaError::Server`]
/// before returning.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute a request and return the whole response body
    async fn send(&self, body: Option<Value>, options: RequestOptions) -> Result<Bytes>;

    /// Execute a request and return the response body as a byte stream
    async fn stream(&self, body: Option<Value>, options: RequestOptions) -> Result<ByteStream>;
}
