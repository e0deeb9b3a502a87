//! Ollama Core Library
//!
//! Async client for a local Ollama server: text generation and chat with
//! streamed newline-delimited JSON responses, embeddings, model management,
//! and tool calling.
//!
//! ```no_run
//! use futures::StreamExt;
//! use ollama_core::{GenerateRequest, OllamaClient};
//!
//! # async fn run() -> ollama_core::Result<()> {
//! let client = OllamaClient::from_env()?;
//! let mut stream = client
//!     .generate_stream(GenerateRequest::new("llama3.2", "Write a haiku about llamas."))
//!     .await?;
//! while let Some(chunk) = stream.next().await {
//!     print!("{}", chunk?.response);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod protocol;
pub mod stream;
pub mod tools;

pub use client::{ChatTurn, OllamaClient};
pub use config::ClientConfig;
pub use error::{BoxError, OllamaError, Result, TransportError};
pub use protocol::*;
pub use stream::ResponseStream;
pub use tools::{Arguments, Tool, ToolOrchestrator, ToolRegistry, TurnOutcome};

/// Returns the version of the Ollama Core library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
