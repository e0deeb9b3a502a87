//! Client for the Ollama server API
//!
//! `OllamaClient` builds requests, hands them to a [`Transport`], and types
//! the answers. Streaming operations return a [`ResponseStream`] that yields
//! records as they arrive.

use crate::config::ClientConfig;
use crate::error::{OllamaError, Result};
use crate::http::error::extract_error_message;
use crate::http::{Endpoint, HttpTransport, RequestOptions, Transport};
use crate::protocol::{
    ChatRequest, ChatResponse, CreateModelRequest, EmbedRequest, EmbedResponse, GenerateRequest,
    GenerateResponse, ListModelsResponse, ListRunningModelsResponse, ModelRequest, ModelSummary,
    RunningModel, ShowModelResponse, StatusResponse, VersionResponse,
};
use crate::stream::{parse_body, ResponseStream};
use crate::tools::{ToolOrchestrator, ToolRegistry, TurnOutcome};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Result of one chat turn with tools
#[derive(Debug, Clone, PartialEq)]
pub struct ChatTurn {
    /// The assistant's complete response
    pub response: ChatResponse,
    /// What the orchestrator did with it
    pub outcome: TurnOutcome,
}

/// Client for a single Ollama server
///
/// Cloning is cheap; clones share the transport and its connection pool.
#[derive(Clone)]
pub struct OllamaClient {
    transport: Arc<dyn Transport>,
    config: ClientConfig,
}

impl OllamaClient {
    /// Create a client for the given host (e.g. `"http://localhost:11434"`)
    pub fn new(host: impl Into<String>) -> Result<Self> {
        Self::from_config(ClientConfig::new(host))
    }

    /// Create a client from a configuration
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| OllamaError::Configuration(e.to_string()))?;
        let transport = HttpTransport::with_config(&config)?;
        info!("Created client for {}", transport.base_url());
        Ok(Self {
            transport: Arc::new(transport),
            config,
        })
    }

    /// Create a client for the host named by `OLLAMA_HOST`, or the default host
    pub fn from_env() -> Result<Self> {
        Self::from_config(ClientConfig::from_env())
    }

    /// Create a client over a custom transport
    pub fn with_transport(transport: Arc<dyn Transport>, config: ClientConfig) -> Self {
        Self { transport, config }
    }

    /// Active configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Generate a complete response to a prompt
    pub async fn generate(&self, mut request: GenerateRequest) -> Result<GenerateResponse> {
        request.stream = false;
        self.apply_keep_alive(&mut request.keep_alive);
        debug!("Generating with model {}", request.model);

        let body = self.send(Endpoint::Generate, Some(&request)).await?;
        parse_body(&body)
    }

    /// Generate a response to a prompt, streamed fragment by fragment
    pub async fn generate_stream(
        &self,
        mut request: GenerateRequest,
    ) -> Result<ResponseStream<GenerateResponse>> {
        request.stream = true;
        self.apply_keep_alive(&mut request.keep_alive);
        debug!("Streaming generation with model {}", request.model);

        self.stream(Endpoint::Generate, &request).await
    }

    /// Get the complete next message in a conversation
    pub async fn chat(&self, mut request: ChatRequest) -> Result<ChatResponse> {
        request.stream = false;
        self.apply_keep_alive(&mut request.keep_alive);
        debug!(
            "Chatting with model {} ({} messages)",
            request.model,
            request.messages.len()
        );

        let body = self.send(Endpoint::Chat, Some(&request)).await?;
        parse_body(&body)
    }

    /// Get the next message in a conversation, streamed fragment by fragment
    pub async fn chat_stream(&self, mut request: ChatRequest) -> Result<ResponseStream<ChatResponse>> {
        request.stream = true;
        self.apply_keep_alive(&mut request.keep_alive);
        debug!(
            "Streaming chat with model {} ({} messages)",
            request.model,
            request.messages.len()
        );

        self.stream(Endpoint::Chat, &request).await
    }

    /// Run one chat turn with tools
    ///
    /// Sends the conversation in `request` once, declaring the registry's
    /// tools unless the request already declares some. The reply and any tool
    /// results are appended to `request.messages`. When the outcome needs a
    /// follow-up, call again with the same request to let the model see the
    /// results.
    pub async fn chat_turn(
        &self,
        request: &mut ChatRequest,
        registry: &ToolRegistry,
    ) -> Result<ChatTurn> {
        let mut orchestrator = ToolOrchestrator::new(registry);

        let mut outgoing = request.clone();
        if outgoing.tools.is_none() {
            outgoing = outgoing.with_tools(registry.definitions());
        }

        let response = self.chat(outgoing).await?;
        let outcome = orchestrator
            .handle_response(&mut request.messages, &response)
            .await?;

        Ok(ChatTurn { response, outcome })
    }

    /// Compute embeddings for one or more inputs
    pub async fn embed(&self, mut request: EmbedRequest) -> Result<EmbedResponse> {
        self.apply_keep_alive(&mut request.keep_alive);
        debug!(
            "Embedding {} inputs with model {}",
            request.input.len(),
            request.model
        );

        let body = self.send(Endpoint::Embed, Some(&request)).await?;
        decode(&body, "embed")
    }

    /// List models available locally
    pub async fn list_models(&self) -> Result<Vec<ModelSummary>> {
        let body = self.send::<()>(Endpoint::ListModels, None).await?;
        let response: ListModelsResponse = decode(&body, "tags")?;
        Ok(response.models)
    }

    /// List models currently loaded in memory
    pub async fn list_running_models(&self) -> Result<Vec<RunningModel>> {
        let body = self.send::<()>(Endpoint::ListRunningModels, None).await?;
        let response: ListRunningModelsResponse = decode(&body, "ps")?;
        Ok(response.models)
    }

    /// Server version string
    pub async fn version(&self) -> Result<String> {
        let body = self.send::<()>(Endpoint::Version, None).await?;
        let response: VersionResponse = decode(&body, "version")?;
        Ok(response.version)
    }

    /// Create a model, returning whether the server reported success
    pub async fn create_model(&self, mut request: CreateModelRequest) -> Result<bool> {
        request.stream = false;
        info!("Creating model {}", request.model);

        let body = self.send(Endpoint::CreateModel, Some(&request)).await?;
        let response: StatusResponse = decode(&body, "create")?;
        Ok(response.is_success())
    }

    /// Show details of a model
    pub async fn show_model(&self, model: impl Into<String>) -> Result<ShowModelResponse> {
        let request = ModelRequest {
            model: model.into(),
        };
        let body = self.send(Endpoint::ShowModel, Some(&request)).await?;
        decode(&body, "show")
    }

    /// Delete a model
    ///
    /// Returns `false` if the model does not exist.
    pub async fn delete_model(&self, model: impl Into<String>) -> Result<bool> {
        let request = ModelRequest {
            model: model.into(),
        };
        info!("Deleting model {}", request.model);

        match self.send(Endpoint::DeleteModel, Some(&request)).await {
            Ok(_) => Ok(true),
            Err(e) if e.status() == Some(404) => {
                debug!("Model {} not found, nothing deleted", request.model);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    fn apply_keep_alive(&self, keep_alive: &mut Option<String>) {
        if keep_alive.is_none() {
            keep_alive.clone_from(&self.config.keep_alive);
        }
    }

    async fn send<T: Serialize>(&self, endpoint: Endpoint, request: Option<&T>) -> Result<bytes::Bytes> {
        let body = request.map(serde_json::to_value).transpose()?;
        self.transport
            .send(body, RequestOptions::new(endpoint))
            .await
    }

    async fn stream<T, R>(&self, endpoint: Endpoint, request: &T) -> Result<ResponseStream<R>>
    where
        T: Serialize,
        R: crate::stream::StreamRecord,
    {
        let body = serde_json::to_value(request)?;
        let source = self
            .transport
            .stream(Some(body), RequestOptions::new(endpoint))
            .await?;
        Ok(ResponseStream::new(source))
    }
}

impl fmt::Debug for OllamaClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OllamaClient")
            .field("host", &self.config.host)
            .finish_non_exhaustive()
    }
}

/// Decode a buffered JSON body, surfacing an `error` payload as a server error
fn decode<T: DeserializeOwned>(body: &[u8], what: &str) -> Result<T> {
    let value: Value = serde_json::from_slice(body).map_err(|e| OllamaError::MalformedResponse {
        field: None,
        message: format!("invalid {} response: {}", what, e),
    })?;

    if let Some(message) = extract_error_message(&value) {
        return Err(OllamaError::Server {
            status: None,
            message,
        });
    }

    serde_json::from_value(value).map_err(|e| OllamaError::MalformedResponse {
        field: None,
        message: format!("invalid {} response: {}", what, e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_normalizes_host() {
        let client = OllamaClient::new("localhost").unwrap();
        assert_eq!(client.config().host, "http://localhost:11434");
    }

    #[test]
    fn test_rejects_invalid_host() {
        let err = OllamaClient::new("ftp://localhost:11434").unwrap_err();
        assert!(matches!(err, OllamaError::Configuration(_)));
    }

    #[test]
    fn test_decode_surfaces_error_payload() {
        let err = decode::<VersionResponse>(br#"{"error":"boom"}"#, "version").unwrap_err();
        assert!(err.is_server_error());

        let version: VersionResponse = decode(br#"{"version":"0.5.1"}"#, "version").unwrap();
        assert_eq!(version.version, "0.5.1");
    }
}
