//! HTTP transport implementation using reqwest

use crate::config::{ClientConfig, ConnectionConfig};
use crate::error::{OllamaError, Result, TransportError};
use crate::http::{ByteStream, Method, RequestOptions, Transport};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use reqwest::{Client, ClientBuilder, RequestBuilder, Response};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

/// Maximum buffered response size (64MB; embeddings of large batches are big)
const MAX_RESPONSE_SIZE: usize = 64 * 1024 * 1024;

/// Default user agent
const USER_AGENT: &str = concat!("ollama-core/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP transport with connection pooling
#[derive(Clone)]
pub struct HttpTransport {
    /// The underlying reqwest client
    client: Arc<Client>,

    /// Server base URL without trailing slash
    base_url: String,

    /// Timeout applied to buffered requests
    request_timeout: Duration,

    /// Maximum response size to prevent OOM
    max_response_size: usize,
}

impl HttpTransport {
    /// Create a transport for the given host with default connection settings
    pub fn new(host: &str) -> Result<Self> {
        Self::with_connection(host, &ConnectionConfig::default())
    }

    /// Create a transport from a full client configuration
    pub fn with_config(config: &ClientConfig) -> Result<Self> {
        Self::with_connection(&config.host, &config.connection)
    }

    /// Create a transport with custom connection settings
    pub fn with_connection(host: &str, connection: &ConnectionConfig) -> Result<Self> {
        let url = Url::parse(host)
            .map_err(|e| OllamaError::Configuration(format!("Invalid host '{}': {}", host, e)))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(OllamaError::Configuration(format!(
                "Host scheme must be http or https, got: {}",
                url.scheme()
            )));
        }

        // No client-wide timeout: it would cut long streams short
        let client = ClientBuilder::new()
            .pool_max_idle_per_host(connection.max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(connection.keepalive_secs))
            .connect_timeout(Duration::from_millis(connection.connect_timeout_ms))
            .user_agent(USER_AGENT)
            .gzip(true)
            .build()
            .map_err(|e| {
                OllamaError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client: Arc::new(client),
            base_url: url.as_str().trim_end_matches('/').to_string(),
            request_timeout: Duration::from_millis(connection.request_timeout_ms),
            max_response_size: MAX_RESPONSE_SIZE,
        })
    }

    /// Server base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the full URL for a request
    fn build_url(&self, options: &RequestOptions) -> String {
        format!("{}{}", self.base_url, options.endpoint.path())
    }

    /// Build the HTTP request for the endpoint
    fn build_request(&self, body: Option<&Value>, options: &RequestOptions) -> RequestBuilder {
        let url = self.build_url(options);
        debug!("Request URL: {} [request_id: {}]", url, options.request_id);

        let mut builder = match options.endpoint.method() {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
            Method::Delete => self.client.delete(&url),
        };

        if let Some(body) = body {
            builder = builder.json(body);
        }

        // Add request ID header for correlation
        builder.header("X-Request-ID", options.request_id.to_string())
    }

    /// Execute the request and map failures
    async fn execute(&self, builder: RequestBuilder, options: &RequestOptions) -> Result<Response> {
        let request_id = options.request_id;

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                warn!("Request timeout [request_id: {}]", request_id);
            } else {
                error!("Request error [request_id: {}]: {}", request_id, e);
            }
            OllamaError::from(e)
        })?;

        let status = response.status();
        debug!("Response status: {} [request_id: {}]", status, request_id);

        if !status.is_success() {
            // Try to get response body for error details
            let body = response.text().await.ok();

            warn!(
                "Request failed with status {} [request_id: {}]",
                status, request_id
            );

            return Err(super::error::map_http_error(
                status.as_u16(),
                body,
                request_id,
            ));
        }

        Ok(response)
    }

    /// Validate response content type
    fn validate_content_type(response: &Response) -> Result<()> {
        if let Some(content_type) = response.headers().get("content-type") {
            let content_type_str = content_type.to_str().unwrap_or("").to_lowercase();

            if !content_type_str.is_empty() && !content_type_str.contains("json") {
                return Err(OllamaError::MalformedResponse {
                    field: None,
                    message: format!("Expected a JSON body, got: {}", content_type_str),
                });
            }
        }

        Ok(())
    }

    /// Check response size to prevent OOM
    fn check_content_length(&self, response: &Response) -> Result<()> {
        if let Some(content_length) = response.content_length() {
            if content_length as usize > self.max_response_size {
                return Err(OllamaError::Transport(TransportError::Body(format!(
                    "Response size {} exceeds maximum {}",
                    content_length, self.max_response_size
                ))));
            }
        }

        Ok(())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, body: Option<Value>, options: RequestOptions) -> Result<Bytes> {
        let request_id = options.request_id;

        info!(
            "Executing {} request [request_id: {}]",
            options.endpoint.path(),
            request_id
        );

        let timeout = options.timeout.unwrap_or(self.request_timeout);
        let builder = self.build_request(body.as_ref(), &options).timeout(timeout);
        let response = self.execute(builder, &options).await?;

        self.check_content_length(&response)?;

        // Content type is only meaningful when there is a body
        if response.content_length() != Some(0) {
            Self::validate_content_type(&response)?;
        }

        let bytes = response.bytes().await.map_err(|e| {
            OllamaError::Transport(TransportError::Body(format!(
                "{} [request_id: {}]",
                e, request_id
            )))
        })?;

        if bytes.len() > self.max_response_size {
            return Err(OllamaError::Transport(TransportError::Body(format!(
                "Response size {} exceeds maximum {}",
                bytes.len(),
                self.max_response_size
            ))));
        }

        info!(
            "Request completed successfully [request_id: {}]",
            request_id
        );

        Ok(bytes)
    }

    async fn stream(&self, body: Option<Value>, options: RequestOptions) -> Result<ByteStream> {
        info!(
            "Opening stream to {} [request_id: {}]",
            options.endpoint.path(),
            options.request_id
        );

        let mut builder = self.build_request(body.as_ref(), &options);
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }
        let response = self.execute(builder, &options).await?;
        Self::validate_content_type(&response)?;

        let request_id = options.request_id;
        let stream = response
            .bytes_stream()
            .map_err(move |e| {
                warn!("Stream read error [request_id: {}]: {}", request_id, e);
                if e.is_timeout() {
                    TransportError::Timeout
                } else {
                    TransportError::Body(e.to_string())
                }
            })
            .boxed();

        Ok(stream)
    }
}
