//! Configuration schema structures with serde support

use super::env::normalize_host;
use super::error::ValidationError;
use serde::{Deserialize, Serialize};

/// Environment variable naming the server host
pub const HOST_ENV_VAR: &str = "OLLAMA_HOST";

/// Default server address
pub const DEFAULT_HOST: &str = "http://127.0.0.1:11434";

/// Root client configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Server base URL (supports environment variable interpolation)
    #[serde(default = "default_host")]
    pub host: String,

    /// Connection settings
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Keep-alive applied to requests that do not set one (e.g. "5m")
    #[serde(default)]
    pub keep_alive: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            connection: ConnectionConfig::default(),
            keep_alive: None,
        }
    }
}

/// Connection configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    /// Connection timeout in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    /// Timeout for non-streaming requests in milliseconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// Maximum idle connections per host
    #[serde(default = "default_max_idle")]
    pub max_idle_per_host: usize,

    /// Idle connection keep-alive in seconds
    #[serde(default = "default_keepalive")]
    pub keepalive_secs: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout(),
            request_timeout_ms: default_request_timeout(),
            max_idle_per_host: default_max_idle(),
            keepalive_secs: default_keepalive(),
        }
    }
}

// Default value functions for serde
fn default_host() -> String { DEFAULT_HOST.to_string() }
fn default_connect_timeout() -> u64 { 10_000 }
fn default_request_timeout() -> u64 { 300_000 }
fn default_max_idle() -> usize { 10 }
fn default_keepalive() -> u64 { 90 }

impl ClientConfig {
    /// Create a configuration for the given host
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: normalize_host(&host.into()),
            ..Default::default()
        }
    }

    /// Build a configuration from `OLLAMA_HOST`, falling back to the default host
    pub fn from_env() -> Self {
        match std::env::var(HOST_ENV_VAR) {
            Ok(host) if !host.trim().is_empty() => Self::new(host),
            _ => Self::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.host.is_empty() {
            return Err(ValidationError::required("host"));
        }

        match url::Url::parse(&self.host) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    return Err(ValidationError::invalid_url(
                        "host",
                        format!("URL scheme must be http or https, got: {}", url.scheme()),
                    ));
                }
            }
            Err(e) => return Err(ValidationError::invalid_url("host", e.to_string())),
        }

        if let Some(keep_alive) = &self.keep_alive {
            if keep_alive.trim().is_empty() {
                return Err(ValidationError::required("keep_alive"));
            }
        }

        self.connection.validate("connection")
    }
}

impl ConnectionConfig {
    /// Validate connection settings
    pub fn validate(&self, path: &str) -> Result<(), ValidationError> {
        if self.connect_timeout_ms == 0 {
            return Err(ValidationError::out_of_range(
                format!("{}.connect_timeout_ms", path),
                "Must be greater than 0",
            ));
        }

        if self.request_timeout_ms == 0 {
            return Err(ValidationError::out_of_range(
                format!("{}.request_timeout_ms", path),
                "Must be greater than 0",
            ));
        }

        Ok(())
    }
}
