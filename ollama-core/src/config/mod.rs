//! Configuration module
//!
//! This module provides the client configuration schema, loading from YAML or
//! JSON files with `${VAR}` interpolation, and validation.

mod env;
mod error;
mod schema;

pub use env::{interpolate_env_vars, normalize_host};
pub use error::{ConfigError, ConfigResult, ValidationError, ValidationErrorKind};
pub use schema::{ClientConfig, ConnectionConfig, DEFAULT_HOST, HOST_ENV_VAR};

use std::fs;
use std::path::Path;

/// Load a configuration from a YAML file
pub fn load_from_yaml<P: AsRef<Path>>(path: P) -> ConfigResult<ClientConfig> {
    let path = path.as_ref();
    let content = read(path)?;

    // Interpolate environment variables before parsing
    let interpolated = env::interpolate_env_vars(&content)?;

    let config: ClientConfig =
        serde_yaml::from_str(&interpolated).map_err(|e| ConfigError::ParseError {
            path: path.to_string_lossy().to_string(),
            line: e.location().map(|l| l.line()),
            column: e.location().map(|l| l.column()),
            message: e.to_string(),
        })?;

    finish(config)
}

/// Load a configuration from a JSON file
pub fn load_from_json<P: AsRef<Path>>(path: P) -> ConfigResult<ClientConfig> {
    let path = path.as_ref();
    let content = read(path)?;

    // Interpolate environment variables before parsing
    let interpolated = env::interpolate_env_vars(&content)?;

    let config: ClientConfig =
        serde_json::from_str(&interpolated).map_err(|e| ConfigError::ParseError {
            path: path.to_string_lossy().to_string(),
            line: Some(e.line()),
            column: Some(e.column()),
            message: e.to_string(),
        })?;

    finish(config)
}

fn read(path: &Path) -> ConfigResult<String> {
    fs::read_to_string(path).map_err(|e| ConfigError::IoError {
        path: path.to_string_lossy().to_string(),
        source: e,
    })
}

fn finish(mut config: ClientConfig) -> ConfigResult<ClientConfig> {
    config.host = normalize_host(&config.host);
    config.validate()?;
    tracing::debug!("Loaded client configuration for {}", config.host);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_yaml() {
        let yaml = r#"
host: http://localhost:11434
connection:
  connect_timeout_ms: 5000
keep_alive: 10m
"#;
        let config: ClientConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.connection.connect_timeout_ms, 5000);
        assert_eq!(config.connection.max_idle_per_host, 10);
        assert_eq!(config.keep_alive.as_deref(), Some("10m"));
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let yaml = "host: http://localhost:11434\napi_key: nope\n";
        assert!(serde_yaml::from_str::<ClientConfig>(yaml).is_err());
    }
}
