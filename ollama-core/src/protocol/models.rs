//! Embedding and model-management payloads
//!
//! These are plain request/response bodies with no streaming state.

use super::types::Options;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Input for an embedding request, one text or a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EmbedInput {
    /// A single text
    Single(String),
    /// Several texts embedded in one call
    Batch(Vec<String>),
}

impl EmbedInput {
    /// Number of texts to embed
    pub fn len(&self) -> usize {
        match self {
            EmbedInput::Single(_) => 1,
            EmbedInput::Batch(inputs) => inputs.len(),
        }
    }

    /// Whether there is nothing to embed
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<&str> for EmbedInput {
    fn from(input: &str) -> Self {
        EmbedInput::Single(input.to_string())
    }
}

impl From<String> for EmbedInput {
    fn from(input: String) -> Self {
        EmbedInput::Single(input)
    }
}

impl From<Vec<String>> for EmbedInput {
    fn from(inputs: Vec<String>) -> Self {
        EmbedInput::Batch(inputs)
    }
}

impl From<Vec<&str>> for EmbedInput {
    fn from(inputs: Vec<&str>) -> Self {
        EmbedInput::Batch(inputs.into_iter().map(str::to_string).collect())
    }
}

/// Embedding request for `/api/embed`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedRequest {
    pub model: String,

    pub input: EmbedInput,

    /// Truncate inputs that exceed the context length
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truncate: Option<bool>,

    /// Requested embedding dimensions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Options>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<String>,
}

impl EmbedRequest {
    /// Create an embedding request
    pub fn new(model: impl Into<String>, input: impl Into<EmbedInput>) -> Self {
        Self {
            model: model.into(),
            input: input.into(),
            truncate: None,
            dimensions: None,
            options: None,
            keep_alive: None,
        }
    }

    /// Set truncation behavior
    pub fn with_truncate(mut self, truncate: bool) -> Self {
        self.truncate = Some(truncate);
        self
    }
}

/// Embedding response, one vector per input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedResponse {
    pub model: String,

    pub embeddings: Vec<Vec<f32>>,

    #[serde(default)]
    pub total_duration: u64,

    #[serde(default)]
    pub load_duration: u64,

    #[serde(default)]
    pub prompt_eval_count: u64,
}

/// Model family and quantization details
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_model: Option<String>,

    #[serde(default)]
    pub format: String,

    #[serde(default)]
    pub family: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub families: Option<Vec<String>>,

    #[serde(default)]
    pub parameter_size: String,

    #[serde(default)]
    pub quantization_level: String,
}

/// Locally available model, as listed by `/api/tags`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub name: String,

    #[serde(default)]
    pub model: String,

    pub modified_at: DateTime<Utc>,

    pub size: u64,

    pub digest: String,

    #[serde(default)]
    pub details: ModelDetails,
}

/// Response of `/api/tags`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListModelsResponse {
    #[serde(default)]
    pub models: Vec<ModelSummary>,
}

/// Model currently loaded in memory, as listed by `/api/ps`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunningModel {
    pub name: String,

    #[serde(default)]
    pub model: String,

    pub size: u64,

    pub digest: String,

    #[serde(default)]
    pub details: ModelDetails,

    pub expires_at: DateTime<Utc>,

    #[serde(default)]
    pub size_vram: u64,
}

/// Response of `/api/ps`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListRunningModelsResponse {
    #[serde(default)]
    pub models: Vec<RunningModel>,
}

/// Response of `/api/version`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionResponse {
    pub version: String,
}

/// Request for `/api/create`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateModelRequest {
    /// Name of the model to create
    pub model: String,

    /// Existing model to derive from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,

    /// Modelfile contents
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modelfile: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Map<String, Value>>,

    /// Always false; progress updates are not consumed
    pub stream: bool,
}

impl CreateModelRequest {
    /// Create a model from a Modelfile
    pub fn from_modelfile(model: impl Into<String>, modelfile: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            from: None,
            modelfile: Some(modelfile.into()),
            system: None,
            template: None,
            parameters: None,
            stream: false,
        }
    }

    /// Create a model derived from an existing one
    pub fn from_base(model: impl Into<String>, base: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            from: Some(base.into()),
            modelfile: None,
            system: None,
            template: None,
            parameters: None,
            stream: false,
        }
    }

    /// Set a system prompt for the new model
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set a model parameter
    pub fn with_parameter(mut self, key: impl Into<String>, value: Value) -> Self {
        self.parameters
            .get_or_insert_with(Map::new)
            .insert(key.into(), value);
        self
    }
}

/// Status reply of `/api/create`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    /// Whether the server reported success
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// Request body naming a single model (`/api/show`, `/api/delete`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRequest {
    pub model: String,
}

/// Response of `/api/show`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowModelResponse {
    #[serde(default)]
    pub modelfile: String,

    #[serde(default)]
    pub parameters: String,

    #[serde(default)]
    pub template: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(default)]
    pub details: ModelDetails,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_info: Option<Map<String, Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_embed_input_shapes() {
        let single = serde_json::to_value(EmbedRequest::new("m", "hello")).unwrap();
        assert_eq!(single["input"], json!("hello"));

        let batch = serde_json::to_value(EmbedRequest::new("m", vec!["a", "b"])).unwrap();
        assert_eq!(batch["input"], json!(["a", "b"]));
        assert_eq!(EmbedInput::from(vec!["a", "b"]).len(), 2);
    }

    #[test]
    fn test_show_response_parent_model() {
        let body = json!({
            "modelfile": "FROM llama3.2:latest",
            "parameters": "temperature 0.7",
            "template": "{{ .Prompt }}",
            "details": {
                "parent_model": "llama3.2:latest",
                "format": "gguf",
                "family": "llama",
                "parameter_size": "3.2B",
                "quantization_level": "Q4_K_M"
            }
        });
        let show: ShowModelResponse = serde_json::from_value(body).unwrap();
        assert_eq!(show.details.parent_model.as_deref(), Some("llama3.2:latest"));
        assert!(show.capabilities.is_none());
    }

    #[test]
    fn test_create_request_skips_unset_fields() {
        let request = CreateModelRequest::from_base("mario", "llama3.2")
            .with_parameter("temperature", json!(0.7));
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "model": "mario",
                "from": "llama3.2",
                "parameters": {"temperature": 0.7},
                "stream": false
            })
        );
    }
}
