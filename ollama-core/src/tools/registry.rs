//! Tool registration and invocation
//!
//! Provides:
//! - `Tool`: a named async function with a declared parameter schema
//! - `Arguments`: the coerced argument map handed to a tool
//! - `ToolRegistry`: exact-name lookup, declarations for the model, and the
//!   single-call invocation primitive

use super::value::Coerce;
use crate::error::{BoxError, OllamaError, Result};
use crate::protocol::{FunctionDefinition, ToolCall, ToolDefinition};
use futures::future::{BoxFuture, FutureExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

type Handler =
    Arc<dyn Fn(Arguments) -> BoxFuture<'static, std::result::Result<Value, BoxError>> + Send + Sync>;

/// Arguments passed to a tool, already coerced to their declared types
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    values: Map<String, Value>,
}

impl Arguments {
    /// Wrap an argument map
    pub fn new(values: Map<String, Value>) -> Self {
        Self { values }
    }

    /// Raw value of an argument
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Whether an argument is present
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// String argument
    pub fn get_str(&self, name: &str) -> Result<String> {
        self.convert(name, Value::coerce_string)
    }

    /// Numeric argument
    pub fn get_f64(&self, name: &str) -> Result<f64> {
        self.convert(name, Value::coerce_f64)
    }

    /// Integer argument
    pub fn get_i64(&self, name: &str) -> Result<i64> {
        self.convert(name, Value::coerce_i64)
    }

    /// Boolean argument
    pub fn get_bool(&self, name: &str) -> Result<bool> {
        self.convert(name, Value::coerce_bool)
    }

    /// Deserialize all arguments into a typed struct
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(Value::Object(self.values.clone())).map_err(|e| {
            OllamaError::ArgumentType {
                parameter: "arguments".to_string(),
                message: e.to_string(),
            }
        })
    }

    /// Underlying map
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }

    fn convert<T>(
        &self,
        name: &str,
        f: impl FnOnce(&Value) -> std::result::Result<T, String>,
    ) -> Result<T> {
        let value = self.values.get(name).ok_or_else(|| OllamaError::ArgumentType {
            parameter: name.to_string(),
            message: "missing argument".to_string(),
        })?;
        f(value).map_err(|message| OllamaError::ArgumentType {
            parameter: name.to_string(),
            message,
        })
    }
}

impl From<Map<String, Value>> for Arguments {
    fn from(values: Map<String, Value>) -> Self {
        Self::new(values)
    }
}

/// A function the model may call
#[derive(Clone)]
pub struct Tool {
    name: String,
    description: String,
    /// Parameter name to JSON-schema descriptor, in declaration order
    parameters: Map<String, Value>,
    required: Vec<String>,
    handler: Handler,
}

impl Tool {
    /// Create a tool from an async function
    ///
    /// The function's output is serialized to JSON; its error is kept as the
    /// source of [`OllamaError::ToolFailed`].
    pub fn new<F, Fut, O, E>(name: impl Into<String>, description: impl Into<String>, f: F) -> Self
    where
        F: Fn(Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<O, E>> + Send + 'static,
        O: Serialize + 'static,
        E: Into<BoxError> + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Map::new(),
            required: Vec::new(),
            handler: handler(f),
        }
    }

    /// Declare a parameter with a JSON-schema descriptor
    pub fn with_parameter(mut self, name: impl Into<String>, schema: Value, required: bool) -> Self {
        let name = name.into();
        if required && !self.required.contains(&name) {
            self.required.push(name.clone());
        }
        self.parameters.insert(name, schema);
        self
    }

    /// Tool name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tool description
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Names of required parameters
    pub fn required(&self) -> &[String] {
        &self.required
    }

    /// Declaration sent to the model
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: self.name.clone(),
                description: self.description.clone(),
                parameters: json!({
                    "type": "object",
                    "properties": self.parameters,
                    "required": self.required,
                }),
            },
        }
    }

    /// Convert raw arguments to the declared parameter types
    pub fn coerce(&self, raw: &Map<String, Value>) -> Result<Arguments> {
        if let Some(missing) = self.required.iter().find(|name| {
            raw.get(name.as_str()).map_or(true, Value::is_null)
        }) {
            return Err(OllamaError::ArgumentType {
                parameter: missing.clone(),
                message: "missing required argument".to_string(),
            });
        }

        let mut values = Map::new();
        for (name, value) in raw {
            let declared = self
                .parameters
                .get(name)
                .and_then(|schema| schema.get("type"))
                .and_then(Value::as_str);

            let value = match declared {
                Some(schema_type) if !value.is_null() => {
                    value
                        .coerce_to(schema_type)
                        .map_err(|message| OllamaError::ArgumentType {
                            parameter: name.clone(),
                            message,
                        })?
                }
                _ => value.clone(),
            };
            values.insert(name.clone(), value);
        }

        Ok(Arguments::new(values))
    }

    /// Coerce the arguments and run the tool
    pub async fn call(&self, raw: &Map<String, Value>) -> Result<Value> {
        let args = self.coerce(raw)?;
        (self.handler)(args)
            .await
            .map_err(|source| OllamaError::ToolFailed {
                name: self.name.clone(),
                source,
            })
    }
}

fn handler<F, Fut, O, E>(f: F) -> Handler
where
    F: Fn(Arguments) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<O, E>> + Send + 'static,
    O: Serialize + 'static,
    E: Into<BoxError> + 'static,
{
    Arc::new(move |args| {
        let fut = f(args);
        async move {
            let output = fut.await.map_err(Into::<BoxError>::into)?;
            serde_json::to_value(output).map_err(|e| Box::new(e) as BoxError)
        }
        .boxed()
    })
}

impl fmt::Debug for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("parameters", &self.parameters)
            .field("required", &self.required)
            .finish_non_exhaustive()
    }
}

/// Registered tools, looked up by exact name
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Tool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any tool with the same name
    pub fn register(&mut self, tool: Tool) -> &mut Self {
        match self.index.get(tool.name()) {
            Some(&i) => {
                debug!("Replacing tool '{}'", tool.name());
                self.tools[i] = tool;
            }
            None => {
                self.index.insert(tool.name().to_string(), self.tools.len());
                self.tools.push(tool);
            }
        }
        self
    }

    /// Builder-style registration
    pub fn with_tool(mut self, tool: Tool) -> Self {
        self.register(tool);
        self
    }

    /// Look up a tool by name (case-sensitive)
    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    /// Declarations for every tool, in registration order
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(Tool::definition).collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Run the tool a call asks for
    pub async fn invoke(&self, call: &ToolCall) -> Result<Value> {
        let tool = self.get(call.name()).ok_or_else(|| {
            warn!("Model requested unknown tool '{}'", call.name());
            OllamaError::UnknownTool {
                name: call.name().to_string(),
            }
        })?;

        debug!("Invoking tool '{}'", tool.name());
        let result = tool.call(call.arguments()).await;
        if let Err(e) = &result {
            warn!("Tool '{}' failed: {}", tool.name(), e);
        }
        result
    }
}
