//! Tool calling
//!
//! Tools are registered in a [`ToolRegistry`], declared to the model through
//! [`ToolRegistry::definitions`], and run by the [`ToolOrchestrator`] when an
//! assistant message asks for them.

pub mod orchestrator;
pub mod registry;
pub mod value;

pub use orchestrator::{ToolOrchestrator, ToolResult, TurnOutcome, TurnState};
pub use registry::{Arguments, Tool, ToolRegistry};
pub use value::Coerce;
