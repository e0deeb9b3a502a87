//! Tool handling for a single chat turn
//!
//! The orchestrator inspects one complete assistant message, runs every tool
//! call it contains, and appends the results to the conversation. It never
//! sends the follow-up request; turn sequencing belongs to the caller.

use super::registry::ToolRegistry;
use crate::error::Result;
use crate::protocol::{ChatResponse, Message, ToolCall};
use serde_json::Value;
use tracing::debug;

/// States of a single tool turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    AwaitingResponse,
    InspectingResponse,
    NoToolCall,
    ToolCallDetected,
    InvokingTool,
    AppendingResult,
    Done,
}

/// Result of one tool call
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    /// The call as requested by the model
    pub call: ToolCall,
    /// Value returned by the tool
    pub output: Value,
}

impl ToolResult {
    /// Message carrying this result back to the model
    pub fn to_message(&self) -> Message {
        Message::tool(render(&self.output)).with_tool_name(self.call.name())
    }
}

/// What happened during a turn
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// The assistant answered without calling a tool
    NoToolCall,
    /// Every requested tool ran and its result was appended
    ToolsInvoked(Vec<ToolResult>),
}

impl TurnOutcome {
    /// Whether the caller should send another request to continue the turn
    pub fn needs_follow_up(&self) -> bool {
        matches!(self, TurnOutcome::ToolsInvoked(_))
    }
}

/// Drives the tool-call state machine for one assistant response
#[derive(Debug)]
pub struct ToolOrchestrator<'a> {
    registry: &'a ToolRegistry,
    state: TurnState,
}

impl<'a> ToolOrchestrator<'a> {
    /// Create an orchestrator over a registry
    pub fn new(registry: &'a ToolRegistry) -> Self {
        Self {
            registry,
            state: TurnState::AwaitingResponse,
        }
    }

    /// Current state
    pub fn state(&self) -> TurnState {
        self.state
    }

    /// Handle a complete chat response
    pub async fn handle_response(
        &mut self,
        history: &mut Vec<Message>,
        response: &ChatResponse,
    ) -> Result<TurnOutcome> {
        self.handle_message(history, &response.message).await
    }

    /// Handle a complete assistant message
    ///
    /// On success the history gains the assistant message followed by one
    /// `tool` message per call. If any call fails the error is returned and
    /// the history is left untouched.
    pub async fn handle_message(
        &mut self,
        history: &mut Vec<Message>,
        message: &Message,
    ) -> Result<TurnOutcome> {
        self.transition(TurnState::InspectingResponse);

        if !message.has_tool_calls() {
            self.transition(TurnState::NoToolCall);
            history.push(message.clone());
            self.transition(TurnState::Done);
            return Ok(TurnOutcome::NoToolCall);
        }

        self.transition(TurnState::ToolCallDetected);
        let mut results = Vec::with_capacity(message.tool_calls().len());
        for call in message.tool_calls() {
            self.transition(TurnState::InvokingTool);
            let output = match self.registry.invoke(call).await {
                Ok(output) => output,
                Err(e) => {
                    self.transition(TurnState::Done);
                    return Err(e);
                }
            };
            results.push(ToolResult {
                call: call.clone(),
                output,
            });
        }

        self.transition(TurnState::AppendingResult);
        history.push(message.clone());
        history.extend(results.iter().map(ToolResult::to_message));
        self.transition(TurnState::Done);

        Ok(TurnOutcome::ToolsInvoked(results))
    }

    fn transition(&mut self, next: TurnState) {
        debug!("Tool turn {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

/// Text sent back to the model for a tool result
fn render(output: &Value) -> String {
    match output {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
