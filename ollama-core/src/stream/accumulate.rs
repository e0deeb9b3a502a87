//! Folding streamed fragments into a complete response

use crate::protocol::{ChatResponse, GenerateResponse, Message, ToolCall};

/// Accumulates chat fragments into one assistant message
#[derive(Debug, Default)]
pub struct ChatAccumulator {
    content: String,
    thinking: String,
    tool_calls: Vec<ToolCall>,
    images: Vec<String>,
    last: Option<ChatResponse>,
}

impl ChatAccumulator {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one streamed record
    pub fn push(&mut self, chunk: ChatResponse) {
        self.content.push_str(&chunk.message.content);
        if let Some(thinking) = &chunk.message.thinking {
            self.thinking.push_str(thinking);
        }
        self.tool_calls.extend(chunk.message.tool_calls().iter().cloned());
        if let Some(images) = &chunk.message.images {
            self.images.extend(images.iter().cloned());
        }
        self.last = Some(chunk);
    }

    /// Content received so far
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Whether the terminal record has been seen
    pub fn is_done(&self) -> bool {
        self.last.as_ref().is_some_and(|r| r.done)
    }

    /// Build the complete response
    ///
    /// Metadata and usage come from the last record. Returns `None` if no
    /// record was pushed.
    pub fn finish(self) -> Option<ChatResponse> {
        let mut response = self.last?;
        let role = response.message.role;
        let mut message = Message::new(role, self.content);
        if !self.thinking.is_empty() {
            message.thinking = Some(self.thinking);
        }
        if !self.tool_calls.is_empty() {
            message.tool_calls = Some(self.tool_calls);
        }
        if !self.images.is_empty() {
            message.images = Some(self.images);
        }
        response.message = message;
        Some(response)
    }
}

/// Accumulates generation fragments into one response
#[derive(Debug, Default)]
pub struct GenerateAccumulator {
    response: String,
    thinking: String,
    last: Option<GenerateResponse>,
}

impl GenerateAccumulator {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one streamed record
    pub fn push(&mut self, chunk: GenerateResponse) {
        self.response.push_str(&chunk.response);
        if let Some(thinking) = &chunk.thinking {
            self.thinking.push_str(thinking);
        }
        self.last = Some(chunk);
    }

    /// Text received so far
    pub fn response(&self) -> &str {
        &self.response
    }

    /// Whether the terminal record has been seen
    pub fn is_done(&self) -> bool {
        self.last.as_ref().is_some_and(|r| r.done)
    }

    /// Build the complete response, `None` if no record was pushed
    pub fn finish(self) -> Option<GenerateResponse> {
        let mut response = self.last?;
        response.response = self.response;
        response.thinking = (!self.thinking.is_empty()).then_some(self.thinking);
        Some(response)
    }
}
