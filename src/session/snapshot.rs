//! Read-only view handed to the rendering layer

use crate::conversation::{Conversation, Message, ToolCall, ToolResult};
use indexmap::IndexMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub messages: Vec<Message>,
    /// Active tool calls in announcement order
    pub active_tool_calls: IndexMap<String, ToolCall>,
    pub tool_results: IndexMap<String, ToolResult>,
    pub connected: bool,
    /// Changes whenever the conversation was reset
    pub generation: u64,
}

impl Snapshot {
    #[must_use]
    pub fn capture(conversation: &Conversation, connected: bool) -> Self {
        Self {
            messages: conversation.messages().to_vec(),
            active_tool_calls: conversation.active_tool_calls().clone(),
            tool_results: conversation.tool_results().clone(),
            connected,
            generation: conversation.generation(),
        }
    }

    #[must_use]
    pub fn status_line(&self) -> &'static str {
        if self.connected {
            "● Connected"
        } else {
            "○ Disconnected"
        }
    }
}
