//! Wire protocol between the client and the assistant backend
//!
//! Both directions are JSON objects discriminated by a `type` field.

use serde::{Deserialize, Serialize};

/// Messages sent from the client to the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// A user prompt starting a new turn
    Prompt { content: String },
    /// Ask the backend to abandon the turn in flight
    Cancel,
}

impl ClientMessage {
    #[must_use]
    pub fn prompt(content: impl Into<String>) -> Self {
        ClientMessage::Prompt {
            content: content.into(),
        }
    }

    /// Encode as a single text frame
    ///
    /// # Errors
    ///
    /// Fails only if serialization fails, which these variants never do.
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Tool invocation announced by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallPayload {
    pub id: String,
    pub name: String,
    /// Raw argument payload, usually a JSON document encoded as a string
    #[serde(default)]
    pub arguments: String,
}

/// Tool outcome reported by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResultPayload {
    #[serde(rename = "toolCallId", alias = "tool_call_id", default)]
    pub tool_call_id: String,
    #[serde(default)]
    pub content: String,
    #[serde(rename = "isError", alias = "is_error", default)]
    pub is_error: bool,
}

/// Messages received from the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Streamed assistant text; `is_first` opens a new reply
    Chunk {
        content: String,
        #[serde(rename = "isFirst", alias = "is_first", default)]
        is_first: bool,
    },
    ToolCall {
        tool_call: ToolCallPayload,
    },
    ToolResult {
        tool_result: ToolResultPayload,
    },
    /// End of the current turn
    Done,
    Error {
        #[serde(alias = "error", default)]
        message: String,
    },
    /// Any `type` this client does not understand
    #[serde(other)]
    Unknown,
}

impl ServerMessage {
    /// Parse one inbound text frame.
    ///
    /// Returns `None` for anything that is not a well-formed envelope.
    #[must_use]
    pub fn from_frame(frame: &str) -> Option<Self> {
        serde_json::from_str(frame)
            .inspect_err(|e| {
                tracing::debug!(error = %e, len = frame.len(), "Dropping malformed frame");
            })
            .ok()
    }

    /// Event name as it appears on the wire
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::Chunk { .. } => "chunk",
            ServerMessage::ToolCall { .. } => "tool_call",
            ServerMessage::ToolResult { .. } => "tool_result",
            ServerMessage::Done => "done",
            ServerMessage::Error { .. } => "error",
            ServerMessage::Unknown => "unknown",
        }
    }
}
