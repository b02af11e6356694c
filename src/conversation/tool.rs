//! Tool invocations and their outcomes

use crate::protocol::{ToolCallPayload, ToolResultPayload};
use serde::Serialize;
use serde_json::Value;

/// Longest result text shown before truncation
const PREVIEW_CHARS: usize = 500;

/// Lifecycle of a tool call.
///
/// Only moves forward: `Pending -> Executing -> Completed | Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Pending,
    Executing,
    Completed,
    Error,
}

impl ToolStatus {
    fn rank(self) -> u8 {
        match self {
            ToolStatus::Pending => 0,
            ToolStatus::Executing => 1,
            ToolStatus::Completed | ToolStatus::Error => 2,
        }
    }

    #[must_use]
    pub fn is_finished(self) -> bool {
        matches!(self, ToolStatus::Completed | ToolStatus::Error)
    }

    /// Whether `next` is a legal successor of `self`
    #[must_use]
    pub fn can_advance_to(self, next: ToolStatus) -> bool {
        next.rank() > self.rank()
    }

    #[must_use]
    pub fn indicator(self) -> &'static str {
        match self {
            ToolStatus::Pending => "[ ]",
            ToolStatus::Executing => "[*]",
            ToolStatus::Completed => "[+]",
            ToolStatus::Error => "[x]",
        }
    }
}

/// A backend-initiated tool invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// Raw argument payload, never interpreted beyond presentation
    pub arguments: String,
    pub status: ToolStatus,
}

impl ToolCall {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
        status: ToolStatus,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
            status,
        }
    }

    /// Tool call as announced by the backend, already running
    #[must_use]
    pub fn executing(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self::new(id, name, arguments, ToolStatus::Executing)
    }

    /// Move to `next`, refusing to regress or stay put.
    ///
    /// Returns `false` and leaves the status untouched when the move is illegal.
    pub fn advance(&mut self, next: ToolStatus) -> bool {
        if self.status.can_advance_to(next) {
            self.status = next;
            true
        } else {
            false
        }
    }

    /// Arguments rendered as `key=value` pairs when they form a JSON object,
    /// otherwise the raw payload.
    #[must_use]
    pub fn display_arguments(&self) -> String {
        match serde_json::from_str::<Value>(&self.arguments) {
            Ok(Value::Object(map)) => map
                .iter()
                .map(|(key, value)| match value {
                    Value::String(s) => format!("{key}={s}"),
                    other => format!("{key}={other}"),
                })
                .collect::<Vec<_>>()
                .join(" "),
            _ => self.arguments.clone(),
        }
    }
}

impl From<ToolCallPayload> for ToolCall {
    fn from(payload: ToolCallPayload) -> Self {
        Self::executing(payload.id, payload.name, payload.arguments)
    }
}

/// Outcome of one tool call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolResult {
    pub tool_call_id: String,
    pub content: String,
    pub is_error: bool,
}

impl ToolResult {
    #[must_use]
    pub fn success(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            content: content.into(),
            is_error: false,
        }
    }

    #[must_use]
    pub fn error(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            content: content.into(),
            is_error: true,
        }
    }

    /// Content cut to a displayable length
    #[must_use]
    pub fn preview(&self) -> String {
        let mut chars = self.content.chars();
        let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
        if chars.next().is_some() {
            format!("{head}...")
        } else {
            head
        }
    }
}

impl From<ToolResultPayload> for ToolResult {
    fn from(payload: ToolResultPayload) -> Self {
        Self {
            tool_call_id: payload.tool_call_id,
            content: payload.content,
            is_error: payload.is_error,
        }
    }
}
