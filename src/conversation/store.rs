//! Conversation store and its mutation operations
//!
//! Every operation is deterministic in the current state and its arguments.
//! History is append-only: only the last message may change in place, and
//! only by appending text or tool-call references.

use super::{Message, Role, ToolCall, ToolResult, ToolStatus};
use indexmap::IndexMap;
use thiserror::Error;

/// Rejected mutations. The state is left untouched whenever one is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversationError {
    #[error("Tool call {0} is already active")]
    DuplicateToolCall(String),
    #[error("Tool call {id} already finished with status {status:?}")]
    ToolCallFinished { id: String, status: ToolStatus },
}

/// What `record_tool_result` did with a result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultOutcome {
    /// Active call completed and a result message was appended
    Appended,
    /// Active call completed; the last message does not reference it
    Recorded,
    /// Call is no longer active but the last message references it
    AppendedOnly,
    /// Matched nothing; dropped
    Unmatched,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversation {
    messages: Vec<Message>,
    /// Active tool calls keyed by id. Ids are unique; insertion order is
    /// announcement order.
    active_tool_calls: IndexMap<String, ToolCall>,
    /// Results received for active tool calls, keyed by tool call id
    tool_results: IndexMap<String, ToolResult>,
    /// Bumped on every reset
    generation: u64,
}

impl Conversation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[must_use]
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    #[must_use]
    pub fn active_tool_calls(&self) -> &IndexMap<String, ToolCall> {
        &self.active_tool_calls
    }

    #[must_use]
    pub fn tool_call(&self, id: &str) -> Option<&ToolCall> {
        self.active_tool_calls.get(id)
    }

    #[must_use]
    pub fn tool_results(&self) -> &IndexMap<String, ToolResult> {
        &self.tool_results
    }

    /// Number of resets so far; lets observers tell a fresh history apart
    /// from a continuation of the old one
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.active_tool_calls.is_empty()
    }

    // ========================================================================
    // Message operations
    // ========================================================================

    pub fn append_user_message(&mut self, text: impl Into<String>) {
        self.messages.push(Message::user(text));
    }

    /// Open an empty assistant reply for streamed text
    pub fn begin_assistant_message(&mut self) {
        self.messages.push(Message::assistant(""));
    }

    pub fn append_system_message(&mut self, text: impl Into<String>) {
        self.messages.push(Message::system(text));
    }

    /// Append `delta` to the last message. Never creates a message.
    pub fn append_to_last(&mut self, delta: &str) {
        if let Some(last) = self.messages.last_mut() {
            last.content.push_str(delta);
        }
    }

    // ========================================================================
    // Tool operations
    // ========================================================================

    /// Register a newly announced tool call as executing.
    ///
    /// The id is also attached to the last message when that message is the
    /// assistant turn that announced the call.
    ///
    /// # Errors
    ///
    /// Same as [`Conversation::insert_tool_call`].
    pub fn begin_tool_call(
        &mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Result<(), ConversationError> {
        self.insert_tool_call(ToolCall::executing(id, name, arguments))
    }

    /// Register a tool call with an explicit initial status
    ///
    /// # Errors
    ///
    /// [`ConversationError::DuplicateToolCall`] when a call with the same id is
    /// already active; nothing changes in that case.
    pub fn insert_tool_call(&mut self, call: ToolCall) -> Result<(), ConversationError> {
        if self.active_tool_calls.contains_key(&call.id) {
            return Err(ConversationError::DuplicateToolCall(call.id));
        }

        if let Some(last) = self
            .messages
            .last_mut()
            .filter(|message| message.role == Role::Assistant)
        {
            if !last.references_tool_call(&call.id) {
                last.tool_calls.push(call.id.clone());
            }
        }

        self.active_tool_calls.insert(call.id.clone(), call);
        Ok(())
    }

    /// Apply a tool outcome.
    ///
    /// An active call moves to `Completed` regardless of `is_error`; the error
    /// is carried by the result content. A result message is appended only
    /// when the last message references the call.
    ///
    /// # Errors
    ///
    /// [`ConversationError::ToolCallFinished`] when the matching call already
    /// finished; nothing changes in that case.
    pub fn record_tool_result(
        &mut self,
        result: ToolResult,
    ) -> Result<ResultOutcome, ConversationError> {
        let id = result.tool_call_id.clone();
        let referenced = self
            .messages
            .last()
            .is_some_and(|message| message.references_tool_call(&id));

        let completed = match self.active_tool_calls.get_mut(&id) {
            Some(call) => {
                if !call.advance(ToolStatus::Completed) {
                    return Err(ConversationError::ToolCallFinished {
                        id,
                        status: call.status,
                    });
                }
                self.tool_results.insert(id, result.clone());
                true
            }
            None => false,
        };

        if referenced {
            self.messages.push(Message::tool_outcome(result));
        }

        Ok(match (completed, referenced) {
            (true, true) => ResultOutcome::Appended,
            (true, false) => ResultOutcome::Recorded,
            (false, true) => ResultOutcome::AppendedOnly,
            (false, false) => ResultOutcome::Unmatched,
        })
    }

    /// Forget every active tool call; history is untouched
    pub fn clear_active_tool_calls(&mut self) {
        self.active_tool_calls.clear();
        self.tool_results.clear();
    }

    /// Start over with an empty conversation
    pub fn reset(&mut self) {
        self.messages.clear();
        self.clear_active_tool_calls();
        self.generation += 1;
    }
}
