//! Conversation state
//!
//! Ordered message history plus the id-keyed set of tool calls active in the
//! current turn. The session controller is the only writer.

mod message;
mod store;
mod tool;

#[cfg(test)]
mod proptests;

pub use message::{Message, Role};
pub use store::{Conversation, ConversationError, ResultOutcome};
pub use tool::{ToolCall, ToolResult, ToolStatus};
