//! Session controller
//!
//! Maps backend events and user actions onto the conversation and publishes a
//! fresh [`Snapshot`] after each one. All mutation happens on whichever task
//! owns the `Session`; in the binary that is the [`SessionRuntime`] loop.

mod runtime;
mod snapshot;

#[cfg(test)]
pub mod testing;

pub use runtime::{SessionHandle, SessionRuntime, UserCommand};
pub use snapshot::Snapshot;

use crate::conversation::{Conversation, ResultOutcome, ToolResult};
use crate::protocol::{ClientMessage, ServerMessage};
use crate::transport::OutboundSender;
use tokio::sync::watch;

/// Where client messages go. Delivery is best-effort.
pub trait Outbound: Send + Sync + 'static {
    fn send(&self, message: &ClientMessage);
}

impl Outbound for OutboundSender {
    fn send(&self, message: &ClientMessage) {
        OutboundSender::send(self, message);
    }
}

pub struct Session<O: Outbound> {
    conversation: Conversation,
    outbound: O,
    connected: bool,
    snapshot_tx: watch::Sender<Snapshot>,
}

impl<O: Outbound> Session<O> {
    #[must_use]
    pub fn new(outbound: O) -> Self {
        let (snapshot_tx, _) = watch::channel(Snapshot::default());
        Self {
            conversation: Conversation::new(),
            outbound,
            connected: false,
            snapshot_tx,
        }
    }

    #[must_use]
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Current read-only view
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.conversation, self.connected)
    }

    /// Receive a snapshot after every processed event, action or status change
    #[must_use]
    pub fn observe(&self) -> watch::Receiver<Snapshot> {
        self.snapshot_tx.subscribe()
    }

    // ========================================================================
    // User actions
    // ========================================================================

    /// Record and send a prompt verbatim. Returns `false` when the input is
    /// blank.
    pub fn submit(&mut self, text: &str) -> bool {
        if text.trim().is_empty() {
            return false;
        }

        self.conversation.append_user_message(text);
        self.outbound.send(&ClientMessage::prompt(text));
        tracing::debug!(len = text.len(), connected = self.connected, "Prompt submitted");
        self.publish();
        true
    }

    /// Ask the backend to stop the turn in flight
    pub fn cancel(&mut self) {
        tracing::info!("Cancelling turn");
        self.outbound.send(&ClientMessage::Cancel);
    }

    pub fn reset(&mut self) {
        tracing::info!(messages = self.conversation.messages().len(), "Resetting conversation");
        self.conversation.reset();
        self.publish();
    }

    pub fn set_connected(&mut self, connected: bool) {
        if self.connected == connected {
            return;
        }
        self.connected = connected;
        self.publish();
    }

    // ========================================================================
    // Backend events
    // ========================================================================

    pub fn handle_event(&mut self, event: ServerMessage) {
        match event {
            ServerMessage::Chunk { content, is_first } => {
                if is_first {
                    self.conversation.begin_assistant_message();
                }
                self.conversation.append_to_last(&content);
            }
            ServerMessage::ToolCall { tool_call } => {
                tracing::debug!(id = %tool_call.id, name = %tool_call.name, "Tool call started");
                if let Err(e) = self.conversation.insert_tool_call(tool_call.into()) {
                    tracing::warn!(error = %e, "Ignoring tool call");
                    return;
                }
            }
            ServerMessage::ToolResult { tool_result } => {
                let result = ToolResult::from(tool_result);
                let id = result.tool_call_id.clone();
                match self.conversation.record_tool_result(result) {
                    Ok(ResultOutcome::Unmatched) => {
                        tracing::debug!(id = %id, "Tool result matches no known call");
                        return;
                    }
                    Ok(outcome) => tracing::debug!(id = %id, ?outcome, "Tool result recorded"),
                    Err(e) => {
                        tracing::warn!(error = %e, "Ignoring tool result");
                        return;
                    }
                }
            }
            ServerMessage::Done => {
                self.conversation.clear_active_tool_calls();
            }
            ServerMessage::Error { message } => {
                tracing::warn!(message = %message, "Backend reported an error");
                self.conversation
                    .append_system_message(format!("Error: {message}"));
            }
            ServerMessage::Unknown => {
                tracing::debug!("Ignoring unknown event");
                return;
            }
        }
        self.publish();
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.snapshot());
    }
}
