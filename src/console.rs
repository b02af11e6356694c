//! Line-oriented console front end
//!
//! Turns successive snapshots into text to append to a terminal, printing only
//! what changed since the previous snapshot.

use crate::conversation::{Message, ToolStatus};
use crate::session::{Snapshot, UserCommand};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::io;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;

/// One line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Command(UserCommand),
    Quit,
}

impl Input {
    #[must_use]
    pub fn parse(line: &str) -> Self {
        match line.trim() {
            "/quit" | "/exit" => Input::Quit,
            "/cancel" => Input::Command(UserCommand::Cancel),
            "/reset" => Input::Command(UserCommand::Reset),
            _ => Input::Command(UserCommand::Submit(line.to_string())),
        }
    }
}

/// Incremental renderer
#[derive(Debug, Default)]
pub struct Renderer {
    connected: Option<bool>,
    /// Conversation generation the printed messages belong to
    generation: u64,
    /// Messages fully or partially printed
    printed: usize,
    /// Bytes of the last printed message's content already written
    printed_len: usize,
    tool_status: HashMap<String, ToolStatus>,
}

impl Renderer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Text to append for `snapshot`; empty when nothing visible changed
    pub fn render(&mut self, snapshot: &Snapshot) -> String {
        let mut out = String::new();

        if self.connected != Some(snapshot.connected) {
            self.connected = Some(snapshot.connected);
            let _ = write!(out, "\n{}", snapshot.status_line());
        }

        if snapshot.generation != self.generation || snapshot.messages.len() < self.printed {
            self.generation = snapshot.generation;
            out.push_str("\n--- conversation reset ---");
            self.printed = 0;
            self.printed_len = 0;
            self.tool_status.clear();
        }

        // Streamed text for the message printed last time
        if let Some(last) = self.printed.checked_sub(1).and_then(|i| snapshot.messages.get(i)) {
            if let Some(delta) = last.content.get(self.printed_len..) {
                out.push_str(delta);
            }
            self.printed_len = last.content.len();
        }

        for message in &snapshot.messages[self.printed..] {
            write_message(&mut out, message);
            self.printed_len = message.content.len();
        }
        self.printed = snapshot.messages.len();

        for (id, call) in &snapshot.active_tool_calls {
            if self.tool_status.get(id) == Some(&call.status) {
                continue;
            }
            self.tool_status.insert(id.clone(), call.status);
            let _ = write!(
                out,
                "\n  {} {} {}",
                call.status.indicator(),
                call.name,
                call.display_arguments()
            );
        }
        if snapshot.active_tool_calls.is_empty() {
            self.tool_status.clear();
        }

        out
    }
}

/// Print snapshot deltas to `out` until the session goes away.
///
/// # Errors
///
/// Stops at the first write or flush failure and returns it.
pub async fn print_snapshots<W>(mut snapshots: watch::Receiver<Snapshot>, mut out: W) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut renderer = Renderer::new();
    loop {
        let text = renderer.render(&snapshots.borrow_and_update());
        if !text.is_empty() {
            write_flush(&mut out, text.as_bytes()).await?;
        }
        if snapshots.changed().await.is_err() {
            return write_flush(&mut out, b"\n").await;
        }
    }
}

async fn write_flush<W: AsyncWrite + Unpin>(out: &mut W, bytes: &[u8]) -> io::Result<()> {
    out.write_all(bytes).await?;
    out.flush().await
}

fn write_message(out: &mut String, message: &Message) {
    match &message.tool_result {
        Some(result) => {
            let marker = if result.is_error { "error" } else { "result" };
            let _ = write!(out, "\n  {marker}: {}", result.preview());
        }
        None => {
            let _ = write!(out, "\n{}: {}", message.role.label(), message.content);
        }
    }
}
