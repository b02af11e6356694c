//! Mock outbound channel for testing

use super::Outbound;
use crate::protocol::ClientMessage;
use std::sync::{Arc, Mutex};

/// Records every message instead of sending it
#[derive(Clone, Default)]
pub struct MockOutbound {
    sent: Arc<Mutex<Vec<ClientMessage>>>,
}

impl MockOutbound {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn sent(&self) -> Vec<ClientMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// Recorded messages as wire frames
    #[must_use]
    pub fn frames(&self) -> Vec<String> {
        self.sent()
            .iter()
            .map(|message| message.to_frame().unwrap())
            .collect()
    }
}

impl Outbound for MockOutbound {
    fn send(&self, message: &ClientMessage) {
        self.sent.lock().unwrap().push(message.clone());
    }
}
