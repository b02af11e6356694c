//! Mock connector for testing
//!
//! Connection attempts are scripted up front. With nothing scripted an attempt
//! never finishes, which is how tests hold the transport mid-handshake.

use super::{Connection, Connector, TransportError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

// ============================================================================
// Mock Connector
// ============================================================================

#[derive(Default)]
struct ConnectorState {
    script: VecDeque<Result<MockConnection, TransportError>>,
    endpoints: Vec<String>,
}

/// Connector that hands out scripted outcomes in order
#[derive(Clone, Default)]
pub struct MockConnector {
    state: Arc<Mutex<ConnectorState>>,
}

impl MockConnector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Let the next attempt succeed; the returned peer drives that connection
    #[must_use]
    pub fn accept_next(&self) -> MockPeer {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (sent_tx, sent_rx) = mpsc::unbounded_channel();
        let log = Arc::new(Mutex::new(Vec::new()));
        let closed = Arc::new(AtomicBool::new(false));
        let broken = Arc::new(AtomicBool::new(false));

        let conn = MockConnection {
            inbound: inbound_rx,
            sent: sent_tx,
            log: Arc::clone(&log),
            closed: Arc::clone(&closed),
            broken: Arc::clone(&broken),
        };
        self.state.lock().unwrap().script.push_back(Ok(conn));

        MockPeer {
            inbound: Mutex::new(Some(inbound_tx)),
            sent: tokio::sync::Mutex::new(sent_rx),
            log,
            closed,
            broken,
        }
    }

    /// Make the next attempt fail
    pub fn refuse_next(&self, reason: &str) {
        self.state
            .lock()
            .unwrap()
            .script
            .push_back(Err(TransportError::Connect(reason.to_string())));
    }

    #[must_use]
    pub fn attempts(&self) -> usize {
        self.state.lock().unwrap().endpoints.len()
    }

    #[must_use]
    pub fn endpoints(&self) -> Vec<String> {
        self.state.lock().unwrap().endpoints.clone()
    }
}

#[async_trait]
impl Connector for MockConnector {
    type Conn = MockConnection;

    async fn connect(&self, endpoint: &str) -> Result<MockConnection, TransportError> {
        let next = {
            let mut state = self.state.lock().unwrap();
            state.endpoints.push(endpoint.to_string());
            state.script.pop_front()
        };
        match next {
            Some(outcome) => outcome,
            None => std::future::pending().await,
        }
    }
}

// ============================================================================
// Mock Connection
// ============================================================================

pub struct MockConnection {
    inbound: mpsc::UnboundedReceiver<Result<String, TransportError>>,
    sent: mpsc::UnboundedSender<String>,
    log: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
    /// Writes fail once set
    broken: Arc<AtomicBool>,
}

#[async_trait]
impl Connection for MockConnection {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(TransportError::Io("broken pipe".to_string()));
        }
        self.log.lock().unwrap().push(text.clone());
        let _ = self.sent.send(text);
        Ok(())
    }

    async fn recv_text(&mut self) -> Option<Result<String, TransportError>> {
        self.inbound.recv().await
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Test-side end of one mock connection
pub struct MockPeer {
    inbound: Mutex<Option<mpsc::UnboundedSender<Result<String, TransportError>>>>,
    sent: tokio::sync::Mutex<mpsc::UnboundedReceiver<String>>,
    log: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
    broken: Arc<AtomicBool>,
}

impl MockPeer {
    /// Deliver a raw frame to the client
    pub fn push(&self, frame: &str) {
        if let Some(tx) = self.inbound.lock().unwrap().as_ref() {
            let _ = tx.send(Ok(frame.to_string()));
        }
    }

    /// Surface a read error on the client's next receive
    pub fn fail(&self, reason: &str) {
        if let Some(tx) = self.inbound.lock().unwrap().as_ref() {
            let _ = tx.send(Err(TransportError::Io(reason.to_string())));
        }
    }

    /// Make every later client write fail
    pub fn break_writes(&self) {
        self.broken.store(true, Ordering::SeqCst);
    }

    /// Simulate the remote side closing the connection
    pub fn disconnect(&self) {
        self.inbound.lock().unwrap().take();
    }

    /// Wait for the next frame the client writes
    pub async fn next_sent(&self) -> Option<String> {
        self.sent.lock().await.recv().await
    }

    /// Every frame the client wrote so far
    #[must_use]
    pub fn sent(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    /// Whether the client closed this connection
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
