//! Reconnecting transport to the assistant backend
//!
//! One `Transport` owns one logical connection slot. A single driver task owns
//! the socket and the reconnect timer; the handle talks to it over channels.

mod driver;
pub mod machine;
mod traits;

#[cfg(test)]
pub mod testing;

pub use machine::LinkState;
pub use traits::{Connection, Connector, WsConnection, WsConnector};

use crate::protocol::{ClientMessage, ServerMessage};
use driver::Driver;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Default wait between a lost connection and the next attempt
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connect(String),
    #[error("Connection error: {0}")]
    Io(String),
    #[error("Transport already started")]
    AlreadyStarted,
    #[error("Transport is closed")]
    Closed,
}

/// State shared between the handle and the driver
#[derive(Default)]
struct Shared {
    /// The one active inbound consumer
    subscriber: Mutex<Option<Subscriber>>,
    next_subscription: AtomicU64,
}

struct Subscriber {
    id: u64,
    tx: mpsc::UnboundedSender<ServerMessage>,
}

impl Shared {
    fn install(&self, subscriber: Option<Subscriber>) -> Option<u64> {
        let mut slot = self
            .subscriber
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *slot, subscriber).map(|previous| previous.id)
    }

    /// Hand an inbound event to the active subscriber, if any
    fn deliver(&self, message: ServerMessage) {
        let slot = self
            .subscriber
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some(subscriber) => {
                if subscriber.tx.send(message).is_err() {
                    tracing::trace!(subscription = subscriber.id, "Subscriber dropped; event discarded");
                }
            }
            None => tracing::trace!(kind = message.kind(), "No subscriber; event discarded"),
        }
    }
}

/// Receiving end of the single inbound subscription.
///
/// Ends (yields `None`) once it is replaced or unsubscribed, after delivering
/// whatever was already queued.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    rx: mpsc::UnboundedReceiver<ServerMessage>,
}

impl Subscription {
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    pub async fn recv(&mut self) -> Option<ServerMessage> {
        self.rx.recv().await
    }
}

/// Cloneable fire-and-forget sender bound to one transport.
///
/// Frames are handed over only while the link is connected; anything else is
/// discarded, never queued for a later connection.
#[derive(Clone)]
pub struct OutboundSender {
    tx: mpsc::UnboundedSender<String>,
    status: watch::Receiver<LinkState>,
}

impl OutboundSender {
    pub fn send(&self, message: &ClientMessage) {
        if !self.status.borrow().is_connected() {
            tracing::debug!(?message, "Not connected; dropping outbound message");
            return;
        }
        match message.to_frame() {
            Ok(frame) => {
                if self.tx.send(frame).is_err() {
                    tracing::debug!("Transport driver gone; dropping outbound message");
                }
            }
            Err(e) => tracing::warn!(error = %e, "Failed to encode outbound message"),
        }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.status.borrow().is_connected()
    }
}

pub struct Transport<C: Connector = WsConnector> {
    connector: Arc<C>,
    reconnect_delay: Duration,
    shared: Arc<Shared>,
    status_rx: watch::Receiver<LinkState>,
    /// Held until `connect` hands it to the driver
    status_tx: Option<watch::Sender<LinkState>>,
    outbound_tx: mpsc::UnboundedSender<String>,
    outbound_rx: Option<mpsc::UnboundedReceiver<String>>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl Transport<WsConnector> {
    /// WebSocket transport
    #[must_use]
    pub fn websocket(reconnect_delay: Duration) -> Self {
        Self::new(WsConnector, reconnect_delay)
    }
}

impl<C: Connector> Transport<C> {
    #[must_use]
    pub fn new(connector: C, reconnect_delay: Duration) -> Self {
        let (status_tx, status_rx) = watch::channel(LinkState::Disconnected);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        Self {
            connector: Arc::new(connector),
            reconnect_delay,
            shared: Arc::new(Shared::default()),
            status_rx,
            status_tx: Some(status_tx),
            outbound_tx,
            outbound_rx: Some(outbound_rx),
            cancel: CancellationToken::new(),
            task: None,
        }
    }

    /// Start the connection life cycle against `endpoint`.
    ///
    /// A transport manages exactly one slot.
    ///
    /// # Errors
    ///
    /// [`TransportError::AlreadyStarted`] on a second call and
    /// [`TransportError::Closed`] after [`Transport::close`].
    pub fn connect(&mut self, endpoint: impl Into<String>) -> Result<(), TransportError> {
        if self.cancel.is_cancelled() {
            return Err(TransportError::Closed);
        }
        let (Some(status_tx), Some(outbound_rx)) = (self.status_tx.take(), self.outbound_rx.take())
        else {
            return Err(TransportError::AlreadyStarted);
        };

        let driver = Driver::new(
            Arc::clone(&self.connector),
            endpoint.into(),
            self.reconnect_delay,
            status_tx,
            Arc::clone(&self.shared),
            outbound_rx,
            self.cancel.clone(),
        );
        self.task = Some(tokio::spawn(driver.run()));
        Ok(())
    }

    /// Encode and transmit if connected; otherwise drop silently
    pub fn send(&self, message: &ClientMessage) {
        self.sender().send(message);
    }

    #[must_use]
    pub fn sender(&self) -> OutboundSender {
        OutboundSender {
            tx: self.outbound_tx.clone(),
            status: self.status_rx.clone(),
        }
    }

    /// Become the one inbound consumer, ending any previous subscription
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.shared.next_subscription.fetch_add(1, Ordering::Relaxed);
        if let Some(previous) = self.shared.install(Some(Subscriber { id, tx })) {
            tracing::debug!(previous, replacement = id, "Replacing inbound subscriber");
        }
        Subscription { id, rx }
    }

    /// End the active subscription. Returns whether there was one.
    #[allow(clippy::must_use_candidate)] // Ending a subscription is the point; the flag is informational
    pub fn unsubscribe(&self) -> bool {
        self.shared.install(None).is_some()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.status_rx.borrow().is_connected()
    }

    #[must_use]
    pub fn state(&self) -> LinkState {
        *self.status_rx.borrow()
    }

    /// Watch connectivity changes
    #[must_use]
    pub fn status(&self) -> watch::Receiver<LinkState> {
        self.status_rx.clone()
    }

    /// Shut down for good.
    ///
    /// Cancels any pending reconnect or in-flight handshake and waits for the
    /// driver to stop, so no state change happens after this returns.
    pub async fn close(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Transport driver failed");
            }
        }
        if let Some(status_tx) = self.status_tx.take() {
            // Never connected; nobody else owns the status channel
            status_tx.send_replace(LinkState::Closed);
        }
        self.shared.install(None);
    }
}

impl<C: Connector> Drop for Transport<C> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
