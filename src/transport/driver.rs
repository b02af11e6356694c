//! Transport driver task
//!
//! Owns the socket, the in-flight handshake and the one reconnect timer.
//! Every change of link state goes through [`machine::transition`]; the driver
//! only executes the resulting effects.

use super::machine::{self, LinkEffect, LinkEvent, LinkState};
use super::{Connection, Connector, Shared, TransportError};
use crate::protocol::ServerMessage;
use futures::future::BoxFuture;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Sleep;
use tokio_util::sync::CancellationToken;

/// Upper bound on a graceful socket close before the socket is just dropped
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

type PendingConnect<C> = BoxFuture<'static, Result<C, TransportError>>;

pub(super) struct Driver<C: Connector> {
    connector: Arc<C>,
    endpoint: String,
    reconnect_delay: Duration,
    state: LinkState,
    status_tx: watch::Sender<LinkState>,
    shared: Arc<Shared>,
    outbound_rx: mpsc::UnboundedReceiver<String>,
    cancel: CancellationToken,
    socket: Option<C::Conn>,
    pending_connect: Option<PendingConnect<C::Conn>>,
    reconnect_timer: Option<Pin<Box<Sleep>>>,
}

impl<C: Connector> Driver<C> {
    pub(super) fn new(
        connector: Arc<C>,
        endpoint: String,
        reconnect_delay: Duration,
        status_tx: watch::Sender<LinkState>,
        shared: Arc<Shared>,
        outbound_rx: mpsc::UnboundedReceiver<String>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            connector,
            endpoint,
            reconnect_delay,
            state: LinkState::Disconnected,
            status_tx,
            shared,
            outbound_rx,
            cancel,
            socket: None,
            pending_connect: None,
            reconnect_timer: None,
        }
    }

    pub(super) async fn run(mut self) {
        tracing::info!(endpoint = %self.endpoint, "Starting transport");
        self.apply(LinkEvent::Connect).await;

        while !self.state.is_closed() {
            let event = tokio::select! {
                biased;

                () = self.cancel.cancelled() => LinkEvent::Close,

                result = next_connect(&mut self.pending_connect) => {
                    self.pending_connect = None;
                    match result {
                        Ok(conn) => {
                            self.socket = Some(conn);
                            LinkEvent::Opened
                        }
                        Err(e) => LinkEvent::Lost { reason: e.to_string() },
                    }
                }

                frame = next_frame(&mut self.socket) => match frame {
                    Some(Ok(text)) => {
                        self.dispatch(&text);
                        continue;
                    }
                    Some(Err(e)) => LinkEvent::Lost { reason: e.to_string() },
                    None => LinkEvent::Lost { reason: "closed by peer".to_string() },
                },

                Some(frame) = self.outbound_rx.recv() => match self.write(frame).await {
                    Ok(()) => continue,
                    Err(e) => LinkEvent::Lost { reason: e.to_string() },
                },

                () = next_tick(&mut self.reconnect_timer) => {
                    self.reconnect_timer = None;
                    LinkEvent::RetryElapsed
                }
            };

            self.apply(event).await;
        }

        tracing::info!(endpoint = %self.endpoint, "Transport stopped");
    }

    async fn apply(&mut self, event: LinkEvent) {
        if let LinkEvent::Lost { reason } = &event {
            tracing::warn!(state = ?self.state, reason = %reason, "Connection lost");
        }

        let result = match machine::transition(self.state, event, self.reconnect_delay) {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring link event");
                return;
            }
        };

        if result.new_state != self.state {
            tracing::debug!(from = ?self.state, to = ?result.new_state, "Link state change");
        }
        self.state = result.new_state;

        for effect in result.effects {
            self.execute(effect).await;
        }
    }

    async fn execute(&mut self, effect: LinkEffect) {
        match effect {
            LinkEffect::OpenSocket => {
                self.reconnect_timer = None;
                self.discard_outbound();
                tracing::debug!(endpoint = %self.endpoint, "Opening connection");
                let connector = Arc::clone(&self.connector);
                let endpoint = self.endpoint.clone();
                self.pending_connect =
                    Some(Box::pin(async move { connector.connect(&endpoint).await }));
            }
            LinkEffect::DropSocket => {
                self.pending_connect = None;
                if let Some(mut socket) = self.socket.take() {
                    if tokio::time::timeout(CLOSE_TIMEOUT, socket.close())
                        .await
                        .is_err()
                    {
                        tracing::debug!("Socket close timed out");
                    }
                }
                self.discard_outbound();
            }
            LinkEffect::ScheduleReconnect { delay } => {
                debug_assert!(self.reconnect_timer.is_none(), "reconnect timer already armed");
                tracing::info!(delay = ?delay, "Scheduling reconnect");
                self.reconnect_timer = Some(Box::pin(tokio::time::sleep(delay)));
            }
            LinkEffect::CancelReconnect => {
                self.reconnect_timer = None;
            }
            LinkEffect::NotifyStatus { connected } => {
                if connected {
                    // Frames written before this point belong to no connection
                    self.discard_outbound();
                    tracing::info!(endpoint = %self.endpoint, "Connected");
                }
                self.status_tx.send_replace(self.state);
            }
        }
    }

    async fn write(&mut self, frame: String) -> Result<(), TransportError> {
        let Some(socket) = self.socket.as_mut() else {
            tracing::debug!("No open socket; dropping outbound frame");
            return Ok(());
        };
        socket.send_text(frame).await
    }

    fn dispatch(&self, frame: &str) {
        if let Some(message) = ServerMessage::from_frame(frame) {
            tracing::trace!(kind = message.kind(), "Inbound event");
            self.shared.deliver(message);
        }
    }

    fn discard_outbound(&mut self) {
        let mut dropped = 0usize;
        while self.outbound_rx.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            tracing::debug!(dropped, "Discarded outbound frames with no live connection");
        }
    }
}

async fn next_connect<T>(pending: &mut Option<BoxFuture<'static, T>>) -> T {
    match pending {
        Some(fut) => fut.await,
        None => std::future::pending().await,
    }
}

async fn next_frame<T: Connection>(
    socket: &mut Option<T>,
) -> Option<Result<String, TransportError>> {
    match socket {
        Some(socket) => socket.recv_text().await,
        None => std::future::pending().await,
    }
}

async fn next_tick(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(sleep) => sleep.as_mut().await,
        None => std::future::pending().await,
    }
}
