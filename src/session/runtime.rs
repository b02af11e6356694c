//! Session runtime loop
//!
//! Single task that owns the [`Session`]. Backend events, user commands and
//! connectivity changes are applied one at a time, each to completion.

use super::{Outbound, Session, Snapshot};
use crate::transport::{LinkState, Subscription};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

const COMMAND_BUFFER: usize = 32;

/// Actions coming from the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    Submit(String),
    Cancel,
    Reset,
}

/// Cloneable handle for the front end
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<UserCommand>,
    snapshots: watch::Receiver<Snapshot>,
}

impl SessionHandle {
    /// Queue a command. Returns `false` once the runtime has stopped.
    pub async fn send(&self, command: UserCommand) -> bool {
        self.commands.send(command).await.is_ok()
    }

    pub async fn submit(&self, text: impl Into<String>) -> bool {
        self.send(UserCommand::Submit(text.into())).await
    }

    #[must_use]
    pub fn snapshots(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.clone()
    }
}

pub struct SessionRuntime<O: Outbound> {
    session: Session<O>,
    inbound: Subscription,
    status: watch::Receiver<LinkState>,
    commands: mpsc::Receiver<UserCommand>,
    shutdown: CancellationToken,
}

impl<O: Outbound> SessionRuntime<O> {
    #[must_use]
    pub fn new(
        session: Session<O>,
        inbound: Subscription,
        status: watch::Receiver<LinkState>,
        shutdown: CancellationToken,
    ) -> (Self, SessionHandle) {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let handle = SessionHandle {
            commands: tx,
            snapshots: session.observe(),
        };
        let runtime = Self {
            session,
            inbound,
            status,
            commands: rx,
            shutdown,
        };
        (runtime, handle)
    }

    /// Run until shutdown, or until the transport side goes away.
    ///
    /// Hands the session back so the caller can inspect the final state.
    pub async fn run(mut self) -> Session<O> {
        tracing::info!(subscription = self.inbound.id(), "Starting session runtime");
        let connected = self.status.borrow_and_update().is_connected();
        self.session.set_connected(connected);

        loop {
            tokio::select! {
                biased;

                () = self.shutdown.cancelled() => break,

                event = self.inbound.recv() => {
                    let Some(event) = event else {
                        tracing::info!("Inbound stream ended");
                        break;
                    };
                    self.session.handle_event(event);
                }

                changed = self.status.changed() => {
                    if changed.is_err() {
                        tracing::info!("Transport stopped");
                        break;
                    }
                    let state = *self.status.borrow_and_update();
                    tracing::debug!(?state, "Connectivity changed");
                    self.session.set_connected(state.is_connected());
                }

                Some(command) = self.commands.recv() => self.apply(command),
            }
        }

        self.session.set_connected(false);
        tracing::info!("Session runtime stopped");
        self.session
    }

    fn apply(&mut self, command: UserCommand) {
        match command {
            UserCommand::Submit(text) => {
                self.session.submit(&text);
            }
            UserCommand::Cancel => self.session.cancel(),
            UserCommand::Reset => self.session.reset(),
        }
    }
}
