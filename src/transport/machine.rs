//! Pure connection state machine
//!
//! Given the current link state and an event, produces the next state and the
//! effects the driver must execute. No I/O happens here.

use std::time::Duration;
use thiserror::Error;

/// Connection life cycle of one transport slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// Terminal; reached only through `close()`
    Closed,
}

impl LinkState {
    #[must_use]
    pub fn is_connected(self) -> bool {
        matches!(self, LinkState::Connected)
    }

    #[must_use]
    pub fn is_closed(self) -> bool {
        matches!(self, LinkState::Closed)
    }
}

/// Things that happen to the link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// Owner asked to start the life cycle
    Connect,
    /// Handshake finished
    Opened,
    /// Remote close, I/O error, or failed handshake
    Lost { reason: String },
    /// The reconnect delay elapsed
    RetryElapsed,
    /// Owner asked to stop for good
    Close,
}

/// Work for the driver after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEffect {
    /// Start a connection attempt
    OpenSocket,
    /// Drop the current socket or in-flight attempt
    DropSocket,
    /// Arm the single reconnect timer
    ScheduleReconnect { delay: Duration },
    /// Disarm the reconnect timer if armed
    CancelReconnect,
    /// Publish connectivity
    NotifyStatus { connected: bool },
}

/// Result of a link transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: LinkState,
    pub effects: Vec<LinkEffect>,
}

impl TransitionResult {
    #[must_use]
    pub fn new(state: LinkState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    #[must_use]
    pub fn with_effect(mut self, effect: LinkEffect) -> Self {
        self.effects.push(effect);
        self
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Invalid link transition: {0}")]
    InvalidTransition(String),
}

/// Pure link transition function.
///
/// `reconnect_delay` is the fixed wait between a loss and the next attempt.
///
/// # Errors
///
/// Returns [`TransitionError::InvalidTransition`] for an event that has no
/// meaning in `state`, such as `Opened` while disconnected.
pub fn transition(
    state: LinkState,
    event: LinkEvent,
    reconnect_delay: Duration,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // Nothing leaves Closed
        (LinkState::Closed, _) => Ok(TransitionResult::new(LinkState::Closed)),

        // Close from anywhere
        (_, LinkEvent::Close) => Ok(TransitionResult::new(LinkState::Closed)
            .with_effect(LinkEffect::CancelReconnect)
            .with_effect(LinkEffect::DropSocket)
            .with_effect(LinkEffect::NotifyStatus { connected: false })),

        // Initial attempt or the timer firing
        (LinkState::Disconnected, LinkEvent::Connect | LinkEvent::RetryElapsed) => {
            Ok(TransitionResult::new(LinkState::Connecting).with_effect(LinkEffect::OpenSocket))
        }

        (LinkState::Connecting, LinkEvent::Opened) => Ok(TransitionResult::new(
            LinkState::Connected,
        )
        .with_effect(LinkEffect::NotifyStatus { connected: true })),

        // Loss while live or mid-handshake: one timer, armed once
        (LinkState::Connecting | LinkState::Connected, LinkEvent::Lost { .. }) => {
            Ok(TransitionResult::new(LinkState::Disconnected)
                .with_effect(LinkEffect::DropSocket)
                .with_effect(LinkEffect::NotifyStatus { connected: false })
                .with_effect(LinkEffect::ScheduleReconnect {
                    delay: reconnect_delay,
                }))
        }

        // A second loss signal for the same socket (error then close) must not
        // arm another timer
        (LinkState::Disconnected, LinkEvent::Lost { .. }) => {
            Ok(TransitionResult::new(LinkState::Disconnected))
        }

        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "No transition from {state:?} with event {event:?}"
        ))),
    }
}
