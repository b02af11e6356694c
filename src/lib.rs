//! `agent_link` - terminal client core for a streaming assistant backend
//!
//! A reconnecting WebSocket transport, a conversation reducer, and the session
//! controller that joins them.

pub mod config;
pub mod console;
pub mod conversation;
pub mod protocol;
pub mod session;
pub mod transport;
