//! WebSocket client library
//!
//! Provides a single-session WebSocket client with ping/pong keepalive.
//! Sessions are owned handles; dropping one closes the socket.

mod client;
mod types;

pub use client::{WsClient, WsConnection};
pub use types::{WsConfig, WsError, WsMessage};
