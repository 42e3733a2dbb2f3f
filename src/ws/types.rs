//! WebSocket types and configuration

use std::time::Duration;
use thiserror::Error;

/// WebSocket client configuration
#[derive(Debug, Clone)]
pub struct WsConfig {
    /// WebSocket URL to connect to
    pub url: String,
    /// Timeout for the opening handshake
    pub connect_timeout: Duration,
    /// Interval for sending ping frames
    pub ping_interval: Duration,
    /// Capacity of the message channel handed to the caller
    pub channel_capacity: usize,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            connect_timeout: Duration::from_secs(10),
            ping_interval: Duration::from_secs(30),
            channel_capacity: 1024,
        }
    }
}

impl WsConfig {
    /// Create a new config with the given URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set the handshake timeout
    pub fn connect_timeout(mut self, d: Duration) -> Self {
        self.connect_timeout = d;
        self
    }

    /// Set ping interval
    pub fn ping_interval(mut self, d: Duration) -> Self {
        self.ping_interval = d;
        self
    }
}

/// Events delivered by one WebSocket session
///
/// A session ends with exactly one `Closed` or `Error`.
#[derive(Debug, Clone)]
pub enum WsMessage {
    /// Text message
    Text(String),
    /// Binary message
    Binary(Vec<u8>),
    /// Remote side closed the connection
    Closed { code: Option<u16>, reason: String },
    /// Transport failure
    Error(WsError),
}

impl WsMessage {
    /// Whether this event ends the session
    pub fn is_terminal(&self) -> bool {
        matches!(self, WsMessage::Closed { .. } | WsMessage::Error(_))
    }
}

/// WebSocket errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum WsError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("handshake timed out after {0:?}")]
    Timeout(Duration),
    #[error("pong timeout")]
    PongTimeout,
    #[error("send failed: {0}")]
    SendFailed(String),
    #[error("stream ended unexpectedly")]
    StreamEnded,
}
