//! Feed error types

use crate::ws::WsError;
use thiserror::Error;

/// Transport-level failure of a live tier
///
/// These never reach subscribers; the manager absorbs them into tier
/// transitions.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("no exchange symbols to subscribe to")]
    NoSymbols,
    #[error("websocket: {0}")]
    WebSocket(#[from] WsError),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("ticker endpoint returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("failed to decode ticker response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// A payload that could not be turned into a price update
#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("invalid json: {0}")]
    Json(String),
    #[error("invalid number in field {field}: {value:?}")]
    Number { field: &'static str, value: String },
    #[error("price must be positive, got {0}")]
    NonPositivePrice(f64),
}

impl From<serde_json::Error> for ParseError {
    fn from(e: serde_json::Error) -> Self {
        ParseError::Json(e.to_string())
    }
}
