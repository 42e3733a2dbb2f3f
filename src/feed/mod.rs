//! Price feed module
//!
//! Exchange adapters, the instrument registry and the data types shared by
//! every acquisition tier.

pub mod binance;
mod error;
mod registry;
mod types;

pub use binance::{BinanceRest, BinanceStream};
pub use error::{FeedError, ParseError};
pub use registry::InstrumentRegistry;
pub use types::{FeedSnapshot, FeedTier, Instrument, PriceUpdate};

use crate::ws::WsConnection;
use async_trait::async_trait;

/// A quote as reported by the exchange, before id resolution
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeTicker {
    /// Exchange symbol (e.g., "BTCUSDT")
    pub symbol: String,
    pub price: f64,
    pub change_24h: f64,
    pub volume_24h: f64,
}

/// Opens push-stream sessions
#[async_trait]
pub trait StreamConnector: Send + Sync {
    /// Open one session subscribed to all `symbols`
    async fn connect(&self, symbols: &[String]) -> Result<WsConnection, FeedError>;

    /// Decode one text frame of this stream
    fn parse_message(&self, msg: &str) -> Result<ExchangeTicker, ParseError>;
}

/// Fetches batch price snapshots
#[async_trait]
pub trait TickerSource: Send + Sync {
    /// Fetch the current ticker for each of `symbols`
    async fn fetch(&self, symbols: &[String]) -> Result<Vec<ExchangeTicker>, FeedError>;
}
