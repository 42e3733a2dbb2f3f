//! crypto-feed: real-time crypto price feed for market dashboards
//!
//! This library provides the core components for:
//! - Push-stream prices from Binance `@ticker` streams
//! - Batch ticker polling when the stream is unavailable
//! - Local random-walk simulation as the infallible last resort
//! - Per-instrument update throttling
//! - Watchlist subscriptions with owned, droppable handles
//! - Structured logging and Prometheus metrics

pub mod cli;
pub mod config;
pub mod feed;
pub mod manager;
pub mod simulation;
pub mod telemetry;
pub mod ws;

pub use feed::{FeedSnapshot, FeedTier, Instrument, InstrumentRegistry, PriceUpdate};
pub use manager::{FeedHandle, FeedManager};
