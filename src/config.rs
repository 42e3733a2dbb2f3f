//! Configuration types for crypto-feed

use crate::feed::binance::{BINANCE_STREAM_URL, BINANCE_TICKER_URL};
use crate::feed::{Instrument, InstrumentRegistry};
use crate::telemetry::LogFormat;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Upper bound on a single reconnect backoff
const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(3600);

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    /// Instrument id → exchange symbol overrides
    #[serde(default)]
    pub registry: BTreeMap<String, String>,
    /// Instruments to watch
    #[serde(default)]
    pub watchlist: Vec<Instrument>,
}

/// Price feed configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Combined-stream WebSocket base URL
    #[serde(default = "default_stream_url")]
    pub stream_url: String,

    /// Batch ticker REST endpoint
    #[serde(default = "default_ticker_url")]
    pub ticker_url: String,

    /// Stream reconnects before falling back to polling
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,

    /// Base of the exponential reconnect backoff (ms)
    #[serde(default = "default_reconnect_base_delay_ms")]
    pub reconnect_base_delay_ms: u64,

    /// Interval between batch fetches (seconds)
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Delay before retrying the stream after a failed poll (seconds)
    #[serde(default = "default_poll_retry_delay_secs")]
    pub poll_retry_delay_secs: u64,

    /// Simulation tick period (ms)
    #[serde(default = "default_simulation_tick_ms")]
    pub simulation_tick_ms: u64,

    /// Minimum interval between accepted updates per instrument (ms)
    #[serde(default = "default_throttle_ms")]
    pub throttle_ms: u64,

    /// HTTP and WebSocket handshake timeout (seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_stream_url() -> String {
    BINANCE_STREAM_URL.to_string()
}
fn default_ticker_url() -> String {
    BINANCE_TICKER_URL.to_string()
}
fn default_max_reconnect_attempts() -> u32 {
    5
}
fn default_reconnect_base_delay_ms() -> u64 {
    3_000
}
fn default_poll_interval_secs() -> u64 {
    10
}
fn default_poll_retry_delay_secs() -> u64 {
    5
}
fn default_simulation_tick_ms() -> u64 {
    200
}
fn default_throttle_ms() -> u64 {
    100
}
fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            stream_url: default_stream_url(),
            ticker_url: default_ticker_url(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            reconnect_base_delay_ms: default_reconnect_base_delay_ms(),
            poll_interval_secs: default_poll_interval_secs(),
            poll_retry_delay_secs: default_poll_retry_delay_secs(),
            simulation_tick_ms: default_simulation_tick_ms(),
            throttle_ms: default_throttle_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl FeedConfig {
    /// Backoff before reconnect number `attempt + 1`: `base × 2^attempt`, capped at one hour
    pub fn reconnect_delay(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt);
        Duration::from_millis(self.reconnect_base_delay_ms.saturating_mul(factor))
            .min(MAX_RECONNECT_DELAY)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn poll_retry_delay(&self) -> Duration {
        Duration::from_secs(self.poll_retry_delay_secs)
    }

    pub fn simulation_tick(&self) -> Duration {
        Duration::from_millis(self.simulation_tick_ms.max(1))
    }

    pub fn throttle_interval(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
    /// Port for the Prometheus scrape endpoint; disabled when absent
    pub metrics_port: Option<u16>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            metrics_port: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Built-in registry with the configured overrides applied
    pub fn instrument_registry(&self) -> InstrumentRegistry {
        let mut registry = InstrumentRegistry::with_defaults();
        registry.extend(self.registry.clone());
        registry
    }
}
