//! Price feed types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A tracked asset and the baseline values it was seeded with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    /// Stable internal identifier, unique within a watchlist
    pub id: String,
    /// Baseline price; seeds the store and anchors the simulation floor
    pub reference_price: f64,
    /// Baseline 24h change in percent
    #[serde(default)]
    pub reference_change_24h: f64,
    /// Baseline 24h volume
    #[serde(default)]
    pub reference_volume_24h: f64,
    /// Market capitalisation, only used to derive simulated volatility
    #[serde(default)]
    pub market_cap: f64,
}

impl Instrument {
    /// Create an instrument with the given id and reference price
    pub fn new(id: impl Into<String>, reference_price: f64) -> Self {
        Self {
            id: id.into(),
            reference_price,
            reference_change_24h: 0.0,
            reference_volume_24h: 0.0,
            market_cap: 0.0,
        }
    }

    /// Set the reference 24h change
    pub fn change_24h(mut self, change: f64) -> Self {
        self.reference_change_24h = change;
        self
    }

    /// Set the reference 24h volume
    pub fn volume_24h(mut self, volume: f64) -> Self {
        self.reference_volume_24h = volume;
        self
    }

    /// Set the market cap
    pub fn market_cap(mut self, cap: f64) -> Self {
        self.market_cap = cap;
        self
    }

    /// Build the seed update from the reference values
    pub fn seed_update(&self, timestamp: DateTime<Utc>) -> PriceUpdate {
        PriceUpdate {
            id: self.id.clone(),
            price: self.reference_price,
            change_24h: self.reference_change_24h,
            volume_24h: self.reference_volume_24h.max(0.0),
            timestamp,
        }
    }
}

/// Latest known market snapshot for one instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceUpdate {
    /// Instrument id
    pub id: String,
    /// Last price, always positive
    pub price: f64,
    /// 24h change in percent
    pub change_24h: f64,
    /// 24h volume
    pub volume_24h: f64,
    /// Local acquisition time
    pub timestamp: DateTime<Utc>,
}

impl PriceUpdate {
    /// Whether this update may be published
    pub fn is_publishable(&self) -> bool {
        self.price.is_finite()
            && self.price > 0.0
            && self.change_24h.is_finite()
            && self.volume_24h.is_finite()
            && self.volume_24h >= 0.0
    }
}

/// Acquisition strategy currently serving the watchlist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedTier {
    /// Push stream from the exchange
    Streaming,
    /// Periodic batch fetch
    Polling,
    /// Local random walk
    Simulating,
}

impl FeedTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedTier::Streaming => "streaming",
            FeedTier::Polling => "polling",
            FeedTier::Simulating => "simulating",
        }
    }
}

impl fmt::Display for FeedTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only view handed to consumers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedSnapshot {
    pub prices: HashMap<String, PriceUpdate>,
    pub is_connected: bool,
    pub last_update: Option<DateTime<Utc>>,
    pub tier: FeedTier,
    pub reconnect_attempts: u32,
}

impl FeedSnapshot {
    /// Latest update for an instrument
    pub fn price(&self, id: &str) -> Option<&PriceUpdate> {
        self.prices.get(id)
    }
}
