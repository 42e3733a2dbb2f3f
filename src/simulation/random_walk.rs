//! Bounded random-walk price generator

use super::volatility::{trend_term, volatility_for_market_cap, MAX_VOLATILITY};
use crate::feed::{Instrument, PriceUpdate};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

/// Simulated prices never fall below this share of the reference price
pub const PRICE_FLOOR_RATIO: f64 = 0.1;

/// Full width of the per-tick volume jitter (±2.5%)
const VOLUME_JITTER: f64 = 0.05;

/// Synthetic tick generator with an injectable random source
pub struct PriceSimulator {
    rng: Box<dyn RngCore + Send>,
}

impl PriceSimulator {
    /// Simulator seeded from OS entropy
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic simulator
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    /// Simulator drawing from the given source
    pub fn with_rng(rng: impl RngCore + Send + 'static) -> Self {
        Self { rng: Box::new(rng) }
    }

    /// Advance one instrument by one tick
    pub fn step(
        &mut self,
        instrument: &Instrument,
        current: &PriceUpdate,
        now: DateTime<Utc>,
    ) -> PriceUpdate {
        let reference = instrument.reference_price;
        let volatility = volatility_for_market_cap(instrument.market_cap);

        let noise = self.rng.gen_range(-0.5..0.5) * 2.0 * volatility;
        let delta = (noise + trend_term(now.timestamp_millis()))
            .clamp(-MAX_VOLATILITY, MAX_VOLATILITY);

        let base = if current.price > 0.0 {
            current.price
        } else {
            reference
        };
        let price = (base * (1.0 + delta)).max(reference * PRICE_FLOOR_RATIO);

        // Deviation from reference, not compounded on the previous change
        let change_24h = (price - reference) / reference * 100.0;

        let jitter = self.rng.gen_range(-0.5..0.5) * VOLUME_JITTER;
        let volume_24h = (current.volume_24h * (1.0 + jitter))
            .max(instrument.reference_volume_24h * PRICE_FLOOR_RATIO)
            .max(0.0);

        PriceUpdate {
            id: instrument.id.clone(),
            price,
            change_24h,
            volume_24h,
            timestamp: now,
        }
    }
}

impl Default for PriceSimulator {
    fn default() -> Self {
        Self::new()
    }
}
