//! Price simulation
//!
//! Local random walk used as the terminal fallback tier.

mod random_walk;
mod volatility;

pub use random_walk::{PriceSimulator, PRICE_FLOOR_RATIO};
pub use volatility::{
    trend_term, volatility_for_market_cap, MAX_VOLATILITY, MIN_VOLATILITY, TREND_AMPLITUDE,
};
