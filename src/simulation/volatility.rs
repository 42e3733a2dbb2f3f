//! Simulated volatility and drift terms

/// Lower bound on per-tick volatility
pub const MIN_VOLATILITY: f64 = 0.0001;

/// Upper bound on per-tick volatility; also bounds the total move per tick
pub const MAX_VOLATILITY: f64 = 0.005;

/// Market cap at which volatility reaches 1.0 before clamping
const VOLATILITY_SCALE: f64 = 1e9;

/// Amplitude of the oscillating trend bias
pub const TREND_AMPLITUDE: f64 = 0.0001;

/// Wall-clock divisor of the trend oscillation (ms per radian)
const TREND_PERIOD_MS: f64 = 10_000.0;

/// Per-tick volatility derived from market cap
///
/// Larger caps move less. Unknown or non-positive caps get the maximum.
pub fn volatility_for_market_cap(market_cap: f64) -> f64 {
    if !market_cap.is_finite() || market_cap <= 0.0 {
        return MAX_VOLATILITY;
    }
    (VOLATILITY_SCALE / market_cap).clamp(MIN_VOLATILITY, MAX_VOLATILITY)
}

/// Slow sinusoidal bias so the walk is not pure noise
pub fn trend_term(now_ms: i64) -> f64 {
    TREND_AMPLITUDE * (now_ms as f64 / TREND_PERIOD_MS).sin()
}
