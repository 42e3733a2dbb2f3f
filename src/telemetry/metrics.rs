//! Prometheus metrics

use crate::feed::FeedTier;
use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::{Ipv4Addr, SocketAddr};

/// Why an incoming update never reached the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// Payload failed to parse
    Malformed,
    /// Symbol not in the registry or not in the watchlist
    UnknownSymbol,
    /// Inside the per-instrument throttle window
    Throttled,
    /// Non-positive or non-finite values
    Unpublishable,
}

impl DiscardReason {
    fn as_str(&self) -> &'static str {
        match self {
            DiscardReason::Malformed => "malformed",
            DiscardReason::UnknownSymbol => "unknown_symbol",
            DiscardReason::Throttled => "throttled",
            DiscardReason::Unpublishable => "unpublishable",
        }
    }
}

/// Start the Prometheus scrape endpoint on all interfaces
pub fn install_prometheus(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics exporter: {}", e))?;
    tracing::info!(%addr, "Metrics endpoint listening");
    Ok(())
}

/// Count updates written to the store
pub fn record_accepted(tier: FeedTier, count: usize) {
    counter!("cryptofeed_updates_accepted_total", "tier" => tier.as_str())
        .increment(count as u64);
}

/// Count an update dropped before the store
pub fn record_discarded(reason: DiscardReason) {
    counter!("cryptofeed_updates_discarded_total", "reason" => reason.as_str()).increment(1);
}

/// Count a scheduled stream reconnect
pub fn record_reconnect() {
    counter!("cryptofeed_stream_reconnects_total").increment(1);
}

/// Count a downward tier transition
pub fn record_fallback(to: FeedTier) {
    counter!("cryptofeed_tier_fallbacks_total", "to" => to.as_str()).increment(1);
}

/// Publish current tier and connectivity
pub fn set_feed_status(tier: FeedTier, connected: bool) {
    for t in [FeedTier::Streaming, FeedTier::Polling, FeedTier::Simulating] {
        let active = if t == tier { 1.0 } else { 0.0 };
        gauge!("cryptofeed_tier", "tier" => t.as_str()).set(active);
    }
    gauge!("cryptofeed_connected").set(if connected { 1.0 } else { 0.0 });
}
