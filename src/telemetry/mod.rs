//! Telemetry module
//!
//! Structured logging and Prometheus metrics

mod logging;
mod metrics;

pub use self::logging::{init_logging, LogFormat};
pub use self::metrics::{
    install_prometheus, record_accepted, record_discarded, record_fallback, record_reconnect,
    set_feed_status, DiscardReason,
};

use crate::config::TelemetryConfig;

/// Initialize all telemetry subsystems
///
/// Must run inside a tokio runtime when a metrics port is configured.
pub fn init_telemetry(config: &TelemetryConfig) -> anyhow::Result<()> {
    init_logging(&config.log_level, config.log_format)?;

    if let Some(port) = config.metrics_port {
        install_prometheus(port)?;
    }

    Ok(())
}
