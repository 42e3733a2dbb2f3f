//! Watch command implementation

use crate::config::Config;
use crate::feed::{FeedSnapshot, InstrumentRegistry};
use crate::manager::FeedManager;
use clap::Args;
use std::time::Duration;

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Stop after this many seconds (runs until Ctrl-C when absent)
    #[arg(long)]
    pub duration_secs: Option<u64>,

    /// Interval between snapshot reports in ms
    #[arg(long, default_value = "1000")]
    pub report_interval_ms: u64,

    /// Skip the network tiers and simulate every instrument
    #[arg(long)]
    pub offline: bool,
}

impl WatchArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        if config.watchlist.is_empty() {
            anyhow::bail!("Watchlist is empty; add [[watchlist]] entries to the config");
        }

        let registry = if self.offline {
            InstrumentRegistry::new()
        } else {
            config.instrument_registry()
        };
        let manager = FeedManager::binance(config.feed.clone(), registry)?;
        let handle = manager.subscribe(config.watchlist.clone());

        tracing::info!(
            subscription = %handle.id(),
            instruments = config.watchlist.len(),
            offline = self.offline,
            "Watching prices"
        );

        let period = Duration::from_millis(self.report_interval_ms.max(1));
        let mut report = tokio::time::interval(period);
        let deadline = self.duration_secs.map(Duration::from_secs);
        let stop = async {
            match deadline {
                Some(d) => tokio::time::sleep(d).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(stop);

        loop {
            tokio::select! {
                _ = report.tick() => report_snapshot(&handle.snapshot()),
                _ = &mut stop => {
                    tracing::info!("Watch duration elapsed");
                    break;
                }
                result = tokio::signal::ctrl_c() => {
                    result?;
                    tracing::info!("Interrupted");
                    break;
                }
            }
        }

        handle.unsubscribe();
        report_snapshot(&handle.snapshot());
        Ok(())
    }
}

fn report_snapshot(snapshot: &FeedSnapshot) {
    tracing::info!(
        tier = %snapshot.tier,
        connected = snapshot.is_connected,
        reconnect_attempts = snapshot.reconnect_attempts,
        last_update = ?snapshot.last_update,
        "Feed status"
    );

    let mut prices: Vec<_> = snapshot.prices.values().collect();
    prices.sort_by(|a, b| a.id.cmp(&b.id));
    for p in prices {
        tracing::info!(
            id = %p.id,
            price = p.price,
            change_24h = %format!("{:+.2}%", p.change_24h),
            volume_24h = p.volume_24h,
            "Price"
        );
    }
}
