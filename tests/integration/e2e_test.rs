//! End-to-end: configuration through to a running subscription

use crypto_feed::config::Config;
use crypto_feed::simulation::PriceSimulator;
use crypto_feed::{FeedManager, FeedTier, InstrumentRegistry};
use std::time::Duration;

const EXAMPLE_CONFIG: &str = include_str!("../../config.toml.example");

#[test]
fn test_example_config_parses() {
    let config: Config = toml::from_str(EXAMPLE_CONFIG).unwrap();
    assert_eq!(config.feed.max_reconnect_attempts, 5);
    assert_eq!(config.watchlist.len(), 5);

    let registry = config.instrument_registry();
    let symbols = registry.resolve(config.watchlist.iter().map(|i| i.id.as_str()));
    assert_eq!(symbols, vec!["BTCUSDT", "ETHUSDT", "SOLUSDT", "DOGEUSDT"]);
}

#[tokio::test(start_paused = true)]
async fn test_offline_watchlist_simulates() {
    let config: Config = toml::from_str(EXAMPLE_CONFIG).unwrap();
    let manager = FeedManager::binance(config.feed.clone(), InstrumentRegistry::new()).unwrap();

    let mut handle =
        manager.subscribe_with_simulator(config.watchlist.clone(), PriceSimulator::seeded(11));
    assert!(handle.changed().await);

    tokio::time::sleep(Duration::from_secs(5)).await;
    let snap = handle.snapshot();
    assert_eq!(snap.tier, FeedTier::Simulating);
    assert!(snap.is_connected);
    assert_eq!(snap.prices.len(), 5);
    assert!(snap.last_update.is_some());

    for instrument in &config.watchlist {
        let update = snap.price(&instrument.id).unwrap();
        assert!(update.price >= instrument.reference_price * 0.1);
        assert!(update.volume_24h > 0.0);
    }

    handle.unsubscribe();
    assert!(!handle.snapshot().is_connected);
}
