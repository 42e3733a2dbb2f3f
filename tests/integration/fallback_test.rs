//! Tier fallback and retry behaviour

use crate::common::*;
use crypto_feed::config::FeedConfig;
use crypto_feed::simulation::PriceSimulator;
use crypto_feed::{FeedTier, Instrument};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn test_stream_exhaustion_falls_back_to_polling() {
    let stream = Arc::new(ScriptedStream::default());
    let source = Arc::new(ScriptedSource::healthy(vec![
        ticker("BTCUSDT", 44000.0),
        ticker("ETHUSDT", 2400.0),
    ]));
    let manager = manager(FeedConfig::default(), &stream, &source);
    let handle = manager.subscribe(vec![btc(), eth()]);

    let snap = wait_for(&handle, Duration::from_secs(200), |s| {
        s.tier == FeedTier::Polling
    })
    .await;

    assert!(snap.is_connected);
    assert_eq!(snap.reconnect_attempts, 5);
    assert_eq!(snap.price("1").unwrap().price, 44000.0);
    assert_eq!(snap.price("2").unwrap().price, 2400.0);

    // Initial attempt plus five reconnects
    let times = stream.connect_times();
    assert_eq!(times.len(), 6);
    let gaps: Vec<u64> = times
        .windows(2)
        .map(|w| (w[1] - w[0]).as_secs())
        .collect();
    assert_eq!(gaps, vec![3, 6, 12, 24, 48]);
    assert_eq!(source.fetch_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_polling_repeats_on_interval() {
    let stream = Arc::new(ScriptedStream::default());
    let source = Arc::new(ScriptedSource::healthy(vec![ticker("BTCUSDT", 44000.0)]));
    let config = FeedConfig {
        max_reconnect_attempts: 0,
        ..FeedConfig::default()
    };
    let manager = manager(config, &stream, &source);
    let handle = manager.subscribe(vec![btc()]);

    wait_for(&handle, Duration::from_secs(1), |s| s.tier == FeedTier::Polling).await;
    assert_eq!(source.fetch_count(), 1);

    tokio::time::sleep(Duration::from_millis(10_500)).await;
    assert_eq!(source.fetch_count(), 2);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(source.fetch_count(), 3);
    assert_eq!(stream.connect_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_poll_failure_retries_stream() {
    let stream = Arc::new(ScriptedStream::default());
    let source = Arc::new(ScriptedSource::healthy(vec![ticker("BTCUSDT", 44000.0)]));
    source.push(Some(vec![ticker("BTCUSDT", 44100.0)]));
    source.push(None);
    let config = FeedConfig {
        max_reconnect_attempts: 0,
        ..FeedConfig::default()
    };
    let manager = manager(config, &stream, &source);
    let handle = manager.subscribe(vec![btc()]);

    let snap = wait_for(&handle, Duration::from_secs(1), |s| {
        s.tier == FeedTier::Polling && s.is_connected
    })
    .await;
    assert_eq!(snap.price("1").unwrap().price, 44100.0);

    // Second poll at +10s fails
    let snap = wait_for(&handle, Duration::from_secs(11), |s| !s.is_connected).await;
    assert_eq!(snap.tier, FeedTier::Polling);
    assert_eq!(stream.connect_count(), 1);

    // Stream retried 5s later, refused, polling resumes
    let snap = wait_for(&handle, Duration::from_secs(6), |s| s.is_connected).await;
    assert_eq!(snap.tier, FeedTier::Polling);
    assert_eq!(snap.price("1").unwrap().price, 44000.0);

    let times = stream.connect_times();
    assert_eq!(times.len(), 2);
    assert_eq!((times[1] - times[0]).as_secs(), 15);
    assert_eq!(source.fetch_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_initial_poll_failure_falls_back_to_simulation() {
    let stream = Arc::new(ScriptedStream::default());
    let source = Arc::new(ScriptedSource::failing());
    let config = FeedConfig {
        max_reconnect_attempts: 0,
        ..FeedConfig::default()
    };
    let manager = manager(config, &stream, &source);
    let handle = manager.subscribe(vec![btc()]);

    let snap = wait_for(&handle, Duration::from_secs(1), |s| {
        s.tier == FeedTier::Simulating
    })
    .await;
    assert!(snap.is_connected);

    // Simulation never retries upward
    tokio::time::sleep(Duration::from_secs(120)).await;
    let snap = handle.snapshot();
    assert_eq!(snap.tier, FeedTier::Simulating);
    assert_eq!(stream.connect_count(), 1);
    assert_eq!(source.fetch_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unmapped_instrument_simulates_immediately() {
    let stream = Arc::new(ScriptedStream::default());
    let source = Arc::new(ScriptedSource::failing());
    let manager = manager(FeedConfig::default(), &stream, &source);

    let instrument = Instrument::new("unmapped", 100.0).market_cap(1e11);
    let handle =
        manager.subscribe_with_simulator(vec![instrument], PriceSimulator::seeded(2024));

    let snap = wait_for(&handle, Duration::from_millis(1), |s| {
        s.tier == FeedTier::Simulating
    })
    .await;
    assert!(snap.is_connected);
    assert_eq!(stream.connect_count(), 0);
    assert_eq!(source.fetch_count(), 0);

    // Sample halfway between ticks so each sample sees exactly one tick
    tokio::time::sleep(Duration::from_millis(100)).await;
    let mut previous = handle.snapshot().price("unmapped").unwrap().price;
    let mut moved = false;
    for _ in 0..300 {
        tokio::time::sleep(Duration::from_millis(200)).await;
        let price = handle.snapshot().price("unmapped").unwrap().price;
        assert!(price >= 10.0);
        assert!((price - previous).abs() / previous <= 0.005 + 1e-12);
        moved |= price != previous;
        previous = price;
    }
    assert!(moved);
}

#[tokio::test(start_paused = true)]
async fn test_simulated_prices_respect_floor() {
    let stream = Arc::new(ScriptedStream::default());
    let source = Arc::new(ScriptedSource::failing());
    let manager = manager(FeedConfig::default(), &stream, &source);

    // Tiny cap gives maximum volatility
    let instrument = Instrument::new("meme", 0.5).market_cap(1.0);
    let handle = manager.subscribe_with_simulator(vec![instrument], PriceSimulator::seeded(99));

    for _ in 0..500 {
        tokio::time::sleep(Duration::from_millis(200)).await;
        let snap = handle.snapshot();
        let update = snap.price("meme").unwrap();
        assert!(update.price >= 0.05);
        assert!(update.price > 0.0);
    }
}
