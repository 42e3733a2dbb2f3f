//! Streaming tier behaviour

use crate::common::*;
use crypto_feed::config::FeedConfig;
use crypto_feed::ws::{WsError, WsMessage};
use crypto_feed::FeedTier;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn test_stream_message_updates_store() {
    let stream = Arc::new(ScriptedStream::default());
    let source = Arc::new(ScriptedSource::failing());
    let tx = stream.open_session();
    let manager = manager(FeedConfig::default(), &stream, &source);

    let handle = manager.subscribe(vec![btc()]);
    tx.send(stream_frame("BTCUSDT", "43500.12", "5.1", "28000000000"))
        .await
        .unwrap();

    let snap = wait_for(&handle, Duration::from_secs(1), |s| {
        s.price("1").map(|p| p.price) == Some(43500.12)
    })
    .await;

    let update = snap.price("1").unwrap();
    assert_eq!(update.change_24h, 5.1);
    assert_eq!(update.volume_24h, 28_000_000_000.0);
    assert!(snap.is_connected);
    assert_eq!(snap.tier, FeedTier::Streaming);
    assert_eq!(snap.reconnect_attempts, 0);
    assert!(snap.last_update.is_some());
    assert_eq!(stream.connect_count(), 1);
    assert_eq!(source.fetch_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_store_seeded_before_first_message() {
    let stream = Arc::new(ScriptedStream::default());
    let source = Arc::new(ScriptedSource::failing());
    let _tx = stream.open_session();
    let manager = manager(FeedConfig::default(), &stream, &source);

    let handle = manager.subscribe(vec![btc(), eth()]);
    let snap = wait_for(&handle, Duration::from_secs(1), |s| s.prices.len() == 2).await;

    assert_eq!(snap.price("1").unwrap().price, 43000.0);
    assert_eq!(snap.price("2").unwrap().price, 2300.0);
    assert!(!snap.is_connected);
    assert!(snap.last_update.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_throttle_drops_rapid_updates() {
    let stream = Arc::new(ScriptedStream::default());
    let source = Arc::new(ScriptedSource::failing());
    let tx = stream.open_session();
    let manager = manager(FeedConfig::default(), &stream, &source);
    let handle = manager.subscribe(vec![btc(), eth()]);

    tx.send(stream_frame("BTCUSDT", "43001", "1", "1")).await.unwrap();
    tx.send(stream_frame("BTCUSDT", "43002", "1", "1")).await.unwrap();
    // Other instruments are throttled independently
    tx.send(stream_frame("ETHUSDT", "2301", "1", "1")).await.unwrap();

    let snap = wait_for(&handle, Duration::from_secs(1), |s| {
        s.price("2").map(|p| p.price) == Some(2301.0)
    })
    .await;
    assert_eq!(snap.price("1").unwrap().price, 43001.0);

    tokio::time::sleep(Duration::from_millis(150)).await;
    tx.send(stream_frame("BTCUSDT", "43003", "1", "1")).await.unwrap();

    wait_for(&handle, Duration::from_secs(1), |s| {
        s.price("1").map(|p| p.price) == Some(43003.0)
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn test_malformed_and_unknown_messages_discarded() {
    let stream = Arc::new(ScriptedStream::default());
    let source = Arc::new(ScriptedSource::failing());
    let tx = stream.open_session();
    let manager = manager(FeedConfig::default(), &stream, &source);
    let handle = manager.subscribe(vec![btc(), eth()]);

    tx.send(stream_frame("BTCUSDT", "43100", "1", "1")).await.unwrap();
    tx.send(WsMessage::Text("{not json".into())).await.unwrap();
    tx.send(stream_frame("ETHUSDT", "-5", "1", "1")).await.unwrap();
    // Mapped in the registry but not in this watchlist
    tx.send(stream_frame("SOLUSDT", "98", "1", "1")).await.unwrap();
    tx.send(stream_frame("ZZZUSDT", "1", "1", "1")).await.unwrap();
    tx.send(stream_frame("ETHUSDT", "2310", "1", "1")).await.unwrap();

    let snap = wait_for(&handle, Duration::from_secs(1), |s| {
        s.price("2").map(|p| p.price) == Some(2310.0)
    })
    .await;

    assert_eq!(snap.prices.len(), 2);
    assert!(snap.price("5").is_none());
    assert!(snap.is_connected);
    assert_eq!(snap.tier, FeedTier::Streaming);
    assert_eq!(snap.reconnect_attempts, 0);
    assert_eq!(stream.connect_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_abnormal_close_reconnects_with_backoff() {
    let stream = Arc::new(ScriptedStream::default());
    let source = Arc::new(ScriptedSource::failing());
    let first = stream.open_session();
    let second = stream.open_session();
    let manager = manager(FeedConfig::default(), &stream, &source);
    let handle = manager.subscribe(vec![btc()]);

    first.send(stream_frame("BTCUSDT", "43100", "1", "1")).await.unwrap();
    wait_for(&handle, Duration::from_secs(1), |s| s.is_connected).await;

    first
        .send(WsMessage::Closed {
            code: Some(1006),
            reason: String::new(),
        })
        .await
        .unwrap();

    let snap = wait_for(&handle, Duration::from_secs(1), |s| !s.is_connected).await;
    assert_eq!(snap.reconnect_attempts, 1);
    assert_eq!(snap.tier, FeedTier::Streaming);

    second.send(stream_frame("BTCUSDT", "43200", "1", "1")).await.unwrap();
    let snap = wait_for(&handle, Duration::from_secs(10), |s| {
        s.price("1").map(|p| p.price) == Some(43200.0)
    })
    .await;

    assert!(snap.is_connected);
    assert_eq!(snap.reconnect_attempts, 0);

    let times = stream.connect_times();
    assert_eq!(times.len(), 2);
    let gap = times[1] - times[0];
    assert!(gap >= Duration::from_secs(3) && gap < Duration::from_millis(3100));
}

#[tokio::test(start_paused = true)]
async fn test_error_then_end_counts_once() {
    let stream = Arc::new(ScriptedStream::default());
    let source = Arc::new(ScriptedSource::failing());
    let tx = stream.open_session();
    let manager = manager(FeedConfig::default(), &stream, &source);
    let handle = manager.subscribe(vec![btc()]);

    tx.send(WsMessage::Error(WsError::ConnectionFailed("reset".into())))
        .await
        .unwrap();
    drop(tx);

    let snap = wait_for(&handle, Duration::from_secs(1), |s| s.reconnect_attempts > 0).await;
    assert_eq!(snap.reconnect_attempts, 1);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(handle.snapshot().reconnect_attempts, 1);
    assert_eq!(stream.connect_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unsubscribe_closes_stream() {
    let stream = Arc::new(ScriptedStream::default());
    let source = Arc::new(ScriptedSource::failing());
    let tx = stream.open_session();
    let manager = manager(FeedConfig::default(), &stream, &source);
    let handle = manager.subscribe(vec![btc()]);

    tx.send(stream_frame("BTCUSDT", "43100", "1", "1")).await.unwrap();
    wait_for(&handle, Duration::from_secs(1), |s| s.is_connected).await;

    handle.unsubscribe();
    handle.unsubscribe();
    let frozen = handle.snapshot();
    assert!(!frozen.is_connected);

    tokio::time::timeout(Duration::from_secs(1), tx.closed())
        .await
        .expect("stream receiver should be released");

    assert!(tx.send(stream_frame("BTCUSDT", "1", "1", "1")).await.is_err());
    assert_eq!(handle.snapshot().prices, frozen.prices);
}
