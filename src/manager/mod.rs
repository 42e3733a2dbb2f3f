//! Feed manager
//!
//! Keeps the latest price for every instrument of a watchlist, acquiring
//! data from the best available tier:
//!
//! 1. streaming: push stream, reconnecting with exponential backoff
//! 2. polling: batch fetch on a fixed interval
//! 3. simulating: local random walk, never fails
//!
//! Transport failures never reach the caller. They show up as
//! `is_connected = false`, a growing `reconnect_attempts` and a stale
//! `last_update` in the [`FeedSnapshot`].

mod state;
mod store;
mod throttle;
mod worker;

pub use store::PriceStore;
pub use throttle::UpdateThrottle;

use crate::config::FeedConfig;
use crate::feed::{
    BinanceRest, BinanceStream, FeedError, FeedSnapshot, Instrument, InstrumentRegistry,
    StreamConnector, TickerSource,
};
use crate::simulation::PriceSimulator;
use state::SharedFeed;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::Instrument as _;
use uuid::Uuid;
use worker::{Command, FeedWorker};

/// Returned when talking to a handle that was unsubscribed
#[derive(Debug, Error, PartialEq, Eq)]
#[error("subscription is closed")]
pub struct SubscriptionClosed;

/// Factory for per-watchlist price subscriptions
pub struct FeedManager {
    config: FeedConfig,
    registry: Arc<InstrumentRegistry>,
    connector: Arc<dyn StreamConnector>,
    source: Arc<dyn TickerSource>,
}

impl FeedManager {
    /// Create a manager over the given transports
    pub fn new(
        config: FeedConfig,
        registry: InstrumentRegistry,
        connector: Arc<dyn StreamConnector>,
        source: Arc<dyn TickerSource>,
    ) -> Self {
        Self {
            config,
            registry: Arc::new(registry),
            connector,
            source,
        }
    }

    /// Create a manager backed by the Binance endpoints in `config`
    pub fn binance(config: FeedConfig, registry: InstrumentRegistry) -> Result<Self, FeedError> {
        let timeout = config.request_timeout();
        let connector = BinanceStream::with_url(&config.stream_url).connect_timeout(timeout);
        let source = BinanceRest::with_url(&config.ticker_url, timeout)?;
        Ok(Self::new(
            config,
            registry,
            Arc::new(connector),
            Arc::new(source),
        ))
    }

    pub fn registry(&self) -> &InstrumentRegistry {
        &self.registry
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    /// Start acquiring prices for `watchlist`
    ///
    /// Must be called from within a tokio runtime.
    pub fn subscribe(&self, watchlist: Vec<Instrument>) -> FeedHandle {
        self.subscribe_with_simulator(watchlist, PriceSimulator::new())
    }

    /// Like [`FeedManager::subscribe`] with a caller-supplied simulator
    pub fn subscribe_with_simulator(
        &self,
        watchlist: Vec<Instrument>,
        simulator: PriceSimulator,
    ) -> FeedHandle {
        let id = Uuid::new_v4();
        let (shared, version) = SharedFeed::new();
        let shared = Arc::new(shared);
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();

        let worker = FeedWorker::new(
            self.config.clone(),
            Arc::clone(&self.registry),
            Arc::clone(&self.connector),
            Arc::clone(&self.source),
            simulator,
            Arc::clone(&shared),
            commands_rx,
        );

        tracing::info!(subscription = %id, instruments = watchlist.len(), "Subscribing");
        let span = tracing::info_span!("feed", subscription = %id);
        let task = tokio::spawn(worker.run(watchlist).instrument(span));

        FeedHandle {
            id,
            shared,
            commands: commands_tx,
            version,
            task,
        }
    }
}

/// Live view of one subscription
///
/// Dropping the handle unsubscribes.
pub struct FeedHandle {
    id: Uuid,
    shared: Arc<SharedFeed>,
    commands: mpsc::UnboundedSender<Command>,
    version: watch::Receiver<u64>,
    task: JoinHandle<()>,
}

impl FeedHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Owned copy of the current prices and connectivity
    pub fn snapshot(&self) -> FeedSnapshot {
        self.shared.snapshot()
    }

    /// Wait for the next change; returns false once unsubscribed
    pub async fn changed(&mut self) -> bool {
        if self.shared.is_closed() {
            return false;
        }
        self.version.changed().await.is_ok() && !self.shared.is_closed()
    }

    /// Replace the watchlist; the active tier is torn down and restarted
    pub fn set_watchlist(&self, watchlist: Vec<Instrument>) -> Result<(), SubscriptionClosed> {
        if self.shared.is_closed() {
            return Err(SubscriptionClosed);
        }
        self.commands
            .send(Command::SetWatchlist(watchlist))
            .map_err(|_| SubscriptionClosed)
    }

    /// Stop acquisition and release the connection and timers
    ///
    /// No store write happens after this returns. Safe to call repeatedly.
    pub fn unsubscribe(&self) {
        if self.shared.close() {
            self.task.abort();
            tracing::info!(subscription = %self.id, "Unsubscribed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
