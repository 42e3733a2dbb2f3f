//! Tier state machine
//!
//! One worker task per subscription. All acquisition work (stream frames,
//! poll responses, simulation ticks, reconnect timers, watchlist changes) is
//! handled by a single `select!` loop, so it never runs concurrently with
//! itself and only one tier owns resources at a time.

use super::state::SharedFeed;
use super::throttle::UpdateThrottle;
use crate::config::FeedConfig;
use crate::feed::{
    ExchangeTicker, FeedTier, Instrument, InstrumentRegistry, PriceUpdate, StreamConnector,
    TickerSource,
};
use crate::simulation::PriceSimulator;
use crate::telemetry::{self, DiscardReason};
use crate::ws::{WsConnection, WsMessage};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{interval, interval_at, sleep_until, Instant, Interval, MissedTickBehavior};

/// Requests from the handle
#[derive(Debug)]
pub(crate) enum Command {
    SetWatchlist(Vec<Instrument>),
}

pub(crate) struct FeedWorker {
    config: FeedConfig,
    registry: Arc<InstrumentRegistry>,
    connector: Arc<dyn StreamConnector>,
    source: Arc<dyn TickerSource>,
    simulator: PriceSimulator,
    shared: Arc<SharedFeed>,
    commands: mpsc::UnboundedReceiver<Command>,
    throttle: UpdateThrottle,

    instruments: HashMap<String, Instrument>,
    order: Vec<String>,
    symbols: Vec<String>,

    stream: Option<WsConnection>,
    /// A valid ticker arrived on the current stream session
    stream_live: bool,
    poll_timer: Option<Interval>,
    sim_timer: Option<Interval>,
    /// Pending stream retry
    retry_at: Option<Instant>,
}

impl FeedWorker {
    pub fn new(
        config: FeedConfig,
        registry: Arc<InstrumentRegistry>,
        connector: Arc<dyn StreamConnector>,
        source: Arc<dyn TickerSource>,
        simulator: PriceSimulator,
        shared: Arc<SharedFeed>,
        commands: mpsc::UnboundedReceiver<Command>,
    ) -> Self {
        let throttle = UpdateThrottle::new(config.throttle_interval());
        Self {
            config,
            registry,
            connector,
            source,
            simulator,
            shared,
            commands,
            throttle,
            instruments: HashMap::new(),
            order: Vec::new(),
            symbols: Vec::new(),
            stream: None,
            stream_live: false,
            poll_timer: None,
            sim_timer: None,
            retry_at: None,
        }
    }

    /// Run until the handle goes away
    pub async fn run(mut self, watchlist: Vec<Instrument>) {
        self.replace_watchlist(watchlist).await;

        loop {
            tokio::select! {
                biased;

                cmd = self.commands.recv() => match cmd {
                    Some(Command::SetWatchlist(list)) => self.replace_watchlist(list).await,
                    None => break,
                },

                _ = sleep_until_opt(self.retry_at) => {
                    self.retry_at = None;
                    tracing::info!("Retrying stream connection");
                    self.start_streaming().await;
                }

                event = next_stream_event(&mut self.stream) => self.on_stream_event(event).await,

                _ = tick_opt(&mut self.poll_timer) => self.poll_once().await,

                _ = tick_opt(&mut self.sim_timer) => self.simulate_tick(),
            }
        }

        self.stop_acquisition();
        tracing::debug!("Feed worker stopped");
    }

    /// Tear down, reset Feed State and restart from the top
    async fn replace_watchlist(&mut self, watchlist: Vec<Instrument>) {
        self.stop_acquisition();

        let mut instruments = HashMap::new();
        let mut order = Vec::new();
        for instrument in watchlist {
            if !(instrument.reference_price.is_finite() && instrument.reference_price > 0.0) {
                tracing::warn!(
                    id = %instrument.id,
                    reference_price = instrument.reference_price,
                    "Skipping instrument with non-positive reference price"
                );
                continue;
            }
            if instruments.contains_key(&instrument.id) {
                tracing::warn!(id = %instrument.id, "Duplicate instrument id in watchlist");
                continue;
            }
            order.push(instrument.id.clone());
            instruments.insert(instrument.id.clone(), instrument);
        }

        self.throttle.retain(|id| instruments.contains_key(id));
        let now = Utc::now();
        let updated = self.shared.update(|state| {
            state.store.retain(|id| instruments.contains_key(id));
            for id in &order {
                if !state.store.contains(id) {
                    state.store.seed(instruments[id].seed_update(now));
                }
            }
            state.reset_status();
        });
        if updated.is_none() {
            return;
        }

        self.symbols = self.registry.resolve(order.iter().map(String::as_str));
        self.instruments = instruments;
        self.order = order;

        tracing::info!(
            instruments = self.order.len(),
            symbols = self.symbols.len(),
            "Watchlist updated"
        );

        if self.order.is_empty() {
            tracing::info!("Watchlist empty, feed idle");
            return;
        }

        self.start_streaming().await;
    }

    /// Drop every tier's resources
    fn stop_acquisition(&mut self) {
        self.stream = None;
        self.stream_live = false;
        self.poll_timer = None;
        self.sim_timer = None;
        self.retry_at = None;
    }

    async fn start_streaming(&mut self) {
        self.stop_acquisition();

        if self.symbols.is_empty() {
            tracing::info!("No streamable symbols, skipping to polling");
            self.start_polling().await;
            return;
        }

        match self.connector.connect(&self.symbols).await {
            Ok(conn) => {
                tracing::info!(symbols = self.symbols.len(), "Stream session opened");
                self.stream = Some(conn);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Stream connection failed");
                self.on_stream_failure().await;
            }
        }
    }

    async fn on_stream_event(&mut self, event: Option<WsMessage>) {
        match event {
            Some(WsMessage::Text(text)) => self.on_stream_text(&text),
            Some(WsMessage::Binary(_)) => {}
            Some(WsMessage::Closed { code, reason }) => {
                tracing::warn!(?code, %reason, "Stream closed by remote");
                self.on_stream_failure().await;
            }
            Some(WsMessage::Error(e)) => {
                tracing::warn!(error = %e, "Stream error");
                self.on_stream_failure().await;
            }
            None => {
                tracing::warn!("Stream session ended");
                self.on_stream_failure().await;
            }
        }
    }

    fn on_stream_text(&mut self, text: &str) {
        let ticker = match self.connector.parse_message(text) {
            Ok(ticker) => ticker,
            Err(e) => {
                tracing::debug!(error = %e, "Discarding malformed stream message");
                telemetry::record_discarded(DiscardReason::Malformed);
                return;
            }
        };

        let Some(update) = self.resolve_ticker(ticker) else {
            return;
        };

        if !self.stream_live {
            self.stream_live = true;
            tracing::info!("Stream live");
            self.shared.update(|state| state.reconnect_attempts = 0);
        }

        self.publish(vec![update], FeedTier::Streaming);
    }

    /// Abnormal closure or error of the current session
    async fn on_stream_failure(&mut self) {
        self.stream = None;
        self.stream_live = false;

        let attempts = self
            .shared
            .update(|state| {
                state.is_connected = false;
                state.reconnect_attempts
            })
            .unwrap_or(0);
        telemetry::set_feed_status(FeedTier::Streaming, false);

        if attempts < self.config.max_reconnect_attempts {
            let delay = self.config.reconnect_delay(attempts);
            self.shared
                .update(|state| state.reconnect_attempts = attempts + 1);
            self.retry_at = Some(Instant::now() + delay);
            telemetry::record_reconnect();
            tracing::info!(
                attempt = attempts + 1,
                delay_ms = delay.as_millis() as u64,
                "Scheduling stream reconnect"
            );
        } else {
            tracing::warn!(attempts, "Stream reconnects exhausted, falling back to polling");
            telemetry::record_fallback(FeedTier::Polling);
            self.start_polling().await;
        }
    }

    async fn start_polling(&mut self) {
        self.stop_acquisition();

        if self.symbols.is_empty() {
            tracing::info!("No pollable symbols, falling back to simulation");
            telemetry::record_fallback(FeedTier::Simulating);
            self.start_simulation();
            return;
        }

        let period = self.config.poll_interval();
        let mut timer = interval_at(Instant::now() + period, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.poll_timer = Some(timer);

        self.poll_once().await;
    }

    async fn poll_once(&mut self) {
        match self.source.fetch(&self.symbols).await {
            Ok(tickers) => {
                let updates: Vec<PriceUpdate> = tickers
                    .into_iter()
                    .filter_map(|t| self.resolve_ticker(t))
                    .collect();
                tracing::debug!(updates = updates.len(), "Poll succeeded");
                self.publish(updates, FeedTier::Polling);
            }
            Err(e) => {
                let tier = self.shared.read(|state| state.tier);
                if tier == FeedTier::Polling {
                    let delay = self.config.poll_retry_delay();
                    tracing::warn!(
                        error = %e,
                        retry_ms = delay.as_millis() as u64,
                        "Poll failed, retrying stream"
                    );
                    self.shared.update(|state| state.is_connected = false);
                    telemetry::set_feed_status(FeedTier::Polling, false);
                    self.poll_timer = None;
                    self.retry_at = Some(Instant::now() + delay);
                } else {
                    tracing::warn!(error = %e, "Initial poll failed, falling back to simulation");
                    telemetry::record_fallback(FeedTier::Simulating);
                    self.start_simulation();
                }
            }
        }
    }

    fn start_simulation(&mut self) {
        self.stop_acquisition();

        let mut timer = interval(self.config.simulation_tick());
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.sim_timer = Some(timer);

        self.shared.update(|state| {
            state.tier = FeedTier::Simulating;
            state.is_connected = true;
        });
        telemetry::set_feed_status(FeedTier::Simulating, true);
        tracing::info!(instruments = self.order.len(), "Simulation started");
    }

    fn simulate_tick(&mut self) {
        let now = Utc::now();
        let current: Vec<PriceUpdate> = self.shared.read(|state| {
            self.order
                .iter()
                .filter_map(|id| state.store.get(id).cloned())
                .collect()
        });

        let updates: Vec<PriceUpdate> = current
            .iter()
            .filter_map(|cur| {
                let instrument = self.instruments.get(&cur.id)?;
                Some(self.simulator.step(instrument, cur, now))
            })
            .collect();

        self.publish(updates, FeedTier::Simulating);
    }

    /// Map an exchange quote to a watchlist instrument
    fn resolve_ticker(&self, ticker: ExchangeTicker) -> Option<PriceUpdate> {
        let id = match self.registry.id_for_symbol(&ticker.symbol) {
            Some(id) if self.instruments.contains_key(id) => id.to_string(),
            _ => {
                tracing::trace!(symbol = %ticker.symbol, "Discarding unmapped symbol");
                telemetry::record_discarded(DiscardReason::UnknownSymbol);
                return None;
            }
        };

        Some(PriceUpdate {
            id,
            price: ticker.price,
            change_24h: ticker.change_24h,
            volume_24h: ticker.volume_24h,
            timestamp: Utc::now(),
        })
    }

    /// Throttle, write and mark the tier connected
    fn publish(&mut self, updates: Vec<PriceUpdate>, tier: FeedTier) {
        let now = Instant::now();
        let mut admitted = Vec::with_capacity(updates.len());
        for update in updates {
            if !update.is_publishable() {
                telemetry::record_discarded(DiscardReason::Unpublishable);
                continue;
            }
            if !self.throttle.admit(&update.id, now) {
                telemetry::record_discarded(DiscardReason::Throttled);
                continue;
            }
            admitted.push(update);
        }

        let written = self.shared.update(|state| {
            let mut written = 0;
            for update in admitted {
                if state.store.apply(update) {
                    written += 1;
                }
            }
            state.tier = tier;
            state.is_connected = true;
            written
        });

        if let Some(written) = written {
            telemetry::record_accepted(tier, written);
            telemetry::set_feed_status(tier, true);
        }
    }
}

async fn next_stream_event(stream: &mut Option<WsConnection>) -> Option<WsMessage> {
    match stream {
        Some(conn) => conn.recv().await,
        None => std::future::pending().await,
    }
}

async fn tick_opt(timer: &mut Option<Interval>) {
    match timer {
        Some(t) => {
            t.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(d) => sleep_until(d).await,
        None => std::future::pending().await,
    }
}
