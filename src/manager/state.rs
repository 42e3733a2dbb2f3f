//! Feed state shared between the worker task and its handle

use super::store::PriceStore;
use crate::feed::{FeedSnapshot, FeedTier};
use parking_lot::RwLock;
use tokio::sync::watch;

/// Connectivity metadata plus the price store
#[derive(Debug)]
pub(crate) struct FeedState {
    pub store: PriceStore,
    pub tier: FeedTier,
    pub is_connected: bool,
    pub reconnect_attempts: u32,
    closed: bool,
}

impl FeedState {
    fn new() -> Self {
        Self {
            store: PriceStore::new(),
            tier: FeedTier::Streaming,
            is_connected: false,
            reconnect_attempts: 0,
            closed: false,
        }
    }

    /// Back to the initial tier, keeping stored prices
    pub fn reset_status(&mut self) {
        self.tier = FeedTier::Streaming;
        self.is_connected = false;
        self.reconnect_attempts = 0;
        self.store.reset_last_update();
    }

    fn snapshot(&self) -> FeedSnapshot {
        FeedSnapshot {
            prices: self.store.to_map(),
            is_connected: self.is_connected,
            last_update: self.store.last_update(),
            tier: self.tier,
            reconnect_attempts: self.reconnect_attempts,
        }
    }
}

/// Lock-guarded state with a change counter for waiters
///
/// Every mutation goes through [`SharedFeed::update`], which refuses to run
/// once the feed is closed. Closing happens under the same lock, so no write
/// can land after [`SharedFeed::close`] returns.
pub(crate) struct SharedFeed {
    state: RwLock<FeedState>,
    version: watch::Sender<u64>,
}

impl SharedFeed {
    pub fn new() -> (Self, watch::Receiver<u64>) {
        let (version, rx) = watch::channel(0);
        let shared = Self {
            state: RwLock::new(FeedState::new()),
            version,
        };
        (shared, rx)
    }

    /// Mutate the state unless closed, then wake waiters
    pub fn update<R>(&self, f: impl FnOnce(&mut FeedState) -> R) -> Option<R> {
        let result = {
            let mut state = self.state.write();
            if state.closed {
                return None;
            }
            f(&mut state)
        };
        self.version.send_modify(|v| *v = v.wrapping_add(1));
        Some(result)
    }

    /// Read the state
    pub fn read<R>(&self, f: impl FnOnce(&FeedState) -> R) -> R {
        f(&self.state.read())
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        self.state.read().snapshot()
    }

    /// Mark closed; returns false if it already was
    pub fn close(&self) -> bool {
        {
            let mut state = self.state.write();
            if state.closed {
                return false;
            }
            state.closed = true;
            state.is_connected = false;
        }
        self.version.send_modify(|v| *v = v.wrapping_add(1));
        true
    }

    pub fn is_closed(&self) -> bool {
        self.state.read().closed
    }
}
