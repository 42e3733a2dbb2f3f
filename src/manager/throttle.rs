//! Per-instrument update throttle

use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Drops updates that arrive too soon after the last accepted one for the
/// same instrument. Nothing is queued.
#[derive(Debug)]
pub struct UpdateThrottle {
    min_interval: Duration,
    last_accepted: HashMap<String, Instant>,
}

impl UpdateThrottle {
    /// Create a throttle with the given minimum inter-update interval
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_accepted: HashMap::new(),
        }
    }

    /// Record and accept the update if the interval has elapsed
    pub fn admit(&mut self, id: &str, now: Instant) -> bool {
        match self.last_accepted.get_mut(id) {
            Some(last) if now.saturating_duration_since(*last) < self.min_interval => false,
            Some(last) => {
                *last = now;
                true
            }
            None => {
                self.last_accepted.insert(id.to_string(), now);
                true
            }
        }
    }

    /// Keep history only for ids matching the predicate
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.last_accepted.retain(|id, _| keep(id));
    }

    pub fn clear(&mut self) {
        self.last_accepted.clear();
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}
