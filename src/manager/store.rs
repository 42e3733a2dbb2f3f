//! In-memory price store

use crate::feed::PriceUpdate;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Latest update per instrument id
#[derive(Debug, Clone, Default)]
pub struct PriceStore {
    prices: HashMap<String, PriceUpdate>,
    last_update: Option<DateTime<Utc>>,
}

impl PriceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a reference-value entry without touching `last_update`
    pub fn seed(&mut self, update: PriceUpdate) -> bool {
        if !update.is_publishable() {
            return false;
        }
        self.prices.insert(update.id.clone(), update);
        true
    }

    /// Replace the entry for the update's id and refresh `last_update`
    ///
    /// Unpublishable updates (non-positive or non-finite values) are rejected.
    pub fn apply(&mut self, update: PriceUpdate) -> bool {
        if !update.is_publishable() {
            return false;
        }
        self.last_update = Some(update.timestamp);
        self.prices.insert(update.id.clone(), update);
        true
    }

    pub fn get(&self, id: &str) -> Option<&PriceUpdate> {
        self.prices.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.prices.contains_key(id)
    }

    /// Drop entries whose id fails the predicate
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.prices.retain(|id, _| keep(id));
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }

    pub fn reset_last_update(&mut self) {
        self.last_update = None;
    }

    /// Owned copy of all entries
    pub fn to_map(&self) -> HashMap<String, PriceUpdate> {
        self.prices.clone()
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}
