//! Instrument registry
//!
//! Maps internal instrument ids to exchange symbols. Instruments without an
//! entry can never be streamed or polled and are served by simulation only.

use std::collections::HashMap;

/// Built-in id → Binance symbol table
const DEFAULT_SYMBOLS: &[(&str, &str)] = &[
    ("1", "BTCUSDT"),
    ("2", "ETHUSDT"),
    ("4", "BNBUSDT"),
    ("5", "SOLUSDT"),
    ("6", "XRPUSDT"),
    ("8", "ADAUSDT"),
    ("9", "DOGEUSDT"),
    ("10", "AVAXUSDT"),
    ("11", "DOTUSDT"),
    ("12", "LINKUSDT"),
    ("13", "LTCUSDT"),
    ("14", "TRXUSDT"),
];

/// Bidirectional id ↔ symbol lookup
#[derive(Debug, Clone, Default)]
pub struct InstrumentRegistry {
    symbols: HashMap<String, String>,
    ids: HashMap<String, String>,
}

impl InstrumentRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in table
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for (id, symbol) in DEFAULT_SYMBOLS {
            registry.insert(*id, *symbol);
        }
        registry
    }

    /// Add or replace a mapping; symbols are stored upper-case
    pub fn insert(&mut self, id: impl Into<String>, symbol: impl Into<String>) {
        let id = id.into();
        let symbol = symbol.into().to_uppercase();

        if let Some(old) = self.symbols.insert(id.clone(), symbol.clone()) {
            self.ids.remove(&old);
        }
        if let Some(old_id) = self.ids.insert(symbol, id.clone()) {
            if old_id != id {
                self.symbols.remove(&old_id);
            }
        }
    }

    /// Extend with overrides, replacing existing entries
    pub fn extend<I, K, V>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (id, symbol) in entries {
            self.insert(id, symbol);
        }
    }

    /// Exchange symbol for an instrument id
    pub fn symbol(&self, id: &str) -> Option<&str> {
        self.symbols.get(id).map(String::as_str)
    }

    /// Instrument id for an exchange symbol, case-insensitive
    pub fn id_for_symbol(&self, symbol: &str) -> Option<&str> {
        match self.ids.get(symbol) {
            Some(id) => Some(id.as_str()),
            None => self.ids.get(&symbol.to_uppercase()).map(String::as_str),
        }
    }

    /// Resolve ids to symbols, dropping unmapped ids and keeping input order
    pub fn resolve<'a, I>(&self, ids: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut symbols: Vec<String> = Vec::new();
        for id in ids {
            if let Some(symbol) = self.symbol(id) {
                if !symbols.iter().any(|s| s == symbol) {
                    symbols.push(symbol.to_string());
                }
            }
        }
        symbols
    }

    /// All mappings sorted by id
    pub fn entries(&self) -> Vec<(&str, &str)> {
        let mut entries: Vec<_> = self
            .symbols
            .iter()
            .map(|(id, symbol)| (id.as_str(), symbol.as_str()))
            .collect();
        entries.sort_by(|a, b| {
            let key = |s: &str| s.parse::<u64>().ok();
            key(a.0).cmp(&key(b.0)).then_with(|| a.0.cmp(b.0))
        });
        entries
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}
