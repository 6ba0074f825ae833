use crate::{
    ranking::ShortRow,
    store::{BlobStore, KEY_ALERT_ACK, StoreError},
};
use fnv::FnvBuildHasher;
use indexmap::IndexSet;
use movers_data::Symbol;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

/// Symbols whose alert was acknowledged, persisted as a JSON array of strings.
///
/// A symbol stays acknowledged until it drops out of the short ranking, after which it can
/// alert again.
pub struct AcknowledgmentSet {
    symbols: IndexSet<Symbol, FnvBuildHasher>,
    store: Arc<dyn BlobStore>,
}

impl std::fmt::Debug for AcknowledgmentSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.symbols.iter()).finish()
    }
}

impl AcknowledgmentSet {
    /// Load the persisted set, empty if absent or malformed. Non-string items are skipped.
    pub fn load(store: Arc<dyn BlobStore>) -> Self {
        let symbols = store
            .get(KEY_ALERT_ACK)
            .and_then(|blob| serde_json::from_str::<Value>(&blob).ok())
            .and_then(|value| match value {
                Value::Array(items) => Some(items),
                _ => None,
            })
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(Symbol::new)
                    .collect()
            })
            .unwrap_or_default();

        Self { symbols, store }
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.symbols.contains(symbol)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Acknowledge every symbol and persist.
    pub fn extend<I>(&mut self, symbols: I)
    where
        I: IntoIterator<Item = Symbol>,
    {
        self.symbols.extend(symbols);
        self.persist();
    }

    /// Drop symbols not present in `rows`, persisting if anything was removed.
    pub fn prune(&mut self, rows: &[ShortRow]) -> bool {
        let before = self.symbols.len();
        self.symbols
            .retain(|symbol| rows.iter().any(|row| row.symbol == *symbol));

        let mutated = self.symbols.len() != before;
        if mutated {
            self.persist();
        }
        mutated
    }

    fn persist(&self) {
        if let Err(error) = self.save() {
            warn!(%error, "failed to persist alert acknowledgments");
        }
    }

    fn save(&self) -> Result<(), StoreError> {
        let symbols = self.symbols.iter().map(Symbol::as_str).collect::<Vec<_>>();
        let blob = serde_json::to_string(&symbols)?;
        self.store.set(KEY_ALERT_ACK, &blob)
    }
}
