use fnv::FnvBuildHasher;
use indexmap::IndexMap;
use movers_data::{MiniTicker, Symbol};

/// Latest known values of one symbol, overwritten in place by every update.
#[derive(Debug, Clone, PartialEq)]
pub struct TickerSnapshot {
    pub symbol: Symbol,
    pub last_price: f64,
    /// Daily open price.
    pub reference_price: f64,
    pub volume_base: Option<f64>,
    pub volume_quote: Option<f64>,
}

impl From<&MiniTicker> for TickerSnapshot {
    fn from(ticker: &MiniTicker) -> Self {
        Self {
            symbol: ticker.symbol.clone(),
            last_price: ticker.last_price,
            reference_price: ticker.open_price,
            volume_base: ticker.volume_base,
            volume_quote: ticker.volume_quote,
        }
    }
}

/// Latest-tick cache, one [`TickerSnapshot`] per symbol in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct TickerBook {
    snapshots: IndexMap<Symbol, TickerSnapshot, FnvBuildHasher>,
}

impl TickerBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot of the ticker's symbol. Keeps the symbol's original position.
    pub fn apply(&mut self, ticker: &MiniTicker) {
        self.snapshots
            .insert(ticker.symbol.clone(), TickerSnapshot::from(ticker));
    }

    pub fn get(&self, symbol: &str) -> Option<&TickerSnapshot> {
        self.snapshots.get(symbol)
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TickerSnapshot> {
        self.snapshots.values()
    }
}
