//! Long and short horizon rankings.
//!
//! Both rankings sort by `pct_change` descending with a stable sort, so ties keep the
//! [`TickerBook`] insertion order.

use crate::{
    book::{TickerBook, TickerSnapshot},
    history::RollingHistoryStore,
    settings::{SHORT_LIMIT_MAX, SHORT_LIMIT_MIN, ShortWindow},
};
use itertools::Itertools;
use movers_data::Symbol;

/// Change since the daily open.
#[derive(Debug, Clone, PartialEq)]
pub struct LongRow {
    pub symbol: Symbol,
    pub last_price: f64,
    pub reference_price: f64,
    pub pct_change: f64,
    pub volume_base: Option<f64>,
    pub volume_quote: Option<f64>,
}

impl From<&TickerSnapshot> for LongRow {
    fn from(snapshot: &TickerSnapshot) -> Self {
        Self {
            symbol: snapshot.symbol.clone(),
            last_price: snapshot.last_price,
            reference_price: snapshot.reference_price,
            pct_change: pct_change(snapshot.last_price, snapshot.reference_price),
            volume_base: snapshot.volume_base,
            volume_quote: snapshot.volume_quote,
        }
    }
}

/// Change since the history bucket `window` minutes ago.
#[derive(Debug, Clone, PartialEq)]
pub struct ShortRow {
    pub symbol: Symbol,
    pub last_price: f64,
    /// Representative price of the historical bucket.
    pub reference_price: f64,
    pub pct_change: f64,
    /// Last update of the historical bucket, epoch ms.
    pub history_timestamp: i64,
    pub history_age_minutes: i64,
}

#[inline]
pub fn pct_change(last_price: f64, reference_price: f64) -> f64 {
    (last_price - reference_price) / reference_price
}

/// Every snapshot of the book ranked by change since the daily open.
pub fn compute_long(book: &TickerBook) -> Vec<LongRow> {
    book.iter()
        .map(LongRow::from)
        .sorted_by(|a, b| b.pct_change.total_cmp(&a.pct_change))
        .collect()
}

/// Top `limit` symbols ranked by change against the bucket exactly `window` minutes before
/// the current minute.
///
/// Symbols without a bucket at that minute, or whose bucket price is zero or non-finite, are
/// left out. Reading a closed bucket finalizes it.
pub fn compute_short(
    book: &TickerBook,
    history: &mut RollingHistoryStore,
    window: ShortWindow,
    limit: usize,
) -> Vec<ShortRow> {
    let target_minute = history.current_minute() - window.minutes();
    let limit = limit.clamp(SHORT_LIMIT_MIN, SHORT_LIMIT_MAX);

    book.iter()
        .filter_map(|snapshot| {
            let (reference_price, history_timestamp) = {
                let bucket = history.get_entry(&snapshot.symbol, target_minute)?;
                (bucket.representative_price, bucket.last_updated_at)
            };
            if !reference_price.is_finite() || reference_price == 0.0 {
                return None;
            }

            Some(ShortRow {
                symbol: snapshot.symbol.clone(),
                last_price: snapshot.last_price,
                reference_price,
                pct_change: pct_change(snapshot.last_price, reference_price),
                history_timestamp,
                history_age_minutes: history.age_minutes_since(history_timestamp),
            })
        })
        .sorted_by(|a, b| b.pct_change.total_cmp(&a.pct_change))
        .take(limit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clock::{MINUTE_MS, ManualClock},
        store::MemoryBlobStore,
    };
    use movers_data::MiniTicker;
    use std::sync::Arc;

    fn ticker(symbol: &str, last_price: f64, open_price: f64) -> MiniTicker {
        MiniTicker {
            symbol: Symbol::new(symbol),
            last_price,
            open_price,
            volume_base: Some(1.0),
            volume_quote: Some(2.0),
            event_time: None,
        }
    }

    fn history(clock: &ManualClock) -> RollingHistoryStore {
        RollingHistoryStore::new(Arc::new(clock.clone()), Arc::new(MemoryBlobStore::new()))
    }

    #[test]
    fn test_compute_long_stable_descending() {
        let mut book = TickerBook::new();
        book.apply(&ticker("AAAUSDT", 100.0, 100.0));
        book.apply(&ticker("BBBUSDT", 110.0, 100.0));
        book.apply(&ticker("CCCUSDT", 90.0, 100.0));
        book.apply(&ticker("DDDUSDT", 50.0, 50.0));

        let rows = compute_long(&book);
        let symbols = rows.iter().map(|row| row.symbol.as_str()).collect::<Vec<_>>();
        assert_eq!(symbols, vec!["BBBUSDT", "AAAUSDT", "DDDUSDT", "CCCUSDT"]);
        assert!((rows[0].pct_change - 0.1).abs() < 1e-12);
        assert_eq!(rows[0].volume_quote, Some(2.0));
    }

    #[test]
    fn test_compute_short_uses_exact_target_minute() {
        let clock = ManualClock::new(0);
        let mut history = history(&clock);
        let mut book = TickerBook::new();

        // Minute 100 history for BTC and ETH, minute 99 only for SOL
        for (symbol, price, minute) in [
            ("BTCUSDT", 100.0, 100),
            ("ETHUSDT", 200.0, 100),
            ("SOLUSDT", 10.0, 99),
        ] {
            history.record(&Symbol::new(symbol), price, minute * MINUTE_MS + 1_000);
        }

        book.apply(&ticker("BTCUSDT", 103.0, 90.0));
        book.apply(&ticker("ETHUSDT", 220.0, 180.0));
        book.apply(&ticker("SOLUSDT", 20.0, 10.0));
        book.apply(&ticker("XRPUSDT", 1.0, 1.0));

        clock.set(101 * MINUTE_MS + 30_000);
        let rows = compute_short(&book, &mut history, ShortWindow::One, 10);

        let symbols = rows.iter().map(|row| row.symbol.as_str()).collect::<Vec<_>>();
        assert_eq!(symbols, vec!["ETHUSDT", "BTCUSDT"]);
        assert_eq!(rows[0].reference_price, 200.0);
        assert!((rows[0].pct_change - 0.1).abs() < 1e-12);
        assert_eq!(rows[1].history_timestamp, 100 * MINUTE_MS + 1_000);
        assert_eq!(rows[1].history_age_minutes, 1);

        // Reading the closed minute finalized it
        assert!(history.buckets("BTCUSDT").unwrap()[0].finalized);

        let rows = compute_short(&book, &mut history, ShortWindow::One, 1);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].symbol, "ETHUSDT");

        let rows = compute_short(&book, &mut history, ShortWindow::Two, 0);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].symbol, "SOLUSDT");
    }

    #[test]
    fn test_compute_short_skips_degenerate_reference() {
        let clock = ManualClock::new(0);
        let mut history = history(&clock);
        let mut book = TickerBook::new();

        history.record(&Symbol::new("ZEROUSDT"), 0.0, 100 * MINUTE_MS);
        book.apply(&ticker("ZEROUSDT", 1.0, 1.0));

        clock.set(101 * MINUTE_MS);
        assert!(compute_short(&book, &mut history, ShortWindow::One, 10).is_empty());
    }
}
