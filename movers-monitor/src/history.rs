//! Rolling per-symbol price history bucketed by minute.
//!
//! Every symbol keeps an ordered run of [`TimeBucket`]s. Each record prunes the buckets
//! more than the retention window behind the recorded minute. Buckets are finalized
//! lazily: when a newer minute is recorded for the symbol, or when a closed minute is read
//! through [`RollingHistoryStore::get_entry`]. There is no background finalizer.
//!
//! The full state is persisted as one JSON blob, debounced so a burst of records results in
//! a single write.

use crate::{
    clock::{Clock, MINUTE_MS, minute_index},
    store::{BlobStore, KEY_PRICE_HISTORY, StoreError},
};
use fnv::FnvBuildHasher;
use indexmap::IndexMap;
use movers_data::Symbol;
use serde::Serialize;
use serde_json::Value;
use std::{sync::Arc, time::Duration};
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

/// Default number of minutes retained behind the recorded minute.
pub const DEFAULT_RETENTION_MINUTES: i64 = 5;

/// Default debounce window of the durable save.
pub const DEFAULT_SAVE_DEBOUNCE: Duration = Duration::from_millis(500);

/// Aggregate of the price samples of one symbol within one minute.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeBucket {
    pub minute_index: i64,
    pub samples: Vec<f64>,
    /// Last sample while live, mean of all samples once finalized.
    pub representative_price: f64,
    /// Epoch milliseconds of the last sample.
    pub last_updated_at: i64,
    pub finalized: bool,
}

impl TimeBucket {
    fn open(minute_index: i64, price: f64, event_time: i64) -> Self {
        Self {
            minute_index,
            samples: vec![price],
            representative_price: price,
            last_updated_at: event_time,
            finalized: false,
        }
    }

    fn push(&mut self, price: f64, event_time: i64) {
        self.samples.push(price);
        self.representative_price = price;
        self.last_updated_at = event_time;
    }

    /// Close the bucket. A bucket without samples keeps its stored price.
    fn finalize(&mut self) {
        if self.finalized {
            return;
        }
        if let Some(mean) = self.mean() {
            self.representative_price = mean;
        }
        self.finalized = true;
    }

    /// Arithmetic mean of all samples.
    pub fn mean(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.samples.iter().sum::<f64>() / self.samples.len() as f64)
    }
}

/// Persisted shape of a [`TimeBucket`].
#[derive(Serialize)]
struct StoredBucket<'a> {
    minute: i64,
    price: f64,
    values: &'a [f64],
    finalized: bool,
    #[serde(rename = "lastUpdatedAt")]
    last_updated_at: i64,
}

impl<'a> From<&'a TimeBucket> for StoredBucket<'a> {
    fn from(bucket: &'a TimeBucket) -> Self {
        Self {
            minute: bucket.minute_index,
            price: bucket.representative_price,
            values: &bucket.samples,
            finalized: bucket.finalized,
            last_updated_at: bucket.last_updated_at,
        }
    }
}

/// Owner of all per-symbol [`TimeBucket`] history.
pub struct RollingHistoryStore {
    clock: Arc<dyn Clock>,
    store: Arc<dyn BlobStore>,
    retention_minutes: i64,
    save_debounce: Duration,
    entries: IndexMap<Symbol, Vec<TimeBucket>, FnvBuildHasher>,
    pending_save: Option<Instant>,
}

impl std::fmt::Debug for RollingHistoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RollingHistoryStore")
            .field("retention_minutes", &self.retention_minutes)
            .field("save_debounce", &self.save_debounce)
            .field("symbols", &self.entries.len())
            .field("pending_save", &self.pending_save)
            .finish()
    }
}

impl RollingHistoryStore {
    pub fn new(clock: Arc<dyn Clock>, store: Arc<dyn BlobStore>) -> Self {
        Self {
            clock,
            store,
            retention_minutes: DEFAULT_RETENTION_MINUTES,
            save_debounce: DEFAULT_SAVE_DEBOUNCE,
            entries: IndexMap::default(),
            pending_save: None,
        }
    }

    /// Set the retention window, at least one minute.
    pub fn with_retention_minutes(mut self, minutes: i64) -> Self {
        self.retention_minutes = minutes.max(1);
        self
    }

    pub fn with_save_debounce(mut self, debounce: Duration) -> Self {
        self.save_debounce = debounce;
        self
    }

    pub fn retention_minutes(&self) -> i64 {
        self.retention_minutes
    }

    /// Number of symbols with retained history.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Retained buckets of `symbol`, ordered by minute. Does not finalize.
    pub fn buckets(&self, symbol: &str) -> Option<&[TimeBucket]> {
        self.entries.get(symbol).map(Vec::as_slice)
    }

    /// Record a price sample for `symbol` at `event_time` (epoch ms).
    ///
    /// Non-finite prices are ignored. Samples for a minute that was already finalized are
    /// dropped. Buckets more than the retention window behind the recorded minute are pruned.
    pub fn record(&mut self, symbol: &Symbol, price: f64, event_time: i64) {
        if !price.is_finite() {
            trace!(%symbol, price, "ignoring non-finite price");
            return;
        }

        let minute = minute_index(event_time);
        let retention = self.retention_minutes;
        let buckets = self.entries.entry(symbol.clone()).or_default();

        match buckets.binary_search_by_key(&minute, |bucket| bucket.minute_index) {
            Ok(index) if buckets[index].finalized => {
                trace!(%symbol, minute, "dropping tick for finalized minute");
                return;
            }
            Ok(index) => buckets[index].push(price, event_time),
            Err(index) => buckets.insert(index, TimeBucket::open(minute, price, event_time)),
        }

        // Every minute before the recorded one has closed
        buckets
            .iter_mut()
            .filter(|bucket| bucket.minute_index < minute && !bucket.finalized)
            .for_each(TimeBucket::finalize);

        let cutoff = minute.saturating_sub(retention);
        buckets.retain(|bucket| bucket.minute_index >= cutoff);

        self.schedule_save();
    }

    /// Bucket of `symbol` at exactly `target_minute`, finalized first if that minute has
    /// passed on the wall clock.
    pub fn get_entry(&mut self, symbol: &str, target_minute: i64) -> Option<&TimeBucket> {
        let now_minute = self.clock.current_minute();
        let buckets = self.entries.get_mut(symbol)?;
        let index = buckets
            .binary_search_by_key(&target_minute, |bucket| bucket.minute_index)
            .ok()?;

        let bucket = &mut buckets[index];
        if !bucket.finalized && bucket.minute_index < now_minute {
            bucket.finalize();
        }
        Some(&*bucket)
    }

    /// Whole minutes elapsed since the bucket was last updated, never negative.
    pub fn age_minutes(&self, bucket: &TimeBucket) -> i64 {
        self.age_minutes_since(bucket.last_updated_at)
    }

    pub fn age_minutes_since(&self, reference_ts: i64) -> i64 {
        self.clock
            .now_ms()
            .saturating_sub(reference_ts)
            .div_euclid(MINUTE_MS)
            .max(0)
    }

    /// Current wall clock minute index.
    pub fn current_minute(&self) -> i64 {
        self.clock.current_minute()
    }

    /// Replace the in-memory history with the persisted snapshot.
    ///
    /// Malformed blobs, pairs and buckets are skipped. Buckets older than the retention
    /// window relative to the current wall clock are discarded. If anything survived the
    /// normalised state is written back immediately. Returns the number of symbols restored.
    pub fn hydrate(&mut self) -> usize {
        let Some(blob) = self.store.get(KEY_PRICE_HISTORY) else {
            return 0;
        };

        let pairs = match serde_json::from_str::<Value>(&blob) {
            Ok(Value::Array(pairs)) => pairs,
            Ok(_) => {
                warn!("persisted price history is not an array, ignoring");
                return 0;
            }
            Err(error) => {
                warn!(%error, "persisted price history is not valid JSON, ignoring");
                return 0;
            }
        };

        let cutoff = self.clock.current_minute() - self.retention_minutes;
        self.entries.clear();

        for pair in pairs {
            let Some((symbol, items)) = parse_pair(&pair) else {
                debug!(?pair, "skipping malformed price history pair");
                continue;
            };

            let mut buckets = items
                .iter()
                .filter_map(normalise_bucket)
                .filter(|bucket| bucket.minute_index >= cutoff)
                .collect::<Vec<_>>();
            buckets.sort_by_key(|bucket| bucket.minute_index);
            buckets.dedup_by_key(|bucket| bucket.minute_index);

            if !buckets.is_empty() {
                self.entries.insert(Symbol::new(symbol), buckets);
            }
        }

        if !self.entries.is_empty() {
            info!(symbols = self.entries.len(), "restored price history");
            self.flush();
        }

        self.entries.len()
    }

    /// Deadline of the pending debounced save, if any.
    pub fn save_deadline(&self) -> Option<Instant> {
        self.pending_save
    }

    /// Execute the pending debounced save, if any.
    pub fn run_scheduled_save(&mut self) {
        if self.pending_save.is_some() {
            self.flush();
        }
    }

    /// Persist the full state now, cancelling any pending debounced save.
    ///
    /// Storage failures are logged and never propagated.
    pub fn flush(&mut self) {
        self.pending_save = None;
        if let Err(error) = self.save() {
            warn!(%error, "failed to persist price history");
        }
    }

    /// JSON snapshot of the full state, `[[symbol, [bucket, ..]], ..]`.
    pub fn snapshot(&self) -> Result<String, serde_json::Error> {
        let payload = self
            .entries
            .iter()
            .map(|(symbol, buckets)| {
                (
                    symbol.as_str(),
                    buckets.iter().map(StoredBucket::from).collect::<Vec<_>>(),
                )
            })
            .collect::<Vec<_>>();

        serde_json::to_string(&payload)
    }

    fn save(&self) -> Result<(), StoreError> {
        let snapshot = self.snapshot()?;
        self.store.set(KEY_PRICE_HISTORY, &snapshot)
    }

    /// Anchor the debounce window at the first unsaved write.
    fn schedule_save(&mut self) {
        if self.pending_save.is_none() {
            self.pending_save = Some(Instant::now() + self.save_debounce);
        }
    }
}

/// Largest minute index whose start fits an epoch millisecond `i64`.
const MAX_MINUTE_INDEX: i64 = i64::MAX / MINUTE_MS;

fn parse_pair(pair: &Value) -> Option<(&str, &Vec<Value>)> {
    let [symbol, items, ..] = pair.as_array()?.as_slice() else {
        return None;
    };
    let symbol = symbol.as_str().filter(|symbol| !symbol.is_empty())?;
    Some((symbol, items.as_array()?))
}

/// Validate one persisted bucket, `None` if it has no usable minute or price.
fn normalise_bucket(raw: &Value) -> Option<TimeBucket> {
    let object = raw.as_object()?;

    let minute = object.get("minute").and_then(lenient_number)?;
    if minute.fract() != 0.0 || minute.abs() > MAX_MINUTE_INDEX as f64 {
        return None;
    }
    let minute = minute as i64;

    let samples = object
        .get("values")
        .and_then(Value::as_array)
        .map(|values| values.iter().filter_map(lenient_number).collect::<Vec<_>>())
        .unwrap_or_default();

    let representative_price = object
        .get("price")
        .and_then(lenient_number)
        .or_else(|| samples.last().copied())?;

    let last_updated_at = object
        .get("lastUpdatedAt")
        .and_then(lenient_number)
        .filter(|ts| (i64::MIN as f64..i64::MAX as f64).contains(ts))
        .map(|ts| ts as i64)
        .unwrap_or(minute * MINUTE_MS);

    let finalized = match object.get("finalized") {
        Some(Value::Bool(finalized)) => *finalized,
        Some(Value::Number(number)) => number.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(text)) => !text.is_empty(),
        _ => false,
    };

    Some(TimeBucket {
        minute_index: minute,
        samples,
        representative_price,
        last_updated_at,
        finalized,
    })
}

/// JSON number or numeric string as a finite `f64`.
fn lenient_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|number| number.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{clock::ManualClock, store::MemoryBlobStore};

    fn history(clock: &ManualClock) -> (RollingHistoryStore, Arc<MemoryBlobStore>) {
        let store = Arc::new(MemoryBlobStore::new());
        let history = RollingHistoryStore::new(Arc::new(clock.clone()), store.clone());
        (history, store)
    }

    fn symbol(name: &str) -> Symbol {
        Symbol::new(name)
    }

    fn at(minute: i64, second: i64) -> i64 {
        minute * MINUTE_MS + second * 1_000
    }

    #[test]
    fn test_record_open_minute_reports_last_price() {
        let clock = ManualClock::new(at(100, 30));
        let (mut history, _) = history(&clock);
        let btc = symbol("BTCUSDT");

        history.record(&btc, 10.0, at(100, 1));
        history.record(&btc, 12.5, at(100, 29));

        let bucket = history.get_entry("BTCUSDT", 100).unwrap();
        assert_eq!(bucket.representative_price, 12.5);
        assert_eq!(bucket.samples, vec![10.0, 12.5]);
        assert_eq!(bucket.last_updated_at, at(100, 29));
        assert!(!bucket.finalized);
    }

    #[test]
    fn test_newer_minute_finalizes_to_mean() {
        let clock = ManualClock::new(at(101, 0));
        let (mut history, _) = history(&clock);
        let btc = symbol("BTCUSDT");

        history.record(&btc, 10.0, at(100, 0));
        history.record(&btc, 20.0, at(100, 20));
        history.record(&btc, 30.0, at(100, 40));
        history.record(&btc, 99.0, at(101, 0));

        let buckets = history.buckets("BTCUSDT").unwrap();
        assert_eq!(buckets.len(), 2);
        assert!(buckets[0].finalized);
        assert_eq!(buckets[0].representative_price, 20.0);
        assert!(!buckets[1].finalized);
        assert_eq!(buckets[1].representative_price, 99.0);
    }

    #[test]
    fn test_get_entry_finalizes_closed_minute_lazily() {
        let clock = ManualClock::new(at(100, 10));
        let (mut history, _) = history(&clock);
        let eth = symbol("ETHUSDT");

        history.record(&eth, 1.0, at(100, 0));
        history.record(&eth, 2.0, at(100, 5));
        assert!(!history.get_entry("ETHUSDT", 100).unwrap().finalized);

        clock.set(at(101, 0));
        let bucket = history.get_entry("ETHUSDT", 100).unwrap();
        assert!(bucket.finalized);
        assert_eq!(bucket.representative_price, 1.5);

        // No interpolation to adjacent minutes
        assert!(history.get_entry("ETHUSDT", 99).is_none());
        assert!(history.get_entry("SOLUSDT", 100).is_none());
    }

    fn minutes(history: &RollingHistoryStore, symbol: &str) -> Vec<i64> {
        history
            .buckets(symbol)
            .unwrap_or_default()
            .iter()
            .map(|bucket| bucket.minute_index)
            .collect()
    }

    #[test]
    fn test_late_ticks() {
        let clock = ManualClock::new(at(110, 0));
        let (mut history, _) = history(&clock);
        let btc = symbol("BTCUSDT");

        history.record(&btc, 10.0, at(100, 0));
        history.record(&btc, 20.0, at(101, 0));

        // Minute 100 is finalized
        history.record(&btc, 1_000.0, at(100, 59));
        let bucket = &history.buckets("BTCUSDT").unwrap()[0];
        assert_eq!(bucket.samples, vec![10.0]);
        assert_eq!(bucket.representative_price, 10.0);

        // Older than the retention window, pruned by the next in-order tick
        history.record(&btc, 5.0, at(90, 0));
        assert_eq!(minutes(&history, "BTCUSDT"), vec![90, 100, 101]);
        history.record(&btc, 21.0, at(101, 30));
        assert_eq!(minutes(&history, "BTCUSDT"), vec![100, 101]);

        // Gap minute behind the newest is closed once read after its minute passed
        history.record(&btc, 30.0, at(104, 0));
        history.record(&btc, 15.0, at(103, 0));
        assert_eq!(minutes(&history, "BTCUSDT"), vec![100, 101, 103, 104]);
        let bucket = history.get_entry("BTCUSDT", 103).unwrap();
        assert!(bucket.finalized);
        assert_eq!(bucket.representative_price, 15.0);
        assert!(!history.buckets("BTCUSDT").unwrap()[3].finalized);
    }

    #[test]
    fn test_future_dated_tick_does_not_block_current_ticks() {
        let clock = ManualClock::new(at(101, 30));
        let (mut history, _) = history(&clock);
        let btc = symbol("BTCUSDT");

        history.record(&btc, 99.0, at(99, 0));
        history.record(&btc, 1.0, at(1_000_000, 0));
        assert_eq!(minutes(&history, "BTCUSDT"), vec![1_000_000]);

        history.record(&btc, 100.0, at(100, 0));
        history.record(&btc, 101.0, at(101, 0));
        assert_eq!(minutes(&history, "BTCUSDT"), vec![100, 101, 1_000_000]);

        let bucket = history.get_entry("BTCUSDT", 100).unwrap();
        assert!(bucket.finalized);
        assert_eq!(bucket.representative_price, 100.0);
    }

    #[test]
    fn test_non_finite_price_is_ignored() {
        let clock = ManualClock::new(at(100, 0));
        let (mut history, _) = history(&clock);

        history.record(&symbol("BTCUSDT"), f64::NAN, at(100, 0));
        history.record(&symbol("BTCUSDT"), f64::INFINITY, at(100, 0));
        assert!(history.is_empty());
        assert!(history.save_deadline().is_none());
    }

    #[test]
    fn test_prune_relative_to_recorded_minute() {
        let clock = ManualClock::new(at(200, 0));
        let (mut history, _) = history(&clock);
        let btc = symbol("BTCUSDT");

        for minute in 100..=106 {
            history.record(&btc, minute as f64, at(minute, 0));
        }

        let minutes = history
            .buckets("BTCUSDT")
            .unwrap()
            .iter()
            .map(|bucket| bucket.minute_index)
            .collect::<Vec<_>>();
        assert_eq!(minutes, vec![101, 102, 103, 104, 105, 106]);
        assert!(history.get_entry("BTCUSDT", 100).is_none());
    }

    #[test]
    fn test_age_minutes() {
        struct TestCase {
            now: i64,
            expected: i64,
        }

        let clock = ManualClock::new(0);
        let (history, _) = history(&clock);
        let bucket = TimeBucket::open(100, 1.0, at(100, 30));

        let tests = vec![
            TestCase {
                // TC0: same minute
                now: at(100, 59),
                expected: 0,
            },
            TestCase {
                // TC1: exactly one minute later
                now: at(101, 30),
                expected: 1,
            },
            TestCase {
                // TC2: clock behind the bucket
                now: at(99, 0),
                expected: 0,
            },
            TestCase {
                // TC3: several minutes later
                now: at(104, 29),
                expected: 3,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            clock.set(test.now);
            let actual = history.age_minutes(&bucket);
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_hydrate_normalises_and_repersists() {
        let clock = ManualClock::new(at(100, 0));
        let (mut history, store) = history(&clock);

        let blob = serde_json::json!([
            ["BTCUSDT", [
                // price falls back to last value, lastUpdatedAt to minute start
                {"minute": 99, "values": [1, "2", "x", null]},
                // string encoded fields
                {"minute": "98", "price": "5.5", "values": [], "finalized": true, "lastUpdatedAt": 5_880_000},
                // no usable price
                {"minute": 97, "values": []},
                // outside retention window
                {"minute": 90, "price": 1, "values": [1]},
                // fractional minute
                {"minute": 96.5, "price": 1, "values": [1]}
            ]],
            ["ETHUSDT", [{"minute": 10, "price": 1, "values": [1]}]],
            [42, []],
            "garbage"
        ]);
        store.set(KEY_PRICE_HISTORY, &blob.to_string()).unwrap();

        assert_eq!(history.hydrate(), 1);

        let buckets = history.buckets("BTCUSDT").unwrap();
        assert_eq!(
            buckets,
            &[
                TimeBucket {
                    minute_index: 98,
                    samples: vec![],
                    representative_price: 5.5,
                    last_updated_at: 5_880_000,
                    finalized: true,
                },
                TimeBucket {
                    minute_index: 99,
                    samples: vec![1.0, 2.0],
                    representative_price: 2.0,
                    last_updated_at: 99 * MINUTE_MS,
                    finalized: false,
                },
            ]
        );
        assert!(history.buckets("ETHUSDT").is_none());

        let persisted = store.get(KEY_PRICE_HISTORY).unwrap();
        assert_eq!(persisted, history.snapshot().unwrap());
        assert_eq!(
            persisted,
            r#"[["BTCUSDT",[{"minute":98,"price":5.5,"values":[],"finalized":true,"lastUpdatedAt":5880000},{"minute":99,"price":2.0,"values":[1.0,2.0],"finalized":false,"lastUpdatedAt":5940000}]]]"#
        );
    }

    #[test]
    fn test_hydrate_rejects_out_of_range_numbers() {
        let clock = ManualClock::new(at(100, 0));
        let (mut history, store) = history(&clock);

        let blob = serde_json::json!([
            ["BTCUSDT", [
                // minute start overflows epoch milliseconds
                {"minute": 1e300, "price": 1},
                {"minute": -1e300, "price": 1, "lastUpdatedAt": 0}
            ]],
            ["ETHUSDT", [
                // timestamp out of range falls back to minute start
                {"minute": 100, "price": 1, "values": [1], "lastUpdatedAt": -1e300}
            ]]
        ]);
        store.set(KEY_PRICE_HISTORY, &blob.to_string()).unwrap();

        assert_eq!(history.hydrate(), 1);
        assert!(history.buckets("BTCUSDT").is_none());

        let bucket = history.get_entry("ETHUSDT", 100).unwrap().clone();
        assert_eq!(bucket.last_updated_at, 100 * MINUTE_MS);
        assert_eq!(history.age_minutes(&bucket), 0);

        // Extreme reference timestamps saturate rather than overflow
        assert_eq!(history.age_minutes_since(i64::MAX), 0);
        assert_eq!(history.age_minutes_since(i64::MIN), i64::MAX / MINUTE_MS);
    }

    #[test]
    fn test_hydrate_ignores_malformed_blob() {
        struct TestCase {
            input: &'static str,
        }

        let tests = vec![
            TestCase { input: "not json" },
            TestCase { input: r#"{"BTCUSDT":[]}"# },
            TestCase { input: "null" },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let clock = ManualClock::new(at(100, 0));
            let (mut history, store) = history(&clock);
            store.set(KEY_PRICE_HISTORY, test.input).unwrap();

            assert_eq!(history.hydrate(), 0, "TC{} failed", index);
            assert!(history.is_empty(), "TC{} failed", index);
            // Blob is left for the next save to overwrite
            assert_eq!(
                store.get(KEY_PRICE_HISTORY).as_deref(),
                Some(test.input),
                "TC{} failed",
                index
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounced_save_anchored_at_first_write() {
        let clock = ManualClock::new(at(100, 0));
        let (mut history, store) = history(&clock);
        let btc = symbol("BTCUSDT");

        let start = Instant::now();
        history.record(&btc, 1.0, at(100, 0));
        assert_eq!(history.save_deadline(), Some(start + DEFAULT_SAVE_DEBOUNCE));

        tokio::time::advance(Duration::from_millis(300)).await;
        history.record(&btc, 2.0, at(100, 1));
        assert_eq!(history.save_deadline(), Some(start + DEFAULT_SAVE_DEBOUNCE));
        assert!(store.get(KEY_PRICE_HISTORY).is_none());

        tokio::time::sleep_until(start + DEFAULT_SAVE_DEBOUNCE).await;
        history.run_scheduled_save();
        assert!(history.save_deadline().is_none());
        assert_eq!(
            store.get(KEY_PRICE_HISTORY),
            Some(history.snapshot().unwrap())
        );

        // Nothing pending, nothing written
        store.set(KEY_PRICE_HISTORY, "sentinel").unwrap();
        history.run_scheduled_save();
        assert_eq!(store.get(KEY_PRICE_HISTORY).as_deref(), Some("sentinel"));
    }

    #[test]
    fn test_flush_cancels_pending_save() {
        let clock = ManualClock::new(at(100, 0));
        let (mut history, store) = history(&clock);

        history.record(&symbol("BTCUSDT"), 1.0, at(100, 0));
        assert!(history.save_deadline().is_some());

        history.flush();
        assert!(history.save_deadline().is_none());
        assert!(store.get(KEY_PRICE_HISTORY).is_some());
    }
}
