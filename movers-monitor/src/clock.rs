use chrono::Utc;
use std::sync::{
    Arc,
    atomic::{AtomicI64, Ordering},
};

/// Length of one history bucket in milliseconds.
pub const MINUTE_MS: i64 = 60_000;

/// Discrete minute index of an epoch millisecond timestamp, `floor(ts / 60000)`.
///
/// Rounds towards negative infinity so pre-epoch timestamps stay monotonic.
#[inline]
pub fn minute_index(ts_ms: i64) -> i64 {
    ts_ms.div_euclid(MINUTE_MS)
}

/// Source of wall clock time in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;

    fn current_minute(&self) -> i64 {
        minute_index(self.now_ms())
    }
}

impl<T> Clock for Arc<T>
where
    T: Clock + ?Sized,
{
    fn now_ms(&self) -> i64 {
        T::now_ms(self)
    }
}

/// Wall clock.
#[derive(Debug, Copy, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Manually driven clock, shared by cloning.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_ms: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(now_ms: i64) -> Self {
        Self {
            now_ms: Arc::new(AtomicI64::new(now_ms)),
        }
    }

    pub fn set(&self, now_ms: i64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance_ms(&self, delta_ms: i64) {
        self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }

    pub fn set_minute(&self, minute: i64) {
        self.set(minute * MINUTE_MS);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}
