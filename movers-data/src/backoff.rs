use std::time::Duration;

/// Delay before the first reconnect attempt, and after any successful open.
pub const DEFAULT_BACKOFF_FLOOR: Duration = Duration::from_millis(1_000);

/// Upper bound of the reconnect delay.
pub const DEFAULT_BACKOFF_CAP: Duration = Duration::from_millis(15_000);

/// Growth factor applied to the delay after every failed attempt.
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 1.5;

/// Exponential reconnect backoff, `next = min(current * multiplier, cap)`.
///
/// The delay is reset to the floor whenever a connection opens, so a flapping upstream that
/// accepts connections is retried quickly while a refusing upstream is retried at most every
/// `cap`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ReconnectBackoff {
    floor: Duration,
    cap: Duration,
    multiplier: f64,
    current: Duration,
}

impl Default for ReconnectBackoff {
    fn default() -> Self {
        Self::new(DEFAULT_BACKOFF_FLOOR, DEFAULT_BACKOFF_CAP)
    }
}

impl ReconnectBackoff {
    pub fn new(floor: Duration, cap: Duration) -> Self {
        let cap = cap.max(floor);
        Self {
            floor,
            cap,
            multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            current: floor,
        }
    }

    /// Growth factor per failed attempt, never below `1.0`. NaN is treated as `1.0`.
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier.max(1.0);
        self
    }

    /// Delay that the next call to [`Self::advance`] will return.
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Return the delay to wait before the next attempt and grow the stored delay.
    pub fn advance(&mut self) -> Duration {
        let delay = self.current;
        self.current = next_delay(self.current, self.multiplier, self.cap);
        delay
    }

    /// Connection opened, start over from the floor.
    pub fn reset(&mut self) {
        self.current = self.floor;
    }
}

/// Grow `current` by `multiplier`, saturating at `cap`. Multipliers below `1.0` keep the
/// delay unchanged.
pub fn next_delay(current: Duration, multiplier: f64, cap: Duration) -> Duration {
    let multiplier = multiplier.max(1.0);
    let grown = current.as_secs_f64() * multiplier;
    if !grown.is_finite() || grown >= cap.as_secs_f64() {
        return cap;
    }
    current.mul_f64(multiplier).min(cap)
}
