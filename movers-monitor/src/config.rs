use crate::history::{DEFAULT_RETENTION_MINUTES, DEFAULT_SAVE_DEBOUNCE};
use movers_data::{
    FeedConfig,
    connection::DEFAULT_FEED_URL,
    streams::timeout::DEFAULT_WS_READ_TIMEOUT,
    subscription::STREAM_ALL_MINI_TICKERS,
};
use std::{path::PathBuf, str::FromStr, time::Duration};
use tracing::warn;

pub const ENV_WS_URL: &str = "MOVERS_WS_URL";
pub const ENV_STREAM: &str = "MOVERS_STREAM";
pub const ENV_STATE_DIR: &str = "MOVERS_STATE_DIR";
pub const ENV_HISTORY_MINUTES: &str = "MOVERS_HISTORY_MINUTES";
pub const ENV_SAVE_DEBOUNCE_MS: &str = "MOVERS_SAVE_DEBOUNCE_MS";
pub const ENV_FEED_BUFFER: &str = "MOVERS_FEED_BUFFER";
pub const ENV_READ_TIMEOUT_SECS: &str = "MOVERS_READ_TIMEOUT_SECS";

pub const DEFAULT_STATE_DIR: &str = "./movers-state";
pub const DEFAULT_FEED_BUFFER: usize = 1024;

#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    /// Upstream feed connection.
    pub feed: FeedConfig,

    /// Directory of the file blob store holding settings, history and acknowledgments.
    pub state_dir: PathBuf,

    /// Minutes of price history retained behind the latest recorded minute of each symbol.
    pub history_minutes: i64,

    /// Debounce window of the history save.
    pub save_debounce: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            feed: FeedConfig::new(DEFAULT_FEED_URL)
                .with_stream(STREAM_ALL_MINI_TICKERS)
                .with_read_timeout(DEFAULT_WS_READ_TIMEOUT)
                .with_channel_buffer_size(DEFAULT_FEED_BUFFER),
            state_dir: PathBuf::from(DEFAULT_STATE_DIR),
            history_minutes: DEFAULT_RETENTION_MINUTES,
            save_debounce: DEFAULT_SAVE_DEBOUNCE,
        }
    }
}

impl MonitorConfig {
    /// Build from `MOVERS_*` environment variables. Invalid values fall back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let text = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut feed = defaults.feed;
        if let Some(url) = text(ENV_WS_URL) {
            feed = feed.with_url(url);
        }
        if let Some(stream) = text(ENV_STREAM) {
            feed = feed.with_stream(stream);
        }
        if let Some(buffer) = parse_positive::<usize>(ENV_FEED_BUFFER, text(ENV_FEED_BUFFER)) {
            feed = feed.with_channel_buffer_size(buffer);
        }
        if let Some(secs) = parse_positive::<u64>(ENV_READ_TIMEOUT_SECS, text(ENV_READ_TIMEOUT_SECS))
        {
            feed = feed.with_read_timeout(Duration::from_secs(secs));
        }

        Self {
            feed,
            state_dir: text(ENV_STATE_DIR)
                .map(PathBuf::from)
                .unwrap_or(defaults.state_dir),
            history_minutes: parse_positive::<i64>(
                ENV_HISTORY_MINUTES,
                text(ENV_HISTORY_MINUTES),
            )
            .unwrap_or(defaults.history_minutes),
            save_debounce: parse_positive::<u64>(
                ENV_SAVE_DEBOUNCE_MS,
                text(ENV_SAVE_DEBOUNCE_MS),
            )
            .map(Duration::from_millis)
            .unwrap_or(defaults.save_debounce),
        }
    }

    pub fn with_feed(mut self, feed: FeedConfig) -> Self {
        self.feed = feed;
        self
    }

    pub fn with_state_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.state_dir = dir.into();
        self
    }

    pub fn with_history_minutes(mut self, minutes: i64) -> Self {
        self.history_minutes = minutes;
        self
    }

    pub fn with_save_debounce(mut self, debounce: Duration) -> Self {
        self.save_debounce = debounce;
        self
    }
}

/// Parse a strictly positive number, logging and discarding anything else.
fn parse_positive<T>(key: &str, value: Option<String>) -> Option<T>
where
    T: FromStr + PartialOrd + Default,
{
    let value = value?;
    match value.parse::<T>() {
        Ok(parsed) if parsed > T::default() => Some(parsed),
        _ => {
            warn!(key, value = %value, "invalid configuration value, using default");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<HashMap<_, _>>();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_defaults() {
        let config = MonitorConfig::from_lookup(lookup(&[]));
        assert_eq!(config, MonitorConfig::default());
        assert_eq!(config.feed.url, "wss://fstream.binance.com/stream");
        assert_eq!(config.feed.stream, "!miniTicker@arr");
        assert_eq!(config.feed.channel_buffer_size, 1024);
        assert_eq!(config.feed.read_timeout, Duration::from_secs(120));
        assert_eq!(config.state_dir, PathBuf::from("./movers-state"));
        assert_eq!(config.history_minutes, 5);
        assert_eq!(config.save_debounce, Duration::from_millis(500));
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = MonitorConfig::from_lookup(lookup(&[
            (ENV_WS_URL, "ws://127.0.0.1:9001/stream"),
            (ENV_STREAM, "!ticker@arr"),
            (ENV_STATE_DIR, "/tmp/movers"),
            (ENV_HISTORY_MINUTES, "10"),
            (ENV_SAVE_DEBOUNCE_MS, "250"),
            (ENV_FEED_BUFFER, "16"),
            (ENV_READ_TIMEOUT_SECS, "30"),
        ]));

        assert_eq!(config.feed.url, "ws://127.0.0.1:9001/stream");
        assert_eq!(config.feed.stream, "!ticker@arr");
        assert_eq!(config.state_dir, PathBuf::from("/tmp/movers"));
        assert_eq!(config.history_minutes, 10);
        assert_eq!(config.save_debounce, Duration::from_millis(250));
        assert_eq!(config.feed.channel_buffer_size, 16);
        assert_eq!(config.feed.read_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_from_lookup_invalid_values_fall_back() {
        let config = MonitorConfig::from_lookup(lookup(&[
            (ENV_WS_URL, "   "),
            (ENV_HISTORY_MINUTES, "-3"),
            (ENV_SAVE_DEBOUNCE_MS, "soon"),
            (ENV_FEED_BUFFER, "0"),
            (ENV_READ_TIMEOUT_SECS, "1.5"),
        ]));

        assert_eq!(config, MonitorConfig::default());
    }
}
