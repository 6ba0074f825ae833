//! # Movers-Monitor
//! Streaming top-movers engine fed by the `movers-data` mini ticker feed.
//!
//! * [`history::RollingHistoryStore`] keeps a rolling window of per-minute price buckets per
//!   symbol, finalizing closed minutes to their mean and persisting a debounced snapshot.
//! * [`ranking`] derives the long horizon ranking (change since the daily open) and the
//!   short horizon ranking (change since the bucket a few minutes ago).
//! * [`alert::AlertEngine`] raises threshold alerts on the short ranking with per-symbol
//!   acknowledgment.
//! * [`monitor::Monitor`] owns all of it and processes feed batches and user commands one
//!   at a time.

/// Wall clock abstraction and minute bucketing.
pub mod clock;

/// Durable key → string blob stores.
pub mod store;

/// Rolling per-symbol minute history.
pub mod history;

/// Latest snapshot per symbol.
pub mod book;

/// Long and short horizon rankings.
pub mod ranking;

/// Clamped user settings.
pub mod settings;

/// Alert state machine and its side effects.
pub mod alert;

/// Display formatting.
pub mod format;

/// Orchestrator owning all state.
pub mod monitor;

/// Environment configuration.
pub mod config;

/// `tracing` subscriber setup.
pub mod logging;

pub use alert::{AlertEngine, AlertEvent, Visibility};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::MonitorConfig;
pub use history::{RollingHistoryStore, TimeBucket};
pub use monitor::{Command, Monitor, Presenter, RenderFrame};
pub use settings::{Settings, SettingsPatch, ShortWindow};
pub use store::{BlobStore, FileBlobStore, MemoryBlobStore};
