#![forbid(unsafe_code)]

//! # Movers-Data
//! Resilient WebSocket integration for the Binance USDⓈ-M futures all-market mini ticker
//! stream (`!miniTicker@arr`).
//!
//! [`FeedConnection::spawn`](connection::FeedConnection::spawn) runs a single sequential
//! connect / subscribe / read / reconnect loop in its own task:
//! * One subscription request is sent on every successful open.
//! * Every text frame is decoded into a [`TickerBatch`](ticker::TickerBatch); malformed
//!   frames are dropped whole, invalid items are dropped one by one.
//! * Batches are delivered in order over a bounded channel, the reader waits for capacity.
//! * Closed, errored, refused and silent connections are retried with exponential
//!   [`ReconnectBackoff`](backoff::ReconnectBackoff) that resets only on a successful open.

/// All [`Error`](std::error::Error)s generated in Movers-Data.
pub mod error;

/// Subscription control message and stream names.
pub mod subscription;

/// Mini ticker wire types and batch decoding.
pub mod ticker;

/// Exponential reconnect backoff.
pub mod backoff;

/// Stream wrappers used by the feed reader.
pub mod streams;

/// [`FeedConnection`](connection::FeedConnection) task and its configuration.
pub mod connection;

pub use backoff::{ReconnectBackoff, next_delay};
pub use connection::{ConnectionStatus, FeedConfig, FeedConnection};
pub use error::{DecodeError, FeedError};
pub use subscription::{STREAM_ALL_MINI_TICKERS, SubscribeRequest};
pub use ticker::{MiniTicker, Symbol, TickerBatch, decode_batch};
