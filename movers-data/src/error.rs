use serde::{Deserialize, Serialize};
use thiserror::Error;

/// All connection level errors generated in `movers-data`.
///
/// Every variant is transient: the [`FeedConnection`](crate::connection::FeedConnection)
/// logs it, closes the socket and schedules a reconnect.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Error)]
pub enum FeedError {
    #[error("invalid feed url: {0}")]
    Url(String),

    #[error("failed to connect to {url}: {reason}")]
    Connect { url: String, reason: String },

    #[error("failed to send subscription request: {0}")]
    Subscribe(String),

    #[error("SocketError: {0}")]
    Socket(String),

    #[error("read timeout: no frame received for {secs} seconds")]
    ReadTimeout { secs: u64 },
}

impl FeedError {
    /// Determine if the error was raised after the connection had been established, ie/ the
    /// upstream dropped us rather than refusing us.
    #[allow(clippy::match_like_matches_macro)]
    pub fn is_disconnect(&self) -> bool {
        match self {
            FeedError::Socket(_) | FeedError::ReadTimeout { .. } => true,
            _ => false,
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for FeedError {
    fn from(value: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Socket(value.to_string())
    }
}

impl From<url::ParseError> for FeedError {
    fn from(value: url::ParseError) -> Self {
        Self::Url(value.to_string())
    }
}

/// Reasons a single text frame from the feed is dropped without being dispatched.
///
/// Decode errors never affect the connection, the frame is logged and skipped.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Error)]
pub enum DecodeError {
    #[error("invalid JSON payload: {0}")]
    InvalidJson(String),

    #[error("unexpected stream: expected {expected}, got {actual:?}")]
    UnexpectedStream {
        expected: String,
        actual: Option<String>,
    },

    #[error("stream {stream} payload is not an array")]
    PayloadNotArray { stream: String },
}

impl From<serde_json::Error> for DecodeError {
    fn from(value: serde_json::Error) -> Self {
        Self::InvalidJson(value.to_string())
    }
}
