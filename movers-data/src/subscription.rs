use serde::{Deserialize, Serialize};

/// Binance futures all-market mini ticker stream name.
///
/// See docs: <https://developers.binance.com/docs/derivatives/usds-margined-futures/websocket-market-streams/All-Market-Mini-Tickers-Stream>
pub const STREAM_ALL_MINI_TICKERS: &str = "!miniTicker@arr";

/// Binance live subscription control message, sent once after every successful connect.
///
/// ### Raw Payload Examples
///```json
/// {
///     "method": "SUBSCRIBE",
///     "params": ["!miniTicker@arr"],
///     "id": 1
/// }
/// ```
#[derive(Clone, Eq, PartialEq, Debug, Deserialize, Serialize)]
pub struct SubscribeRequest {
    pub method: String,
    pub params: Vec<String>,
    pub id: u64,
}

impl SubscribeRequest {
    pub fn new(stream: impl Into<String>, id: u64) -> Self {
        Self {
            method: "SUBSCRIBE".to_string(),
            params: vec![stream.into()],
            id,
        }
    }

    /// Serialise into the JSON text frame sent over the socket.
    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
