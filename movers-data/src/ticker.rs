use crate::error::DecodeError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use smol_str::SmolStr;
use tracing::trace;

/// Exchange symbol, eg/ "BTCUSDT".
pub type Symbol = SmolStr;

/// Normalised mini ticker update for one symbol.
///
/// Only constructed from a [`BinanceMiniTicker`] that passed validation: the symbol is
/// non-empty, both prices are finite and the open price is non-zero.
#[derive(Clone, PartialEq, PartialOrd, Debug, Deserialize, Serialize)]
pub struct MiniTicker {
    pub symbol: Symbol,
    /// Last traded price.
    pub last_price: f64,
    /// Daily reference (open) price of the rolling 24h window.
    pub open_price: f64,
    /// Total traded base asset volume.
    pub volume_base: Option<f64>,
    /// Total traded quote asset volume.
    pub volume_quote: Option<f64>,
    /// Exchange event time in epoch milliseconds.
    pub event_time: Option<i64>,
}

impl MiniTicker {
    /// Percentage change of the last price relative to the open price, as a ratio.
    pub fn pct_change(&self) -> f64 {
        (self.last_price - self.open_price) / self.open_price
    }
}

/// Reason a [`BinanceMiniTicker`] item is skipped.
#[derive(Debug, Copy, Clone, Eq, PartialEq, derive_more::Display)]
pub enum TickerRejection {
    #[display("missing symbol")]
    MissingSymbol,
    #[display("non-finite last price")]
    NonFiniteLastPrice,
    #[display("non-finite open price")]
    NonFiniteOpenPrice,
    #[display("zero open price")]
    ZeroOpenPrice,
}

/// Raw item of the Binance all-market mini ticker stream.
///
/// Numeric fields are delivered as JSON strings but numbers are accepted too. Fields that
/// are missing or cannot be interpreted as a finite number deserialise as `None` so that a
/// single bad field never fails the surrounding batch.
///
/// ### Raw Payload Examples
/// See docs: <https://developers.binance.com/docs/derivatives/usds-margined-futures/websocket-market-streams/All-Market-Mini-Tickers-Stream>
///```json
/// {
///     "e": "24hrMiniTicker",
///     "E": 123456789,
///     "s": "BTCUSDT",
///     "c": "0.0025",
///     "o": "0.0010",
///     "h": "0.0025",
///     "l": "0.0010",
///     "v": "10000",
///     "q": "18"
/// }
/// ```
#[derive(Clone, PartialEq, PartialOrd, Debug, Default, Deserialize)]
pub struct BinanceMiniTicker {
    #[serde(rename = "s", default)]
    pub symbol: Option<String>,

    #[serde(rename = "c", default, deserialize_with = "de_lenient_f64")]
    pub last_price: Option<f64>,

    #[serde(rename = "o", default, deserialize_with = "de_lenient_f64")]
    pub open_price: Option<f64>,

    #[serde(rename = "v", default, deserialize_with = "de_lenient_f64")]
    pub volume_base: Option<f64>,

    #[serde(rename = "q", default, deserialize_with = "de_lenient_f64")]
    pub volume_quote: Option<f64>,

    #[serde(rename = "E", default, deserialize_with = "de_lenient_f64")]
    pub event_time: Option<f64>,
}

impl TryFrom<BinanceMiniTicker> for MiniTicker {
    type Error = TickerRejection;

    fn try_from(raw: BinanceMiniTicker) -> Result<Self, Self::Error> {
        let symbol = raw
            .symbol
            .filter(|symbol| !symbol.is_empty())
            .ok_or(TickerRejection::MissingSymbol)?;
        let last_price = raw.last_price.ok_or(TickerRejection::NonFiniteLastPrice)?;
        let open_price = raw.open_price.ok_or(TickerRejection::NonFiniteOpenPrice)?;
        if open_price == 0.0 {
            return Err(TickerRejection::ZeroOpenPrice);
        }

        Ok(Self {
            symbol: Symbol::from(symbol),
            last_price,
            open_price,
            volume_base: raw.volume_base,
            volume_quote: raw.volume_quote,
            event_time: raw.event_time.map(|time| time as i64),
        })
    }
}

/// Valid tickers decoded from one stream message, in delivery order.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct TickerBatch {
    pub tickers: Vec<MiniTicker>,
    /// Number of items dropped by validation.
    pub skipped: usize,
}

impl TickerBatch {
    pub fn len(&self) -> usize {
        self.tickers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }
}

/// Combined stream envelope, `{"stream": "<name>", "data": <payload>}`.
#[derive(Debug, Deserialize)]
struct StreamEnvelope {
    #[serde(default)]
    stream: Option<String>,
    #[serde(default)]
    data: Value,
}

/// Decode one text frame into a [`TickerBatch`].
///
/// The frame is rejected as a whole if it is not JSON, belongs to another stream (eg/ the
/// subscription response) or carries a non-array payload. Inside an accepted frame invalid
/// items are skipped one by one.
pub fn decode_batch(text: &str, expected_stream: &str) -> Result<TickerBatch, DecodeError> {
    let envelope = serde_json::from_str::<StreamEnvelope>(text)?;

    if envelope.stream.as_deref() != Some(expected_stream) {
        return Err(DecodeError::UnexpectedStream {
            expected: expected_stream.to_string(),
            actual: envelope.stream,
        });
    }

    let Value::Array(items) = envelope.data else {
        return Err(DecodeError::PayloadNotArray {
            stream: expected_stream.to_string(),
        });
    };

    let mut batch = TickerBatch {
        tickers: Vec::with_capacity(items.len()),
        skipped: 0,
    };

    for item in items {
        let ticker = serde_json::from_value::<BinanceMiniTicker>(item)
            .map_err(|error| {
                trace!(%error, "mini ticker item is not an object");
                TickerRejection::MissingSymbol
            })
            .and_then(MiniTicker::try_from);

        match ticker {
            Ok(ticker) => batch.tickers.push(ticker),
            Err(reason) => {
                trace!(%reason, "skipping mini ticker item");
                batch.skipped += 1;
            }
        }
    }

    Ok(batch)
}

/// Deserialize a JSON number or numeric string as a finite `f64`, anything else as `None`.
fn de_lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let parsed = match value {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(raw)) => raw.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(parsed.filter(|value| value.is_finite()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscription::STREAM_ALL_MINI_TICKERS;

    mod de {
        use super::*;

        #[test]
        fn test_binance_mini_ticker() {
            struct TestCase {
                input: &'static str,
                expected: Result<MiniTicker, TickerRejection>,
            }

            let tests = vec![
                // TC0: string encoded fields
                TestCase {
                    input: r#"{"e":"24hrMiniTicker","E":1700000000000,"s":"BTCUSDT","c":"61000","o":"60000","h":"61500","l":"59000","v":"100","q":"6000000"}"#,
                    expected: Ok(MiniTicker {
                        symbol: Symbol::new("BTCUSDT"),
                        last_price: 61000.0,
                        open_price: 60000.0,
                        volume_base: Some(100.0),
                        volume_quote: Some(6000000.0),
                        event_time: Some(1700000000000),
                    }),
                },
                // TC1: number encoded fields, missing volumes and event time
                TestCase {
                    input: r#"{"s":"ETHUSDT","c":3100.5,"o":3000}"#,
                    expected: Ok(MiniTicker {
                        symbol: Symbol::new("ETHUSDT"),
                        last_price: 3100.5,
                        open_price: 3000.0,
                        volume_base: None,
                        volume_quote: None,
                        event_time: None,
                    }),
                },
                // TC2: zero open price would produce an undefined percentage
                TestCase {
                    input: r#"{"s":"BTCUSDT","c":"61000","o":"0"}"#,
                    expected: Err(TickerRejection::ZeroOpenPrice),
                },
                // TC3: empty symbol
                TestCase {
                    input: r#"{"s":"","c":"1","o":"1"}"#,
                    expected: Err(TickerRejection::MissingSymbol),
                },
                // TC4: unparseable last price
                TestCase {
                    input: r#"{"s":"SOLUSDT","c":"abc","o":"1"}"#,
                    expected: Err(TickerRejection::NonFiniteLastPrice),
                },
                // TC5: missing open price
                TestCase {
                    input: r#"{"s":"SOLUSDT","c":"1"}"#,
                    expected: Err(TickerRejection::NonFiniteOpenPrice),
                },
            ];

            for (index, test) in tests.into_iter().enumerate() {
                let raw = serde_json::from_str::<BinanceMiniTicker>(test.input).unwrap();
                let actual = MiniTicker::try_from(raw);
                assert_eq!(actual, test.expected, "TC{} failed", index);
            }
        }
    }

    #[test]
    fn test_decode_batch_skips_invalid_items_only() {
        let text = r#"{
            "stream": "!miniTicker@arr",
            "data": [
                {"s":"BTCUSDT","c":"61000","o":"60000","v":"100","q":"6000000","E":1700000000000},
                {"s":"BADUSDT","c":"1","o":"0"},
                42,
                {"s":"ETHUSDT","c":"3300","o":"3000"}
            ]
        }"#;

        let batch = decode_batch(text, STREAM_ALL_MINI_TICKERS).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.skipped, 2);
        assert_eq!(batch.tickers[0].symbol, "BTCUSDT");
        assert_eq!(batch.tickers[1].symbol, "ETHUSDT");
        assert!((batch.tickers[0].pct_change() - 1.0 / 60.0).abs() < 1e-12);
    }

    #[test]
    fn test_decode_batch_rejects_frames() {
        struct TestCase {
            input: &'static str,
            expected: DecodeError,
        }

        let tests = vec![
            TestCase {
                // TC0: subscription response carries no stream
                input: r#"{"result":null,"id":1}"#,
                expected: DecodeError::UnexpectedStream {
                    expected: STREAM_ALL_MINI_TICKERS.to_string(),
                    actual: None,
                },
            },
            TestCase {
                // TC1: other stream
                input: r#"{"stream":"btcusdt@aggTrade","data":[]}"#,
                expected: DecodeError::UnexpectedStream {
                    expected: STREAM_ALL_MINI_TICKERS.to_string(),
                    actual: Some("btcusdt@aggTrade".to_string()),
                },
            },
            TestCase {
                // TC2: object payload
                input: r#"{"stream":"!miniTicker@arr","data":{"s":"BTCUSDT"}}"#,
                expected: DecodeError::PayloadNotArray {
                    stream: STREAM_ALL_MINI_TICKERS.to_string(),
                },
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = decode_batch(test.input, STREAM_ALL_MINI_TICKERS).unwrap_err();
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_decode_batch_invalid_json() {
        let actual = decode_batch("not json", STREAM_ALL_MINI_TICKERS);
        assert!(matches!(actual, Err(DecodeError::InvalidJson(_))));
    }
}
