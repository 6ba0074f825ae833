use crate::{
    backoff::{
        DEFAULT_BACKOFF_CAP, DEFAULT_BACKOFF_FLOOR, DEFAULT_BACKOFF_MULTIPLIER, ReconnectBackoff,
    },
    error::{DecodeError, FeedError},
    streams::timeout::{DEFAULT_WS_READ_TIMEOUT, TimeoutStream},
    subscription::{STREAM_ALL_MINI_TICKERS, SubscribeRequest},
    ticker::{TickerBatch, decode_batch},
};
use futures::{Sink, SinkExt, Stream, StreamExt};
use std::time::Duration;
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Error as WsError, Message},
};
use tracing::{debug, info, trace, warn};
use url::Url;

/// Default Binance USDⓈ-M futures combined stream endpoint.
pub const DEFAULT_FEED_URL: &str = "wss://fstream.binance.com/stream";

/// [`FeedConnection`] configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedConfig {
    /// WebSocket endpoint.
    pub url: String,
    /// Stream name subscribed to and expected on every data frame.
    pub stream: String,
    /// `id` of the subscription request.
    pub subscription_id: u64,
    pub backoff_floor: Duration,
    pub backoff_cap: Duration,
    pub backoff_multiplier: f64,
    /// Connection is considered dead if no frame arrives within this period.
    pub read_timeout: Duration,
    /// Capacity of the batch channel, the reader waits for the consumer once it is full.
    pub channel_buffer_size: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_FEED_URL.to_string(),
            stream: STREAM_ALL_MINI_TICKERS.to_string(),
            subscription_id: 1,
            backoff_floor: DEFAULT_BACKOFF_FLOOR,
            backoff_cap: DEFAULT_BACKOFF_CAP,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            read_timeout: DEFAULT_WS_READ_TIMEOUT,
            channel_buffer_size: 1024,
        }
    }
}

impl FeedConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_stream(mut self, stream: impl Into<String>) -> Self {
        self.stream = stream.into();
        self
    }

    pub fn with_subscription_id(mut self, id: u64) -> Self {
        self.subscription_id = id;
        self
    }

    pub fn with_backoff(mut self, floor: Duration, cap: Duration) -> Self {
        self.backoff_floor = floor;
        self.backoff_cap = cap;
        self
    }

    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_channel_buffer_size(mut self, size: usize) -> Self {
        self.channel_buffer_size = size;
        self
    }

    fn backoff(&self) -> ReconnectBackoff {
        ReconnectBackoff::new(self.backoff_floor, self.backoff_cap)
            .with_multiplier(self.backoff_multiplier)
    }
}

/// Lifecycle of the feed socket. There is no terminal failure state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum ConnectionStatus {
    #[display("connecting")]
    Connecting,
    #[display("open")]
    Open,
    #[display("closed, retrying in {retry_in:?}")]
    Closed { retry_in: Duration },
}

/// Handle to a spawned feed task.
///
/// Decoded [`TickerBatch`]es arrive on `batches` in delivery order. Dropping `batches`
/// stops the task at its next dispatch or reconnect.
#[derive(Debug)]
pub struct FeedConnection {
    pub batches: mpsc::Receiver<TickerBatch>,
    pub status: watch::Receiver<ConnectionStatus>,
    pub task: JoinHandle<()>,
}

impl FeedConnection {
    /// Validate the [`FeedConfig`] and spawn the connect / read / reconnect loop.
    pub fn spawn(config: FeedConfig) -> Result<Self, FeedError> {
        let url = Url::parse(&config.url)?;
        let (batch_tx, batch_rx) = mpsc::channel(config.channel_buffer_size.max(1));
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::Connecting);

        let task = tokio::spawn(run_feed_loop(config, url, batch_tx, status_tx));

        Ok(Self {
            batches: batch_rx,
            status: status_rx,
            task,
        })
    }
}

/// Why a single connection session ended.
#[derive(Debug)]
enum SessionEnd {
    ConsumerDropped,
    Disconnected(FeedError),
}

/// Sequential reconnect loop. Only one session or one retry sleep is ever in flight.
async fn run_feed_loop(
    config: FeedConfig,
    url: Url,
    batch_tx: mpsc::Sender<TickerBatch>,
    status_tx: watch::Sender<ConnectionStatus>,
) {
    info!(%url, stream = %config.stream, "starting feed connection");
    let mut backoff = config.backoff();

    loop {
        if batch_tx.is_closed() {
            break;
        }

        status_tx.send_replace(ConnectionStatus::Connecting);

        match run_session(&config, &url, &batch_tx, &status_tx, &mut backoff).await {
            SessionEnd::ConsumerDropped => break,
            SessionEnd::Disconnected(error) if error.is_disconnect() => {
                warn!(%error, "feed connection lost")
            }
            SessionEnd::Disconnected(error) => warn!(%error, "feed connection failed"),
        }

        let delay = backoff.advance();
        status_tx.send_replace(ConnectionStatus::Closed { retry_in: delay });
        debug!(?delay, "waiting before reconnecting");
        tokio::time::sleep(delay).await;
    }

    info!("batch consumer dropped, stopping feed connection");
}

async fn run_session(
    config: &FeedConfig,
    url: &Url,
    batch_tx: &mpsc::Sender<TickerBatch>,
    status_tx: &watch::Sender<ConnectionStatus>,
    backoff: &mut ReconnectBackoff,
) -> SessionEnd {
    let socket = match connect_async(url.as_str()).await {
        Ok((socket, _response)) => socket,
        Err(error) => {
            return SessionEnd::Disconnected(FeedError::Connect {
                url: url.to_string(),
                reason: error.to_string(),
            });
        }
    };

    info!(%url, "feed connection open");
    backoff.reset();
    status_tx.send_replace(ConnectionStatus::Open);

    let (mut write, read) = socket.split();

    let end = match subscribe(&mut write, config).await {
        Ok(()) => read_frames(read, config, batch_tx).await,
        Err(error) => SessionEnd::Disconnected(error),
    };

    // The socket may already be gone, closing twice is harmless.
    if let Err(error) = write.close().await {
        trace!(%error, "feed sink already closed");
    }

    end
}

async fn subscribe<S>(write: &mut S, config: &FeedConfig) -> Result<(), FeedError>
where
    S: Sink<Message, Error = WsError> + Unpin,
{
    let text = SubscribeRequest::new(&config.stream, config.subscription_id)
        .to_text()
        .map_err(|error| FeedError::Subscribe(error.to_string()))?;

    debug!(payload = %text, "sending subscription request");
    write
        .send(Message::text(text))
        .await
        .map_err(|error| FeedError::Subscribe(error.to_string()))
}

async fn read_frames<S>(
    read: S,
    config: &FeedConfig,
    batch_tx: &mpsc::Sender<TickerBatch>,
) -> SessionEnd
where
    S: Stream<Item = Result<Message, WsError>> + Unpin,
{
    let mut frames = TimeoutStream::new(read, config.read_timeout);

    while let Some(frame) = frames.next().await {
        match frame {
            Ok(Message::Text(text)) => match decode_batch(text.as_str(), &config.stream) {
                Ok(batch) => {
                    if batch.skipped > 0 {
                        debug!(
                            valid = batch.len(),
                            skipped = batch.skipped,
                            "dropped invalid mini ticker items"
                        );
                    }
                    if batch_tx.send(batch).await.is_err() {
                        return SessionEnd::ConsumerDropped;
                    }
                }
                Err(DecodeError::UnexpectedStream { actual: None, .. }) => {
                    debug!(payload = %text.as_str(), "ignoring control frame")
                }
                Err(error) => warn!(%error, "dropping undecodable feed frame"),
            },
            Ok(Message::Close(frame)) => {
                return SessionEnd::Disconnected(FeedError::Socket(format!(
                    "closed by upstream: {frame:?}"
                )));
            }
            Ok(other) => trace!(?other, "ignoring non-text frame"),
            Err(error) => return SessionEnd::Disconnected(FeedError::from(error)),
        }
    }

    if frames.timed_out() {
        SessionEnd::Disconnected(FeedError::ReadTimeout {
            secs: frames.timeout_duration().as_secs(),
        })
    } else {
        SessionEnd::Disconnected(FeedError::Socket("stream ended".to_string()))
    }
}
