//! Top-movers monitor for the Binance USDⓈ-M futures all-market mini ticker stream.
//!
//! Rankings and alerts are written as `tracing` events. Commands are read line by line
//! from stdin:
//!
//! ```text
//! ack               acknowledge the alert currently showing
//! sound on|off      toggle the alert cue
//! window 1|2|5      short ranking window in minutes
//! limit N           short ranking size, 1..=50
//! threshold X       alert threshold in percent, 0.1..=100
//! hide | show       simulate the monitor losing / regaining visibility
//! flush             persist history now
//! ```

use movers_data::{ConnectionStatus, FeedConnection};
use movers_monitor::{
    AlertEngine, AlertEvent, BlobStore, Command, FileBlobStore, MemoryBlobStore, Monitor,
    MonitorConfig, Presenter, RenderFrame, RollingHistoryStore, SettingsPatch, SystemClock,
    Visibility,
    alert::{cue::BellCue, notifier::LogNotifier},
    format,
    logging::init_logging,
};
use rustls::crypto::ring::default_provider;
use std::{error::Error, sync::Arc, time::Duration};
use tokio::{
    sync::{mpsc, watch},
    time::Instant,
};
use tracing::{info, warn};

/// Minimum interval between two logged ranking frames.
const PRESENT_INTERVAL: Duration = Duration::from_secs(1);

/// Rows of each ranking included in a logged frame.
const PRESENT_ROWS: usize = 5;

const COMMAND_BUFFER: usize = 64;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_logging();
    let _ = default_provider().install_default();

    let config = MonitorConfig::from_env();
    info!(?config, "starting movers monitor");

    let store: Arc<dyn BlobStore> = match FileBlobStore::open(&config.state_dir) {
        Ok(store) => Arc::new(store),
        Err(error) => {
            warn!(%error, dir = %config.state_dir.display(), "state dir unusable, state will not survive restarts");
            Arc::new(MemoryBlobStore::new())
        }
    };

    let clock = Arc::new(SystemClock);
    let history = RollingHistoryStore::new(clock.clone(), store.clone())
        .with_retention_minutes(config.history_minutes)
        .with_save_debounce(config.save_debounce);
    let alerts = AlertEngine::new(
        store.clone(),
        Box::new(BellCue::default()),
        Box::new(LogNotifier::default()),
    );

    let (cycle_tx, cycle_rx) = watch::channel(None);
    let mut monitor = Monitor::new(clock, store, history, alerts, LogPresenter::new(cycle_tx));
    monitor.init();

    let FeedConnection {
        batches,
        status,
        task: feed_task,
    } = FeedConnection::spawn(config.feed.clone())?;
    tokio::spawn(log_connection_status(status));

    let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
    {
        let command_tx = command_tx.clone();
        std::thread::spawn(move || read_commands(command_tx, cycle_rx));
    }
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received");
            let _ = command_tx.send(Command::Shutdown).await;
        }
    });

    let monitor = monitor.run(batches, command_rx).await;
    feed_task.abort();
    info!(symbols = monitor.book().len(), "movers monitor stopped");

    Ok(())
}

async fn log_connection_status(mut status: watch::Receiver<ConnectionStatus>) {
    while status.changed().await.is_ok() {
        let current = *status.borrow_and_update();
        info!(status = %current, "feed connection");
    }
}

/// Blocking stdin reader, run on a dedicated thread so it never holds up runtime shutdown.
fn read_commands(commands: mpsc::Sender<Command>, active_cycle: watch::Receiver<Option<u64>>) {
    for line in std::io::stdin().lines() {
        let line = match line {
            Ok(line) => line,
            Err(error) => {
                warn!(%error, "failed to read stdin, commands disabled");
                break;
            }
        };

        match parse_command(&line, *active_cycle.borrow()) {
            Ok(Some(command)) => {
                if commands.blocking_send(command).is_err() {
                    break;
                }
            }
            Ok(None) => {}
            Err(reason) => warn!(input = %line.trim(), %reason, "invalid command"),
        }
    }
}

/// Parse one stdin line. `ack` targets the alert cycle currently showing.
fn parse_command(line: &str, active_cycle: Option<u64>) -> Result<Option<Command>, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let argument = words.next();

    let command = match (verb.to_ascii_lowercase().as_str(), argument) {
        ("ack", _) => match active_cycle {
            Some(cycle) => Command::Acknowledge { cycle },
            None => return Err("no alert is showing".to_string()),
        },
        ("sound", Some("on")) => Command::UpdateSettings(SettingsPatch::sound(true)),
        ("sound", Some("off")) => Command::UpdateSettings(SettingsPatch::sound(false)),
        ("window", Some(minutes)) => Command::UpdateSettings(SettingsPatch::window(
            minutes.parse().map_err(|_| format!("invalid window: {minutes}"))?,
        )),
        ("limit", Some(limit)) => Command::UpdateSettings(SettingsPatch::limit(
            limit.parse().map_err(|_| format!("invalid limit: {limit}"))?,
        )),
        ("threshold", Some(threshold)) => Command::UpdateSettings(SettingsPatch::threshold(
            threshold
                .parse()
                .map_err(|_| format!("invalid threshold: {threshold}"))?,
        )),
        ("hide", _) => Command::VisibilityChanged(Visibility::Hidden),
        ("show", _) => Command::VisibilityChanged(Visibility::Visible),
        ("flush", _) => Command::Flush,
        _ => return Err("unknown command".to_string()),
    };

    Ok(Some(command))
}

/// Logs ranking frames at most once per [`PRESENT_INTERVAL`] and every alert event.
#[derive(Debug)]
struct LogPresenter {
    last_presented: Option<Instant>,
    active_cycle: watch::Sender<Option<u64>>,
}

impl LogPresenter {
    fn new(active_cycle: watch::Sender<Option<u64>>) -> Self {
        Self {
            last_presented: None,
            active_cycle,
        }
    }

    fn should_present(&mut self) -> bool {
        let now = Instant::now();
        match self.last_presented {
            Some(last) if now.duration_since(last) < PRESENT_INTERVAL => false,
            _ => {
                self.last_presented = Some(now);
                true
            }
        }
    }
}

impl Presenter for LogPresenter {
    fn present(&mut self, frame: &RenderFrame) {
        if !self.should_present() {
            return;
        }

        let long = frame
            .long_rows
            .iter()
            .take(PRESENT_ROWS)
            .map(|row| {
                format!(
                    "{} {} {} vol {}",
                    row.symbol,
                    format::price(row.last_price),
                    format::percent(row.pct_change),
                    row.volume_quote.map_or_else(|| "-".to_string(), format::volume),
                )
            })
            .collect::<Vec<_>>();

        let short = frame
            .short_rows
            .iter()
            .take(PRESENT_ROWS)
            .map(|row| {
                format!(
                    "{} {} vs {} ({}m ago) {}",
                    row.symbol,
                    format::price(row.last_price),
                    format::price(row.reference_price),
                    row.history_age_minutes,
                    format::percent(row.pct_change),
                )
            })
            .collect::<Vec<_>>();

        info!(
            symbols = frame.long_rows.len(),
            window = %frame.settings.short_window,
            ?long,
            ?short,
            "movers"
        );
    }

    fn alert(&mut self, event: &AlertEvent) {
        match event {
            AlertEvent::Showing {
                cycle,
                threshold,
                rows,
            } => {
                self.active_cycle.send_replace(Some(*cycle));
                let symbols = rows
                    .iter()
                    .map(|row| format!("{} {}", row.symbol, format::signed_percent(row.pct_change)))
                    .collect::<Vec<_>>();
                warn!(cycle, threshold, ?symbols, "short term gain alert, type `ack` to acknowledge");
            }
            AlertEvent::Hidden { cycle } => {
                self.active_cycle.send_replace(None);
                info!(cycle, "short term alert cleared");
            }
        }
    }
}
