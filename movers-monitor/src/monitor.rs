//! Single owner of all monitor state.
//!
//! The [`Monitor`] applies feed batches, re-ranks, evaluates alerts and hands the results
//! to a [`Presenter`]. Its [`run`](Monitor::run) loop is the only place that mutates state:
//! feed batches, user [`Command`]s and the history save deadline are processed one at a time
//! in arrival order.

use crate::{
    alert::{AlertEngine, AlertEvent, Visibility},
    book::TickerBook,
    clock::Clock,
    history::RollingHistoryStore,
    ranking::{LongRow, ShortRow, compute_long, compute_short},
    settings::{Settings, SettingsPatch},
    store::BlobStore,
};
use movers_data::TickerBatch;
use std::{ops::ControlFlow, sync::Arc};
use tokio::{sync::mpsc, time::Instant};
use tracing::{debug, info, warn};

/// Rankings of one render cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderFrame {
    pub long_rows: Vec<LongRow>,
    pub short_rows: Vec<ShortRow>,
    pub settings: Settings,
}

/// Presentation layer, eg/ a table renderer. Receives read-only results only.
pub trait Presenter: Send {
    fn present(&mut self, frame: &RenderFrame);

    fn alert(&mut self, event: &AlertEvent);
}

/// User interaction events.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Acknowledge { cycle: u64 },
    UpdateSettings(SettingsPatch),
    VisibilityChanged(Visibility),
    Flush,
    Shutdown,
}

pub struct Monitor<P> {
    clock: Arc<dyn Clock>,
    store: Arc<dyn BlobStore>,
    book: TickerBook,
    history: RollingHistoryStore,
    alerts: AlertEngine,
    settings: Settings,
    visibility: Visibility,
    presenter: P,
}

impl<P> std::fmt::Debug for Monitor<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("symbols", &self.book.len())
            .field("history", &self.history)
            .field("alerts", &self.alerts)
            .field("settings", &self.settings)
            .field("visibility", &self.visibility)
            .finish()
    }
}

impl<P> Monitor<P>
where
    P: Presenter,
{
    pub fn new(
        clock: Arc<dyn Clock>,
        store: Arc<dyn BlobStore>,
        history: RollingHistoryStore,
        alerts: AlertEngine,
        presenter: P,
    ) -> Self {
        Self {
            clock,
            store,
            book: TickerBook::new(),
            history,
            alerts,
            settings: Settings::default(),
            visibility: Visibility::Visible,
            presenter,
        }
    }

    /// Restore persisted history and settings, then render the initial (empty) frame.
    pub fn init(&mut self) {
        let restored = self.history.hydrate();
        self.settings = Settings::load(self.store.as_ref());
        self.alerts.set_sound_enabled(self.settings.short_sound);
        info!(restored, settings = ?self.settings, "monitor initialised");
        self.render();
    }

    /// Apply every ticker of the batch, then re-rank once.
    ///
    /// Tickers without an event time are recorded at the current wall clock time.
    pub fn on_batch(&mut self, batch: &TickerBatch) {
        for ticker in &batch.tickers {
            self.book.apply(ticker);
            let event_time = ticker.event_time.unwrap_or_else(|| self.clock.now_ms());
            self.history
                .record(&ticker.symbol, ticker.last_price, event_time);
        }
        self.render();
    }

    /// Compute both rankings, present them and evaluate alerts on the short ranking.
    pub fn render(&mut self) {
        let frame = RenderFrame {
            long_rows: compute_long(&self.book),
            short_rows: compute_short(
                &self.book,
                &mut self.history,
                self.settings.short_window,
                self.settings.short_limit,
            ),
            settings: self.settings,
        };
        self.presenter.present(&frame);

        if let Some(event) =
            self.alerts
                .evaluate(&frame.short_rows, &self.settings, self.visibility)
        {
            self.presenter.alert(&event);
        }
    }

    /// Process one [`Command`]. Returns [`ControlFlow::Break`] on shutdown.
    pub fn handle_command(&mut self, command: Command) -> ControlFlow<()> {
        debug!(?command, "handling command");
        match command {
            Command::Acknowledge { cycle } => {
                if let Some(event) = self.alerts.acknowledge(cycle) {
                    self.presenter.alert(&event);
                }
            }
            Command::UpdateSettings(patch) => {
                self.settings = self.settings.patched(&patch);
                if let Err(error) = self.settings.save(self.store.as_ref()) {
                    warn!(%error, "failed to persist settings");
                }
                self.alerts.set_sound_enabled(self.settings.short_sound);
                self.render();
            }
            Command::VisibilityChanged(visibility) => {
                self.visibility = visibility;
                match visibility {
                    Visibility::Hidden => self.history.flush(),
                    Visibility::Visible => self.alerts.resume_cue_if_needed(),
                }
            }
            Command::Flush => self.history.flush(),
            Command::Shutdown => {
                self.history.flush();
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    /// Drive the monitor until shutdown or until the feed ends. History is flushed on exit.
    ///
    /// Returns the monitor so its final state can be inspected.
    pub async fn run(
        mut self,
        mut batches: mpsc::Receiver<TickerBatch>,
        mut commands: mpsc::Receiver<Command>,
    ) -> Self {
        let mut commands_open = true;

        loop {
            let save_deadline = self.history.save_deadline();

            tokio::select! {
                batch = batches.recv() => match batch {
                    Some(batch) => self.on_batch(&batch),
                    None => {
                        info!("feed batches closed, stopping monitor");
                        self.history.flush();
                        break;
                    }
                },
                command = commands.recv(), if commands_open => match command {
                    Some(command) => {
                        if self.handle_command(command).is_break() {
                            info!("monitor shutdown requested");
                            break;
                        }
                    }
                    None => commands_open = false,
                },
                _ = tokio::time::sleep_until(save_deadline.unwrap_or_else(Instant::now)),
                    if save_deadline.is_some() =>
                {
                    self.history.run_scheduled_save();
                }
            }
        }

        self
    }

    pub fn book(&self) -> &TickerBook {
        &self.book
    }

    pub fn history(&self) -> &RollingHistoryStore {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut RollingHistoryStore {
        &mut self.history
    }

    pub fn alerts(&self) -> &AlertEngine {
        &self.alerts
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }
}
