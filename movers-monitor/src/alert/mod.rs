//! Threshold alerts on the short horizon ranking.
//!
//! ```text
//! Idle ──(unacknowledged row >= threshold)──▶ Showing { cycle, pending }
//!  ▲                                              │
//!  └───────────────(acknowledge(cycle))───────────┘
//! ```
//!
//! Every evaluation with pending rows starts a new cycle. Only the current cycle can be
//! acknowledged, so an acknowledgment aimed at an older alert list never clears symbols the
//! user has not seen.

use crate::{format, ranking::ShortRow, settings::Settings, store::BlobStore};
use std::sync::Arc;
use tracing::{debug, info};

/// Persisted set of acknowledged symbols.
pub mod ack;

/// Repeating audible cue.
pub mod cue;

/// OS notification surface.
pub mod notifier;

use ack::AcknowledgmentSet;
use cue::AlertCue;
use notifier::{ALERT_TAG, ALERT_TITLE, Notification, NotificationPermission, Notifier};

/// Whether the monitor surface is currently visible to the user.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default, derive_more::Display)]
pub enum Visibility {
    #[default]
    #[display("visible")]
    Visible,
    #[display("hidden")]
    Hidden,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum AlertState {
    #[default]
    Idle,
    Showing {
        cycle: u64,
        pending: Vec<ShortRow>,
    },
}

/// Alert transitions handed to the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum AlertEvent {
    /// Show (or replace) the alert list. Acknowledge with `cycle`.
    Showing {
        cycle: u64,
        threshold: f64,
        rows: Vec<ShortRow>,
    },
    Hidden {
        cycle: u64,
    },
}

pub struct AlertEngine {
    acks: AcknowledgmentSet,
    state: AlertState,
    cycle: u64,
    sound_enabled: bool,
    cue: Box<dyn AlertCue>,
    notifier: Box<dyn Notifier>,
}

impl std::fmt::Debug for AlertEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertEngine")
            .field("acks", &self.acks)
            .field("state", &self.state)
            .field("cycle", &self.cycle)
            .field("sound_enabled", &self.sound_enabled)
            .field("cue_running", &self.cue.is_running())
            .finish()
    }
}

impl AlertEngine {
    pub fn new(
        store: Arc<dyn BlobStore>,
        cue: Box<dyn AlertCue>,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        Self {
            acks: AcknowledgmentSet::load(store),
            state: AlertState::Idle,
            cycle: 0,
            sound_enabled: true,
            cue,
            notifier,
        }
    }

    pub fn state(&self) -> &AlertState {
        &self.state
    }

    /// Cycle id of the alert currently showing.
    pub fn active_cycle(&self) -> Option<u64> {
        match self.state {
            AlertState::Showing { cycle, .. } => Some(cycle),
            AlertState::Idle => None,
        }
    }

    pub fn is_acknowledged(&self, symbol: &str) -> bool {
        self.acks.contains(symbol)
    }

    pub fn cue_running(&self) -> bool {
        self.cue.is_running()
    }

    /// Evaluate the latest short ranking.
    ///
    /// Returns [`AlertEvent::Showing`] with every qualifying unacknowledged row if there is
    /// at least one. Otherwise the current state is left as it is.
    pub fn evaluate(
        &mut self,
        rows: &[ShortRow],
        settings: &Settings,
        visibility: Visibility,
    ) -> Option<AlertEvent> {
        if rows.is_empty() {
            return None;
        }

        let threshold = settings.threshold_ratio();
        if !threshold.is_finite() || threshold <= 0.0 {
            return None;
        }

        self.acks.prune(rows);

        let pending = rows
            .iter()
            .filter(|row| row.pct_change >= threshold && !self.acks.contains(&row.symbol))
            .cloned()
            .collect::<Vec<_>>();

        if pending.is_empty() {
            return None;
        }

        self.cycle += 1;
        let cycle = self.cycle;
        debug!(cycle, pending = pending.len(), "short term alert showing");

        self.state = AlertState::Showing {
            cycle,
            pending: pending.clone(),
        };
        self.start_cue();

        if visibility == Visibility::Hidden {
            self.notify(&pending);
        }

        Some(AlertEvent::Showing {
            cycle,
            threshold: settings.short_threshold,
            rows: pending,
        })
    }

    /// Acknowledge every symbol shown in `cycle`. Stale or unknown cycles are ignored.
    pub fn acknowledge(&mut self, cycle: u64) -> Option<AlertEvent> {
        if self.active_cycle() != Some(cycle) {
            debug!(cycle, active = ?self.active_cycle(), "ignoring stale acknowledgment");
            return None;
        }

        let AlertState::Showing { pending, .. } = std::mem::take(&mut self.state) else {
            return None;
        };

        info!(
            cycle,
            symbols = ?pending.iter().map(|row| row.symbol.as_str()).collect::<Vec<_>>(),
            "short term alert acknowledged"
        );
        self.acks.extend(pending.into_iter().map(|row| row.symbol));
        self.cue.stop();

        Some(AlertEvent::Hidden { cycle })
    }

    /// Disabling stops the cue immediately, enabling resumes it if an alert is showing.
    pub fn set_sound_enabled(&mut self, enabled: bool) {
        self.sound_enabled = enabled;
        if enabled {
            self.resume_cue_if_needed();
        } else {
            self.cue.stop();
        }
    }

    pub fn sound_enabled(&self) -> bool {
        self.sound_enabled
    }

    /// Restart the cue if an alert is showing, eg/ once the surface is visible again.
    pub fn resume_cue_if_needed(&mut self) {
        if matches!(self.state, AlertState::Showing { .. }) {
            self.start_cue();
        }
    }

    fn start_cue(&mut self) {
        if self.sound_enabled && !self.cue.is_running() {
            self.cue.start();
        }
    }

    fn notify(&mut self, pending: &[ShortRow]) {
        match self.notifier.permission() {
            NotificationPermission::Granted => {
                self.notifier.display(&alert_notification(pending));
            }
            NotificationPermission::Default => self.notifier.request_permission(),
            NotificationPermission::Denied => {}
        }
    }
}

/// One line per row, `SYMBOL: x.xx%`.
pub fn alert_notification(rows: &[ShortRow]) -> Notification {
    let body = rows
        .iter()
        .map(|row| format!("{}: {}", row.symbol, format::percent(row.pct_change)))
        .collect::<Vec<_>>()
        .join("\n");

    Notification {
        title: ALERT_TITLE.to_string(),
        body,
        tag: ALERT_TAG.to_string(),
        renotify: true,
    }
}
