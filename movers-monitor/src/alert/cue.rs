use std::time::Duration;
use tokio::{io::AsyncWriteExt, runtime::Handle, task::JoinHandle};
use tracing::{debug, warn};

/// Interval of the repeating alert cue.
pub const CUE_INTERVAL: Duration = Duration::from_millis(800);

/// Repeating audible cue played while an alert is showing.
pub trait AlertCue: Send {
    /// Start repeating. Starting a running cue has no effect.
    fn start(&mut self);

    /// Stop repeating. Stopping a stopped cue has no effect.
    fn stop(&mut self);

    fn is_running(&self) -> bool;
}

/// Rings the terminal bell on stderr every [`CUE_INTERVAL`] from a tokio task.
#[derive(Debug)]
pub struct BellCue {
    interval: Duration,
    task: Option<JoinHandle<()>>,
}

impl Default for BellCue {
    fn default() -> Self {
        Self::new(CUE_INTERVAL)
    }
}

impl BellCue {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            task: None,
        }
    }
}

impl AlertCue for BellCue {
    fn start(&mut self) {
        if self.is_running() {
            return;
        }

        let Ok(runtime) = Handle::try_current() else {
            warn!("no tokio runtime available, alert cue disabled");
            return;
        };

        let interval = self.interval;
        self.task = Some(runtime.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            let mut stderr = tokio::io::stderr();
            loop {
                ticker.tick().await;
                let rung = stderr.write_all(b"\x07").await;
                if let Err(error) = rung.and(stderr.flush().await) {
                    warn!(%error, "failed to play alert cue");
                    break;
                }
            }
        }));
        debug!("alert cue started");
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("alert cue stopped");
        }
    }

    fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for BellCue {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Cue without any output that only tracks whether it would be playing.
#[derive(Debug, Default)]
pub struct SilentCue {
    running: bool,
    starts: usize,
}

impl SilentCue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times the cue was started from stopped.
    pub fn starts(&self) -> usize {
        self.starts
    }
}

impl AlertCue for SilentCue {
    fn start(&mut self) {
        if !self.running {
            self.running = true;
            self.starts += 1;
        }
    }

    fn stop(&mut self) {
        self.running = false;
    }

    fn is_running(&self) -> bool {
        self.running
    }
}
