// Types and enums for the image clicker
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Running,
    Completed,
    Stopped,
    Cancelled,
    Faulted,
}

/// How a run ended. Cancellation and stop are normal endings, not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// All passes done (or nothing to do).
    Completed,
    /// `stop()` was called on the clicker.
    Stopped,
    /// The shared cancellation token was set.
    Cancelled,
    /// Capture or input broke in a way retrying cannot fix.
    Faulted(String),
}

impl RunOutcome {
    pub fn state(&self) -> EngineState {
        match self {
            RunOutcome::Completed => EngineState::Completed,
            RunOutcome::Stopped => EngineState::Stopped,
            RunOutcome::Cancelled => EngineState::Cancelled,
            RunOutcome::Faulted(_) => EngineState::Faulted,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClickerEvent {
    StateChanged(EngineState),
    /// Percentage in [0, 100].
    Progress(f32),
    TemplateClicked {
        name: String,
        x: i32,
        y: i32,
        score: f32,
    },
    TemplateMissed {
        name: String,
        best_score: Option<f32>,
    },
    Finished(RunOutcome),
}

/// Summary handed back by the worker when a run ends.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub clicks: u32,
    pub misses: u32,
    pub loops_completed: u32,
}

/// Shared, externally settable stop signal (ESC hotkey, stop button,
/// shutdown). Long-running calls only ever read it.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Re-arm after a global stop so later runs can start.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Engine options. A run works on its own copy, so changing these never
/// affects a search that is already going.
#[derive(Debug, Clone, PartialEq)]
pub struct ClickerSettings {
    pub png_dir: std::path::PathBuf,
    pub click_interval: Duration,
    pub loop_times: u32,
    pub threshold: f32,
    pub wait_time: Duration,
    pub immediate_click: bool,
}

impl Default for ClickerSettings {
    fn default() -> Self {
        Self {
            png_dir: std::path::PathBuf::from("templates/png"),
            click_interval: Duration::from_millis(100),
            loop_times: 1,
            threshold: 0.8,
            wait_time: Duration::from_secs(5),
            immediate_click: false,
        }
    }
}
