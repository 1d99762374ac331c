// Controller module
// Owns the engine, the recorder and their worker tasks, and turns host
// actions (buttons, hotkeys, shutdown) into starts and bounded stops.

pub mod backends;
pub mod error;

#[cfg(test)]
mod tests;

pub use backends::{Backends, DriverFactory, ScreenFactory};
pub use error::ControllerError;

use crate::clicker::channels::publish;
use crate::clicker::match_image::scan_png_files;
use crate::clicker::{
    CancelToken, CaptureError, ClickerEvent, ImageClicker, MatchResult, RunOutcome, RunReport,
    create_event_channel,
};
use crate::config::Settings;
use crate::input::HookEvent;
use crate::recorder::ClickRecorder;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{Duration, timeout};

/// Bound on waiting for the image worker after an explicit stop.
pub const STOP_TIMEOUT: Duration = Duration::from_secs(3);
/// Bound on each worker join during a global stop.
pub const GLOBAL_STOP_TIMEOUT: Duration = Duration::from_secs(2);
/// Bound on each worker join while shutting down.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

pub struct Controller {
    settings: Settings,
    config_path: PathBuf,
    clicker: ImageClicker,
    recorder: ClickRecorder,
    cancel: CancelToken,
    backends: Backends,
    image_task: Option<JoinHandle<RunReport>>,
    replay_task: Option<JoinHandle<RunOutcome>>,
    event_tx: mpsc::Sender<ClickerEvent>,
    event_rx: Option<mpsc::Receiver<ClickerEvent>>,
}

impl Controller {
    pub fn new(settings: Settings, config_path: impl Into<PathBuf>, backends: Backends) -> Self {
        let (event_tx, event_rx) = create_event_channel();
        let mut clicker = ImageClicker::new(settings.clicker_settings());
        clicker.set_event_sender(event_tx.clone());
        let recorder = ClickRecorder::new(
            settings.loop_times,
            settings.clicker_settings().click_interval,
            settings.discard_stop_click,
        );

        Self {
            settings,
            config_path: config_path.into(),
            clicker,
            recorder,
            cancel: CancelToken::new(),
            backends,
            image_task: None,
            replay_task: None,
            event_tx,
            event_rx: Some(event_rx),
        }
    }

    /// Hand the engine event stream to the host. Only the first call gets it.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<ClickerEvent>> {
        self.event_rx.take()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn clicker(&self) -> &ImageClicker {
        &self.clicker
    }

    pub fn recorder(&self) -> &ClickRecorder {
        &self.recorder
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn is_image_clicking(&self) -> bool {
        self.image_task.as_ref().is_some_and(|task| !task.is_finished())
    }

    pub fn is_playing(&self) -> bool {
        self.replay_task.as_ref().is_some_and(|task| !task.is_finished())
    }

    fn ensure_pointer_free(&self) -> Result<(), ControllerError> {
        if self.is_image_clicking() || self.clicker.is_running() {
            log::warn!("⚠️ Image clicker is already running");
            return Err(ControllerError::Busy {
                task: "image clicking",
            });
        }
        if self.is_playing() || self.recorder.is_playing() {
            log::warn!("⚠️ Playback is already running");
            return Err(ControllerError::Busy { task: "playback" });
        }
        Ok(())
    }

    // ============================================================
    // IMAGE CLICKING
    // ============================================================

    /// Spawn an image click run on the current tokio runtime.
    pub fn start_image_click(&mut self) -> Result<(), ControllerError> {
        self.ensure_pointer_free()?;

        let png_dir = &self.clicker.settings().png_dir;
        if !png_dir.is_dir() {
            log::warn!("⚠️ Template directory {} not found", png_dir.display());
        } else {
            match scan_png_files(png_dir) {
                Ok(files) if files.is_empty() => {
                    log::warn!("⚠️ No PNG templates in {}", png_dir.display())
                }
                Ok(_) => {}
                Err(e) => log::warn!(
                    "⚠️ Template directory {} is not readable: {}",
                    png_dir.display(),
                    e
                ),
            }
        }

        let run = self
            .clicker
            .start(self.backends.screen(), self.backends.driver(), self.cancel.clone())
            .map_err(|_| ControllerError::Busy {
                task: "image clicking",
            })?;
        self.image_task = Some(tokio::spawn(run.run()));
        Ok(())
    }

    /// Stop the image worker and wait for it, at most `STOP_TIMEOUT`.
    pub async fn stop_image_click(&mut self) -> Option<RunReport> {
        if self.image_task.is_none() {
            log::debug!("No image click run to stop");
            return None;
        }
        self.clicker.stop();
        self.join_image_task(Some(STOP_TIMEOUT)).await
    }

    /// Wait for the current image run to end on its own.
    pub async fn wait_image_click(&mut self) -> Option<RunReport> {
        self.join_image_task(None).await
    }

    async fn join_image_task(&mut self, limit: Option<Duration>) -> Option<RunReport> {
        let task = self.image_task.as_mut()?;
        let joined = match limit {
            Some(limit) => match timeout(limit, task).await {
                Ok(joined) => joined,
                Err(_) => {
                    log::warn!(
                        "⚠️ Image clicker did not stop within {:.1}s",
                        limit.as_secs_f64()
                    );
                    return None;
                }
            },
            None => task.await,
        };
        self.image_task = None;

        Some(match joined {
            Ok(report) => report,
            Err(e) => {
                let outcome = self.worker_failed("image clicker", e);
                RunReport {
                    outcome,
                    clicks: 0,
                    misses: 0,
                    loops_completed: 0,
                }
            }
        })
    }

    fn worker_failed(&self, task: &str, error: JoinError) -> RunOutcome {
        log::error!("❌ {} worker ended abnormally: {}", task, error);
        let outcome = RunOutcome::Faulted(error.to_string());
        publish(Some(&self.event_tx), ClickerEvent::Progress(100.0));
        publish(Some(&self.event_tx), ClickerEvent::Finished(outcome.clone()));
        outcome
    }

    /// Score all templates against one capture without clicking.
    pub fn probe(&self) -> Result<Vec<(String, Option<MatchResult>)>, CaptureError> {
        self.clicker.probe(self.backends.screen())
    }

    // ============================================================
    // RECORDING AND PLAYBACK
    // ============================================================

    pub fn start_recording(&mut self) -> bool {
        self.recorder.start()
    }

    pub fn stop_recording(&mut self) -> bool {
        self.recorder.stop()
    }

    pub fn record_click(&mut self, x: i32, y: i32) {
        self.recorder.on_click(x, y);
    }

    pub fn set_discard_stop_click(&mut self, discard_stop_click: bool) {
        self.recorder.set_discard_stop_click(discard_stop_click);
    }

    /// Spawn playback of the recorded clicks. `Ok(false)` when there is
    /// nothing to play.
    pub fn play_clicks(&mut self) -> Result<bool, ControllerError> {
        if self.recorder.is_recording() {
            log::warn!("⚠️ Stop recording before playing");
            return Err(ControllerError::Busy { task: "recording" });
        }
        self.ensure_pointer_free()?;

        let Some(replay) = self.recorder.prepare_replay() else {
            return Ok(false);
        };
        self.replay_task = Some(tokio::spawn(
            replay.run(self.backends.driver(), self.cancel.clone()),
        ));
        Ok(true)
    }

    pub async fn stop_playing(&mut self) -> Option<RunOutcome> {
        if self.replay_task.is_none() {
            log::debug!("No playback to stop");
            return None;
        }
        self.recorder.stop_playing();
        self.join_replay_task(Some(STOP_TIMEOUT)).await
    }

    pub async fn wait_playback(&mut self) -> Option<RunOutcome> {
        self.join_replay_task(None).await
    }

    async fn join_replay_task(&mut self, limit: Option<Duration>) -> Option<RunOutcome> {
        let task = self.replay_task.as_mut()?;
        let joined = match limit {
            Some(limit) => match timeout(limit, task).await {
                Ok(joined) => joined,
                Err(_) => {
                    log::warn!("⚠️ Playback did not stop within {:.1}s", limit.as_secs_f64());
                    return None;
                }
            },
            None => task.await,
        };
        self.replay_task = None;

        Some(match joined {
            Ok(outcome) => outcome,
            Err(e) => self.worker_failed("playback", e),
        })
    }

    // ============================================================
    // STOP, HOTKEYS AND SETTINGS
    // ============================================================

    /// Stop everything that is going on, then re-arm the cancel token.
    pub async fn global_stop(&mut self) {
        log::info!("🛑 Global stop");
        self.cancel.cancel();

        if self.recorder.is_recording() {
            self.recorder.stop();
        }

        self.recorder.stop_playing();
        if self.replay_task.is_some() {
            self.join_replay_task(Some(GLOBAL_STOP_TIMEOUT)).await;
        }

        self.clicker.stop();
        if self.image_task.is_some() {
            self.join_image_task(Some(GLOBAL_STOP_TIMEOUT)).await;
        }

        self.cancel.reset();
    }

    /// Route a global input event: ESC stops everything, primary clicks
    /// feed the recorder.
    pub async fn handle_hook_event(&mut self, event: HookEvent) {
        match event {
            HookEvent::Escape => self.global_stop().await,
            HookEvent::PrimaryClick { x, y } => self.recorder.on_click(x, y),
        }
    }

    /// Validate and persist new settings, then push them into the engine
    /// and the recorder. A run already in flight keeps its old snapshot.
    pub fn apply_settings(&mut self, settings: Settings) -> Result<(), ControllerError> {
        settings.save(&self.config_path)?;

        let clicker_settings = settings.clicker_settings();
        self.recorder.set_loop_times(clicker_settings.loop_times);
        self.recorder.set_interval(clicker_settings.click_interval);
        self.recorder
            .set_discard_stop_click(settings.discard_stop_click);
        self.clicker.apply_settings(clicker_settings);
        self.settings = settings;
        Ok(())
    }

    /// Stop all work, waiting at most `SHUTDOWN_TIMEOUT` per worker.
    pub async fn shutdown(&mut self) {
        log::info!("👋 Shutting down");
        self.cancel.cancel();
        if self.recorder.is_recording() {
            self.recorder.stop();
        }
        self.recorder.stop_playing();
        self.clicker.stop();

        if self.replay_task.is_some() {
            self.join_replay_task(Some(SHUTDOWN_TIMEOUT)).await;
        }
        if self.image_task.is_some() {
            self.join_image_task(Some(SHUTDOWN_TIMEOUT)).await;
        }
    }
}
