//! Playback of a recorded click sequence

use crate::clicker::fsm::pause;
use crate::clicker::{CancelToken, RunOutcome};
use crate::input::PointerDriver;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// A frozen copy of the recording, ready to run on a worker task.
pub struct Replay {
    clicks: Vec<(i32, i32)>,
    loop_times: u32,
    click_interval: Duration,
    playing: Arc<AtomicBool>,
}

impl Replay {
    pub(crate) fn new(
        clicks: Vec<(i32, i32)>,
        loop_times: u32,
        click_interval: Duration,
        playing: Arc<AtomicBool>,
    ) -> Self {
        Self {
            clicks,
            loop_times: loop_times.max(1),
            click_interval,
            playing,
        }
    }

    pub fn len(&self) -> usize {
        self.clicks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clicks.is_empty()
    }

    fn is_active(&self, cancel: &CancelToken) -> bool {
        self.playing.load(Ordering::SeqCst) && !cancel.is_cancelled()
    }

    fn interrupted(cancel: &CancelToken) -> RunOutcome {
        if cancel.is_cancelled() {
            RunOutcome::Cancelled
        } else {
            RunOutcome::Stopped
        }
    }

    /// Play every click `loop_times` times, waiting `click_interval` after
    /// each one. Stop and cancel are honoured before every click and during
    /// every wait, the last one included.
    pub async fn run<D: PointerDriver>(self, mut driver: D, cancel: CancelToken) -> RunOutcome {
        log::info!(
            "▶️ Playing {} clicks x {} loops",
            self.clicks.len(),
            self.loop_times
        );

        'passes: {
            for loop_idx in 0..self.loop_times {
                if !self.is_active(&cancel) {
                    log::info!(
                        "⏹️ Playback stopped at loop {}/{}",
                        loop_idx + 1,
                        self.loop_times
                    );
                    break 'passes Self::interrupted(&cancel);
                }

                for (idx, &(x, y)) in self.clicks.iter().enumerate() {
                    if !self.is_active(&cancel) {
                        log::info!(
                            "⏹️ Playback stopped at click {}/{}",
                            idx + 1,
                            self.clicks.len()
                        );
                        break 'passes Self::interrupted(&cancel);
                    }
                    if let Err(e) = driver.click_at(x, y) {
                        log::error!("❌ Playback click failed: {}", e);
                        break 'passes RunOutcome::Faulted(e.to_string());
                    }
                    if !pause(&self.playing, &cancel, self.click_interval).await {
                        log::info!(
                            "⏹️ Playback stopped after click {}/{}",
                            idx + 1,
                            self.clicks.len()
                        );
                        break 'passes Self::interrupted(&cancel);
                    }
                }

                if loop_idx + 1 < self.loop_times {
                    log::info!("Finished playback loop {}/{}", loop_idx + 1, self.loop_times);
                }
            }
            log::info!("🏁 Playback finished");
            RunOutcome::Completed
        }
    }
}

impl Drop for Replay {
    fn drop(&mut self) {
        self.playing.store(false, Ordering::SeqCst);
    }
}
