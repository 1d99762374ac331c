// Click recorder module
// Captures primary-button clicks from the global hook and replays them
// through a pointer driver.

pub mod replay;


pub use replay::Replay;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Records clicks in order and hands out replays of them.
pub struct ClickRecorder {
    clicks: Vec<(i32, i32)>,
    recording: bool,
    loop_times: u32,
    click_interval: Duration,
    discard_stop_click: bool,
    playing: Arc<AtomicBool>,
}

impl ClickRecorder {
    pub fn new(loop_times: u32, click_interval: Duration, discard_stop_click: bool) -> Self {
        Self {
            clicks: Vec::new(),
            recording: false,
            loop_times: loop_times.max(1),
            click_interval,
            discard_stop_click,
            playing: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Clear any previous recording and begin a new one.
    pub fn start(&mut self) -> bool {
        if self.recording {
            log::warn!("⚠️ Already recording, stop first");
            return false;
        }
        self.clicks.clear();
        self.recording = true;
        log::info!("⏺️ Recording clicks");
        true
    }

    pub fn stop(&mut self) -> bool {
        if !self.recording {
            log::warn!("⚠️ Not recording");
            return false;
        }
        self.recording = false;

        // The last click is the one that hit the stop control
        if self.discard_stop_click && self.clicks.pop().is_some() {
            log::debug!("Discarded the click that stopped recording");
        }

        log::info!("⏹️ Recording stopped, {} clicks recorded", self.clicks.len());
        true
    }

    pub fn on_click(&mut self, x: i32, y: i32) {
        if self.recording {
            self.clicks.push((x, y));
            log::info!("📍 Recorded click at ({}, {})", x, y);
        }
    }

    pub fn clicks(&self) -> &[(i32, i32)] {
        &self.clicks
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    pub fn loop_times(&self) -> u32 {
        self.loop_times
    }

    pub fn set_loop_times(&mut self, loop_times: u32) {
        self.loop_times = loop_times.max(1);
        log::info!("🔧 Replay loop times set to {}", self.loop_times);
    }

    pub fn set_interval(&mut self, click_interval: Duration) {
        self.click_interval = click_interval;
        log::info!(
            "🔧 Replay click interval set to {:.2}s",
            click_interval.as_secs_f64()
        );
    }

    pub fn set_discard_stop_click(&mut self, discard_stop_click: bool) {
        self.discard_stop_click = discard_stop_click;
    }

    /// Freeze the current recording into a replay and mark playback active.
    /// `None` when there is nothing to play or a replay is already going.
    pub fn prepare_replay(&self) -> Option<Replay> {
        if self.clicks.is_empty() {
            log::warn!("⚠️ No recorded clicks to play");
            return None;
        }
        if self.playing.swap(true, Ordering::SeqCst) {
            log::warn!("⚠️ Playback already running");
            return None;
        }
        Some(Replay::new(
            self.clicks.clone(),
            self.loop_times,
            self.click_interval,
            Arc::clone(&self.playing),
        ))
    }

    /// Ask an active replay to stop before its next click.
    pub fn stop_playing(&self) -> bool {
        if self.playing.swap(false, Ordering::SeqCst) {
            log::info!("⏹️ Stopping playback");
            true
        } else {
            false
        }
    }
}
