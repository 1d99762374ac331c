// Image clicker state machine
//
// Idle -> Running -> {Completed | Stopped | Cancelled | Faulted}
//
// A run walks `loop_times` passes over the templates in store order. For
// each template it polls the screen until the match clears the threshold
// (click the center), `wait_time` runs out (miss), or the run is stopped
// (abort the whole run).
use super::channels::publish;
use super::error::{ClickerError, ClickerResult};
use super::match_image::{MatchResult, ScreenMatcher, ScreenSource, Template, TemplateStore};
use super::progress::compute_progress;
use super::types::{
    CancelToken, ClickerEvent, ClickerSettings, EngineState, RunOutcome, RunReport,
};
use crate::clicker::error::CaptureError;
use crate::input::PointerDriver;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant, sleep};

/// Idle time between failed polls; bounds capture rate and stop latency.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Pause between two passes over the template list.
pub const PASS_PAUSE: Duration = Duration::from_millis(500);

type SharedState = Arc<Mutex<EngineState>>;

fn read_state(state: &SharedState) -> EngineState {
    *state.lock().unwrap_or_else(|e| e.into_inner())
}

fn write_state(state: &SharedState, new_state: EngineState) {
    *state.lock().unwrap_or_else(|e| e.into_inner()) = new_state;
}

/// Cloneable handle to stop a run from any thread.
#[derive(Clone)]
pub struct StopHandle {
    running: Arc<AtomicBool>,
    state: SharedState,
}

impl StopHandle {
    /// Returns `false` when nothing was running.
    pub fn stop(&self) -> bool {
        if self.running.swap(false, Ordering::SeqCst) {
            log::info!("⏹️ Stopping image clicker");
            true
        } else {
            log::debug!("Image clicker stop requested while idle");
            false
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> EngineState {
        read_state(&self.state)
    }
}

/// The template-matching clicker.
///
/// Holds the pending settings and the template store. `start` freezes both
/// into a [`ClickerRun`] that a worker task drives to completion.
pub struct ImageClicker {
    settings: ClickerSettings,
    store: TemplateStore,
    running: Arc<AtomicBool>,
    /// Held from `start` until the run has fully unwound, so a stopped run
    /// still blocks the next one while it winds down.
    busy: Arc<AtomicBool>,
    state: SharedState,
    event_tx: Option<mpsc::Sender<ClickerEvent>>,
}

impl ImageClicker {
    /// Build the clicker and load templates from `settings.png_dir`.
    pub fn new(settings: ClickerSettings) -> Self {
        let store = TemplateStore::load(settings.png_dir.clone());
        Self::with_store(settings, store)
    }

    pub fn with_store(settings: ClickerSettings, store: TemplateStore) -> Self {
        Self {
            settings,
            store,
            running: Arc::new(AtomicBool::new(false)),
            busy: Arc::new(AtomicBool::new(false)),
            state: Arc::new(Mutex::new(EngineState::Idle)),
            event_tx: None,
        }
    }

    pub fn set_event_sender(&mut self, event_tx: mpsc::Sender<ClickerEvent>) {
        self.event_tx = Some(event_tx);
    }

    pub fn set_threshold(&mut self, threshold: f32) {
        self.settings.threshold = threshold.clamp(0.0, 1.0);
        log::info!("🔧 Similarity threshold set to {:.2}", self.settings.threshold);
    }

    pub fn set_wait_time(&mut self, wait_time: Duration) {
        self.settings.wait_time = wait_time;
        log::info!("🔧 Wait time set to {:.1}s", wait_time.as_secs_f64());
    }

    pub fn set_click_interval(&mut self, click_interval: Duration) {
        self.settings.click_interval = click_interval;
        log::info!(
            "🔧 Click interval set to {:.2}s",
            click_interval.as_secs_f64()
        );
    }

    pub fn set_immediate_click(&mut self, immediate_click: bool) {
        self.settings.immediate_click = immediate_click;
        log::info!("🔧 Immediate click set to {}", immediate_click);
    }

    pub fn set_loop_times(&mut self, loop_times: u32) {
        self.settings.loop_times = loop_times.max(1);
        log::info!("🔧 Loop times set to {}", self.settings.loop_times);
    }

    /// Point at another template directory and load it.
    pub fn set_png_dir(&mut self, png_dir: impl Into<PathBuf>) -> usize {
        let png_dir = png_dir.into();
        self.settings.png_dir = png_dir.clone();
        self.store.set_directory(png_dir)
    }

    pub fn reload_templates(&mut self) -> usize {
        self.store.reload()
    }

    /// Apply a whole settings record; templates reload only when the
    /// directory changed.
    pub fn apply_settings(&mut self, settings: ClickerSettings) {
        if settings.png_dir != self.settings.png_dir {
            self.set_png_dir(settings.png_dir.clone());
        }
        self.set_threshold(settings.threshold);
        self.set_wait_time(settings.wait_time);
        self.set_click_interval(settings.click_interval);
        self.set_immediate_click(settings.immediate_click);
        self.set_loop_times(settings.loop_times);
    }

    pub fn settings(&self) -> &ClickerSettings {
        &self.settings
    }

    pub fn templates(&self) -> &TemplateStore {
        &self.store
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> EngineState {
        read_state(&self.state)
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            running: Arc::clone(&self.running),
            state: Arc::clone(&self.state),
        }
    }

    pub fn stop(&self) -> bool {
        self.stop_handle().stop()
    }

    /// Begin a run. Rejected while another run is active or still winding
    /// down after a stop: two searches would fight over the pointer.
    pub fn start<S: ScreenSource + 'static, D: PointerDriver>(
        &self,
        screen: S,
        driver: D,
        cancel: CancelToken,
    ) -> ClickerResult<ClickerRun<S, D>> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            log::warn!("⚠️ Image clicker already running, start ignored");
            return Err(ClickerError::AlreadyRunning);
        }
        write_state(&self.state, EngineState::Running);
        self.running.store(true, Ordering::SeqCst);

        Ok(ClickerRun {
            settings: self.settings.clone(),
            templates: self.store.snapshot(),
            matcher: Some(ScreenMatcher::new(screen)),
            driver,
            cancel,
            event_tx: self.event_tx.clone(),
            guard: RunGuard {
                running: Arc::clone(&self.running),
                busy: Arc::clone(&self.busy),
                state: Arc::clone(&self.state),
                released: false,
            },
            current_loop: 0,
            clicks: 0,
            misses: 0,
        })
    }

    /// Score every template against one capture without clicking.
    pub fn probe<S: ScreenSource>(
        &self,
        screen: S,
    ) -> Result<Vec<(String, Option<MatchResult>)>, CaptureError> {
        let results = ScreenMatcher::new(screen).locate_all(self.store.templates())?;
        for (name, result) in &results {
            match result {
                Some(found) => log::info!(
                    "🧪 {} best score {:.3} at ({}, {}){}",
                    name,
                    found.score,
                    found.location.0,
                    found.location.1,
                    if found.is_hit(self.settings.threshold) { " ✅" } else { "" }
                ),
                None => log::info!("🧪 {} could not be scored on this screen", name),
            }
        }
        Ok(results)
    }
}

/// Puts the engine back to a safe state however the run ends, including a
/// panic inside the worker.
struct RunGuard {
    running: Arc<AtomicBool>,
    busy: Arc<AtomicBool>,
    state: SharedState,
    released: bool,
}

impl RunGuard {
    /// Hand the engine back. Must come after the terminal state is written:
    /// once `busy` clears, the next run owns `running` and `state`.
    fn release(&mut self) {
        self.released = true;
        self.running.store(false, Ordering::SeqCst);
        self.busy.store(false, Ordering::SeqCst);
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if read_state(&self.state) == EngineState::Running {
            write_state(&self.state, EngineState::Faulted);
        }
        self.release();
    }
}

/// Sleep in poll-sized slices, re-checking after every wake-up.
/// Returns `false` if the run was stopped meanwhile.
pub(crate) async fn pause(running: &AtomicBool, cancel: &CancelToken, duration: Duration) -> bool {
    let deadline = Instant::now() + duration;
    loop {
        if !running.load(Ordering::SeqCst) || cancel.is_cancelled() {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        sleep((deadline - now).min(POLL_INTERVAL)).await;
    }
}

enum Attempt {
    /// `settled` is false when a stop cut the post-click pause short.
    Clicked { found: MatchResult, settled: bool },
    TimedOut(Option<f32>),
    Interrupted,
}

/// One frozen run: settings snapshot, template snapshot and the backends.
pub struct ClickerRun<S: ScreenSource, D: PointerDriver> {
    settings: ClickerSettings,
    templates: Arc<[Template]>,
    /// Lent to the blocking pool for each poll; `None` only while a capture
    /// is in flight or after its worker died.
    matcher: Option<ScreenMatcher<S>>,
    driver: D,
    cancel: CancelToken,
    event_tx: Option<mpsc::Sender<ClickerEvent>>,
    guard: RunGuard,
    current_loop: u32,
    clicks: u32,
    misses: u32,
}

impl<S: ScreenSource + 'static, D: PointerDriver> ClickerRun<S, D> {
    fn is_active(&self) -> bool {
        self.guard.running.load(Ordering::SeqCst) && !self.cancel.is_cancelled()
    }

    fn interrupted_outcome(&self) -> RunOutcome {
        if self.cancel.is_cancelled() {
            RunOutcome::Cancelled
        } else {
            RunOutcome::Stopped
        }
    }

    fn publish(&self, event: ClickerEvent) {
        publish(self.event_tx.as_ref(), event);
    }

    fn change_state(&self, new_state: EngineState) {
        let old_state = read_state(&self.guard.state);
        if old_state != new_state {
            log::debug!("🎮 Image clicker state: {:?} -> {:?}", old_state, new_state);
            write_state(&self.guard.state, new_state);
        }
        self.publish(ClickerEvent::StateChanged(new_state));
    }

    /// Drive the run to a terminal state.
    pub async fn run(mut self) -> RunReport {
        self.change_state(EngineState::Running);
        self.publish(ClickerEvent::Progress(0.0));

        let templates = Arc::clone(&self.templates);
        let total = templates.len();
        let loop_times = self.settings.loop_times.max(1);

        if total == 0 {
            log::warn!("⚠️ No templates loaded, nothing to click");
            return self.finish(RunOutcome::Completed);
        }

        log::info!(
            "🚀 Image clicker started: {} templates x {} loops (threshold {:.2}, wait {:.1}s)",
            total,
            loop_times,
            self.settings.threshold,
            self.settings.wait_time.as_secs_f64()
        );

        while self.is_active() && self.current_loop < loop_times {
            log::info!("🔄 Starting loop {}/{}", self.current_loop + 1, loop_times);

            for (idx, template) in templates.iter().enumerate() {
                if !self.is_active() {
                    let outcome = self.interrupted_outcome();
                    return self.finish(outcome);
                }

                let progress = compute_progress(self.current_loop, loop_times, idx, total);
                self.publish(ClickerEvent::Progress(progress));

                match self.attempt(&templates, idx).await {
                    Ok(Attempt::Clicked { found, settled }) => {
                        self.clicks += 1;
                        log::info!(
                            "✅ Clicked template [{}/{}] {} (score {:.3}, progress {:.1}%)",
                            idx + 1,
                            total,
                            template.name,
                            found.score,
                            progress
                        );
                        if !settled {
                            let outcome = self.interrupted_outcome();
                            return self.finish(outcome);
                        }
                    }
                    Ok(Attempt::TimedOut(best_score)) => {
                        self.misses += 1;
                        log::debug!(
                            "👀 Template [{}/{}] {} not found within {:.1}s (best score {})",
                            idx + 1,
                            total,
                            template.name,
                            self.settings.wait_time.as_secs_f64(),
                            best_score.map_or("n/a".to_string(), |s| format!("{:.3}", s))
                        );
                        self.publish(ClickerEvent::TemplateMissed {
                            name: template.name.clone(),
                            best_score,
                        });
                    }
                    Ok(Attempt::Interrupted) => {
                        let outcome = self.interrupted_outcome();
                        return self.finish(outcome);
                    }
                    Err(e) => {
                        log::error!(
                            "❌ Run aborted on template '{}' (loop {}/{}): {}",
                            template.name,
                            self.current_loop + 1,
                            loop_times,
                            e
                        );
                        return self.finish(RunOutcome::Faulted(e.to_string()));
                    }
                }
            }

            self.current_loop += 1;
            if self.current_loop < loop_times {
                log::info!("Finished loop {}/{}", self.current_loop, loop_times);
                if !pause(&self.guard.running, &self.cancel, PASS_PAUSE).await {
                    break;
                }
            }
        }

        let outcome = if self.current_loop >= loop_times {
            RunOutcome::Completed
        } else {
            self.interrupted_outcome()
        };
        self.finish(outcome)
    }

    /// Capture and correlate on the blocking pool. The matcher moves into
    /// the closure and comes back with the result.
    async fn locate(
        &mut self,
        templates: &Arc<[Template]>,
        idx: usize,
    ) -> Result<Option<MatchResult>, CaptureError> {
        let Some(mut matcher) = self.matcher.take() else {
            return Err(CaptureError::Worker {
                description: "screen source lost by an earlier capture".to_string(),
            });
        };
        let templates = Arc::clone(templates);
        let (matcher, found) = tokio::task::spawn_blocking(move || {
            let found = matcher.locate(&templates[idx]);
            (matcher, found)
        })
        .await
        .map_err(|e| CaptureError::Worker {
            description: e.to_string(),
        })?;
        self.matcher = Some(matcher);
        found
    }

    /// Poll one template until hit, timeout or stop.
    async fn attempt(&mut self, templates: &Arc<[Template]>, idx: usize) -> ClickerResult<Attempt> {
        let template = &templates[idx];
        let started = Instant::now();
        let mut best_score: Option<f32> = None;
        let mut capture_warned = false;

        loop {
            if !self.is_active() {
                return Ok(Attempt::Interrupted);
            }

            let located = self.locate(templates, idx).await;
            // A stop that landed during the capture wins over its result
            if !self.is_active() {
                return Ok(Attempt::Interrupted);
            }

            match located {
                Ok(Some(found)) if found.is_hit(self.settings.threshold) => {
                    let (x, y) = template.center_at(found.location);
                    self.driver.click_at(x, y)?;
                    self.publish(ClickerEvent::TemplateClicked {
                        name: template.name.clone(),
                        x,
                        y,
                        score: found.score,
                    });
                    let settled = self.settings.immediate_click
                        || pause(&self.guard.running, &self.cancel, self.settings.click_interval)
                            .await;
                    return Ok(Attempt::Clicked { found, settled });
                }
                Ok(Some(found)) => {
                    best_score = Some(best_score.map_or(found.score, |b| b.max(found.score)));
                }
                Ok(None) => {}
                Err(e) if e.is_retryable() => {
                    // Counted as a missed poll; warn once per template attempt
                    if !capture_warned {
                        log::warn!("⚠️ Capture failed while looking for '{}': {}", template.name, e);
                        capture_warned = true;
                    }
                }
                Err(e) => return Err(e.into()),
            }

            if started.elapsed() >= self.settings.wait_time {
                return Ok(Attempt::TimedOut(best_score));
            }
            if !pause(&self.guard.running, &self.cancel, POLL_INTERVAL).await {
                return Ok(Attempt::Interrupted);
            }
        }
    }

    fn finish(mut self, outcome: RunOutcome) -> RunReport {
        self.change_state(outcome.state());
        self.publish(ClickerEvent::Progress(100.0));

        match &outcome {
            RunOutcome::Completed => log::info!(
                "🏁 Image clicker finished: {} clicks, {} misses",
                self.clicks,
                self.misses
            ),
            RunOutcome::Stopped => log::info!("⏹️ Image clicker stopped"),
            RunOutcome::Cancelled => log::info!("🛑 Image clicker cancelled by global stop"),
            RunOutcome::Faulted(reason) => log::error!("❌ Image clicker faulted: {}", reason),
        }
        self.publish(ClickerEvent::Finished(outcome.clone()));
        self.guard.release();

        RunReport {
            outcome,
            clicks: self.clicks,
            misses: self.misses,
            loops_completed: self.current_loop,
        }
    }
}
