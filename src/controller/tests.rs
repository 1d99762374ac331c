//! Tests for host orchestration with fake backends

use crate::clicker::test_support::{
    PanickingScreen, RecordingDriver, StaticScreen, checkerboard, crop, noise_image,
};
use crate::clicker::{ClickerEvent, RunOutcome, ScreenSource};
use crate::config::Settings;
use crate::controller::{Backends, Controller, ControllerError};
use crate::input::{HookEvent, PointerDriver};
use image::GrayImage;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

struct Fixture {
    dir: TempDir,
    driver: RecordingDriver,
}

impl Fixture {
    /// Template dir with `a.png` cut out of `screen` at (30, 20).
    fn new(screen: &GrayImage) -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("png")).unwrap();
        crop(screen, 30, 20, 10, 10)
            .save(dir.path().join("png/a.png"))
            .unwrap();
        Self {
            dir,
            driver: RecordingDriver::new(),
        }
    }

    fn settings(&self) -> Settings {
        Settings {
            png_dir: self.dir.path().join("png").display().to_string(),
            click_interval: 0.01,
            wait_time: 0.5,
            immediate_click: true,
            log_file: self.dir.path().join("app.log").display().to_string(),
            ..Settings::default()
        }
    }

    fn config_path(&self) -> std::path::PathBuf {
        self.dir.path().join("config.json")
    }

    fn controller(&self, settings: Settings, screen: GrayImage) -> Controller {
        let driver = self.driver.clone();
        let backends = Backends::new(
            Box::new(move || Box::new(StaticScreen::new(screen.clone())) as Box<dyn ScreenSource>),
            Box::new(move || Box::new(driver.clone()) as Box<dyn PointerDriver>),
        );
        Controller::new(settings, self.config_path(), backends)
    }
}

/// Screen the noise template never reaches the default threshold on.
fn decoy_screen() -> GrayImage {
    checkerboard(80, 60)
}

// ============================================================
// IMAGE CLICKING
// ============================================================

#[tokio::test]
async fn test_image_click_run_completes() {
    let screen = noise_image(120, 90, 21);
    let fixture = Fixture::new(&screen);
    let mut controller = fixture.controller(fixture.settings(), screen);

    controller.start_image_click().unwrap();
    let report = controller.wait_image_click().await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(fixture.driver.clicks(), vec![(35, 25)]);
    assert!(!controller.is_image_clicking());
}

#[tokio::test]
async fn test_second_start_is_busy() {
    let screen = noise_image(120, 90, 22);
    let fixture = Fixture::new(&screen);
    let settings = Settings {
        wait_time: 10.0,
        ..fixture.settings()
    };
    let mut controller = fixture.controller(settings, decoy_screen());

    controller.start_image_click().unwrap();
    let second = controller.start_image_click();

    assert!(matches!(second, Err(ControllerError::Busy { .. })));

    let report = controller.stop_image_click().await.unwrap();
    assert_eq!(report.outcome, RunOutcome::Stopped);
}

#[tokio::test]
async fn test_stop_when_idle_is_noop() {
    let screen = noise_image(40, 40, 1);
    let fixture = Fixture::new(&screen);
    let mut controller = fixture.controller(fixture.settings(), screen);

    assert!(controller.stop_image_click().await.is_none());
    assert!(controller.stop_playing().await.is_none());
}

#[tokio::test]
async fn test_missing_template_dir_still_runs() {
    let screen = noise_image(40, 40, 1);
    let fixture = Fixture::new(&screen);
    let settings = Settings {
        png_dir: fixture.dir.path().join("absent").display().to_string(),
        ..fixture.settings()
    };
    let mut controller = fixture.controller(settings, screen);

    controller.start_image_click().unwrap();
    let report = controller.wait_image_click().await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert!(fixture.driver.clicks().is_empty());
}

#[tokio::test]
async fn test_panicking_worker_reported_as_faulted() {
    let screen = noise_image(40, 40, 1);
    let fixture = Fixture::new(&screen);
    let backends = Backends::new(
        Box::new(|| Box::new(PanickingScreen) as Box<dyn ScreenSource>),
        Box::new(|| Box::new(RecordingDriver::new()) as Box<dyn PointerDriver>),
    );
    let mut controller = Controller::new(fixture.settings(), fixture.config_path(), backends);
    let mut events = controller.take_events().unwrap();

    controller.start_image_click().unwrap();
    let report = controller.wait_image_click().await.unwrap();

    assert!(matches!(report.outcome, RunOutcome::Faulted(_)));
    assert!(!controller.clicker().is_running(), "Run flag must be reset after a crash");

    let mut saw_final_progress = false;
    while let Ok(event) = events.try_recv() {
        if event == ClickerEvent::Progress(100.0) {
            saw_final_progress = true;
        }
    }
    assert!(saw_final_progress, "Progress must reach 100 after a crash");
}

// ============================================================
// GLOBAL STOP
// ============================================================

#[tokio::test]
async fn test_global_stop_cancels_run_and_rearms() {
    let screen = noise_image(120, 90, 23);
    let fixture = Fixture::new(&screen);
    let settings = Settings {
        wait_time: 10.0,
        ..fixture.settings()
    };
    let mut controller = fixture.controller(settings, decoy_screen());
    let mut events = controller.take_events().unwrap();

    controller.start_image_click().unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    controller.handle_hook_event(HookEvent::Escape).await;

    assert!(!controller.is_image_clicking());
    assert!(!controller.cancel_token().is_cancelled(), "Token must be re-armed");

    let mut finished = None;
    while let Ok(event) = events.try_recv() {
        if let ClickerEvent::Finished(outcome) = event {
            finished = Some(outcome);
        }
    }
    assert_eq!(finished, Some(RunOutcome::Cancelled));

    controller.start_image_click().unwrap();
    controller.stop_image_click().await;
}

#[tokio::test]
async fn test_escape_ends_recording() {
    let screen = noise_image(40, 40, 1);
    let fixture = Fixture::new(&screen);
    let mut controller = fixture.controller(fixture.settings(), screen);

    controller.start_recording();
    for (x, y) in [(1, 1), (2, 2), (3, 3)] {
        controller
            .handle_hook_event(HookEvent::PrimaryClick { x, y })
            .await;
    }
    controller.handle_hook_event(HookEvent::Escape).await;

    assert!(!controller.recorder().is_recording());
    assert_eq!(controller.recorder().clicks(), &[(1, 1), (2, 2)]);
}

// ============================================================
// PLAYBACK
// ============================================================

#[tokio::test]
async fn test_play_recorded_clicks() {
    let screen = noise_image(40, 40, 1);
    let fixture = Fixture::new(&screen);
    let settings = Settings {
        loop_times: 2,
        discard_stop_click: false,
        ..fixture.settings()
    };
    let mut controller = fixture.controller(settings, screen);

    controller.start_recording();
    controller.record_click(10, 20);
    controller.record_click(30, 40);
    controller.stop_recording();

    assert!(controller.play_clicks().unwrap());
    let outcome = controller.wait_playback().await.unwrap();

    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(
        fixture.driver.clicks(),
        vec![(10, 20), (30, 40), (10, 20), (30, 40)]
    );
}

#[tokio::test]
async fn test_play_with_nothing_recorded() {
    let screen = noise_image(40, 40, 1);
    let fixture = Fixture::new(&screen);
    let mut controller = fixture.controller(fixture.settings(), screen);

    assert!(!controller.play_clicks().unwrap());
    assert!(!controller.is_playing());
}

#[tokio::test]
async fn test_play_rejected_while_recording() {
    let screen = noise_image(40, 40, 1);
    let fixture = Fixture::new(&screen);
    let mut controller = fixture.controller(fixture.settings(), screen);

    controller.start_recording();
    let result = controller.play_clicks();

    assert!(result.is_err_and(|e| e.is_busy()));
}

// ============================================================
// SETTINGS
// ============================================================

#[tokio::test]
async fn test_apply_settings_saves_and_updates_engine() {
    let screen = noise_image(40, 40, 1);
    let fixture = Fixture::new(&screen);
    let mut controller = fixture.controller(fixture.settings(), screen);
    let updated = Settings {
        threshold: 0.9,
        loop_times: 3,
        ..fixture.settings()
    };

    controller.apply_settings(updated.clone()).unwrap();

    assert_eq!(Settings::load(&fixture.config_path()).unwrap(), updated);
    assert_eq!(controller.clicker().settings().threshold, 0.9);
    assert_eq!(controller.clicker().settings().loop_times, 3);
    assert_eq!(controller.recorder().loop_times(), 3);
}

#[tokio::test]
async fn test_apply_invalid_settings_changes_nothing() {
    let screen = noise_image(40, 40, 1);
    let fixture = Fixture::new(&screen);
    let mut controller = fixture.controller(fixture.settings(), screen);
    let invalid = Settings {
        threshold: 1.5,
        ..fixture.settings()
    };

    let result = controller.apply_settings(invalid);

    assert!(matches!(result, Err(ControllerError::Config { .. })));
    assert!(!Path::new(&fixture.config_path()).exists());
    assert_eq!(controller.settings().threshold, 0.8);
}

#[tokio::test]
async fn test_apply_settings_reloads_new_template_dir() {
    let screen = noise_image(40, 40, 1);
    let fixture = Fixture::new(&screen);
    let mut controller = fixture.controller(fixture.settings(), screen);
    let other = fixture.dir.path().join("other");
    std::fs::create_dir_all(&other).unwrap();
    checkerboard(4, 4).save(other.join("x.png")).unwrap();
    checkerboard(4, 4).save(other.join("y.png")).unwrap();

    controller
        .apply_settings(Settings {
            png_dir: other.display().to_string(),
            ..fixture.settings()
        })
        .unwrap();

    assert_eq!(controller.clicker().templates().names(), vec!["x.png", "y.png"]);
}

#[tokio::test]
async fn test_probe_uses_screen_backend() {
    let screen = noise_image(120, 90, 24);
    let fixture = Fixture::new(&screen);
    let controller = fixture.controller(fixture.settings(), screen);

    let results = controller.probe().unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].1.map(|m| m.location), Some((30, 20)));
    assert!(fixture.driver.clicks().is_empty());
}

#[tokio::test]
async fn test_shutdown_stops_playback() {
    let screen = noise_image(40, 40, 1);
    let fixture = Fixture::new(&screen);
    let settings = Settings {
        click_interval: 1.0,
        loop_times: 5,
        discard_stop_click: false,
        ..fixture.settings()
    };
    let mut controller = fixture.controller(settings, screen);
    controller.start_recording();
    controller.record_click(1, 1);
    controller.stop_recording();

    controller.play_clicks().unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    controller.shutdown().await;

    assert!(!controller.is_playing());
    assert_eq!(fixture.driver.clicks(), vec![(1, 1)]);
}
