use click_sprite::args::{Args, Mode};
use click_sprite::clicker::{ClickerEvent, RunOutcome};
use click_sprite::config::Settings;
use click_sprite::controller::{Backends, Controller};
use click_sprite::input::{HookEvent, spawn_global_hook};
use click_sprite::logging::init_logging;
use std::process::ExitCode;
use tokio::sync::mpsc;
use tokio::time::{Duration, interval};

type HookReceiver = Option<mpsc::UnboundedReceiver<HookEvent>>;

#[tokio::main]
async fn main() -> ExitCode {
    let Some(args) = Args::parse() else {
        return ExitCode::SUCCESS;
    };

    // A broken settings file is the one error we refuse to start with
    let mut settings = match Settings::load(&args.config_path) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("❌ {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(loop_times) = args.loop_times {
        settings.loop_times = loop_times;
    }

    if let Err(e) = init_logging(&settings) {
        eprintln!("⚠️ File logging disabled: {}", e);
    }

    let mut controller = Controller::new(settings, args.config_path.clone(), Backends::system());

    match args.mode {
        Mode::Probe => probe(&controller),
        Mode::Run => run_image_click(&mut controller).await,
        Mode::Record => record_and_replay(&mut controller).await,
    }
}

fn start_hook() -> HookReceiver {
    match spawn_global_hook() {
        Ok(rx) => Some(rx),
        Err(e) => {
            log::warn!("⚠️ Global hook unavailable, ESC will not work: {}", e);
            None
        }
    }
}

async fn next_hook_event(hook: &mut HookReceiver) -> Option<HookEvent> {
    match hook {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

fn probe(controller: &Controller) -> ExitCode {
    let threshold = controller.settings().threshold;
    match controller.probe() {
        Ok(results) if results.is_empty() => {
            println!("⚠️ No templates in {}", controller.settings().png_dir);
            ExitCode::SUCCESS
        }
        Ok(results) => {
            for (name, result) in results {
                match result {
                    Some(found) => println!(
                        "{} {:<32} {:.3} at ({}, {})",
                        if found.is_hit(threshold) { "✅" } else { "  " },
                        name,
                        found.score,
                        found.location.0,
                        found.location.1
                    ),
                    None => println!("   {:<32} n/a", name),
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("❌ Probe failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_image_click(controller: &mut Controller) -> ExitCode {
    let Some(mut events) = controller.take_events() else {
        return ExitCode::FAILURE;
    };
    let mut hook = start_hook();

    if let Err(e) = controller.start_image_click() {
        log::error!("❌ {}", e);
        return ExitCode::FAILURE;
    }
    println!("▶️ Running, press ESC to stop");

    // Events may be dropped under load, so also watch the worker itself
    let mut tick = interval(Duration::from_millis(500));
    loop {
        tokio::select! {
            _ = tick.tick() => {
                if !controller.is_image_clicking() {
                    break;
                }
            }
            Some(event) = events.recv() => match event {
                ClickerEvent::Progress(p) => println!("⏳ {:.1}%", p),
                ClickerEvent::Finished(_) => break,
                _ => {}
            },
            Some(event) = next_hook_event(&mut hook) => {
                controller.handle_hook_event(event).await;
            }
            _ = tokio::signal::ctrl_c() => {
                controller.shutdown().await;
                return ExitCode::SUCCESS;
            }
        }
    }

    match controller.wait_image_click().await {
        Some(report) => {
            println!(
                "🏁 {:?}: {} clicks, {} misses, {} loops",
                report.outcome, report.clicks, report.misses, report.loops_completed
            );
            if matches!(report.outcome, RunOutcome::Faulted(_)) {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        None => ExitCode::SUCCESS,
    }
}

async fn record_and_replay(controller: &mut Controller) -> ExitCode {
    let mut hook = start_hook();
    if hook.is_none() {
        log::error!("❌ Recording needs the global input hook");
        return ExitCode::FAILURE;
    }

    // ESC ends the recording here, so no click needs discarding
    controller.set_discard_stop_click(false);
    controller.start_recording();
    println!("⏺️ Recording, click away and press ESC when done");

    loop {
        tokio::select! {
            Some(event) = next_hook_event(&mut hook) => match event {
                HookEvent::PrimaryClick { x, y } => controller.record_click(x, y),
                HookEvent::Escape => break,
            },
            _ = tokio::signal::ctrl_c() => {
                controller.shutdown().await;
                return ExitCode::SUCCESS;
            }
        }
    }
    controller.stop_recording();

    match controller.play_clicks() {
        Ok(true) => println!(
            "▶️ Replaying {} clicks, press ESC to stop",
            controller.recorder().clicks().len()
        ),
        Ok(false) => return ExitCode::SUCCESS,
        Err(e) => {
            log::error!("❌ {}", e);
            return ExitCode::FAILURE;
        }
    }

    let mut tick = interval(Duration::from_millis(200));
    loop {
        tokio::select! {
            _ = tick.tick() => {
                if !controller.is_playing() {
                    break;
                }
            }
            Some(event) = next_hook_event(&mut hook) => {
                controller.handle_hook_event(event).await;
            }
            _ = tokio::signal::ctrl_c() => {
                controller.shutdown().await;
                return ExitCode::SUCCESS;
            }
        }
    }

    if let Some(outcome) = controller.wait_playback().await {
        println!("🏁 Playback {:?}", outcome);
    }
    ExitCode::SUCCESS
}
