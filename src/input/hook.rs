//! Global input hook
//!
//! Listens to OS-level mouse and keyboard events on a dedicated thread and
//! forwards the two things the application cares about: primary-button
//! presses (for the click recorder) and the ESC key (global stop).

use super::error::{InputError, InputResult};
use rdev::{Button, EventType, Key};
use std::thread;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HookEvent {
    /// Left button pressed at the last known pointer position.
    PrimaryClick { x: i32, y: i32 },
    /// ESC key pressed anywhere on the desktop.
    Escape,
}

/// Translate a raw listener event into a hook event.
///
/// Button events carry no coordinates, so pointer moves are tracked in
/// `last_pos` and the press is reported at the last seen position.
pub fn translate(event: &EventType, last_pos: &mut (f64, f64)) -> Option<HookEvent> {
    match event {
        EventType::MouseMove { x, y } => {
            *last_pos = (*x, *y);
            None
        }
        EventType::ButtonPress(Button::Left) => Some(HookEvent::PrimaryClick {
            x: last_pos.0.round() as i32,
            y: last_pos.1.round() as i32,
        }),
        EventType::KeyPress(Key::Escape) => Some(HookEvent::Escape),
        _ => None,
    }
}

/// Start the global listener and return the receiving end of its events.
///
/// `rdev::listen` blocks forever, so the thread is detached; it ends with
/// the process. A listener failure is logged and closes the channel.
pub fn spawn_global_hook() -> InputResult<mpsc::UnboundedReceiver<HookEvent>> {
    let (tx, rx) = mpsc::unbounded_channel();

    thread::Builder::new()
        .name("global-input-hook".to_string())
        .spawn(move || {
            let mut last_pos = (0.0, 0.0);
            let result = rdev::listen(move |event| {
                if let Some(hook_event) = translate(&event.event_type, &mut last_pos) {
                    // Receiver gone means the host is shutting down
                    let _ = tx.send(hook_event);
                }
            });
            if let Err(e) = result {
                log::error!("❌ Global input listener stopped: {:?}", e);
            }
        })
        .map_err(|e| InputError::Listener {
            description: e.to_string(),
        })?;

    log::info!("⌨️ Global input hook started (ESC = global stop)");
    Ok(rx)
}
