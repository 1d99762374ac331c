//! Synthetic pointer input

use super::error::{InputError, InputResult};
use enigo::{Button, Coordinate, Direction, Enigo, Mouse, Settings};

/// Anything that can move the system pointer and left-click.
///
/// The click is observable system-wide; the driver has no idea what it hit.
pub trait PointerDriver: Send {
    fn click_at(&mut self, x: i32, y: i32) -> InputResult<()>;
}

impl<D: PointerDriver + ?Sized> PointerDriver for Box<D> {
    fn click_at(&mut self, x: i32, y: i32) -> InputResult<()> {
        (**self).click_at(x, y)
    }
}

/// Pointer driver backed by `enigo`.
///
/// The connection is opened per click so the driver stays `Send` on every
/// platform and survives display server restarts between runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnigoDriver;

impl EnigoDriver {
    pub fn new() -> Self {
        Self
    }
}

impl PointerDriver for EnigoDriver {
    fn click_at(&mut self, x: i32, y: i32) -> InputResult<()> {
        let mut enigo = Enigo::new(&Settings::default()).map_err(|e| InputError::Init {
            description: e.to_string(),
        })?;
        enigo
            .move_mouse(x, y, Coordinate::Abs)
            .map_err(|e| InputError::Click {
                x,
                y,
                description: e.to_string(),
            })?;
        enigo
            .button(Button::Left, Direction::Click)
            .map_err(|e| InputError::Click {
                x,
                y,
                description: e.to_string(),
            })?;
        log::debug!("🖱️ Clicked at ({}, {})", x, y);
        Ok(())
    }
}
