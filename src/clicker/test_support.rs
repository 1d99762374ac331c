//! Fakes and fixtures shared by the clicker, recorder and controller tests

use crate::clicker::error::CaptureError;
use crate::clicker::match_image::{ScreenFrame, ScreenSource, Template};
use crate::input::{InputError, InputResult, PointerDriver};
use image::{GrayImage, Luma};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Deterministic pseudo-random grayscale image (LCG), unique enough that a
/// crop of it only correlates perfectly with itself.
pub fn noise_image(width: u32, height: u32, seed: u32) -> GrayImage {
    let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
    GrayImage::from_fn(width, height, |_, _| {
        state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        Luma([((state >> 16) & 0xff) as u8])
    })
}

pub fn uniform_image(width: u32, height: u32, value: u8) -> GrayImage {
    GrayImage::from_pixel(width, height, Luma([value]))
}

pub fn checkerboard(width: u32, height: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        if (x + y) % 2 == 0 { Luma([255]) } else { Luma([0]) }
    })
}

pub fn crop(image: &GrayImage, x: u32, y: u32, width: u32, height: u32) -> GrayImage {
    image::imageops::crop_imm(image, x, y, width, height).to_image()
}

pub fn template(name: &str, image: GrayImage) -> Template {
    Template::from_image(name.to_string(), PathBuf::from(name), image)
}

/// Returns the same frame on every capture and counts the grabs.
#[derive(Clone)]
pub struct StaticScreen {
    frame: ScreenFrame,
    captures: Arc<AtomicUsize>,
}

impl StaticScreen {
    pub fn new(image: GrayImage) -> Self {
        Self::with_origin(image, (0, 0))
    }

    pub fn with_origin(image: GrayImage, origin: (i32, i32)) -> Self {
        Self {
            frame: ScreenFrame::new(image, origin),
            captures: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn capture_count(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.captures)
    }
}

impl ScreenSource for StaticScreen {
    fn capture(&mut self) -> Result<ScreenFrame, CaptureError> {
        self.captures.fetch_add(1, Ordering::SeqCst);
        Ok(self.frame.clone())
    }
}

/// Plays back a scripted list of capture results, then repeats the last
/// successful frame.
pub struct ScriptedScreen {
    script: VecDeque<Result<GrayImage, CaptureError>>,
    fallback: GrayImage,
}

impl ScriptedScreen {
    pub fn new(script: Vec<Result<GrayImage, CaptureError>>, fallback: GrayImage) -> Self {
        Self {
            script: script.into(),
            fallback,
        }
    }
}

impl ScreenSource for ScriptedScreen {
    fn capture(&mut self) -> Result<ScreenFrame, CaptureError> {
        match self.script.pop_front() {
            Some(Ok(image)) => Ok(ScreenFrame::new(image, (0, 0))),
            Some(Err(e)) => Err(e),
            None => Ok(ScreenFrame::new(self.fallback.clone(), (0, 0))),
        }
    }
}

/// A static frame that takes `delay` of wall time per capture, blocking
/// the calling thread the way a real grab does.
pub struct SlowScreen {
    inner: StaticScreen,
    delay: Duration,
}

impl SlowScreen {
    pub fn new(image: GrayImage, delay: Duration) -> Self {
        Self {
            inner: StaticScreen::new(image),
            delay,
        }
    }
}

impl ScreenSource for SlowScreen {
    fn capture(&mut self) -> Result<ScreenFrame, CaptureError> {
        std::thread::sleep(self.delay);
        self.inner.capture()
    }
}

pub struct PanickingScreen;

impl ScreenSource for PanickingScreen {
    fn capture(&mut self) -> Result<ScreenFrame, CaptureError> {
        panic!("capture backend exploded");
    }
}

/// Records every click instead of touching the real pointer.
#[derive(Clone, Default)]
pub struct RecordingDriver {
    clicks: Arc<Mutex<Vec<(i32, i32)>>>,
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clicks(&self) -> Vec<(i32, i32)> {
        self.clicks.lock().unwrap().clone()
    }
}

impl PointerDriver for RecordingDriver {
    fn click_at(&mut self, x: i32, y: i32) -> InputResult<()> {
        self.clicks.lock().unwrap().push((x, y));
        Ok(())
    }
}

/// Driver whose every click fails.
pub struct BrokenDriver;

impl PointerDriver for BrokenDriver {
    fn click_at(&mut self, x: i32, y: i32) -> InputResult<()> {
        Err(InputError::Click {
            x,
            y,
            description: "no display".to_string(),
        })
    }
}
