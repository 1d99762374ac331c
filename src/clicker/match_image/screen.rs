//! Screen capture sources

use crate::clicker::error::CaptureError;
use image::{DynamicImage, GrayImage, RgbaImage};

/// One grayscale grab of a monitor plus where that monitor sits on the
/// virtual desktop, so match locations can be turned into absolute clicks.
#[derive(Debug, Clone)]
pub struct ScreenFrame {
    pub image: GrayImage,
    pub origin: (i32, i32),
}

impl ScreenFrame {
    pub fn new(image: GrayImage, origin: (i32, i32)) -> Self {
        Self { image, origin }
    }
}

/// Source of live screen content. Every call must return a fresh grab.
pub trait ScreenSource: Send {
    fn capture(&mut self) -> Result<ScreenFrame, CaptureError>;
}

/// Primary monitor captured through `xcap`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrimaryMonitor;

impl PrimaryMonitor {
    pub fn new() -> Self {
        Self
    }
}

impl ScreenSource for PrimaryMonitor {
    fn capture(&mut self) -> Result<ScreenFrame, CaptureError> {
        let monitors = xcap::Monitor::all().map_err(|e| CaptureError::Unsupported {
            description: e.to_string(),
        })?;

        let monitor = monitors
            .iter()
            .find(|m| m.is_primary().unwrap_or(false))
            .or_else(|| monitors.first())
            .ok_or(CaptureError::NoMonitor)?;

        let origin = (monitor.x().unwrap_or(0), monitor.y().unwrap_or(0));

        let captured = monitor
            .capture_image()
            .map_err(|e| CaptureError::Backend {
                description: e.to_string(),
            })?;

        // Rebuild through the raw buffer so xcap's image version never leaks
        let (width, height) = (captured.width(), captured.height());
        let rgba = RgbaImage::from_raw(width, height, captured.into_raw()).ok_or_else(|| {
            CaptureError::Backend {
                description: format!("capture buffer does not match {}x{}", width, height),
            }
        })?;

        Ok(ScreenFrame::new(DynamicImage::ImageRgba8(rgba).to_luma8(), origin))
    }
}

impl<S: ScreenSource + ?Sized> ScreenSource for Box<S> {
    fn capture(&mut self) -> Result<ScreenFrame, CaptureError> {
        (**self).capture()
    }
}
