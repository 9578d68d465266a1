//! Primary-monitor capture through `xcap`.

use crate::capture::ScreenBackend;
use crate::util::{ScreenMatchError, ScreenMatchResult};
use ::image::{DynamicImage, RgbImage, RgbaImage};
use ::xcap::Monitor;

/// Captures the primary monitor.
///
/// The monitor is looked up on every call so hot-plugging and resolution
/// changes are picked up.
#[derive(Clone, Copy, Debug, Default)]
pub struct XcapBackend;

impl XcapBackend {
    pub fn new() -> Self {
        Self
    }

    fn primary() -> ScreenMatchResult<Monitor> {
        let monitors = Monitor::all()
            .map_err(|err| ScreenMatchError::capture(format!("display unavailable: {err}")))?;
        monitors
            .into_iter()
            .find(|m| m.is_primary())
            .ok_or_else(|| ScreenMatchError::capture("no primary monitor"))
    }
}

impl ScreenBackend for XcapBackend {
    fn screen_size(&self) -> ScreenMatchResult<(u32, u32)> {
        let monitor = Self::primary()?;
        Ok((monitor.width(), monitor.height()))
    }

    fn grab_full(&self) -> ScreenMatchResult<RgbImage> {
        let monitor = Self::primary()?;
        let captured = monitor
            .capture_image()
            .map_err(|err| ScreenMatchError::capture(format!("screen grab failed: {err}")))?;
        let (width, height) = (captured.width(), captured.height());
        // Only raw bytes cross over; xcap may link another `image` release.
        let rgba = RgbaImage::from_raw(width, height, captured.into_raw())
            .ok_or_else(|| ScreenMatchError::capture("screen grab returned a short buffer"))?;
        Ok(DynamicImage::ImageRgba8(rgba).to_rgb8())
    }
}
