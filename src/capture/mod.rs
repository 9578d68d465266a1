//! Frame acquisition and capture storage.
//!
//! A [`ScreenBackend`] grabs raw pixels; [`FrameSource`] validates regions,
//! wraps the pixels into a [`Frame`] with its screen origin, and optionally
//! persists every capture as a PNG under a collision-free name.

use crate::frame::{Frame, Rect};
use crate::trace::{trace_event, trace_span};
use crate::util::{ScreenMatchError, ScreenMatchResult};
use ::image::codecs::png::PngEncoder;
use ::image::{imageops, RgbImage};
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, ErrorKind as IoErrorKind};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

mod memory;
#[cfg(feature = "capture")]
mod monitor;

pub use memory::MemoryBackend;
#[cfg(feature = "capture")]
pub use monitor::XcapBackend;

/// Attempts at finding an unused file name before giving up.
const MAX_NAME_ATTEMPTS: usize = 16;

/// Source of raw screen pixels.
pub trait ScreenBackend: Send + Sync {
    /// Width and height of the capturable surface.
    fn screen_size(&self) -> ScreenMatchResult<(u32, u32)>;

    /// Grabs the whole surface.
    fn grab_full(&self) -> ScreenMatchResult<RgbImage>;

    /// Grabs a region already validated to lie inside the surface.
    ///
    /// The default grabs the whole surface and crops it.
    fn grab_region(&self, rect: Rect) -> ScreenMatchResult<RgbImage> {
        let full = self.grab_full()?;
        let bounds = Rect::new(0, 0, full.width(), full.height())?;
        if !bounds.contains(&rect) {
            return Err(ScreenMatchError::capture(format!(
                "region {rect:?} outside captured surface {}x{}",
                full.width(),
                full.height()
            )));
        }
        Ok(imageops::crop_imm(&full, rect.x(), rect.y(), rect.width(), rect.height()).to_image())
    }
}

/// Where and whether captures are written to disk.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CaptureConfig {
    /// Directory for stored captures, created on first use.
    pub directory: PathBuf,
    /// File name prefix.
    pub prefix: String,
    /// Write each capture as PNG.
    pub persist: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("captures"),
            prefix: "screen".to_string(),
            persist: true,
        }
    }
}

/// Captured frame plus the stored artifact, if persisted.
#[derive(Clone, Debug)]
pub struct CapturedFrame {
    pub frame: Frame,
    pub artifact: Option<PathBuf>,
}

/// Captures frames from a backend and stores them.
pub struct FrameSource<B> {
    backend: B,
    config: CaptureConfig,
    seq: AtomicU64,
}

impl<B: ScreenBackend> FrameSource<B> {
    pub fn new(backend: B, config: CaptureConfig) -> Self {
        Self {
            backend,
            config,
            seq: AtomicU64::new(0),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Width and height of the capturable surface.
    pub fn screen_size(&self) -> ScreenMatchResult<(u32, u32)> {
        self.backend.screen_size()
    }

    /// Captures the whole surface.
    pub fn capture_full(&self) -> ScreenMatchResult<CapturedFrame> {
        let _span = trace_span!("capture_full").entered();
        let pixels = self.backend.grab_full()?;
        self.finish(pixels, (0, 0))
    }

    /// Captures a region that must lie fully inside the surface.
    pub fn capture_region(&self, rect: Rect) -> ScreenMatchResult<CapturedFrame> {
        let _span = trace_span!("capture_region", x = rect.x(), y = rect.y()).entered();
        self.check_region(rect)?;
        let pixels = self.backend.grab_region(rect)?;
        if pixels.dimensions() != (rect.width(), rect.height()) {
            return Err(ScreenMatchError::capture(format!(
                "backend returned {}x{} for a {}x{} region",
                pixels.width(),
                pixels.height(),
                rect.width(),
                rect.height()
            )));
        }
        self.finish(pixels, (rect.x(), rect.y()))
    }

    /// Reads one screen pixel without persisting anything.
    pub fn pixel_color(&self, x: u32, y: u32) -> ScreenMatchResult<[u8; 3]> {
        let rect = Rect::new(x, y, 1, 1)?;
        self.check_region(rect)?;
        let pixels = self.backend.grab_region(rect)?;
        pixels
            .get_pixel_checked(0, 0)
            .map(|p| p.0)
            .ok_or_else(|| ScreenMatchError::capture("backend returned an empty region"))
    }

    fn check_region(&self, rect: Rect) -> ScreenMatchResult<()> {
        let (width, height) = self.backend.screen_size()?;
        let screen = Rect::new(0, 0, width, height)
            .map_err(|_| ScreenMatchError::capture("display reports an empty surface"))?;
        if !screen.contains(&rect) {
            return Err(ScreenMatchError::capture(format!(
                "region ({}, {}, {}x{}) outside screen {width}x{height}",
                rect.x(),
                rect.y(),
                rect.width(),
                rect.height()
            )));
        }
        Ok(())
    }

    fn finish(&self, pixels: RgbImage, origin: (u32, u32)) -> ScreenMatchResult<CapturedFrame> {
        let artifact = if self.config.persist {
            Some(self.store(&pixels)?)
        } else {
            None
        };
        let frame = Frame::new(pixels, origin)
            .map_err(|err| ScreenMatchError::capture(err.to_string()))?;
        trace_event!(
            "captured",
            width = frame.width(),
            height = frame.height(),
            persisted = artifact.is_some()
        );
        Ok(CapturedFrame { frame, artifact })
    }

    /// Writes `pixels` as PNG under a fresh name and returns the path.
    fn store(&self, pixels: &RgbImage) -> ScreenMatchResult<PathBuf> {
        let dir = &self.config.directory;
        fs::create_dir_all(dir).map_err(|err| {
            ScreenMatchError::capture(format!("cannot create {}: {err}", dir.display()))
        })?;

        for _ in 0..MAX_NAME_ATTEMPTS {
            let path = dir.join(self.next_name());
            let file = match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => file,
                Err(err) if err.kind() == IoErrorKind::AlreadyExists => continue,
                Err(err) => return Err(storage_error(&path, err)),
            };
            let encoder = PngEncoder::new(BufWriter::new(file));
            pixels
                .write_with_encoder(encoder)
                .map_err(|err| storage_error(&path, err))?;
            return Ok(path);
        }
        Err(ScreenMatchError::capture(format!(
            "no free capture name in {} after {MAX_NAME_ATTEMPTS} attempts",
            dir.display()
        )))
    }

    fn next_name(&self) -> String {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        format!(
            "{}_{millis}_{}_{seq}.png",
            self.config.prefix,
            std::process::id()
        )
    }
}

fn storage_error(path: &Path, err: impl std::fmt::Display) -> ScreenMatchError {
    ScreenMatchError::capture(format!("cannot write {}: {err}", path.display()))
}
