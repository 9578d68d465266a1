//! Backend serving a fixed raster, for tests and offline runs.

use crate::capture::ScreenBackend;
use crate::util::ScreenMatchResult;
use ::image::RgbImage;
use std::sync::{Arc, RwLock};

/// Screen backend that returns a caller-supplied image.
///
/// The image can be swapped while the backend is in use, which lets tests
/// make a target "appear" during a wait.
#[derive(Clone, Debug)]
pub struct MemoryBackend {
    screen: Arc<RwLock<RgbImage>>,
}

impl MemoryBackend {
    pub fn new(screen: RgbImage) -> Self {
        Self {
            screen: Arc::new(RwLock::new(screen)),
        }
    }

    /// Replaces the served image.
    pub fn set_screen(&self, screen: RgbImage) {
        let mut guard = self
            .screen
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = screen;
    }

    fn snapshot(&self) -> RgbImage {
        self.screen
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl ScreenBackend for MemoryBackend {
    fn screen_size(&self) -> ScreenMatchResult<(u32, u32)> {
        Ok(self.snapshot().dimensions())
    }

    fn grab_full(&self) -> ScreenMatchResult<RgbImage> {
        Ok(self.snapshot())
    }
}
