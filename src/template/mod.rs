//! Template storage and planning utilities.

use crate::image::io::{load_rgb_image, owned_gray_from_rgb};
use crate::image::{ImageView, OwnedImage};
use crate::util::{ScreenMatchError, ScreenMatchResult};
use ::image::{Rgb, RgbImage};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;

mod plan;

pub use plan::TemplatePlan;

/// Reference image being searched for.
///
/// Holds the caller's RGB pixels plus a grayscale copy used for correlation.
/// The content hash identifies the template for descriptor caching.
#[derive(Clone, Debug)]
pub struct Template {
    rgb: RgbImage,
    gray: OwnedImage,
    content_hash: u64,
}

impl Template {
    /// Creates a template from an RGB buffer.
    pub fn from_rgb(rgb: RgbImage) -> ScreenMatchResult<Self> {
        if rgb.width() == 0 || rgb.height() == 0 {
            return Err(ScreenMatchError::InvalidDimensions {
                width: rgb.width() as usize,
                height: rgb.height() as usize,
            });
        }
        let gray = owned_gray_from_rgb(&rgb)?;
        let content_hash = hash_pixels(rgb.width(), rgb.height(), rgb.as_raw());
        Ok(Self {
            rgb,
            gray,
            content_hash,
        })
    }

    /// Creates a template from a contiguous grayscale buffer.
    pub fn new(data: Vec<u8>, width: usize, height: usize) -> ScreenMatchResult<Self> {
        let gray = OwnedImage::new(data, width, height)?;
        let rgb = RgbImage::from_fn(width as u32, height as u32, |x, y| {
            let v = gray.data()[y as usize * width + x as usize];
            Rgb([v, v, v])
        });
        let content_hash = hash_pixels(rgb.width(), rgb.height(), rgb.as_raw());
        Ok(Self {
            rgb,
            gray,
            content_hash,
        })
    }

    /// Loads a template from a raster file.
    pub fn open<P: AsRef<Path>>(path: P) -> ScreenMatchResult<Self> {
        Self::from_rgb(load_rgb_image(path)?)
    }

    /// Returns a borrowed view of the grayscale template.
    pub fn view(&self) -> ImageView<'_, u8> {
        self.gray.view()
    }

    /// Returns the grayscale template.
    pub fn gray(&self) -> &OwnedImage {
        &self.gray
    }

    /// Returns the RGB template pixels.
    pub fn rgb(&self) -> &RgbImage {
        &self.rgb
    }

    pub fn width(&self) -> usize {
        self.gray.width()
    }

    pub fn height(&self) -> usize {
        self.gray.height()
    }

    /// Hash of dimensions and pixel content.
    pub fn content_hash(&self) -> u64 {
        self.content_hash
    }
}

fn hash_pixels(width: u32, height: u32, data: &[u8]) -> u64 {
    let mut hasher = DefaultHasher::new();
    width.hash(&mut hasher);
    height.hash(&mut hasher);
    data.hash(&mut hasher);
    hasher.finish()
}
