//! Conversions to and from the `image` crate and raster file I/O.

use crate::image::{ImageView, OwnedImage};
use crate::util::{ScreenMatchError, ScreenMatchResult};
use ::image::{GrayImage, RgbImage};
use std::path::Path;

/// Creates a borrowed view from a grayscale image buffer.
pub fn view_from_gray_image(img: &GrayImage) -> ScreenMatchResult<ImageView<'_, u8>> {
    let width = img.width() as usize;
    let height = img.height() as usize;
    ImageView::from_slice(img.as_raw(), width, height)
}

/// Creates an owned image from a grayscale image buffer.
pub fn owned_from_gray_image(img: &GrayImage) -> ScreenMatchResult<OwnedImage> {
    let width = img.width() as usize;
    let height = img.height() as usize;
    OwnedImage::new(img.as_raw().clone(), width, height)
}

/// Converts an owned grayscale buffer back into an `image` buffer.
pub fn gray_image_from_owned(img: &OwnedImage) -> ScreenMatchResult<GrayImage> {
    GrayImage::from_raw(img.width() as u32, img.height() as u32, img.data().to_vec()).ok_or(
        ScreenMatchError::BufferTooSmall {
            needed: img.width() * img.height(),
            got: img.data().len(),
        },
    )
}

/// Converts an RGB buffer to an owned grayscale image (luma weights).
pub fn owned_gray_from_rgb(img: &RgbImage) -> ScreenMatchResult<OwnedImage> {
    let gray = ::image::imageops::grayscale(img);
    owned_from_gray_image(&gray)
}

/// Loads a raster file from disk as RGB.
///
/// Missing, unreadable, or undecodable files map to
/// [`ScreenMatchError::Load`].
pub fn load_rgb_image<P: AsRef<Path>>(path: P) -> ScreenMatchResult<RgbImage> {
    let path = path.as_ref();
    let img = ::image::open(path).map_err(|err| ScreenMatchError::load(path, err))?;
    let rgb = img.to_rgb8();
    if rgb.width() == 0 || rgb.height() == 0 {
        return Err(ScreenMatchError::load(path, "image has no pixels"));
    }
    Ok(rgb)
}

/// Loads an image from disk and converts it to a grayscale owned image.
pub fn load_gray_image<P: AsRef<Path>>(path: P) -> ScreenMatchResult<OwnedImage> {
    let rgb = load_rgb_image(path)?;
    owned_gray_from_rgb(&rgb)
}
