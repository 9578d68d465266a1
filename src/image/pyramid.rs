//! Scale ladder of resized templates.
//!
//! Each rung holds the template resized by one factor of a linear sweep. Sizes
//! are `floor(w * s) x floor(h * s)`; resampling is bilinear (`Triangle`). The
//! identity factor reuses the original pixels. Rungs that would exceed the
//! frame or collapse to zero size are recorded as skipped so callers can still
//! report them.

use crate::image::io::{gray_image_from_owned, owned_from_gray_image};
use crate::image::OwnedImage;
use crate::util::math::linspace_scales;
use crate::util::ScreenMatchResult;
use ::image::imageops::{self, FilterType};

/// Why a scale was not evaluated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// The resized template is larger than the frame in some dimension.
    ExceedsFrame,
    /// The resized template has zero width or height.
    Collapsed,
}

/// One rung of the ladder.
#[derive(Clone, Debug)]
pub struct ScaleLevel {
    /// Position in the scale enumeration (ascending sweep order).
    pub index: usize,
    /// Resize factor applied to the template.
    pub scale: f32,
    /// Target width after resizing.
    pub width: usize,
    /// Target height after resizing.
    pub height: usize,
    /// Resized template, or why the rung was skipped.
    pub image: Result<OwnedImage, SkipReason>,
}

/// Resized template variants for a single frame size.
pub struct ScalePyramid {
    levels: Vec<ScaleLevel>,
}

impl ScalePyramid {
    /// Builds rungs for `steps` factors in `[min, max]` against a frame size.
    pub fn build(
        template: &OwnedImage,
        min: f32,
        max: f32,
        steps: usize,
        frame_width: usize,
        frame_height: usize,
    ) -> ScreenMatchResult<Self> {
        let scales = linspace_scales(min, max, steps);
        let mut levels = Vec::with_capacity(scales.len());
        for (index, scale) in scales.into_iter().enumerate() {
            let width = (template.width() as f32 * scale) as usize;
            let height = (template.height() as f32 * scale) as usize;
            let image = if width > frame_width || height > frame_height {
                Err(SkipReason::ExceedsFrame)
            } else if width == 0 || height == 0 {
                Err(SkipReason::Collapsed)
            } else {
                Ok(resize_gray(template, scale, width, height)?)
            };
            levels.push(ScaleLevel {
                index,
                scale,
                width,
                height,
                image,
            });
        }
        Ok(Self { levels })
    }

    /// Returns all rungs in sweep order.
    pub fn levels(&self) -> &[ScaleLevel] {
        &self.levels
    }

    /// Consumes the ladder and returns its rungs.
    pub fn into_levels(self) -> Vec<ScaleLevel> {
        self.levels
    }
}

fn resize_gray(
    template: &OwnedImage,
    scale: f32,
    width: usize,
    height: usize,
) -> ScreenMatchResult<OwnedImage> {
    if scale == 1.0 {
        return Ok(template.clone());
    }
    let src = gray_image_from_owned(template)?;
    let resized = imageops::resize(&src, width as u32, height as u32, FilterType::Triangle);
    owned_from_gray_image(&resized)
}
