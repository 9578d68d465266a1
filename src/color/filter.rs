//! Color filter stage: mask a frame to an HSV range before correlation.

use crate::color::{ColorRange, Hsv};
use crate::frame::Frame;
use crate::trace::trace_debug;
use ::image::{GrayImage, Luma, RgbImage};

/// Binary mask of in-range pixels (255 inside, 0 outside).
#[derive(Clone, Debug)]
pub struct ColorMask {
    mask: GrayImage,
    in_range: usize,
}

impl ColorMask {
    /// Borrow the mask image.
    pub fn image(&self) -> &GrayImage {
        &self.mask
    }

    /// Number of pixels inside the range.
    pub fn in_range(&self) -> usize {
        self.in_range
    }

    /// Fraction of pixels inside the range.
    pub fn coverage(&self) -> f64 {
        let total = u64::from(self.mask.width()) * u64::from(self.mask.height());
        if total == 0 {
            0.0
        } else {
            self.in_range as f64 / total as f64
        }
    }
}

/// Builds the in-range mask for an RGB buffer.
pub fn color_mask(pixels: &RgbImage, range: &ColorRange) -> ColorMask {
    let mut in_range = 0usize;
    let mask = GrayImage::from_fn(pixels.width(), pixels.height(), |x, y| {
        if range.contains(Hsv::from_rgb(pixels.get_pixel(x, y).0)) {
            in_range += 1;
            Luma([255])
        } else {
            Luma([0])
        }
    });
    ColorMask { mask, in_range }
}

/// Returns a copy of `frame` with every out-of-range pixel set to black.
///
/// The input frame is never modified.
pub fn apply_color_filter(frame: &Frame, range: &ColorRange) -> Frame {
    let src = frame.pixels();
    let mask = color_mask(src, range);
    let mut out = src.clone();
    for (dst, m) in out.pixels_mut().zip(mask.image().pixels()) {
        if m.0[0] == 0 {
            dst.0 = [0, 0, 0];
        }
    }
    trace_debug!("color_filter", coverage = mask.coverage());
    frame.with_pixels(out)
}

#[cfg(test)]
mod tests {
    use super::{apply_color_filter, color_mask};
    use crate::color::ColorRange;
    use crate::frame::Frame;
    use ::image::{Rgb, RgbImage};

    fn two_tone() -> RgbImage {
        RgbImage::from_fn(4, 2, |x, _| {
            if x < 2 {
                Rgb([220, 20, 20])
            } else {
                Rgb([20, 20, 220])
            }
        })
    }

    #[test]
    fn mask_counts_in_range_pixels() {
        let red = ColorRange::new([0, 100, 100], [10, 255, 255]).unwrap();
        let mask = color_mask(&two_tone(), &red);
        assert_eq!(mask.in_range(), 4);
        assert!((mask.coverage() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn filter_zeroes_outside_and_keeps_input() {
        let frame = Frame::new(two_tone(), (7, 9)).unwrap();
        let red = ColorRange::new([0, 100, 100], [10, 255, 255]).unwrap();
        let filtered = apply_color_filter(&frame, &red);

        assert_eq!(filtered.pixel(0, 0), Some([220, 20, 20]));
        assert_eq!(filtered.pixel(3, 1), Some([0, 0, 0]));
        assert_eq!(frame.pixel(3, 1), Some([20, 20, 220]));
        assert_eq!(filtered.origin(), (7, 9));
    }
}
