//! Perceptual color space helpers.
//!
//! HSV uses the 8-bit convention common to screen automation tooling: hue in
//! `0..=179` (degrees halved), saturation and value in `0..=255`.

use crate::util::math::clamp_channel;
use crate::util::{ScreenMatchError, ScreenMatchResult};

pub mod filter;

pub use filter::{apply_color_filter, color_mask, ColorMask};

/// Largest hue value in the 8-bit HSV convention.
pub const HUE_MAX: u8 = 179;

/// Fixed per-channel tolerance used by the automatic color filter.
pub const AUTO_TOLERANCE: [u8; 3] = [20, 50, 50];

/// HSV triple in the 8-bit convention.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Hsv {
    pub h: u8,
    pub s: u8,
    pub v: u8,
}

impl Hsv {
    /// Converts an RGB pixel.
    pub fn from_rgb([r, g, b]: [u8; 3]) -> Self {
        let (rf, gf, bf) = (f32::from(r), f32::from(g), f32::from(b));
        let max = rf.max(gf).max(bf);
        let min = rf.min(gf).min(bf);
        let delta = max - min;

        let s = if max > 0.0 { delta * 255.0 / max } else { 0.0 };
        let mut h = if delta <= 0.0 {
            0.0
        } else if max == rf {
            60.0 * (gf - bf) / delta
        } else if max == gf {
            120.0 + 60.0 * (bf - rf) / delta
        } else {
            240.0 + 60.0 * (rf - gf) / delta
        };
        if h < 0.0 {
            h += 360.0;
        }

        Self {
            h: ((h / 2.0).round() as u32 % 180) as u8,
            s: s.round().clamp(0.0, 255.0) as u8,
            v: max as u8,
        }
    }

    /// Channels as an array `[h, s, v]`.
    pub fn to_array(self) -> [u8; 3] {
        [self.h, self.s, self.v]
    }
}

/// Inclusive HSV bounds defining a binary mask.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "ColorRangeBounds"))]
pub struct ColorRange {
    lower: [u8; 3],
    upper: [u8; 3],
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct ColorRangeBounds {
    lower: [u8; 3],
    upper: [u8; 3],
}

#[cfg(feature = "serde")]
impl TryFrom<ColorRangeBounds> for ColorRange {
    type Error = ScreenMatchError;

    fn try_from(raw: ColorRangeBounds) -> ScreenMatchResult<Self> {
        ColorRange::new(raw.lower, raw.upper)
    }
}

impl ColorRange {
    /// Creates a range, validating channel order and the hue bound.
    pub fn new(lower: [u8; 3], upper: [u8; 3]) -> ScreenMatchResult<Self> {
        if lower.iter().zip(&upper).any(|(lo, hi)| lo > hi) {
            return Err(ScreenMatchError::InvalidInput(
                "color range lower bound exceeds upper bound",
            ));
        }
        if upper[0] > HUE_MAX {
            return Err(ScreenMatchError::InvalidInput("hue bound exceeds 179"));
        }
        Ok(Self { lower, upper })
    }

    /// Builds `center ± tolerance`, clamped per channel.
    pub fn around(center: [f64; 3], tolerance: [f64; 3]) -> Self {
        let maxima = [HUE_MAX, 255, 255];
        let mut lower = [0u8; 3];
        let mut upper = [0u8; 3];
        for c in 0..3 {
            lower[c] = clamp_channel(center[c] - tolerance[c], 0, maxima[c]);
            upper[c] = clamp_channel(center[c] + tolerance[c], 0, maxima[c]);
        }
        Self { lower, upper }
    }

    /// Range used by the automatic filter: mean HSV ± [`AUTO_TOLERANCE`].
    pub fn auto_from_mean(mean_hsv: [f64; 3]) -> Self {
        Self::around(mean_hsv, AUTO_TOLERANCE.map(f64::from))
    }

    pub fn lower(&self) -> [u8; 3] {
        self.lower
    }

    pub fn upper(&self) -> [u8; 3] {
        self.upper
    }

    /// Returns `true` when every channel lies within the bounds.
    pub fn contains(&self, hsv: Hsv) -> bool {
        let px = hsv.to_array();
        (0..3).all(|c| px[c] >= self.lower[c] && px[c] <= self.upper[c])
    }
}

#[cfg(test)]
mod tests {
    use super::{ColorRange, Hsv};

    #[test]
    fn primaries_map_to_expected_hues() {
        assert_eq!(Hsv::from_rgb([255, 0, 0]), Hsv { h: 0, s: 255, v: 255 });
        assert_eq!(Hsv::from_rgb([0, 255, 0]), Hsv { h: 60, s: 255, v: 255 });
        assert_eq!(Hsv::from_rgb([0, 0, 255]), Hsv { h: 120, s: 255, v: 255 });
        assert_eq!(Hsv::from_rgb([0, 0, 0]), Hsv { h: 0, s: 0, v: 0 });
        assert_eq!(Hsv::from_rgb([128, 128, 128]).s, 0);
    }

    #[test]
    fn range_rejects_inverted_bounds() {
        assert!(ColorRange::new([10, 0, 0], [5, 255, 255]).is_err());
        assert!(ColorRange::new([0, 0, 0], [180, 255, 255]).is_err());
        assert!(ColorRange::new([0, 0, 0], [179, 255, 255]).is_ok());
    }

    #[test]
    fn around_clamps_each_channel() {
        let range = ColorRange::around([5.0, 240.0, 100.0], [20.0, 50.0, 50.0]);
        assert_eq!(range.lower(), [0, 190, 50]);
        assert_eq!(range.upper(), [25, 255, 150]);
        assert!(range.contains(Hsv { h: 0, s: 200, v: 60 }));
        assert!(!range.contains(Hsv { h: 26, s: 200, v: 60 }));
    }
}
