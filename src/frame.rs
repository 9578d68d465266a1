//! Captured rasters and screen-space rectangles.

use crate::image::io::{load_rgb_image, owned_gray_from_rgb};
use crate::image::OwnedImage;
use crate::util::{ScreenMatchError, ScreenMatchResult};
use ::image::RgbImage;
use std::path::Path;
use std::time::SystemTime;

/// Integer rectangle with strictly positive size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RectFields"))]
pub struct Rect {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RectFields {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

#[cfg(feature = "serde")]
impl TryFrom<RectFields> for Rect {
    type Error = ScreenMatchError;

    fn try_from(raw: RectFields) -> ScreenMatchResult<Self> {
        Rect::new(raw.x, raw.y, raw.width, raw.height)
    }
}

impl Rect {
    /// Creates a rectangle, rejecting zero width or height.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> ScreenMatchResult<Self> {
        if width == 0 || height == 0 {
            return Err(ScreenMatchError::InvalidRect { width, height });
        }
        Ok(Self {
            x,
            y,
            width,
            height,
        })
    }

    pub fn x(&self) -> u32 {
        self.x
    }

    pub fn y(&self) -> u32 {
        self.y
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u64 {
        u64::from(self.x) + u64::from(self.width)
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u64 {
        u64::from(self.y) + u64::from(self.height)
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Center point, rounded down.
    pub fn center(&self) -> (u64, u64) {
        (
            u64::from(self.x) + u64::from(self.width) / 2,
            u64::from(self.y) + u64::from(self.height) / 2,
        )
    }

    /// Area shared with `other` (zero when disjoint or merely touching).
    pub fn intersection_area(&self, other: &Rect) -> u64 {
        let x0 = self.x.max(other.x) as u64;
        let y0 = self.y.max(other.y) as u64;
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        if x1 > x0 && y1 > y0 {
            (x1 - x0) * (y1 - y0)
        } else {
            0
        }
    }

    /// Intersection area divided by the smaller of the two areas.
    ///
    /// Unlike IoU this is asymmetric in effect: a box fully inside a larger one
    /// always scores 1.0.
    pub fn overlap_ratio(&self, other: &Rect) -> f64 {
        let inter = self.intersection_area(other);
        if inter == 0 {
            return 0.0;
        }
        inter as f64 / self.area().min(other.area()) as f64
    }

    /// Returns `true` when `other` lies fully inside `self`.
    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Shifts the rectangle by a non-negative offset.
    pub fn translated(&self, dx: u32, dy: u32) -> ScreenMatchResult<Rect> {
        let x = self
            .x
            .checked_add(dx)
            .ok_or(ScreenMatchError::InvalidInput("rect offset overflows"))?;
        let y = self
            .y
            .checked_add(dy)
            .ok_or(ScreenMatchError::InvalidInput("rect offset overflows"))?;
        Rect::new(x, y, self.width, self.height)
    }
}

/// Immutable RGB raster with a screen-space origin and capture time.
#[derive(Clone, Debug)]
pub struct Frame {
    pixels: RgbImage,
    origin: (u32, u32),
    captured_at: SystemTime,
}

impl Frame {
    /// Wraps a raster captured at `origin` in screen space.
    pub fn new(pixels: RgbImage, origin: (u32, u32)) -> ScreenMatchResult<Self> {
        if pixels.width() == 0 || pixels.height() == 0 {
            return Err(ScreenMatchError::InvalidDimensions {
                width: pixels.width() as usize,
                height: pixels.height() as usize,
            });
        }
        Ok(Self {
            pixels,
            origin,
            captured_at: SystemTime::now(),
        })
    }

    /// Wraps a raster whose top-left corner is the screen origin.
    pub fn from_rgb(pixels: RgbImage) -> ScreenMatchResult<Self> {
        Self::new(pixels, (0, 0))
    }

    /// Loads a frame from a raster file.
    pub fn open<P: AsRef<Path>>(path: P) -> ScreenMatchResult<Self> {
        Self::from_rgb(load_rgb_image(path)?)
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Number of interleaved color channels (always RGB).
    pub fn channels(&self) -> usize {
        3
    }

    /// Screen-space position of the top-left pixel.
    pub fn origin(&self) -> (u32, u32) {
        self.origin
    }

    pub fn captured_at(&self) -> SystemTime {
        self.captured_at
    }

    /// Borrow the underlying RGB buffer.
    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }

    /// Returns the RGB value at frame-local `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        self.pixels.get_pixel_checked(x, y).map(|p| p.0)
    }

    /// Grayscale copy used by the correlation stages.
    pub fn to_gray(&self) -> ScreenMatchResult<OwnedImage> {
        owned_gray_from_rgb(&self.pixels)
    }

    /// Builds a new frame with the same origin and timestamp but new pixels.
    pub(crate) fn with_pixels(&self, pixels: RgbImage) -> Self {
        Self {
            pixels,
            origin: self.origin,
            captured_at: self.captured_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Rect;
    use crate::util::ScreenMatchError;

    #[test]
    fn rect_rejects_empty_size() {
        assert_eq!(
            Rect::new(1, 2, 0, 5).unwrap_err(),
            ScreenMatchError::InvalidRect {
                width: 0,
                height: 5
            }
        );
    }

    #[test]
    fn overlap_ratio_uses_smaller_area() {
        let big = Rect::new(0, 0, 100, 100).unwrap();
        let small = Rect::new(10, 10, 10, 10).unwrap();
        assert!((small.overlap_ratio(&big) - 1.0).abs() < 1e-12);
        assert!((big.overlap_ratio(&small) - 1.0).abs() < 1e-12);
        assert!(big.contains(&small));
    }

    #[test]
    fn touching_rects_do_not_overlap() {
        let a = Rect::new(0, 0, 10, 10).unwrap();
        let b = Rect::new(10, 0, 10, 10).unwrap();
        assert_eq!(a.intersection_area(&b), 0);
        assert_eq!(a.overlap_ratio(&b), 0.0);
    }

    #[test]
    fn partial_overlap() {
        let a = Rect::new(0, 0, 10, 10).unwrap();
        let b = Rect::new(5, 0, 10, 20).unwrap();
        assert_eq!(a.intersection_area(&b), 50);
        assert!((a.overlap_ratio(&b) - 0.5).abs() < 1e-12);
    }
}
