//! Contour extraction and shape classification.
//!
//! Grayscale input is binarized (values above 127 are foreground), external
//! contours are traced with `imageproc`, and the largest one by enclosed area
//! stands for the whole image.

use crate::ImageView;
use ::image::{GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType};
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use imageproc::point::Point;
use std::f64::consts::PI;

pub mod moments;
pub mod verify;

pub use moments::{match_shapes_i1, HuMoments};
pub use verify::ShapeVerifier;

/// Foreground cut-off for binarization.
pub const BINARY_THRESHOLD: u8 = 127;
/// Circularity above which a contour is a circle.
pub const CIRCLE_CIRCULARITY: f64 = 0.8;
/// Polygon approximation tolerance as a fraction of the perimeter.
pub const APPROX_EPSILON_RATIO: f64 = 0.04;

/// Closed contour as traced boundary pixels.
pub type Contour = Vec<Point<i32>>;

/// Coarse geometric class of a contour.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ShapeClass {
    Circle,
    Triangle,
    Square,
    Rectangle,
    Polygon,
}

/// Geometric summary of the dominant contour of an image.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ShapeDescriptor {
    pub class: ShapeClass,
    /// Vertices of the polygon approximation (0 when no contour exists).
    pub vertices: usize,
    pub area: f64,
    pub perimeter: f64,
    /// `4 * pi * area / perimeter^2`, clamped to `[0, 1]`.
    pub circularity: f64,
}

impl ShapeDescriptor {
    /// Descriptor for an image without any foreground contour.
    pub fn empty() -> Self {
        Self {
            class: ShapeClass::Polygon,
            vertices: 0,
            area: 0.0,
            perimeter: 0.0,
            circularity: 0.0,
        }
    }

    /// Measures and classifies a contour.
    pub fn from_contour(contour: &[Point<i32>]) -> Self {
        if contour.is_empty() {
            return Self::empty();
        }
        let area = contour_area(contour);
        let perimeter = arc_length(contour, true);
        let circularity = if perimeter > 0.0 {
            (4.0 * PI * area / (perimeter * perimeter)).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let approx = if perimeter > 0.0 && contour.len() >= 3 {
            approximate(contour, APPROX_EPSILON_RATIO * perimeter)
        } else {
            contour.to_vec()
        };
        let vertices = approx.len();
        let class = if circularity > CIRCLE_CIRCULARITY {
            ShapeClass::Circle
        } else {
            match vertices {
                3 => ShapeClass::Triangle,
                4 => {
                    let ratio = aspect_ratio(&approx);
                    if (0.9..=1.1).contains(&ratio) {
                        ShapeClass::Square
                    } else {
                        ShapeClass::Rectangle
                    }
                }
                _ => ShapeClass::Polygon,
            }
        };

        Self {
            class,
            vertices,
            area,
            perimeter,
            circularity,
        }
    }
}

/// Binarizes a grayscale view into a 0/255 mask.
pub fn binarize(view: ImageView<'_, u8>) -> GrayImage {
    GrayImage::from_fn(view.width() as u32, view.height() as u32, |x, y| {
        match view.get(x as usize, y as usize) {
            Some(&v) if v > BINARY_THRESHOLD => Luma([255]),
            _ => Luma([0]),
        }
    })
}

/// Outer contours that are not nested inside another contour.
pub fn external_contours(view: ImageView<'_, u8>) -> Vec<Contour> {
    find_contours::<i32>(&binarize(view))
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| c.points)
        .collect()
}

/// Largest external contour by enclosed area; the first wins ties.
pub fn dominant_contour(view: ImageView<'_, u8>) -> Option<Contour> {
    let mut best: Option<(f64, Contour)> = None;
    for contour in external_contours(view) {
        let area = contour_area(&contour);
        match &best {
            Some((best_area, _)) if area <= *best_area => {}
            _ => best = Some((area, contour)),
        }
    }
    best.map(|(_, contour)| contour)
}

/// Area enclosed by a closed polygon (shoelace formula).
pub fn contour_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut twice = 0i64;
    for (i, p) in points.iter().enumerate() {
        let q = &points[(i + 1) % points.len()];
        twice += i64::from(p.x) * i64::from(q.y) - i64::from(q.x) * i64::from(p.y);
    }
    (twice as f64 / 2.0).abs()
}

fn approximate(contour: &[Point<i32>], epsilon: f64) -> Vec<Point<i32>> {
    let mut approx = approximate_polygon_dp(contour, epsilon, true);
    if approx.len() > 1 && approx.first() == approx.last() {
        approx.pop();
    }
    approx
}

/// Bounding-box width over height in whole pixels.
fn aspect_ratio(points: &[Point<i32>]) -> f64 {
    let (mut min_x, mut min_y) = (i32::MAX, i32::MAX);
    let (mut max_x, mut max_y) = (i32::MIN, i32::MIN);
    for p in points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    let width = f64::from(max_x - min_x + 1);
    let height = f64::from(max_y - min_y + 1);
    width / height
}

#[cfg(test)]
mod tests {
    use super::{contour_area, dominant_contour, ShapeClass, ShapeDescriptor};
    use crate::image::OwnedImage;
    use imageproc::point::Point;

    fn canvas(width: usize, height: usize, fill: impl Fn(usize, usize) -> bool) -> OwnedImage {
        let mut data = vec![0u8; width * height];
        for y in 0..height {
            for x in 0..width {
                if fill(x, y) {
                    data[y * width + x] = 255;
                }
            }
        }
        OwnedImage::new(data, width, height).unwrap()
    }

    #[test]
    fn shoelace_area_of_axis_square() {
        let square = [
            Point::new(0, 0),
            Point::new(10, 0),
            Point::new(10, 10),
            Point::new(0, 10),
        ];
        assert_eq!(contour_area(&square), 100.0);
        assert_eq!(contour_area(&square[..2]), 0.0);
    }

    #[test]
    fn dominant_contour_prefers_larger_blob() {
        let img = canvas(60, 30, |x, y| {
            let small = (2..8).contains(&x) && (2..8).contains(&y);
            let large = (20..50).contains(&x) && (5..25).contains(&y);
            small || large
        });
        let contour = dominant_contour(img.view()).expect("contour");
        assert!(contour.iter().all(|p| p.x >= 20 && p.y >= 5));
    }

    #[test]
    fn blank_image_has_no_contour() {
        let img = canvas(16, 16, |_, _| false);
        assert!(dominant_contour(img.view()).is_none());
    }

    #[test]
    fn filled_square_is_classified_square() {
        let img = canvas(50, 50, |x, y| (10..40).contains(&x) && (10..40).contains(&y));
        let contour = dominant_contour(img.view()).unwrap();
        let desc = ShapeDescriptor::from_contour(&contour);
        assert_eq!(desc.class, ShapeClass::Square);
        assert_eq!(desc.vertices, 4);
        assert!(desc.circularity < 0.8);
    }

    #[test]
    fn single_pixel_contour_is_degenerate_polygon() {
        let img = canvas(8, 8, |x, y| x == 3 && y == 4);
        let contour = dominant_contour(img.view()).unwrap();
        let desc = ShapeDescriptor::from_contour(&contour);
        assert_eq!(desc.class, ShapeClass::Polygon);
        assert_eq!(desc.vertices, contour.len());
        assert_eq!(desc.perimeter, 0.0);
        assert_eq!(desc.circularity, 0.0);
    }

    #[test]
    fn wide_bar_is_classified_rectangle() {
        let img = canvas(80, 40, |x, y| (5..75).contains(&x) && (15..25).contains(&y));
        let contour = dominant_contour(img.view()).unwrap();
        assert_eq!(
            ShapeDescriptor::from_contour(&contour).class,
            ShapeClass::Rectangle
        );
    }
}
