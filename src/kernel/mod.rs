//! Correlation kernel implementations.
//!
//! Every kernel computes the zero-mean normalized cross-correlation
//! (`TM_CCOEFF_NORMED`) between a [`TemplatePlan`] and each valid placement of
//! the template inside an image. Window sums come from exact integer integral
//! images, so flat windows are detected without rounding noise and score 0.

use crate::template::TemplatePlan;
use crate::util::{ScreenMatchError, ScreenMatchResult};
use crate::ImageView;

pub mod scalar;

#[cfg(feature = "simd")]
pub mod simd;

#[cfg(feature = "fft")]
pub mod fft;

#[cfg(feature = "rayon")]
pub mod rayon;

/// Kernel trait for scoring and dense scan operations.
pub trait Kernel {
    /// Computes the score at a single placement (top-left coordinates).
    ///
    /// Returns `f32::NEG_INFINITY` for placements outside the valid range.
    fn score_at(
        image: ImageView<'_, u8>,
        plan: &TemplatePlan,
        stats: &WindowStats,
        x: usize,
        y: usize,
    ) -> f32;

    /// Scores every valid placement and returns the dense surface.
    fn score_map(image: ImageView<'_, u8>, plan: &TemplatePlan) -> ScreenMatchResult<ScoreMap>;
}

/// Dense correlation surface of size `(W - w + 1) x (H - h + 1)`.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoreMap {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl ScoreMap {
    pub(crate) fn new(width: usize, height: usize, data: Vec<f32>) -> ScreenMatchResult<Self> {
        if data.len() != width * height {
            return Err(ScreenMatchError::BufferTooSmall {
                needed: width * height,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Scores in row-major order.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y * self.width + x).copied()
    }

    /// Highest score and its placement; the first in raster order wins ties.
    pub fn peak(&self) -> Option<(usize, usize, f32)> {
        let mut best: Option<(usize, f32)> = None;
        for (idx, &score) in self.data.iter().enumerate() {
            if !score.is_finite() {
                continue;
            }
            match best {
                Some((_, s)) if score <= s => {}
                _ => best = Some((idx, score)),
            }
        }
        best.map(|(idx, score)| (idx % self.width, idx / self.width, score))
    }

    /// Placements scoring at least `threshold`, in raster order.
    pub fn above(&self, threshold: f32) -> impl Iterator<Item = (usize, usize, f32)> + '_ {
        self.data
            .iter()
            .enumerate()
            .filter(move |&(_, &score)| score >= threshold)
            .map(move |(idx, &score)| (idx % self.width, idx / self.width, score))
    }
}

/// Exact integral images of pixel values and squared pixel values.
pub struct WindowStats {
    stride: usize,
    sum: Vec<u64>,
    sum_sq: Vec<u64>,
}

impl WindowStats {
    /// Builds the integral tables for an image view.
    pub fn new(image: ImageView<'_, u8>) -> Self {
        let width = image.width();
        let height = image.height();
        let stride = width + 1;
        let mut sum = vec![0u64; stride * (height + 1)];
        let mut sum_sq = vec![0u64; stride * (height + 1)];
        for y in 0..height {
            let row = image.row(y).unwrap_or(&[]);
            let mut row_sum = 0u64;
            let mut row_sq = 0u64;
            for (x, &value) in row.iter().enumerate() {
                let v = u64::from(value);
                row_sum += v;
                row_sq += v * v;
                let idx = (y + 1) * stride + x + 1;
                sum[idx] = sum[idx - stride] + row_sum;
                sum_sq[idx] = sum_sq[idx - stride] + row_sq;
            }
        }
        Self {
            stride,
            sum,
            sum_sq,
        }
    }

    fn rect(table: &[u64], stride: usize, x: usize, y: usize, w: usize, h: usize) -> u64 {
        let a = table[y * stride + x];
        let b = table[y * stride + x + w];
        let c = table[(y + h) * stride + x];
        let d = table[(y + h) * stride + x + w];
        d + a - b - c
    }

    /// Sum and squared sum of the window at `(x, y)` with size `w x h`.
    pub fn window(&self, x: usize, y: usize, w: usize, h: usize) -> (u64, u64) {
        (
            Self::rect(&self.sum, self.stride, x, y, w, h),
            Self::rect(&self.sum_sq, self.stride, x, y, w, h),
        )
    }

    /// Sum of squared deviations from the mean inside the window.
    pub fn window_var(&self, x: usize, y: usize, w: usize, h: usize) -> f64 {
        let (s, sq) = self.window(x, y, w, h);
        let n = (w * h) as u128;
        let scaled = n * u128::from(sq) - u128::from(s) * u128::from(s);
        scaled as f64 / n as f64
    }
}

/// Converts a zero-mean dot product into a normalized score.
#[inline]
pub(crate) fn normalize(dot: f64, var_t: f64, var_i: f64) -> f32 {
    if var_i <= 0.0 || var_t <= 0.0 {
        return 0.0;
    }
    let score = dot / (var_t * var_i).sqrt();
    if score.is_finite() {
        score as f32
    } else {
        0.0
    }
}

/// Returns the last valid placement `(max_x, max_y)` or an error when the
/// template does not fit.
pub(crate) fn placement_range(
    image: ImageView<'_, u8>,
    plan: &TemplatePlan,
) -> ScreenMatchResult<(usize, usize)> {
    let img_width = image.width();
    let img_height = image.height();
    let tpl_width = plan.width();
    let tpl_height = plan.height();
    if img_width < tpl_width || img_height < tpl_height {
        return Err(ScreenMatchError::RoiOutOfBounds {
            x: 0,
            y: 0,
            width: tpl_width,
            height: tpl_height,
            img_width,
            img_height,
        });
    }
    Ok((img_width - tpl_width, img_height - tpl_height))
}

#[cfg(test)]
mod tests {
    use super::{ScoreMap, WindowStats};
    use crate::ImageView;

    #[test]
    fn window_stats_match_direct_sums() {
        let data: Vec<u8> = (0u8..20).collect();
        let view = ImageView::from_slice(&data, 5, 4).unwrap();
        let stats = WindowStats::new(view);
        let (s, sq) = stats.window(1, 1, 3, 2);
        let values = [6u64, 7, 8, 11, 12, 13];
        assert_eq!(s, values.iter().sum::<u64>());
        assert_eq!(sq, values.iter().map(|v| v * v).sum::<u64>());
    }

    #[test]
    fn flat_window_has_exact_zero_variance() {
        let data = vec![200u8; 64];
        let view = ImageView::from_slice(&data, 8, 8).unwrap();
        let stats = WindowStats::new(view);
        assert_eq!(stats.window_var(2, 3, 4, 4), 0.0);
    }

    #[test]
    fn peak_prefers_first_in_raster_order() {
        let map = ScoreMap::new(3, 2, vec![0.1, 0.9, 0.2, 0.9, 0.3, 0.4]).unwrap();
        assert_eq!(map.peak(), Some((1, 0, 0.9)));
        let above: Vec<_> = map.above(0.35).map(|(x, y, _)| (x, y)).collect();
        assert_eq!(above, vec![(1, 0), (0, 1), (2, 1)]);
    }
}
