//! Template plan precomputation for zero-mean normalized correlation.

use crate::image::ImageView;
use crate::util::{ScreenMatchError, ScreenMatchResult};

/// Precomputed statistics and zero-mean buffer for template matching.
///
/// `var_t` is the sum of squared deviations, so the correlation at a window
/// `I` is `sum(t' * I) / sqrt(var_t * var_i)` with `var_i` defined the same way.
#[derive(Clone, Debug)]
pub struct TemplatePlan {
    width: usize,
    height: usize,
    var_t: f64,
    zero_mean: Vec<f32>,
}

impl TemplatePlan {
    /// Builds a plan from a template view.
    ///
    /// Returns [`ScreenMatchError::DegenerateTemplate`] for flat templates.
    pub fn from_view(tpl: ImageView<'_, u8>) -> ScreenMatchResult<Self> {
        let width = tpl.width();
        let height = tpl.height();
        let count = width
            .checked_mul(height)
            .ok_or(ScreenMatchError::InvalidDimensions { width, height })?;

        let mut sum = 0.0f64;
        let mut sum_sq = 0.0f64;
        for y in 0..height {
            let row = template_row(tpl, y)?;
            for &value in row {
                let v = value as f64;
                sum += v;
                sum_sq += v * v;
            }
        }

        let count_f = count as f64;
        let mean_f64 = sum / count_f;
        let variance = sum_sq / count_f - mean_f64 * mean_f64;
        if variance <= 1e-8 {
            return Err(ScreenMatchError::DegenerateTemplate {
                reason: "zero variance",
            });
        }

        let mut zero_mean = Vec::with_capacity(count);
        let mut var_t = 0.0f64;
        for y in 0..height {
            for &value in template_row(tpl, y)? {
                let d = value as f64 - mean_f64;
                var_t += d * d;
                zero_mean.push(d as f32);
            }
        }

        Ok(Self {
            width,
            height,
            var_t,
            zero_mean,
        })
    }

    /// Returns the template width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the template height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the number of template pixels.
    pub fn len(&self) -> usize {
        self.zero_mean.len()
    }

    /// Always `false`; plans are never built from empty templates.
    pub fn is_empty(&self) -> bool {
        self.zero_mean.is_empty()
    }

    /// Returns the sum of squared deviations from the mean.
    pub fn var_t(&self) -> f64 {
        self.var_t
    }

    /// Returns the zero-mean template buffer in row-major order.
    pub fn zero_mean(&self) -> &[f32] {
        &self.zero_mean
    }
}

fn template_row<'a>(tpl: ImageView<'a, u8>, y: usize) -> ScreenMatchResult<&'a [u8]> {
    tpl.row(y).ok_or_else(|| ScreenMatchError::BufferTooSmall {
        needed: (y + 1)
            .checked_mul(tpl.stride())
            .and_then(|v| v.checked_add(tpl.width()))
            .unwrap_or(usize::MAX),
        got: tpl.as_slice().len(),
    })
}
