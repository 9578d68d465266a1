//! Transform-domain correlation kernel using `rustfft`.
//!
//! The zero-mean template is zero-padded to the image size and correlated via
//! `IFFT(FFT(I) * conj(FFT(T')))`. Circular wrap-around never reaches a valid
//! placement because `x + w <= W` and `y + h <= H` there, so no extra padding
//! is needed. Normalization uses the same integral tables as the direct
//! kernels, so flat windows still score exactly 0.

use crate::kernel::scalar::ZnccScalar;
use crate::kernel::{normalize, placement_range, Kernel, ScoreMap, WindowStats};
use crate::template::TemplatePlan;
use crate::util::{ScreenMatchError, ScreenMatchResult};
use crate::ImageView;
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

/// FFT-based zero-mean normalized cross-correlation kernel.
///
/// Faster than the direct kernels once the template covers more than a few
/// hundred pixels; single placements fall back to the scalar kernel.
pub struct ZnccFft;

#[derive(Clone, Copy)]
enum Direction {
    Forward,
    Inverse,
}

fn fft2d(
    planner: &mut FftPlanner<f64>,
    data: &mut [Complex<f64>],
    width: usize,
    height: usize,
    direction: Direction,
) {
    let (row_fft, col_fft) = match direction {
        Direction::Forward => (
            planner.plan_fft_forward(width),
            planner.plan_fft_forward(height),
        ),
        Direction::Inverse => (
            planner.plan_fft_inverse(width),
            planner.plan_fft_inverse(height),
        ),
    };

    for row in data.chunks_mut(width) {
        row_fft.process(row);
    }

    // Columns are transformed as rows of the transposed buffer.
    let mut transposed = vec![Complex::new(0.0, 0.0); width * height];
    for y in 0..height {
        for x in 0..width {
            transposed[x * height + y] = data[y * width + x];
        }
    }
    for col in transposed.chunks_mut(height) {
        col_fft.process(col);
    }
    for x in 0..width {
        for y in 0..height {
            data[y * width + x] = transposed[x * height + y];
        }
    }
}

/// Cross-correlation of the image with the zero-mean template at every shift.
fn correlate(image: ImageView<'_, u8>, plan: &TemplatePlan) -> ScreenMatchResult<Vec<f64>> {
    let width = image.width();
    let height = image.height();
    let len = width
        .checked_mul(height)
        .ok_or(ScreenMatchError::InvalidDimensions { width, height })?;

    let mut img = Vec::with_capacity(len);
    for y in 0..height {
        let row = image.row(y).ok_or_else(|| ScreenMatchError::Match {
            reason: format!("image row {y} unavailable"),
        })?;
        img.extend(row.iter().map(|&v| Complex::new(f64::from(v), 0.0)));
    }

    let mut tpl = vec![Complex::new(0.0, 0.0); len];
    let t_prime = plan.zero_mean();
    for ty in 0..plan.height() {
        for tx in 0..plan.width() {
            tpl[ty * width + tx] = Complex::new(f64::from(t_prime[ty * plan.width() + tx]), 0.0);
        }
    }

    let mut planner = FftPlanner::new();
    fft2d(&mut planner, &mut img, width, height, Direction::Forward);
    fft2d(&mut planner, &mut tpl, width, height, Direction::Forward);
    for (i, t) in img.iter_mut().zip(&tpl) {
        *i *= t.conj();
    }
    fft2d(&mut planner, &mut img, width, height, Direction::Inverse);

    let scale = 1.0 / len as f64;
    Ok(img.into_iter().map(|c| c.re * scale).collect())
}

impl Kernel for ZnccFft {
    fn score_at(
        image: ImageView<'_, u8>,
        plan: &TemplatePlan,
        stats: &WindowStats,
        x: usize,
        y: usize,
    ) -> f32 {
        ZnccScalar::score_at(image, plan, stats, x, y)
    }

    fn score_map(image: ImageView<'_, u8>, plan: &TemplatePlan) -> ScreenMatchResult<ScoreMap> {
        let (max_x, max_y) = placement_range(image, plan)?;
        let (map_w, map_h) = (max_x + 1, max_y + 1);
        let stats = WindowStats::new(image);
        let corr = correlate(image, plan)?;
        let (w, h) = (plan.width(), plan.height());

        let mut data = vec![0.0f32; map_w * map_h];
        for (y, row) in data.chunks_mut(map_w).enumerate() {
            for (x, slot) in row.iter_mut().enumerate() {
                let var_i = stats.window_var(x, y, w, h);
                if var_i > 0.0 {
                    *slot = normalize(corr[y * image.width() + x], plan.var_t(), var_i);
                }
            }
        }
        ScoreMap::new(map_w, map_h, data)
    }
}
