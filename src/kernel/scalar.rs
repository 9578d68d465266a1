//! Scalar reference kernel for score evaluation.

use crate::kernel::{normalize, placement_range, Kernel, ScoreMap, WindowStats};
use crate::template::TemplatePlan;
use crate::util::ScreenMatchResult;
use crate::ImageView;

/// Scalar zero-mean normalized cross-correlation kernel.
///
/// Accumulates the dot product in `f64`; this is the reference the other
/// kernels are validated against.
pub struct ZnccScalar;

impl ZnccScalar {
    #[inline]
    fn dot_at(image: ImageView<'_, u8>, plan: &TemplatePlan, x: usize, y: usize) -> f64 {
        let tpl_width = plan.width();
        let t_prime = plan.zero_mean();
        let mut dot = 0.0f64;
        for ty in 0..plan.height() {
            let img_row = match image.row(y + ty) {
                Some(row) => &row[x..x + tpl_width],
                None => return 0.0,
            };
            let tpl_row = &t_prime[ty * tpl_width..(ty + 1) * tpl_width];
            for (&t, &value) in tpl_row.iter().zip(img_row) {
                dot += f64::from(t) * f64::from(value);
            }
        }
        dot
    }

    /// Scores one row of placements into `out`.
    pub(crate) fn score_row(
        image: ImageView<'_, u8>,
        plan: &TemplatePlan,
        stats: &WindowStats,
        y: usize,
        out: &mut [f32],
    ) {
        let (w, h) = (plan.width(), plan.height());
        for (x, slot) in out.iter_mut().enumerate() {
            let var_i = stats.window_var(x, y, w, h);
            *slot = if var_i <= 0.0 {
                0.0
            } else {
                normalize(Self::dot_at(image, plan, x, y), plan.var_t(), var_i)
            };
        }
    }
}

impl Kernel for ZnccScalar {
    fn score_at(
        image: ImageView<'_, u8>,
        plan: &TemplatePlan,
        stats: &WindowStats,
        x: usize,
        y: usize,
    ) -> f32 {
        let Ok((max_x, max_y)) = placement_range(image, plan) else {
            return f32::NEG_INFINITY;
        };
        if x > max_x || y > max_y {
            return f32::NEG_INFINITY;
        }
        let var_i = stats.window_var(x, y, plan.width(), plan.height());
        normalize(Self::dot_at(image, plan, x, y), plan.var_t(), var_i)
    }

    fn score_map(image: ImageView<'_, u8>, plan: &TemplatePlan) -> ScreenMatchResult<ScoreMap> {
        let (max_x, max_y) = placement_range(image, plan)?;
        let (map_w, map_h) = (max_x + 1, max_y + 1);
        let stats = WindowStats::new(image);
        let mut data = vec![0.0f32; map_w * map_h];
        for (y, row) in data.chunks_mut(map_w).enumerate() {
            Self::score_row(image, plan, &stats, y, row);
        }
        ScoreMap::new(map_w, map_h, data)
    }
}

#[cfg(test)]
mod tests {
    use super::ZnccScalar;
    use crate::kernel::{Kernel, WindowStats};
    use crate::template::TemplatePlan;
    use crate::ImageView;

    #[test]
    fn exact_patch_scores_one() {
        let data: Vec<u8> = (0..100).map(|i| ((i * 37) % 251) as u8).collect();
        let image = ImageView::from_slice(&data, 10, 10).unwrap();
        let patch = image.roi(3, 4, 4, 3).unwrap();
        let plan = TemplatePlan::from_view(patch).unwrap();
        let stats = WindowStats::new(image);
        let score = ZnccScalar::score_at(image, &plan, &stats, 3, 4);
        assert!((score - 1.0).abs() < 1e-5, "score {score}");
    }

    #[test]
    fn inverted_patch_scores_minus_one() {
        let tpl: Vec<u8> = vec![0, 255, 0, 255];
        let img: Vec<u8> = vec![255, 0, 255, 0];
        let plan = TemplatePlan::from_view(ImageView::from_slice(&tpl, 2, 2).unwrap()).unwrap();
        let image = ImageView::from_slice(&img, 2, 2).unwrap();
        let map = ZnccScalar::score_map(image, &plan).unwrap();
        assert_eq!((map.width(), map.height()), (1, 1));
        assert!((map.get(0, 0).unwrap() + 1.0).abs() < 1e-6);
    }

    #[test]
    fn out_of_range_placement_is_negative_infinity() {
        let data = vec![1u8, 2, 3, 4, 5, 6, 7, 8, 9];
        let image = ImageView::from_slice(&data, 3, 3).unwrap();
        let plan = TemplatePlan::from_view(image.roi(0, 0, 2, 2).unwrap()).unwrap();
        let stats = WindowStats::new(image);
        assert_eq!(
            ZnccScalar::score_at(image, &plan, &stats, 2, 0),
            f32::NEG_INFINITY
        );
    }
}
