//! Rayon-parallel kernels (feature-gated).
//!
//! Row-parallel dense scan for the direct kernel; each task scores one row of
//! placements, so the result is identical to the sequential scalar kernel.

use crate::kernel::scalar::ZnccScalar;
use crate::kernel::{placement_range, ScoreMap, WindowStats};
use crate::template::TemplatePlan;
use crate::util::ScreenMatchResult;
use crate::ImageView;
use rayon::prelude::*;

/// Row-parallel full scan for the scalar correlation kernel.
pub fn zncc_score_map_par(
    image: ImageView<'_, u8>,
    plan: &TemplatePlan,
) -> ScreenMatchResult<ScoreMap> {
    let (max_x, max_y) = placement_range(image, plan)?;
    let (map_w, map_h) = (max_x + 1, max_y + 1);
    let stats = WindowStats::new(image);
    let mut data = vec![0.0f32; map_w * map_h];

    data.par_chunks_mut(map_w)
        .enumerate()
        .for_each(|(y, row)| ZnccScalar::score_row(image, plan, &stats, y, row));

    ScoreMap::new(map_w, map_h, data)
}
