//! Single-scale correlation scan.
//!
//! Scores every placement of a grayscale template inside a grayscale frame
//! and turns threshold-passing positions into candidates in raster order.

use crate::candidate::MatchCandidate;
use crate::frame::Rect;
use crate::kernel::{Kernel, ScoreMap};
use crate::search::KernelKind;
use crate::template::TemplatePlan;
use crate::trace::trace_debug;
use crate::util::{ScreenMatchError, ScreenMatchResult};
use crate::ImageView;

#[cfg(not(feature = "simd"))]
use crate::kernel::scalar::ZnccScalar as ZnccDirect;
#[cfg(feature = "simd")]
use crate::kernel::simd::ZnccSimd as ZnccDirect;

/// Candidates from one scale plus the surface peak.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScanResult {
    /// Threshold-passing placements in raster order.
    pub candidates: Vec<MatchCandidate>,
    /// Highest clamped score on the surface, `None` when nothing was scored.
    pub peak: Option<f32>,
}

/// Correlation matcher at one fixed template scale.
#[derive(Clone, Copy, Debug)]
pub struct CorrelationMatcher {
    kernel: KernelKind,
    parallel: bool,
}

impl Default for CorrelationMatcher {
    fn default() -> Self {
        Self::new(KernelKind::Auto)
    }
}

impl CorrelationMatcher {
    pub fn new(kernel: KernelKind) -> Self {
        Self {
            kernel,
            parallel: false,
        }
    }

    /// Enables the row-parallel direct kernel (requires the `rayon` feature).
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn kernel(&self) -> KernelKind {
        self.kernel
    }

    pub fn parallel(&self) -> bool {
        self.parallel
    }

    /// Computes the correlation surface.
    ///
    /// Returns `Ok(None)` when the template is at least as large as the frame
    /// in either dimension or has no contrast to correlate.
    pub fn score_map(
        &self,
        frame: ImageView<'_, u8>,
        template: ImageView<'_, u8>,
    ) -> ScreenMatchResult<Option<ScoreMap>> {
        if template.width() >= frame.width() || template.height() >= frame.height() {
            return Ok(None);
        }
        let plan = match TemplatePlan::from_view(template) {
            Ok(plan) => plan,
            Err(ScreenMatchError::DegenerateTemplate { .. }) => return Ok(None),
            Err(err) => return Err(err),
        };
        self.dispatch(frame, &plan).map(Some)
    }

    /// Scores the frame and collects every placement at or above `threshold`.
    ///
    /// `scale` is recorded on each candidate and does not affect scoring.
    pub fn scan(
        &self,
        frame: ImageView<'_, u8>,
        template: ImageView<'_, u8>,
        threshold: f32,
        scale: f32,
    ) -> ScreenMatchResult<ScanResult> {
        let Some(map) = self.score_map(frame, template)? else {
            return Ok(ScanResult::default());
        };
        let width = template.width() as u32;
        let height = template.height() as u32;

        let mut candidates = Vec::new();
        for (x, y, score) in map.above(threshold) {
            let rect = Rect::new(x as u32, y as u32, width, height)?;
            candidates.push(MatchCandidate::new(rect, score.clamp(0.0, 1.0), scale));
        }
        let peak = map.peak().map(|(_, _, score)| score.clamp(0.0, 1.0));

        trace_debug!(
            "scale_scan",
            scale = scale,
            candidates = candidates.len(),
            peak = peak.unwrap_or(0.0)
        );
        Ok(ScanResult { candidates, peak })
    }

    fn dispatch(
        &self,
        frame: ImageView<'_, u8>,
        plan: &TemplatePlan,
    ) -> ScreenMatchResult<ScoreMap> {
        let kind = self.kernel.resolve(
            (frame.width(), frame.height()),
            (plan.width(), plan.height()),
        );
        match kind {
            KernelKind::Auto | KernelKind::Direct => {
                #[cfg(feature = "rayon")]
                if self.parallel {
                    return crate::kernel::rayon::zncc_score_map_par(frame, plan);
                }
                <ZnccDirect as Kernel>::score_map(frame, plan)
            }
            KernelKind::Fft => {
                #[cfg(feature = "fft")]
                {
                    <crate::kernel::fft::ZnccFft as Kernel>::score_map(frame, plan)
                }
                #[cfg(not(feature = "fft"))]
                {
                    Err(ScreenMatchError::InvalidInput(
                        "fft kernel requires the `fft` feature",
                    ))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CorrelationMatcher;
    use crate::image::OwnedImage;
    use crate::search::KernelKind;

    fn textured(width: usize, height: usize) -> OwnedImage {
        let data = (0..width * height)
            .map(|i| ((i * 73 + (i / width) * 31) % 251) as u8)
            .collect();
        OwnedImage::new(data, width, height).unwrap()
    }

    fn crop(src: &OwnedImage, x: usize, y: usize, w: usize, h: usize) -> OwnedImage {
        OwnedImage::from_view(src.view().roi(x, y, w, h).unwrap()).unwrap()
    }

    #[test]
    fn template_not_smaller_than_frame_yields_nothing() {
        let frame = textured(10, 10);
        let same = crop(&frame, 0, 0, 10, 4);
        let result = CorrelationMatcher::default()
            .scan(frame.view(), same.view(), 0.0, 1.0)
            .unwrap();
        assert!(result.candidates.is_empty());
        assert_eq!(result.peak, None);
    }

    #[test]
    fn flat_template_yields_nothing() {
        let frame = textured(20, 20);
        let flat = OwnedImage::new(vec![90; 16], 4, 4).unwrap();
        let result = CorrelationMatcher::default()
            .scan(frame.view(), flat.view(), 0.0, 1.0)
            .unwrap();
        assert!(result.candidates.is_empty());
    }

    #[test]
    fn exact_crop_scores_one_at_its_offset() {
        let frame = textured(40, 30);
        let tpl = crop(&frame, 11, 7, 8, 6);
        let result = CorrelationMatcher::new(KernelKind::Direct)
            .scan(frame.view(), tpl.view(), 0.999, 1.0)
            .unwrap();
        let hit = result
            .candidates
            .iter()
            .find(|c| c.rect.x() == 11 && c.rect.y() == 7)
            .expect("crop location");
        assert!((hit.confidence - 1.0).abs() < 1e-4);
        assert_eq!((hit.rect.width(), hit.rect.height()), (8, 6));
        assert!(result.peak.unwrap() > 0.999);
    }

    #[test]
    fn candidates_follow_raster_order() {
        let frame = textured(32, 24);
        let tpl = crop(&frame, 3, 3, 5, 5);
        let result = CorrelationMatcher::default()
            .scan(frame.view(), tpl.view(), 0.0, 0.5)
            .unwrap();
        let keys: Vec<_> = result
            .candidates
            .iter()
            .map(|c| (c.rect.y(), c.rect.x()))
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert!(result
            .candidates
            .iter()
            .all(|c| (0.0..=1.0).contains(&c.confidence) && c.scale == 0.5));
    }
}
