//! Multi-scale search over a linear ladder of template sizes.
//!
//! Every rung is correlated at the base threshold; the sweep policy is then
//! applied in ascending scale order:
//!
//! - the running best peak (including the current rung) sets the reference,
//! - a rung whose peak is under 90% of that reference is filtered at
//!   `threshold * 1.1`,
//! - at most five candidates per rung enter the pool, in raster order,
//! - the latest rung with candidates and a peak within 95% of the reference
//!   becomes the preferred set, which is moved to the front of the pool when
//!   the best peak clears the base threshold.
//!
//! Correlating first and filtering afterwards lets the parallel path share the
//! policy code, so both paths return identical results.

use crate::candidate::MatchCandidate;
use crate::image::pyramid::{ScaleLevel, ScalePyramid};
use crate::image::OwnedImage;
use crate::search::scan::{CorrelationMatcher, ScanResult};
use crate::trace::{trace_debug, trace_event, trace_span, trace_warn};
use crate::util::ScreenMatchResult;
use crate::ImageView;
#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Maximum candidates a single rung contributes to the pool.
pub const PER_SCALE_CAP: usize = 5;
/// Peaks below this fraction of the best use the raised threshold.
pub const INFERIOR_RATIO: f32 = 0.9;
/// Multiplier applied to the threshold for inferior rungs.
pub const THRESHOLD_RAISE: f32 = 1.1;
/// Peaks at or above this fraction of the best may become the preferred set.
pub const PREFERRED_RATIO: f32 = 0.95;

/// Result of a scale sweep.
#[derive(Clone, Debug, PartialEq)]
pub struct ScaleSearchOutcome {
    /// Pooled candidates, preferred set first. Not yet deduplicated.
    pub candidates: Vec<MatchCandidate>,
    /// Highest peak seen on any evaluated rung (0 when none was evaluated).
    pub best_confidence: f32,
    /// Scale of that peak (1.0 when none was evaluated).
    pub best_scale: f32,
}

/// Drives [`CorrelationMatcher`] across resize factors.
#[derive(Clone, Copy, Debug)]
pub struct ScalePyramidSearch {
    matcher: CorrelationMatcher,
    min: f32,
    max: f32,
    steps: usize,
    parallel: bool,
}

impl ScalePyramidSearch {
    /// Creates a sweep over `steps` factors in `[min, max]`.
    pub fn new(matcher: CorrelationMatcher, min: f32, max: f32, steps: usize) -> Self {
        Self {
            matcher,
            min,
            max,
            steps,
            parallel: false,
        }
    }

    /// Correlates rungs concurrently (requires the `rayon` feature).
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn parallel(&self) -> bool {
        self.parallel
    }

    /// Runs the sweep against a grayscale frame.
    pub fn search(
        &self,
        frame: ImageView<'_, u8>,
        template: &OwnedImage,
        threshold: f32,
    ) -> ScreenMatchResult<ScaleSearchOutcome> {
        let _span = trace_span!("scale_search", steps = self.steps).entered();

        let pyramid = ScalePyramid::build(
            template,
            self.min,
            self.max,
            self.steps,
            frame.width(),
            frame.height(),
        )?;
        let levels = pyramid.into_levels();
        let scans = self.scan_levels(frame, &levels, threshold);
        let outcome = apply_policy(&levels, scans, threshold);

        trace_event!(
            "scale_search_done",
            candidates = outcome.candidates.len(),
            best_confidence = outcome.best_confidence,
            best_scale = outcome.best_scale
        );
        Ok(outcome)
    }

    fn scan_levels(
        &self,
        frame: ImageView<'_, u8>,
        levels: &[ScaleLevel],
        threshold: f32,
    ) -> Vec<Option<ScanResult>> {
        #[cfg(feature = "rayon")]
        if self.parallel {
            return levels
                .par_iter()
                .map(|level| self.scan_level(frame, level, threshold))
                .collect();
        }
        levels
            .iter()
            .map(|level| self.scan_level(frame, level, threshold))
            .collect()
    }

    fn scan_level(
        &self,
        frame: ImageView<'_, u8>,
        level: &ScaleLevel,
        threshold: f32,
    ) -> Option<ScanResult> {
        let image = match &level.image {
            Ok(image) => image,
            Err(reason) => {
                trace_debug!(
                    "scale_skipped",
                    scale = level.scale,
                    reason = format!("{reason:?}").as_str()
                );
                return None;
            }
        };
        match self
            .matcher
            .scan(frame, image.view(), threshold, level.scale)
        {
            Ok(result) => Some(result),
            Err(err) => {
                trace_warn!(
                    "scale_failed",
                    scale = level.scale,
                    error = err.to_string().as_str()
                );
                None
            }
        }
    }
}

/// Folds per-rung scans in ascending scale order.
fn apply_policy(
    levels: &[ScaleLevel],
    scans: Vec<Option<ScanResult>>,
    threshold: f32,
) -> ScaleSearchOutcome {
    let mut best_confidence = 0.0f32;
    let mut best_scale = 1.0f32;
    let mut preferred: Vec<MatchCandidate> = Vec::new();
    let mut pool: Vec<MatchCandidate> = Vec::new();

    for (level, scan) in levels.iter().zip(scans) {
        let Some(ScanResult { candidates, peak }) = scan else {
            continue;
        };
        let Some(peak) = peak else {
            continue;
        };
        if peak > best_confidence {
            best_confidence = peak;
            best_scale = level.scale;
        }

        let level_threshold = if best_confidence > 0.0 && peak < best_confidence * INFERIOR_RATIO
        {
            threshold * THRESHOLD_RAISE
        } else {
            threshold
        };
        let kept: Vec<MatchCandidate> = candidates
            .into_iter()
            .filter(|c| c.confidence >= level_threshold)
            .collect();

        if !kept.is_empty() && peak >= best_confidence * PREFERRED_RATIO {
            preferred = kept.clone();
        }
        pool.extend(kept.into_iter().take(PER_SCALE_CAP));
    }

    let candidates = if !preferred.is_empty() && best_confidence >= threshold {
        let rest: Vec<MatchCandidate> = pool
            .into_iter()
            .filter(|c| !preferred.iter().any(|p| p.rect == c.rect))
            .collect();
        preferred.into_iter().chain(rest).collect()
    } else {
        pool
    };

    ScaleSearchOutcome {
        candidates,
        best_confidence,
        best_scale,
    }
}
