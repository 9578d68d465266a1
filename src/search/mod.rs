//! The full `find` pipeline and its options.
//!
//! Stages run in a fixed order: optional color filter, correlation at one or
//! many scales, optional shape verification, overlap suppression, then the
//! result cap. Rects are translated from frame-local to screen space last.

use crate::candidate::nms::non_max_suppression;
use crate::candidate::MatchCandidate;
use crate::color::{apply_color_filter, ColorRange};
use crate::descriptor::{analyze, TargetDescriptor};
use crate::frame::Frame;
use crate::shape::ShapeVerifier;
use crate::template::Template;
use crate::trace::{trace_event, trace_span, trace_warn};
use crate::util::{ScreenMatchError, ScreenMatchResult};
use std::borrow::Cow;
use std::sync::{Arc, OnceLock};

pub mod scales;
pub mod scan;

pub use scales::{ScalePyramidSearch, ScaleSearchOutcome};
pub use scan::{CorrelationMatcher, ScanResult};

/// Correlation kernel family.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum KernelKind {
    /// `Fft` once the direct work passes [`FFT_AUTO_WORK`] and the `fft`
    /// feature is enabled, `Direct` otherwise.
    #[default]
    Auto,
    /// Direct spatial sums (SIMD-accelerated with the `simd` feature).
    Direct,
    /// Transform-domain correlation (requires the `fft` feature).
    Fft,
}

/// Direct-kernel multiply count above which [`KernelKind::Auto`] picks `Fft`.
pub const FFT_AUTO_WORK: u64 = 1 << 24;

impl KernelKind {
    /// Resolves `Auto` for a frame and template given as `(width, height)`.
    ///
    /// Explicit kinds are returned unchanged.
    pub fn resolve(self, frame: (usize, usize), template: (usize, usize)) -> KernelKind {
        match self {
            KernelKind::Auto => {
                let cols = frame.0.saturating_sub(template.0) as u64 + 1;
                let rows = frame.1.saturating_sub(template.1) as u64 + 1;
                let work = (cols * rows)
                    .saturating_mul(template.0 as u64)
                    .saturating_mul(template.1 as u64);
                if cfg!(feature = "fft") && work > FFT_AUTO_WORK {
                    KernelKind::Fft
                } else {
                    KernelKind::Direct
                }
            }
            other => other,
        }
    }
}

/// Which template scales to try.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(tag = "mode", rename_all = "snake_case", deny_unknown_fields)
)]
pub enum ScaleMode {
    /// Original size only; every candidate above the threshold is kept.
    #[default]
    Single,
    /// Linear sweep of `steps` factors in `[min, max]`.
    Multi { min: f32, max: f32, steps: usize },
}

impl ScaleMode {
    /// Sweep of five factors over `0.8..=1.2`.
    pub fn multi_default() -> Self {
        Self::Multi {
            min: 0.8,
            max: 1.2,
            steps: 5,
        }
    }
}

/// Color pre-filter applied to the frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ColorFilter {
    #[default]
    Off,
    /// Template mean HSV with a fixed tolerance.
    Auto,
    Range(ColorRange),
}

/// Contour-based second pass.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ShapeCheck {
    #[default]
    Off,
    On { threshold: f64 },
}

impl ShapeCheck {
    /// Enabled with similarity threshold 0.7.
    pub fn default_on() -> Self {
        Self::On { threshold: 0.7 }
    }
}

/// Options for a single `find` call.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FindOptions {
    /// Minimum correlation score in `[0, 1]`.
    pub threshold: f32,
    pub scale: ScaleMode,
    /// Upper bound on returned matches.
    pub max_matches: usize,
    pub color_filter: ColorFilter,
    pub shape_check: ShapeCheck,
    /// Intersection over the smaller area above which boxes are merged.
    pub overlap_threshold: f64,
    pub kernel: KernelKind,
    /// Parallel correlation (requires the `rayon` feature, ignored otherwise).
    pub parallel: bool,
}

impl Default for FindOptions {
    fn default() -> Self {
        Self {
            threshold: 0.8,
            scale: ScaleMode::Single,
            max_matches: 10,
            color_filter: ColorFilter::Off,
            shape_check: ShapeCheck::Off,
            overlap_threshold: 0.3,
            kernel: KernelKind::Auto,
            parallel: false,
        }
    }
}

impl FindOptions {
    /// Checks every option against its valid range.
    pub fn validate(&self) -> ScreenMatchResult<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(ScreenMatchError::InvalidInput(
                "threshold must be within [0, 1]",
            ));
        }
        if let ScaleMode::Multi { min, max, steps } = self.scale {
            if !min.is_finite() || !max.is_finite() || min <= 0.0 || max <= 0.0 {
                return Err(ScreenMatchError::InvalidInput(
                    "scale bounds must be finite and positive",
                ));
            }
            if min > max {
                return Err(ScreenMatchError::InvalidInput(
                    "scale min must not exceed scale max",
                ));
            }
            if steps == 0 {
                return Err(ScreenMatchError::InvalidInput(
                    "scale steps must be at least 1",
                ));
            }
        }
        if self.max_matches == 0 {
            return Err(ScreenMatchError::InvalidInput(
                "max_matches must be at least 1",
            ));
        }
        if !(0.0..=1.0).contains(&self.overlap_threshold) {
            return Err(ScreenMatchError::InvalidInput(
                "overlap threshold must be within [0, 1]",
            ));
        }
        if let ShapeCheck::On { threshold } = self.shape_check {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(ScreenMatchError::InvalidInput(
                    "shape threshold must be within [0, 1]",
                ));
            }
        }
        if let ColorFilter::Range(range) = self.color_filter {
            ColorRange::new(range.lower(), range.upper())?;
        }
        if self.kernel == KernelKind::Fft && !cfg!(feature = "fft") {
            return Err(ScreenMatchError::InvalidInput(
                "fft kernel requires the `fft` feature",
            ));
        }
        Ok(())
    }
}

/// Result of a `find` call.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "status", rename_all = "snake_case"))]
pub enum MatchOutcome {
    /// Deduplicated matches in screen space, highest priority first.
    Found { matches: Vec<MatchCandidate> },
    /// Nothing cleared the threshold; the best peak is kept for diagnostics.
    NotFound { best_confidence: f32, best_scale: f32 },
}

impl MatchOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }

    /// Matches in priority order (empty when not found).
    pub fn matches(&self) -> &[MatchCandidate] {
        match self {
            Self::Found { matches } => matches,
            Self::NotFound { .. } => &[],
        }
    }

    /// First match after suppression.
    pub fn best(&self) -> Option<&MatchCandidate> {
        self.matches().first()
    }

    pub fn into_matches(self) -> Vec<MatchCandidate> {
        match self {
            Self::Found { matches } => matches,
            Self::NotFound { .. } => Vec::new(),
        }
    }
}

/// Template matcher bound to one template and one set of options.
pub struct Matcher<'t> {
    template: &'t Template,
    options: FindOptions,
    descriptor: OnceLock<Arc<TargetDescriptor>>,
}

impl<'t> Matcher<'t> {
    pub fn new(template: &'t Template) -> Self {
        Self {
            template,
            options: FindOptions::default(),
            descriptor: OnceLock::new(),
        }
    }

    pub fn with_options(mut self, options: FindOptions) -> Self {
        self.options = options;
        self
    }

    /// Supplies a precomputed descriptor for the automatic color filter.
    pub fn with_descriptor(self, descriptor: Arc<TargetDescriptor>) -> Self {
        let _ = self.descriptor.set(descriptor);
        self
    }

    pub fn template(&self) -> &Template {
        self.template
    }

    pub fn options(&self) -> &FindOptions {
        &self.options
    }

    /// Descriptor of the template, computed on first use.
    pub fn descriptor(&self) -> &TargetDescriptor {
        self.descriptor
            .get_or_init(|| Arc::new(analyze(self.template)))
    }

    /// Runs the pipeline against one frame.
    pub fn find(&self, frame: &Frame) -> ScreenMatchResult<MatchOutcome> {
        let opts = &self.options;
        opts.validate()?;
        let _span = trace_span!(
            "find",
            frame_w = frame.width(),
            frame_h = frame.height(),
            tpl_w = self.template.width(),
            tpl_h = self.template.height()
        )
        .entered();

        let working: Cow<'_, Frame> = match opts.color_filter {
            ColorFilter::Off => Cow::Borrowed(frame),
            ColorFilter::Auto => {
                let range = self.descriptor().auto_filter_range();
                Cow::Owned(apply_color_filter(frame, &range))
            }
            ColorFilter::Range(range) => Cow::Owned(apply_color_filter(frame, &range)),
        };
        let gray = working.to_gray()?;

        let matcher = CorrelationMatcher::new(opts.kernel).with_parallel(opts.parallel);
        let (mut candidates, best_confidence, best_scale) = match opts.scale {
            ScaleMode::Single => {
                let scan = matcher.scan(gray.view(), self.template.view(), opts.threshold, 1.0)?;
                (scan.candidates, scan.peak.unwrap_or(0.0), 1.0)
            }
            ScaleMode::Multi { min, max, steps } => {
                let outcome = ScalePyramidSearch::new(matcher, min, max, steps)
                    .with_parallel(opts.parallel)
                    .search(gray.view(), self.template.gray(), opts.threshold)?;
                (
                    outcome.candidates,
                    outcome.best_confidence,
                    outcome.best_scale,
                )
            }
        };

        if let ShapeCheck::On { threshold } = opts.shape_check {
            let verifier = ShapeVerifier::new(self.template.view(), threshold)?;
            candidates = verifier.verify(gray.view(), candidates);
        }

        let mut kept = non_max_suppression(&candidates, opts.overlap_threshold);
        if kept.len() > opts.max_matches {
            trace_warn!(
                "matches_truncated",
                found = kept.len(),
                max_matches = opts.max_matches
            );
            kept.truncate(opts.max_matches);
        }

        let (ox, oy) = frame.origin();
        let matches = kept
            .into_iter()
            .map(|c| Ok(MatchCandidate::new(c.rect.translated(ox, oy)?, c.confidence, c.scale)))
            .collect::<ScreenMatchResult<Vec<_>>>()?;

        trace_event!(
            "find_done",
            matches = matches.len(),
            best_confidence = best_confidence,
            best_scale = best_scale
        );
        if matches.is_empty() {
            Ok(MatchOutcome::NotFound {
                best_confidence,
                best_scale,
            })
        } else {
            Ok(MatchOutcome::Found { matches })
        }
    }
}
