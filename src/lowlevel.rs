//! Low-level building blocks for custom matching pipelines.
//!
//! These expose the individual pipeline stages (correlation surfaces, the
//! scale ladder, suppression, contours) for callers that want to compose
//! them differently. Most users should prefer [`Matcher`](crate::Matcher) or
//! [`Engine`](crate::Engine).

pub use crate::candidate::nms::non_max_suppression;
pub use crate::color::{apply_color_filter, color_mask, ColorMask};
pub use crate::image::pyramid::{ScaleLevel, ScalePyramid, SkipReason};
pub use crate::kernel::scalar::ZnccScalar;
pub use crate::kernel::{Kernel, ScoreMap, WindowStats};
pub use crate::search::{CorrelationMatcher, ScalePyramidSearch, ScaleSearchOutcome, ScanResult};
pub use crate::shape::{
    binarize, contour_area, dominant_contour, external_contours, match_shapes_i1, Contour,
    HuMoments, ShapeVerifier,
};
pub use crate::template::TemplatePlan;

#[cfg(feature = "fft")]
pub use crate::kernel::fft::ZnccFft;
#[cfg(feature = "rayon")]
pub use crate::kernel::rayon::zncc_score_map_par;
#[cfg(feature = "simd")]
pub use crate::kernel::simd::ZnccSimd;
