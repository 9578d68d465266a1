//! Match candidates and their deduplication.

use crate::frame::Rect;

pub mod nms;

/// One located occurrence of a template.
///
/// `rect` is in frame-local coordinates until the pipeline translates it by
/// the frame origin; `confidence` is the correlation score clamped to `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MatchCandidate {
    pub rect: Rect,
    pub confidence: f32,
    pub scale: f32,
}

impl MatchCandidate {
    pub fn new(rect: Rect, confidence: f32, scale: f32) -> Self {
        Self {
            rect,
            confidence,
            scale,
        }
    }
}
