//! Error types for screenmatch.

use thiserror::Error;

/// Result alias for screenmatch operations.
pub type ScreenMatchResult<T> = std::result::Result<T, ScreenMatchError>;

/// Errors that can occur while capturing, loading, or matching images.
///
/// "Not found" and "timed out" are not errors; see
/// [`MatchOutcome`](crate::search::MatchOutcome) and
/// [`WaitOutcome`](crate::poll::WaitOutcome).
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ScreenMatchError {
    /// The input data or parameters are invalid.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// Image dimensions are zero or overflow.
    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// Row stride is smaller than the row width.
    #[error("invalid stride {stride} for width {width}")]
    InvalidStride { width: usize, stride: usize },
    /// Backing buffer is shorter than the declared layout.
    #[error("buffer too small: needed {needed}, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// A region does not fit inside its image.
    #[error("roi ({x}, {y}, {width}x{height}) out of bounds for {img_width}x{img_height} image")]
    RoiOutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        img_width: usize,
        img_height: usize,
    },
    /// A rectangle with zero width or height was requested.
    #[error("invalid rect {width}x{height}: width and height must be positive")]
    InvalidRect { width: u32, height: u32 },
    /// Template carries no usable correlation signal.
    #[error("degenerate template: {reason}")]
    DegenerateTemplate { reason: &'static str },
    /// Display surface unavailable, region invalid, or capture storage failed.
    #[error("capture failed: {reason}")]
    Capture { reason: String },
    /// A template or frame file is missing, corrupt, or unreadable.
    #[error("failed to load {path}: {reason}")]
    Load { path: String, reason: String },
    /// Internal numeric failure not otherwise guarded.
    #[error("matching failed: {reason}")]
    Match { reason: String },
}

/// Coarse classification of [`ScreenMatchError`] values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Capture or capture-storage failure.
    Capture,
    /// File loading failure.
    Load,
    /// Numeric failure inside the pipeline.
    Match,
    /// Caller supplied invalid data or options.
    Input,
}

impl ScreenMatchError {
    /// Returns the coarse kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Capture { .. } => ErrorKind::Capture,
            Self::Load { .. } => ErrorKind::Load,
            Self::Match { .. } => ErrorKind::Match,
            Self::InvalidInput(_)
            | Self::InvalidDimensions { .. }
            | Self::InvalidStride { .. }
            | Self::BufferTooSmall { .. }
            | Self::RoiOutOfBounds { .. }
            | Self::InvalidRect { .. }
            | Self::DegenerateTemplate { .. } => ErrorKind::Input,
        }
    }

    pub(crate) fn capture(reason: impl Into<String>) -> Self {
        Self::Capture {
            reason: reason.into(),
        }
    }

    pub(crate) fn load(path: impl AsRef<std::path::Path>, reason: impl ToString) -> Self {
        Self::Load {
            path: path.as_ref().display().to_string(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorKind, ScreenMatchError};

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(ScreenMatchError::capture("no display").kind(), ErrorKind::Capture);
        assert_eq!(
            ScreenMatchError::load("a.png", "missing").kind(),
            ErrorKind::Load
        );
        assert_eq!(
            ScreenMatchError::InvalidRect {
                width: 0,
                height: 3
            }
            .kind(),
            ErrorKind::Input
        );
    }

    #[test]
    fn load_error_mentions_path() {
        let err = ScreenMatchError::load("missing/template.png", "not found");
        assert_eq!(
            err.to_string(),
            "failed to load missing/template.png: not found"
        );
    }
}
