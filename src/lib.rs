//! Screenmatch locates a small reference image on screen.
//!
//! A [`Template`] is searched for inside a captured [`Frame`] with
//! zero-mean normalized cross-correlation, optionally across a sweep of
//! template scales, behind an HSV color pre-filter, and followed by a
//! contour-based shape check. Overlapping hits are merged and the result is a
//! short, ranked list of screen-space rectangles.
//!
//! [`Engine`] bundles capture, matching, template analysis, and polling over a
//! [`ScreenBackend`]. Enable the `capture` feature for the primary-monitor
//! backend; [`MemoryBackend`] serves a fixed image for tests and offline use.
//! The `rayon`, `simd`, and `fft` features select faster correlation paths,
//! `serde` derives wire formats for public data, and `tracing` emits spans
//! and events without installing a subscriber.

pub mod candidate;
pub mod capture;
pub mod color;
pub mod descriptor;
pub mod engine;
pub mod frame;
pub mod image;
pub mod kernel;
pub mod lowlevel;
pub mod poll;
pub mod search;
pub mod shape;
pub mod template;
mod trace;
pub mod util;

pub use crate::image::{ImageView, OwnedImage};
pub use candidate::MatchCandidate;
pub use capture::{CaptureConfig, CapturedFrame, FrameSource, MemoryBackend, ScreenBackend};
#[cfg(feature = "capture")]
pub use capture::XcapBackend;
pub use color::{ColorRange, Hsv};
pub use descriptor::{analyze, DescriptorCache, TargetDescriptor};
pub use engine::Engine;
pub use frame::{Frame, Rect};
pub use poll::{PollLoop, StopFlag, WaitOptions, WaitOutcome};
pub use search::{
    ColorFilter, FindOptions, KernelKind, MatchOutcome, Matcher, ScaleMode, ShapeCheck,
    FFT_AUTO_WORK,
};
pub use shape::{ShapeClass, ShapeDescriptor};
pub use template::Template;
pub use util::{ErrorKind, ScreenMatchError, ScreenMatchResult};
