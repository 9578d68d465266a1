//! Facade tying capture, matching, analysis, and waiting together.

use crate::capture::{CaptureConfig, CapturedFrame, FrameSource, ScreenBackend};
use crate::descriptor::{DescriptorCache, TargetDescriptor};
use crate::frame::{Frame, Rect};
use crate::poll::{PollLoop, StopFlag, WaitOptions, WaitOutcome};
use crate::search::{ColorFilter, FindOptions, MatchOutcome, Matcher};
use crate::template::Template;
use crate::util::{ScreenMatchError, ScreenMatchResult};
use std::path::Path;
use std::sync::Arc;

/// Screen matching engine over a capture backend.
///
/// Holds no frames or templates between calls; the only shared state is the
/// descriptor cache and the capture name counter.
pub struct Engine<B> {
    source: FrameSource<B>,
    descriptors: DescriptorCache,
}

#[cfg(feature = "capture")]
impl Engine<crate::capture::XcapBackend> {
    /// Engine capturing the primary monitor.
    pub fn primary_monitor(config: CaptureConfig) -> Self {
        Self::new(crate::capture::XcapBackend::new(), config)
    }
}

impl<B: ScreenBackend> Engine<B> {
    pub fn new(backend: B, config: CaptureConfig) -> Self {
        Self {
            source: FrameSource::new(backend, config),
            descriptors: DescriptorCache::new(),
        }
    }

    pub fn frame_source(&self) -> &FrameSource<B> {
        &self.source
    }

    pub fn descriptor_cache(&self) -> &DescriptorCache {
        &self.descriptors
    }

    /// Captures the whole screen.
    pub fn capture_full(&self) -> ScreenMatchResult<CapturedFrame> {
        self.source.capture_full()
    }

    /// Captures a screen region; an empty or off-screen region is a capture error.
    pub fn capture_region(
        &self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> ScreenMatchResult<CapturedFrame> {
        let rect = Rect::new(x, y, width, height)
            .map_err(|err| ScreenMatchError::capture(err.to_string()))?;
        self.source.capture_region(rect)
    }

    /// Reads one screen pixel as `(r, g, b)`.
    pub fn pixel_color(&self, x: u32, y: u32) -> ScreenMatchResult<(u8, u8, u8)> {
        let [r, g, b] = self.source.pixel_color(x, y)?;
        Ok((r, g, b))
    }

    /// Width and height of the screen.
    pub fn screen_size(&self) -> ScreenMatchResult<(u32, u32)> {
        self.source.screen_size()
    }

    pub fn load_template<P: AsRef<Path>>(&self, path: P) -> ScreenMatchResult<Template> {
        Template::open(path)
    }

    pub fn load_frame<P: AsRef<Path>>(&self, path: P) -> ScreenMatchResult<Frame> {
        Frame::open(path)
    }

    /// Locates `template` in `frame`, capturing the full screen when no frame
    /// is given.
    pub fn find(
        &self,
        template: &Template,
        frame: Option<&Frame>,
        options: &FindOptions,
    ) -> ScreenMatchResult<MatchOutcome> {
        options.validate()?;
        let matcher = self.matcher(template, options);
        match frame {
            Some(frame) => matcher.find(frame),
            None => matcher.find(&self.source.capture_full()?.frame),
        }
    }

    /// Descriptor of `template`, cached by content.
    pub fn analyze(&self, template: &Template) -> Arc<TargetDescriptor> {
        self.descriptors.get_or_analyze(template)
    }

    /// Polls the screen until `template` appears, the timeout passes, or
    /// `stop` is raised.
    pub fn wait_for(
        &self,
        template: &Template,
        options: &WaitOptions,
        stop: &StopFlag,
    ) -> ScreenMatchResult<WaitOutcome> {
        options.find.validate()?;
        let matcher = self.matcher(template, &options.find);
        let outcome = PollLoop::from_options(options).run(stop, || {
            let captured = self.source.capture_full()?;
            Ok(matcher.find(&captured.frame)?.best().copied())
        });
        Ok(outcome)
    }

    fn matcher<'t>(&self, template: &'t Template, options: &FindOptions) -> Matcher<'t> {
        let matcher = Matcher::new(template).with_options(*options);
        if options.color_filter == ColorFilter::Auto {
            matcher.with_descriptor(self.analyze(template))
        } else {
            matcher
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Engine;
    use crate::capture::{CaptureConfig, MemoryBackend};
    use crate::search::FindOptions;
    use crate::template::Template;
    use crate::util::ErrorKind;
    use ::image::{Rgb, RgbImage};
    use std::sync::Arc;

    fn engine() -> Engine<MemoryBackend> {
        let screen = RgbImage::from_fn(40, 30, |x, y| Rgb([(x * 6) as u8, (y * 8) as u8, 0]));
        let config = CaptureConfig {
            persist: false,
            ..CaptureConfig::default()
        };
        Engine::new(MemoryBackend::new(screen), config)
    }

    #[test]
    fn empty_region_is_capture_error() {
        let err = engine().capture_region(0, 0, 0, 5).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Capture);
    }

    #[test]
    fn pixel_color_is_rgb_tuple() {
        assert_eq!(engine().pixel_color(2, 3).unwrap(), (12, 24, 0));
        assert_eq!(engine().screen_size().unwrap(), (40, 30));
    }

    #[test]
    fn invalid_options_fail_before_capture() {
        let tpl = Template::new(vec![0, 50, 100, 150], 2, 2).unwrap();
        let opts = FindOptions {
            max_matches: 0,
            ..FindOptions::default()
        };
        let err = engine().find(&tpl, None, &opts).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
    }

    #[test]
    fn analyze_is_cached_per_template() {
        let engine = engine();
        let tpl = Template::new(vec![0, 50, 100, 150], 2, 2).unwrap();
        let a = engine.analyze(&tpl);
        let b = engine.analyze(&tpl);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(engine.descriptor_cache().len(), 1);
    }
}
