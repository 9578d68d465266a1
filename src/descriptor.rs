//! Compact color and shape summary of a template.
//!
//! The descriptor seeds the automatic color filter and is cheap enough to
//! recompute, but callers that analyze the same template repeatedly can share
//! a [`DescriptorCache`].

use crate::color::{ColorRange, Hsv};
use crate::shape::{dominant_contour, ShapeDescriptor};
use crate::template::Template;
use crate::trace::{trace_debug, trace_span};
use crate::util::math::mean_std;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Standard deviations on each side of the mean covered by the descriptor range.
pub const RANGE_SIGMAS: f64 = 2.0;

/// Default number of descriptors a [`DescriptorCache`] retains.
pub const DEFAULT_CACHE_CAPACITY: usize = 64;

/// Color statistics and dominant shape of a template.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TargetDescriptor {
    pub mean_rgb: [f64; 3],
    pub mean_hsv: [f64; 3],
    /// Population standard deviation per HSV channel.
    pub std_hsv: [f64; 3],
    /// `mean_hsv ± 2 * std_hsv`, clamped to the channel bounds.
    pub color_range: ColorRange,
    pub shape: ShapeDescriptor,
}

impl TargetDescriptor {
    /// Range used by [`ColorFilter::Auto`](crate::search::ColorFilter::Auto).
    pub fn auto_filter_range(&self) -> ColorRange {
        ColorRange::auto_from_mean(self.mean_hsv)
    }
}

/// Computes the descriptor of a template.
pub fn analyze(template: &Template) -> TargetDescriptor {
    let _span = trace_span!(
        "analyze",
        width = template.width(),
        height = template.height()
    )
    .entered();

    let mut rgb_sum = [0.0f64; 3];
    let mut hsv_sum = [0.0f64; 3];
    let mut hsv_sq = [0.0f64; 3];
    for px in template.rgb().pixels() {
        let hsv = Hsv::from_rgb(px.0).to_array();
        for c in 0..3 {
            rgb_sum[c] += f64::from(px.0[c]);
            let v = f64::from(hsv[c]);
            hsv_sum[c] += v;
            hsv_sq[c] += v * v;
        }
    }

    let count = template.width() * template.height();
    let mut mean_rgb = [0.0; 3];
    let mut mean_hsv = [0.0; 3];
    let mut std_hsv = [0.0; 3];
    for c in 0..3 {
        mean_rgb[c] = rgb_sum[c] / count as f64;
        let (mean, std) = mean_std(hsv_sum[c], hsv_sq[c], count);
        mean_hsv[c] = mean;
        std_hsv[c] = std;
    }
    let color_range = ColorRange::around(mean_hsv, std_hsv.map(|s| s * RANGE_SIGMAS));

    let shape = dominant_contour(template.view())
        .map(|contour| ShapeDescriptor::from_contour(&contour))
        .unwrap_or_else(ShapeDescriptor::empty);

    trace_debug!(
        "analyze_done",
        class = format!("{:?}", shape.class).as_str(),
        circularity = shape.circularity
    );
    TargetDescriptor {
        mean_rgb,
        mean_hsv,
        std_hsv,
        color_range,
        shape,
    }
}

/// Thread-safe memo of descriptors keyed by template content hash.
///
/// Holds at most `capacity` entries; inserting past it evicts one arbitrary
/// entry.
#[derive(Debug)]
pub struct DescriptorCache {
    entries: Mutex<HashMap<u64, Arc<TargetDescriptor>>>,
    capacity: usize,
}

impl Default for DescriptorCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }
}

impl DescriptorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cache bounded to `capacity` entries (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the cached descriptor or computes and stores it.
    ///
    /// The lock is not held while analyzing, so two threads may compute the
    /// same descriptor once each; the first stored value wins.
    pub fn get_or_analyze(&self, template: &Template) -> Arc<TargetDescriptor> {
        let key = template.content_hash();
        if let Some(hit) = self.lock().get(&key) {
            return Arc::clone(hit);
        }
        let computed = Arc::new(analyze(template));
        let mut entries = self.lock();
        if !entries.contains_key(&key) && entries.len() >= self.capacity {
            if let Some(&evicted) = entries.keys().next() {
                entries.remove(&evicted);
                trace_debug!("descriptor_cache_evict", key = evicted);
            }
        }
        Arc::clone(entries.entry(key).or_insert(computed))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<u64, Arc<TargetDescriptor>>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::{analyze, DescriptorCache};
    use crate::shape::ShapeClass;
    use crate::template::Template;
    use ::image::{Rgb, RgbImage};
    use std::sync::Arc;

    fn solid(color: [u8; 3]) -> Template {
        Template::from_rgb(RgbImage::from_pixel(8, 8, Rgb(color))).unwrap()
    }

    #[test]
    fn solid_color_has_zero_spread() {
        let desc = analyze(&solid([255, 0, 0]));
        assert_eq!(desc.mean_rgb, [255.0, 0.0, 0.0]);
        assert_eq!(desc.mean_hsv, [0.0, 255.0, 255.0]);
        assert_eq!(desc.std_hsv, [0.0, 0.0, 0.0]);
        assert_eq!(desc.color_range.lower(), [0, 255, 255]);
        assert_eq!(desc.color_range.upper(), [0, 255, 255]);
    }

    #[test]
    fn auto_range_uses_fixed_tolerance() {
        let desc = analyze(&solid([0, 0, 255]));
        let range = desc.auto_filter_range();
        assert_eq!(range.lower(), [100, 205, 205]);
        assert_eq!(range.upper(), [140, 255, 255]);
    }

    #[test]
    fn dark_template_has_empty_shape() {
        let desc = analyze(&solid([10, 10, 10]));
        assert_eq!(desc.shape.class, ShapeClass::Polygon);
        assert_eq!(desc.shape.vertices, 0);
        assert_eq!(desc.shape.area, 0.0);
    }

    #[test]
    fn cache_reuses_by_content() {
        let cache = DescriptorCache::new();
        let a = cache.get_or_analyze(&solid([0, 255, 0]));
        let b = cache.get_or_analyze(&solid([0, 255, 0]));
        assert!(Arc::ptr_eq(&a, &b));
        cache.get_or_analyze(&solid([0, 250, 0]));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn cache_never_exceeds_capacity() {
        let cache = DescriptorCache::with_capacity(3);
        for g in 0..10u8 {
            cache.get_or_analyze(&solid([0, g * 20, 0]));
            assert!(cache.len() <= 3);
        }
        assert_eq!(cache.len(), 3);
        let last = solid([0, 180, 0]);
        let a = cache.get_or_analyze(&last);
        let b = cache.get_or_analyze(&last);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(DescriptorCache::new().capacity(), super::DEFAULT_CACHE_CAPACITY);
    }
}
