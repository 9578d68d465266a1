//! Contour-based second pass over correlation candidates.

use crate::candidate::MatchCandidate;
use crate::shape::{dominant_contour, match_shapes_i1, Contour};
use crate::trace::trace_debug;
use crate::util::{ScreenMatchError, ScreenMatchResult};
use crate::ImageView;

/// Keeps candidates whose dominant contour resembles the template's.
///
/// Similarity is `max(0, 1 - d)` where `d` is the Hu-moment distance from
/// [`match_shapes_i1`]. A candidate region without any contour is dropped.
#[derive(Clone, Debug)]
pub struct ShapeVerifier {
    reference: Option<Contour>,
    threshold: f64,
}

impl ShapeVerifier {
    /// Extracts the reference contour from the grayscale template.
    pub fn new(template: ImageView<'_, u8>, threshold: f64) -> ScreenMatchResult<Self> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ScreenMatchError::InvalidInput(
                "shape threshold must be within [0, 1]",
            ));
        }
        Ok(Self {
            reference: dominant_contour(template),
            threshold,
        })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Similarity of a region's dominant contour to the reference, if both exist.
    pub fn similarity(&self, region: ImageView<'_, u8>) -> Option<f64> {
        let reference = self.reference.as_ref()?;
        let contour = dominant_contour(region)?;
        Some((1.0 - match_shapes_i1(reference, &contour)).max(0.0))
    }

    /// Filters `candidates` against the frame they were found in.
    ///
    /// Rects are frame-local and clipped to the frame. Order is preserved and
    /// nothing is ever added.
    pub fn verify(
        &self,
        frame: ImageView<'_, u8>,
        candidates: Vec<MatchCandidate>,
    ) -> Vec<MatchCandidate> {
        let before = candidates.len();
        let kept: Vec<MatchCandidate> = candidates
            .into_iter()
            .filter(|cand| {
                let Some(region) = crop(frame, cand) else {
                    return false;
                };
                self.similarity(region)
                    .is_some_and(|score| score >= self.threshold)
            })
            .collect();
        trace_debug!("shape_verify", before = before, after = kept.len());
        kept
    }
}

fn crop<'a>(frame: ImageView<'a, u8>, cand: &MatchCandidate) -> Option<ImageView<'a, u8>> {
    let x = cand.rect.x() as usize;
    let y = cand.rect.y() as usize;
    if x >= frame.width() || y >= frame.height() {
        return None;
    }
    let width = (cand.rect.width() as usize).min(frame.width() - x);
    let height = (cand.rect.height() as usize).min(frame.height() - y);
    frame.roi(x, y, width, height).ok()
}

#[cfg(test)]
mod tests {
    use super::ShapeVerifier;
    use crate::candidate::MatchCandidate;
    use crate::frame::Rect;
    use crate::image::OwnedImage;

    fn disc(size: usize, radius: f64) -> OwnedImage {
        let c = (size as f64 - 1.0) / 2.0;
        let data = (0..size * size)
            .map(|i| {
                let (x, y) = ((i % size) as f64, (i / size) as f64);
                if (x - c).hypot(y - c) <= radius {
                    255
                } else {
                    0
                }
            })
            .collect();
        OwnedImage::new(data, size, size).unwrap()
    }

    fn place(frame: &mut [u8], frame_w: usize, src: &OwnedImage, x0: usize, y0: usize) {
        for y in 0..src.height() {
            for x in 0..src.width() {
                frame[(y0 + y) * frame_w + x0 + x] = src.data()[y * src.width() + x];
            }
        }
    }

    fn cand(x: u32, y: u32, size: u32) -> MatchCandidate {
        MatchCandidate::new(Rect::new(x, y, size, size).unwrap(), 0.9, 1.0)
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let tpl = disc(20, 8.0);
        assert!(ShapeVerifier::new(tpl.view(), 1.5).is_err());
    }

    #[test]
    fn keeps_same_shape_and_drops_empty_region() {
        let tpl = disc(24, 10.0);
        let mut data = vec![0u8; 100 * 40];
        place(&mut data, 100, &tpl, 5, 5);
        let frame = OwnedImage::new(data, 100, 40).unwrap();

        let verifier = ShapeVerifier::new(tpl.view(), 0.7).unwrap();
        let kept = verifier.verify(frame.view(), vec![cand(5, 5, 24), cand(60, 5, 24)]);
        assert_eq!(kept, vec![cand(5, 5, 24)]);
    }

    #[test]
    fn clips_rects_at_frame_edge() {
        let tpl = disc(24, 10.0);
        let mut data = vec![0u8; 40 * 40];
        place(&mut data, 40, &tpl, 16, 16);
        let frame = OwnedImage::new(data, 40, 40).unwrap();

        let verifier = ShapeVerifier::new(tpl.view(), 0.0).unwrap();
        let kept = verifier.verify(frame.view(), vec![cand(16, 16, 30)]);
        assert_eq!(kept.len(), 1);
    }
}
