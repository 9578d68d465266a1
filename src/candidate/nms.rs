//! Greedy overlap-based non-maximum suppression.

use crate::candidate::MatchCandidate;

/// Removes candidates that overlap an already kept candidate.
///
/// Candidates are stably sorted by bottom edge, lowest on screen first, so
/// ties keep their pooled order. Each kept candidate then discards every
/// remaining one whose intersection over the smaller area exceeds
/// `overlap_threshold`. Disjoint or touching boxes never suppress each other.
pub fn non_max_suppression(
    candidates: &[MatchCandidate],
    overlap_threshold: f64,
) -> Vec<MatchCandidate> {
    let mut order: Vec<MatchCandidate> = candidates.to_vec();
    order.sort_by(|a, b| b.rect.bottom().cmp(&a.rect.bottom()));

    let mut kept: Vec<MatchCandidate> = Vec::new();
    'outer: for cand in order {
        for prev in &kept {
            if prev.rect.intersection_area(&cand.rect) > 0
                && prev.rect.overlap_ratio(&cand.rect) > overlap_threshold
            {
                continue 'outer;
            }
        }
        kept.push(cand);
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::non_max_suppression;
    use crate::candidate::MatchCandidate;
    use crate::frame::Rect;

    fn cand(x: u32, y: u32, w: u32, h: u32, confidence: f32) -> MatchCandidate {
        MatchCandidate::new(Rect::new(x, y, w, h).unwrap(), confidence, 1.0)
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(non_max_suppression(&[], 0.3).is_empty());
    }

    #[test]
    fn lowest_box_survives_regardless_of_score() {
        let upper = cand(10, 10, 20, 20, 0.99);
        let lower = cand(12, 14, 20, 20, 0.81);
        let kept = non_max_suppression(&[upper, lower], 0.3);
        assert_eq!(kept, vec![lower]);
    }

    #[test]
    fn ties_keep_discovery_order() {
        let first = cand(0, 0, 10, 10, 0.8);
        let second = cand(4, 0, 10, 10, 0.95);
        let kept = non_max_suppression(&[first, second], 0.3);
        assert_eq!(kept, vec![first]);
    }

    #[test]
    fn overlap_exactly_at_threshold_is_kept() {
        let a = cand(0, 0, 10, 10, 0.9);
        let b = cand(5, 0, 10, 10, 0.9);
        assert_eq!(non_max_suppression(&[a, b], 0.5).len(), 2);
        assert_eq!(non_max_suppression(&[a, b], 0.49).len(), 1);
    }

    #[test]
    fn nested_box_is_suppressed() {
        let outer = cand(0, 0, 100, 100, 0.9);
        let inner = cand(40, 40, 10, 10, 0.9);
        assert_eq!(non_max_suppression(&[inner, outer], 0.3), vec![outer]);
    }
}
