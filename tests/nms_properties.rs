use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use screenmatch::lowlevel::non_max_suppression;
use screenmatch::{MatchCandidate, Rect};

fn random_candidates(rng: &mut StdRng, count: usize) -> Vec<MatchCandidate> {
    (0..count)
        .map(|_| {
            let rect = Rect::new(
                rng.random_range(0..200),
                rng.random_range(0..150),
                rng.random_range(5..40),
                rng.random_range(5..40),
            )
            .unwrap();
            MatchCandidate::new(rect, rng.random_range(0.5..1.0), 1.0)
        })
        .collect()
}

#[test]
fn survivors_are_pairwise_below_threshold() {
    let mut rng = StdRng::seed_from_u64(42);
    for round in 0..20 {
        let threshold = [0.0, 0.3, 0.5, 0.9][round % 4];
        let input = random_candidates(&mut rng, 60);
        let kept = non_max_suppression(&input, threshold);
        assert!(!kept.is_empty());
        assert!(kept.len() <= input.len());
        for (i, a) in kept.iter().enumerate() {
            assert!(input.contains(a));
            for b in &kept[i + 1..] {
                assert!(
                    a.rect.overlap_ratio(&b.rect) <= threshold,
                    "{a:?} and {b:?} survived at {threshold}"
                );
            }
        }
    }
}

#[test]
fn every_dropped_box_overlaps_a_survivor() {
    let mut rng = StdRng::seed_from_u64(99);
    let input = random_candidates(&mut rng, 80);
    let kept = non_max_suppression(&input, 0.3);
    for cand in input.iter().filter(|c| !kept.contains(c)) {
        assert!(kept
            .iter()
            .any(|k| k.rect.overlap_ratio(&cand.rect) > 0.3));
    }
}

#[test]
fn survivors_are_ordered_by_bottom_edge() {
    let mut rng = StdRng::seed_from_u64(1);
    let kept = non_max_suppression(&random_candidates(&mut rng, 50), 0.3);
    for pair in kept.windows(2) {
        assert!(pair[0].rect.bottom() >= pair[1].rect.bottom());
    }
}

#[test]
fn result_is_idempotent() {
    let mut rng = StdRng::seed_from_u64(17);
    let once = non_max_suppression(&random_candidates(&mut rng, 70), 0.3);
    let twice = non_max_suppression(&once, 0.3);
    assert_eq!(once, twice);
}

#[test]
fn disjoint_boxes_all_survive() {
    let input: Vec<MatchCandidate> = (0..10)
        .map(|i| MatchCandidate::new(Rect::new(i * 10, 0, 10, 10).unwrap(), 0.9, 1.0))
        .collect();
    assert_eq!(non_max_suppression(&input, 0.0).len(), 10);
}
