//! Numeric helpers shared by the search and color stages.

/// Returns `steps` linearly spaced factors covering `[min, max]`.
///
/// A single step always yields the identity factor `1.0`.
pub(crate) fn linspace_scales(min: f32, max: f32, steps: usize) -> Vec<f32> {
    match steps {
        0 => Vec::new(),
        1 => vec![1.0],
        _ => {
            let increment = (max - min) / (steps - 1) as f32;
            (0..steps).map(|i| min + i as f32 * increment).collect()
        }
    }
}

/// Clamps `value` to `[lo, hi]` and rounds to the nearest integer channel.
pub(crate) fn clamp_channel(value: f64, lo: u8, hi: u8) -> u8 {
    value.round().clamp(f64::from(lo), f64::from(hi)) as u8
}

/// Population mean and standard deviation of accumulated sums.
pub(crate) fn mean_std(sum: f64, sum_sq: f64, count: usize) -> (f64, f64) {
    if count == 0 {
        return (0.0, 0.0);
    }
    let n = count as f64;
    let mean = sum / n;
    let var = (sum_sq / n - mean * mean).max(0.0);
    (mean, var.sqrt())
}

#[cfg(test)]
mod tests {
    use super::{clamp_channel, linspace_scales, mean_std};

    #[test]
    fn linspace_covers_both_ends() {
        let scales = linspace_scales(0.8, 1.2, 5);
        assert_eq!(scales.len(), 5);
        assert!((scales[0] - 0.8).abs() < 1e-6);
        assert!((scales[2] - 1.0).abs() < 1e-6);
        assert!((scales[4] - 1.2).abs() < 1e-6);
    }

    #[test]
    fn single_step_is_identity() {
        assert_eq!(linspace_scales(0.5, 2.0, 1), vec![1.0]);
        assert!(linspace_scales(0.5, 2.0, 0).is_empty());
    }

    #[test]
    fn clamp_channel_respects_bounds() {
        assert_eq!(clamp_channel(-12.0, 0, 179), 0);
        assert_eq!(clamp_channel(190.4, 0, 179), 179);
        assert_eq!(clamp_channel(41.6, 0, 255), 42);
    }

    #[test]
    fn mean_std_of_constant_is_zero_spread() {
        let (mean, std) = mean_std(40.0, 400.0, 4);
        assert!((mean - 10.0).abs() < 1e-12);
        assert!(std.abs() < 1e-12);
    }
}
