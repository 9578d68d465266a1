//! Contour moments, Hu invariants, and the log-scaled Hu distance.
//!
//! Moments are integrated over the polygon outlined by the contour (Green's
//! theorem) rather than over its pixels, so they are orientation independent
//! and cheap to compute from the traced boundary alone.

use imageproc::point::Point;

/// Hu invariants with magnitude at or below this are ignored by the distance.
const HU_EPS: f64 = 1e-5;

/// The seven Hu moment invariants of a contour.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HuMoments(pub [f64; 7]);

#[derive(Default)]
struct Spatial {
    m00: f64,
    m10: f64,
    m01: f64,
    m20: f64,
    m11: f64,
    m02: f64,
    m30: f64,
    m21: f64,
    m12: f64,
    m03: f64,
}

fn spatial_moments(points: &[Point<i32>]) -> Spatial {
    let Some(last) = points.last() else {
        return Spatial::default();
    };
    let (mut a00, mut a10, mut a01) = (0.0f64, 0.0f64, 0.0f64);
    let (mut a20, mut a11, mut a02) = (0.0f64, 0.0f64, 0.0f64);
    let (mut a30, mut a21, mut a12, mut a03) = (0.0f64, 0.0f64, 0.0f64, 0.0f64);

    let mut xp = f64::from(last.x);
    let mut yp = f64::from(last.y);
    let mut xp2 = xp * xp;
    let mut yp2 = yp * yp;
    for p in points {
        let x = f64::from(p.x);
        let y = f64::from(p.y);
        let x2 = x * x;
        let y2 = y * y;
        let dxy = xp * y - x * yp;
        let xs = xp + x;
        let ys = yp + y;

        a00 += dxy;
        a10 += dxy * xs;
        a01 += dxy * ys;
        a20 += dxy * (xp * xs + x2);
        a11 += dxy * (xp * (ys + yp) + x * (ys + y));
        a02 += dxy * (yp * ys + y2);
        a30 += dxy * xs * (xp2 + x2);
        a03 += dxy * ys * (yp2 + y2);
        a21 += dxy * (xp2 * (3.0 * yp + y) + 2.0 * x * xp * ys + x2 * (yp + 3.0 * y));
        a12 += dxy * (yp2 * (3.0 * xp + x) + 2.0 * y * yp * xs + y2 * (xp + 3.0 * x));

        xp = x;
        yp = y;
        xp2 = x2;
        yp2 = y2;
    }

    if a00.abs() <= f64::EPSILON {
        return Spatial::default();
    }
    let sign = if a00 < 0.0 { -1.0 } else { 1.0 };
    Spatial {
        m00: sign * a00 / 2.0,
        m10: sign * a10 / 6.0,
        m01: sign * a01 / 6.0,
        m20: sign * a20 / 12.0,
        m11: sign * a11 / 24.0,
        m02: sign * a02 / 12.0,
        m30: sign * a30 / 20.0,
        m21: sign * a21 / 60.0,
        m12: sign * a12 / 60.0,
        m03: sign * a03 / 20.0,
    }
}

impl HuMoments {
    /// Computes the invariants of the polygon outlined by `points`.
    ///
    /// Degenerate contours (zero enclosed area) yield all zeros.
    pub fn from_contour(points: &[Point<i32>]) -> Self {
        let m = spatial_moments(points);
        if m.m00 <= 0.0 {
            return Self::default();
        }

        let cx = m.m10 / m.m00;
        let cy = m.m01 / m.m00;
        let mu20 = m.m20 - m.m10 * cx;
        let mu11 = m.m11 - m.m10 * cy;
        let mu02 = m.m02 - m.m01 * cy;
        let mu30 = m.m30 - cx * (3.0 * mu20 + cx * m.m10);
        let mu21 = m.m21 - cx * (2.0 * mu11 + cx * m.m01) - cy * mu20;
        let mu12 = m.m12 - cy * (2.0 * mu11 + cy * m.m10) - cx * mu02;
        let mu03 = m.m03 - cy * (3.0 * mu02 + cy * m.m01);

        let s2 = 1.0 / (m.m00 * m.m00);
        let s3 = s2 / m.m00.sqrt();
        let (n20, n11, n02) = (mu20 * s2, mu11 * s2, mu02 * s2);
        let (n30, n21, n12, n03) = (mu30 * s3, mu21 * s3, mu12 * s3, mu03 * s3);

        let mut hu = [0.0f64; 7];
        let mut t0 = n30 + n12;
        let mut t1 = n21 + n03;
        let q0 = t0 * t0;
        let q1 = t1 * t1;
        let n4 = 4.0 * n11;
        let s = n20 + n02;
        let d = n20 - n02;

        hu[0] = s;
        hu[1] = d * d + n4 * n11;
        hu[3] = q0 + q1;
        hu[5] = d * (q0 - q1) + n4 * t0 * t1;

        t0 *= q0 - 3.0 * q1;
        t1 *= 3.0 * q0 - q1;
        let r0 = n30 - 3.0 * n12;
        let r1 = 3.0 * n21 - n03;
        hu[2] = r0 * r0 + r1 * r1;
        hu[4] = r0 * t0 + r1 * t1;
        hu[6] = r1 * t0 - r0 * t1;

        Self(hu)
    }
}

fn log_scaled(h: f64) -> f64 {
    h.signum() * h.abs().log10()
}

/// Distance between two contours over their log-scaled Hu invariants.
///
/// `d = sum |1/m_a - 1/m_b|` with `m = sign(h) * log10|h|`, skipping any
/// invariant that is negligible on either side. Identical shapes score 0.
pub fn match_shapes_i1(a: &[Point<i32>], b: &[Point<i32>]) -> f64 {
    let ha = HuMoments::from_contour(a);
    let hb = HuMoments::from_contour(b);
    let mut distance = 0.0;
    for (&x, &y) in ha.0.iter().zip(&hb.0) {
        if x.abs() > HU_EPS && y.abs() > HU_EPS {
            distance += (1.0 / log_scaled(y) - 1.0 / log_scaled(x)).abs();
        }
    }
    distance
}

#[cfg(test)]
mod tests {
    use super::{match_shapes_i1, HuMoments};
    use imageproc::point::Point;

    fn rect(x: i32, y: i32, w: i32, h: i32) -> Vec<Point<i32>> {
        vec![
            Point::new(x, y),
            Point::new(x + w, y),
            Point::new(x + w, y + h),
            Point::new(x, y + h),
        ]
    }

    #[test]
    fn square_first_invariant_is_one_sixth() {
        let hu = HuMoments::from_contour(&rect(0, 0, 10, 10));
        assert!((hu.0[0] - 1.0 / 6.0).abs() < 1e-9);
        assert!(hu.0[1].abs() < 1e-12);
    }

    #[test]
    fn invariants_ignore_translation_scale_and_direction() {
        let base = rect(0, 0, 10, 20);
        let moved = rect(35, 12, 20, 40);
        let mut reversed = base.clone();
        reversed.reverse();
        assert!(match_shapes_i1(&base, &moved) < 1e-9);
        assert!(match_shapes_i1(&base, &reversed) < 1e-9);
    }

    #[test]
    fn different_shapes_are_apart() {
        let square = rect(0, 0, 10, 10);
        let bar = rect(0, 0, 40, 4);
        assert!(match_shapes_i1(&square, &bar) > 0.05);
    }

    #[test]
    fn degenerate_contour_has_zero_moments() {
        let line = vec![Point::new(0, 0), Point::new(5, 0)];
        assert_eq!(HuMoments::from_contour(&line), HuMoments::default());
    }
}
