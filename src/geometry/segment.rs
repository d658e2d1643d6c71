//! Closest distance between two 3D line segments.

use nalgebra::Vector3;

const PARALLEL_EPSILON: f64 = 1e-12;

/// Closest-approach result for two segments.
#[derive(Debug, Clone, Copy)]
pub struct SegmentDistance {
    /// Squared distance between the closest points.
    pub distance_sq: f64,
    /// Closest point on the first segment.
    pub closest_a: Vector3<f64>,
    /// Closest point on the second segment.
    pub closest_b: Vector3<f64>,
}

impl SegmentDistance {
    pub fn distance(&self) -> f64 {
        self.distance_sq.sqrt()
    }

    /// Separation vector from the first segment to the second.
    pub fn separation(&self) -> Vector3<f64> {
        self.closest_b - self.closest_a
    }
}

/// Minimum distance between segments [a0, a1] and [b0, b1].
///
/// Clamped parametric solution of the two-line closest-approach problem,
/// handling degenerate (point-like) and parallel segments.
pub fn segment_to_segment(
    a0: &Vector3<f64>,
    a1: &Vector3<f64>,
    b0: &Vector3<f64>,
    b1: &Vector3<f64>,
) -> SegmentDistance {
    let u = a1 - a0;
    let v = b1 - b0;
    let w = a0 - b0;
    let a = u.dot(&u);
    let b = u.dot(&v);
    let c = v.dot(&v);
    let d = u.dot(&w);
    let e = v.dot(&w);
    let denom = a * c - b * b;

    let mut sn;
    let mut sd = denom;
    let mut tn;
    let mut td = denom;

    if denom < PARALLEL_EPSILON {
        // Parallel (or degenerate): fix s = 0 and solve for t
        sn = 0.0;
        sd = 1.0;
        tn = e;
        td = c;
    } else {
        sn = b * e - c * d;
        tn = a * e - b * d;
        if sn < 0.0 {
            sn = 0.0;
            tn = e;
            td = c;
        } else if sn > sd {
            sn = sd;
            tn = e + b;
            td = c;
        }
    }

    if tn < 0.0 {
        tn = 0.0;
        if -d < 0.0 {
            sn = 0.0;
        } else if -d > a {
            sn = sd;
        } else {
            sn = -d;
            sd = a;
        }
    } else if tn > td {
        tn = td;
        if (-d + b) < 0.0 {
            sn = 0.0;
        } else if (-d + b) > a {
            sn = sd;
        } else {
            sn = -d + b;
            sd = a;
        }
    }

    let sc = if sn.abs() < PARALLEL_EPSILON || sd.abs() < PARALLEL_EPSILON {
        0.0
    } else {
        sn / sd
    };
    let tc = if tn.abs() < PARALLEL_EPSILON || td.abs() < PARALLEL_EPSILON {
        0.0
    } else {
        tn / td
    };

    let closest_a = a0 + u * sc;
    let closest_b = b0 + v * tc;
    SegmentDistance {
        distance_sq: (closest_b - closest_a).norm_squared(),
        closest_a,
        closest_b,
    }
}
