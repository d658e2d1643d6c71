//! Same-surface decision between two patches.
//!
//! Each pipeline stage (local merge, cross-sensor fusion, global merge) uses
//! the same test with its own thresholds.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::geometry::segment_to_segment;

use super::patch::PlanePatch;

/// Thresholds of the hull-proximity test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProximityThresholds {
    /// Maximum distance between the closest hull features.
    pub max_distance: f64,
    /// Maximum component of the separation along the first patch's normal.
    pub max_perpendicular: f64,
}

/// Whether the hulls of `a` and `b` are close enough to belong to one surface.
///
/// Tries vertex-to-vertex distances first, then edge-to-edge distances. Both
/// require the separation to lie (nearly) in the plane of `a`, which tells
/// nearby coplanar fragments apart from parallel planes.
pub fn hulls_are_near(a: &PlanePatch, b: &PlanePatch, thresholds: &ProximityThresholds) -> bool {
    if a.hull.is_empty() || b.hull.is_empty() {
        return false;
    }

    let in_plane = |separation: Vector3<f64>| {
        a.normal.dot(&separation).abs() < thresholds.max_perpendicular
    };

    for va in &a.hull {
        for vb in &b.hull {
            let diff = vb - va;
            if diff.norm() < thresholds.max_distance && in_plane(diff) {
                return true;
            }
        }
    }

    for (a0, a1) in hull_edges(&a.hull) {
        for (b0, b1) in hull_edges(&b.hull) {
            let closest = segment_to_segment(&a0, &a1, &b0, &b1);
            if closest.distance() < thresholds.max_distance && in_plane(closest.separation()) {
                return true;
            }
        }
    }

    false
}

/// Edges of a closed polygon, including the closing edge.
fn hull_edges(hull: &[Vector3<f64>]) -> impl Iterator<Item = (Vector3<f64>, Vector3<f64>)> + '_ {
    let n = if hull.len() > 1 { hull.len() } else { 0 };
    (0..n).map(move |i| (hull[i], hull[(i + 1) % n]))
}

/// Composite same-surface criterion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SameSurfaceCriteria {
    /// Normals must satisfy `n_a · n_b > min_normal_cos`.
    pub min_normal_cos: f64,
    /// Offsets must satisfy `|d_a - d_b| < max_offset_diff`.
    pub max_offset_diff: f64,
    pub proximity: ProximityThresholds,
    /// Optional Bhattacharyya distance gate on the hue histograms.
    #[serde(default)]
    pub max_hue_distance: Option<f64>,
}

impl SameSurfaceCriteria {
    pub fn matches(&self, a: &PlanePatch, b: &PlanePatch) -> bool {
        if a.normal.dot(&b.normal) <= self.min_normal_cos {
            return false;
        }
        if (a.offset - b.offset).abs() >= self.max_offset_diff {
            return false;
        }
        if let Some(max_hue) = self.max_hue_distance {
            if a.hue_histogram.bhattacharyya_distance(&b.hue_histogram) > max_hue {
                return false;
            }
        }
        hulls_are_near(a, b, &self.proximity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pbmap::patch::test_support::square_patch;

    const NEAR: ProximityThresholds = ProximityThresholds {
        max_distance: 0.3,
        max_perpendicular: 0.06,
    };

    fn criteria() -> SameSurfaceCriteria {
        SameSurfaceCriteria {
            min_normal_cos: 0.99,
            max_offset_diff: 0.45,
            proximity: NEAR,
            max_hue_distance: None,
        }
    }

    #[test]
    fn test_vertex_proximity() {
        let a = square_patch(Vector3::new(0.0, 0.0, 2.0), -Vector3::z(), 1.0, 0);
        let b = square_patch(Vector3::new(1.2, 0.0, 2.0), -Vector3::z(), 1.0, 10);
        assert!(hulls_are_near(&a, &b, &NEAR));
    }

    #[test]
    fn test_edge_proximity_without_close_vertices() {
        // Long thin strips side by side, shifted so no vertex pair is close
        let mut a = square_patch(Vector3::new(0.0, 0.0, 2.0), -Vector3::z(), 1.0, 0);
        a.hull = vec![
            Vector3::new(-2.0, -0.5, 2.0),
            Vector3::new(2.0, -0.5, 2.0),
            Vector3::new(2.0, 0.0, 2.0),
            Vector3::new(-2.0, 0.0, 2.0),
        ];
        let mut b = a.clone();
        b.hull = vec![
            Vector3::new(-1.0, 0.1, 2.0),
            Vector3::new(1.0, 0.1, 2.0),
            Vector3::new(1.0, 0.6, 2.0),
            Vector3::new(-1.0, 0.6, 2.0),
        ];
        assert!(hulls_are_near(&a, &b, &NEAR));
    }

    #[test]
    fn test_parallel_offset_planes_not_near() {
        let a = square_patch(Vector3::new(0.0, 0.0, 2.0), -Vector3::z(), 1.0, 0);
        let b = square_patch(Vector3::new(0.0, 0.0, 2.1), -Vector3::z(), 1.0, 10);
        assert!(!hulls_are_near(&a, &b, &NEAR));
    }

    #[test]
    fn test_far_apart_not_near() {
        let a = square_patch(Vector3::new(0.0, 0.0, 2.0), -Vector3::z(), 1.0, 0);
        let b = square_patch(Vector3::new(3.0, 0.0, 2.0), -Vector3::z(), 1.0, 10);
        assert!(!hulls_are_near(&a, &b, &NEAR));
        assert!(!criteria().matches(&a, &b));
    }

    #[test]
    fn test_criteria_normal_gate() {
        let a = square_patch(Vector3::new(0.0, 0.0, 2.0), -Vector3::z(), 1.0, 0);
        let b = square_patch(Vector3::new(1.05, 0.0, 2.0), -Vector3::z(), 1.0, 10);
        assert!(criteria().matches(&a, &b));

        let mut tilted = b.clone();
        tilted.normal = Vector3::new(0.2, 0.0, -1.0).normalize();
        assert!(!criteria().matches(&a, &tilted));
    }

    #[test]
    fn test_hue_gate() {
        use crate::cloud::HueHistogram;
        let mut a = square_patch(Vector3::new(0.0, 0.0, 2.0), -Vector3::z(), 1.0, 0);
        let mut b = square_patch(Vector3::new(1.05, 0.0, 2.0), -Vector3::z(), 1.0, 10);
        a.hue_histogram = HueHistogram::from_colors(&[[255, 0, 0]; 5], 74);
        b.hue_histogram = HueHistogram::from_colors(&[[0, 0, 255]; 5], 74);

        let mut gated = criteria();
        gated.max_hue_distance = Some(0.5);
        assert!(criteria().matches(&a, &b));
        assert!(!gated.matches(&a, &b));
    }
}
