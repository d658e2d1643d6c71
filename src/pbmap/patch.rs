//! PlanePatch - a planar surface fragment with extent and appearance.
//!
//! A patch is created from one detected region and grows by absorbing other
//! patches judged to be the same surface. Derived fields (area, elongation,
//! principal direction) always follow the hull.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::cloud::HueHistogram;
use crate::geometry::{convex_hull_on_plane, elongation_and_principal_direction, polygon_area, SE3};

use super::types::PatchId;

/// A planar patch.
///
/// The plane is `normal · x + offset = 0`. The normal faces the origin of the
/// frame the patch is expressed in, so `normal · centroid ≤ 0` and
/// `offset ≥ 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanePatch {
    /// Index in the owning list.
    pub id: PatchId,

    /// Unit plane normal.
    pub normal: Vector3<f64>,

    /// Plane offset.
    pub offset: f64,

    /// Mean of the inlier points.
    pub centroid: Vector3<f64>,

    /// Planarity residual of the fit; small means flat.
    pub curvature: f64,

    /// Indices into the (omnidirectional) source cloud.
    pub inliers: Vec<usize>,

    /// Convex boundary, counter-clockwise about `normal`, implicitly closed.
    pub hull: Vec<Vector3<f64>>,

    pub area: f64,
    pub elongation: f64,
    pub principal_direction: Vector3<f64>,

    pub hue_histogram: HueHistogram,

    /// Mean RGB of the inliers falling in the dominant hue bin, in [0, 1].
    pub main_color: [f64; 3],

    /// Sensor that first observed this patch.
    pub sensor_id: usize,

    /// Number of detections folded into this patch.
    pub num_observations: usize,
}

impl PlanePatch {
    /// Create a patch from a plane and its hull. Shape descriptors are derived
    /// from the hull and the plane is oriented towards the origin.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        normal: Vector3<f64>,
        centroid: Vector3<f64>,
        curvature: f64,
        inliers: Vec<usize>,
        hull: Vec<Vector3<f64>>,
        hue_histogram: HueHistogram,
        main_color: [f64; 3],
        sensor_id: usize,
    ) -> Self {
        let mut patch = Self {
            id: PatchId(0),
            normal,
            offset: -normal.dot(&centroid),
            centroid,
            curvature,
            inliers,
            hull,
            area: 0.0,
            elongation: 1.0,
            principal_direction: Vector3::zeros(),
            hue_histogram,
            main_color,
            sensor_id,
            num_observations: 1,
        };
        patch.orient_towards_origin();
        patch.update_shape();
        patch
    }

    /// Flip normal and offset together so the plane faces the origin, then
    /// pin the offset to the centroid.
    pub fn orient_towards_origin(&mut self) {
        if self.normal.dot(&self.centroid) > 0.0 {
            self.normal = -self.normal;
            self.hull.reverse();
        }
        self.offset = -self.normal.dot(&self.centroid);
    }

    /// Recompute area, elongation and principal direction from the hull.
    pub fn update_shape(&mut self) {
        self.area = polygon_area(&self.hull);
        match elongation_and_principal_direction(&self.hull) {
            Some((elongation, direction)) => {
                self.elongation = elongation;
                self.principal_direction = direction;
            }
            None => {
                self.elongation = f64::INFINITY;
                self.principal_direction = Vector3::zeros();
            }
        }
    }

    /// Signed distance of `point` to the plane.
    pub fn signed_distance(&self, point: &Vector3<f64>) -> f64 {
        self.normal.dot(point) + self.offset
    }

    /// Whether the centroid lies on the plane and the normal faces the origin.
    pub fn is_oriented(&self, tolerance: f64) -> bool {
        self.signed_distance(&self.centroid).abs() <= tolerance
            && self.normal.dot(&self.centroid) <= tolerance
    }

    /// Express the patch in another frame. `pose` maps points of the current
    /// frame into the target frame.
    pub fn transform(&mut self, pose: &SE3) {
        self.normal = pose.transform_vector(&self.normal);
        self.centroid = pose.transform_point(&self.centroid);
        self.hull = pose.transform_points(&self.hull);
        self.principal_direction = pose.transform_vector(&self.principal_direction);
        self.orient_towards_origin();
    }

    /// Shift inlier indices into a stacked cloud's index space.
    pub fn shift_inliers(&mut self, index_offset: usize) {
        for idx in &mut self.inliers {
            *idx += index_offset;
        }
    }

    /// Absorb `other` into this patch.
    ///
    /// Inliers are concatenated, normal and centroid become area-weighted
    /// combinations, and the hull is the convex hull of both hulls projected
    /// on the merged plane. The area never drops below either input's area.
    pub fn absorb(&mut self, other: &PlanePatch) {
        let (area_self, area_other) = (self.area, other.area);
        let (w_self, w_other) = if self.area + other.area > 0.0 {
            (self.area, other.area)
        } else {
            (1.0, 1.0)
        };
        let w_total = w_self + w_other;

        let other_normal = if self.normal.dot(&other.normal) < 0.0 {
            -other.normal
        } else {
            other.normal
        };
        let merged_normal = self.normal * w_self + other_normal * w_other;
        if let Some(n) = merged_normal.try_normalize(1e-12) {
            self.normal = n;
        }
        self.centroid = (self.centroid * w_self + other.centroid * w_other) / w_total;
        self.curvature = (self.curvature * w_self + other.curvature * w_other) / w_total;

        let n_self = self.inliers.len() as f64;
        let n_other = other.inliers.len() as f64;
        if n_self + n_other > 0.0 {
            for c in 0..3 {
                self.main_color[c] =
                    (self.main_color[c] * n_self + other.main_color[c] * n_other) / (n_self + n_other);
            }
        }
        self.inliers.extend_from_slice(&other.inliers);
        self.hue_histogram.combine(&other.hue_histogram);
        self.num_observations += other.num_observations;

        self.orient_towards_origin();

        let mut vertices = self.hull.clone();
        vertices.extend_from_slice(&other.hull);
        let hull = convex_hull_on_plane(&vertices, &self.normal, &self.centroid);
        if !hull.is_empty() {
            self.hull = hull;
        }

        self.update_shape();
        self.area = self.area.max(area_self).max(area_other);
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::square_patch;
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_new_orients_towards_origin() {
        let patch = square_patch(Vector3::new(0.0, 0.0, 2.0), Vector3::z(), 1.0, 0);
        assert_relative_eq!(patch.normal, -Vector3::z(), epsilon = 1e-12);
        assert_relative_eq!(patch.offset, 2.0, epsilon = 1e-12);
        assert_relative_eq!(patch.area, 1.0, epsilon = 1e-9);
        assert!(patch.is_oriented(1e-9));
    }

    #[test]
    fn test_transform_keeps_orientation() {
        let mut patch = square_patch(Vector3::new(0.0, 0.0, 2.0), -Vector3::z(), 1.0, 0);
        let pose = SE3::from_axis_angle(Vector3::y(), std::f64::consts::FRAC_PI_2, Vector3::new(0.0, 0.0, 0.5));
        patch.transform(&pose);

        assert!(patch.is_oriented(1e-9));
        assert_relative_eq!(patch.centroid, Vector3::new(2.0, 0.0, 0.5), epsilon = 1e-9);
        assert_relative_eq!(patch.normal, -Vector3::x(), epsilon = 1e-9);
        assert_relative_eq!(patch.area, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_absorb_conserves_inliers_and_grows_area() {
        let mut a = square_patch(Vector3::new(0.0, 0.0, 2.0), -Vector3::z(), 1.0, 0);
        let b = square_patch(Vector3::new(1.0, 0.0, 2.0), -Vector3::z(), 1.0, 100);
        let (area_a, area_b) = (a.area, b.area);

        a.absorb(&b);

        assert_eq!(a.inliers.len(), 20);
        assert!(a.area >= area_a && a.area >= area_b);
        assert_relative_eq!(a.area, 2.0, epsilon = 1e-9);
        assert_relative_eq!(a.centroid, Vector3::new(0.5, 0.0, 2.0), epsilon = 1e-9);
        assert_eq!(a.num_observations, 2);
        assert!(a.is_oriented(1e-9));
        assert_relative_eq!(a.elongation, 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_absorb_opposite_normal() {
        let mut a = square_patch(Vector3::new(0.0, 0.0, 2.0), -Vector3::z(), 1.0, 0);
        let mut b = square_patch(Vector3::new(0.5, 0.0, 2.0), -Vector3::z(), 1.0, 50);
        b.normal = Vector3::z();
        a.absorb(&b);
        assert_relative_eq!(a.normal, -Vector3::z(), epsilon = 1e-12);
    }

    #[test]
    fn test_shift_inliers() {
        let mut patch = square_patch(Vector3::new(0.0, 0.0, 2.0), -Vector3::z(), 1.0, 0);
        patch.shift_inliers(640);
        assert_eq!(patch.inliers[0], 640);
    }
}
