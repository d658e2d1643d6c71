//! Normal estimation for organized clouds from grid neighbours.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::cloud::PointCloud;

use super::traits::{NormalEstimator, SegmentationError};

/// Estimates each normal as the cross product of the horizontal and vertical
/// grid gradients, oriented towards the sensor origin.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizedNormalEstimator {
    /// Neighbours whose depth differs by more than `factor * depth` are
    /// treated as a discontinuity and yield no normal.
    pub max_depth_change_factor: f64,
}

impl Default for OrganizedNormalEstimator {
    fn default() -> Self {
        Self {
            max_depth_change_factor: 0.02,
        }
    }
}

impl OrganizedNormalEstimator {
    fn neighbour(&self, cloud: &PointCloud, center: &Vector3<f64>, row: usize, col: usize) -> Option<Vector3<f64>> {
        let p = cloud.at(row, col)?;
        if !p.is_valid() {
            return None;
        }
        let depth = center.norm();
        if (p.position.norm() - depth).abs() > self.max_depth_change_factor * depth {
            return None;
        }
        Some(p.position)
    }

    fn normal_at(&self, cloud: &PointCloud, row: usize, col: usize) -> Option<Vector3<f64>> {
        let center = cloud.at(row, col)?;
        if !center.is_valid() {
            return None;
        }
        let c = center.position;

        // Forward differences, falling back to backward ones at the last row/column
        let dx = match self.neighbour(cloud, &c, row, col + 1) {
            Some(p) => p - c,
            None => c - self.neighbour(cloud, &c, row, col.checked_sub(1)?)?,
        };
        let dy = match self.neighbour(cloud, &c, row + 1, col) {
            Some(p) => p - c,
            None => c - self.neighbour(cloud, &c, row.checked_sub(1)?, col)?,
        };

        let n = dx.cross(&dy);
        let norm = n.norm();
        if norm < 1e-12 {
            return None;
        }
        let n = n / norm;
        Some(if n.dot(&c) > 0.0 { -n } else { n })
    }
}

impl NormalEstimator for OrganizedNormalEstimator {
    fn estimate(&self, cloud: &PointCloud) -> Result<Vec<Vector3<f64>>, SegmentationError> {
        if !cloud.is_organized() {
            return Err(SegmentationError::NotOrganized {
                width: cloud.width,
                height: cloud.height,
                len: cloud.len(),
            });
        }

        let invalid = Vector3::new(f64::NAN, f64::NAN, f64::NAN);
        let mut normals = Vec::with_capacity(cloud.len());
        for row in 0..cloud.height {
            for col in 0..cloud.width {
                normals.push(self.normal_at(cloud, row, col).unwrap_or(invalid));
            }
        }
        Ok(normals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::ColoredPoint;
    use approx::assert_relative_eq;

    fn wall(width: usize, height: usize, z: f64) -> PointCloud {
        let mut points = Vec::new();
        for r in 0..height {
            for c in 0..width {
                points.push(ColoredPoint::new(
                    Vector3::new(c as f64 * 0.01, r as f64 * 0.01, z),
                    [100, 100, 100],
                ));
            }
        }
        PointCloud::new(width, height, points)
    }

    #[test]
    fn test_wall_normals_face_sensor() {
        let cloud = wall(5, 4, 2.0);
        let normals = OrganizedNormalEstimator::default().estimate(&cloud).unwrap();
        assert_eq!(normals.len(), 20);
        for n in &normals {
            assert_relative_eq!(*n, Vector3::new(0.0, 0.0, -1.0), epsilon = 1e-9);
        }
    }

    #[test]
    fn test_invalid_point_has_no_normal() {
        let mut cloud = wall(3, 3, 1.0);
        cloud.points[4] = ColoredPoint::invalid();
        let normals = OrganizedNormalEstimator::default().estimate(&cloud).unwrap();
        assert!(!normals[4].x.is_finite());
    }

    #[test]
    fn test_unorganized_cloud_is_rejected() {
        let cloud = wall(6, 1, 1.0);
        assert!(matches!(
            OrganizedNormalEstimator::default().estimate(&cloud),
            Err(SegmentationError::NotOrganized { .. })
        ));
    }
}
