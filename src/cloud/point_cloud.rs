//! Organized colored point clouds produced by one range sensor.

use nalgebra::Vector3;

use crate::geometry::SE3;

/// A 3D point with an RGB color. Invalid depth is encoded as NaN position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColoredPoint {
    pub position: Vector3<f64>,
    pub color: [u8; 3],
}

impl ColoredPoint {
    pub fn new(position: Vector3<f64>, color: [u8; 3]) -> Self {
        Self { position, color }
    }

    /// A point without a depth measurement.
    pub fn invalid() -> Self {
        Self {
            position: Vector3::new(f64::NAN, f64::NAN, f64::NAN),
            color: [0, 0, 0],
        }
    }

    pub fn is_valid(&self) -> bool {
        self.position.iter().all(|c| c.is_finite())
    }
}

/// Row-major organized point cloud (`height` rows of `width` columns).
///
/// Organization is what region segmenters rely on for neighbourhood queries,
/// so it is validated before detection rather than at construction.
#[derive(Debug, Clone, Default)]
pub struct PointCloud {
    pub width: usize,
    pub height: usize,
    pub points: Vec<ColoredPoint>,
}

impl PointCloud {
    pub fn new(width: usize, height: usize, points: Vec<ColoredPoint>) -> Self {
        Self {
            width,
            height,
            points,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// True when the cloud has a real 2D grid structure.
    pub fn is_organized(&self) -> bool {
        self.width > 1 && self.height > 1 && self.points.len() == self.width * self.height
    }

    /// Point at (row, col), if inside the grid.
    pub fn at(&self, row: usize, col: usize) -> Option<&ColoredPoint> {
        if row >= self.height || col >= self.width {
            return None;
        }
        self.points.get(row * self.width + col)
    }

    pub fn num_valid(&self) -> usize {
        self.points.iter().filter(|p| p.is_valid()).count()
    }

    /// Positions of the given indices. Out-of-range indices yield `None`.
    pub fn positions(&self, indices: &[usize]) -> Option<Vec<Vector3<f64>>> {
        indices
            .iter()
            .map(|&i| self.points.get(i).map(|p| p.position))
            .collect()
    }

    /// Express the cloud in another frame, keeping its organization.
    pub fn transformed(&self, pose: &SE3) -> Self {
        let points = self
            .points
            .iter()
            .map(|p| {
                if p.is_valid() {
                    ColoredPoint::new(pose.transform_point(&p.position), p.color)
                } else {
                    *p
                }
            })
            .collect();
        Self {
            width: self.width,
            height: self.height,
            points,
        }
    }
}

/// Concatenate per-sensor clouds into one omnidirectional cloud.
///
/// Sensor `s` occupies indices `[s * n, (s + 1) * n)` when all clouds have
/// `n` points, which is the index space patch inliers are expressed in.
pub fn stack_clouds(clouds: &[PointCloud]) -> PointCloud {
    let width = clouds.first().map(|c| c.width).unwrap_or(0);
    let height = clouds.iter().map(|c| c.height).sum();
    let points = clouds.iter().flat_map(|c| c.points.iter().copied()).collect();
    PointCloud {
        width,
        height,
        points,
    }
}
