//! Patch Builder - turns a detected region into a [`PlanePatch`].
//!
//! Detection runs in each sensor's own frame. The builder orients the plane
//! towards that sensor, derives the hull and shape descriptors there, filters
//! slivers and small blobs, then expresses the result in the rig frame.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::cloud::{main_color, HueHistogram, PointCloud, DEFAULT_HUE_BINS};
use crate::geometry::{convex_hull_on_plane, voxel_downsample, SE3};
use crate::pbmap::PlanePatch;
use crate::segmentation::PlanarRegion;

/// Configuration for patch construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PatchBuilderConfig {
    /// Patches with a smaller hull area (m²) are dropped.
    pub min_area: f64,
    /// Patches whose hull is more elongated than this are dropped.
    pub max_elongation: f64,
    /// Voxel size used to hull the inliers when the region has no usable contour.
    pub hull_voxel_leaf: f64,
    /// Total hue histogram bins, including the dark and unsaturated bins.
    pub hue_bins: usize,
}

impl Default for PatchBuilderConfig {
    fn default() -> Self {
        Self {
            min_area: 0.12,
            max_elongation: 6.0,
            hull_voxel_leaf: 0.05,
            hue_bins: DEFAULT_HUE_BINS,
        }
    }
}

/// Why a region did not produce a patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    EmptyRegion,
    InvalidInliers,
    DegenerateNormal,
    DegenerateHull,
    TooSmall,
    TooElongated,
}

/// Builds patches from segmented regions.
#[derive(Debug, Clone, Default)]
pub struct PatchBuilder {
    config: PatchBuilderConfig,
}

impl PatchBuilder {
    pub fn new(config: PatchBuilderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PatchBuilderConfig {
        &self.config
    }

    /// Build a patch from `region`, or `None` if the region is filtered out.
    ///
    /// # Arguments
    /// * `region` - Region detected in `cloud`
    /// * `cloud` - The sensor's cloud, in the sensor frame
    /// * `sensor_id` - Originating sensor
    /// * `extrinsic` - Sensor-to-rig transform
    /// * `index_offset` - Added to every inlier index (position of this
    ///   sensor's cloud inside the stacked omnidirectional cloud)
    pub fn build(
        &self,
        region: &PlanarRegion,
        cloud: &PointCloud,
        sensor_id: usize,
        extrinsic: &SE3,
        index_offset: usize,
    ) -> Option<PlanePatch> {
        self.try_build(region, cloud, sensor_id, extrinsic, index_offset).ok()
    }

    /// Like [`build`](Self::build), reporting why a region was filtered.
    pub fn try_build(
        &self,
        region: &PlanarRegion,
        cloud: &PointCloud,
        sensor_id: usize,
        extrinsic: &SE3,
        index_offset: usize,
    ) -> Result<PlanePatch, Rejection> {
        if region.inliers.is_empty() {
            return Err(Rejection::EmptyRegion);
        }
        let positions = cloud
            .positions(&region.inliers)
            .filter(|pts| pts.iter().all(|p| p.iter().all(|c| c.is_finite())))
            .ok_or(Rejection::InvalidInliers)?;

        let raw_normal = region.raw_normal();
        let norm = raw_normal.norm();
        if !norm.is_finite() || norm < 1e-12 {
            return Err(Rejection::DegenerateNormal);
        }
        let normal = raw_normal / norm;
        let centroid: Vector3<f64> = positions.iter().sum::<Vector3<f64>>() / positions.len() as f64;

        let mut hull = convex_hull_on_plane(&region.contour, &normal, &centroid);
        if hull.is_empty() {
            let sparse = voxel_downsample(&positions, self.config.hull_voxel_leaf);
            hull = convex_hull_on_plane(&sparse, &normal, &centroid);
        }
        if hull.is_empty() {
            return Err(Rejection::DegenerateHull);
        }

        let colors: Vec<[u8; 3]> = region.inliers.iter().map(|&i| cloud.points[i].color).collect();
        let hue_histogram = HueHistogram::from_colors(&colors, self.config.hue_bins);
        let color = main_color(&colors, &hue_histogram);

        let mut patch = PlanePatch::new(
            normal,
            centroid,
            region.curvature,
            region.inliers.clone(),
            hull,
            hue_histogram,
            color,
            sensor_id,
        );

        if patch.area < self.config.min_area {
            return Err(Rejection::TooSmall);
        }
        if patch.elongation > self.config.max_elongation {
            return Err(Rejection::TooElongated);
        }

        patch.transform(extrinsic);
        patch.shift_inliers(index_offset);
        Ok(patch)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::cloud::ColoredPoint;

    /// Organized `n x n` grid on the plane z = `depth`, spanning `side` meters
    /// in x and y, centered on the optical axis.
    pub fn grid_cloud(n: usize, side: f64, depth: f64) -> PointCloud {
        let step = side / (n - 1) as f64;
        let mut points = Vec::with_capacity(n * n);
        for r in 0..n {
            for c in 0..n {
                let p = Vector3::new(-side / 2.0 + c as f64 * step, -side / 2.0 + r as f64 * step, depth);
                points.push(ColoredPoint::new(p, [200, 30, 30]));
            }
        }
        PointCloud::new(n, n, points)
    }

    /// Region covering the columns `[col_start, col_end)` of an `n x n` grid
    /// at z = `depth`, with the plane equation given in the "away" sign.
    pub fn column_region(n: usize, col_start: usize, col_end: usize, depth: f64) -> PlanarRegion {
        let inliers = (0..n)
            .flat_map(|r| (col_start..col_end).map(move |c| r * n + c))
            .collect();
        PlanarRegion::new(inliers, [0.0, 0.0, 1.0, -depth], Vec::new(), 0.0005)
    }
}
