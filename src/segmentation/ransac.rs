//! Sequential RANSAC plane extraction.
//!
//! Detects the dominant plane, removes its inliers, and repeats on the
//! remaining points until too few are left. Regions are produced without a
//! boundary polygon; the patch builder hulls their voxelized inliers instead.

use nalgebra::{Matrix3, SymmetricEigen, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cloud::PointCloud;

use super::region::PlanarRegion;
use super::traits::{PlaneFit, PlaneFitter, RegionSegmenter, SegmentationError};

/// Configuration for RANSAC plane fitting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RansacConfig {
    /// Maximum number of RANSAC iterations per plane.
    pub max_iterations: usize,
    /// Point-to-plane inlier threshold in meters.
    pub distance_threshold: f64,
    /// Minimum number of inliers for a plane to be accepted.
    pub min_inliers: usize,
    /// Extraction stops once fewer than this fraction of valid points remain.
    pub min_remaining_fraction: f64,
    /// Maximum number of planes extracted per cloud.
    pub max_planes: usize,
    /// Maximum angle (radians) between a point normal and the plane normal.
    pub angular_threshold: f64,
    /// Probability of finding a good model (adaptive iteration count).
    pub probability: f64,
    /// RNG seed, so extraction is reproducible frame to frame.
    pub seed: u64,
}

impl Default for RansacConfig {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            distance_threshold: 0.02, // 2cm
            min_inliers: 100,
            min_remaining_fraction: 0.2,
            max_planes: 20,
            angular_threshold: 0.039812, // ~3 degrees
            probability: 0.99,
            seed: 42,
        }
    }
}

/// Least-squares plane through points.
///
/// Returns unit normal, offset and curvature (λmin / Σλ of the covariance).
pub fn fit_plane_least_squares(points: &[Vector3<f64>]) -> Option<(Vector3<f64>, f64, f64)> {
    if points.len() < 3 {
        return None;
    }
    let n = points.len() as f64;
    let centroid: Vector3<f64> = points.iter().sum::<Vector3<f64>>() / n;
    let mut cov = Matrix3::zeros();
    for p in points {
        let d = p - centroid;
        cov += d * d.transpose();
    }
    cov /= n;

    let eigen = SymmetricEigen::new(cov);
    let (min_idx, _) = eigen
        .eigenvalues
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))?;
    let normal = eigen.eigenvectors.column(min_idx).into_owned();
    let norm = normal.norm();
    if norm < 1e-12 {
        return None;
    }
    let normal = normal / norm;

    let trace = eigen.eigenvalues.sum();
    let curvature = if trace > 1e-15 {
        eigen.eigenvalues[min_idx].max(0.0) / trace
    } else {
        0.0
    };
    Some((normal, -normal.dot(&centroid), curvature))
}

/// RANSAC plane fitter with least-squares refinement on the inliers.
#[derive(Debug, Clone, Default)]
pub struct RansacPlaneFitter {
    pub config: RansacConfig,
}

impl RansacPlaneFitter {
    pub fn new(config: RansacConfig) -> Self {
        Self { config }
    }

    /// Fit using the caller's RNG (sequential extraction shares one RNG).
    pub fn fit_with_rng(&self, points: &[Vector3<f64>], rng: &mut impl Rng) -> Option<PlaneFit> {
        let n = points.len();
        if n < 3 || n < self.config.min_inliers {
            return None;
        }

        let mut best: Option<(Vector3<f64>, f64, usize)> = None;
        let mut max_iter = self.config.max_iterations;
        let mut iteration = 0;

        while iteration < max_iter {
            iteration += 1;
            let [i0, i1, i2] = sample_three_indices(rng, n);
            let normal = (points[i1] - points[i0]).cross(&(points[i2] - points[i0]));
            let norm = normal.norm();
            if norm < 1e-12 {
                continue;
            }
            let normal = normal / norm;
            let offset = -normal.dot(&points[i0]);

            let count = points
                .iter()
                .filter(|p| (normal.dot(p) + offset).abs() < self.config.distance_threshold)
                .count();

            if best.map_or(true, |(_, _, c)| count > c) {
                best = Some((normal, offset, count));
                let ratio = count as f64 / n as f64;
                let adaptive = compute_adaptive_iterations(ratio, self.config.probability, 3);
                max_iter = max_iter.min(iteration.saturating_add(adaptive));
            }
        }

        let (normal, offset, _) = best?;
        let inliers = self.collect_inliers(points, &normal, offset);
        if inliers.len() < self.config.min_inliers {
            return None;
        }

        // Refine with all inliers, keep the refinement only if it does not lose support
        let inlier_pts: Vec<_> = inliers.iter().map(|&i| points[i]).collect();
        let (normal, offset, inliers) = match fit_plane_least_squares(&inlier_pts) {
            Some((n_ref, d_ref, _)) => {
                let refined = self.collect_inliers(points, &n_ref, d_ref);
                if refined.len() >= inliers.len() {
                    (n_ref, d_ref, refined)
                } else {
                    (normal, offset, inliers)
                }
            }
            None => (normal, offset, inliers),
        };

        Some(PlaneFit {
            coefficients: [normal.x, normal.y, normal.z, offset],
            inliers,
        })
    }

    fn collect_inliers(&self, points: &[Vector3<f64>], normal: &Vector3<f64>, offset: f64) -> Vec<usize> {
        points
            .iter()
            .enumerate()
            .filter(|(_, p)| (normal.dot(p) + offset).abs() < self.config.distance_threshold)
            .map(|(i, _)| i)
            .collect()
    }
}

impl PlaneFitter for RansacPlaneFitter {
    fn fit(&self, points: &[Vector3<f64>]) -> Option<PlaneFit> {
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        self.fit_with_rng(points, &mut rng)
    }
}

/// Region segmenter built on sequential RANSAC.
#[derive(Debug, Clone, Default)]
pub struct RansacSegmenter {
    fitter: RansacPlaneFitter,
}

impl RansacSegmenter {
    pub fn new(config: RansacConfig) -> Self {
        Self {
            fitter: RansacPlaneFitter::new(config),
        }
    }

    pub fn config(&self) -> &RansacConfig {
        &self.fitter.config
    }
}

impl RegionSegmenter for RansacSegmenter {
    fn segment(
        &self,
        cloud: &PointCloud,
        normals: &[Vector3<f64>],
    ) -> Result<Vec<PlanarRegion>, SegmentationError> {
        if normals.len() != cloud.len() {
            return Err(SegmentationError::NormalCountMismatch {
                expected: cloud.len(),
                actual: normals.len(),
            });
        }

        let config = self.config();
        let mut rng = StdRng::seed_from_u64(config.seed);

        // Indices into the cloud of points not yet assigned to a plane
        let mut remaining: Vec<usize> = (0..cloud.len())
            .filter(|&i| cloud.points[i].is_valid())
            .collect();
        let min_remaining = (config.min_remaining_fraction * remaining.len() as f64) as usize;
        let cos_threshold = config.angular_threshold.cos();

        let mut regions = Vec::new();
        while remaining.len() > min_remaining.max(2) && regions.len() < config.max_planes {
            let points: Vec<_> = remaining.iter().map(|&i| cloud.points[i].position).collect();
            let Some(fit) = self.fitter.fit_with_rng(&points, &mut rng) else {
                break;
            };

            let plane_normal = Vector3::new(fit.coefficients[0], fit.coefficients[1], fit.coefficients[2]);
            let members: Vec<usize> = fit
                .inliers
                .iter()
                .map(|&local| remaining[local])
                .filter(|&i| {
                    let n = normals[i];
                    !n.iter().all(|c| c.is_finite()) || n.dot(&plane_normal).abs() >= cos_threshold
                })
                .collect();

            // Plane inliers leave the pool even when their normals disagree
            let taken: std::collections::HashSet<usize> =
                fit.inliers.iter().map(|&local| remaining[local]).collect();
            remaining.retain(|i| !taken.contains(i));

            if members.len() < config.min_inliers {
                continue;
            }

            let member_pts: Vec<_> = members.iter().map(|&i| cloud.points[i].position).collect();
            let curvature = fit_plane_least_squares(&member_pts)
                .map(|(_, _, c)| c)
                .unwrap_or(0.0);

            regions.push(PlanarRegion::new(members, fit.coefficients, Vec::new(), curvature));
        }

        debug!(
            "[RansacSegmenter] {} regions, {} points left unassigned",
            regions.len(),
            remaining.len()
        );
        Ok(regions)
    }
}

fn sample_three_indices(rng: &mut impl Rng, n: usize) -> [usize; 3] {
    let mut indices = [0usize; 3];
    indices[0] = rng.gen_range(0..n);

    loop {
        indices[1] = rng.gen_range(0..n);
        if indices[1] != indices[0] {
            break;
        }
    }

    loop {
        indices[2] = rng.gen_range(0..n);
        if indices[2] != indices[0] && indices[2] != indices[1] {
            break;
        }
    }

    indices
}

fn compute_adaptive_iterations(inlier_ratio: f64, probability: f64, sample_size: usize) -> usize {
    if inlier_ratio <= 0.0 {
        return usize::MAX;
    }
    if inlier_ratio >= 1.0 {
        return 1;
    }

    // k = log(1 - p) / log(1 - w^n)
    let w_n = inlier_ratio.powi(sample_size as i32);
    let log_denom = (1.0 - w_n).ln();
    if log_denom.abs() < 1e-10 {
        return usize::MAX;
    }
    ((1.0 - probability).ln() / log_denom).ceil().max(1.0) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::ColoredPoint;
    use approx::assert_relative_eq;
    use rand::Rng;

    /// Two perpendicular walls meeting at x = 0, seen from the origin.
    fn corner_cloud() -> PointCloud {
        let mut points = Vec::new();
        let (width, height) = (20, 20);
        for r in 0..height {
            for c in 0..width {
                let y = r as f64 * 0.05 - 0.5;
                let p = if c < width / 2 {
                    Vector3::new(-1.0 + c as f64 * 0.1, y, 2.0)
                } else {
                    Vector3::new(0.0 + 1e-3 * (c % 2) as f64, y, 2.0 - (c - width / 2 + 1) as f64 * 0.1)
                };
                points.push(ColoredPoint::new(p, [120, 40, 40]));
            }
        }
        PointCloud::new(width, height, points)
    }

    #[test]
    fn test_least_squares_plane() {
        let pts: Vec<_> = (0..25)
            .map(|i| Vector3::new((i % 5) as f64, (i / 5) as f64, 3.0))
            .collect();
        let (n, d, curvature) = fit_plane_least_squares(&pts).unwrap();
        assert_relative_eq!(n.z.abs(), 1.0, epsilon = 1e-9);
        assert_relative_eq!((n.z * 3.0 + d).abs(), 0.0, epsilon = 1e-9);
        assert_relative_eq!(curvature, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_ransac_fit_with_outliers() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut pts: Vec<_> = (0..200)
            .map(|_| Vector3::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0), 1.5))
            .collect();
        for _ in 0..40 {
            pts.push(Vector3::new(
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
                rng.gen_range(0.0..3.0),
            ));
        }

        let fitter = RansacPlaneFitter::new(RansacConfig {
            min_inliers: 100,
            ..Default::default()
        });
        let fit = fitter.fit(&pts).unwrap();
        assert!(fit.inliers.len() >= 200);
        let n = Vector3::new(fit.coefficients[0], fit.coefficients[1], fit.coefficients[2]);
        assert_relative_eq!(n.z.abs(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_segmenter_finds_both_walls() {
        let cloud = corner_cloud();
        let normals = vec![Vector3::new(f64::NAN, f64::NAN, f64::NAN); cloud.len()];
        let segmenter = RansacSegmenter::new(RansacConfig {
            min_inliers: 100,
            distance_threshold: 0.01,
            ..Default::default()
        });
        let regions = segmenter.segment(&cloud, &normals).unwrap();
        assert_eq!(regions.len(), 2);
        for region in &regions {
            assert_eq!(region.inliers.len(), 200);
            assert!(region.contour.is_empty());
        }
    }

    #[test]
    fn test_segmenter_rejects_normal_mismatch() {
        let cloud = corner_cloud();
        let result = RansacSegmenter::default().segment(&cloud, &[]);
        assert!(matches!(result, Err(SegmentationError::NormalCountMismatch { .. })));
    }

    #[test]
    fn test_adaptive_iterations() {
        assert_eq!(compute_adaptive_iterations(1.0, 0.99, 3), 1);
        assert!(compute_adaptive_iterations(0.5, 0.99, 3) > 10);
    }
}
