//! Capabilities the extraction pipeline consumes from external geometry code.
//!
//! Normal estimation and region segmentation are black boxes to the core:
//! implementations are injected, so tests can substitute deterministic fakes.

use nalgebra::Vector3;
use thiserror::Error;

use crate::cloud::PointCloud;

use super::region::PlanarRegion;

/// Failures reported by injected geometry capabilities.
#[derive(Debug, Error)]
pub enum SegmentationError {
    #[error("cloud is not organized ({width}x{height}, {len} points)")]
    NotOrganized {
        width: usize,
        height: usize,
        len: usize,
    },
    #[error("expected {expected} normals, got {actual}")]
    NormalCountMismatch { expected: usize, actual: usize },
    #[error("segmentation failed: {0}")]
    Failed(String),
}

/// Per-point normal estimation over an organized cloud.
///
/// Must return exactly one normal per point; points without a normal get a
/// non-finite vector.
pub trait NormalEstimator: Send + Sync {
    fn estimate(&self, cloud: &PointCloud) -> Result<Vec<Vector3<f64>>, SegmentationError>;
}

/// Detection of planar regions from a cloud and its normals.
pub trait RegionSegmenter: Send + Sync {
    fn segment(
        &self,
        cloud: &PointCloud,
        normals: &[Vector3<f64>],
    ) -> Result<Vec<PlanarRegion>, SegmentationError>;
}

/// Fitted plane with its supporting points.
#[derive(Debug, Clone)]
pub struct PlaneFit {
    /// `[a, b, c, d]` with unit `(a, b, c)`.
    pub coefficients: [f64; 4],
    /// Indices into the point slice given to the fitter.
    pub inliers: Vec<usize>,
}

/// Single-plane robust fit over a set of points.
pub trait PlaneFitter: Send + Sync {
    fn fit(&self, points: &[Vector3<f64>]) -> Option<PlaneFit>;
}
