//! Normal estimation and planar region segmentation.
//!
//! The pipeline only depends on the [`NormalEstimator`] and
//! [`RegionSegmenter`] traits; the organized-cloud normal estimator and the
//! sequential RANSAC segmenter are the default implementations.

pub mod normals;
pub mod ransac;
pub mod region;
pub mod traits;

pub use normals::OrganizedNormalEstimator;
pub use ransac::{fit_plane_least_squares, RansacConfig, RansacPlaneFitter, RansacSegmenter};
pub use region::PlanarRegion;
pub use traits::{NormalEstimator, PlaneFit, PlaneFitter, RegionSegmenter, SegmentationError};
