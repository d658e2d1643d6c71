//! Per-sensor extraction: normals, regions, patches and local merge for one
//! sensor's cloud.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::cloud::PointCloud;
use crate::geometry::SE3;
use crate::pbmap::PatchList;
use crate::segmentation::{NormalEstimator, RegionSegmenter, SegmentationError};

use super::builder::{PatchBuilder, PatchBuilderConfig};
use super::local_merge::{merge_or_append, LocalMergeConfig, MergeOutcome};

/// Precondition violations that abort one sensor's frame.
#[derive(Debug, Error)]
pub enum SensorError {
    #[error("sensor {sensor_id}: cloud is not organized ({width}x{height}, {len} points)")]
    NotOrganized {
        sensor_id: usize,
        width: usize,
        height: usize,
        len: usize,
    },
    #[error("sensor {sensor_id}: {valid} valid points, at least {required} required")]
    TooFewPoints {
        sensor_id: usize,
        valid: usize,
        required: usize,
    },
    #[error("sensor {sensor_id}: expected {expected} normals, got {actual}")]
    NormalCountMismatch {
        sensor_id: usize,
        expected: usize,
        actual: usize,
    },
    #[error("sensor {sensor_id}: no extrinsic calibration")]
    MissingExtrinsic { sensor_id: usize },
    #[error("sensor {sensor_id}: {source}")]
    Segmentation {
        sensor_id: usize,
        #[source]
        source: SegmentationError,
    },
}

impl SensorError {
    pub fn sensor_id(&self) -> usize {
        match self {
            SensorError::NotOrganized { sensor_id, .. }
            | SensorError::TooFewPoints { sensor_id, .. }
            | SensorError::NormalCountMismatch { sensor_id, .. }
            | SensorError::MissingExtrinsic { sensor_id }
            | SensorError::Segmentation { sensor_id, .. } => *sensor_id,
        }
    }
}

/// Configuration for one sensor's extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorExtractionConfig {
    /// Clouds with fewer valid points are rejected.
    pub min_valid_points: usize,
    pub builder: PatchBuilderConfig,
    pub local_merge: LocalMergeConfig,
}

impl Default for SensorExtractionConfig {
    fn default() -> Self {
        Self {
            min_valid_points: 100,
            builder: PatchBuilderConfig::default(),
            local_merge: LocalMergeConfig::default(),
        }
    }
}

/// Input for one sensor.
#[derive(Debug, Clone)]
pub struct SensorJob<'a> {
    pub sensor_id: usize,
    pub cloud: &'a PointCloud,
    /// Sensor-to-rig transform.
    pub extrinsic: SE3,
    /// Patches carried over from this sensor's previous frame.
    pub seed: PatchList,
}

/// Counters for one sensor's extraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SensorStats {
    pub regions: usize,
    pub rejected: usize,
    pub merged: usize,
    pub appended: usize,
}

/// Local patch list of one sensor, in the rig frame.
#[derive(Debug, Clone)]
pub struct SensorOutput {
    pub sensor_id: usize,
    pub patches: PatchList,
    pub stats: SensorStats,
}

/// Runs detection, patch building and local merge for a single sensor.
pub struct SensorExtractor<'a> {
    estimator: &'a dyn NormalEstimator,
    segmenter: &'a dyn RegionSegmenter,
    config: &'a SensorExtractionConfig,
    builder: PatchBuilder,
}

impl<'a> SensorExtractor<'a> {
    pub fn new(
        estimator: &'a dyn NormalEstimator,
        segmenter: &'a dyn RegionSegmenter,
        config: &'a SensorExtractionConfig,
    ) -> Self {
        Self {
            estimator,
            segmenter,
            config,
            builder: PatchBuilder::new(config.builder.clone()),
        }
    }

    /// Extract the sensor's local patch list.
    ///
    /// Inlier indices are expressed in the stacked cloud, where this sensor's
    /// points start at `sensor_id * cloud.len()`.
    pub fn extract(&self, job: SensorJob<'_>) -> Result<SensorOutput, SensorError> {
        let SensorJob {
            sensor_id,
            cloud,
            extrinsic,
            seed,
        } = job;

        if !cloud.is_organized() {
            return Err(SensorError::NotOrganized {
                sensor_id,
                width: cloud.width,
                height: cloud.height,
                len: cloud.len(),
            });
        }
        let valid = cloud.num_valid();
        if valid < self.config.min_valid_points {
            return Err(SensorError::TooFewPoints {
                sensor_id,
                valid,
                required: self.config.min_valid_points,
            });
        }

        let normals: Vec<Vector3<f64>> = self
            .estimator
            .estimate(cloud)
            .map_err(|source| SensorError::Segmentation { sensor_id, source })?;
        if normals.len() != cloud.len() {
            return Err(SensorError::NormalCountMismatch {
                sensor_id,
                expected: cloud.len(),
                actual: normals.len(),
            });
        }

        let regions = self
            .segmenter
            .segment(cloud, &normals)
            .map_err(|source| SensorError::Segmentation { sensor_id, source })?;

        let index_offset = sensor_id * cloud.len();
        let mut patches = seed;
        let mut stats = SensorStats {
            regions: regions.len(),
            ..Default::default()
        };

        for region in &regions {
            let Some(patch) = self
                .builder
                .build(region, cloud, sensor_id, &extrinsic, index_offset)
            else {
                stats.rejected += 1;
                continue;
            };
            match merge_or_append(&mut patches, patch, &self.config.local_merge) {
                MergeOutcome::Merged(_) => stats.merged += 1,
                MergeOutcome::Appended(_) => stats.appended += 1,
            }
        }

        debug!(
            "[LocalMerge] sensor={}: regions={} rejected={} merged={} appended={} patches={}",
            sensor_id,
            stats.regions,
            stats.rejected,
            stats.merged,
            stats.appended,
            patches.len()
        );

        Ok(SensorOutput {
            sensor_id,
            patches,
            stats,
        })
    }
}
