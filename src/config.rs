//! Pipeline configuration, loadable from YAML.
//!
//! Every field has a default, so a configuration file only needs to list the
//! values it overrides:
//!
//! ```yaml
//! num_workers: 8
//! fusion:
//!   ring_closure: false
//! ransac:
//!   distance_threshold: 0.03
//! ```

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::extraction::SensorExtractionConfig;
use crate::fusion::{FusionConfig, GlobalMergeConfig};
use crate::segmentation::{OrganizedNormalEstimator, RansacConfig};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Worker threads for per-sensor extraction.
    pub num_workers: usize,
    pub extraction: SensorExtractionConfig,
    pub fusion: FusionConfig,
    pub global_merge: GlobalMergeConfig,
    pub normals: OrganizedNormalEstimator,
    pub ransac: RansacConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            num_workers: 4,
            extraction: SensorExtractionConfig::default(),
            fusion: FusionConfig::default(),
            global_merge: GlobalMergeConfig::default(),
            normals: OrganizedNormalEstimator::default(),
            ransac: RansacConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml).context("Failed to parse pipeline config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_yaml_str(&yaml).with_context(|| format!("Invalid config file: {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_workers == 0 {
            bail!("num_workers must be at least 1");
        }
        if self.extraction.builder.hue_bins < 3 {
            bail!(
                "hue_bins must be at least 3, got {}",
                self.extraction.builder.hue_bins
            );
        }
        for (stage, cos) in [
            ("local merge", self.extraction.local_merge.criteria.min_normal_cos),
            ("fusion", self.fusion.criteria.min_normal_cos),
            ("global merge", self.global_merge.criteria.min_normal_cos),
        ] {
            if !(-1.0..=1.0).contains(&cos) {
                bail!("{} min_normal_cos out of range: {}", stage, cos);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_relative_eq!(config.extraction.builder.min_area, 0.12);
        assert_relative_eq!(config.extraction.local_merge.criteria.max_offset_diff, 0.05);
        assert_relative_eq!(config.fusion.criteria.proximity.max_distance, 0.5);
        assert_relative_eq!(config.global_merge.criteria.proximity.max_perpendicular, 0.06);
        assert!(config.fusion.ring_closure);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "
num_workers: 8
fusion:
  ring_closure: false
  criteria:
    min_normal_cos: 0.98
    max_offset_diff: 0.3
    proximity:
      max_distance: 0.4
      max_perpendicular: 0.05
ransac:
  seed: 7
";
        let config = PipelineConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.num_workers, 8);
        assert!(!config.fusion.ring_closure);
        assert_relative_eq!(config.fusion.criteria.min_normal_cos, 0.98);
        assert_eq!(config.fusion.criteria.max_hue_distance, None);
        assert_relative_eq!(config.fusion.min_area, 0.5);
        assert_eq!(config.ransac.seed, 7);
        assert_eq!(config.ransac.min_inliers, 100);
    }

    #[test]
    fn test_rejects_zero_workers() {
        assert!(PipelineConfig::from_yaml_str("num_workers: 0").is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.yaml");
        std::fs::write(&path, "extraction:\n  min_valid_points: 500\n").unwrap();

        let config = PipelineConfig::from_yaml_file(&path).unwrap();
        assert_eq!(config.extraction.min_valid_points, 500);
        assert!(PipelineConfig::from_yaml_file(dir.path().join("missing.yaml")).is_err());
    }
}
