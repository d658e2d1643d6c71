//! Local Merge Engine - identity resolution inside one sensor's patch list.
//!
//! Folds fragments of the same surface detected in one frame, and
//! re-observations of a surface across frames, into a single patch.

use serde::{Deserialize, Serialize};

use crate::pbmap::{PatchId, PatchList, PlanePatch, ProximityThresholds, SameSurfaceCriteria};

/// Configuration for local merging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalMergeConfig {
    /// Both patches must be flatter than this to be merge candidates.
    pub max_curvature: f64,
    pub criteria: SameSurfaceCriteria,
}

impl Default for LocalMergeConfig {
    fn default() -> Self {
        Self {
            max_curvature: 0.0013,
            criteria: SameSurfaceCriteria {
                min_normal_cos: 0.99,
                max_offset_diff: 0.05,
                proximity: ProximityThresholds {
                    max_distance: 0.2,
                    max_perpendicular: 0.1,
                },
                max_hue_distance: None,
            },
        }
    }
}

/// What happened to a patch handed to [`merge_or_append`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Absorbed by the existing patch with this id.
    Merged(PatchId),
    /// Appended under this new id.
    Appended(PatchId),
}

impl MergeOutcome {
    pub fn id(self) -> PatchId {
        match self {
            MergeOutcome::Merged(id) | MergeOutcome::Appended(id) => id,
        }
    }
}

/// Merge `patch` into the first matching patch of `list`, or append it.
///
/// Curved patches never merge; they are appended as they are.
pub fn merge_or_append(list: &mut PatchList, patch: PlanePatch, config: &LocalMergeConfig) -> MergeOutcome {
    if patch.curvature < config.max_curvature {
        let target = list
            .iter()
            .find(|q| q.curvature < config.max_curvature && config.criteria.matches(q, &patch))
            .map(|q| q.id);

        if let Some(id) = target {
            if let Some(existing) = list.get_mut(id) {
                existing.absorb(&patch);
                return MergeOutcome::Merged(id);
            }
        }
    }
    MergeOutcome::Appended(list.push(patch))
}
