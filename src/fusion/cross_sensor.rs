//! Cross-Sensor Fusion Engine.
//!
//! Folds each sensor's local list into one global list. Only patches touched
//! by the previous sensor (the frontier) are candidates, which models the
//! overlap between adjacent sensors in the ring.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::pbmap::{PatchId, PatchList, PlanePatch, ProximityThresholds, SameSurfaceCriteria};

/// Configuration for cross-sensor fusion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Flatness threshold of the candidacy guard.
    pub max_curvature: f64,
    /// Area (m²) above which a patch is a candidate regardless of curvature.
    pub min_area: f64,
    pub criteria: SameSurfaceCriteria,
    /// Re-admit the first sensor's patches before the last sensor, which
    /// overlaps sensor 0 in a closed ring.
    pub ring_closure: bool,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            max_curvature: 0.0013,
            min_area: 0.5,
            criteria: SameSurfaceCriteria {
                min_normal_cos: 0.99,
                max_offset_diff: 0.45,
                proximity: ProximityThresholds {
                    max_distance: 0.5,
                    max_perpendicular: 0.09,
                },
                max_hue_distance: None,
            },
            ring_closure: true,
        }
    }
}

impl FusionConfig {
    fn is_candidate(&self, patch: &PlanePatch) -> bool {
        patch.area > self.min_area || patch.curvature < self.max_curvature
    }
}

/// Result of fusing the sensors' local lists.
#[derive(Debug, Clone, Default)]
pub struct FusionResult {
    pub patches: PatchList,
    /// Local patches absorbed by an existing global patch.
    pub merged: usize,
    /// Local patches appended as new global patches (sensor 0 included).
    pub appended: usize,
}

/// Fuse per-sensor lists (ordered around the ring) into one global list.
pub fn fuse_sensor_lists(lists: &[PatchList], config: &FusionConfig) -> PatchList {
    fuse_sensor_lists_detailed(lists, config).patches
}

/// Fuse per-sensor lists and report merge statistics.
///
/// Sensor 0 seeds the global list. Each local patch of a later sensor is
/// merged into the first frontier patch (ascending id) it matches, otherwise
/// appended. The frontier for the next sensor holds the ids touched by the
/// current one.
pub fn fuse_sensor_lists_detailed(lists: &[PatchList], config: &FusionConfig) -> FusionResult {
    let Some((first, rest)) = lists.split_first() else {
        return FusionResult::default();
    };

    let mut global: PatchList = first.iter().cloned().collect();
    let seed: BTreeSet<PatchId> = global.iter().map(|p| p.id).collect();
    let mut frontier = seed.clone();
    let mut result = FusionResult {
        appended: global.len(),
        ..Default::default()
    };

    let last_sensor = lists.len() - 1;
    for (offset, local) in rest.iter().enumerate() {
        let sensor_id = offset + 1;
        let mut next_frontier = BTreeSet::new();

        for patch in local {
            let target = if config.is_candidate(patch) {
                frontier.iter().copied().find(|&j| {
                    let existing = &global[j];
                    config.is_candidate(existing) && config.criteria.matches(existing, patch)
                })
            } else {
                None
            };

            if let Some(j) = target {
                if let Some(existing) = global.get_mut(j) {
                    existing.absorb(patch);
                    next_frontier.insert(j);
                    result.merged += 1;
                    continue;
                }
            }
            next_frontier.insert(global.push(patch.clone()));
            result.appended += 1;
        }

        frontier = next_frontier;
        if config.ring_closure && lists.len() > 2 && sensor_id + 1 == last_sensor {
            frontier.extend(seed.iter().copied());
        }

        debug!(
            "[Fusion] sensor={}: local={} global={} frontier={}",
            sensor_id,
            local.len(),
            global.len(),
            frontier.len()
        );
    }

    result.patches = global;
    result
}
