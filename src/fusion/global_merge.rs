//! Global Merge Pass.
//!
//! Catches same-surface duplicates that survive cross-sensor fusion, e.g.
//! surfaces seen by non-adjacent sensors.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::pbmap::{PatchId, PatchList, ProximityThresholds, SameSurfaceCriteria};

/// Configuration for the global merge pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalMergeConfig {
    /// Both patches must be flatter than this to be merged.
    pub max_curvature: f64,
    pub criteria: SameSurfaceCriteria,
}

impl Default for GlobalMergeConfig {
    fn default() -> Self {
        Self {
            max_curvature: 0.0013,
            criteria: SameSurfaceCriteria {
                min_normal_cos: 0.99,
                max_offset_diff: 0.45,
                proximity: ProximityThresholds {
                    max_distance: 0.3,
                    max_perpendicular: 0.06,
                },
                max_hue_distance: None,
            },
        }
    }
}

/// Outcome of [`merge_global`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalMergeReport {
    /// Number of patches absorbed.
    pub merges: usize,
    /// Number of full sweeps over the list, the last one merging nothing.
    pub sweeps: usize,
    /// `remap[old]` is the id that now holds the patch formerly at `old`.
    pub remap: Vec<PatchId>,
}

/// Merge same-surface patches of `list` in place.
///
/// Pairs are visited in ascending `(j, k)` order. After `k` is absorbed into
/// `j`, `j` is re-tested from `j + 1`, since the grown patch may now reach
/// patches it missed. Sweeps repeat until one completes without a merge, so a
/// second call on the result merges nothing.
pub fn merge_global(list: &mut PatchList, config: &GlobalMergeConfig) -> GlobalMergeReport {
    let original_len = list.len();
    // Original ids folded into each current position
    let mut members: Vec<Vec<usize>> = (0..original_len).map(|i| vec![i]).collect();
    let mut report = GlobalMergeReport::default();

    loop {
        report.sweeps += 1;
        let merges_before = report.merges;

        let mut j = 0;
        while j < list.len() {
            if list[PatchId(j)].curvature >= config.max_curvature {
                j += 1;
                continue;
            }

            let mut k = j + 1;
            while k < list.len() {
                let (target_id, source_id) = (PatchId(j), PatchId(k));
                let same = list[source_id].curvature < config.max_curvature
                    && config.criteria.matches(&list[target_id], &list[source_id]);
                if !same {
                    k += 1;
                    continue;
                }

                if let Some((target, source)) = list.pair_mut(target_id, source_id) {
                    debug!("[GlobalMerge] {} absorbs {}", target_id, source_id);
                    target.absorb(source);
                }
                list.remove(source_id);
                let absorbed = members.remove(k);
                members[j].extend(absorbed);
                report.merges += 1;
                k = j + 1;
            }
            j += 1;
        }

        if report.merges == merges_before {
            break;
        }
    }

    report.remap = vec![PatchId(0); original_len];
    for (position, originals) in members.iter().enumerate() {
        for &old in originals {
            report.remap[old] = PatchId(position);
        }
    }

    debug!(
        "[GlobalMerge] {} -> {} patches ({} merges, {} sweeps)",
        original_len,
        list.len(),
        report.merges,
        report.sweeps
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pbmap::patch::test_support::square_patch;
    use crate::pbmap::PlanePatch;
    use nalgebra::Vector3;

    fn wall_at(x: f64, depth: f64, first_inlier: usize) -> PlanePatch {
        square_patch(Vector3::new(x, 0.0, depth), -Vector3::z(), 1.0, first_inlier)
    }

    fn merged_len(patches: Vec<PlanePatch>) -> usize {
        let mut list: PatchList = patches.into_iter().collect();
        merge_global(&mut list, &GlobalMergeConfig::default());
        list.len()
    }

    #[test]
    fn test_coplanar_neighbours_merge() {
        // Offsets differ by 0.01, nearest hull points 0.05 apart
        let a = wall_at(0.0, 2.0, 0);
        let b = wall_at(1.05, 2.01, 10);
        assert_relative_eq_offset(&a, &b, 0.01);

        let mut list: PatchList = vec![a, b].into_iter().collect();
        let report = merge_global(&mut list, &GlobalMergeConfig::default());
        assert_eq!(list.len(), 1);
        assert_eq!(report.merges, 1);
        assert_eq!(report.remap, vec![PatchId(0), PatchId(0)]);
        assert_eq!(list[PatchId(0)].inliers.len(), 20);
    }

    fn assert_relative_eq_offset(a: &PlanePatch, b: &PlanePatch, expected: f64) {
        approx::assert_relative_eq!((a.offset - b.offset).abs(), expected, epsilon = 1e-9);
    }

    #[test]
    fn test_parallel_planes_stay_apart() {
        let a = wall_at(0.0, 2.0, 0);
        let b = wall_at(0.0, 4.0, 10);
        assert_relative_eq_offset(&a, &b, 2.0);
        assert_eq!(merged_len(vec![a, b]), 2);
    }

    #[test]
    fn test_chain_merges_with_restart() {
        // The middle fragment comes last, so the far end only becomes
        // reachable after it has been absorbed
        let patches = vec![wall_at(0.0, 2.0, 0), wall_at(2.4, 2.0, 10), wall_at(1.2, 2.0, 20)];
        let mut list: PatchList = patches.into_iter().collect();
        let report = merge_global(&mut list, &GlobalMergeConfig::default());

        assert_eq!(list.len(), 1);
        assert_eq!(report.merges, 2);
        assert_eq!(list[PatchId(0)].inliers.len(), 30);
        assert!(list[PatchId(0)].area >= 3.4 - 1e-9);
    }

    #[test]
    fn test_remap_and_id_density() {
        let patches = vec![
            wall_at(0.0, 2.0, 0),
            wall_at(5.0, 2.0, 10),
            wall_at(1.2, 2.0, 20),
            wall_at(0.0, 6.0, 30),
        ];
        let mut list: PatchList = patches.into_iter().collect();
        let report = merge_global(&mut list, &GlobalMergeConfig::default());

        assert_eq!(list.len(), 3);
        assert!(list.check_ids().is_ok());
        assert_eq!(report.remap, vec![PatchId(0), PatchId(1), PatchId(0), PatchId(2)]);
        assert_eq!(list.total_inliers(), 40);
    }

    #[test]
    fn test_idempotent() {
        let patches = vec![
            wall_at(0.0, 2.0, 0),
            wall_at(6.0, 2.0, 10),
            wall_at(2.4, 2.0, 20),
            wall_at(7.2, 2.0, 30),
            wall_at(1.2, 2.0, 40),
            wall_at(0.0, 3.0, 50),
        ];
        let mut list: PatchList = patches.into_iter().collect();
        merge_global(&mut list, &GlobalMergeConfig::default());
        let once = list.clone();

        let report = merge_global(&mut list, &GlobalMergeConfig::default());
        assert_eq!(report.merges, 0);
        assert_eq!(report.sweeps, 1);
        assert_eq!(list, once);
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn test_curved_patches_skipped() {
        let a = wall_at(0.0, 2.0, 0);
        let mut b = wall_at(1.1, 2.0, 10);
        b.curvature = 0.002;
        assert_eq!(merged_len(vec![a, b]), 2);
    }

    #[test]
    fn test_normal_threshold_boundary() {
        let cos = GlobalMergeConfig::default().criteria.min_normal_cos;
        let eps = 1e-4;
        for (cos_angle, expected_len) in [(cos - eps, 2), (cos + eps, 1)] {
            let a = wall_at(0.0, 2.0, 0);
            let mut b = wall_at(0.0, 2.0, 10);
            let angle = cos_angle.acos();
            b.normal = Vector3::new(angle.sin(), 0.0, -angle.cos());
            b.offset = -b.normal.dot(&b.centroid);
            assert_eq!(merged_len(vec![a, b]), expected_len, "cos = {cos_angle}");
        }
    }

    #[test]
    fn test_offset_threshold_boundary() {
        let limit = GlobalMergeConfig::default().criteria.max_offset_diff;
        let eps = 1e-3;
        for (diff, expected_len) in [(limit + eps, 2), (limit - eps, 1)] {
            let a = wall_at(0.0, 2.0, 0);
            let mut b = wall_at(0.0, 2.0, 10);
            b.offset += diff;
            assert_eq!(merged_len(vec![a, b]), expected_len, "offset diff = {diff}");
        }
    }

    #[test]
    fn test_hull_distance_threshold_boundary() {
        let limit = GlobalMergeConfig::default().criteria.proximity.max_distance;
        let eps = 1e-3;
        for (gap, expected_len) in [(limit + eps, 2), (limit - eps, 1)] {
            let patches = vec![wall_at(0.0, 2.0, 0), wall_at(1.0 + gap, 2.0, 10)];
            assert_eq!(merged_len(patches), expected_len, "gap = {gap}");
        }
    }
}
