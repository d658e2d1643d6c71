//! Voxel-grid downsampling.

use std::collections::BTreeMap;

use nalgebra::Vector3;

/// Replace all points falling in the same cubic voxel of side `leaf` by their centroid.
///
/// Output order is deterministic (sorted by voxel key). Non-finite points are skipped.
pub fn voxel_downsample(points: &[Vector3<f64>], leaf: f64) -> Vec<Vector3<f64>> {
    if leaf <= 0.0 {
        return points.iter().filter(|p| p.iter().all(|c| c.is_finite())).copied().collect();
    }

    let mut voxels: BTreeMap<(i64, i64, i64), (Vector3<f64>, usize)> = BTreeMap::new();
    for p in points.iter().filter(|p| p.iter().all(|c| c.is_finite())) {
        let key = (
            (p.x / leaf).floor() as i64,
            (p.y / leaf).floor() as i64,
            (p.z / leaf).floor() as i64,
        );
        let entry = voxels.entry(key).or_insert((Vector3::zeros(), 0));
        entry.0 += p;
        entry.1 += 1;
    }

    voxels
        .into_values()
        .map(|(sum, count)| sum / count as f64)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_points_in_one_voxel_collapse() {
        let pts = vec![
            Vector3::new(0.01, 0.01, 0.01),
            Vector3::new(0.03, 0.03, 0.03),
            Vector3::new(0.2, 0.0, 0.0),
        ];
        let out = voxel_downsample(&pts, 0.05);
        assert_eq!(out.len(), 2);
        assert_relative_eq!(out[0], Vector3::new(0.02, 0.02, 0.02), epsilon = 1e-12);
    }

    #[test]
    fn test_nan_points_are_skipped() {
        let pts = vec![Vector3::new(f64::NAN, 0.0, 0.0), Vector3::new(0.0, 0.0, 0.0)];
        assert_eq!(voxel_downsample(&pts, 0.05).len(), 1);
    }
}
