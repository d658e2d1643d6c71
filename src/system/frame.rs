//! One synchronized capture of the sensor ring.

use crate::cloud::{stack_clouds, PointCloud};
use crate::geometry::SE3;

/// Clouds of all sensors taken at the same instant, in sensor order.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    /// Timestamp in nanoseconds.
    pub timestamp_ns: u64,
    /// `clouds[i]` is sensor i's cloud, in sensor i's frame.
    pub clouds: Vec<PointCloud>,
}

impl Frame {
    pub fn new(timestamp_ns: u64, clouds: Vec<PointCloud>) -> Self {
        Self { timestamp_ns, clouds }
    }

    pub fn num_sensors(&self) -> usize {
        self.clouds.len()
    }

    /// All sensor clouds expressed in the rig frame and stacked in sensor
    /// order. Patch inlier indices refer to this cloud. Sensors beyond the
    /// end of `extrinsics` are left out.
    pub fn omnidirectional_cloud(&self, extrinsics: &[SE3]) -> PointCloud {
        let in_rig: Vec<PointCloud> = self
            .clouds
            .iter()
            .zip(extrinsics)
            .map(|(cloud, pose)| cloud.transformed(pose))
            .collect();
        stack_clouds(&in_rig)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::ColoredPoint;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    #[test]
    fn test_omnidirectional_cloud() {
        let cloud = PointCloud::new(
            2,
            2,
            vec![ColoredPoint::new(Vector3::new(0.0, 0.0, 1.0), [1, 2, 3]); 4],
        );
        let frame = Frame::new(0, vec![cloud.clone(), cloud]);
        let extrinsics = [
            SE3::identity(),
            SE3::from_axis_angle(Vector3::y(), std::f64::consts::PI, Vector3::zeros()),
        ];

        let omni = frame.omnidirectional_cloud(&extrinsics);
        assert_eq!(omni.len(), 8);
        assert_eq!(omni.height, 4);
        assert_relative_eq!(omni.points[4].position, Vector3::new(0.0, 0.0, -1.0), epsilon = 1e-12);
    }
}
