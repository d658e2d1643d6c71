//! Raw planar regions as delivered by a region segmenter.

use nalgebra::Vector3;

/// A candidate planar region detected in one sensor's cloud.
///
/// Indices refer to the sensor's own cloud. The plane is
/// `a*x + b*y + c*z + d = 0` with `coefficients = [a, b, c, d]`; the normal is
/// not required to be unit length nor oriented.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanarRegion {
    /// Indices of the member points in the source cloud.
    pub inliers: Vec<usize>,
    /// Plane equation coefficients.
    pub coefficients: [f64; 4],
    /// Boundary polygon in the sensor frame. May be empty.
    pub contour: Vec<Vector3<f64>>,
    /// Planarity residual of the fit; small means flat.
    pub curvature: f64,
}

impl PlanarRegion {
    pub fn new(
        inliers: Vec<usize>,
        coefficients: [f64; 4],
        contour: Vec<Vector3<f64>>,
        curvature: f64,
    ) -> Self {
        Self {
            inliers,
            coefficients,
            contour,
            curvature,
        }
    }

    /// Normal part of the plane equation, as given.
    pub fn raw_normal(&self) -> Vector3<f64> {
        Vector3::new(self.coefficients[0], self.coefficients[1], self.coefficients[2])
    }
}
