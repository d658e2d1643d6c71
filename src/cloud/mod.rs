//! Point cloud types consumed from the sensor collaborators, and the color
//! statistics computed over patch inliers.

pub mod color;
pub mod point_cloud;

pub use color::{main_color, HueHistogram, DEFAULT_HUE_BINS};
pub use point_cloud::{stack_clouds, ColoredPoint, PointCloud};
