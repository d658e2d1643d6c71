//! Geometry utilities: SE3 transforms, planar hulls, segment distances and
//! voxel downsampling.

pub mod hull;
pub mod se3;
pub mod segment;
pub mod voxel;

pub use hull::{convex_hull_on_plane, elongation_and_principal_direction, plane_basis, polygon_area};
pub use se3::SE3;
pub use segment::{segment_to_segment, SegmentDistance};
pub use voxel::voxel_downsample;
