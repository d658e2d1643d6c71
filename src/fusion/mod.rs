//! Fusion of the sensors' local patch lists into one global list.

pub mod cross_sensor;
pub mod global_merge;

pub use cross_sensor::{fuse_sensor_lists, fuse_sensor_lists_detailed, FusionConfig, FusionResult};
pub use global_merge::{merge_global, GlobalMergeConfig, GlobalMergeReport};
