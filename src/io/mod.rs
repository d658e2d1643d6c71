//! File I/O: rig calibration, sensor clouds and patch export.

pub mod export;
pub mod rig;

pub use export::{read_patches_yaml, write_patches_yaml, PatchExport};
pub use rig::{load_cloud_csv, RigCalibration};
