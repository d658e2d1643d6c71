//! Per-sensor patch extraction: building patches from detected regions and
//! merging them into the sensor's local list.

pub mod builder;
pub mod local_merge;
pub mod sensor;

pub use builder::{PatchBuilder, PatchBuilderConfig, Rejection};
pub use local_merge::{merge_or_append, LocalMergeConfig, MergeOutcome};
pub use sensor::{SensorError, SensorExtractionConfig, SensorExtractor, SensorJob, SensorOutput, SensorStats};
