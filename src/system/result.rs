//! Per-frame output of the plane extractor.

use crate::extraction::{SensorError, SensorStats};
use crate::fusion::GlobalMergeReport;
use crate::pbmap::PatchList;

/// Result of processing one frame.
#[derive(Debug)]
pub struct FrameResult {
    pub timestamp_ns: u64,
    /// Fused global patch list, in the rig frame.
    pub patches: PatchList,
    /// Each sensor's local list. Pass these back as the previous frame's
    /// lists to merge re-observations over time.
    pub local: Vec<PatchList>,
    /// Sensors that failed their preconditions this frame.
    pub sensor_errors: Vec<SensorError>,
    pub sensor_stats: Vec<SensorStats>,
    /// Local patches absorbed during cross-sensor fusion.
    pub fusion_merges: usize,
    pub global_merge: GlobalMergeReport,
    pub timing: TimingStats,
}

/// Timing breakdown for a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingStats {
    pub total_ms: f64,
    pub detection_ms: f64,
    pub fusion_ms: f64,
    pub global_merge_ms: f64,
}

impl TimingStats {
    pub fn zero() -> Self {
        Self {
            total_ms: 0.0,
            detection_ms: 0.0,
            fusion_ms: 0.0,
            global_merge_ms: 0.0,
        }
    }
}
