//! Messages exchanged between the frame orchestrator and extraction workers.

use crate::extraction::{SensorError, SensorOutput};

/// Result sent back by a worker once a sensor has been processed.
pub struct SensorResultMsg {
    /// Sensor the result belongs to.
    pub sensor_id: usize,

    /// Local patch list, or the precondition that failed.
    pub result: Result<SensorOutput, SensorError>,
}
