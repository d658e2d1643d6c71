//! Frame-level orchestration.
//!
//! `PlaneExtractor` owns the rig calibration and the injected detectors and
//! turns each `Frame` into a `FrameResult`. No state survives between frames
//! except what the caller passes back in as the previous local lists.

pub mod frame;
pub mod messages;
mod plane_extractor;
pub mod result;

pub use frame::Frame;
pub use messages::SensorResultMsg;
pub use plane_extractor::PlaneExtractor;
pub use result::{FrameResult, TimingStats};
