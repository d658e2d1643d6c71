//! Plane-based map primitives: patches, the lists that own them, and the
//! same-surface test shared by every merge stage.

pub mod criteria;
pub mod patch;
pub mod patch_list;
pub mod types;

pub use criteria::{hulls_are_near, ProximityThresholds, SameSurfaceCriteria};
pub use patch::PlanePatch;
pub use patch_list::{IdMismatch, PatchList};
pub use types::PatchId;
