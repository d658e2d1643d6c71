//! Identifier types for plane patches.

use serde::{Deserialize, Serialize};

/// Position of a patch within its owning [`PatchList`](super::PatchList).
///
/// Ids are dense: removing a patch shifts every following id down by one, so
/// an id is only meaningful until the next merge on the same list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PatchId(pub usize);

impl PatchId {
    pub fn new(id: usize) -> Self {
        Self(id)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for PatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "P{}", self.0)
    }
}
