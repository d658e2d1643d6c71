//! Ordered patch container with dense ids.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::patch::PlanePatch;
use super::types::PatchId;

/// Id density violation found by [`PatchList::check_ids`].
#[derive(Debug, Error, PartialEq, Eq)]
#[error("patch at index {index} carries id {found}")]
pub struct IdMismatch {
    pub index: usize,
    pub found: PatchId,
}

/// An ordered list of patches where `list[i].id == i`.
///
/// Either one sensor's local view or the fused global map. Patches are owned
/// by exactly one list; moving a patch into another list copies it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatchList {
    patches: Vec<PlanePatch>,
}

impl PatchList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.patches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    /// Append a patch, assigning it the next id.
    pub fn push(&mut self, mut patch: PlanePatch) -> PatchId {
        let id = PatchId(self.patches.len());
        patch.id = id;
        self.patches.push(patch);
        id
    }

    /// Erase the patch at `id`, shifting the ids of every following patch.
    pub fn remove(&mut self, id: PatchId) -> Option<PlanePatch> {
        if id.0 >= self.patches.len() {
            return None;
        }
        let removed = self.patches.remove(id.0);
        for patch in &mut self.patches[id.0..] {
            patch.id.0 -= 1;
        }
        Some(removed)
    }

    pub fn get(&self, id: PatchId) -> Option<&PlanePatch> {
        self.patches.get(id.0)
    }

    pub fn get_mut(&mut self, id: PatchId) -> Option<&mut PlanePatch> {
        self.patches.get_mut(id.0)
    }

    /// Mutable access to `target` together with shared access to `source`.
    pub fn pair_mut(&mut self, target: PatchId, source: PatchId) -> Option<(&mut PlanePatch, &PlanePatch)> {
        let (t, s) = (target.0, source.0);
        if t == s || t >= self.patches.len() || s >= self.patches.len() {
            return None;
        }
        if t < s {
            let (head, tail) = self.patches.split_at_mut(s);
            Some((&mut head[t], &tail[0]))
        } else {
            let (head, tail) = self.patches.split_at_mut(t);
            Some((&mut tail[0], &head[s]))
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PlanePatch> {
        self.patches.iter()
    }

    /// Verify the id density invariant.
    pub fn check_ids(&self) -> Result<(), IdMismatch> {
        match self.patches.iter().enumerate().find(|(i, p)| p.id.0 != *i) {
            Some((index, patch)) => Err(IdMismatch {
                index,
                found: patch.id,
            }),
            None => Ok(()),
        }
    }

    /// Total number of inlier indices over all patches.
    pub fn total_inliers(&self) -> usize {
        self.patches.iter().map(|p| p.inliers.len()).sum()
    }
}

impl FromIterator<PlanePatch> for PatchList {
    fn from_iter<I: IntoIterator<Item = PlanePatch>>(iter: I) -> Self {
        let mut list = PatchList::new();
        for patch in iter {
            list.push(patch);
        }
        list
    }
}

impl<'a> IntoIterator for &'a PatchList {
    type Item = &'a PlanePatch;
    type IntoIter = std::slice::Iter<'a, PlanePatch>;

    fn into_iter(self) -> Self::IntoIter {
        self.patches.iter()
    }
}

impl std::ops::Index<PatchId> for PatchList {
    type Output = PlanePatch;

    fn index(&self, id: PatchId) -> &PlanePatch {
        &self.patches[id.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pbmap::patch::test_support::square_patch;
    use nalgebra::Vector3;

    fn list_of(n: usize) -> PatchList {
        (0..n)
            .map(|i| square_patch(Vector3::new(i as f64 * 3.0, 0.0, 2.0), -Vector3::z(), 1.0, i * 10))
            .collect()
    }

    #[test]
    fn test_push_assigns_dense_ids() {
        let list = list_of(3);
        assert_eq!(list.len(), 3);
        assert!(list.check_ids().is_ok());
        assert_eq!(list[PatchId(2)].inliers[0], 20);
    }

    #[test]
    fn test_remove_compacts_ids() {
        let mut list = list_of(4);
        let removed = list.remove(PatchId(1)).unwrap();
        assert_eq!(removed.inliers[0], 10);
        assert_eq!(list.len(), 3);
        assert!(list.check_ids().is_ok());
        assert_eq!(list[PatchId(1)].inliers[0], 20);
        assert!(list.remove(PatchId(3)).is_none());
    }

    #[test]
    fn test_check_ids_reports_mismatch() {
        let mut list = list_of(2);
        list.get_mut(PatchId(1)).unwrap().id = PatchId(5);
        assert_eq!(
            list.check_ids(),
            Err(IdMismatch {
                index: 1,
                found: PatchId(5)
            })
        );
    }

    #[test]
    fn test_pair_mut() {
        let mut list = list_of(3);
        let (target, source) = list.pair_mut(PatchId(2), PatchId(0)).unwrap();
        target.absorb(source);
        assert_eq!(list[PatchId(2)].inliers.len(), 20);
        assert!(list.pair_mut(PatchId(1), PatchId(1)).is_none());
    }
}
