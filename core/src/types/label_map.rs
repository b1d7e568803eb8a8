use ndarray::{Array3, Zip};

use crate::types::tissue::{Tissue, TISSUE_COUNT};

/// Boolean voxel mask, same shape as its volume
pub type Mask = Array3<bool>;

/// Voxel label assignments, one u8 per voxel (0 = unlabeled)
///
/// Mutation is restricted to three verbs so that cascade precedence holds by
/// construction rather than by audit: [`claim`](LabelMap::claim) writes only
/// unlabeled voxels, [`relabel`](LabelMap::relabel) rewrites only an explicit
/// set of source labels, and [`release`](LabelMap::release) only resets a
/// label back to 0. An earlier rule's voxels can therefore never be
/// overwritten by a later claim.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelMap {
    labels: Array3<u8>,
}

impl LabelMap {
    /// Creates an all-unlabeled map of the given shape
    pub fn new(shape: (usize, usize, usize)) -> Self {
        LabelMap {
            labels: Array3::zeros(shape),
        }
    }

    /// Map shape as (z, y, x)
    pub fn shape(&self) -> (usize, usize, usize) {
        self.labels.dim()
    }

    /// Total voxel count
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the map has no voxels
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Read-only view of the raw labels
    pub fn as_array(&self) -> &Array3<u8> {
        &self.labels
    }

    /// Assigns `tissue` to every masked voxel that is still unlabeled
    ///
    /// Returns the number of voxels actually claimed.
    pub fn claim(&mut self, mask: &Mask, tissue: Tissue) -> usize {
        debug_assert_eq!(mask.dim(), self.labels.dim());
        let label = tissue.label();
        let mut claimed = 0usize;
        Zip::from(&mut self.labels).and(mask).for_each(|l, &m| {
            if m && *l == 0 {
                *l = label;
                claimed += 1;
            }
        });
        claimed
    }

    /// Rewrites masked voxels currently holding one of `from` to `to`
    ///
    /// Returns the number of voxels relabeled.
    pub fn relabel(&mut self, mask: &Mask, from: &[Tissue], to: Tissue) -> usize {
        debug_assert_eq!(mask.dim(), self.labels.dim());
        let to_label = to.label();
        let mut moved = 0usize;
        Zip::from(&mut self.labels).and(mask).for_each(|l, &m| {
            if m && from.iter().any(|t| t.label() == *l) {
                *l = to_label;
                moved += 1;
            }
        });
        moved
    }

    /// Resets masked voxels of `tissue` back to unlabeled
    ///
    /// Returns the number of voxels released.
    pub fn release(&mut self, mask: &Mask, tissue: Tissue) -> usize {
        debug_assert_eq!(mask.dim(), self.labels.dim());
        let label = tissue.label();
        let mut released = 0usize;
        Zip::from(&mut self.labels).and(mask).for_each(|l, &m| {
            if m && *l == label {
                *l = 0;
                released += 1;
            }
        });
        released
    }

    /// Mask of voxels holding exactly `tissue`
    pub fn mask_of(&self, tissue: Tissue) -> Mask {
        let label = tissue.label();
        self.labels.mapv(|l| l == label)
    }

    /// Mask of voxels holding any of the given tissues
    pub fn mask_any(&self, tissues: &[Tissue]) -> Mask {
        self.labels
            .mapv(|l| tissues.iter().any(|t| t.label() == l))
    }

    /// Mask of still-unlabeled voxels
    pub fn unlabeled(&self) -> Mask {
        self.labels.mapv(|l| l == 0)
    }

    /// Voxel count for one tissue
    pub fn count(&self, tissue: Tissue) -> usize {
        let label = tissue.label();
        self.labels.iter().filter(|&&l| l == label).count()
    }

    /// Voxel counts indexed by label (0..=13)
    pub fn counts(&self) -> [usize; TISSUE_COUNT + 1] {
        let mut counts = [0usize; TISSUE_COUNT + 1];
        for &l in self.labels.iter() {
            if (l as usize) <= TISSUE_COUNT {
                counts[l as usize] += 1;
            }
        }
        counts
    }

    /// Total number of labeled (non-zero) voxels
    pub fn total_labeled(&self) -> usize {
        self.labels.iter().filter(|&&l| l != 0).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn full_mask(shape: (usize, usize, usize)) -> Mask {
        Array3::from_elem(shape, true)
    }

    #[test]
    fn test_claim_writes_only_unlabeled() {
        let shape = (2, 2, 2);
        let mut map = LabelMap::new(shape);
        let mask = full_mask(shape);
        assert_eq!(map.claim(&mask, Tissue::Enamel), 8);
        // second claim over the same voxels changes nothing
        assert_eq!(map.claim(&mask, Tissue::Dentin), 0);
        assert_eq!(map.count(Tissue::Enamel), 8);
        assert_eq!(map.count(Tissue::Dentin), 0);
    }

    #[test]
    fn test_relabel_moves_only_sources() {
        let shape = (2, 2, 2);
        let mut map = LabelMap::new(shape);
        let mut half = Array3::from_elem(shape, false);
        half[[0, 0, 0]] = true;
        half[[0, 0, 1]] = true;
        map.claim(&half, Tissue::CorticalBone);
        let moved = map.relabel(&full_mask(shape), &[Tissue::CorticalBone, Tissue::TrabecularBone], Tissue::AlveolarBone);
        assert_eq!(moved, 2);
        assert_eq!(map.count(Tissue::AlveolarBone), 2);
        assert_eq!(map.count(Tissue::CorticalBone), 0);
        // unlabeled voxels untouched
        assert_eq!(map.total_labeled(), 2);
    }

    #[test]
    fn test_release_is_monotonic() {
        let shape = (2, 2, 2);
        let mut map = LabelMap::new(shape);
        let mask = full_mask(shape);
        map.claim(&mask, Tissue::Pulp);
        let before = map.count(Tissue::Pulp);
        let released = map.release(&mask, Tissue::Pulp);
        assert_eq!(released, before);
        assert_eq!(map.total_labeled(), 0);
    }

    #[test]
    fn test_mask_roundtrip() {
        let shape = (2, 2, 2);
        let mut map = LabelMap::new(shape);
        let mut mask = Array3::from_elem(shape, false);
        mask[[1, 1, 1]] = true;
        map.claim(&mask, Tissue::Caries);
        assert_eq!(map.mask_of(Tissue::Caries), mask);
        assert_eq!(map.counts()[Tissue::Caries.label() as usize], 1);
    }
}
