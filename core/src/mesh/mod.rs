//! Surface mesh extraction for segment masks
//!
//! Runs classic marching cubes over a binary mask at iso-level 0.5. Large
//! masks are sampled at a coarser step to bound the triangle count for
//! viewers; vertices stay in (z, y, x) voxel-index coordinates of the full
//! grid regardless of step. Extraction never errors outward: anything that
//! cannot produce a surface yields `None`.

mod marching_cubes;
mod tables;

use crate::types::{Mask, Mesh};

/// Sampling step for a mask of `voxels` total array elements
///
/// Tiers at 100^3, 200^3, and 300^3 voxels.
fn sampling_step(voxels: usize) -> usize {
    if voxels > 27_000_000 {
        4
    } else if voxels > 8_000_000 {
        3
    } else if voxels > 1_000_000 {
        2
    } else {
        1
    }
}

/// Extracts the triangle surface of one segment mask
///
/// Returns `None` for an empty mask or one with no surface crossings;
/// those cases are logged at debug level rather than treated as errors.
pub fn segment_mesh(mask: &Mask) -> Option<Mesh> {
    marching_cubes::extract(mask, sampling_step(mask.len()))
}

#[cfg(test)]
mod tests {
    use ndarray::Array3;

    use super::*;

    #[test]
    fn test_sampling_step_tiers() {
        assert_eq!(sampling_step(0), 1);
        assert_eq!(sampling_step(1_000_000), 1);
        assert_eq!(sampling_step(1_000_001), 2);
        assert_eq!(sampling_step(8_000_000), 2);
        assert_eq!(sampling_step(16_000_000), 3);
        assert_eq!(sampling_step(27_000_000), 3);
        assert_eq!(sampling_step(512 * 512 * 512), 4);
    }

    #[test]
    fn test_segment_mesh_of_a_cube() {
        let mut mask = Array3::from_elem((10, 10, 10), false);
        for z in 3..7 {
            for y in 3..7 {
                for x in 3..7 {
                    mask[[z, y, x]] = true;
                }
            }
        }
        let mesh = segment_mesh(&mask).unwrap();
        assert!(!mesh.is_empty());
        assert_eq!(mesh.vertices.len(), mesh.normals.len());
        let max_index = mesh.faces.iter().flatten().max().cloned().unwrap_or(0);
        assert!((max_index as usize) < mesh.vertices.len());
    }

    #[test]
    fn test_segment_mesh_empty_mask_is_none() {
        let mask = Array3::from_elem((6, 6, 6), false);
        assert!(segment_mesh(&mask).is_none());
    }
}
