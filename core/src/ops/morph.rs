use ndarray::Array3;

use crate::ops::distance::squared_distance_to;
use crate::types::Mask;

/// Dilation by a Euclidean ball of the given radius
///
/// Exact (not an approximation by repeated cross dilations): a voxel is set
/// iff its squared distance to the mask is at most radius squared.
pub fn dilate(mask: &Mask, radius: usize) -> Mask {
    if radius == 0 || mask.is_empty() {
        return mask.clone();
    }
    let r2 = (radius * radius) as f32;
    let dist = squared_distance_to(mask);
    dist.mapv(|d| d <= r2)
}

/// Erosion by a Euclidean ball of the given radius
pub fn erode(mask: &Mask, radius: usize) -> Mask {
    if radius == 0 || mask.is_empty() {
        return mask.clone();
    }
    let r2 = (radius * radius) as f32;
    let complement = mask.mapv(|m| !m);
    let dist = squared_distance_to(&complement);
    dist.mapv(|d| d > r2)
}

/// Morphological opening: erosion then dilation
pub fn open(mask: &Mask, radius: usize) -> Mask {
    dilate(&erode(mask, radius), radius)
}

/// Morphological closing: dilation then erosion
pub fn close(mask: &Mask, radius: usize) -> Mask {
    erode(&dilate(mask, radius), radius)
}

/// Fills cavities not connected to the volume border
///
/// Flood-fills the complement from all border voxels (6-connectivity);
/// complement voxels the flood never reaches are interior holes and get set.
pub fn fill_holes(mask: &Mask) -> Mask {
    let (nz, ny, nx) = mask.dim();
    if mask.is_empty() {
        return mask.clone();
    }
    let mut reachable = Array3::from_elem((nz, ny, nx), false);
    let mut stack: Vec<(usize, usize, usize)> = Vec::new();

    let mut seed = |z: usize, y: usize, x: usize,
                    reachable: &mut Array3<bool>,
                    stack: &mut Vec<(usize, usize, usize)>| {
        if !mask[[z, y, x]] && !reachable[[z, y, x]] {
            reachable[[z, y, x]] = true;
            stack.push((z, y, x));
        }
    };

    for z in 0..nz {
        for y in 0..ny {
            for x in 0..nx {
                if z == 0 || z == nz - 1 || y == 0 || y == ny - 1 || x == 0 || x == nx - 1 {
                    seed(z, y, x, &mut reachable, &mut stack);
                }
            }
        }
    }

    while let Some((z, y, x)) = stack.pop() {
        let mut visit = |z: usize, y: usize, x: usize| {
            if !mask[[z, y, x]] && !reachable[[z, y, x]] {
                reachable[[z, y, x]] = true;
                stack.push((z, y, x));
            }
        };
        if z > 0 {
            visit(z - 1, y, x);
        }
        if z + 1 < nz {
            visit(z + 1, y, x);
        }
        if y > 0 {
            visit(z, y - 1, x);
        }
        if y + 1 < ny {
            visit(z, y + 1, x);
        }
        if x > 0 {
            visit(z, y, x - 1);
        }
        if x + 1 < nx {
            visit(z, y, x + 1);
        }
    }

    Array3::from_shape_fn((nz, ny, nx), |(z, y, x)| {
        mask[[z, y, x]] || !reachable[[z, y, x]]
    })
}

/// Outer ring of the given thickness: dilation minus the mask itself
pub fn outer_ring(mask: &Mask, radius: usize) -> Mask {
    let grown = dilate(mask, radius.max(1));
    ndarray::Zip::from(&grown)
        .and(mask)
        .map_collect(|&g, &m| g && !m)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn single_voxel(shape: (usize, usize, usize), at: (usize, usize, usize)) -> Mask {
        let mut mask = Array3::from_elem(shape, false);
        mask[[at.0, at.1, at.2]] = true;
        mask
    }

    fn count(mask: &Mask) -> usize {
        mask.iter().filter(|&&m| m).count()
    }

    #[test]
    fn test_dilate_single_voxel_ball() {
        let mask = single_voxel((7, 7, 7), (3, 3, 3));
        let grown = dilate(&mask, 1);
        // 6-neighborhood ball of radius 1
        assert_eq!(count(&grown), 7);
        assert!(grown[[3, 3, 4]]);
        assert!(!grown[[3, 4, 4]]);
    }

    #[test]
    fn test_erode_inverts_dilate_on_ball() {
        let mask = single_voxel((9, 9, 9), (4, 4, 4));
        let grown = dilate(&mask, 2);
        let back = erode(&grown, 2);
        assert_eq!(back, mask);
    }

    #[test]
    fn test_open_removes_isolated_voxel() {
        let mask = single_voxel((7, 7, 7), (3, 3, 3));
        let opened = open(&mask, 1);
        assert_eq!(count(&opened), 0);
    }

    #[test]
    fn test_close_bridges_small_gap() {
        let mut mask = Array3::from_elem((1, 1, 7), false);
        mask[[0, 0, 2]] = true;
        mask[[0, 0, 4]] = true;
        let closed = close(&mask, 1);
        assert!(closed[[0, 0, 3]]);
    }

    #[test]
    fn test_fill_holes_closes_cavity() {
        // hollow 5x5x5 box with a one-voxel cavity at the center
        let mut mask = Array3::from_elem((5, 5, 5), false);
        for z in 1..4 {
            for y in 1..4 {
                for x in 1..4 {
                    mask[[z, y, x]] = true;
                }
            }
        }
        mask[[2, 2, 2]] = false;
        let filled = fill_holes(&mask);
        assert!(filled[[2, 2, 2]]);
        assert_eq!(count(&filled), 27);
        // exterior untouched
        assert!(!filled[[0, 0, 0]]);
    }

    #[test]
    fn test_outer_ring_excludes_mask() {
        let mask = single_voxel((5, 5, 5), (2, 2, 2));
        let ring = outer_ring(&mask, 1);
        assert!(!ring[[2, 2, 2]]);
        assert_eq!(count(&ring), 6);
    }

    #[test]
    fn test_dilate_radius_zero_is_identity() {
        let mask = single_voxel((3, 3, 3), (1, 1, 1));
        assert_eq!(dilate(&mask, 0), mask);
    }
}
