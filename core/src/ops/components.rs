use ndarray::Array3;

use crate::types::Mask;

/// Axis-aligned bounding box of one component, inclusive voxel bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BBox {
    pub min: [usize; 3],
    pub max: [usize; 3],
}

impl BBox {
    /// Extent along each axis in voxels
    pub fn extent(&self) -> [usize; 3] {
        [
            self.max[0] - self.min[0] + 1,
            self.max[1] - self.min[1] + 1,
            self.max[2] - self.min[2] + 1,
        ]
    }

    /// Longest extent divided by shortest
    pub fn aspect_ratio(&self) -> f32 {
        let e = self.extent();
        let longest = e.iter().max().copied().unwrap_or(1) as f32;
        let shortest = e.iter().min().copied().unwrap_or(1).max(1) as f32;
        longest / shortest
    }
}

/// Labeled connected components with per-component statistics
///
/// Component ids are 1-based; `sizes[i]`, `bboxes[i]`, `centroids[i]` belong
/// to id `i + 1`. Scan order is (z, y, x), so ids are deterministic for a
/// given mask.
#[derive(Debug, Clone)]
pub struct ComponentSet {
    pub labels: Array3<u32>,
    pub count: usize,
    pub sizes: Vec<usize>,
    pub bboxes: Vec<BBox>,
    pub centroids: Vec<[f32; 3]>,
}

impl ComponentSet {
    /// Mask of a single component by 1-based id
    pub fn mask_of(&self, id: u32) -> Mask {
        self.labels.mapv(|l| l == id)
    }

    /// Union mask of several components
    pub fn mask_of_ids(&self, ids: &[u32]) -> Mask {
        self.labels.mapv(|l| l != 0 && ids.contains(&l))
    }

    /// Ids sorted by size, largest first (ties by id for determinism)
    pub fn ids_by_size_desc(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = (1..=self.count as u32).collect();
        ids.sort_by_key(|&id| (std::cmp::Reverse(self.sizes[(id - 1) as usize]), id));
        ids
    }
}

/// 6-connected component labeling over a boolean mask
pub fn label_components(mask: &Mask) -> ComponentSet {
    let (nz, ny, nx) = mask.dim();
    let mut labels = Array3::<u32>::zeros((nz, ny, nx));
    let mut sizes = Vec::new();
    let mut bboxes = Vec::new();
    let mut centroids = Vec::new();
    let mut stack: Vec<(usize, usize, usize)> = Vec::new();
    let mut next = 0u32;

    for z in 0..nz {
        for y in 0..ny {
            for x in 0..nx {
                if !mask[[z, y, x]] || labels[[z, y, x]] != 0 {
                    continue;
                }
                next += 1;
                let mut size = 0usize;
                let mut min = [z, y, x];
                let mut max = [z, y, x];
                let mut sum = [0f64; 3];

                labels[[z, y, x]] = next;
                stack.push((z, y, x));
                while let Some((cz, cy, cx)) = stack.pop() {
                    size += 1;
                    sum[0] += cz as f64;
                    sum[1] += cy as f64;
                    sum[2] += cx as f64;
                    min[0] = min[0].min(cz);
                    min[1] = min[1].min(cy);
                    min[2] = min[2].min(cx);
                    max[0] = max[0].max(cz);
                    max[1] = max[1].max(cy);
                    max[2] = max[2].max(cx);

                    let mut visit = |z: usize, y: usize, x: usize,
                                     labels: &mut Array3<u32>,
                                     stack: &mut Vec<(usize, usize, usize)>| {
                        if mask[[z, y, x]] && labels[[z, y, x]] == 0 {
                            labels[[z, y, x]] = next;
                            stack.push((z, y, x));
                        }
                    };
                    if cz > 0 {
                        visit(cz - 1, cy, cx, &mut labels, &mut stack);
                    }
                    if cz + 1 < nz {
                        visit(cz + 1, cy, cx, &mut labels, &mut stack);
                    }
                    if cy > 0 {
                        visit(cz, cy - 1, cx, &mut labels, &mut stack);
                    }
                    if cy + 1 < ny {
                        visit(cz, cy + 1, cx, &mut labels, &mut stack);
                    }
                    if cx > 0 {
                        visit(cz, cy, cx - 1, &mut labels, &mut stack);
                    }
                    if cx + 1 < nx {
                        visit(cz, cy, cx + 1, &mut labels, &mut stack);
                    }
                }

                sizes.push(size);
                bboxes.push(BBox { min, max });
                centroids.push([
                    (sum[0] / size as f64) as f32,
                    (sum[1] / size as f64) as f32,
                    (sum[2] / size as f64) as f32,
                ]);
            }
        }
    }

    ComponentSet {
        labels,
        count: next as usize,
        sizes,
        bboxes,
        centroids,
    }
}

/// Drops components smaller than `min_size` voxels
pub fn remove_small(mask: &Mask, min_size: usize) -> Mask {
    if min_size <= 1 {
        return mask.clone();
    }
    let set = label_components(mask);
    let keep: Vec<u32> = (1..=set.count as u32)
        .filter(|&id| set.sizes[(id - 1) as usize] >= min_size)
        .collect();
    set.mask_of_ids(&keep)
}

/// Keeps components whose size lies in [min_size, max_size]
pub fn size_window(mask: &Mask, min_size: usize, max_size: usize) -> Mask {
    let set = label_components(mask);
    let keep: Vec<u32> = (1..=set.count as u32)
        .filter(|&id| {
            let s = set.sizes[(id - 1) as usize];
            s >= min_size && s <= max_size
        })
        .collect();
    set.mask_of_ids(&keep)
}

/// Keeps at most the k largest components
pub fn keep_largest(mask: &Mask, k: usize) -> Mask {
    let set = label_components(mask);
    if set.count <= k {
        return mask.clone();
    }
    let keep: Vec<u32> = set.ids_by_size_desc().into_iter().take(k).collect();
    set.mask_of_ids(&keep)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn two_blob_mask() -> Mask {
        // blob A: 4 voxels in a row; blob B: single voxel, diagonal-adjacent to A
        let mut mask = Array3::from_elem((3, 3, 6), false);
        for x in 0..4 {
            mask[[1, 1, x]] = true;
        }
        mask[[2, 2, 5]] = true;
        mask
    }

    #[test]
    fn test_labels_two_components() {
        let set = label_components(&two_blob_mask());
        assert_eq!(set.count, 2);
        assert_eq!(set.sizes, vec![4, 1]);
    }

    #[test]
    fn test_diagonal_is_not_connected() {
        let mut mask = Array3::from_elem((2, 2, 2), false);
        mask[[0, 0, 0]] = true;
        mask[[1, 1, 1]] = true;
        let set = label_components(&mask);
        assert_eq!(set.count, 2);
    }

    #[test]
    fn test_bbox_and_centroid() {
        let set = label_components(&two_blob_mask());
        let bbox = set.bboxes[0];
        assert_eq!(bbox.min, [1, 1, 0]);
        assert_eq!(bbox.max, [1, 1, 3]);
        assert_eq!(bbox.extent(), [1, 1, 4]);
        assert_eq!(bbox.aspect_ratio(), 4.0);
        let c = set.centroids[0];
        assert_eq!(c, [1.0, 1.0, 1.5]);
    }

    #[test]
    fn test_remove_small() {
        let filtered = remove_small(&two_blob_mask(), 2);
        assert_eq!(filtered.iter().filter(|&&m| m).count(), 4);
        assert!(!filtered[[2, 2, 5]]);
    }

    #[test]
    fn test_size_window_drops_oversize() {
        let filtered = size_window(&two_blob_mask(), 1, 3);
        assert_eq!(filtered.iter().filter(|&&m| m).count(), 1);
        assert!(filtered[[2, 2, 5]]);
    }

    #[test]
    fn test_keep_largest() {
        let kept = keep_largest(&two_blob_mask(), 1);
        assert_eq!(kept.iter().filter(|&&m| m).count(), 4);
    }

    #[test]
    fn test_deterministic_ids_scan_order() {
        let set = label_components(&two_blob_mask());
        // the row blob starts earlier in (z, y, x) scan order
        assert_eq!(set.labels[[1, 1, 0]], 1);
        assert_eq!(set.labels[[2, 2, 5]], 2);
    }
}
