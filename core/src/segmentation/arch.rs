use log::{debug, warn};
use ndarray::Array3;

use crate::ops::components::label_components;
use crate::ops::morph::{close, dilate};
use crate::ops::stats::{collect_above, percentile};
use crate::segmentation::params::AdaptiveParams;
use crate::types::Mask;

/// Maximum bounding-box aspect ratio for a plausible tooth seed
const SEED_MAX_ASPECT: f32 = 6.0;

/// Dental-arch region of interest
///
/// `degraded` records that no usable seeds were found and the whole volume
/// was taken instead; downstream rules still run, they just lose the spatial
/// restriction.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchMask {
    pub mask: Mask,
    pub degraded: bool,
}

impl ArchMask {
    fn whole_volume(shape: (usize, usize, usize)) -> ArchMask {
        ArchMask {
            mask: Array3::from_elem(shape, true),
            degraded: true,
        }
    }
}

/// Locates the dental arch in a smoothed, normalized volume
///
/// 1. Threshold bright seeds (88th percentile of voxels above 0.5, floor
///    0.65; relaxed to p85 above 0.4, floor 0.58, when empty).
/// 2. Label 6-connected seed components.
/// 3. Keep components inside a size window with tooth-like aspect ratio;
///    if none survive, retry with the size filter alone and a doubled
///    upper bound.
/// 4. Cluster by axial centroid: keep components within 30% of the z
///    extent from the median (the jaw plane), unless fewer than 2 would
///    remain.
/// 5. Dilate the union (radius min-dimension/10 clamped to 6..=10), then
///    close with a slightly smaller radius.
/// 6. Any empty intermediate falls back to the whole volume, degraded.
pub fn locate_arch(smoothed: &Array3<f32>, params: &AdaptiveParams) -> ArchMask {
    let shape = smoothed.dim();
    let total = smoothed.len();
    if total == 0 {
        warn!("arch localizer: empty volume, using whole volume");
        return ArchMask::whole_volume(shape);
    }

    let seeds = seed_mask(smoothed);
    if seeds.iter().all(|&s| !s) {
        warn!("arch localizer: no seed voxels, using whole volume");
        return ArchMask::whole_volume(shape);
    }

    let set = label_components(&seeds);
    let min_size = params.scaled_size(40).max(20);
    let max_size = (total / 50).max(1);

    let mut kept: Vec<u32> = (1..=set.count as u32)
        .filter(|&id| {
            let i = (id - 1) as usize;
            let size = set.sizes[i];
            size >= min_size && size <= max_size && set.bboxes[i].aspect_ratio() < SEED_MAX_ASPECT
        })
        .collect();
    if kept.is_empty() {
        debug!("arch localizer: aspect filter emptied seeds, relaxing to size-only");
        kept = (1..=set.count as u32)
            .filter(|&id| {
                let size = set.sizes[(id - 1) as usize];
                size >= min_size && size <= max_size * 2
            })
            .collect();
    }
    if kept.is_empty() {
        warn!(
            "arch localizer: no components in size window [{min_size}, {max_size}], using whole volume"
        );
        return ArchMask::whole_volume(shape);
    }

    let kept = cluster_jaw_plane(&kept, &set.centroids, shape.0);
    debug!(
        "arch localizer: {} of {} seed components kept",
        kept.len(),
        set.count
    );

    let union = set.mask_of_ids(&kept);
    let min_dim = shape.0.min(shape.1).min(shape.2);
    let dilate_radius = (min_dim / 10).clamp(6, 10);
    let close_radius = dilate_radius.saturating_sub(2).max(1);
    let mask = close(&dilate(&union, dilate_radius), close_radius);

    ArchMask {
        mask,
        degraded: false,
    }
}

/// Bright-voxel seed mask with a relaxed second attempt
fn seed_mask(smoothed: &Array3<f32>) -> Mask {
    let t = seed_threshold(smoothed, 0.5, 88.0, 0.65);
    let seeds = smoothed.mapv(|v| v >= t);
    if seeds.iter().any(|&s| s) {
        return seeds;
    }
    debug!("arch localizer: strict seeds empty, relaxing threshold");
    let t = seed_threshold(smoothed, 0.4, 85.0, 0.58);
    smoothed.mapv(|v| v >= t)
}

fn seed_threshold(data: &Array3<f32>, candidate_floor: f32, pct: f32, floor: f32) -> f32 {
    let candidates = collect_above(data, candidate_floor);
    // tiny populations give self-referential percentiles; trust the floor
    if (candidates.len() as f64) < data.len() as f64 * 0.01 {
        return floor;
    }
    percentile(&candidates, pct).map_or(floor, |p| p.max(floor))
}

/// Keeps components near the median axial centroid (the jaw plane)
fn cluster_jaw_plane(ids: &[u32], centroids: &[[f32; 3]], nz: usize) -> Vec<u32> {
    if ids.len() < 2 {
        return ids.to_vec();
    }
    let mut zs: Vec<f32> = ids
        .iter()
        .map(|&id| centroids[(id - 1) as usize][0])
        .collect();
    zs.sort_by(|a, b| a.total_cmp(b));
    let mid = zs.len() / 2;
    let median = if zs.len() % 2 == 0 {
        (zs[mid - 1] + zs[mid]) / 2.0
    } else {
        zs[mid]
    };
    let window = nz as f32 * 0.30;
    let near: Vec<u32> = ids
        .iter()
        .copied()
        .filter(|&id| (centroids[(id - 1) as usize][0] - median).abs() <= window)
        .collect();
    if near.len() < 2 {
        ids.to_vec()
    } else {
        near
    }
}
