use log::debug;

use crate::ops::components::label_components;
use crate::segmentation::params::AdaptiveParams;
use crate::types::{LabelMap, Tissue};

/// Oversize caps as a fraction of total volume, first cleanup pass
///
/// A tooth tissue swallowing this much of the scan is a thresholding
/// artifact (for example a uniformly bright volume), not anatomy.
const OVERSIZE_CAPS: [(Tissue, f64); 3] = [
    (Tissue::Enamel, 0.10),
    (Tissue::Dentin, 0.15),
    (Tissue::Pulp, 0.05),
];

/// Baseline minimum component sizes in voxels, second cleanup pass
const MIN_COMPONENT_SIZES: [(Tissue, usize); 13] = [
    (Tissue::Enamel, 50),
    (Tissue::Dentin, 80),
    (Tissue::Pulp, 30),
    (Tissue::Cementum, 20),
    (Tissue::CorticalBone, 150),
    (Tissue::TrabecularBone, 150),
    (Tissue::AlveolarBone, 60),
    (Tissue::NerveCanal, 100),
    (Tissue::PdlSpace, 10),
    (Tissue::SoftTissue, 100),
    (Tissue::Gingiva, 20),
    (Tissue::Caries, 8),
    (Tissue::PeriapicalLesion, 30),
];

/// Two-pass cleanup over a finished label map
///
/// Pass one reverts oversized tooth-tissue components to unlabeled; pass two
/// drops per-tissue components below the scaled minimum size. Only releases
/// labels, so the labeled voxel count never grows. Returns the number of
/// voxels released.
pub fn cleanup(labels: &mut LabelMap, params: &AdaptiveParams) -> usize {
    let total = labels.len();
    if total == 0 {
        return 0;
    }
    let mut released = 0usize;

    for (tissue, cap_fraction) in OVERSIZE_CAPS {
        let cap = (total as f64 * cap_fraction) as usize;
        if labels.count(tissue) <= cap {
            continue;
        }
        let set = label_components(&labels.mask_of(tissue));
        for id in 1..=set.count as u32 {
            let size = set.sizes[(id - 1) as usize];
            if size > cap {
                let n = labels.release(&set.mask_of(id), tissue);
                debug!("cleanup: dropped oversize {tissue} component of {size} voxels (cap {cap})");
                released += n;
            }
        }
    }

    for (tissue, base) in MIN_COMPONENT_SIZES {
        let min_size = params.scaled_size(base);
        if min_size <= 1 || labels.count(tissue) == 0 {
            continue;
        }
        let set = label_components(&labels.mask_of(tissue));
        let small: Vec<u32> = (1..=set.count as u32)
            .filter(|&id| set.sizes[(id - 1) as usize] < min_size)
            .collect();
        if small.is_empty() {
            continue;
        }
        let n = labels.release(&set.mask_of_ids(&small), tissue);
        debug!(
            "cleanup: dropped {} small {tissue} component(s), {n} voxels (min {min_size})",
            small.len()
        );
        released += n;
    }

    released
}
