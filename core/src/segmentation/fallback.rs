use log::warn;
use ndarray::Array3;

use crate::types::{LabelMap, Tissue};

/// Fixed intensity bands for the fallback classifier, [lo, hi) per tissue
const FALLBACK_BANDS: [(Tissue, f32, f32); 5] = [
    (Tissue::Enamel, 0.80, f32::INFINITY),
    (Tissue::Dentin, 0.65, 0.80),
    (Tissue::CorticalBone, 0.50, 0.65),
    (Tissue::TrabecularBone, 0.35, 0.50),
    (Tissue::Pulp, 0.20, 0.35),
];

/// Fixed-threshold fallback segmentation
///
/// Used when the adaptive cascade cannot run. Applies five disjoint fixed
/// bands to the normalized volume with no arch restriction and no
/// morphology. Total: always produces a label map, even for an empty
/// volume.
pub fn fallback_segmentation(volume: &Array3<f32>) -> LabelMap {
    warn!("falling back to fixed-threshold segmentation");
    let mut labels = LabelMap::new(volume.dim());
    for (tissue, lo, hi) in FALLBACK_BANDS {
        let mask = volume.mapv(|v| v >= lo && v < hi);
        labels.claim(&mask, tissue);
    }
    labels
}
