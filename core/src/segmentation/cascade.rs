use log::{debug, warn};
use ndarray::{Array3, Zip};

use crate::error::{DentsegError, Result};
use crate::ops::components::remove_small;
use crate::ops::distance::squared_distance_to;
use crate::ops::morph::{close, dilate, erode, fill_holes, outer_ring};
use crate::segmentation::arch::ArchMask;
use crate::segmentation::detectors::{
    detect_caries, detect_nerve_canal, detect_pdl_space, detect_periapical,
};
use crate::segmentation::params::AdaptiveParams;
use crate::segmentation::thresholds::DensityThresholds;
use crate::types::{LabelMap, Mask, Tissue};

/// Lower bound of the pulp intensity band
const PULP_BAND_LO: f32 = 0.12;
/// Pulp may occupy at most this fraction of the tooth voxel count
const PULP_CAP_FRACTION: f32 = 0.25;
/// Lower bound of the soft-tissue intensity band
const SOFT_BAND_LO: f32 = 0.08;

fn band(smoothed: &Array3<f32>, lo: f32, hi: f32) -> Mask {
    smoothed.mapv(|v| v >= lo && v < hi)
}

fn band_at_least(smoothed: &Array3<f32>, lo: f32) -> Mask {
    smoothed.mapv(|v| v >= lo)
}

fn intersect(a: &Mask, b: &Mask) -> Mask {
    Zip::from(a).and(b).map_collect(|&a, &b| a && b)
}

fn union(a: &Mask, b: &Mask) -> Mask {
    Zip::from(a).and(b).map_collect(|&a, &b| a || b)
}

/// Runs the ordered classification cascade over a smoothed volume
///
/// Rule order is label order: enamel, dentin, pulp, cementum, cortical bone,
/// trabecular bone, alveolar bone (relabel), nerve canal, PDL space, soft
/// tissue, gingiva (relabel), caries, periapical lesion. Claims go through
/// the write-once label map, so later rules can never overturn earlier ones;
/// the two relabel rules rewrite only their explicit source labels. Detector
/// failures degrade to an empty candidate mask with a warning.
pub fn run_cascade(
    smoothed: &Array3<f32>,
    thresholds: &DensityThresholds,
    arch: &ArchMask,
    params: &AdaptiveParams,
) -> Result<LabelMap> {
    if smoothed.is_empty() {
        return Err(DentsegError::EmptyVolume);
    }
    let mut labels = LabelMap::new(smoothed.dim());
    let high = thresholds.high;
    let medium = thresholds.medium;
    let close_radius = params.morph_radius.min(2);

    // 1. enamel
    let enamel = {
        let m = intersect(&band_at_least(smoothed, high), &arch.mask);
        let m = remove_small(&m, params.scaled_size(30));
        close(&m, close_radius)
    };
    let n = labels.claim(&enamel, Tissue::Enamel);
    debug!("enamel: {n} voxels");

    // 2. dentin
    let dentin = {
        let m = intersect(&band(smoothed, medium, high), &arch.mask);
        let m = remove_small(&m, params.scaled_size(80));
        close(&m, close_radius)
    };
    let n = labels.claim(&dentin, Tissue::Dentin);
    debug!("dentin: {n} voxels");

    // tooth-derived context shared by several later rules
    let tooth = labels.mask_any(&[Tissue::Enamel, Tissue::Dentin]);
    let has_tooth = tooth.iter().any(|&t| t);
    let tooth_region = if has_tooth {
        fill_holes(&close(&tooth, params.morph_radius + 1))
    } else {
        tooth.clone()
    };

    // 3. pulp
    if has_tooth {
        let pulp = pulp_candidates(smoothed, &labels, &tooth, &tooth_region, medium);
        let n = labels.claim(&pulp, Tissue::Pulp);
        debug!("pulp: {n} voxels");
    }

    // 4. cementum
    if has_tooth {
        let lo = (medium - 0.10).max(0.30);
        let m = intersect(&band(smoothed, lo, medium), &outer_ring(&tooth, 1));
        let m = intersect(&m, &arch.mask);
        let m = remove_small(&m, params.scaled_size(20));
        let n = labels.claim(&m, Tissue::Cementum);
        debug!("cementum: {n} voxels");
    }

    // 5. cortical bone
    let bone_high = thresholds.bone_high();
    let cortical = remove_small(&band_at_least(smoothed, bone_high), params.scaled_size(150));
    let n = labels.claim(&cortical, Tissue::CorticalBone);
    debug!("cortical bone: {n} voxels");

    // 6. trabecular bone
    let trabecular = remove_small(
        &band(smoothed, 0.75 * medium, bone_high),
        params.scaled_size(150),
    );
    let n = labels.claim(&trabecular, Tissue::TrabecularBone);
    debug!("trabecular bone: {n} voxels");

    // 7. alveolar bone: bone in the immediate tooth neighborhood
    if has_tooth {
        let near_tooth = dilate(&tooth, params.morph_radius + 2);
        let n = labels.relabel(
            &near_tooth,
            &[Tissue::CorticalBone, Tissue::TrabecularBone],
            Tissue::AlveolarBone,
        );
        debug!("alveolar bone: {n} voxels relabeled");
    }

    // 8. nerve canal
    let bone = labels.mask_any(&[
        Tissue::CorticalBone,
        Tissue::TrabecularBone,
        Tissue::AlveolarBone,
    ]);
    let nerve = degraded_on_err(
        detect_nerve_canal(smoothed, &arch.mask, &bone, params),
        smoothed.dim(),
        "nerve canal",
    );
    let n = labels.claim(&nerve, Tissue::NerveCanal);
    debug!("nerve canal: {n} voxels");

    // 9. PDL space
    let pdl = degraded_on_err(
        detect_pdl_space(smoothed, &arch.mask, &tooth, params),
        smoothed.dim(),
        "PDL space",
    );
    let n = labels.claim(&pdl, Tissue::PdlSpace);
    debug!("PDL space: {n} voxels");

    // 10. soft tissue
    let soft = remove_small(
        &band(smoothed, SOFT_BAND_LO, 0.6 * medium),
        params.scaled_size(100),
    );
    let n = labels.claim(&soft, Tissue::SoftTissue);
    debug!("soft tissue: {n} voxels");

    // 11. gingiva: soft tissue hugging the teeth
    if has_tooth {
        let near_tooth = intersect(&dilate(&tooth, 2), &arch.mask);
        let n = labels.relabel(&near_tooth, &[Tissue::SoftTissue], Tissue::Gingiva);
        debug!("gingiva: {n} voxels relabeled");
    }

    // 12. caries
    let caries = degraded_on_err(
        detect_caries(smoothed, &arch.mask, &tooth_region, params),
        smoothed.dim(),
        "caries",
    );
    let n = labels.claim(&caries, Tissue::Caries);
    debug!("caries: {n} voxels");

    // 13. periapical lesion
    let periapical = degraded_on_err(
        detect_periapical(smoothed, &arch.mask, &tooth, params),
        smoothed.dim(),
        "periapical lesion",
    );
    let n = labels.claim(&periapical, Tissue::PeriapicalLesion);
    debug!("periapical lesion: {n} voxels");

    Ok(labels)
}

/// Pulp chamber and canal candidates, contained by construction
///
/// Candidates live strictly inside the filled tooth region, within one voxel
/// of the tooth surface, in the low-density band. A cap keeps pulp at no
/// more than a quarter of the tooth's size, preferring the deepest voxels.
fn pulp_candidates(
    smoothed: &Array3<f32>,
    labels: &LabelMap,
    tooth: &Mask,
    tooth_region: &Mask,
    medium: f32,
) -> Mask {
    let cavity = Zip::from(tooth_region)
        .and(tooth)
        .map_collect(|&f, &t| f && !t);
    let inner_shell = {
        let core = erode(tooth, 1);
        Zip::from(tooth).and(&core).map_collect(|&t, &c| t && !c)
    };
    let zone = dilate(&union(&cavity, &inner_shell), 1);
    let near_tooth = dilate(tooth, 1);

    let mut pulp = band(smoothed, PULP_BAND_LO, medium);
    pulp = intersect(&pulp, &zone);
    pulp = intersect(&pulp, &near_tooth);
    pulp = intersect(&pulp, tooth_region);
    pulp = intersect(&pulp, &labels.unlabeled());

    let tooth_count = tooth.iter().filter(|&&t| t).count();
    let cap = (tooth_count as f32 * PULP_CAP_FRACTION) as usize;
    let pulp_count = pulp.iter().filter(|&&p| p).count();
    if pulp_count > cap {
        debug!("pulp: capping {pulp_count} candidates to {cap}");
        pulp = deepest_voxels(&pulp, tooth_region, cap);
    }
    pulp
}

/// Keeps the `cap` candidates deepest inside the region, deterministically
fn deepest_voxels(candidates: &Mask, region: &Mask, cap: usize) -> Mask {
    let outside = region.mapv(|r| !r);
    let depth = squared_distance_to(&outside);
    let mut ranked: Vec<(usize, f32)> = candidates
        .iter()
        .zip(depth.iter())
        .enumerate()
        .filter(|(_, (&c, _))| c)
        .map(|(i, (_, &d))| (i, d))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.truncate(cap);

    let mut keep = vec![false; candidates.len()];
    for (i, _) in ranked {
        keep[i] = true;
    }
    let mut kept = Array3::from_elem(candidates.dim(), false);
    for (i, v) in kept.iter_mut().enumerate() {
        *v = keep[i];
    }
    kept
}

fn degraded_on_err(
    result: Result<Mask>,
    shape: (usize, usize, usize),
    what: &str,
) -> Mask {
    match result {
        Ok(mask) => mask,
        Err(e) => {
            warn!("{what} detector failed, continuing without it: {e}");
            Array3::from_elem(shape, false)
        }
    }
}
