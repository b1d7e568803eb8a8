use ndarray::{Array3, Zip};

use crate::error::{DentsegError, Result};
use crate::ops::components::{keep_largest, remove_small, size_window};
use crate::ops::morph::{close, dilate, open, outer_ring};
use crate::segmentation::params::AdaptiveParams;
use crate::types::Mask;

/// Intensity band mask: lo <= v < hi
fn band(smoothed: &Array3<f32>, lo: f32, hi: f32) -> Mask {
    smoothed.mapv(|v| v >= lo && v < hi)
}

fn intersect(a: &Mask, b: &Mask) -> Mask {
    Zip::from(a).and(b).map_collect(|&a, &b| a && b)
}

fn check_shape(smoothed: &Array3<f32>, mask: &Mask, what: &str) -> Result<()> {
    if smoothed.dim() != mask.dim() {
        return Err(DentsegError::InvalidVolume(format!(
            "{what} mask shape {:?} does not match volume {:?}",
            mask.dim(),
            smoothed.dim()
        )));
    }
    Ok(())
}

/// Inferior alveolar nerve canal candidates
///
/// Low-density tubular band inside a generous dilation of the arch, near
/// bone when bone labels exist. Opening drops speckle, closing reconnects
/// canal fragments; only the few largest elongated survivors count.
pub fn detect_nerve_canal(
    smoothed: &Array3<f32>,
    arch: &Mask,
    bone: &Mask,
    params: &AdaptiveParams,
) -> Result<Mask> {
    check_shape(smoothed, arch, "arch")?;
    check_shape(smoothed, bone, "bone")?;

    let region = dilate(arch, 2 * params.morph_radius + 4);
    let mut candidates = intersect(&band(smoothed, 0.05, 0.30), &region);
    if bone.iter().any(|&b| b) {
        candidates = intersect(&candidates, &dilate(bone, 2));
    }
    let connected = close(&open(&candidates, 1), 2);
    let min_size = params.scaled_size(100);
    let max_size = (smoothed.len() / 50).max(1);
    let sized = size_window(&connected, min_size, max_size);
    Ok(keep_largest(&sized, 3))
}

/// Periodontal ligament space candidates
///
/// Thin dark band in one-ring adjacency to the tooth surface.
pub fn detect_pdl_space(
    smoothed: &Array3<f32>,
    arch: &Mask,
    tooth: &Mask,
    params: &AdaptiveParams,
) -> Result<Mask> {
    check_shape(smoothed, arch, "arch")?;
    check_shape(smoothed, tooth, "tooth")?;

    let ring = outer_ring(tooth, 1);
    let candidates = intersect(&intersect(&band(smoothed, 0.05, 0.20), &ring), arch);
    Ok(remove_small(&candidates, params.scaled_size(5).max(2)))
}

/// Carious lesion candidates inside the tooth region
///
/// Demineralized band within the filled tooth outline; components above the
/// upper size bound are artifacts, not lesions.
pub fn detect_caries(
    smoothed: &Array3<f32>,
    arch: &Mask,
    tooth_region: &Mask,
    params: &AdaptiveParams,
) -> Result<Mask> {
    check_shape(smoothed, arch, "arch")?;
    check_shape(smoothed, tooth_region, "tooth region")?;

    let candidates = intersect(
        &intersect(&band(smoothed, 0.35, 0.50), tooth_region),
        arch,
    );
    Ok(size_window(
        &candidates,
        params.scaled_size(8),
        params.scaled_size(400),
    ))
}

/// Periapical lesion candidates
///
/// Radiolucent band in a ring around the tooth (root apex proximity),
/// size-bounded in both directions.
pub fn detect_periapical(
    smoothed: &Array3<f32>,
    arch: &Mask,
    tooth: &Mask,
    params: &AdaptiveParams,
) -> Result<Mask> {
    check_shape(smoothed, arch, "arch")?;
    check_shape(smoothed, tooth, "tooth")?;

    let ring = outer_ring(tooth, 3);
    let candidates = intersect(&intersect(&band(smoothed, 0.10, 0.28), &ring), arch);
    Ok(size_window(
        &candidates,
        params.scaled_size(30),
        params.scaled_size(3000),
    ))
}
