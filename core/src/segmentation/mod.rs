//! Adaptive threshold segmentation of dental CBCT volumes
//!
//! The pipeline smooths the normalized volume, derives density thresholds,
//! localizes the dental arch, runs the ordered tissue cascade, and finishes
//! with a two-pass cleanup. Every stage degrades rather than fails; a fatal
//! cascade error falls back to fixed thresholds.

pub mod arch;
pub mod cascade;
pub mod cleanup;
pub mod detectors;
pub mod fallback;
pub mod params;
pub mod thresholds;

pub use arch::{locate_arch, ArchMask};
pub use params::AdaptiveParams;
pub use thresholds::DensityThresholds;

use std::fmt;
use std::sync::Once;
use std::time::Instant;

use log::{debug, info, warn};

use crate::error::{DentsegError, Result};
use crate::ops::gaussian_smooth;
use crate::types::{LabelMap, Mask, SegmentInfo, Tissue, Volume};

/// Segmentation backend identifiers accepted by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
#[cfg_attr(feature = "json", serde(rename_all = "lowercase"))]
pub enum ModelKind {
    NnUnet,
    DhUnet,
    #[default]
    Threshold,
}

impl ModelKind {
    /// All known backends
    pub const ALL: [ModelKind; 3] = [ModelKind::NnUnet, ModelKind::DhUnet, ModelKind::Threshold];

    /// API name of the backend
    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::NnUnet => "nnunet",
            ModelKind::DhUnet => "dhunet",
            ModelKind::Threshold => "threshold",
        }
    }

    /// Parses a backend from its API name
    #[allow(clippy::should_implement_trait)]
    pub fn from_name(s: &str) -> Option<ModelKind> {
        match s.to_lowercase().as_str() {
            "nnunet" | "nn-unet" => Some(ModelKind::NnUnet),
            "dhunet" | "dhu-net" => Some(ModelKind::DhUnet),
            "threshold" | "thresholds" => Some(ModelKind::Threshold),
            _ => None,
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Strategy seam for segmentation backends
///
/// The threshold cascade is the only backend that ships; a trained neural
/// backend would plug in here.
pub trait SegmentationModel: Send + Sync {
    /// Backend identifier used in logs and reports
    fn kind(&self) -> ModelKind;

    /// Segments one normalized volume; must degrade instead of failing
    fn run(&self, volume: &Volume) -> SegmentationOutcome;
}

/// The rule-based threshold cascade backend
pub struct ThresholdModel;

impl SegmentationModel for ThresholdModel {
    fn kind(&self) -> ModelKind {
        ModelKind::Threshold
    }

    fn run(&self, volume: &Volume) -> SegmentationOutcome {
        threshold_pipeline(volume)
    }
}

/// Stand-in for a neural backend whose weights are not bundled
struct UnavailableModel {
    kind: ModelKind,
    warned: Once,
}

impl SegmentationModel for UnavailableModel {
    fn kind(&self) -> ModelKind {
        self.kind
    }

    fn run(&self, volume: &Volume) -> SegmentationOutcome {
        self.warned.call_once(|| {
            warn!(
                "{} weights are not bundled, falling back to the threshold cascade",
                self.kind
            );
        });
        threshold_pipeline(volume)
    }
}

/// Wall-clock milliseconds spent per pipeline stage
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct StageTimings {
    pub smooth_ms: u64,
    pub thresholds_ms: u64,
    pub arch_ms: u64,
    pub cascade_ms: u64,
    pub cleanup_ms: u64,
    pub total_ms: u64,
}

/// Result of one segmentation run
#[derive(Debug)]
pub struct SegmentationOutcome {
    /// Final per-voxel labels
    pub label_map: LabelMap,
    /// Density thresholds the cascade used
    pub thresholds: DensityThresholds,
    /// Arch localization fell back to the whole volume
    pub arch_degraded: bool,
    /// The fixed-threshold fallback replaced the cascade
    pub used_fallback: bool,
    /// Per-stage timings
    pub timings: StageTimings,
}

/// Stateless segmentation engine over a pluggable backend
pub struct SegmentationEngine {
    model: Box<dyn SegmentationModel>,
}

impl SegmentationEngine {
    /// Builds an engine for the requested backend
    pub fn new(kind: ModelKind) -> SegmentationEngine {
        let model: Box<dyn SegmentationModel> = match kind {
            ModelKind::Threshold => Box::new(ThresholdModel),
            ModelKind::NnUnet | ModelKind::DhUnet => Box::new(UnavailableModel {
                kind,
                warned: Once::new(),
            }),
        };
        SegmentationEngine { model }
    }

    /// Backend this engine was built for
    pub fn model_kind(&self) -> ModelKind {
        self.model.kind()
    }

    /// Segments a normalized volume; never errors outward
    pub fn segment(&self, volume: &Volume) -> SegmentationOutcome {
        self.model.run(volume)
    }
}

impl Default for SegmentationEngine {
    fn default() -> Self {
        SegmentationEngine::new(ModelKind::default())
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// The full adaptive pipeline: smooth, threshold, arch, cascade, cleanup
fn threshold_pipeline(volume: &Volume) -> SegmentationOutcome {
    let run_start = Instant::now();
    let params = AdaptiveParams::for_voxel_count(volume.len());
    debug!(
        "segmenting {:?} ({} voxels): sigma {}, size scale {}, morph radius {}",
        volume.shape(),
        volume.len(),
        params.sigma,
        params.size_scale,
        params.morph_radius
    );

    let t = Instant::now();
    let smoothed = gaussian_smooth(&volume.data, params.sigma);
    let smooth_ms = elapsed_ms(t);

    let t = Instant::now();
    let thresholds = DensityThresholds::from_volume(&smoothed);
    let thresholds_ms = elapsed_ms(t);

    let t = Instant::now();
    let arch = locate_arch(&smoothed, &params);
    let arch_ms = elapsed_ms(t);

    let t = Instant::now();
    let (mut label_map, used_fallback) =
        match cascade::run_cascade(&smoothed, &thresholds, &arch, &params) {
            Ok(labels) => (labels, false),
            Err(e) => {
                warn!("cascade failed: {e}");
                (fallback::fallback_segmentation(&volume.data), true)
            }
        };
    let cascade_ms = elapsed_ms(t);

    let t = Instant::now();
    let mut cleanup_ms = 0;
    if !used_fallback {
        let released = cleanup::cleanup(&mut label_map, &params);
        cleanup_ms = elapsed_ms(t);
        if released > 0 {
            debug!("cleanup released {released} voxels");
        }
    }

    let timings = StageTimings {
        smooth_ms,
        thresholds_ms,
        arch_ms,
        cascade_ms,
        cleanup_ms,
        total_ms: elapsed_ms(run_start),
    };
    info!(
        "segmentation done in {} ms: {} of {} voxels labeled{}{}",
        timings.total_ms,
        label_map.total_labeled(),
        volume.len(),
        if arch.degraded { " (arch degraded)" } else { "" },
        if used_fallback { " (fallback)" } else { "" },
    );

    SegmentationOutcome {
        label_map,
        thresholds,
        arch_degraded: arch.degraded,
        used_fallback,
        timings,
    }
}

/// Per-segment statistics, ordered by label, zero-count labels omitted
pub fn segment_info(labels: &LabelMap, volume: &Volume) -> Vec<SegmentInfo> {
    let voxel_mm3 = volume.voxel_volume_mm3();
    let counts = labels.counts();
    let mut sums = [0f64; crate::types::TISSUE_COUNT + 1];
    for (&label, &v) in labels.as_array().iter().zip(volume.data.iter()) {
        sums[label as usize] += v as f64;
    }

    Tissue::ALL
        .iter()
        .filter_map(|&tissue| {
            let idx = tissue.label() as usize;
            let count = counts[idx];
            if count == 0 {
                return None;
            }
            Some(SegmentInfo {
                tissue,
                voxel_count: count,
                volume_mm3: count as f32 * voxel_mm3,
                mean_intensity: (sums[idx] / count as f64) as f32,
            })
        })
        .collect()
}

/// Binary mask for a segment by API name
pub fn segment_mask(labels: &LabelMap, name: &str) -> Result<Mask> {
    let tissue =
        Tissue::from_name(name).ok_or_else(|| DentsegError::UnknownSegment(name.to_string()))?;
    Ok(labels.mask_of(tissue))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn sphere_phantom() -> (Volume, usize) {
        let data = Array3::from_shape_fn((64, 64, 64), |(z, y, x)| {
            let dz = z as f32 - 32.0;
            let dy = y as f32 - 32.0;
            let dx = x as f32 - 32.0;
            if (dz * dz + dy * dy + dx * dx).sqrt() < 6.0 {
                0.92
            } else {
                0.1
            }
        });
        let sphere_voxels = data.iter().filter(|&&v| v > 0.5).count();
        (Volume::new(data, [0.5; 3]), sphere_voxels)
    }

    #[test]
    fn test_uniform_volume_yields_no_labels() {
        let volume = Volume::new(Array3::from_elem((32, 32, 32), 0.9f32), [0.5; 3]);
        let engine = SegmentationEngine::default();
        let outcome = engine.segment(&volume);
        assert_eq!(outcome.label_map.total_labeled(), 0);
        assert!(outcome.arch_degraded);
        assert!(!outcome.used_fallback);
        assert!(segment_info(&outcome.label_map, &volume).is_empty());
    }

    #[test]
    fn test_sphere_phantom_becomes_enamel() {
        let (volume, sphere_voxels) = sphere_phantom();
        let engine = SegmentationEngine::default();
        let outcome = engine.segment(&volume);

        assert!(!outcome.arch_degraded);
        assert!(!outcome.used_fallback);
        let enamel = outcome.label_map.count(Tissue::Enamel);
        let tolerance = sphere_voxels as f64 * 0.10;
        assert!(
            (enamel as f64 - sphere_voxels as f64).abs() <= tolerance,
            "enamel {enamel} vs sphere {sphere_voxels}"
        );

        let info = segment_info(&outcome.label_map, &volume);
        assert!(info.iter().any(|s| s.tissue == Tissue::Enamel));
        // stats are ordered by label and non-empty
        for pair in info.windows(2) {
            assert!(pair[0].label() < pair[1].label());
        }

        let mesh = crate::mesh::segment_mesh(&outcome.label_map.mask_of(Tissue::Enamel));
        assert!(mesh.is_some_and(|m| !m.is_empty()));
    }

    #[test]
    fn test_empty_volume_completes_degraded() {
        let volume = Volume::new(Array3::zeros((0, 0, 0)), [1.0; 3]);
        let engine = SegmentationEngine::default();
        let outcome = engine.segment(&volume);
        assert!(outcome.arch_degraded);
        assert!(outcome.used_fallback);
        assert_eq!(outcome.label_map.total_labeled(), 0);
        assert!(segment_info(&outcome.label_map, &volume).is_empty());
    }

    #[test]
    fn test_segmentation_is_deterministic() {
        let (volume, _) = sphere_phantom();
        let engine = SegmentationEngine::default();
        let a = engine.segment(&volume);
        let b = engine.segment(&volume);
        assert_eq!(a.label_map.as_array(), b.label_map.as_array());
    }

    #[test]
    fn test_neural_kinds_resolve_to_cascade() {
        let (volume, _) = sphere_phantom();
        let engine = SegmentationEngine::new(ModelKind::NnUnet);
        assert_eq!(engine.model_kind(), ModelKind::NnUnet);
        let outcome = engine.segment(&volume);
        assert!(outcome.label_map.count(Tissue::Enamel) > 0);
    }

    #[test]
    fn test_segment_mask_unknown_name_errors() {
        let labels = LabelMap::new((4, 4, 4));
        assert!(segment_mask(&labels, "enamel").is_ok());
        let err = segment_mask(&labels, "wisdom_tooth").unwrap_err();
        assert!(matches!(err, DentsegError::UnknownSegment(_)));
    }

    #[test]
    fn test_model_kind_names_roundtrip() {
        for kind in ModelKind::ALL {
            assert_eq!(ModelKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ModelKind::from_name("resnet"), None);
    }

    #[test]
    fn test_segment_info_statistics() {
        let mut data = Array3::from_elem((8, 8, 8), 0.0f32);
        for x in 0..4 {
            data[[4, 4, x]] = 0.8;
        }
        let volume = Volume::new(data, [0.5; 3]);
        let mut labels = LabelMap::new((8, 8, 8));
        let mask = volume.data.mapv(|v| v > 0.5);
        labels.claim(&mask, Tissue::Enamel);

        let info = segment_info(&labels, &volume);
        assert_eq!(info.len(), 1);
        assert_eq!(info[0].voxel_count, 4);
        assert!((info[0].volume_mm3 - 4.0 * 0.125).abs() < 1e-6);
        assert!((info[0].mean_intensity - 0.8).abs() < 1e-6);
    }
}
