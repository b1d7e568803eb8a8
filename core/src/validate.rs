//! Plausibility validation for uploaded scans
//!
//! Rejects volumes that are clearly not dental or maxillofacial CBCT before
//! any processing happens: wrong field of view, wrong resolution, missing
//! the intensity signature of teeth in a calibrated CT range. Five checks
//! each score 0..=1 and the scan passes when the mean reaches 0.75.
//!
//! Validation runs on the raw, unnormalized scan because the intensity
//! checks need HU-like values. It is deliberately not part of the
//! segmentation path, which accepts whatever it is given.

use std::fmt;

use ndarray::Array3;

use crate::ops::{fraction_at_least, fraction_below, label_components};
use crate::types::RawScan;

const MIN_FOV_MM: f32 = 30.0;
const MAX_FOV_MM: f32 = 250.0;
const MAX_FOV_ASPECT: f32 = 3.0;
const MIN_VOXEL_MM: f32 = 0.075;
const MAX_VOXEL_MM: f32 = 0.6;
const MAX_SPACING_RATIO: f32 = 1.5;
const AIR_HU: f32 = -400.0;
const BONE_HU: f32 = 1200.0;
const ENAMEL_HU_MIN: f32 = 2000.0;
const ENAMEL_HU_MAX: f32 = 3500.0;
const AIR_FRACTION_HU: f32 = -500.0;
const BONE_FRACTION_HU: f32 = 500.0;

/// Volumes above this size are sampled every `SAMPLE_STRIDE`-th voxel in
/// flat order; fixed-stride sampling keeps repeat validations identical.
const SAMPLE_LIMIT: usize = 10_000_000;
const SAMPLE_STRIDE: usize = 100;

/// Mean check score required for a scan to pass
pub const PASS_CONFIDENCE: f32 = 0.75;

/// Coarse scanner modality guessed from spacing and calibration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
#[cfg_attr(feature = "json", serde(rename_all = "lowercase"))]
pub enum ScanType {
    Cbct,
    Mdct,
    Unknown,
}

impl fmt::Display for ScanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScanType::Cbct => "CBCT",
            ScanType::Mdct => "MDCT",
            ScanType::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

/// One scored plausibility check
#[derive(Debug, Clone)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct ValidationCheck {
    pub name: &'static str,
    pub score: f32,
    pub message: String,
}

impl ValidationCheck {
    /// Whether this check alone would pass
    pub fn passed(&self) -> bool {
        self.score >= PASS_CONFIDENCE
    }
}

/// Outcome of all plausibility checks on one scan
#[derive(Debug, Clone)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct ValidationReport {
    pub checks: Vec<ValidationCheck>,
    pub confidence: f32,
    pub valid: bool,
    pub scan_type: ScanType,
}

/// Runs all plausibility checks on a raw scan
pub fn validate_scan(raw: &RawScan) -> ValidationReport {
    let checks = vec![
        check_fov(raw),
        check_voxel_spacing(raw),
        check_intensity(raw),
        check_tooth_components(raw),
        check_proportions(raw),
    ];
    let confidence = checks.iter().map(|c| c.score).sum::<f32>() / checks.len() as f32;
    ValidationReport {
        valid: confidence >= PASS_CONFIDENCE,
        confidence,
        scan_type: detect_scan_type(raw),
        checks,
    }
}

/// Guesses the scanner modality from voxel geometry and calibration
///
/// CBCT reconstructions are near-isotropic at sub-0.6 mm; medical CT
/// carries a thicker slice spacing than in-plane resolution together with
/// full air calibration near -1000 HU.
pub fn detect_scan_type(raw: &RawScan) -> ScanType {
    let smax = raw.spacing.iter().cloned().fold(f32::MIN, f32::max);
    let smin = raw.spacing.iter().cloned().fold(f32::MAX, f32::min);
    if smin <= 0.0 {
        return ScanType::Unknown;
    }
    let ratio = smax / smin;
    if smax <= MAX_VOXEL_MM && ratio <= 1.25 {
        return ScanType::Cbct;
    }
    let (min_value, _) = raw.intensity_range();
    if min_value <= -900.0 && (ratio > 1.25 || smax > MAX_VOXEL_MM) {
        return ScanType::Mdct;
    }
    ScanType::Unknown
}

fn check_fov(raw: &RawScan) -> ValidationCheck {
    let name = "field of view";
    let fov = raw.fov_mm();
    let max_fov = fov.iter().cloned().fold(f32::MIN, f32::max);
    let min_fov = fov.iter().cloned().fold(f32::MAX, f32::min);
    if min_fov <= 0.0 {
        return ValidationCheck {
            name,
            score: 0.0,
            message: "volume has no physical extent".to_string(),
        };
    }
    let aspect = max_fov / min_fov;
    let in_range = (MIN_FOV_MM..=MAX_FOV_MM).contains(&max_fov);

    let (score, message) = if in_range && aspect < MAX_FOV_ASPECT {
        (
            1.0,
            format!(
                "{:.1} x {:.1} x {:.1} mm matches a dental field of view",
                fov[0], fov[1], fov[2]
            ),
        )
    } else if max_fov > MAX_FOV_MM {
        (
            0.0,
            format!("{max_fov:.1} mm extent is beyond any dental protocol"),
        )
    } else if aspect >= MAX_FOV_ASPECT {
        (
            0.0,
            format!("aspect ratio {aspect:.1} suggests a spine or long-bone scan"),
        )
    } else {
        (
            0.3,
            format!("{max_fov:.1} mm extent is smaller than typical dental scans"),
        )
    };
    ValidationCheck {
        name,
        score,
        message,
    }
}

fn check_voxel_spacing(raw: &RawScan) -> ValidationCheck {
    let name = "voxel spacing";
    let smax = raw.spacing.iter().cloned().fold(f32::MIN, f32::max);
    let smin = raw.spacing.iter().cloned().fold(f32::MAX, f32::min);
    if smin <= 0.0 {
        return ValidationCheck {
            name,
            score: 0.0,
            message: "non-positive voxel spacing".to_string(),
        };
    }
    let ratio = smax / smin;
    let in_range = smin >= MIN_VOXEL_MM && smax <= MAX_VOXEL_MM;

    let (score, message) = if in_range && ratio <= MAX_SPACING_RATIO {
        (
            1.0,
            format!(
                "{:.3} x {:.3} x {:.3} mm is near-isotropic dental resolution",
                raw.spacing[0], raw.spacing[1], raw.spacing[2]
            ),
        )
    } else if ratio > 2.0 {
        (
            0.2,
            format!("spacing ratio {ratio:.1} is far from the isotropic CBCT norm"),
        )
    } else if !in_range {
        (
            0.5,
            format!("voxel size {smin:.3}-{smax:.3} mm is outside the dental range"),
        )
    } else {
        (0.7, format!("mildly anisotropic spacing (ratio {ratio:.2})"))
    };
    ValidationCheck {
        name,
        score,
        message,
    }
}

fn check_intensity(raw: &RawScan) -> ValidationCheck {
    let name = "intensity distribution";
    if raw.data.is_empty() {
        return ValidationCheck {
            name,
            score: 0.0,
            message: "volume has no voxels".to_string(),
        };
    }

    let mut min_value = f32::INFINITY;
    let mut max_value = f32::NEG_INFINITY;
    let mut enamel_band = 0usize;
    let stride = if raw.data.len() > SAMPLE_LIMIT {
        SAMPLE_STRIDE
    } else {
        1
    };
    for &v in raw.data.iter().step_by(stride) {
        if v < min_value {
            min_value = v;
        }
        if v > max_value {
            max_value = v;
        }
        if (ENAMEL_HU_MIN..=ENAMEL_HU_MAX).contains(&v) {
            enamel_band += 1;
        }
    }

    let has_air = min_value < AIR_HU;
    let has_bone = max_value > BONE_HU;
    let has_enamel = enamel_band > 0;

    let (score, message) = if has_air && has_bone && has_enamel {
        (
            1.0,
            format!("air through enamel present (range {min_value:.0} to {max_value:.0} HU)"),
        )
    } else if has_air && has_bone {
        (
            0.7,
            "bone density present but no enamel-band voxels".to_string(),
        )
    } else if has_bone {
        (
            0.3,
            format!("no air contrast (minimum {min_value:.0} HU)"),
        )
    } else {
        (
            0.0,
            format!(
                "range {min_value:.0} to {max_value:.0} looks normalized or soft-tissue only, not calibrated CT"
            ),
        )
    };
    ValidationCheck {
        name,
        score,
        message,
    }
}

fn check_tooth_components(raw: &RawScan) -> ValidationCheck {
    let name = "tooth-like structures";
    let (nz, ny, nx) = raw.shape();
    if nz == 0 || ny == 0 || nx == 0 {
        return ValidationCheck {
            name,
            score: 0.0,
            message: "volume has no voxels".to_string(),
        };
    }

    // teeth live in the middle axial third of a dental scan
    let z0 = nz / 3;
    let z1 = ((2 * nz) / 3).max(z0 + 1).min(nz);
    let mask = Array3::from_shape_fn((nz, ny, nx), |(z, y, x)| {
        z >= z0 && z < z1 && raw.data[[z, y, x]] > ENAMEL_HU_MIN
    });
    let count = label_components(&mask).count;

    let (score, message) = if (4..=40).contains(&count) {
        (
            1.0,
            format!("{count} discrete enamel-density objects in the tooth region"),
        )
    } else if count > 40 {
        (
            0.3,
            format!("{count} high-density objects looks like noise, not dentition"),
        )
    } else if count > 0 {
        (
            0.5,
            format!("only {count} enamel-density objects, possibly a partial scan"),
        )
    } else {
        (0.0, "no enamel-density structures found".to_string())
    };
    ValidationCheck {
        name,
        score,
        message,
    }
}

fn check_proportions(raw: &RawScan) -> ValidationCheck {
    let name = "anatomy proportions";
    if raw.data.is_empty() {
        return ValidationCheck {
            name,
            score: 0.0,
            message: "volume has no voxels".to_string(),
        };
    }
    let air = fraction_below(&raw.data, AIR_FRACTION_HU) * 100.0;
    let bone = fraction_at_least(&raw.data, BONE_FRACTION_HU) * 100.0;
    let has_air_cavities = (3.0..40.0).contains(&air);
    let has_bone_share = (5.0..40.0).contains(&bone);

    let (score, message) = if has_air_cavities && has_bone_share {
        (
            1.0,
            format!("air {air:.1}% and bone {bone:.1}% match the maxillofacial region"),
        )
    } else if !has_air_cavities {
        (
            0.2,
            format!("air fraction {air:.1}% lacks the oral cavity and sinuses"),
        )
    } else {
        (
            0.6,
            format!("bone fraction {bone:.1}% is outside the dental range"),
        )
    };
    ValidationCheck {
        name,
        score,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Plausible dental scan: soft-tissue background, an airway pocket, a
    /// bone block, and four enamel blobs in the middle axial third.
    /// 80 voxels at 0.4 mm give a 32 mm field of view.
    fn dental_like_scan() -> RawScan {
        let mut data = Array3::from_elem((80, 80, 80), 50.0f32);
        for z in 16..48 {
            for y in 24..56 {
                for x in 24..56 {
                    data[[z, y, x]] = -800.0;
                }
            }
        }
        for z in 48..72 {
            for y in 16..64 {
                for x in 16..64 {
                    data[[z, y, x]] = 600.0;
                }
            }
        }
        for (cy, cx) in [(24, 24), (24, 56), (56, 24), (56, 56)] {
            for z in 30..40 {
                for y in cy - 2..cy + 2 {
                    for x in cx - 2..cx + 2 {
                        data[[z, y, x]] = 2800.0;
                    }
                }
            }
        }
        RawScan {
            data,
            spacing: [0.4; 3],
            origin: [0.0; 3],
        }
    }

    #[test]
    fn test_dental_like_scan_passes() {
        let report = validate_scan(&dental_like_scan());
        assert!(report.valid, "confidence {}", report.confidence);
        assert!(report.confidence >= PASS_CONFIDENCE);
        assert_eq!(report.checks.len(), 5);
        assert_eq!(report.scan_type, ScanType::Cbct);
    }

    #[test]
    fn test_elongated_scan_fails_fov() {
        let mut scan = dental_like_scan();
        scan.spacing = [2.0, 0.4, 0.4];
        let report = validate_scan(&scan);
        let fov = &report.checks[0];
        assert_eq!(fov.score, 0.0);
        assert!(!fov.passed());
    }

    #[test]
    fn test_normalized_data_fails_intensity() {
        let scan = RawScan {
            data: Array3::from_elem((40, 40, 40), 0.5f32),
            spacing: [0.4; 3],
            origin: [0.0; 3],
        };
        let report = validate_scan(&scan);
        assert!(!report.valid);
        assert_eq!(report.checks[2].score, 0.0);
        assert!(report.checks[2].message.contains("normalized"));
    }

    #[test]
    fn test_soft_tissue_scan_fails() {
        // chest-like: huge FOV, air everywhere, no enamel
        let mut data = Array3::from_elem((80, 80, 80), -700.0f32);
        for z in 20..60 {
            for y in 20..60 {
                for x in 20..60 {
                    data[[z, y, x]] = 40.0;
                }
            }
        }
        let scan = RawScan {
            data,
            spacing: [5.0, 5.0, 5.0],
            origin: [0.0; 3],
        };
        let report = validate_scan(&scan);
        assert!(!report.valid);
        assert!(report.confidence < 0.3);
    }

    #[test]
    fn test_component_count_window() {
        // fusing the blobs into one slab leaves too few discrete objects
        let mut scan = dental_like_scan();
        for z in 30..40 {
            for y in 20..60 {
                for x in 20..60 {
                    scan.data[[z, y, x]] = 2800.0;
                }
            }
        }
        let report = validate_scan(&scan);
        assert_eq!(report.checks[3].score, 0.5);
    }

    #[test]
    fn test_large_volume_sampling_is_deterministic() {
        let data = Array3::from_shape_fn((220, 220, 220), |(z, y, x)| {
            ((z + y + x) % 7) as f32 * 500.0 - 800.0
        });
        let scan = RawScan {
            data,
            spacing: [0.3; 3],
            origin: [0.0; 3],
        };
        let a = validate_scan(&scan);
        let b = validate_scan(&scan);
        assert_eq!(a.confidence, b.confidence);
        for (ca, cb) in a.checks.iter().zip(b.checks.iter()) {
            assert_eq!(ca.score, cb.score);
            assert_eq!(ca.message, cb.message);
        }
    }

    #[test]
    fn test_detect_scan_type_variants() {
        let mut scan = dental_like_scan();
        assert_eq!(detect_scan_type(&scan), ScanType::Cbct);

        scan.spacing = [3.0, 0.5, 0.5];
        scan.data[[0, 0, 0]] = -1000.0;
        assert_eq!(detect_scan_type(&scan), ScanType::Mdct);

        scan.spacing = [0.0, 0.5, 0.5];
        assert_eq!(detect_scan_type(&scan), ScanType::Unknown);

        // isotropic but coarse, and not calibrated to -1000
        let coarse = RawScan {
            data: Array3::from_elem((4, 4, 4), 100.0f32),
            spacing: [1.0; 3],
            origin: [0.0; 3],
        };
        assert_eq!(detect_scan_type(&coarse), ScanType::Unknown);
    }
}
