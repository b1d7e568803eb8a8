use log::debug;
use ndarray::Array3;

use crate::ops::stats::{collect_above, percentile};

/// Minimum share of the volume the candidate population must reach before
/// its percentile is trusted over the floor value
const MIN_CANDIDATE_FRACTION: f64 = 0.01;

/// Density thresholds separating tooth structure from bone and soft tissue
///
/// Derived from the smoothed volume per scan, so exposure differences between
/// scanners wash out. `high` splits enamel from everything else; `medium`
/// splits dentin-like density from bone and below.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct DensityThresholds {
    pub high: f32,
    pub medium: f32,
}

impl DensityThresholds {
    /// Computes both thresholds from a smoothed, normalized volume
    ///
    /// high: 88th percentile of voxels above 0.3, floored at 0.58.
    /// medium: 65th percentile of voxels above 0.2, floored at 0.42.
    /// When a candidate population is below 1% of the volume the percentile
    /// is statistically meaningless and the floor is used directly.
    pub fn from_volume(smoothed: &Array3<f32>) -> DensityThresholds {
        let high = floored_percentile(smoothed, 0.3, 88.0, 0.58);
        let medium = floored_percentile(smoothed, 0.2, 65.0, 0.42);
        debug!("density thresholds: high={high:.3} medium={medium:.3}");
        DensityThresholds { high, medium }
    }

    /// Midpoint used as the cortical-bone threshold
    pub fn bone_high(&self) -> f32 {
        (self.high + self.medium) / 2.0
    }
}

fn floored_percentile(data: &Array3<f32>, candidate_floor: f32, pct: f32, floor: f32) -> f32 {
    let candidates = collect_above(data, candidate_floor);
    let total = data.len().max(1);
    let fraction = candidates.len() as f64 / total as f64;
    if fraction < MIN_CANDIDATE_FRACTION {
        debug!(
            "threshold p{pct:.0}>{candidate_floor}: only {:.2}% candidates, using floor {floor}",
            fraction * 100.0
        );
        return floor;
    }
    match percentile(&candidates, pct) {
        Some(p) => p.max(floor),
        None => floor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_floor_dominates_dark_volume() {
        let data = Array3::from_elem((16, 16, 16), 0.1f32);
        let t = DensityThresholds::from_volume(&data);
        assert_eq!(t.high, 0.58);
        assert_eq!(t.medium, 0.42);
    }

    #[test]
    fn test_percentile_dominates_bright_volume() {
        // half the volume at 0.65, half at 0.95: p88 of candidates lands at 0.95
        let data = Array3::from_shape_fn((16, 16, 16), |(z, _, _)| {
            if z < 8 {
                0.65f32
            } else {
                0.95f32
            }
        });
        let t = DensityThresholds::from_volume(&data);
        assert!(t.high > 0.9);
        assert!(t.medium >= 0.42);
    }

    #[test]
    fn test_small_population_uses_floor() {
        // a 4-voxel bright speck in a dark 32^3 volume is under 1%
        let mut data = Array3::from_elem((32, 32, 32), 0.05f32);
        for x in 0..4 {
            data[[16, 16, x]] = 0.9;
        }
        let t = DensityThresholds::from_volume(&data);
        assert_eq!(t.high, 0.58);
        assert_eq!(t.medium, 0.42);
    }

    #[test]
    fn test_deterministic() {
        let data = Array3::from_shape_fn((12, 12, 12), |(z, y, x)| {
            ((z * 31 + y * 17 + x * 7) % 100) as f32 / 100.0
        });
        let a = DensityThresholds::from_volume(&data);
        let b = DensityThresholds::from_volume(&data);
        assert_eq!(a, b);
    }

    #[test]
    fn test_bone_high_is_midpoint() {
        let t = DensityThresholds {
            high: 0.7,
            medium: 0.5,
        };
        assert!((t.bone_high() - 0.6).abs() < 1e-6);
    }
}
