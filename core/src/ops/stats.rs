use ndarray::Array3;
use rayon::prelude::*;

/// Percentile with linear interpolation between ranks
///
/// Matches the NumPy default: rank = pct/100 * (n-1), interpolating between
/// the two nearest order statistics. Returns `None` for an empty slice.
/// Runs in O(n) via partitioned selection rather than a full sort.
pub fn percentile(values: &[f32], pct: f32) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    let mut buf = values.to_vec();
    let n = buf.len();
    let rank = (pct.clamp(0.0, 100.0) as f64 / 100.0) * (n - 1) as f64;
    let lo = rank.floor() as usize;
    let frac = (rank - lo as f64) as f32;

    let (_, lo_val, upper) = buf.select_nth_unstable_by(lo, |a, b| a.total_cmp(b));
    let lo_val = *lo_val;
    if frac == 0.0 || upper.is_empty() {
        return Some(lo_val);
    }
    let hi_val = upper.iter().copied().fold(f32::INFINITY, f32::min);
    Some(lo_val + (hi_val - lo_val) * frac)
}

/// Collects voxel values strictly above a floor
pub fn collect_above(data: &Array3<f32>, floor: f32) -> Vec<f32> {
    data.into_par_iter()
        .copied()
        .filter(|&v| v > floor)
        .collect()
}

/// Fraction of voxels strictly below a threshold
pub fn fraction_below(data: &Array3<f32>, threshold: f32) -> f32 {
    if data.is_empty() {
        return 0.0;
    }
    let count = data.into_par_iter().filter(|&&v| v < threshold).count();
    count as f32 / data.len() as f32
}

/// Fraction of voxels at or above a threshold
pub fn fraction_at_least(data: &Array3<f32>, threshold: f32) -> f32 {
    if data.is_empty() {
        return 0.0;
    }
    let count = data.into_par_iter().filter(|&&v| v >= threshold).count();
    count as f32 / data.len() as f32
}
