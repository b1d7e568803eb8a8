use ndarray::{Array3, Axis, Zip};

use crate::types::Mask;

/// Sentinel for "no target voxel anywhere along this lane"
const FAR: f32 = 1.0e20;

/// Squared Euclidean distance from every voxel to the nearest true voxel
///
/// Felzenszwalb-Huttenlocher lower-envelope transform, one 1-D pass per
/// axis. True voxels get 0; if the mask is entirely false every voxel gets
/// a value >= [`FAR`]. Squared distances between voxels are exact integers
/// in f32 for any clinically plausible volume extent.
pub fn squared_distance_to(mask: &Mask) -> Array3<f32> {
    let mut dist = mask.mapv(|m| if m { 0.0f32 } else { FAR });
    if dist.is_empty() {
        return dist;
    }
    for axis in [Axis(2), Axis(1), Axis(0)] {
        transform_axis(&mut dist, axis);
    }
    dist
}

fn transform_axis(dist: &mut Array3<f32>, axis: Axis) {
    Zip::from(dist.lanes_mut(axis)).par_for_each(|mut lane| {
        let n = lane.len();
        if n < 2 {
            return;
        }
        let f: Vec<f32> = lane.iter().copied().collect();
        let mut d = vec![0.0f32; n];
        let mut v = vec![0usize; n];
        let mut z = vec![0.0f32; n + 1];
        envelope_1d(&f, &mut d, &mut v, &mut z);
        for (out, val) in lane.iter_mut().zip(d) {
            *out = val;
        }
    });
}

/// 1-D squared distance transform under the lower envelope of parabolas
fn envelope_1d(f: &[f32], d: &mut [f32], v: &mut [usize], z: &mut [f32]) {
    let n = f.len();
    let mut k = 0usize;
    v[0] = 0;
    z[0] = f32::NEG_INFINITY;
    z[1] = f32::INFINITY;

    let intersect = |f: &[f32], p: usize, q: usize| -> f32 {
        ((f[q] + (q * q) as f32) - (f[p] + (p * p) as f32)) / (2 * q - 2 * p) as f32
    };

    for q in 1..n {
        let mut s = intersect(f, v[k], q);
        while s <= z[k] {
            k -= 1;
            s = intersect(f, v[k], q);
        }
        k += 1;
        v[k] = q;
        z[k] = s;
        z[k + 1] = f32::INFINITY;
    }

    k = 0;
    for q in 0..n {
        while z[k + 1] < q as f32 {
            k += 1;
        }
        let dq = q as f32 - v[k] as f32;
        d[q] = dq * dq + f[v[k]];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_single_seed_distances() {
        let mut mask = Array3::from_elem((5, 5, 5), false);
        mask[[2, 2, 2]] = true;
        let d = squared_distance_to(&mask);
        assert_eq!(d[[2, 2, 2]], 0.0);
        assert_eq!(d[[2, 2, 4]], 4.0);
        assert_eq!(d[[2, 3, 3]], 2.0);
        assert_eq!(d[[4, 4, 4]], 12.0);
    }

    #[test]
    fn test_two_seeds_take_nearest() {
        let mut mask = Array3::from_elem((1, 1, 10), false);
        mask[[0, 0, 0]] = true;
        mask[[0, 0, 9]] = true;
        let d = squared_distance_to(&mask);
        assert_eq!(d[[0, 0, 4]], 16.0);
        assert_eq!(d[[0, 0, 6]], 9.0);
    }

    #[test]
    fn test_empty_mask_is_far_everywhere() {
        let mask = Array3::from_elem((4, 4, 4), false);
        let d = squared_distance_to(&mask);
        assert!(d.iter().all(|&v| v >= FAR));
    }

    #[test]
    fn test_full_mask_is_zero_everywhere() {
        let mask = Array3::from_elem((4, 4, 4), true);
        let d = squared_distance_to(&mask);
        assert!(d.iter().all(|&v| v == 0.0));
    }
}
