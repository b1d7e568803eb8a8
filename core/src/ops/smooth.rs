use ndarray::{Array3, Axis, Zip};

/// Separable 3-D Gaussian smoothing with reflect boundary handling
///
/// The kernel is truncated at 3 sigma and normalized, then applied as three
/// 1-D passes (x, y, z). Sigma at or below zero returns the input unchanged.
pub fn gaussian_smooth(data: &Array3<f32>, sigma: f32) -> Array3<f32> {
    let mut out = data.clone();
    if sigma <= 0.0 || data.is_empty() {
        return out;
    }
    let kernel = gaussian_kernel(sigma);
    for axis in [Axis(2), Axis(1), Axis(0)] {
        smooth_axis(&mut out, &kernel, axis);
    }
    out
}

/// Normalized 1-D Gaussian taps, radius ceil(3 sigma)
fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    let radius = (3.0 * sigma).ceil().max(1.0) as usize;
    let denom = 2.0 * sigma * sigma;
    let mut kernel: Vec<f32> = (0..=2 * radius)
        .map(|i| {
            let d = i as f32 - radius as f32;
            (-d * d / denom).exp()
        })
        .collect();
    let sum: f32 = kernel.iter().sum();
    for w in &mut kernel {
        *w /= sum;
    }
    kernel
}

fn smooth_axis(data: &mut Array3<f32>, kernel: &[f32], axis: Axis) {
    let radius = (kernel.len() / 2) as isize;
    Zip::from(data.lanes_mut(axis)).par_for_each(|mut lane| {
        let n = lane.len();
        if n == 0 {
            return;
        }
        let src: Vec<f32> = lane.iter().copied().collect();
        for (i, out) in lane.iter_mut().enumerate() {
            let mut acc = 0.0f32;
            for (k, &w) in kernel.iter().enumerate() {
                let j = reflect_index(i as isize + k as isize - radius, n);
                acc += src[j] * w;
            }
            *out = acc;
        }
    });
}

/// Mirror indexing without edge repetition collapse: (d c b a | a b c d | d c b a)
fn reflect_index(mut i: isize, n: usize) -> usize {
    let n = n as isize;
    loop {
        if i < 0 {
            i = -i - 1;
        } else if i >= n {
            i = 2 * n - i - 1;
        } else {
            return i as usize;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_kernel_normalized() {
        let k = gaussian_kernel(1.5);
        let sum: f32 = k.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert_eq!(k.len(), 2 * 5 + 1);
    }

    #[test]
    fn test_constant_volume_unchanged() {
        let data = Array3::from_elem((8, 8, 8), 0.7f32);
        let smoothed = gaussian_smooth(&data, 1.0);
        for &v in smoothed.iter() {
            assert!((v - 0.7).abs() < 1e-5);
        }
    }

    #[test]
    fn test_peak_spreads_symmetrically() {
        let mut data = Array3::zeros((9, 9, 9));
        data[[4, 4, 4]] = 1.0f32;
        let smoothed = gaussian_smooth(&data, 1.0);
        assert!(smoothed[[4, 4, 4]] < 1.0);
        assert!(smoothed[[4, 4, 5]] > 0.0);
        assert!((smoothed[[4, 4, 5]] - smoothed[[4, 4, 3]]).abs() < 1e-6);
        assert!((smoothed[[4, 5, 4]] - smoothed[[5, 4, 4]]).abs() < 1e-6);
    }

    #[test]
    fn test_mass_preserved_for_interior_peak() {
        let mut data = Array3::zeros((11, 11, 11));
        data[[5, 5, 5]] = 1.0f32;
        let smoothed = gaussian_smooth(&data, 1.0);
        let total: f32 = smoothed.iter().sum();
        assert!((total - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_zero_sigma_is_identity() {
        let data = Array3::from_shape_fn((4, 4, 4), |(z, y, x)| (z + y + x) as f32);
        let smoothed = gaussian_smooth(&data, 0.0);
        assert_eq!(smoothed, data);
    }

    #[test]
    fn test_reflect_index() {
        assert_eq!(reflect_index(-1, 4), 0);
        assert_eq!(reflect_index(-2, 4), 1);
        assert_eq!(reflect_index(4, 4), 3);
        assert_eq!(reflect_index(5, 4), 2);
        assert_eq!(reflect_index(2, 4), 2);
    }
}
