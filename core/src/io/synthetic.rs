use ndarray::Array3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::types::RawScan;

const SPACING_MM: f32 = 0.5;
const NOISE_SIGMA: f32 = 0.01;

const ARC_RADIUS: f32 = 50.0;
const ARC_THICKNESS: f32 = 10.0;
const ARC_TAPER: f32 = 0.3;
const ARC_VALUE: f32 = 0.7;

/// Tooth centers in (z, y, x) at the reference 128^3 size.
const TOOTH_CENTERS: [[f32; 3]; 4] = [
    [64.0, 64.0, 40.0],
    [64.0, 64.0, 88.0],
    [48.0, 64.0, 40.0],
    [48.0, 64.0, 88.0],
];
/// Anisotropy weights on (dz^2, dy^2, dx^2); teeth are longest along z.
const TOOTH_WEIGHTS: [f32; 3] = [0.3, 0.5, 1.0];
/// Half-extent of the box each tooth is carved inside, (z, y, x).
const TOOTH_BOX: [f32; 3] = [12.0, 8.0, 8.0];

const ENAMEL_RADIUS: f32 = 8.0;
const DENTIN_RADIUS: f32 = 6.0;
const PULP_RADIUS: f32 = 4.0;
const ENAMEL_VALUE: f32 = 0.9;
const DENTIN_VALUE: f32 = 0.6;
const PULP_VALUE: f32 = 0.3;

/// Deterministic jaw phantom: a tapering arc of bone with four teeth,
/// each a nested enamel/dentin/pulp ellipsoid, plus Gaussian noise,
/// clipped to [0, 1].
///
/// Dimensions are proportional to `size`; the reference layout is 128^3
/// at 0.5 mm spacing. The same `size` and `seed` always produce the
/// same volume.
pub fn synthetic_jaw(size: usize, seed: u64) -> RawScan {
    let scale = size as f32 / 128.0;
    let center = size as f32 / 2.0;
    let mut data = Array3::<f32>::zeros((size, size, size));

    // Jaw arc: an annulus in each axial slice, narrowing away from mid-height
    for z in 0..size {
        let radius = ARC_RADIUS * scale - ARC_TAPER * (z as f32 - center).abs();
        if radius <= 0.0 {
            continue;
        }
        let inner = radius - ARC_THICKNESS * scale;
        for y in 0..size {
            for x in 0..size {
                let dx = x as f32 - center;
                let dy = y as f32 - center;
                let dist = (dx * dx + dy * dy).sqrt();
                if dist < radius && dist > inner {
                    data[[z, y, x]] = ARC_VALUE;
                }
            }
        }
    }

    for tooth in TOOTH_CENTERS {
        let c = [tooth[0] * scale, tooth[1] * scale, tooth[2] * scale];
        let lo = |axis: usize| (c[axis] - TOOTH_BOX[axis] * scale).floor().max(0.0) as usize;
        let hi =
            |axis: usize| (c[axis] + TOOTH_BOX[axis] * scale).ceil().min(size as f32) as usize;
        for z in lo(0)..hi(0) {
            for y in lo(1)..hi(1) {
                for x in lo(2)..hi(2) {
                    let d = [z as f32 - c[0], y as f32 - c[1], x as f32 - c[2]];
                    let dist = (TOOTH_WEIGHTS[0] * d[0] * d[0]
                        + TOOTH_WEIGHTS[1] * d[1] * d[1]
                        + TOOTH_WEIGHTS[2] * d[2] * d[2])
                        .sqrt();
                    if dist < PULP_RADIUS * scale {
                        data[[z, y, x]] = PULP_VALUE;
                    } else if dist < DENTIN_RADIUS * scale {
                        data[[z, y, x]] = DENTIN_VALUE;
                    } else if dist < ENAMEL_RADIUS * scale {
                        data[[z, y, x]] = ENAMEL_VALUE;
                    }
                }
            }
        }
    }

    let mut rng = StdRng::seed_from_u64(seed);
    for v in data.iter_mut() {
        let n: f32 = rng.sample(StandardNormal);
        *v = (*v + NOISE_SIGMA * n).clamp(0.0, 1.0);
    }

    RawScan {
        data,
        spacing: [SPACING_MM; 3],
        origin: [0.0; 3],
    }
}
