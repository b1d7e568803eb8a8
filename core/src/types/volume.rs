use ndarray::{s, Array2, Array3};

/// Anatomical slicing planes for 2-D views of a volume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
#[cfg_attr(feature = "json", serde(rename_all = "lowercase"))]
pub enum Plane {
    /// Perpendicular to the z axis (horizontal)
    Axial,
    /// Perpendicular to the y axis (frontal)
    Coronal,
    /// Perpendicular to the x axis (lateral)
    Sagittal,
}

impl Plane {
    /// Parses a plane from its API name
    #[allow(clippy::should_implement_trait)]
    pub fn from_name(s: &str) -> Option<Plane> {
        match s.to_lowercase().as_str() {
            "axial" => Some(Plane::Axial),
            "coronal" => Some(Plane::Coronal),
            "sagittal" => Some(Plane::Sagittal),
            _ => None,
        }
    }
}

/// Rendering quality presets mapped to downsampling targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
#[cfg_attr(feature = "json", serde(rename_all = "lowercase"))]
pub enum Quality {
    Low,
    Medium,
    #[default]
    High,
}

impl Quality {
    /// Cube edge length the preset downsamples to
    pub fn target_dim(&self) -> usize {
        match self {
            Quality::Low => 64,
            Quality::Medium => 96,
            Quality::High => 128,
        }
    }
}

/// Largest dimension accepted before auto-downsampling kicks in
pub const AUTO_DOWNSAMPLE_DIM: usize = 256;

/// A scan as loaded from disk, in original intensity units
///
/// CT-calibrated sources carry Hounsfield-like values here; the plausibility
/// validator requires them. Segmentation consumes the normalized [`Volume`]
/// built via [`Volume::from_raw`].
#[derive(Debug, Clone)]
pub struct RawScan {
    /// Voxel data in (z, y, x) order, original units
    pub data: Array3<f32>,
    /// Voxel spacing in mm, (z, y, x)
    pub spacing: [f32; 3],
    /// Physical origin in mm, (z, y, x)
    pub origin: [f32; 3],
}

impl RawScan {
    /// Volume shape as (z, y, x)
    pub fn shape(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    /// Minimum and maximum intensity over all voxels
    ///
    /// Returns (0.0, 0.0) for an empty array.
    pub fn intensity_range(&self) -> (f32, f32) {
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        for &v in self.data.iter() {
            if v < min {
                min = v;
            }
            if v > max {
                max = v;
            }
        }
        if min > max {
            (0.0, 0.0)
        } else {
            (min, max)
        }
    }

    /// Physical field of view in mm per axis, (z, y, x)
    pub fn fov_mm(&self) -> [f32; 3] {
        let (z, y, x) = self.shape();
        [
            z as f32 * self.spacing[0],
            y as f32 * self.spacing[1],
            x as f32 * self.spacing[2],
        ]
    }
}

/// A normalized scan volume ready for segmentation
///
/// Intensities are min-max normalized to [0, 1]; axis order is (z, y, x).
#[derive(Debug, Clone)]
pub struct Volume {
    /// Normalized voxel data
    pub data: Array3<f32>,
    /// Voxel spacing in mm, (z, y, x)
    pub spacing: [f32; 3],
    /// Physical origin in mm, (z, y, x)
    pub origin: [f32; 3],
}

impl Volume {
    /// Wraps already-normalized data
    pub fn new(data: Array3<f32>, spacing: [f32; 3]) -> Self {
        Volume {
            data,
            spacing,
            origin: [0.0; 3],
        }
    }

    /// Normalizes a raw scan to [0, 1] by its intensity range
    ///
    /// A constant scan (max == min) normalizes to all zeros.
    pub fn from_raw(raw: &RawScan) -> Self {
        let (min, max) = raw.intensity_range();
        let range = max - min;
        let data = if range > 0.0 {
            raw.data.mapv(|v| (v - min) / range)
        } else {
            Array3::zeros(raw.data.dim())
        };
        Volume {
            data,
            spacing: raw.spacing,
            origin: raw.origin,
        }
    }

    /// Volume shape as (z, y, x)
    pub fn shape(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    /// Total voxel count
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the volume has no voxels
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Physical volume of one voxel in cubic millimeters
    pub fn voxel_volume_mm3(&self) -> f32 {
        self.spacing[0] * self.spacing[1] * self.spacing[2]
    }

    /// Extracts a 2-D slice along the given plane, clamping the index to range
    pub fn slice_plane(&self, plane: Plane, index: usize) -> Array2<f32> {
        let (nz, ny, nx) = self.shape();
        match plane {
            Plane::Axial => {
                let i = index.min(nz.saturating_sub(1));
                self.data.slice(s![i, .., ..]).to_owned()
            }
            Plane::Coronal => {
                let i = index.min(ny.saturating_sub(1));
                self.data.slice(s![.., i, ..]).to_owned()
            }
            Plane::Sagittal => {
                let i = index.min(nx.saturating_sub(1));
                self.data.slice(s![.., .., i]).to_owned()
            }
        }
    }

    /// Number of slices available along a plane
    pub fn slice_count(&self, plane: Plane) -> usize {
        let (nz, ny, nx) = self.shape();
        match plane {
            Plane::Axial => nz,
            Plane::Coronal => ny,
            Plane::Sagittal => nx,
        }
    }

    /// Whether any dimension exceeds the auto-downsample limit
    pub fn needs_downsample(&self) -> bool {
        let (nz, ny, nx) = self.shape();
        nz > AUTO_DOWNSAMPLE_DIM || ny > AUTO_DOWNSAMPLE_DIM || nx > AUTO_DOWNSAMPLE_DIM
    }

    /// Nearest-neighbor resampling to at most `target` voxels per axis
    ///
    /// Axes already at or below the target keep their size; spacing scales to
    /// preserve the physical field of view.
    pub fn downsample_to(&self, target: (usize, usize, usize)) -> Volume {
        let (nz, ny, nx) = self.shape();
        let tz = target.0.clamp(1, nz.max(1));
        let ty = target.1.clamp(1, ny.max(1));
        let tx = target.2.clamp(1, nx.max(1));
        if (tz, ty, tx) == (nz, ny, nx) {
            return self.clone();
        }
        let mut out = Array3::zeros((tz, ty, tx));
        for z in 0..tz {
            let sz = z * nz / tz;
            for y in 0..ty {
                let sy = y * ny / ty;
                for x in 0..tx {
                    let sx = x * nx / tx;
                    out[[z, y, x]] = self.data[[sz, sy, sx]];
                }
            }
        }
        let spacing = [
            self.spacing[0] * nz as f32 / tz as f32,
            self.spacing[1] * ny as f32 / ty as f32,
            self.spacing[2] * nx as f32 / tx as f32,
        ];
        Volume {
            data: out,
            spacing,
            origin: self.origin,
        }
    }

    /// Downsamples to the cube size of a quality preset
    pub fn downsample_quality(&self, quality: Quality) -> Volume {
        let d = quality.target_dim();
        self.downsample_to((d, d, d))
    }

    /// Applies an intensity window (center/width), renormalizing to [0, 1]
    ///
    /// Values are clipped to the window before rescaling. A non-positive
    /// width returns a zero volume.
    pub fn window(&self, center: f32, width: f32) -> Volume {
        if width <= 0.0 {
            return Volume {
                data: Array3::zeros(self.data.dim()),
                spacing: self.spacing,
                origin: self.origin,
            };
        }
        let lo = center - width / 2.0;
        let hi = center + width / 2.0;
        let data = self.data.mapv(|v| (v.clamp(lo, hi) - lo) / (hi - lo));
        Volume {
            data,
            spacing: self.spacing,
            origin: self.origin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_ramp_volume() -> Volume {
        // 4x4x4 ramp 0..64 scaled into [0, 1]
        let data = Array3::from_shape_fn((4, 4, 4), |(z, y, x)| {
            (z * 16 + y * 4 + x) as f32 / 63.0
        });
        Volume::new(data, [0.5, 0.5, 0.5])
    }

    #[test]
    fn test_from_raw_normalizes_range() {
        let raw = RawScan {
            data: Array3::from_shape_fn((2, 2, 2), |(z, _, _)| if z == 0 { -1000.0 } else { 3000.0 }),
            spacing: [0.3; 3],
            origin: [0.0; 3],
        };
        let vol = Volume::from_raw(&raw);
        assert_eq!(vol.data[[0, 0, 0]], 0.0);
        assert_eq!(vol.data[[1, 1, 1]], 1.0);
    }

    #[test]
    fn test_from_raw_constant_scan_is_zero() {
        let raw = RawScan {
            data: Array3::from_elem((3, 3, 3), 500.0),
            spacing: [0.3; 3],
            origin: [0.0; 3],
        };
        let vol = Volume::from_raw(&raw);
        assert!(vol.data.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_slice_plane_shapes() {
        let vol = make_ramp_volume();
        assert_eq!(vol.slice_plane(Plane::Axial, 2).dim(), (4, 4));
        assert_eq!(vol.slice_plane(Plane::Coronal, 0).dim(), (4, 4));
        assert_eq!(vol.slice_plane(Plane::Sagittal, 3).dim(), (4, 4));
    }

    #[test]
    fn test_slice_plane_clamps_index() {
        let vol = make_ramp_volume();
        let last = vol.slice_plane(Plane::Axial, 3);
        let clamped = vol.slice_plane(Plane::Axial, 99);
        assert_eq!(last, clamped);
    }

    #[test]
    fn test_downsample_shape_and_spacing() {
        let vol = make_ramp_volume();
        let down = vol.downsample_to((2, 2, 2));
        assert_eq!(down.shape(), (2, 2, 2));
        assert_eq!(down.spacing, [1.0, 1.0, 1.0]);
        // corner voxel maps back to the source corner
        assert_eq!(down.data[[0, 0, 0]], vol.data[[0, 0, 0]]);
    }

    #[test]
    fn test_downsample_never_upsamples() {
        let vol = make_ramp_volume();
        let same = vol.downsample_to((64, 64, 64));
        assert_eq!(same.shape(), (4, 4, 4));
    }

    #[test]
    fn test_window_renormalizes() {
        let vol = make_ramp_volume();
        let windowed = vol.window(0.5, 0.5);
        assert_eq!(windowed.data[[0, 0, 0]], 0.0);
        let max = windowed.data.iter().cloned().fold(f32::MIN, f32::max);
        assert!((max - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_quality_targets() {
        assert_eq!(Quality::Low.target_dim(), 64);
        assert_eq!(Quality::Medium.target_dim(), 96);
        assert_eq!(Quality::High.target_dim(), 128);
    }
}
