/// Resolution-adaptive processing parameters
///
/// Larger volumes trade some fidelity for bounded compute: stronger
/// smoothing, proportionally larger minimum object sizes, and coarser
/// structuring elements.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct AdaptiveParams {
    /// Gaussian pre-smoothing sigma in voxels
    pub sigma: f32,
    /// Multiplier applied to every component-size threshold
    pub size_scale: f32,
    /// Default structuring-element radius for in-rule morphology
    pub morph_radius: usize,
}

impl AdaptiveParams {
    /// Selects the parameter tier for a total voxel count
    ///
    /// Tiers: over 100M, 20M-100M, 5M-20M, and below 5M voxels.
    pub fn for_voxel_count(voxels: usize) -> AdaptiveParams {
        if voxels > 100_000_000 {
            AdaptiveParams {
                sigma: 2.0,
                size_scale: 4.0,
                morph_radius: 3,
            }
        } else if voxels > 20_000_000 {
            AdaptiveParams {
                sigma: 1.5,
                size_scale: 2.0,
                morph_radius: 2,
            }
        } else if voxels > 5_000_000 {
            AdaptiveParams {
                sigma: 1.0,
                size_scale: 1.0,
                morph_radius: 2,
            }
        } else {
            AdaptiveParams {
                sigma: 0.5,
                size_scale: 0.5,
                morph_radius: 1,
            }
        }
    }

    /// Scales a base component-size threshold, never below 1 voxel
    pub fn scaled_size(&self, base: usize) -> usize {
        ((base as f32 * self.size_scale).round() as usize).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(AdaptiveParams::for_voxel_count(150_000_000).sigma, 2.0);
        assert_eq!(AdaptiveParams::for_voxel_count(50_000_000).sigma, 1.5);
        assert_eq!(AdaptiveParams::for_voxel_count(10_000_000).sigma, 1.0);
        assert_eq!(AdaptiveParams::for_voxel_count(262_144).sigma, 0.5);
    }

    #[test]
    fn test_scaled_size_floors_at_one() {
        let params = AdaptiveParams::for_voxel_count(1_000);
        assert_eq!(params.size_scale, 0.5);
        assert_eq!(params.scaled_size(1), 1);
        assert_eq!(params.scaled_size(100), 50);
    }

    #[test]
    fn test_large_tier_scales_up() {
        let params = AdaptiveParams::for_voxel_count(30_000_000);
        assert_eq!(params.scaled_size(150), 300);
        assert_eq!(params.morph_radius, 2);
    }
}
