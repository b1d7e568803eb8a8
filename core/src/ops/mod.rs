//! Voxel-grid primitives shared by the segmentation stages
//!
//! Pure array operations with no knowledge of tissue semantics: Gaussian
//! smoothing, exact Euclidean-ball morphology (built on a squared distance
//! transform), 6-connected component labeling, and percentile statistics.

pub mod components;
pub mod distance;
pub mod morph;
pub mod smooth;
pub mod stats;

pub use components::{label_components, keep_largest, remove_small, size_window, BBox, ComponentSet};
pub use distance::squared_distance_to;
pub use morph::{close, dilate, erode, fill_holes, open, outer_ring};
pub use smooth::gaussian_smooth;
pub use stats::{collect_above, fraction_at_least, fraction_below, percentile};
