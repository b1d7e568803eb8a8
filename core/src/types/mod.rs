//! Core type definitions for dental CBCT segmentation
//!
//! This module provides the fundamental types used throughout the dentseg
//! library:
//! - [`Tissue`]: the 13 dental tissue classes and their display metadata
//! - [`Volume`] / [`RawScan`]: normalized and as-loaded scan volumes
//! - [`LabelMap`] / [`Mask`]: per-voxel label assignments with write-once claims
//! - [`SegmentInfo`]: per-segment summary statistics
//! - [`Mesh`]: triangle surface of one segment
//! - [`Plane`] / [`Quality`]: 2-D slicing planes and downsampling presets

mod label_map;
mod mesh;
mod tissue;
mod volume;

pub use label_map::{LabelMap, Mask};
pub use mesh::Mesh;
pub use tissue::{SegmentInfo, Tissue, TISSUE_COUNT};
pub use volume::{Plane, Quality, RawScan, Volume, AUTO_DOWNSAMPLE_DIM};
