//! Bounded in-memory store for uploaded scans
//!
//! Scans are keyed by caller-chosen id and evicted least-recently-used when
//! the store is full, so a long-running service cannot accumulate volumes
//! without limit. All access goes through one internal lock; volumes and
//! outcomes are handed out behind `Arc` so readers never hold the lock
//! while working on the data.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

use log::info;

use crate::segmentation::SegmentationOutcome;
use crate::types::{RawScan, Volume};

/// Default number of scans kept resident
pub const DEFAULT_CAPACITY: usize = 4;

/// Shape, spacing, and intensity summary captured at upload time
///
/// Mirrors what viewers need before requesting any voxel data. When a large
/// volume is auto-downsampled the original shape is preserved here.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct ScanMetadata {
    pub dimensions: (usize, usize, usize),
    pub spacing: [f32; 3],
    pub origin: [f32; 3],
    pub min_value: f32,
    pub max_value: f32,
    pub downsampled: bool,
    pub original_dimensions: Option<(usize, usize, usize)>,
}

impl ScanMetadata {
    /// Captures metadata from a scan as loaded, before any resampling
    pub fn from_raw(raw: &RawScan) -> ScanMetadata {
        let (min_value, max_value) = raw.intensity_range();
        ScanMetadata {
            dimensions: raw.shape(),
            spacing: raw.spacing,
            origin: raw.origin,
            min_value,
            max_value,
            downsampled: false,
            original_dimensions: None,
        }
    }
}

/// One resident scan with its derived products
#[derive(Debug, Clone)]
pub struct StoredScan {
    pub volume: Arc<Volume>,
    pub metadata: ScanMetadata,
    pub outcome: Option<Arc<SegmentationOutcome>>,
}

struct StoreInner {
    scans: HashMap<String, StoredScan>,
    // front = least recently used
    recency: VecDeque<String>,
}

/// Bounded, LRU-evicting scan store
pub struct ScanStore {
    inner: Mutex<StoreInner>,
    capacity: usize,
}

impl ScanStore {
    /// Store with the default capacity
    pub fn new() -> ScanStore {
        ScanStore::with_capacity(DEFAULT_CAPACITY)
    }

    /// Store holding at most `capacity` scans; a zero capacity is raised to 1
    pub fn with_capacity(capacity: usize) -> ScanStore {
        ScanStore {
            inner: Mutex::new(StoreInner {
                scans: HashMap::new(),
                recency: VecDeque::new(),
            }),
            capacity: capacity.max(1),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts or replaces a scan, evicting the least-recently-used entry
    /// when the store is full
    pub fn insert(&self, id: &str, volume: Volume, metadata: ScanMetadata) {
        let mut inner = self.lock();
        if !inner.scans.contains_key(id) && inner.scans.len() >= self.capacity {
            if let Some(evicted) = inner.recency.pop_front() {
                inner.scans.remove(&evicted);
                info!("scan store full, evicting least-recently-used scan {evicted}");
            }
        }
        inner.recency.retain(|known| known != id);
        inner.recency.push_back(id.to_string());
        inner.scans.insert(
            id.to_string(),
            StoredScan {
                volume: Arc::new(volume),
                metadata,
                outcome: None,
            },
        );
    }

    /// Fetches a scan and marks it most recently used
    pub fn get(&self, id: &str) -> Option<StoredScan> {
        let mut inner = self.lock();
        let record = inner.scans.get(id).cloned()?;
        inner.recency.retain(|known| known != id);
        inner.recency.push_back(id.to_string());
        Some(record)
    }

    /// Removes a scan and returns it
    pub fn take(&self, id: &str) -> Option<StoredScan> {
        let mut inner = self.lock();
        let record = inner.scans.remove(id)?;
        inner.recency.retain(|known| known != id);
        Some(record)
    }

    /// Removes a scan, reporting whether it was present
    pub fn remove(&self, id: &str) -> bool {
        self.take(id).is_some()
    }

    /// Attaches a segmentation outcome to a stored scan
    ///
    /// Returns false when the scan has been evicted in the meantime.
    pub fn set_outcome(&self, id: &str, outcome: Arc<SegmentationOutcome>) -> bool {
        let mut inner = self.lock();
        match inner.scans.get_mut(id) {
            Some(record) => {
                record.outcome = Some(outcome);
                true
            }
            None => false,
        }
    }

    /// Whether a scan is resident, without touching its recency
    pub fn contains(&self, id: &str) -> bool {
        self.lock().scans.contains_key(id)
    }

    /// Number of resident scans
    pub fn len(&self) -> usize {
        self.lock().scans.len()
    }

    /// Whether the store holds no scans
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids of resident scans, least recently used first
    pub fn ids(&self) -> Vec<String> {
        self.lock().recency.iter().cloned().collect()
    }
}

impl Default for ScanStore {
    fn default() -> Self {
        ScanStore::new()
    }
}

#[cfg(test)]
mod tests {
    use ndarray::Array3;

    use crate::segmentation::DensityThresholds;
    use crate::types::LabelMap;

    use super::*;

    fn tiny_volume(fill: f32) -> Volume {
        Volume::new(Array3::from_elem((4, 4, 4), fill), [0.5; 3])
    }

    fn tiny_metadata() -> ScanMetadata {
        ScanMetadata {
            dimensions: (4, 4, 4),
            spacing: [0.5; 3],
            origin: [0.0; 3],
            min_value: 0.0,
            max_value: 1.0,
            downsampled: false,
            original_dimensions: None,
        }
    }

    fn tiny_outcome() -> SegmentationOutcome {
        SegmentationOutcome {
            label_map: LabelMap::new((4, 4, 4)),
            thresholds: DensityThresholds {
                high: 0.6,
                medium: 0.45,
            },
            arch_degraded: false,
            used_fallback: false,
            timings: Default::default(),
        }
    }

    #[test]
    fn test_insert_and_get_roundtrip() {
        let store = ScanStore::new();
        store.insert("a", tiny_volume(0.3), tiny_metadata());
        assert!(store.contains("a"));
        assert_eq!(store.len(), 1);
        let record = store.get("a").unwrap();
        assert_eq!(record.volume.shape(), (4, 4, 4));
        assert_eq!(record.metadata.dimensions, (4, 4, 4));
        assert!(record.outcome.is_none());
        assert!(store.get("missing").is_none());
    }

    #[test]
    fn test_eviction_follows_recency() {
        let store = ScanStore::with_capacity(2);
        store.insert("a", tiny_volume(0.1), tiny_metadata());
        store.insert("b", tiny_volume(0.2), tiny_metadata());
        // touching "a" makes "b" the eviction candidate
        store.get("a");
        store.insert("c", tiny_volume(0.3), tiny_metadata());
        assert!(store.contains("a"));
        assert!(!store.contains("b"));
        assert!(store.contains("c"));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_reinsert_does_not_evict() {
        let store = ScanStore::with_capacity(2);
        store.insert("a", tiny_volume(0.1), tiny_metadata());
        store.insert("b", tiny_volume(0.2), tiny_metadata());
        store.insert("a", tiny_volume(0.9), tiny_metadata());
        assert_eq!(store.len(), 2);
        let record = store.get("a").unwrap();
        assert_eq!(record.volume.data[[0, 0, 0]], 0.9);
        // replacing "a" also cleared its previous outcome
        assert!(record.outcome.is_none());
    }

    #[test]
    fn test_take_removes_the_scan() {
        let store = ScanStore::new();
        store.insert("a", tiny_volume(0.5), tiny_metadata());
        let record = store.take("a").unwrap();
        assert_eq!(record.volume.data[[0, 0, 0]], 0.5);
        assert!(!store.contains("a"));
        assert!(store.take("a").is_none());
        assert!(!store.remove("a"));
    }

    #[test]
    fn test_set_outcome_attaches_to_resident_scan() {
        let store = ScanStore::new();
        store.insert("a", tiny_volume(0.5), tiny_metadata());
        assert!(store.set_outcome("a", Arc::new(tiny_outcome())));
        assert!(!store.set_outcome("gone", Arc::new(tiny_outcome())));
        let record = store.get("a").unwrap();
        let outcome = record.outcome.unwrap();
        assert!(!outcome.used_fallback);
    }

    #[test]
    fn test_ids_ordered_least_recent_first() {
        let store = ScanStore::new();
        store.insert("a", tiny_volume(0.1), tiny_metadata());
        store.insert("b", tiny_volume(0.2), tiny_metadata());
        store.get("a");
        assert_eq!(store.ids(), vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn test_zero_capacity_clamps_to_one() {
        let store = ScanStore::with_capacity(0);
        store.insert("a", tiny_volume(0.1), tiny_metadata());
        store.insert("b", tiny_volume(0.2), tiny_metadata());
        assert_eq!(store.len(), 1);
        assert!(store.contains("b"));
    }

    #[test]
    fn test_metadata_from_raw() {
        let raw = RawScan {
            data: Array3::from_shape_fn((2, 3, 4), |(z, _, _)| if z == 0 { -500.0 } else { 1800.0 }),
            spacing: [0.3, 0.25, 0.25],
            origin: [1.0, 2.0, 3.0],
        };
        let meta = ScanMetadata::from_raw(&raw);
        assert_eq!(meta.dimensions, (2, 3, 4));
        assert_eq!(meta.min_value, -500.0);
        assert_eq!(meta.max_value, 1800.0);
        assert!(!meta.downsampled);
        assert!(meta.original_dimensions.is_none());
    }
}
