use std::path::Path;
use std::sync::Arc;

use log::info;
use ndarray::Array2;

use crate::error::{DentsegError, Result};
use crate::io;
use crate::mesh;
use crate::segmentation::{self, ModelKind, SegmentationEngine, SegmentationOutcome};
use crate::store::{ScanMetadata, ScanStore, StoredScan};
use crate::types::{Mask, Mesh, Plane, Quality, RawScan, SegmentInfo, Volume, AUTO_DOWNSAMPLE_DIM};

/// High-level entry point tying scan storage and segmentation together
///
/// Owns a bounded scan store and a segmentation engine. Scans are
/// registered under caller-chosen ids; the first segmentation of a scan is
/// cached on its store entry and reused by the query methods until the
/// scan is replaced or evicted.
///
/// # Example
///
/// ```
/// use dentseg_core::io::synthetic_jaw;
/// use dentseg_core::{DentalScanService, Plane};
///
/// let service = DentalScanService::new();
/// let scan = synthetic_jaw(32, 7);
///
/// let meta = service.add_scan("demo", &scan).unwrap();
/// assert_eq!(meta.dimensions, (32, 32, 32));
///
/// let outcome = service.segment("demo").unwrap();
/// assert_eq!(outcome.label_map.shape(), (32, 32, 32));
///
/// let slice = service.slice("demo", Plane::Axial, 16).unwrap();
/// assert_eq!(slice.dim(), (32, 32));
///
/// service.delete("demo").unwrap();
/// ```
pub struct DentalScanService {
    store: ScanStore,
    engine: SegmentationEngine,
}

impl DentalScanService {
    /// Service with the default model backend and store capacity
    pub fn new() -> DentalScanService {
        DentalScanService::with_model(ModelKind::default())
    }

    /// Service running the given model backend
    pub fn with_model(kind: ModelKind) -> DentalScanService {
        DentalScanService {
            store: ScanStore::new(),
            engine: SegmentationEngine::new(kind),
        }
    }

    /// Loads a scan file and registers it under `id`
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read, has an unsupported extension,
    /// or contains no voxels.
    pub fn upload(&self, id: &str, path: &Path) -> Result<ScanMetadata> {
        let raw = io::load_scan(path)?;
        self.add_scan(id, &raw)
    }

    /// Registers an in-memory scan under `id`, replacing any previous scan
    /// with that id
    ///
    /// The volume is min-max normalized for storage. Volumes larger than
    /// 256 voxels per axis are downsampled first; the returned metadata
    /// records the original dimensions when that happens.
    pub fn add_scan(&self, id: &str, raw: &RawScan) -> Result<ScanMetadata> {
        if raw.data.is_empty() {
            return Err(DentsegError::EmptyVolume);
        }
        let mut metadata = ScanMetadata::from_raw(raw);
        let mut volume = Volume::from_raw(raw);
        if volume.needs_downsample() {
            let original = volume.shape();
            volume = volume.downsample_to((
                AUTO_DOWNSAMPLE_DIM,
                AUTO_DOWNSAMPLE_DIM,
                AUTO_DOWNSAMPLE_DIM,
            ));
            metadata.downsampled = true;
            metadata.original_dimensions = Some(original);
            metadata.dimensions = volume.shape();
            metadata.spacing = volume.spacing;
            info!(
                "scan {} downsampled from {:?} to {:?} for storage",
                id, original, metadata.dimensions
            );
        }
        self.store.insert(id, volume, metadata.clone());
        Ok(metadata)
    }

    /// Metadata captured when the scan was registered
    pub fn metadata(&self, id: &str) -> Result<ScanMetadata> {
        Ok(self.scan(id)?.metadata)
    }

    /// Segments a stored scan, reusing a cached outcome when present
    pub fn segment(&self, id: &str) -> Result<Arc<SegmentationOutcome>> {
        let scan = self.scan(id)?;
        if let Some(outcome) = scan.outcome {
            return Ok(outcome);
        }
        let outcome = Arc::new(self.engine.segment(&scan.volume));
        self.store.set_outcome(id, Arc::clone(&outcome));
        Ok(outcome)
    }

    /// Per-segment statistics, segmenting on first use
    ///
    /// Labels with no voxels are omitted; the rest are ordered by label id.
    pub fn segment_info(&self, id: &str) -> Result<Vec<SegmentInfo>> {
        let scan = self.scan(id)?;
        let outcome = match scan.outcome {
            Some(outcome) => outcome,
            None => self.segment(id)?,
        };
        Ok(segmentation::segment_info(&outcome.label_map, &scan.volume))
    }

    /// Binary mask of one named segment
    ///
    /// # Errors
    ///
    /// `UnknownSegment` when the name matches no tissue class.
    pub fn segment_mask(&self, id: &str, segment: &str) -> Result<Mask> {
        let outcome = self.segment(id)?;
        segmentation::segment_mask(&outcome.label_map, segment)
    }

    /// Triangle mesh of one named segment, `None` when it has no surface
    pub fn segment_mesh(&self, id: &str, segment: &str) -> Result<Option<Mesh>> {
        let mask = self.segment_mask(id, segment)?;
        Ok(mesh::segment_mesh(&mask))
    }

    /// A 2-D slice of the stored volume, index clamped to range
    pub fn slice(&self, id: &str, plane: Plane, index: usize) -> Result<Array2<f32>> {
        Ok(self.scan(id)?.volume.slice_plane(plane, index))
    }

    /// Number of slices along a plane
    pub fn slice_count(&self, id: &str, plane: Plane) -> Result<usize> {
        Ok(self.scan(id)?.volume.slice_count(plane))
    }

    /// A copy of the volume downsampled to a quality preset
    pub fn volume_at(&self, id: &str, quality: Quality) -> Result<Volume> {
        Ok(self.scan(id)?.volume.downsample_quality(quality))
    }

    /// Removes a scan from the store
    pub fn delete(&self, id: &str) -> Result<()> {
        if self.store.remove(id) {
            Ok(())
        } else {
            Err(DentsegError::ScanNotFound(id.to_string()))
        }
    }

    /// Ids of stored scans, least recently used first
    pub fn scan_ids(&self) -> Vec<String> {
        self.store.ids()
    }

    /// The model backend this service runs
    pub fn model_kind(&self) -> ModelKind {
        self.engine.model_kind()
    }

    fn scan(&self, id: &str) -> Result<StoredScan> {
        self.store
            .get(id)
            .ok_or_else(|| DentsegError::ScanNotFound(id.to_string()))
    }
}

impl Default for DentalScanService {
    fn default() -> Self {
        DentalScanService::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::synthetic_jaw;
    use ndarray::Array3;

    fn service_with_phantom() -> DentalScanService {
        let service = DentalScanService::new();
        service.add_scan("scan", &synthetic_jaw(48, 5)).unwrap();
        service
    }

    #[test]
    fn test_add_scan_reports_metadata() {
        let service = DentalScanService::new();
        let meta = service.add_scan("a", &synthetic_jaw(32, 1)).unwrap();
        assert_eq!(meta.dimensions, (32, 32, 32));
        assert_eq!(meta.spacing, [0.5; 3]);
        assert!(!meta.downsampled);
        assert_eq!(service.metadata("a").unwrap(), meta);
    }

    #[test]
    fn test_unknown_scan_is_not_found() {
        let service = DentalScanService::new();
        assert!(matches!(
            service.metadata("nope"),
            Err(DentsegError::ScanNotFound(_))
        ));
        assert!(matches!(
            service.delete("nope"),
            Err(DentsegError::ScanNotFound(_))
        ));
    }

    #[test]
    fn test_empty_scan_is_rejected() {
        let service = DentalScanService::new();
        let raw = RawScan {
            data: Array3::zeros((0, 0, 0)),
            spacing: [1.0; 3],
            origin: [0.0; 3],
        };
        assert!(matches!(
            service.add_scan("empty", &raw),
            Err(DentsegError::EmptyVolume)
        ));
    }

    #[test]
    fn test_oversized_scan_is_downsampled_on_add() {
        let service = DentalScanService::new();
        let raw = RawScan {
            data: Array3::from_elem((300, 20, 20), 0.5),
            spacing: [1.0; 3],
            origin: [0.0; 3],
        };
        let meta = service.add_scan("big", &raw).unwrap();
        assert!(meta.downsampled);
        assert_eq!(meta.dimensions, (256, 20, 20));
        assert_eq!(meta.original_dimensions, Some((300, 20, 20)));
        assert!(meta.spacing[0] > 1.0);
        assert_eq!(meta.spacing[1], 1.0);
    }

    #[test]
    fn test_segment_results_are_cached() {
        let service = service_with_phantom();
        let first = service.segment("scan").unwrap();
        let second = service.segment("scan").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_segment_queries() {
        let service = service_with_phantom();
        let info = service.segment_info("scan").unwrap();
        assert!(!info.is_empty());

        let mask = service.segment_mask("scan", "enamel").unwrap();
        assert_eq!(mask.dim(), (48, 48, 48));
        assert!(matches!(
            service.segment_mask("scan", "bogus"),
            Err(DentsegError::UnknownSegment(_))
        ));

        // mesh extraction must not error even when the segment is empty
        service.segment_mesh("scan", "enamel").unwrap();
    }

    #[test]
    fn test_slice_and_volume_queries() {
        let service = service_with_phantom();
        let slice = service.slice("scan", Plane::Axial, 24).unwrap();
        assert_eq!(slice.dim(), (48, 48));
        assert_eq!(service.slice_count("scan", Plane::Coronal).unwrap(), 48);

        // quality presets never upsample
        let low = service.volume_at("scan", Quality::Low).unwrap();
        assert_eq!(low.shape(), (48, 48, 48));
    }

    #[test]
    fn test_delete_then_query_fails() {
        let service = service_with_phantom();
        service.delete("scan").unwrap();
        assert!(service.metadata("scan").is_err());
        assert!(service.scan_ids().is_empty());
    }
}
