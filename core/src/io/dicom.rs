use std::path::Path;

use dicom::object::{open_file, InMemDicomObject};
use dicom::pixeldata::{ConvertOptions, PixelDecoder, VoiLutOption};
use dicom_dictionary_std::tags;
use log::warn;
use ndarray::s;

use crate::error::{DentsegError, Result};
use crate::types::RawScan;

/// Read a single-file DICOM export, multi-frame or single-slice.
///
/// The modality LUT is applied, so files carrying a rescale come out in
/// HU. No VOI windowing is applied; that would destroy the calibration
/// the plausibility checks depend on.
pub(super) fn read_dicom(path: &Path) -> Result<RawScan> {
    let obj = open_file(path)?;

    let options = ConvertOptions::new().with_voi_lut(VoiLutOption::Identity);
    let decoded = obj
        .decode_pixel_data()
        .map_err(|e| DentsegError::Dicom(e.to_string()))?;
    let frames = decoded
        .to_ndarray_with_options::<f32>(&options)
        .map_err(|e| DentsegError::Dicom(e.to_string()))?;

    // (frames, rows, columns, samples) -> (z, y, x), first sample plane
    let data = frames.slice_move(s![.., .., .., 0]);
    let data = if data.is_standard_layout() {
        data
    } else {
        data.as_standard_layout().into_owned()
    };

    Ok(RawScan {
        spacing: spacing_of(&obj, path),
        origin: origin_of(&obj),
        data,
    })
}

/// Spacing in mm, (z, y, x): SliceThickness plus PixelSpacing (row, col).
/// Missing tags fall back to 1 mm with a warning.
fn spacing_of(obj: &InMemDicomObject, path: &Path) -> [f32; 3] {
    let pixel = obj
        .element(tags::PIXEL_SPACING)
        .ok()
        .and_then(|e| e.to_multi_float32().ok())
        .filter(|v| v.len() >= 2);
    let thickness = obj
        .element(tags::SLICE_THICKNESS)
        .ok()
        .and_then(|e| e.to_float32().ok())
        .filter(|t| *t > 0.0);

    match (pixel, thickness) {
        (Some(ps), Some(t)) => [t, ps[0], ps[1]],
        (Some(ps), None) => {
            warn!("{} has no slice thickness, assuming 1 mm", path.display());
            [1.0, ps[0], ps[1]]
        }
        (None, Some(t)) => {
            warn!("{} has no pixel spacing, assuming 1 mm", path.display());
            [t, 1.0, 1.0]
        }
        (None, None) => {
            warn!("{} has no spacing information, assuming 1 mm", path.display());
            [1.0; 3]
        }
    }
}

fn origin_of(obj: &InMemDicomObject) -> [f32; 3] {
    obj.element(tags::IMAGE_POSITION_PATIENT)
        .ok()
        .and_then(|e| e.to_multi_float32().ok())
        .filter(|v| v.len() >= 3)
        .map(|v| [v[2], v[1], v[0]])
        .unwrap_or([0.0; 3])
}
