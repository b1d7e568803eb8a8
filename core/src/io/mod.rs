mod dicom;
mod nifti;
mod synthetic;

pub use self::nifti::save_nifti;
pub use self::synthetic::synthetic_jaw;

use std::path::Path;

use log::debug;

use crate::error::{DentsegError, Result};
use crate::types::RawScan;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanFormat {
    Nifti,
    Dicom,
}

fn detect_format(path: &Path) -> Option<ScanFormat> {
    let name = path.file_name()?.to_str()?.to_ascii_lowercase();
    if name.ends_with(".nii") || name.ends_with(".nii.gz") {
        Some(ScanFormat::Nifti)
    } else if name.ends_with(".dcm") || name.ends_with(".dicom") {
        Some(ScanFormat::Dicom)
    } else {
        None
    }
}

/// Load a scan from disk, dispatching on the file extension.
///
/// `.nii` and `.nii.gz` are read as NIfTI-1, `.dcm` and `.dicom` as
/// single-file DICOM. Anything else is an unsupported format.
pub fn load_scan(path: &Path) -> Result<RawScan> {
    let scan = match detect_format(path) {
        Some(ScanFormat::Nifti) => self::nifti::read_nifti(path)?,
        Some(ScanFormat::Dicom) => self::dicom::read_dicom(path)?,
        None => return Err(DentsegError::UnsupportedFormat(path.display().to_string())),
    };
    let (nz, ny, nx) = scan.shape();
    debug!(
        "loaded {}: {}x{}x{} voxels, spacing {:.3}/{:.3}/{:.3} mm",
        path.display(),
        nz,
        ny,
        nx,
        scan.spacing[0],
        scan.spacing[1],
        scan.spacing[2]
    );
    Ok(scan)
}
