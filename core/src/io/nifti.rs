use std::path::Path;

use log::warn;
use ndarray::{Array3, Axis, Ix3};
use nifti::writer::WriterOptions;
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};

use crate::error::{DentsegError, Result};
use crate::types::RawScan;

/// Read a NIfTI-1 volume into scanner axis order.
///
/// NIfTI stores voxels x-fastest, so the array comes back as (x, y, z)
/// and is reversed into the (z, y, x) convention used everywhere else.
/// Trailing singleton dimensions (a 4-d file with one time point) are
/// squeezed away.
pub(super) fn read_nifti(path: &Path) -> Result<RawScan> {
    let obj = ReaderOptions::new().read_file(path)?;
    let header = obj.header().clone();

    let mut data = obj.into_volume().into_ndarray::<f32>()?;
    while data.ndim() > 3 && data.shape()[data.ndim() - 1] == 1 {
        let last = data.ndim() - 1;
        data = data.index_axis_move(Axis(last), 0);
    }
    let shape = data.shape().to_vec();
    let data = data
        .into_dimensionality::<Ix3>()
        .map_err(|_| DentsegError::Nifti(format!("expected a 3-d volume, got shape {:?}", shape)))?;
    let data = data.reversed_axes();
    let data = if data.is_standard_layout() {
        data
    } else {
        data.as_standard_layout().into_owned()
    };

    let spacing = spacing_from_pixdim(&header.pixdim, path);
    let origin = origin_from_header(&header);
    Ok(RawScan { data, spacing, origin })
}

/// Write a volume as NIfTI-1, gzip-compressed when the path ends in `.gz`.
///
/// `spacing` is in mm, (z, y, x). The data is transposed back to the
/// x-fastest order NIfTI expects, so a file written here reads back with
/// the same shape and values.
pub fn save_nifti(path: &Path, data: &Array3<f32>, spacing: [f32; 3]) -> Result<()> {
    let mut header = NiftiHeader::default();
    header.pixdim = [1.0, spacing[2], spacing[1], spacing[0], 1.0, 1.0, 1.0, 1.0];
    header.sform_code = 1;
    header.srow_x = [spacing[2], 0.0, 0.0, 0.0];
    header.srow_y = [0.0, spacing[1], 0.0, 0.0];
    header.srow_z = [0.0, 0.0, spacing[0], 0.0];
    WriterOptions::new(path)
        .reference_header(&header)
        .write_nifti(&data.t())?;
    Ok(())
}

fn spacing_from_pixdim(pixdim: &[f32; 8], path: &Path) -> [f32; 3] {
    let candidate = [pixdim[3], pixdim[2], pixdim[1]];
    if candidate.iter().all(|s| s.is_finite() && *s > 0.0) {
        candidate
    } else {
        warn!("{} has no usable voxel spacing, assuming 1 mm", path.display());
        [1.0; 3]
    }
}

fn origin_from_header(header: &NiftiHeader) -> [f32; 3] {
    if header.sform_code > 0 {
        [header.srow_z[3], header.srow_y[3], header.srow_x[3]]
    } else if header.qform_code > 0 {
        [header.quatern_z, header.quatern_y, header.quatern_x]
    } else {
        [0.0; 3]
    }
}
