use thiserror::Error;

/// Result type for dentseg operations
pub type Result<T> = std::result::Result<T, DentsegError>;

/// Error types for dentseg operations
#[derive(Error, Debug)]
pub enum DentsegError {
    /// Scan id not present in the store
    #[error("Scan not found: {0}")]
    ScanNotFound(String),

    /// Segment name not recognized
    #[error("Unknown segment: {0}")]
    UnknownSegment(String),

    /// File extension not recognized as a scan format
    #[error("Unsupported scan format: {0}")]
    UnsupportedFormat(String),

    /// Volume data unusable for segmentation
    #[error("Invalid volume: {0}")]
    InvalidVolume(String),

    /// Volume contains no voxels
    #[error("Empty volume")]
    EmptyVolume,

    /// NIfTI reading or writing error
    #[error("NIfTI error: {0}")]
    Nifti(String),

    /// DICOM reading or decoding error
    #[error("DICOM error: {0}")]
    Dicom(String),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// Helper conversions
impl From<String> for DentsegError {
    fn from(s: String) -> Self {
        DentsegError::InvalidVolume(s)
    }
}

impl From<&str> for DentsegError {
    fn from(s: &str) -> Self {
        DentsegError::InvalidVolume(s.to_string())
    }
}

// Convert format-crate errors
impl From<dicom::object::ReadError> for DentsegError {
    fn from(e: dicom::object::ReadError) -> Self {
        DentsegError::Dicom(format!("{}", e))
    }
}

impl From<nifti::NiftiError> for DentsegError {
    fn from(e: nifti::NiftiError) -> Self {
        DentsegError::Nifti(format!("{}", e))
    }
}
