pub mod api;
pub mod cli;
pub mod error;
pub mod io;
pub mod mesh;
pub mod ops;
pub mod segmentation;
pub mod store;
pub mod types;
pub mod validate;

pub use api::DentalScanService;
pub use cli::report::TextReport;
pub use error::{DentsegError, Result};
pub use segmentation::{ModelKind, SegmentationEngine};
pub use store::ScanMetadata;
pub use types::*;
