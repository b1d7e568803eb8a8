pub mod report;

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::segmentation::ModelKind;

/// Command-line arguments for dentseg
#[derive(Parser, Debug)]
#[command(name = "dentseg")]
#[command(about = "Dental CBCT tissue segmentation tool")]
#[command(version)]
pub struct Cli {
    /// Path to a scan file (.nii, .nii.gz, .dcm, .dicom)
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Segmentation model backend
    #[arg(short, long, default_value = "threshold")]
    pub model: ModelArg,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,

    /// Export this segment's surface as binary STL
    #[arg(long, value_name = "SEGMENT", requires = "mesh_out")]
    pub mesh: Option<String>,

    /// Path for the exported STL
    #[arg(long, value_name = "PATH", requires = "mesh")]
    pub mesh_out: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Output format options
#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format
    Text,
    /// JSON format
    Json,
}

/// Model backend options
#[derive(Debug, Clone, ValueEnum)]
pub enum ModelArg {
    /// Adaptive threshold cascade (always available)
    Threshold,
    /// nnU-Net backend; falls back to the cascade without weights
    Nnunet,
    /// DH-UNet backend; falls back to the cascade without weights
    Dhunet,
}

impl From<ModelArg> for ModelKind {
    fn from(arg: ModelArg) -> Self {
        match arg {
            ModelArg::Threshold => ModelKind::Threshold,
            ModelArg::Nnunet => ModelKind::NnUnet,
            ModelArg::Dhunet => ModelKind::DhUnet,
        }
    }
}

/// Initializes env_logger for a CLI run; info level by default, debug
/// when verbose
pub fn setup_logging(verbose: bool) {
    if verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    }
}
