use std::path::PathBuf;
use std::process;

use clap::Parser;
use log::{error, info};

use dentseg_core::cli::setup_logging;
use dentseg_core::io::{save_nifti, synthetic_jaw};

/// CLI tool for generating synthetic dental CBCT phantoms
#[derive(Parser, Debug)]
#[command(name = "dentsynth")]
#[command(about = "Generate a synthetic dental CBCT phantom as NIfTI")]
#[command(version)]
struct Cli {
    /// Output path (.nii or .nii.gz)
    #[arg(value_name = "OUTPUT", default_value = "phantom.nii.gz")]
    output: PathBuf,

    /// Cubic volume edge length in voxels
    #[arg(short, long, default_value_t = 128)]
    size: usize,

    /// Noise seed
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    if cli.size == 0 {
        eprintln!("Error: size must be at least 1");
        process::exit(1);
    }

    info!("generating {}^3 phantom with seed {}", cli.size, cli.seed);
    let scan = synthetic_jaw(cli.size, cli.seed);

    if let Err(e) = save_nifti(&cli.output, &scan.data, scan.spacing) {
        error!("Failed to write {}: {}", cli.output.display(), e);
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    let (min, max) = scan.intensity_range();
    println!("Wrote {}", cli.output.display());
    println!("  Size:    {0} x {0} x {0} voxels", cli.size);
    println!(
        "  Spacing: {} x {} x {} mm",
        scan.spacing[0], scan.spacing[1], scan.spacing[2]
    );
    println!("  Range:   {:.3} to {:.3}", min, max);
    if let Ok(meta) = std::fs::metadata(&cli.output) {
        println!("  File:    {:.1} KiB", meta.len() as f64 / 1024.0);
    }
}
