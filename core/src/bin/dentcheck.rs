use std::path::PathBuf;
use std::process;

use clap::{Parser, ValueEnum};
use log::error;

use dentseg_core::cli::report::CheckReport;
use dentseg_core::cli::setup_logging;
use dentseg_core::io;
use dentseg_core::validate::{validate_scan, ValidationReport};

/// CLI tool for checking whether a scan file looks like a dental CBCT
#[derive(Parser, Debug)]
#[command(name = "dentcheck")]
#[command(about = "Plausibility checks for dental CBCT scan files")]
#[command(version)]
struct Cli {
    /// Path to a scan file (.nii, .nii.gz, .dcm, .dicom)
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Output format
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Output format options
#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable text format
    Text,
    /// JSON format
    Json,
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let raw = match io::load_scan(&cli.file) {
        Ok(raw) => raw,
        Err(e) => {
            error!("Failed to load {}: {}", cli.file.display(), e);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    // checks run on the scan as loaded, before any normalization
    let report = validate_scan(&raw);
    let scan_name = cli.file.display().to_string();
    output_report(&scan_name, &report, cli.format);

    if !report.valid {
        process::exit(1);
    }
}

fn output_report(scan_name: &str, report: &ValidationReport, format: OutputFormat) {
    match format {
        OutputFormat::Text => {
            println!("{}", CheckReport::new(scan_name, report));
        }
        OutputFormat::Json => {
            #[cfg(feature = "json")]
            {
                match check_json(scan_name, report) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        error!("Failed to serialize to JSON: {}", e);
                        eprintln!("Error: Failed to serialize to JSON: {}", e);
                        process::exit(1);
                    }
                }
            }
            #[cfg(not(feature = "json"))]
            {
                eprintln!("Error: JSON output requires the 'json' feature");
                eprintln!("Rebuild with: cargo build --features json");
                process::exit(1);
            }
        }
    }
}

#[cfg(feature = "json")]
fn check_json(scan_name: &str, report: &ValidationReport) -> Result<String, serde_json::Error> {
    use serde::Serialize;

    #[derive(Serialize)]
    struct CheckJson<'a> {
        scan: &'a str,
        report: &'a ValidationReport,
    }

    serde_json::to_string_pretty(&CheckJson {
        scan: scan_name,
        report,
    })
}
