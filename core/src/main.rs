use std::path::Path;
use std::process;

use clap::Parser;
use log::{error, info};

use dentseg_core::cli::report::TextReport;
use dentseg_core::cli::{setup_logging, Cli, OutputFormat};
use dentseg_core::segmentation::{self, ModelKind, SegmentationEngine, SegmentationOutcome};
use dentseg_core::types::{SegmentInfo, Volume, AUTO_DOWNSAMPLE_DIM};
use dentseg_core::{io, mesh};

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    if !cli.file.is_file() {
        eprintln!("Error: {} is not a file", cli.file.display());
        process::exit(1);
    }

    let raw = match io::load_scan(&cli.file) {
        Ok(raw) => raw,
        Err(e) => {
            error!("Failed to load {}: {}", cli.file.display(), e);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let mut volume = Volume::from_raw(&raw);
    if volume.needs_downsample() {
        let original = volume.shape();
        volume = volume.downsample_to((
            AUTO_DOWNSAMPLE_DIM,
            AUTO_DOWNSAMPLE_DIM,
            AUTO_DOWNSAMPLE_DIM,
        ));
        info!(
            "downsampled {:?} to {:?} for segmentation",
            original,
            volume.shape()
        );
    }

    let engine = SegmentationEngine::new(cli.model.clone().into());
    info!(
        "segmenting {} with the {} backend",
        cli.file.display(),
        engine.model_kind()
    );
    let outcome = engine.segment(&volume);
    let segments = segmentation::segment_info(&outcome.label_map, &volume);

    if let (Some(segment), Some(out)) = (&cli.mesh, &cli.mesh_out) {
        export_mesh(&outcome, segment, out);
    }

    let scan_name = cli.file.display().to_string();
    output_report(
        &scan_name,
        &volume,
        engine.model_kind(),
        &outcome,
        &segments,
        cli.format,
    );
}

fn export_mesh(outcome: &SegmentationOutcome, segment: &str, path: &Path) {
    let mask = match segmentation::segment_mask(&outcome.label_map, segment) {
        Ok(mask) => mask,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };
    match mesh::segment_mesh(&mask) {
        Some(mesh) => {
            if let Err(e) = mesh.write_stl(path) {
                error!("Failed to write {}: {}", path.display(), e);
                eprintln!("Error: {}", e);
                process::exit(1);
            }
            info!(
                "wrote {} ({} vertices, {} faces)",
                path.display(),
                mesh.vertex_count(),
                mesh.face_count()
            );
        }
        None => {
            eprintln!("Error: segment {} has no surface to export", segment);
            process::exit(1);
        }
    }
}

fn output_report(
    scan_name: &str,
    volume: &Volume,
    model: ModelKind,
    outcome: &SegmentationOutcome,
    segments: &[SegmentInfo],
    format: OutputFormat,
) {
    match format {
        OutputFormat::Text => {
            let report = TextReport::new(scan_name, volume.spacing, model, outcome, segments);
            println!("{}", report);
        }
        OutputFormat::Json => {
            #[cfg(feature = "json")]
            {
                match run_json(scan_name, volume, model, outcome, segments) {
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
fn run_json(
    scan_name: &str,
    volume: &Volume,
    model: ModelKind,
    outcome: &SegmentationOutcome,
    segments: &[SegmentInfo],
) -> Result<String, serde_json::Error> {
    use dentseg_core::segmentation::{DensityThresholds, StageTimings};
    use serde::Serialize;

    #[derive(Serialize)]
    struct RunJson<'a> {
        scan: &'a str,
        dimensions: (usize, usize, usize),
        spacing: [f32; 3],
        model: ModelKind,
        thresholds: DensityThresholds,
        arch_degraded: bool,
        used_fallback: bool,
        timings: StageTimings,
        segments: &'a [SegmentInfo],
    }

    let output = RunJson {
        scan: scan_name,
        dimensions: volume.shape(),
        spacing: volume.spacing,
        model,
        thresholds: outcome.thresholds,
        arch_degraded: outcome.arch_degraded,
        used_fallback: outcome.used_fallback,
        timings: outcome.timings,
        segments,
    };
    serde_json::to_string_pretty(&output)
}
