use std::fmt;

use crate::segmentation::{ModelKind, SegmentationOutcome};
use crate::types::SegmentInfo;
use crate::validate::ValidationReport;

/// Text report formatter for one segmentation run
pub struct TextReport<'a> {
    scan_name: &'a str,
    spacing: [f32; 3],
    model: ModelKind,
    outcome: &'a SegmentationOutcome,
    segments: &'a [SegmentInfo],
}

impl<'a> TextReport<'a> {
    /// Creates a new text report
    pub fn new(
        scan_name: &'a str,
        spacing: [f32; 3],
        model: ModelKind,
        outcome: &'a SegmentationOutcome,
        segments: &'a [SegmentInfo],
    ) -> Self {
        Self {
            scan_name,
            spacing,
            model,
            outcome,
            segments,
        }
    }
}

impl<'a> fmt::Display for TextReport<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (nz, ny, nx) = self.outcome.label_map.shape();
        let voxels = self.outcome.label_map.len();
        let labeled = self.outcome.label_map.total_labeled();
        let percent = if voxels > 0 {
            100.0 * labeled as f32 / voxels as f32
        } else {
            0.0
        };

        writeln!(f, "Dental CBCT Segmentation")?;
        writeln!(f, "========================")?;
        writeln!(f)?;
        writeln!(f, "Scan:           {}", self.scan_name)?;
        writeln!(f, "Dimensions:     {} x {} x {}", nz, ny, nx)?;
        writeln!(
            f,
            "Spacing:        {:.3} x {:.3} x {:.3} mm",
            self.spacing[0], self.spacing[1], self.spacing[2]
        )?;
        writeln!(f, "Model:          {}", self.model)?;
        writeln!(
            f,
            "Thresholds:     high {:.3}, medium {:.3}",
            self.outcome.thresholds.high, self.outcome.thresholds.medium
        )?;
        writeln!(f, "Labeled:        {} voxels ({:.1}%)", labeled, percent)?;
        writeln!(
            f,
            "Arch:           {}",
            if self.outcome.arch_degraded {
                "degraded (full-volume band)"
            } else {
                "localized"
            }
        )?;
        writeln!(
            f,
            "Fallback:       {}",
            if self.outcome.used_fallback {
                "yes (fixed thresholds)"
            } else {
                "no"
            }
        )?;
        let t = &self.outcome.timings;
        writeln!(
            f,
            "Time:           {} ms (smooth {}, thresholds {}, arch {}, cascade {}, cleanup {})",
            t.total_ms, t.smooth_ms, t.thresholds_ms, t.arch_ms, t.cascade_ms, t.cleanup_ms
        )?;
        writeln!(f)?;

        writeln!(f, "Segments")?;
        writeln!(f, "--------")?;
        if self.segments.is_empty() {
            writeln!(f, "No segments labeled")?;
        } else {
            writeln!(
                f,
                "{:<20} {:>10} {:>14} {:>8}",
                "segment", "voxels", "volume mm3", "mean"
            )?;
            for segment in self.segments {
                writeln!(
                    f,
                    "{:<20} {:>10} {:>14.1} {:>8.3}",
                    segment.tissue.name(),
                    segment.voxel_count,
                    segment.volume_mm3,
                    segment.mean_intensity
                )?;
            }
        }

        Ok(())
    }
}

/// Text report formatter for the scan plausibility checks
pub struct CheckReport<'a> {
    scan_name: &'a str,
    report: &'a ValidationReport,
}

impl<'a> CheckReport<'a> {
    /// Creates a new check report
    pub fn new(scan_name: &'a str, report: &'a ValidationReport) -> Self {
        Self { scan_name, report }
    }
}

impl<'a> fmt::Display for CheckReport<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Scan Plausibility Check")?;
        writeln!(f, "=======================")?;
        writeln!(f)?;
        writeln!(f, "Scan:           {}", self.scan_name)?;
        writeln!(f, "Scan type:      {}", self.report.scan_type)?;
        writeln!(f, "Confidence:     {:.2}", self.report.confidence)?;
        writeln!(
            f,
            "Verdict:        {}",
            if self.report.valid {
                "plausible dental CBCT"
            } else {
                "not a plausible dental CBCT"
            }
        )?;
        writeln!(f)?;

        writeln!(f, "Checks")?;
        writeln!(f, "------")?;
        for check in &self.report.checks {
            writeln!(
                f,
                "[{}] {:<18} {:>5.2}  {}",
                if check.passed() { "pass" } else { "fail" },
                check.name,
                check.score,
                check.message
            )?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmentation::{DensityThresholds, StageTimings};
    use crate::types::{LabelMap, Mask, Tissue};
    use crate::validate::{ScanType, ValidationCheck};

    fn sample_outcome() -> SegmentationOutcome {
        let mut label_map = LabelMap::new((4, 4, 4));
        let mut mask = Mask::from_elem((4, 4, 4), false);
        mask[[0, 0, 0]] = true;
        mask[[0, 0, 1]] = true;
        label_map.claim(&mask, Tissue::Enamel);
        SegmentationOutcome {
            label_map,
            thresholds: DensityThresholds {
                high: 0.61,
                medium: 0.43,
            },
            arch_degraded: false,
            used_fallback: false,
            timings: StageTimings::default(),
        }
    }

    #[test]
    fn test_text_report_format() {
        let outcome = sample_outcome();
        let segments = [SegmentInfo {
            tissue: Tissue::Enamel,
            voxel_count: 2,
            volume_mm3: 0.25,
            mean_intensity: 0.91,
        }];
        let report = TextReport::new(
            "scan.nii.gz",
            [0.5; 3],
            ModelKind::Threshold,
            &outcome,
            &segments,
        );
        let output = format!("{}", report);

        assert!(output.contains("Dental CBCT Segmentation"));
        assert!(output.contains("Scan:           scan.nii.gz"));
        assert!(output.contains("Dimensions:     4 x 4 x 4"));
        assert!(output.contains("Thresholds:     high 0.610, medium 0.430"));
        assert!(output.contains("Labeled:        2 voxels (3.1%)"));
        assert!(output.contains("Arch:           localized"));
        assert!(output.contains("enamel"));
    }

    #[test]
    fn test_text_report_without_segments() {
        let outcome = SegmentationOutcome {
            label_map: LabelMap::new((2, 2, 2)),
            thresholds: DensityThresholds {
                high: 0.6,
                medium: 0.45,
            },
            arch_degraded: true,
            used_fallback: true,
            timings: StageTimings::default(),
        };
        let report = TextReport::new("flat.nii", [1.0; 3], ModelKind::Threshold, &outcome, &[]);
        let output = format!("{}", report);

        assert!(output.contains("No segments labeled"));
        assert!(output.contains("Arch:           degraded (full-volume band)"));
        assert!(output.contains("Fallback:       yes (fixed thresholds)"));
    }

    #[test]
    fn test_check_report_format() {
        let report = ValidationReport {
            checks: vec![
                ValidationCheck {
                    name: "field_of_view",
                    score: 1.0,
                    message: "FOV in dental range".to_string(),
                },
                ValidationCheck {
                    name: "intensity_range",
                    score: 0.0,
                    message: "no air or bone values".to_string(),
                },
            ],
            confidence: 0.5,
            valid: false,
            scan_type: ScanType::Unknown,
        };
        let output = format!("{}", CheckReport::new("export.dcm", &report));

        assert!(output.contains("Scan:           export.dcm"));
        assert!(output.contains("Scan type:      unknown"));
        assert!(output.contains("Verdict:        not a plausible dental CBCT"));
        assert!(output.contains("[pass] field_of_view"));
        assert!(output.contains("[fail] intensity_range"));
    }
}
