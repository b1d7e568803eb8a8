use std::fmt;

/// Number of distinct tissue labels (excluding unlabeled 0)
pub const TISSUE_COUNT: usize = 13;

/// Dental tissue classes assigned by the segmentation cascade
///
/// Each tissue carries a stable numeric label (1..=13) used in the label map;
/// 0 always means unlabeled. Display colors come from the viewer palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
#[cfg_attr(feature = "json", serde(rename_all = "snake_case"))]
pub enum Tissue {
    Enamel,
    Dentin,
    Pulp,
    Cementum,
    CorticalBone,
    TrabecularBone,
    AlveolarBone,
    NerveCanal,
    PdlSpace,
    SoftTissue,
    Gingiva,
    Caries,
    PeriapicalLesion,
}

impl Tissue {
    /// All tissues in cascade (and label) order
    pub const ALL: [Tissue; TISSUE_COUNT] = [
        Tissue::Enamel,
        Tissue::Dentin,
        Tissue::Pulp,
        Tissue::Cementum,
        Tissue::CorticalBone,
        Tissue::TrabecularBone,
        Tissue::AlveolarBone,
        Tissue::NerveCanal,
        Tissue::PdlSpace,
        Tissue::SoftTissue,
        Tissue::Gingiva,
        Tissue::Caries,
        Tissue::PeriapicalLesion,
    ];

    /// Numeric label written into the label map
    pub fn label(&self) -> u8 {
        match self {
            Tissue::Enamel => 1,
            Tissue::Dentin => 2,
            Tissue::Pulp => 3,
            Tissue::Cementum => 4,
            Tissue::CorticalBone => 5,
            Tissue::TrabecularBone => 6,
            Tissue::AlveolarBone => 7,
            Tissue::NerveCanal => 8,
            Tissue::PdlSpace => 9,
            Tissue::SoftTissue => 10,
            Tissue::Gingiva => 11,
            Tissue::Caries => 12,
            Tissue::PeriapicalLesion => 13,
        }
    }

    /// Looks up a tissue by its numeric label
    pub fn from_label(label: u8) -> Option<Tissue> {
        match label {
            1 => Some(Tissue::Enamel),
            2 => Some(Tissue::Dentin),
            3 => Some(Tissue::Pulp),
            4 => Some(Tissue::Cementum),
            5 => Some(Tissue::CorticalBone),
            6 => Some(Tissue::TrabecularBone),
            7 => Some(Tissue::AlveolarBone),
            8 => Some(Tissue::NerveCanal),
            9 => Some(Tissue::PdlSpace),
            10 => Some(Tissue::SoftTissue),
            11 => Some(Tissue::Gingiva),
            12 => Some(Tissue::Caries),
            13 => Some(Tissue::PeriapicalLesion),
            _ => None,
        }
    }

    /// Returns snake_case name used in APIs and reports
    pub fn name(&self) -> &'static str {
        match self {
            Tissue::Enamel => "enamel",
            Tissue::Dentin => "dentin",
            Tissue::Pulp => "pulp",
            Tissue::Cementum => "cementum",
            Tissue::CorticalBone => "cortical_bone",
            Tissue::TrabecularBone => "trabecular_bone",
            Tissue::AlveolarBone => "alveolar_bone",
            Tissue::NerveCanal => "nerve_canal",
            Tissue::PdlSpace => "pdl_space",
            Tissue::SoftTissue => "soft_tissue",
            Tissue::Gingiva => "gingiva",
            Tissue::Caries => "caries",
            Tissue::PeriapicalLesion => "periapical_lesion",
        }
    }

    /// Display color for viewers, as a hex string
    pub fn color(&self) -> &'static str {
        match self {
            Tissue::Enamel => "#E8F4F8",
            Tissue::Dentin => "#FFF8DC",
            Tissue::Pulp => "#FF6B6B",
            Tissue::Cementum => "#F0E6D2",
            Tissue::CorticalBone => "#F5F5DC",
            Tissue::TrabecularBone => "#E6E0C8",
            Tissue::AlveolarBone => "#DCD2B8",
            Tissue::NerveCanal => "#FFD700",
            Tissue::PdlSpace => "#C8A2C8",
            Tissue::SoftTissue => "#FFB6C1",
            Tissue::Gingiva => "#FF9E9E",
            Tissue::Caries => "#8B4513",
            Tissue::PeriapicalLesion => "#9932CC",
        }
    }

    /// Short clinical description for reports
    pub fn description(&self) -> &'static str {
        match self {
            Tissue::Enamel => "Hard outer layer of the tooth crown",
            Tissue::Dentin => "Main body of the tooth beneath the enamel",
            Tissue::Pulp => "Soft tissue chamber and root canals",
            Tissue::Cementum => "Thin mineralized layer covering the root surface",
            Tissue::CorticalBone => "Dense outer bone plate",
            Tissue::TrabecularBone => "Spongy inner bone",
            Tissue::AlveolarBone => "Tooth-supporting bone of the jaw",
            Tissue::NerveCanal => "Inferior alveolar nerve canal",
            Tissue::PdlSpace => "Periodontal ligament space around the root",
            Tissue::SoftTissue => "Non-mineralized oral soft tissue",
            Tissue::Gingiva => "Gum tissue adjacent to the teeth",
            Tissue::Caries => "Demineralized carious lesion",
            Tissue::PeriapicalLesion => "Radiolucent lesion at the root apex",
        }
    }

    /// Whether the label belongs to the tooth proper (enamel or dentin)
    pub fn is_tooth(&self) -> bool {
        matches!(self, Tissue::Enamel | Tissue::Dentin)
    }

    /// Whether the label is a bone class
    pub fn is_bone(&self) -> bool {
        matches!(
            self,
            Tissue::CorticalBone | Tissue::TrabecularBone | Tissue::AlveolarBone
        )
    }

    /// Whether the label is a pathology finding
    pub fn is_pathology(&self) -> bool {
        matches!(self, Tissue::Caries | Tissue::PeriapicalLesion)
    }

    /// Parses a tissue from its API name (case-insensitive, common aliases accepted)
    #[allow(clippy::should_implement_trait)]
    pub fn from_name(s: &str) -> Option<Tissue> {
        let s_lower = s.to_lowercase();
        match s_lower.as_str() {
            "enamel" => Some(Tissue::Enamel),
            "dentin" | "dentine" => Some(Tissue::Dentin),
            "pulp" => Some(Tissue::Pulp),
            "cementum" => Some(Tissue::Cementum),
            "cortical_bone" | "cortical" => Some(Tissue::CorticalBone),
            "trabecular_bone" | "trabecular" | "cancellous_bone" => Some(Tissue::TrabecularBone),
            "alveolar_bone" | "alveolar" => Some(Tissue::AlveolarBone),
            "nerve_canal" | "nerve" | "iac" => Some(Tissue::NerveCanal),
            "pdl_space" | "pdl" | "periodontal_ligament" => Some(Tissue::PdlSpace),
            "soft_tissue" | "soft" => Some(Tissue::SoftTissue),
            "gingiva" | "gum" => Some(Tissue::Gingiva),
            "caries" | "cavity" => Some(Tissue::Caries),
            "periapical_lesion" | "periapical" => Some(Tissue::PeriapicalLesion),
            _ => None,
        }
    }
}

impl fmt::Display for Tissue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Per-segment summary statistics
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct SegmentInfo {
    /// Tissue class
    pub tissue: Tissue,
    /// Number of labeled voxels
    pub voxel_count: usize,
    /// Physical volume in cubic millimeters
    pub volume_mm3: f32,
    /// Mean normalized intensity of labeled voxels
    pub mean_intensity: f32,
}

impl SegmentInfo {
    /// Numeric label of the segment
    pub fn label(&self) -> u8 {
        self.tissue.label()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_dense_and_ordered() {
        for (i, tissue) in Tissue::ALL.iter().enumerate() {
            assert_eq!(tissue.label() as usize, i + 1);
            assert_eq!(Tissue::from_label(tissue.label()), Some(*tissue));
        }
        assert_eq!(Tissue::from_label(0), None);
        assert_eq!(Tissue::from_label(14), None);
    }

    #[test]
    fn test_from_name_roundtrip() {
        for tissue in Tissue::ALL {
            assert_eq!(Tissue::from_name(tissue.name()), Some(tissue));
        }
    }

    #[test]
    fn test_from_name_aliases() {
        assert_eq!(Tissue::from_name("PDL"), Some(Tissue::PdlSpace));
        assert_eq!(Tissue::from_name("nerve"), Some(Tissue::NerveCanal));
        assert_eq!(Tissue::from_name("Cortical"), Some(Tissue::CorticalBone));
        assert_eq!(Tissue::from_name("something_else"), None);
    }

    #[test]
    fn test_group_predicates() {
        assert!(Tissue::Enamel.is_tooth());
        assert!(Tissue::Dentin.is_tooth());
        assert!(!Tissue::Pulp.is_tooth());
        assert!(Tissue::AlveolarBone.is_bone());
        assert!(Tissue::Caries.is_pathology());
        assert!(!Tissue::Gingiva.is_pathology());
    }

    #[test]
    fn test_display_uses_api_name() {
        assert_eq!(format!("{}", Tissue::PdlSpace), "pdl_space");
    }
}
