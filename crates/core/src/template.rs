//! Instruction selection vocabulary: template kind, presentation style and
//! focus areas.

use serde::{Deserialize, Serialize};

/// Content template. Each kind maps to a fixed output skeleton.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    /// Three free-form sections.
    #[default]
    General,
    /// Subjective / Objective / Assessment / Plan.
    Soap,
    /// Identity / Situation / Background / Assessment / Recommendation handoff.
    Isbar,
    /// Five numbered items for a specialist, abnormal values only.
    Consult,
    /// Transfer or discharge summary ending in the condition at departure.
    Discharge,
}

impl TemplateKind {
    pub const ALL: [TemplateKind; 5] = [
        TemplateKind::General,
        TemplateKind::Soap,
        TemplateKind::Isbar,
        TemplateKind::Consult,
        TemplateKind::Discharge,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateKind::General => "general",
            TemplateKind::Soap => "soap",
            TemplateKind::Isbar => "isbar",
            TemplateKind::Consult => "consult",
            TemplateKind::Discharge => "discharge",
        }
    }

    /// Human-readable label for menus and headings.
    pub fn label(&self) -> &'static str {
        match self {
            TemplateKind::General => "General summary",
            TemplateKind::Soap => "SOAP nursing note",
            TemplateKind::Isbar => "ISBAR handoff",
            TemplateKind::Consult => "Specialist consultation",
            TemplateKind::Discharge => "Discharge / transfer summary",
        }
    }
}

impl std::fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TemplateKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TemplateKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!("Unknown template '{s}' (expected general, soap, isbar, consult or discharge)")
            })
    }
}

/// Presentation style. Exactly one is active for any instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StyleMode {
    #[default]
    Bulleted,
    Narrative,
}

impl StyleMode {
    pub const ALL: [StyleMode; 2] = [StyleMode::Bulleted, StyleMode::Narrative];

    pub fn as_str(&self) -> &'static str {
        match self {
            StyleMode::Bulleted => "bulleted",
            StyleMode::Narrative => "narrative",
        }
    }
}

impl std::fmt::Display for StyleMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StyleMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StyleMode::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown style '{s}' (expected bulleted or narrative)"))
    }
}

/// Clinically meaningful emphasis topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusArea {
    VitalTrends,
    AbnormalLabs,
    Interventions,
    SubjectiveComplaint,
    LinesDrains,
    Consciousness,
}

impl FocusArea {
    pub const ALL: [FocusArea; 6] = [
        FocusArea::VitalTrends,
        FocusArea::AbnormalLabs,
        FocusArea::Interventions,
        FocusArea::SubjectiveComplaint,
        FocusArea::LinesDrains,
        FocusArea::Consciousness,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FocusArea::VitalTrends => "vital_trends",
            FocusArea::AbnormalLabs => "abnormal_labs",
            FocusArea::Interventions => "interventions",
            FocusArea::SubjectiveComplaint => "subjective_complaint",
            FocusArea::LinesDrains => "lines_drains",
            FocusArea::Consciousness => "consciousness",
        }
    }

    /// Wording used inside the focus directive.
    pub fn description(&self) -> &'static str {
        match self {
            FocusArea::VitalTrends => "Vital-sign trends (direction and turning points over time)",
            FocusArea::AbnormalLabs => "Abnormal lab values (each with value, unit and time)",
            FocusArea::Interventions => {
                "Interventions given and the patient's response to each"
            }
            FocusArea::SubjectiveComplaint => "The patient's subjective complaint and its evolution",
            FocusArea::LinesDrains => "Lines, drains and tubes in place",
            FocusArea::Consciousness => "Level of consciousness (GCS) and its changes",
        }
    }
}

impl std::fmt::Display for FocusArea {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FocusArea {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('-', "_");
        FocusArea::ALL
            .into_iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| format!("Unknown focus area '{s}'"))
    }
}

/// Parse a comma-separated focus list, keeping order and duplicates.
/// An empty string yields an empty selection.
pub fn parse_focus_list(raw: &str) -> Result<Vec<FocusArea>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_kind_parses_case_insensitively() {
        assert_eq!("SOAP".parse::<TemplateKind>().unwrap(), TemplateKind::Soap);
        assert_eq!(" isbar ".parse::<TemplateKind>().unwrap(), TemplateKind::Isbar);
        assert!("handoff".parse::<TemplateKind>().is_err());
    }

    #[test]
    fn display_matches_serde_names() {
        for kind in TemplateKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{kind}\""));
        }
        for area in FocusArea::ALL {
            let json = serde_json::to_string(&area).unwrap();
            assert_eq!(json, format!("\"{area}\""));
        }
    }

    #[test]
    fn focus_list_keeps_order_and_duplicates() {
        let list = parse_focus_list("abnormal_labs, vital-trends,abnormal_labs").unwrap();
        assert_eq!(
            list,
            vec![
                FocusArea::AbnormalLabs,
                FocusArea::VitalTrends,
                FocusArea::AbnormalLabs
            ]
        );
        assert!(parse_focus_list("").unwrap().is_empty());
        assert!(parse_focus_list("vital_trends,bogus").is_err());
    }

    #[test]
    fn style_defaults_to_bulleted() {
        assert_eq!(StyleMode::default(), StyleMode::Bulleted);
        assert_eq!("Narrative".parse::<StyleMode>().unwrap(), StyleMode::Narrative);
    }
}
