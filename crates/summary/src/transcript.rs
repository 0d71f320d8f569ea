//! Plain-text rendering of a record bundle for the generator.
//!
//! One section per stream, each headed by its entry count, one line per
//! entry with the timestamp first and fields separated by ` | `. Missing
//! values are written as [`PLACEHOLDER`] so the model never sees a silent gap.

use edsum_core::record::{LabResult, NursingEntry, PatientId, PatientRecordBundle, VitalSign};

/// Rendered in place of any absent value.
pub const PLACEHOLDER: &str = "N/A";

const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M";

fn text(value: Option<&str>) -> &str {
    value.unwrap_or(PLACEHOLDER)
}

fn number(value: Option<f64>) -> String {
    match value {
        Some(v) if v.fract() == 0.0 => format!("{v:.0}"),
        Some(v) => format!("{v}"),
        None => PLACEHOLDER.to_string(),
    }
}

fn stamp(ts: Option<&chrono::NaiveDateTime>) -> String {
    ts.map(|t| t.format(DISPLAY_FORMAT).to_string())
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

fn nursing_line(e: &NursingEntry) -> String {
    format!(
        "- {} | {} | {}",
        stamp(e.timestamp.as_ref()),
        text(e.subject_complaint.as_deref()),
        text(e.diagnosis_text.as_deref())
    )
}

fn vital_line(v: &VitalSign) -> String {
    format!(
        "- {} | T:{} | P:{} | R:{} | BP:{}/{} | SpO2:{} | GCS:{}",
        stamp(v.timestamp.as_ref()),
        number(v.temperature),
        number(v.pulse),
        number(v.respiration_rate),
        number(v.systolic_bp),
        number(v.diastolic_bp),
        number(v.spo2),
        v.gcs_label().as_deref().unwrap_or(PLACEHOLDER)
    )
}

fn lab_line(l: &LabResult) -> String {
    format!(
        "- {} | {} : {} {} (Ref: {}~{})",
        stamp(l.timestamp.as_ref()),
        text(l.item_name.as_deref()),
        text(l.value.as_deref()),
        text(l.unit.as_deref()),
        text(l.reference_low.as_deref()),
        text(l.reference_high.as_deref())
    )
}

fn section<T>(title: &str, entries: &[T], line: fn(&T) -> String) -> Vec<String> {
    let mut lines = vec![String::new(), format!("[{title}] (latest {})", entries.len())];
    lines.extend(entries.iter().map(line));
    lines
}

/// Render the user message for one patient.
pub fn render_transcript(patient: &PatientId, bundle: &PatientRecordBundle) -> String {
    let mut lines = vec![format!(
        "=== Patient ID: {patient} emergency course record (excerpt) ==="
    )];
    lines.extend(section("Nursing notes", &bundle.nursing, nursing_line));
    lines.extend(section("Vital signs", &bundle.vitals, vital_line));
    lines.extend(section("Lab results", &bundle.labs, lab_line));

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use edsum_core::record::parse_timestamp;

    fn bundle() -> PatientRecordBundle {
        PatientRecordBundle {
            nursing: vec![NursingEntry {
                timestamp: parse_timestamp("20240305081500"),
                subject_complaint: Some("chest pain".into()),
                diagnosis_text: None,
            }],
            vitals: vec![VitalSign {
                timestamp: parse_timestamp("20240305082000"),
                temperature: Some(38.2),
                pulse: Some(112.0),
                systolic_bp: Some(88.0),
                diastolic_bp: Some(52.0),
                spo2: Some(94.0),
                gcs_eye: Some(4),
                gcs_verbal: Some(5),
                gcs_motor: Some(6),
                ..Default::default()
            }],
            labs: vec![LabResult {
                timestamp: parse_timestamp("20240305090000"),
                item_name: Some("CRP".into()),
                value: Some(">90".into()),
                unit: Some("mg/L".into()),
                reference_low: Some("0".into()),
                reference_high: Some("5".into()),
            }],
        }
    }

    #[test]
    fn renders_all_sections_with_counts() {
        let out = render_transcript(&"P001".into(), &bundle());
        assert!(out.starts_with("=== Patient ID: P001"));
        assert!(out.contains("[Nursing notes] (latest 1)"));
        assert!(out.contains("[Vital signs] (latest 1)"));
        assert!(out.contains("[Lab results] (latest 1)"));
    }

    #[test]
    fn lines_follow_fixed_field_order() {
        let out = render_transcript(&"P001".into(), &bundle());
        assert!(out.contains("- 2024-03-05 08:15 | chest pain | N/A\n"));
        assert!(out.contains(
            "- 2024-03-05 08:20 | T:38.2 | P:112 | R:N/A | BP:88/52 | SpO2:94 | GCS:E4V5M6\n"
        ));
        assert!(out.contains("- 2024-03-05 09:00 | CRP : >90 mg/L (Ref: 0~5)\n"));
    }

    #[test]
    fn empty_streams_still_have_headers() {
        let out = render_transcript(&"P9".into(), &PatientRecordBundle::default());
        assert!(out.contains("(latest 0)"));
        assert_eq!(out.lines().filter(|l| l.starts_with("- ")).count(), 0);
    }

    #[test]
    fn sections_are_separated_by_blank_lines() {
        let b = PatientRecordBundle {
            nursing: bundle().nursing,
            ..Default::default()
        };
        let out = render_transcript(&"P7".into(), &b);
        assert_eq!(
            out,
            "=== Patient ID: P7 emergency course record (excerpt) ===\n\
             \n\
             [Nursing notes] (latest 1)\n\
             - 2024-03-05 08:15 | chest pain | N/A\n\
             \n\
             [Vital signs] (latest 0)\n\
             \n\
             [Lab results] (latest 0)\n"
        );
    }

    #[test]
    fn missing_timestamp_uses_placeholder() {
        let b = PatientRecordBundle {
            labs: vec![LabResult::default()],
            ..Default::default()
        };
        let out = render_transcript(&"P1".into(), &b);
        assert!(out.contains("- N/A | N/A : N/A N/A (Ref: N/A~N/A)"));
    }
}
