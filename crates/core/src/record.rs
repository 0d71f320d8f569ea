//! Clinical record domain types.
//!
//! Three independent streams are kept per emergency visit: nursing notes,
//! vital signs and lab results. They are gathered into a
//! [`PatientRecordBundle`] whose streams are each sorted ascending by
//! timestamp.
//!
//! No field is mandatory. Source systems routinely leave columns blank, so
//! every value is an `Option` and is rendered as an explicit placeholder
//! further downstream.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Compact timestamp layout used by the source tables (`YYYYMMDDHHMMSS`).
pub const STAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Alternative layouts accepted when parsing operator input.
const ALT_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"];

/// Opaque patient identifier (medical record number).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatientId(pub String);

impl PatientId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PatientId {
    fn from(s: &str) -> Self {
        Self(s.trim().to_string())
    }
}

impl From<String> for PatientId {
    fn from(s: String) -> Self {
        Self(s.trim().to_string())
    }
}

impl std::fmt::Display for PatientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parse a timestamp in the source layout or one of the human layouts.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    NaiveDateTime::parse_from_str(raw, STAMP_FORMAT)
        .ok()
        .or_else(|| {
            ALT_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        })
}

/// Parse a stored cell, accepting only the 14-digit source layout.
///
/// SQL range filters and ordering compare the raw text, which matches
/// chronological order only for this layout. Any other cell decodes to
/// `None` so windowed and unwindowed reads agree.
pub fn parse_source_stamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.len() != 14 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDateTime::parse_from_str(raw, STAMP_FORMAT).ok()
}

/// Format a timestamp in the source layout (used for SQL range bounds).
pub fn format_stamp(ts: &NaiveDateTime) -> String {
    ts.format(STAMP_FORMAT).to_string()
}

/// An inclusive `[start, end]` timestamp range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl TimeWindow {
    /// Build a window. `start` must not be after `end`.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self, String> {
        if start > end {
            return Err(format!("Window start {start} is after end {end}"));
        }
        Ok(Self { start, end })
    }

    /// Parse both bounds with [`parse_timestamp`].
    pub fn parse(start: &str, end: &str) -> Result<Self, String> {
        let start_ts =
            parse_timestamp(start).ok_or_else(|| format!("Invalid window start: {start}"))?;
        let end_ts = parse_timestamp(end).ok_or_else(|| format!("Invalid window end: {end}"))?;
        Self::new(start_ts, end_ts)
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    /// Inclusive on both ends. Entries without a timestamp are never inside.
    pub fn contains(&self, ts: Option<&NaiveDateTime>) -> bool {
        ts.is_some_and(|t| *t >= self.start && *t <= self.end)
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} .. {}",
            self.start.format("%Y-%m-%d %H:%M"),
            self.end.format("%Y-%m-%d %H:%M")
        )
    }
}

/// Anything that carries the timestamp its stream is ordered by.
pub trait Timestamped {
    fn timestamp(&self) -> Option<&NaiveDateTime>;
}

/// A nursing note.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NursingEntry {
    pub timestamp: Option<NaiveDateTime>,
    #[serde(default)]
    pub subject_complaint: Option<String>,
    #[serde(default)]
    pub diagnosis_text: Option<String>,
}

/// One set of vital signs.
///
/// GCS is kept as its three ordinal components; the composite label only
/// exists at presentation time (see [`VitalSign::gcs_label`]).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VitalSign {
    pub timestamp: Option<NaiveDateTime>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub pulse: Option<f64>,
    #[serde(default)]
    pub respiration_rate: Option<f64>,
    #[serde(default)]
    pub systolic_bp: Option<f64>,
    #[serde(default)]
    pub diastolic_bp: Option<f64>,
    #[serde(default)]
    pub spo2: Option<f64>,
    #[serde(default)]
    pub gcs_eye: Option<u8>,
    #[serde(default)]
    pub gcs_verbal: Option<u8>,
    #[serde(default)]
    pub gcs_motor: Option<u8>,
}

impl VitalSign {
    /// Composite `E4V5M6` label. Missing components render as `?`;
    /// `None` when no component was recorded at all.
    pub fn gcs_label(&self) -> Option<String> {
        if self.gcs_eye.is_none() && self.gcs_verbal.is_none() && self.gcs_motor.is_none() {
            return None;
        }
        let part = |v: Option<u8>| v.map_or_else(|| "?".to_string(), |n| n.to_string());
        Some(format!(
            "E{}V{}M{}",
            part(self.gcs_eye),
            part(self.gcs_verbal),
            part(self.gcs_motor)
        ))
    }
}

/// A single lab item result. Values stay textual (`">1000"`, `"positive"`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabResult {
    pub timestamp: Option<NaiveDateTime>,
    #[serde(default)]
    pub item_name: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub reference_low: Option<String>,
    #[serde(default)]
    pub reference_high: Option<String>,
}

impl Timestamped for NursingEntry {
    fn timestamp(&self) -> Option<&NaiveDateTime> {
        self.timestamp.as_ref()
    }
}

impl Timestamped for VitalSign {
    fn timestamp(&self) -> Option<&NaiveDateTime> {
        self.timestamp.as_ref()
    }
}

impl Timestamped for LabResult {
    fn timestamp(&self) -> Option<&NaiveDateTime> {
        self.timestamp.as_ref()
    }
}

/// The three record streams for one patient.
///
/// Each stream is sorted ascending by timestamp (absent timestamps first).
/// Empty streams are valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientRecordBundle {
    #[serde(default)]
    pub nursing: Vec<NursingEntry>,
    #[serde(default)]
    pub vitals: Vec<VitalSign>,
    #[serde(default)]
    pub labs: Vec<LabResult>,
}

impl PatientRecordBundle {
    pub fn total_len(&self) -> usize {
        self.nursing.len() + self.vitals.len() + self.labs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total_len() == 0
    }

    /// Restore the ordering invariant with a stable sort on every stream.
    pub fn sort(&mut self) {
        sort_stream(&mut self.nursing);
        sort_stream(&mut self.vitals);
        sort_stream(&mut self.labs);
    }

    /// Drop entries that fall outside `window`.
    pub fn retain_within(&mut self, window: &TimeWindow) {
        self.nursing.retain(|e| window.contains(e.timestamp()));
        self.vitals.retain(|e| window.contains(e.timestamp()));
        self.labs.retain(|e| window.contains(e.timestamp()));
    }
}

/// Stable ascending sort by timestamp.
pub fn sort_stream<T: Timestamped>(entries: &mut [T]) {
    entries.sort_by(|a, b| a.timestamp().cmp(&b.timestamp()));
}

/// Whether a stream already satisfies the ordering invariant.
pub fn is_sorted<T: Timestamped>(entries: &[T]) -> bool {
    entries
        .windows(2)
        .all(|pair| pair[0].timestamp() <= pair[1].timestamp())
}

/// Directory row describing a known patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientOverview {
    pub patient_id: PatientId,
    pub first_record: Option<NaiveDateTime>,
    pub last_record: Option<NaiveDateTime>,
    pub record_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(raw: &str) -> NaiveDateTime {
        parse_timestamp(raw).unwrap()
    }

    #[test]
    fn parses_source_and_human_layouts() {
        assert_eq!(ts("20240305081500"), ts("2024-03-05 08:15:00"));
        assert_eq!(ts("2024-03-05 08:15"), ts("20240305081500"));
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn source_cells_accept_only_the_compact_layout() {
        assert_eq!(parse_source_stamp(" 20240305081500 "), Some(ts("20240305081500")));
        assert!(parse_source_stamp("2024-03-05 08:15:00").is_none());
        assert!(parse_source_stamp("202403051").is_none());
        assert!(parse_source_stamp("20241305081500").is_none());
    }

    #[test]
    fn stamp_format_roundtrips() {
        let t = ts("20240305081500");
        assert_eq!(format_stamp(&t), "20240305081500");
    }

    #[test]
    fn window_rejects_inverted_bounds() {
        assert!(TimeWindow::new(ts("20240306000000"), ts("20240305000000")).is_err());
        assert!(TimeWindow::parse("20240305000000", "nonsense").is_err());
    }

    #[test]
    fn window_is_inclusive_and_excludes_missing_timestamps() {
        let w = TimeWindow::parse("20240305080000", "20240305090000").unwrap();
        assert!(w.contains(Some(&ts("20240305080000"))));
        assert!(w.contains(Some(&ts("20240305090000"))));
        assert!(!w.contains(Some(&ts("20240305090001"))));
        assert!(!w.contains(None));
    }

    #[test]
    fn gcs_label_combines_components() {
        let v = VitalSign {
            gcs_eye: Some(4),
            gcs_verbal: Some(5),
            gcs_motor: Some(6),
            ..Default::default()
        };
        assert_eq!(v.gcs_label().as_deref(), Some("E4V5M6"));

        let partial = VitalSign {
            gcs_eye: Some(3),
            ..Default::default()
        };
        assert_eq!(partial.gcs_label().as_deref(), Some("E3V?M?"));
        assert!(VitalSign::default().gcs_label().is_none());
    }

    #[test]
    fn sort_puts_missing_timestamps_first_and_is_stable() {
        let mut bundle = PatientRecordBundle {
            nursing: vec![
                NursingEntry {
                    timestamp: Some(ts("20240305090000")),
                    subject_complaint: Some("b".into()),
                    ..Default::default()
                },
                NursingEntry {
                    timestamp: None,
                    subject_complaint: Some("none".into()),
                    ..Default::default()
                },
                NursingEntry {
                    timestamp: Some(ts("20240305080000")),
                    subject_complaint: Some("a".into()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        bundle.sort();
        let order: Vec<_> = bundle
            .nursing
            .iter()
            .map(|e| e.subject_complaint.clone().unwrap())
            .collect();
        assert_eq!(order, vec!["none", "a", "b"]);
        assert!(is_sorted(&bundle.nursing));
    }

    #[test]
    fn empty_bundle_reports_empty() {
        let bundle = PatientRecordBundle::default();
        assert!(bundle.is_empty());
        assert_eq!(bundle.total_len(), 0);
    }

    #[test]
    fn bundle_deserializes_with_missing_fields() {
        let json = r#"{"labs":[{"timestamp":"2024-03-05T08:00:00","item_name":"WBC"}]}"#;
        let bundle: PatientRecordBundle = serde_json::from_str(json).unwrap();
        assert_eq!(bundle.labs.len(), 1);
        assert!(bundle.labs[0].value.is_none());
        assert!(bundle.nursing.is_empty());
    }
}
