//! Raw row types and text-to-domain conversion for the SQL backends.

use edsum_core::error::StoreError;
use edsum_core::record::{
    LabResult, NursingEntry, PatientId, PatientOverview, VitalSign, parse_source_stamp,
};
use tracing::trace;

/// Normalise a text cell: trimmed, and blank or `(null)` becomes `None`.
pub fn clean(cell: Option<String>) -> Option<String> {
    cell.map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && s != "(null)")
}

fn number(column: &str, cell: Option<String>) -> Option<f64> {
    let raw = clean(cell)?;
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v),
        _ => {
            trace!(column, value = %raw, "Non-numeric value treated as missing");
            None
        }
    }
}

fn ordinal(column: &str, cell: Option<String>) -> Option<u8> {
    let v = number(column, cell)?;
    if (0.0..=u8::MAX as f64).contains(&v) {
        Some(v.round() as u8)
    } else {
        None
    }
}

fn stamp(cell: Option<String>) -> Option<chrono::NaiveDateTime> {
    let raw = clean(cell)?;
    let parsed = parse_source_stamp(&raw);
    if parsed.is_none() {
        trace!(value = %raw, "Unparseable timestamp treated as missing");
    }
    parsed
}

#[derive(Debug, sqlx::FromRow)]
pub struct NursingRow {
    pub stamp: Option<String>,
    pub subject: Option<String>,
    pub diagnosis: Option<String>,
}

impl From<NursingRow> for NursingEntry {
    fn from(row: NursingRow) -> Self {
        NursingEntry {
            timestamp: stamp(row.stamp),
            subject_complaint: clean(row.subject),
            diagnosis_text: clean(row.diagnosis),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct VitalRow {
    pub stamp: Option<String>,
    pub temperature: Option<String>,
    pub pulse: Option<String>,
    pub respiration: Option<String>,
    pub systolic: Option<String>,
    pub diastolic: Option<String>,
    pub spo2: Option<String>,
    pub gcs_e: Option<String>,
    pub gcs_v: Option<String>,
    pub gcs_m: Option<String>,
}

impl From<VitalRow> for VitalSign {
    fn from(row: VitalRow) -> Self {
        VitalSign {
            timestamp: stamp(row.stamp),
            temperature: number("ETEMPUTER", row.temperature),
            pulse: number("EPLUSE", row.pulse),
            respiration_rate: number("EBREATHE", row.respiration),
            systolic_bp: number("EPRESSURE", row.systolic),
            diastolic_bp: number("EDIASTOLIC", row.diastolic),
            spo2: number("ESAO2", row.spo2),
            gcs_eye: ordinal("GCS_E", row.gcs_e),
            gcs_verbal: ordinal("GCS_V", row.gcs_v),
            gcs_motor: ordinal("GCS_M", row.gcs_m),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct LabRow {
    pub stamp: Option<String>,
    pub item: Option<String>,
    pub value: Option<String>,
    pub unit: Option<String>,
    pub ref_low: Option<String>,
    pub ref_high: Option<String>,
}

impl From<LabRow> for LabResult {
    fn from(row: LabRow) -> Self {
        LabResult {
            timestamp: stamp(row.stamp),
            item_name: clean(row.item),
            value: clean(row.value),
            unit: clean(row.unit),
            reference_low: clean(row.ref_low),
            reference_high: clean(row.ref_high),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct OverviewRow {
    pub patient_id: String,
    pub first_record: Option<String>,
    pub last_record: Option<String>,
    pub record_count: i64,
}

impl From<OverviewRow> for PatientOverview {
    fn from(row: OverviewRow) -> Self {
        PatientOverview {
            patient_id: PatientId::from(row.patient_id),
            first_record: stamp(row.first_record),
            last_record: stamp(row.last_record),
            record_count: row.record_count.max(0) as u64,
        }
    }
}

/// Classify a driver error. Connection-level failures mean the store is
/// unreachable; everything else is a failed query.
pub fn map_sqlx_error(context: &str, e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => StoreError::Unavailable(format!("{context}: {e}")),
        other => StoreError::QueryFailed(format!("{context}: {other}")),
    }
}
