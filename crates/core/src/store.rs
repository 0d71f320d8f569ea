//! RecordStore trait — read-only access to the three clinical record streams.
//!
//! Every fetch returns entries ordered ascending by the stream's own
//! timestamp column and, when a window is given, only entries whose
//! timestamp lies inside it (inclusive).
//!
//! Implementations: SQLite, PostgreSQL, in-memory (for testing and demos).

use async_trait::async_trait;

use crate::error::StoreError;
use crate::record::{LabResult, NursingEntry, PatientId, PatientOverview, TimeWindow, VitalSign};

/// The core RecordStore trait.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// The backend name (e.g., "sqlite", "postgres", "in_memory").
    fn name(&self) -> &str;

    /// Nursing notes for a patient.
    async fn fetch_nursing(
        &self,
        patient: &PatientId,
        window: Option<&TimeWindow>,
    ) -> std::result::Result<Vec<NursingEntry>, StoreError>;

    /// Vital-sign sets for a patient.
    async fn fetch_vitals(
        &self,
        patient: &PatientId,
        window: Option<&TimeWindow>,
    ) -> std::result::Result<Vec<VitalSign>, StoreError>;

    /// Lab item results for a patient.
    async fn fetch_labs(
        &self,
        patient: &PatientId,
        window: Option<&TimeWindow>,
    ) -> std::result::Result<Vec<LabResult>, StoreError>;

    /// All known patients with their record span, most records first.
    async fn list_patients(&self) -> std::result::Result<Vec<PatientOverview>, StoreError>;

    /// Health check — can we reach the store?
    async fn health_check(&self) -> std::result::Result<bool, StoreError> {
        Ok(true)
    }
}
