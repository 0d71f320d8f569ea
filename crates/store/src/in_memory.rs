//! In-memory store — useful for testing, demos and fixture-driven sessions.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use edsum_core::error::StoreError;
use edsum_core::record::{
    LabResult, NursingEntry, PatientId, PatientOverview, PatientRecordBundle, TimeWindow,
    Timestamped, VitalSign, sort_stream,
};
use edsum_core::store::RecordStore;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::info;

/// A store that keeps every patient's bundle in a `HashMap`.
///
/// Fixture files are JSON objects keyed by patient id:
///
/// ```json
/// { "P001": { "nursing": [...], "vitals": [...], "labs": [...] } }
/// ```
pub struct InMemoryStore {
    patients: Arc<RwLock<HashMap<PatientId, PatientRecordBundle>>>,
    offline: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            patients: Arc::new(RwLock::new(HashMap::new())),
            offline: AtomicBool::new(false),
        }
    }

    /// Build a store from a JSON fixture string.
    pub fn from_json(raw: &str) -> Result<Self, StoreError> {
        let parsed: HashMap<String, PatientRecordBundle> = serde_json::from_str(raw)
            .map_err(|e| StoreError::QueryFailed(format!("Invalid fixture JSON: {e}")))?;
        let patients = parsed
            .into_iter()
            .map(|(id, bundle)| (PatientId::from(id), bundle))
            .collect();
        Ok(Self {
            patients: Arc::new(RwLock::new(patients)),
            offline: AtomicBool::new(false),
        })
    }

    /// Build a store from a JSON fixture file.
    pub fn from_file(path: &Path) -> Result<Self, StoreError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            StoreError::Unavailable(format!("Cannot read fixture {}: {e}", path.display()))
        })?;
        let store = Self::from_json(&raw)?;
        info!(path = %path.display(), "In-memory store loaded from fixture");
        Ok(store)
    }

    /// Add or replace a patient's records.
    pub async fn insert(&self, patient: impl Into<PatientId>, bundle: PatientRecordBundle) {
        self.patients.write().await.insert(patient.into(), bundle);
    }

    /// Simulate an outage: every read fails with `Unavailable` while set.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory store is offline".into()));
        }
        Ok(())
    }

    async fn select<T, F>(
        &self,
        patient: &PatientId,
        window: Option<&TimeWindow>,
        stream: F,
    ) -> Result<Vec<T>, StoreError>
    where
        T: Timestamped + Clone,
        F: Fn(&PatientRecordBundle) -> &Vec<T>,
    {
        self.ensure_online()?;
        let patients = self.patients.read().await;
        let mut entries: Vec<T> = patients
            .get(patient)
            .map(|bundle| {
                stream(bundle)
                    .iter()
                    .filter(|e| window.is_none_or(|w| w.contains(e.timestamp())))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        sort_stream(&mut entries);
        Ok(entries)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Earliest and latest timestamp across all three streams.
fn span_of(bundle: &PatientRecordBundle) -> (Option<NaiveDateTime>, Option<NaiveDateTime>) {
    let stamps = bundle
        .nursing
        .iter()
        .filter_map(|e| e.timestamp())
        .chain(bundle.vitals.iter().filter_map(|e| e.timestamp()))
        .chain(bundle.labs.iter().filter_map(|e| e.timestamp()));
    (stamps.clone().min().copied(), stamps.max().copied())
}

#[async_trait]
impl RecordStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn fetch_nursing(
        &self,
        patient: &PatientId,
        window: Option<&TimeWindow>,
    ) -> Result<Vec<NursingEntry>, StoreError> {
        self.select(patient, window, |b| &b.nursing).await
    }

    async fn fetch_vitals(
        &self,
        patient: &PatientId,
        window: Option<&TimeWindow>,
    ) -> Result<Vec<VitalSign>, StoreError> {
        self.select(patient, window, |b| &b.vitals).await
    }

    async fn fetch_labs(
        &self,
        patient: &PatientId,
        window: Option<&TimeWindow>,
    ) -> Result<Vec<LabResult>, StoreError> {
        self.select(patient, window, |b| &b.labs).await
    }

    async fn list_patients(&self) -> Result<Vec<PatientOverview>, StoreError> {
        self.ensure_online()?;
        let patients = self.patients.read().await;
        let mut overview: Vec<PatientOverview> = patients
            .iter()
            .filter(|(_, bundle)| !bundle.is_empty())
            .map(|(id, bundle)| {
                let (first_record, last_record) = span_of(bundle);
                PatientOverview {
                    patient_id: id.clone(),
                    first_record,
                    last_record,
                    record_count: bundle.total_len() as u64,
                }
            })
            .collect();
        overview.sort_by(|a, b| {
            b.record_count
                .cmp(&a.record_count)
                .then_with(|| a.patient_id.cmp(&b.patient_id))
        });
        Ok(overview)
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        Ok(!self.offline.load(Ordering::SeqCst))
    }
}
