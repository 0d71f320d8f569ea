//! Record aggregation — gathers the three streams for one patient.

use edsum_core::error::{Error, Result};
use edsum_core::record::{PatientId, PatientRecordBundle, TimeWindow};
use edsum_core::store::RecordStore;
use std::sync::Arc;
use tracing::{info, warn};

/// Reads nursing, vital-sign and lab streams from a [`RecordStore`].
#[derive(Clone)]
pub struct RecordAggregator {
    store: Arc<dyn RecordStore>,
}

impl RecordAggregator {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Fetch all three streams concurrently and assemble a sorted bundle.
    ///
    /// Fails with [`Error::NotFound`] when every stream is empty after the
    /// window is applied, and with [`Error::Store`] when any read fails.
    pub async fn aggregate(
        &self,
        patient: &PatientId,
        window: Option<&TimeWindow>,
    ) -> Result<PatientRecordBundle> {
        let (nursing, vitals, labs) = tokio::try_join!(
            self.store.fetch_nursing(patient, window),
            self.store.fetch_vitals(patient, window),
            self.store.fetch_labs(patient, window),
        )
        .inspect_err(|e| {
            warn!(patient = %patient, store = self.store.name(), error = %e, "Record fetch failed");
        })?;

        let mut bundle = PatientRecordBundle {
            nursing,
            vitals,
            labs,
        };
        if let Some(w) = window {
            bundle.retain_within(w);
        }
        bundle.sort();

        info!(
            patient = %patient,
            nursing = bundle.nursing.len(),
            vitals = bundle.vitals.len(),
            labs = bundle.labs.len(),
            window = %window.map_or_else(|| "unbounded".to_string(), |w| w.to_string()),
            "Records aggregated"
        );

        if bundle.is_empty() {
            return Err(Error::NotFound {
                patient_id: patient.clone(),
            });
        }

        let bedside = bundle.nursing.len() + bundle.vitals.len();
        if bundle.labs.is_empty() && bedside > 0 {
            warn!(
                patient = %patient,
                "No lab results under this id; lab records are keyed by medical record number, which may differ"
            );
        } else if bedside == 0 && !bundle.labs.is_empty() {
            warn!(
                patient = %patient,
                "Only lab results found; nursing and vital-sign records are keyed by patient id, which may differ"
            );
        }

        Ok(bundle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edsum_core::error::StoreError;
    use edsum_core::record::{LabResult, NursingEntry, VitalSign, is_sorted, parse_timestamp};
    use edsum_store::InMemoryStore;

    fn note(raw_ts: &str) -> NursingEntry {
        NursingEntry {
            timestamp: parse_timestamp(raw_ts),
            subject_complaint: Some("note".into()),
            diagnosis_text: None,
        }
    }

    fn vital(raw_ts: &str) -> VitalSign {
        VitalSign {
            timestamp: parse_timestamp(raw_ts),
            pulse: Some(80.0),
            ..Default::default()
        }
    }

    fn lab(raw_ts: &str) -> LabResult {
        LabResult {
            timestamp: parse_timestamp(raw_ts),
            item_name: Some("Hb".into()),
            value: Some("13.1".into()),
            ..Default::default()
        }
    }

    async fn aggregator_with(
        id: &str,
        bundle: PatientRecordBundle,
    ) -> (Arc<InMemoryStore>, RecordAggregator) {
        let store = Arc::new(InMemoryStore::new());
        store.insert(id, bundle).await;
        let aggregator = RecordAggregator::new(store.clone());
        (store, aggregator)
    }

    #[tokio::test]
    async fn assembles_sorted_bundle() {
        let (_, agg) = aggregator_with(
            "P001",
            PatientRecordBundle {
                nursing: vec![note("20240305100000"), note("20240305080000")],
                vitals: vec![vital("20240305090000")],
                labs: vec![lab("20240305093000")],
            },
        )
        .await;

        let bundle = agg.aggregate(&"P001".into(), None).await.unwrap();
        assert_eq!(bundle.total_len(), 4);
        assert!(is_sorted(&bundle.nursing));
        assert!(is_sorted(&bundle.vitals));
        assert!(is_sorted(&bundle.labs));
    }

    #[tokio::test]
    async fn unknown_patient_is_not_found() {
        let (_, agg) = aggregator_with("P001", PatientRecordBundle::default()).await;
        let err = agg.aggregate(&"P404".into(), None).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { patient_id } if patient_id.as_str() == "P404"));
    }

    #[tokio::test]
    async fn window_excluding_everything_is_not_found() {
        let (_, agg) = aggregator_with(
            "P001",
            PatientRecordBundle {
                nursing: vec![note("20240305080000")],
                labs: vec![lab("20240305090000")],
                ..Default::default()
            },
        )
        .await;

        assert!(agg.aggregate(&"P001".into(), None).await.is_ok());
        let window = TimeWindow::parse("20230101000000", "20230131235959").unwrap();
        let err = agg.aggregate(&"P001".into(), Some(&window)).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn labs_only_patient_is_valid() {
        let (_, agg) = aggregator_with(
            "MR77",
            PatientRecordBundle {
                labs: vec![lab("20240305090000")],
                ..Default::default()
            },
        )
        .await;
        let bundle = agg.aggregate(&"MR77".into(), None).await.unwrap();
        assert!(bundle.nursing.is_empty() && bundle.vitals.is_empty());
        assert_eq!(bundle.labs.len(), 1);
    }

    #[tokio::test]
    async fn window_bounds_are_inclusive() {
        let (_, agg) = aggregator_with(
            "P001",
            PatientRecordBundle {
                nursing: vec![
                    note("20240305075959"),
                    note("20240305080000"),
                    note("20240305120000"),
                    note("20240305120001"),
                ],
                ..Default::default()
            },
        )
        .await;
        let window = TimeWindow::parse("20240305080000", "20240305120000").unwrap();
        let bundle = agg.aggregate(&"P001".into(), Some(&window)).await.unwrap();
        assert_eq!(bundle.nursing.len(), 2);
    }

    #[tokio::test]
    async fn store_outage_is_unavailable() {
        let (store, agg) = aggregator_with(
            "P001",
            PatientRecordBundle {
                nursing: vec![note("20240305080000")],
                ..Default::default()
            },
        )
        .await;
        store.set_offline(true);

        let err = agg.aggregate(&"P001".into(), None).await.unwrap_err();
        assert!(matches!(err, Error::Store(StoreError::Unavailable(_))));
        assert!(err.is_unavailable());
    }
}
