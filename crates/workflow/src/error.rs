use edsum_core::error::{ProviderError, StoreError};
use edsum_core::record::PatientId;

/// Outcomes of a rejected or failed workflow action.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// Nothing to summarize for this patient and window.
    #[error("no records found for patient {patient_id}")]
    NoRecords { patient_id: PatientId },

    /// The record store could not be read.
    #[error("record store unavailable: {0}")]
    Unavailable(#[from] StoreError),

    /// The provider failed; the workflow stays Prepared and may retry.
    #[error("summary generation failed: {0}")]
    Generation(#[from] ProviderError),

    /// An action was attempted from a state that does not allow it.
    #[error("'{action}' is not allowed while the workflow is {state}")]
    ContractViolation {
        action: &'static str,
        state: &'static str,
    },
}

impl WorkflowError {
    /// Programming errors, as opposed to operational failures.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, WorkflowError::ContractViolation { .. })
    }
}
