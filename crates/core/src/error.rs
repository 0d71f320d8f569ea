//! Error types for the EDSum domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context (storage, generation) has its own error enum which
//! folds into the top-level [`Error`].

use thiserror::Error;

use crate::record::PatientId;

/// The top-level error type for record aggregation and summary generation.
#[derive(Debug, Error)]
pub enum Error {
    // --- Aggregation ---
    #[error("No records found for patient {patient_id} in the requested window")]
    NotFound { patient_id: PatientId },

    // --- Storage errors ---
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

impl Error {
    /// Whether the error means a collaborator (store or provider) could not
    /// be reached. These are surfaced verbatim and never retried internally.
    pub fn is_unavailable(&self) -> bool {
        match self {
            Error::Store(_) => true,
            Error::Provider(e) => e.is_unavailable(),
            Error::NotFound { .. } => false,
        }
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Record store unavailable: {0}")]
    Unavailable(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl ProviderError {
    /// Network-level failures, as opposed to the provider answering with an error.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, ProviderError::Network(_) | ProviderError::Timeout(_))
    }
}
