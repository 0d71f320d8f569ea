//! Per-stream truncation to the most recent entries.

use edsum_config::LimitsConfig;
use edsum_core::record::PatientRecordBundle;
use serde::{Deserialize, Serialize};

/// Maximum entries kept per stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowCaps {
    pub nursing: usize,
    pub vitals: usize,
    pub labs: usize,
}

impl Default for WindowCaps {
    fn default() -> Self {
        Self {
            nursing: 25,
            vitals: 25,
            labs: 40,
        }
    }
}

impl From<&LimitsConfig> for WindowCaps {
    fn from(limits: &LimitsConfig) -> Self {
        Self {
            nursing: limits.nursing,
            vitals: limits.vitals,
            labs: limits.labs,
        }
    }
}

/// Keep the last `cap` entries of an ascending stream.
pub fn keep_latest<T>(mut entries: Vec<T>, cap: usize) -> Vec<T> {
    if entries.len() > cap {
        let excess = entries.len() - cap;
        entries.drain(..excess);
    }
    entries
}

/// Apply `caps` to every stream of the bundle.
pub fn truncate(bundle: PatientRecordBundle, caps: &WindowCaps) -> PatientRecordBundle {
    PatientRecordBundle {
        nursing: keep_latest(bundle.nursing, caps.nursing),
        vitals: keep_latest(bundle.vitals, caps.vitals),
        labs: keep_latest(bundle.labs, caps.labs),
    }
}
