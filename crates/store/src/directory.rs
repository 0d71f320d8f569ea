//! Cached patient directory.
//!
//! Listing patients aggregates over every source table, which is expensive on
//! the hospital database. The directory keeps the last listing for a short
//! TTL (60 seconds by default) and serves it to every caller until it expires.

use edsum_core::error::StoreError;
use edsum_core::record::PatientOverview;
use edsum_core::store::RecordStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

struct Cached {
    fetched_at: Instant,
    patients: Arc<Vec<PatientOverview>>,
}

/// TTL-cached view over [`RecordStore::list_patients`].
pub struct PatientDirectory {
    store: Arc<dyn RecordStore>,
    ttl: Duration,
    cache: RwLock<Option<Cached>>,
}

impl PatientDirectory {
    pub fn new(store: Arc<dyn RecordStore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            cache: RwLock::new(None),
        }
    }

    /// The current patient listing, refreshed from the store when stale.
    pub async fn list(&self) -> Result<Arc<Vec<PatientOverview>>, StoreError> {
        if let Some(cached) = self.cache.read().await.as_ref() {
            if cached.fetched_at.elapsed() < self.ttl {
                return Ok(Arc::clone(&cached.patients));
            }
        }

        let mut slot = self.cache.write().await;
        // Another caller may have refreshed while we waited for the lock.
        if let Some(cached) = slot.as_ref() {
            if cached.fetched_at.elapsed() < self.ttl {
                return Ok(Arc::clone(&cached.patients));
            }
        }

        let patients = Arc::new(self.store.list_patients().await?);
        debug!(
            store = self.store.name(),
            patients = patients.len(),
            "Patient directory refreshed"
        );
        *slot = Some(Cached {
            fetched_at: Instant::now(),
            patients: Arc::clone(&patients),
        });
        Ok(patients)
    }

    /// Drop the cached listing so the next call hits the store.
    pub async fn invalidate(&self) {
        *self.cache.write().await = None;
    }
}
