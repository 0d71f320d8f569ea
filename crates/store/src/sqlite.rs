//! SQLite record store.
//!
//! Reads the three source tables from a local SQLite file that mirrors the
//! hospital's emergency-department views. Tables and indexes are created on
//! open if missing, so an empty file is a valid (empty) store.

use crate::rows::{LabRow, NursingRow, OverviewRow, VitalRow, map_sqlx_error};
use crate::sql::{self, Dialect};
use async_trait::async_trait;
use edsum_core::error::StoreError;
use edsum_core::record::{
    LabResult, NursingEntry, PatientId, PatientOverview, TimeWindow, Timestamped, VitalSign,
    format_stamp, sort_stream,
};
use edsum_core::store::RecordStore;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

/// SQLite-backed clinical record store.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) a SQLite database.
    ///
    /// Pass `":memory:"` for an in-process ephemeral database (useful for tests).
    pub async fn new(
        path: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| StoreError::Unavailable(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .acquire_timeout(acquire_timeout)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Unavailable(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite record store initialized at {path}");
        Ok(store)
    }

    /// Create from an existing pool (useful for testing).
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Create the source tables and their lookup indexes.
    async fn run_migrations(&self) -> Result<(), StoreError> {
        for (label, statement) in sql::SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::MigrationFailed(format!("{label}: {e}")))?;
        }
        debug!("SQLite schema ready");
        Ok(())
    }

    async fn fetch<R, T>(
        &self,
        query: String,
        context: &str,
        patient: &PatientId,
        window: Option<&TimeWindow>,
    ) -> Result<Vec<T>, StoreError>
    where
        R: for<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> + Send + Unpin,
        T: From<R> + Timestamped,
    {
        let mut q = sqlx::query_as::<_, R>(&query).bind(patient.as_str());
        if let Some(w) = window {
            q = q.bind(format_stamp(&w.start())).bind(format_stamp(&w.end()));
        }
        let rows = q
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(context, e))?;
        debug!(patient = %patient, context, rows = rows.len(), "SQLite fetch");
        let mut entries: Vec<T> = rows
            .into_iter()
            .map(T::from)
            .filter(|e| window.is_none_or(|w| w.contains(e.timestamp())))
            .collect();
        // Cells outside the source layout decode to `None` and sort first.
        sort_stream(&mut entries);
        Ok(entries)
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn fetch_nursing(
        &self,
        patient: &PatientId,
        window: Option<&TimeWindow>,
    ) -> Result<Vec<NursingEntry>, StoreError> {
        let query = sql::nursing_query(Dialect::Sqlite, window.is_some());
        self.fetch::<NursingRow, _>(query, "nursing", patient, window)
            .await
    }

    async fn fetch_vitals(
        &self,
        patient: &PatientId,
        window: Option<&TimeWindow>,
    ) -> Result<Vec<VitalSign>, StoreError> {
        let query = sql::vitals_query(Dialect::Sqlite, window.is_some());
        self.fetch::<VitalRow, _>(query, "vitals", patient, window)
            .await
    }

    async fn fetch_labs(
        &self,
        patient: &PatientId,
        window: Option<&TimeWindow>,
    ) -> Result<Vec<LabResult>, StoreError> {
        let query = sql::labs_query(Dialect::Sqlite, window.is_some());
        self.fetch::<LabRow, _>(query, "labs", patient, window).await
    }

    async fn list_patients(&self) -> Result<Vec<PatientOverview>, StoreError> {
        let rows = sqlx::query_as::<_, OverviewRow>(sql::OVERVIEW_QUERY)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("patient directory", e))?;
        Ok(rows.into_iter().map(PatientOverview::from).collect())
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| true)
            .map_err(|e| map_sqlx_error("health check", e))
    }
}
