//! SQL text shared by the SQLite and PostgreSQL backends.
//!
//! Table and column names follow the hospital source tables:
//!
//! | stream  | table               | patient key | timestamp  |
//! |---------|---------------------|-------------|------------|
//! | nursing | `ENSDATA`           | `PATID`     | `PROCDTTM` |
//! | vitals  | `v_ai_hisensnes`    | `PATID`     | `PROCDTTM` |
//! | labs    | `DB_ADM_LABDATA_ER` | `CHMRNO`    | `CHRCPDTM` |
//!
//! Every value is stored as text and timestamps use the 14-digit
//! `YYYYMMDDHHMMSS` layout, so range filters and ordering compare strings.
//! Columns are aliased to lowercase names so row decoding is identical on
//! both databases (PostgreSQL folds unquoted identifiers to lowercase).

/// Placeholder and ordering flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    Postgres,
}

impl Dialect {
    fn param(&self, n: usize) -> String {
        match self {
            Dialect::Sqlite => "?".into(),
            Dialect::Postgres => format!("${n}"),
        }
    }

    /// Absent timestamps sort first on both databases.
    fn ascending(&self, column: &str) -> String {
        match self {
            Dialect::Sqlite => format!("{column} ASC"),
            Dialect::Postgres => format!("{column} ASC NULLS FIRST"),
        }
    }
}

fn stream_query(
    dialect: Dialect,
    columns: &str,
    table: &str,
    key: &str,
    stamp: &str,
    windowed: bool,
) -> String {
    let window_clause = if windowed {
        format!(
            " AND {stamp} >= {} AND {stamp} <= {}",
            dialect.param(2),
            dialect.param(3)
        )
    } else {
        String::new()
    };
    format!(
        "SELECT {columns} FROM {table} WHERE {key} = {}{window_clause} ORDER BY {}",
        dialect.param(1),
        dialect.ascending(stamp)
    )
}

/// Nursing notes: `stamp, subject, diagnosis`.
pub fn nursing_query(dialect: Dialect, windowed: bool) -> String {
    stream_query(
        dialect,
        "PROCDTTM AS stamp, SUBJECT AS subject, DIAGNOSIS AS diagnosis",
        "ENSDATA",
        "PATID",
        "PROCDTTM",
        windowed,
    )
}

/// Vital signs: `stamp, temperature … gcs_m`.
pub fn vitals_query(dialect: Dialect, windowed: bool) -> String {
    stream_query(
        dialect,
        "PROCDTTM AS stamp, ETEMPUTER AS temperature, EPLUSE AS pulse, \
         EBREATHE AS respiration, EPRESSURE AS systolic, EDIASTOLIC AS diastolic, \
         ESAO2 AS spo2, GCS_E AS gcs_e, GCS_V AS gcs_v, GCS_M AS gcs_m",
        "v_ai_hisensnes",
        "PATID",
        "PROCDTTM",
        windowed,
    )
}

/// Lab results: `stamp, item, value, unit, ref_low, ref_high`.
pub fn labs_query(dialect: Dialect, windowed: bool) -> String {
    stream_query(
        dialect,
        "CHRCPDTM AS stamp, CHHEAD AS item, CHVAL AS value, CHUNIT AS unit, \
         CHNL AS ref_low, CHNH AS ref_high",
        "DB_ADM_LABDATA_ER",
        "CHMRNO",
        "CHRCPDTM",
        windowed,
    )
}

/// Patient directory across all three tables. Every row counts; only
/// 14-character stamps take part in the span.
pub const OVERVIEW_QUERY: &str = "\
SELECT patient_id, \
MIN(CASE WHEN LENGTH(stamp) = 14 THEN stamp END) AS first_record, \
MAX(CASE WHEN LENGTH(stamp) = 14 THEN stamp END) AS last_record, \
COUNT(*) AS record_count FROM ( \
    SELECT PATID AS patient_id, PROCDTTM AS stamp FROM ENSDATA \
    UNION ALL SELECT PATID AS patient_id, PROCDTTM AS stamp FROM v_ai_hisensnes \
    UNION ALL SELECT CHMRNO AS patient_id, CHRCPDTM AS stamp FROM DB_ADM_LABDATA_ER \
) AS records \
WHERE patient_id IS NOT NULL \
GROUP BY patient_id \
ORDER BY record_count DESC, patient_id ASC";

/// Schema statements. Only the columns the summarizer reads are declared;
/// the import pipeline may add more.
pub const SCHEMA: &[(&str, &str)] = &[
    (
        "ENSDATA table",
        "CREATE TABLE IF NOT EXISTS ENSDATA (
            TRINO     TEXT,
            PATID     TEXT,
            VISITDT   TEXT,
            SEQ       TEXT,
            SUBJECT   TEXT,
            PROCDTTM  TEXT,
            DIAGNOSIS TEXT
        )",
    ),
    (
        "v_ai_hisensnes table",
        "CREATE TABLE IF NOT EXISTS v_ai_hisensnes (
            TRINO      TEXT,
            PATID      TEXT,
            PROCDTTM   TEXT,
            ETEMPUTER  TEXT,
            EPLUSE     TEXT,
            EBREATHE   TEXT,
            EPRESSURE  TEXT,
            EDIASTOLIC TEXT,
            ESAO2      TEXT,
            GCS_E      TEXT,
            GCS_V      TEXT,
            GCS_M      TEXT
        )",
    ),
    (
        "DB_ADM_LABDATA_ER table",
        "CREATE TABLE IF NOT EXISTS DB_ADM_LABDATA_ER (
            CHAD1CASENO TEXT,
            CHMRNO      TEXT,
            CHRCPDTM    TEXT,
            CHITEMNO    TEXT,
            CHHEAD      TEXT,
            CHVAL       TEXT,
            CHUNIT      TEXT,
            CHNL        TEXT,
            CHNH        TEXT
        )",
    ),
    (
        "nursing index",
        "CREATE INDEX IF NOT EXISTS idx_ensdata_patid_time ON ENSDATA(PATID, PROCDTTM)",
    ),
    (
        "vitals index",
        "CREATE INDEX IF NOT EXISTS idx_hisensnes_patid_time ON v_ai_hisensnes(PATID, PROCDTTM)",
    ),
    (
        "labs index",
        "CREATE INDEX IF NOT EXISTS idx_labdata_mrno_time ON DB_ADM_LABDATA_ER(CHMRNO, CHRCPDTM)",
    ),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_query_uses_question_marks() {
        let sql = nursing_query(Dialect::Sqlite, true);
        assert!(sql.contains("PATID = ?"));
        assert!(sql.contains("PROCDTTM >= ? AND PROCDTTM <= ?"));
        assert!(sql.ends_with("ORDER BY PROCDTTM ASC"));
    }

    #[test]
    fn postgres_query_numbers_params_and_puts_nulls_first() {
        let sql = labs_query(Dialect::Postgres, true);
        assert!(sql.contains("CHMRNO = $1"));
        assert!(sql.contains("CHRCPDTM >= $2 AND CHRCPDTM <= $3"));
        assert!(sql.ends_with("ASC NULLS FIRST"));
    }

    #[test]
    fn unwindowed_query_has_single_param() {
        let sql = vitals_query(Dialect::Postgres, false);
        assert!(sql.contains("$1"));
        assert!(!sql.contains("$2"));
    }
}
