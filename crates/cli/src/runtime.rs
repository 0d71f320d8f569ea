//! Wiring shared by the commands: config, record store and workflow.

use chrono::NaiveDateTime;
use edsum_config::AppConfig;
use edsum_core::record::TimeWindow;
use edsum_core::store::RecordStore;
use edsum_providers::router::{build_from_config, default_model};
use edsum_store::{InMemoryStore, SqliteStore};
use edsum_summary::{
    InstructionComposer, RecordAggregator, Summarizer, TemplateCatalog, WindowCaps,
};
use edsum_workflow::{Selection, SummaryExport, Workflow};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

pub fn load_config() -> CliResult<AppConfig> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}

/// Open the record store named by `[store]`.
pub async fn open_store(config: &AppConfig) -> CliResult<Arc<dyn RecordStore>> {
    let timeout = Duration::from_secs(config.store.acquire_timeout_secs);
    match config.store.backend.as_str() {
        "sqlite" => {
            let path = match &config.store.url {
                Some(url) => url.clone(),
                None => {
                    let path = AppConfig::default_sqlite_path();
                    if let Some(dir) = path.parent() {
                        std::fs::create_dir_all(dir)?;
                    }
                    path.display().to_string()
                }
            };
            let store = SqliteStore::new(&path, config.store.max_connections, timeout).await?;
            Ok(Arc::new(store))
        }
        "postgres" => open_postgres(config, timeout).await,
        "memory" => {
            let store = match &config.store.fixture_path {
                Some(path) => {
                    info!(fixture = %path, "Loading in-memory records");
                    InMemoryStore::from_file(Path::new(path))?
                }
                None => {
                    warn!("In-memory store without a fixture, every lookup will be empty");
                    InMemoryStore::new()
                }
            };
            Ok(Arc::new(store))
        }
        other => Err(format!("Unknown store backend '{other}'").into()),
    }
}

#[cfg(feature = "postgres")]
async fn open_postgres(config: &AppConfig, timeout: Duration) -> CliResult<Arc<dyn RecordStore>> {
    let url = config
        .store
        .url
        .as_deref()
        .ok_or("store.url is required for the postgres backend")?;
    let store =
        edsum_store::PostgresStore::connect(url, config.store.max_connections, timeout).await?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "postgres"))]
async fn open_postgres(
    _config: &AppConfig,
    _timeout: Duration,
) -> CliResult<Arc<dyn RecordStore>> {
    Err("This build has no PostgreSQL support. Rebuild with `--features postgres`.".into())
}

/// Assemble a workflow over `store` using the configured catalog, provider
/// and starting selections.
pub fn build_workflow(config: &AppConfig, store: Arc<dyn RecordStore>) -> CliResult<Workflow> {
    if !config.has_api_key() {
        warn!(
            provider = %config.default_provider,
            "No API key configured, generation will fail unless the provider needs none"
        );
    }

    let catalog = TemplateCatalog::load(config.composer.templates_path.as_deref())?;
    let router = build_from_config(config);
    let provider = router
        .default()
        .ok_or_else(|| format!("Provider '{}' is not configured", config.default_provider))?;
    let summarizer = Summarizer::from_config(provider, default_model(config), config);

    Ok(Workflow::new(
        RecordAggregator::new(store),
        InstructionComposer::new(catalog),
        Arc::new(summarizer),
    )
    .with_selection(Selection::from(&config.workflow)))
}

pub fn caps(config: &AppConfig) -> WindowCaps {
    WindowCaps::from(&config.limits)
}

/// Both bounds or neither.
pub fn parse_window(from: Option<&str>, to: Option<&str>) -> Result<Option<TimeWindow>, String> {
    match (from, to) {
        (Some(start), Some(end)) => TimeWindow::parse(start, end).map(Some),
        (None, None) => Ok(None),
        _ => Err("A time window needs both a start and an end".into()),
    }
}

/// Write `export` into `dir` under its own file name.
pub fn write_export(export: &SummaryExport, dir: &Path) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(&export.file_name);
    std::fs::write(&path, &export.content)?;
    info!(path = %path.display(), "Summary exported");
    Ok(path)
}

pub fn display_time(ts: Option<&NaiveDateTime>) -> String {
    ts.map_or_else(
        || "N/A".to_string(),
        |t| t.format("%Y-%m-%d %H:%M").to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_requires_both_bounds() {
        assert!(parse_window(None, None).unwrap().is_none());
        assert!(parse_window(Some("20240305080000"), None).is_err());

        let window = parse_window(Some("2024-03-05 08:00"), Some("20240305235959"))
            .unwrap()
            .unwrap();
        assert_eq!(window.start().format("%H:%M").to_string(), "08:00");
    }

    #[test]
    fn reversed_window_is_rejected() {
        assert!(parse_window(Some("20240306000000"), Some("20240305000000")).is_err());
    }

    #[test]
    fn export_lands_in_target_directory() {
        let dir = tempfile::tempdir().unwrap();
        let export = SummaryExport::new(&"P001".into(), "Stable.");
        let path = write_export(&export, &dir.path().join("out")).unwrap();
        assert!(path.ends_with("summary_P001.txt"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "Stable.");
    }

    #[test]
    fn missing_time_renders_placeholder() {
        assert_eq!(display_time(None), "N/A");
    }

    #[tokio::test]
    async fn memory_backend_loads_fixture() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = dir.path().join("records.json");
        std::fs::write(
            &fixture,
            r#"{"P001": {"nursing": [{"timestamp": "2024-03-05T08:15:00", "subject_complaint": "chest pain"}], "vitals": [], "labs": []}}"#,
        )
        .unwrap();

        let mut config = AppConfig::default();
        config.store.backend = "memory".into();
        config.store.fixture_path = Some(fixture.display().to_string());

        let store = open_store(&config).await.unwrap();
        assert_eq!(store.name(), "in_memory");
        let nursing = store.fetch_nursing(&"P001".into(), None).await.unwrap();
        assert_eq!(nursing.len(), 1);
    }

    #[tokio::test]
    async fn sqlite_backend_opens_configured_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.store.url = Some(dir.path().join("records.db").display().to_string());

        let store = open_store(&config).await.unwrap();
        assert!(store.health_check().await.unwrap());
    }

    #[test]
    fn workflow_starts_from_configured_selection() {
        let mut config = AppConfig::default();
        config.api_key = Some("test-key".into());
        config.workflow.template = edsum_core::template::TemplateKind::Soap;

        let store: Arc<dyn RecordStore> = Arc::new(InMemoryStore::new());
        let workflow = build_workflow(&config, store).unwrap();
        assert_eq!(
            workflow.selection().template,
            edsum_core::template::TemplateKind::Soap
        );
        assert_eq!(workflow.state().name(), "idle");
    }
}
