//! `edsum status` — Show configuration and record store health.

use crate::runtime::{load_config, open_store};
use edsum_config::AppConfig;
use edsum_providers::router::{build_from_config, default_model};
use edsum_summary::TemplateCatalog;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;

    println!("🩺 EDSum Status");
    println!("===============");
    println!("  Config dir:   {}", AppConfig::config_dir().display());
    println!("  Provider:     {}", config.default_provider);
    let model = default_model(&config);
    println!("  Model:        {model}");
    println!("  Temperature:  {}", config.default_temperature);
    println!("  Store:        {}", config.store.backend);
    println!(
        "  Limits:       nursing {} · vitals {} · labs {}",
        config.limits.nursing, config.limits.vitals, config.limits.labs
    );
    println!(
        "  Workflow:     {} / {}",
        config.workflow.template, config.workflow.style
    );
    println!(
        "  API key:      {}",
        if config.has_api_key() { "configured" } else { "missing" }
    );

    match TemplateCatalog::load(config.composer.templates_path.as_deref()) {
        Ok(catalog) => println!("  Templates:    version {}", catalog.version()),
        Err(e) => println!("  Templates:    ❌ {e}"),
    }

    match open_store(&config).await {
        Ok(store) => match store.health_check().await {
            Ok(true) => println!("\n  ✅ Record store reachable ({})", store.name()),
            Ok(false) => println!("\n  ⚠️  Record store reports unhealthy ({})", store.name()),
            Err(e) => println!("\n  ❌ Record store check failed: {e}"),
        },
        Err(e) => println!("\n  ❌ Record store unavailable: {e}"),
    }

    match build_from_config(&config).default() {
        Some(provider) => match provider.list_models().await {
            Ok(models) if models.contains(&model) => {
                println!("  ✅ Provider {} reachable, {model} available", provider.name())
            }
            Ok(_) => println!(
                "  ⚠️  Provider {} reachable but does not list {model}",
                provider.name()
            ),
            Err(e) => println!("  ❌ Provider {} check failed: {e}", provider.name()),
        },
        None => println!("  ❌ Provider {} is not configured", config.default_provider),
    }

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("  ✅ Config file found");
    } else {
        println!("  ⚠️  No config file — run `edsum onboard` first");
    }

    Ok(())
}
