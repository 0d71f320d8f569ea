//! `edsum templates` — Show the instruction template catalog.

use crate::runtime::load_config;
use edsum_core::template::{FocusArea, StyleMode, TemplateKind};
use edsum_summary::{InstructionComposer, TemplateCatalog, default_focus_for};

pub async fn run(show: Option<String>, style: String) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let catalog = TemplateCatalog::load(config.composer.templates_path.as_deref())?;

    if let Some(kind) = show {
        let kind: TemplateKind = kind.parse()?;
        let style: StyleMode = style.parse()?;
        let composer = InstructionComposer::new(catalog);
        println!("{}", composer.compose(kind, style, &default_focus_for(kind)));
        return Ok(());
    }

    println!("📋 Template catalog (version {})\n", catalog.version());
    println!("  Templates:");
    for kind in TemplateKind::ALL {
        let focus: Vec<&str> = default_focus_for(kind).iter().map(|f| f.as_str()).collect();
        let focus = if focus.is_empty() {
            "none".to_string()
        } else {
            focus.join(", ")
        };
        println!("    {:<10} {:<28} focus: {focus}", kind.as_str(), kind.label());
    }

    println!("\n  Styles:");
    for style in StyleMode::ALL {
        println!("    {style}");
    }

    println!("\n  Focus areas:");
    for area in FocusArea::ALL {
        println!("    {:<22} {}", area.as_str(), area.description());
    }

    Ok(())
}
