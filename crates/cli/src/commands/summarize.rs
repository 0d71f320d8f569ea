//! `edsum summarize` — One-shot fetch, compose and generate.

use crate::runtime::{build_workflow, caps, load_config, open_store, parse_window, write_export};
use clap::Args;
use edsum_core::template::parse_focus_list;
use edsum_summary::render_transcript;
use edsum_workflow::Workflow;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct SummarizeArgs {
    /// Patient identifier
    pub patient: String,

    /// Window start (YYYYMMDDHHMMSS or "YYYY-MM-DD HH:MM")
    #[arg(long, requires = "to")]
    pub from: Option<String>,

    /// Window end, inclusive
    #[arg(long, requires = "from")]
    pub to: Option<String>,

    /// Content template (general, soap, isbar, consult, discharge)
    #[arg(short, long)]
    pub template: Option<String>,

    /// Presentation style (bulleted, narrative)
    #[arg(short, long)]
    pub style: Option<String>,

    /// Comma-separated focus areas; an empty string selects none
    #[arg(long)]
    pub focus: Option<String>,

    /// Send this file's text as the instruction instead of the composed one
    #[arg(long, value_name = "PATH")]
    pub instruction_file: Option<PathBuf>,

    /// Write summary_<patient>.txt into this directory
    #[arg(short, long, value_name = "DIR")]
    pub export: Option<PathBuf>,

    /// Print the instruction and transcript without calling the provider
    #[arg(long)]
    pub dry_run: bool,
}

/// Apply template, style and focus flags to a workflow's selection.
pub fn apply_selection(workflow: &mut Workflow, args: &SummarizeArgs) -> Result<(), String> {
    if let Some(template) = &args.template {
        workflow.select_template(template.parse()?);
    }
    if let Some(style) = &args.style {
        workflow.select_style(style.parse()?);
    }
    if let Some(focus) = &args.focus {
        workflow.select_focus(parse_focus_list(focus)?);
    }
    Ok(())
}

pub async fn run(args: SummarizeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let window = parse_window(args.from.as_deref(), args.to.as_deref())?;
    let store = open_store(&config).await?;
    let mut workflow = build_workflow(&config, store)?;
    apply_selection(&mut workflow, &args)?;

    workflow
        .fetch(args.patient.as_str().into(), window.as_ref(), &caps(&config))
        .await?;

    if let Some(path) = &args.instruction_file {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("Cannot read instruction file {}: {e}", path.display()))?;
        workflow.edit_instruction(text)?;
    }

    if args.dry_run {
        let state = workflow.state();
        if let (Some(patient), Some(bundle), Some(instruction)) =
            (state.patient(), state.bundle(), state.instruction())
        {
            println!("{instruction}\n");
            println!("{}", render_transcript(patient, bundle));
        }
        return Ok(());
    }

    let summary = workflow.finalize().await?;
    println!("{summary}");

    if let Some(dir) = &args.export {
        let path = write_export(&workflow.export()?, dir)?;
        eprintln!("\n✅ Saved {}", path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use edsum_config::AppConfig;
    use edsum_core::store::RecordStore;
    use edsum_core::template::{FocusArea, StyleMode, TemplateKind};
    use edsum_store::InMemoryStore;
    use std::sync::Arc;

    fn args(template: Option<&str>, style: Option<&str>, focus: Option<&str>) -> SummarizeArgs {
        SummarizeArgs {
            patient: "P001".into(),
            from: None,
            to: None,
            template: template.map(String::from),
            style: style.map(String::from),
            focus: focus.map(String::from),
            instruction_file: None,
            export: None,
            dry_run: true,
        }
    }

    fn workflow() -> Workflow {
        let mut config = AppConfig::default();
        config.api_key = Some("test-key".into());
        let store: Arc<dyn RecordStore> = Arc::new(InMemoryStore::new());
        build_workflow(&config, store).unwrap()
    }

    #[test]
    fn flags_drive_the_selection() {
        let mut wf = workflow();
        apply_selection(
            &mut wf,
            &args(Some("ISBAR"), Some("narrative"), Some("consciousness, vital_trends")),
        )
        .unwrap();

        let sel = wf.selection();
        assert_eq!(sel.template, TemplateKind::Isbar);
        assert_eq!(sel.style, StyleMode::Narrative);
        assert_eq!(
            sel.focus,
            Some(vec![FocusArea::Consciousness, FocusArea::VitalTrends])
        );
    }

    #[test]
    fn empty_focus_flag_selects_none() {
        let mut wf = workflow();
        apply_selection(&mut wf, &args(Some("consult"), None, Some(""))).unwrap();
        assert!(wf.selection().effective_focus().is_empty());
    }

    #[test]
    fn unknown_template_is_rejected() {
        let mut wf = workflow();
        assert!(apply_selection(&mut wf, &args(Some("handover"), None, None)).is_err());
    }
}
