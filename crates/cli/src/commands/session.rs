//! `edsum session` — Interactive fetch → review → finalize loop.
//!
//! Operational failures (no records, store outage, provider errors) are
//! reported and the session continues. A workflow contract violation ends
//! the session with an error.

use crate::runtime::{CliResult, build_workflow, caps, load_config, open_store, write_export};
use edsum_core::event::EventBus;
use edsum_core::record::TimeWindow;
use edsum_core::template::{StyleMode, TemplateKind, parse_focus_list};
use edsum_summary::{WindowCaps, render_transcript};
use edsum_workflow::{Workflow, WorkflowError, WorkflowState};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::debug;

const HELP: &str = "\
  Commands:
    fetch <patient> [<from> <to>]   Load records (times as YYYYMMDDHHMMSS)
    show                            Current state, selection and instruction
    records                         Print the transcript sent to the model
    template <kind>                 general | soap | isbar | consult | discharge
    style <mode>                    bulleted | narrative
    focus <a,b,...> | none | default
    recompose                       Rebuild the instruction from the selection
    edit                            Replace the instruction (end with a lone '.')
    finalize                        Generate the summary
    export [dir]                    Save summary_<patient>.txt
    reset                           Discard records and summary
    help | quit";

pub async fn run(patient: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let store = open_store(&config).await?;
    let bus = Arc::new(EventBus::default());
    spawn_event_log(&bus);
    let mut workflow = build_workflow(&config, store)?.with_event_bus(bus);
    let export_dir = std::env::current_dir()?;
    let mut session = Session::new(&mut workflow, caps(&config), export_dir);

    println!("🩺 EDSum session — type 'help' for commands\n");

    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut out = std::io::stdout();

    if let Some(patient) = patient {
        session
            .execute(&format!("fetch {patient}"), &mut input, &mut out)
            .await?;
    }
    session.drive(&mut input, &mut out).await
}

/// Trace every workflow event at debug level.
fn spawn_event_log(bus: &EventBus) {
    let mut events = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => debug!(?event, "Workflow event"),
                Err(RecvError::Lagged(skipped)) => debug!(skipped, "Event log lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });
}

enum Flow {
    Continue,
    Quit,
}

struct Session<'a> {
    workflow: &'a mut Workflow,
    caps: WindowCaps,
    export_dir: PathBuf,
}

impl<'a> Session<'a> {
    fn new(workflow: &'a mut Workflow, caps: WindowCaps, export_dir: PathBuf) -> Self {
        Self {
            workflow,
            caps,
            export_dir,
        }
    }

    async fn drive<R: BufRead, W: Write>(&mut self, input: &mut R, out: &mut W) -> CliResult<()> {
        loop {
            write!(out, "  edsum [{}] > ", self.workflow.state())?;
            out.flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                writeln!(out)?;
                return Ok(());
            }
            if let Flow::Quit = self.execute(line.trim(), input, out).await? {
                return Ok(());
            }
        }
    }

    async fn execute<R: BufRead, W: Write>(
        &mut self,
        line: &str,
        input: &mut R,
        out: &mut W,
    ) -> CliResult<Flow> {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            return Ok(Flow::Continue);
        };
        let rest: Vec<&str> = words.collect();

        match command {
            "help" | "?" => writeln!(out, "{HELP}")?,
            "quit" | "exit" => return Ok(Flow::Quit),
            "fetch" => self.fetch(&rest, out).await?,
            "show" => self.show(out)?,
            "records" => match self.workflow.state() {
                WorkflowState::Idle => writeln!(out, "  Nothing loaded.")?,
                state => {
                    if let (Some(patient), Some(bundle)) = (state.patient(), state.bundle()) {
                        writeln!(out, "{}", render_transcript(patient, bundle))?;
                    }
                }
            },
            "template" => match rest.first().map(|raw| raw.parse::<TemplateKind>()) {
                Some(Ok(kind)) => {
                    self.workflow.select_template(kind);
                    self.hint_recompose(out)?;
                }
                Some(Err(e)) => writeln!(out, "  ❌ {e}")?,
                None => writeln!(out, "  Usage: template <kind>")?,
            },
            "style" => match rest.first().map(|raw| raw.parse::<StyleMode>()) {
                Some(Ok(style)) => {
                    self.workflow.select_style(style);
                    self.hint_recompose(out)?;
                }
                Some(Err(e)) => writeln!(out, "  ❌ {e}")?,
                None => writeln!(out, "  Usage: style <mode>")?,
            },
            "focus" => match rest.join(" ").as_str() {
                "" => writeln!(out, "  Usage: focus <a,b,...> | none | default")?,
                "default" => {
                    self.workflow.clear_focus_override();
                    self.hint_recompose(out)?;
                }
                "none" => {
                    self.workflow.select_focus(Vec::new());
                    self.hint_recompose(out)?;
                }
                list => match parse_focus_list(list) {
                    Ok(areas) => {
                        self.workflow.select_focus(areas);
                        self.hint_recompose(out)?;
                    }
                    Err(e) => writeln!(out, "  ❌ {e}")?,
                },
            },
            "recompose" => {
                if self.require_prepared(out)? {
                    let instruction = self.workflow.recompose()?;
                    writeln!(out, "{instruction}")?;
                }
            }
            "edit" => {
                if self.require_prepared(out)? {
                    writeln!(out, "  Enter the new instruction, end with a lone '.'")?;
                    let text = read_block(input)?;
                    self.workflow.edit_instruction(text)?;
                    writeln!(out, "  ✅ Instruction replaced")?;
                }
            }
            "finalize" => {
                if self.require_prepared(out)? {
                    match self.workflow.finalize().await {
                        Ok(summary) => writeln!(out, "\n{summary}\n")?,
                        Err(e) => report(e, out)?,
                    }
                }
            }
            "export" => {
                if matches!(self.workflow.state(), WorkflowState::Finalized { .. }) {
                    let dir = rest
                        .first()
                        .map(PathBuf::from)
                        .unwrap_or_else(|| self.export_dir.clone());
                    let path = write_export(&self.workflow.export()?, &dir)?;
                    writeln!(out, "  ✅ Saved {}", path.display())?;
                } else {
                    writeln!(out, "  Nothing to export yet. Run 'finalize' first.")?;
                }
            }
            "reset" => {
                self.workflow.reset();
                writeln!(out, "  Workflow reset.")?;
            }
            other => writeln!(out, "  Unknown command '{other}'. Type 'help'.")?,
        }
        Ok(Flow::Continue)
    }

    async fn fetch<W: Write>(&mut self, args: &[&str], out: &mut W) -> CliResult<()> {
        if !matches!(self.workflow.state(), WorkflowState::Idle) {
            writeln!(
                out,
                "  A patient is already loaded ({}). Run 'reset' first.",
                self.workflow.state()
            )?;
            return Ok(());
        }

        let (patient, window) = match args {
            [patient] => (*patient, None),
            [patient, from, to] => match TimeWindow::parse(from, to) {
                Ok(window) => (*patient, Some(window)),
                Err(e) => {
                    writeln!(out, "  ❌ {e}")?;
                    return Ok(());
                }
            },
            _ => {
                writeln!(out, "  Usage: fetch <patient> [<from> <to>]")?;
                return Ok(());
            }
        };

        match self
            .workflow
            .fetch(patient.into(), window.as_ref(), &self.caps)
            .await
        {
            Ok(()) => {
                if let Some(bundle) = self.workflow.state().bundle() {
                    writeln!(
                        out,
                        "  ✅ Loaded {} nursing · {} vitals · {} labs",
                        bundle.nursing.len(),
                        bundle.vitals.len(),
                        bundle.labs.len()
                    )?;
                }
            }
            Err(e) => report(e, out)?,
        }
        Ok(())
    }

    fn show<W: Write>(&self, out: &mut W) -> CliResult<()> {
        let state = self.workflow.state();
        let selection = self.workflow.selection();
        let focus: Vec<&str> = selection
            .effective_focus()
            .iter()
            .map(|f| f.as_str())
            .collect();

        writeln!(out, "  State:     {state}")?;
        writeln!(
            out,
            "  Selection: {} / {} / focus [{}]{}",
            selection.template,
            selection.style,
            focus.join(", "),
            if selection.focus.is_some() { " (override)" } else { "" }
        )?;
        if let Some(patient) = state.patient() {
            writeln!(out, "  Patient:   {patient}")?;
        }
        if let Some(instruction) = state.instruction() {
            writeln!(out, "\n{instruction}")?;
        }
        if let Some(result) = state.result() {
            writeln!(out, "\n--- Summary ---\n{result}")?;
        }
        Ok(())
    }

    fn require_prepared<W: Write>(&self, out: &mut W) -> CliResult<bool> {
        match self.workflow.state() {
            WorkflowState::Prepared { .. } => Ok(true),
            WorkflowState::Idle => {
                writeln!(out, "  Nothing loaded. Run 'fetch <patient>' first.")?;
                Ok(false)
            }
            WorkflowState::Finalized { .. } => {
                writeln!(out, "  Summary already generated. Run 'reset' to start over.")?;
                Ok(false)
            }
        }
    }

    fn hint_recompose<W: Write>(&self, out: &mut W) -> CliResult<()> {
        if matches!(self.workflow.state(), WorkflowState::Prepared { .. }) {
            writeln!(out, "  Selection updated. Run 'recompose' to apply it.")?;
        } else {
            writeln!(out, "  Selection updated.")?;
        }
        Ok(())
    }
}

/// Print an operational failure; contract violations end the session.
fn report<W: Write>(error: WorkflowError, out: &mut W) -> CliResult<()> {
    if error.is_contract_violation() {
        return Err(error.into());
    }
    writeln!(out, "  ❌ {error}")?;
    Ok(())
}

/// Lines up to a lone `.` (or end of input), joined with newlines.
fn read_block<R: BufRead>(input: &mut R) -> std::io::Result<String> {
    let mut lines = Vec::new();
    loop {
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim_end_matches(['\r', '\n']);
        if line == "." {
            break;
        }
        lines.push(line.to_string());
    }
    Ok(lines.join("\n"))
}
