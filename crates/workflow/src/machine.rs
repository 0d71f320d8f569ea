//! The summary workflow: Idle → Prepared → Finalized → Idle.
//!
//! One `Workflow` is owned by one task. Every action takes `&mut self`, so at
//! most one action and one generation call are in flight. The state is
//! replaced wholesale on each transition and only after the step succeeded;
//! a failed step leaves the previous state untouched.

use crate::error::WorkflowError;
use crate::state::{Selection, SummaryExport, WorkflowState};
use chrono::Utc;
use edsum_core::error::{Error, StoreError};
use edsum_core::event::{DomainEvent, EventBus};
use edsum_core::record::{PatientId, TimeWindow};
use edsum_core::template::{FocusArea, StyleMode, TemplateKind};
use edsum_summary::{
    ComposedInstruction, InstructionComposer, RecordAggregator, Summarizer, WindowCaps,
    render_transcript, truncate,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub struct Workflow {
    id: Uuid,
    aggregator: RecordAggregator,
    composer: InstructionComposer,
    summarizer: Arc<Summarizer>,
    selection: Selection,
    state: WorkflowState,
    events: Option<Arc<EventBus>>,
}

impl Workflow {
    pub fn new(
        aggregator: RecordAggregator,
        composer: InstructionComposer,
        summarizer: Arc<Summarizer>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            aggregator,
            composer,
            summarizer,
            selection: Selection::default(),
            state: WorkflowState::Idle,
            events: None,
        }
    }

    /// Start from the given selections instead of the defaults.
    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    /// Publish transition events on `bus`.
    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.events = Some(bus);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    // ── Selections ────────────────────────────────────────────────────────
    //
    // Selections may change in any state. They shape the next composed
    // instruction; an instruction already under review is left alone until
    // `recompose` is called.

    pub fn select_template(&mut self, template: TemplateKind) {
        debug!(workflow = %self.id, %template, "Template selected");
        self.selection.template = template;
    }

    pub fn select_style(&mut self, style: StyleMode) {
        debug!(workflow = %self.id, %style, "Style selected");
        self.selection.style = style;
    }

    /// Set an explicit focus list. It stays in force across template changes
    /// and resets until [`clear_focus_override`](Self::clear_focus_override).
    pub fn select_focus(&mut self, focus: Vec<FocusArea>) {
        debug!(workflow = %self.id, areas = focus.len(), "Focus override set");
        self.selection.focus = Some(focus);
    }

    /// Go back to the template's suggested focus areas.
    pub fn clear_focus_override(&mut self) {
        self.selection.focus = None;
    }

    fn compose_current(&self) -> ComposedInstruction {
        self.composer.compose(
            self.selection.template,
            self.selection.style,
            &self.selection.effective_focus(),
        )
    }

    // ── Transitions ───────────────────────────────────────────────────────

    /// Idle → Prepared: aggregate, truncate and compose the default
    /// instruction.
    pub async fn fetch(
        &mut self,
        patient: PatientId,
        window: Option<&TimeWindow>,
        caps: &WindowCaps,
    ) -> Result<(), WorkflowError> {
        if !matches!(self.state, WorkflowState::Idle) {
            return Err(self.violation("fetch"));
        }

        let bundle = match self.aggregator.aggregate(&patient, window).await {
            Ok(bundle) => truncate(bundle, caps),
            Err(Error::NotFound { patient_id }) => {
                info!(workflow = %self.id, patient = %patient_id, "No records for patient");
                self.publish_fetch_failed(&patient, "no records");
                return Err(WorkflowError::NoRecords { patient_id });
            }
            Err(e) => {
                let store_error = match e {
                    Error::Store(inner) => inner,
                    other => StoreError::QueryFailed(other.to_string()),
                };
                warn!(workflow = %self.id, patient = %patient, error = %store_error, "Fetch failed");
                self.publish_fetch_failed(&patient, &store_error.to_string());
                return Err(WorkflowError::Unavailable(store_error));
            }
        };

        if bundle.is_empty() {
            info!(workflow = %self.id, patient = %patient, "Every stream truncated to zero");
            self.publish_fetch_failed(&patient, "no records after truncation");
            return Err(WorkflowError::NoRecords {
                patient_id: patient,
            });
        }

        let instruction = self.compose_current();
        info!(
            workflow = %self.id,
            patient = %patient,
            nursing = bundle.nursing.len(),
            vitals = bundle.vitals.len(),
            labs = bundle.labs.len(),
            template = %self.selection.template,
            "Workflow prepared"
        );
        self.publish(DomainEvent::RecordsFetched {
            workflow_id: self.id.to_string(),
            patient_id: patient.to_string(),
            nursing: bundle.nursing.len(),
            vitals: bundle.vitals.len(),
            labs: bundle.labs.len(),
            timestamp: Utc::now(),
        });

        self.state = WorkflowState::Prepared {
            patient,
            bundle,
            instruction,
        };
        Ok(())
    }

    /// Replace the instruction under review. Any text is accepted.
    pub fn edit_instruction(&mut self, text: impl Into<String>) -> Result<(), WorkflowError> {
        let WorkflowState::Prepared { instruction, .. } = &mut self.state else {
            return Err(self.violation("edit_instruction"));
        };
        *instruction = ComposedInstruction::from(text.into());
        let length = instruction.len();

        debug!(workflow = %self.id, length, "Instruction edited");
        self.publish(DomainEvent::InstructionEdited {
            workflow_id: self.id.to_string(),
            length,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Rebuild the instruction under review from the current selections,
    /// discarding any manual edits.
    pub fn recompose(&mut self) -> Result<&ComposedInstruction, WorkflowError> {
        if !matches!(self.state, WorkflowState::Prepared { .. }) {
            return Err(self.violation("recompose"));
        }
        let fresh = self.compose_current();
        self.edit_instruction(fresh.into_string())?;
        self.state
            .instruction()
            .ok_or_else(|| self.violation("recompose"))
    }

    /// Prepared → Finalized: render the transcript and generate the summary.
    ///
    /// On failure the workflow stays Prepared with bundle and instruction
    /// unchanged, so the call can be retried.
    pub async fn finalize(&mut self) -> Result<&str, WorkflowError> {
        let WorkflowState::Prepared {
            patient,
            bundle,
            instruction,
        } = &self.state
        else {
            return Err(self.violation("finalize"));
        };

        let transcript = render_transcript(patient, bundle);
        let patient_id = patient.to_string();
        info!(
            workflow = %self.id,
            patient = %patient_id,
            provider = self.summarizer.provider_name(),
            model = self.summarizer.model(),
            "Generating summary"
        );

        let result = match self.summarizer.generate(instruction, &transcript).await {
            Ok(text) => text,
            Err(e) => {
                warn!(workflow = %self.id, error = %e, "Generation failed, staying prepared");
                self.publish(DomainEvent::GenerationFailed {
                    workflow_id: self.id.to_string(),
                    error_message: e.to_string(),
                    timestamp: Utc::now(),
                });
                return Err(WorkflowError::Generation(e));
            }
        };

        self.publish(DomainEvent::SummaryGenerated {
            workflow_id: self.id.to_string(),
            patient_id,
            model: self.summarizer.model().to_string(),
            characters: result.chars().count(),
            timestamp: Utc::now(),
        });

        let previous = std::mem::take(&mut self.state);
        self.state = match previous {
            WorkflowState::Prepared {
                patient,
                bundle,
                instruction,
            } => WorkflowState::Finalized {
                patient,
                bundle,
                instruction,
                result,
            },
            other => other,
        };
        info!(workflow = %self.id, "Workflow finalized");
        Ok(self.state.result().unwrap_or_default())
    }

    /// The finalized summary as a downloadable file.
    pub fn export(&self) -> Result<SummaryExport, WorkflowError> {
        match &self.state {
            WorkflowState::Finalized {
                patient, result, ..
            } => Ok(SummaryExport::new(patient, result.as_str())),
            _ => Err(self.violation("export")),
        }
    }

    /// Back to Idle, discarding bundle, instruction and result. Selections
    /// are kept. A no-op when already Idle.
    pub fn reset(&mut self) {
        if matches!(self.state, WorkflowState::Idle) {
            debug!(workflow = %self.id, "Reset while idle, nothing to discard");
            return;
        }
        let previous = std::mem::take(&mut self.state);
        info!(workflow = %self.id, from = previous.name(), "Workflow reset");
        self.publish(DomainEvent::WorkflowReset {
            workflow_id: self.id.to_string(),
            timestamp: Utc::now(),
        });
    }

    // ── Helpers ───────────────────────────────────────────────────────────

    fn violation(&self, action: &'static str) -> WorkflowError {
        let state = self.state.name();
        error!(workflow = %self.id, action, state, "Workflow action not allowed in current state");
        WorkflowError::ContractViolation { action, state }
    }

    fn publish(&self, event: DomainEvent) {
        if let Some(bus) = &self.events {
            bus.publish(event);
        }
    }

    fn publish_fetch_failed(&self, patient: &PatientId, reason: &str) {
        self.publish(DomainEvent::FetchFailed {
            workflow_id: self.id.to_string(),
            patient_id: patient.to_string(),
            reason: reason.to_string(),
            timestamp: Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use edsum_core::error::ProviderError;
    use edsum_core::message::Message;
    use edsum_core::provider::{Provider, ProviderRequest, ProviderResponse};
    use edsum_core::record::{LabResult, NursingEntry, PatientRecordBundle, parse_timestamp};
    use edsum_store::InMemoryStore;
    use edsum_summary::TemplateCatalog;
    use std::sync::Mutex;

    /// Returns scripted outcomes in order and records each request.
    struct ScriptedProvider {
        outcomes: Mutex<Vec<Result<String, ProviderError>>>,
        requests: Mutex<Vec<ProviderRequest>>,
    }

    impl ScriptedProvider {
        fn new(outcomes: Vec<Result<String, ProviderError>>) -> Arc<Self> {
            Arc::new(Self {
                outcomes: Mutex::new(outcomes),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(
            &self,
            request: ProviderRequest,
        ) -> Result<ProviderResponse, ProviderError> {
            let model = request.model.clone();
            self.requests.lock().unwrap().push(request);
            let mut outcomes = self.outcomes.lock().unwrap();
            assert!(!outcomes.is_empty(), "ScriptedProvider: no outcome left");
            let text = outcomes.remove(0)?;
            Ok(ProviderResponse {
                message: Message::assistant(text),
                usage: None,
                model,
            })
        }
    }

    fn note(raw_ts: &str, subject: &str) -> NursingEntry {
        NursingEntry {
            timestamp: parse_timestamp(raw_ts),
            subject_complaint: Some(subject.into()),
            diagnosis_text: None,
        }
    }

    async fn seeded_store() -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        store
            .insert(
                "P001",
                PatientRecordBundle {
                    nursing: vec![
                        note("20240305080000", "arrived with chest pain"),
                        note("20240305090000", "oxygen started"),
                        note("20240305100000", "pain eased"),
                    ],
                    vitals: vec![],
                    labs: vec![LabResult {
                        timestamp: parse_timestamp("20240305083000"),
                        item_name: Some("Troponin".into()),
                        value: Some("0.8".into()),
                        unit: Some("ng/mL".into()),
                        reference_low: None,
                        reference_high: Some("0.04".into()),
                    }],
                },
            )
            .await;
        store
    }

    fn workflow(store: Arc<InMemoryStore>, provider: Arc<ScriptedProvider>) -> Workflow {
        let catalog = TemplateCatalog::builtin().unwrap();
        Workflow::new(
            RecordAggregator::new(store),
            InstructionComposer::new(catalog),
            Arc::new(Summarizer::new(provider, "test-model")),
        )
    }

    fn caps() -> WindowCaps {
        WindowCaps::default()
    }

    #[tokio::test]
    async fn full_cycle_fetch_finalize_export_reset() {
        let provider = ScriptedProvider::new(vec![Ok("Stable, pain resolved.".into())]);
        let mut wf = workflow(seeded_store().await, provider.clone());
        assert_eq!(wf.state().name(), "idle");
        wf.select_template(TemplateKind::Discharge);
        wf.select_style(StyleMode::Narrative);
        wf.select_focus(vec![FocusArea::LinesDrains]);

        wf.fetch("P001".into(), None, &caps()).await.unwrap();
        assert_eq!(wf.state().name(), "prepared");
        assert_eq!(wf.state().bundle().unwrap().total_len(), 4);
        assert!(!wf.state().instruction().unwrap().is_empty());

        let summary = wf.finalize().await.unwrap().to_string();
        assert_eq!(summary, "Stable, pain resolved.");
        assert_eq!(wf.state().name(), "finalized");

        let export = wf.export().unwrap();
        assert_eq!(export.file_name, "summary_P001.txt");
        assert_eq!(export.content, "Stable, pain resolved.");

        wf.reset();
        assert_eq!(wf.state().name(), "idle");
        assert!(wf.state().bundle().is_none());
        assert_eq!(provider.calls(), 1);

        let sel = wf.selection();
        assert_eq!(sel.template, TemplateKind::Discharge);
        assert_eq!(sel.style, StyleMode::Narrative);
        assert_eq!(sel.effective_focus(), vec![FocusArea::LinesDrains]);
    }

    #[tokio::test]
    async fn finalize_from_idle_is_a_contract_violation() {
        let provider = ScriptedProvider::new(vec![]);
        let mut wf = workflow(seeded_store().await, provider.clone());

        let err = wf.finalize().await.unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::ContractViolation {
                action: "finalize",
                state: "idle"
            }
        ));
        assert_eq!(wf.state().name(), "idle");
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn wrong_state_actions_leave_state_untouched() {
        let provider = ScriptedProvider::new(vec![Ok("done".into())]);
        let mut wf = workflow(seeded_store().await, provider);

        assert!(wf.edit_instruction("x").unwrap_err().is_contract_violation());
        assert!(wf.export().unwrap_err().is_contract_violation());

        wf.fetch("P001".into(), None, &caps()).await.unwrap();
        let err = wf.fetch("P001".into(), None, &caps()).await.unwrap_err();
        assert!(err.is_contract_violation());
        assert_eq!(wf.state().name(), "prepared");

        wf.finalize().await.unwrap();
        assert!(wf.edit_instruction("late edit").unwrap_err().is_contract_violation());
        assert!(wf.finalize().await.unwrap_err().is_contract_violation());
        assert!(wf.fetch("P001".into(), None, &caps()).await.unwrap_err().is_contract_violation());
        assert_eq!(wf.state().result(), Some("done"));
    }

    #[tokio::test]
    async fn unknown_patient_stays_idle_with_no_records() {
        let mut wf = workflow(seeded_store().await, ScriptedProvider::new(vec![]));
        let err = wf.fetch("P404".into(), None, &caps()).await.unwrap_err();
        assert!(matches!(err, WorkflowError::NoRecords { .. }));
        assert_eq!(wf.state().name(), "idle");
    }

    #[tokio::test]
    async fn window_without_entries_is_no_records() {
        let mut wf = workflow(seeded_store().await, ScriptedProvider::new(vec![]));
        let window = TimeWindow::parse("20230101000000", "20230101235959").unwrap();
        let err = wf
            .fetch("P001".into(), Some(&window), &caps())
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::NoRecords { .. }));
    }

    #[tokio::test]
    async fn zero_caps_are_no_records() {
        let mut wf = workflow(seeded_store().await, ScriptedProvider::new(vec![]));
        let none = WindowCaps {
            nursing: 0,
            vitals: 0,
            labs: 0,
        };
        let err = wf.fetch("P001".into(), None, &none).await.unwrap_err();
        assert!(matches!(err, WorkflowError::NoRecords { .. }));
        assert_eq!(wf.state().name(), "idle");
    }

    #[tokio::test]
    async fn caps_truncate_to_latest_entries() {
        let mut wf = workflow(seeded_store().await, ScriptedProvider::new(vec![]));
        let tight = WindowCaps {
            nursing: 2,
            ..WindowCaps::default()
        };
        wf.fetch("P001".into(), None, &tight).await.unwrap();
        let nursing = &wf.state().bundle().unwrap().nursing;
        let subjects: Vec<_> = nursing
            .iter()
            .map(|n| n.subject_complaint.as_deref().unwrap())
            .collect();
        assert_eq!(subjects, vec!["oxygen started", "pain eased"]);
    }

    #[tokio::test]
    async fn store_outage_stays_idle_with_unavailable() {
        let store = seeded_store().await;
        store.set_offline(true);
        let mut wf = workflow(store, ScriptedProvider::new(vec![]));
        let err = wf.fetch("P001".into(), None, &caps()).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Unavailable(StoreError::Unavailable(_))));
        assert_eq!(wf.state().name(), "idle");
    }

    #[tokio::test]
    async fn generation_failure_keeps_prepared_and_allows_retry() {
        let provider = ScriptedProvider::new(vec![
            Err(ProviderError::Timeout("30s".into())),
            Ok("second attempt".into()),
        ]);
        let mut wf = workflow(seeded_store().await, provider.clone());
        wf.fetch("P001".into(), None, &caps()).await.unwrap();
        wf.edit_instruction("Summarize briefly.").unwrap();
        let bundle_before = wf.state().bundle().cloned();

        let err = wf.finalize().await.unwrap_err();
        assert!(matches!(err, WorkflowError::Generation(ProviderError::Timeout(_))));
        assert_eq!(wf.state().name(), "prepared");
        assert_eq!(wf.state().bundle().cloned(), bundle_before);
        assert_eq!(
            wf.state().instruction().unwrap().as_str(),
            "Summarize briefly."
        );

        assert_eq!(wf.finalize().await.unwrap(), "second attempt");
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn edited_instruction_is_sent_verbatim() {
        let provider = ScriptedProvider::new(vec![Ok("ok".into())]);
        let mut wf = workflow(seeded_store().await, provider.clone());
        wf.fetch("P001".into(), None, &caps()).await.unwrap();
        wf.edit_instruction("").unwrap();
        wf.edit_instruction("Custom instruction.").unwrap();
        wf.finalize().await.unwrap();

        let requests = provider.requests.lock().unwrap();
        assert_eq!(requests[0].messages[0].content, "Custom instruction.");
        assert!(requests[0].messages[1].content.contains("Patient ID: P001"));
    }

    #[tokio::test]
    async fn default_instruction_uses_selection_and_suggested_focus() {
        let mut wf = workflow(seeded_store().await, ScriptedProvider::new(vec![]));
        wf.select_template(TemplateKind::Consult);
        wf.fetch("P001".into(), None, &caps()).await.unwrap();

        let composer = InstructionComposer::new(TemplateCatalog::builtin().unwrap());
        let expected = composer.compose(
            TemplateKind::Consult,
            StyleMode::Bulleted,
            &[FocusArea::AbnormalLabs, FocusArea::VitalTrends],
        );
        assert_eq!(wf.state().instruction(), Some(&expected));
    }

    #[tokio::test]
    async fn empty_focus_override_survives_template_change_and_reset() {
        let mut wf = workflow(seeded_store().await, ScriptedProvider::new(vec![]));
        wf.select_focus(vec![]);
        wf.select_template(TemplateKind::Isbar);
        wf.fetch("P001".into(), None, &caps()).await.unwrap();
        wf.reset();

        assert_eq!(wf.selection().template, TemplateKind::Isbar);
        assert_eq!(wf.selection().focus, Some(vec![]));
        assert!(wf.selection().effective_focus().is_empty());

        wf.clear_focus_override();
        assert_eq!(
            wf.selection().effective_focus(),
            vec![FocusArea::Interventions, FocusArea::Consciousness]
        );
    }

    #[tokio::test]
    async fn recompose_replaces_edits_with_current_selection() {
        let mut wf = workflow(seeded_store().await, ScriptedProvider::new(vec![]));
        assert!(wf.recompose().unwrap_err().is_contract_violation());

        wf.fetch("P001".into(), None, &caps()).await.unwrap();
        wf.edit_instruction("scratch").unwrap();
        wf.select_style(StyleMode::Narrative);
        let recomposed = wf.recompose().unwrap().clone();

        let composer = InstructionComposer::new(TemplateCatalog::builtin().unwrap());
        assert_eq!(
            recomposed,
            composer.compose(TemplateKind::General, StyleMode::Narrative, &[])
        );
    }

    #[tokio::test]
    async fn reset_from_prepared_and_idle() {
        let mut wf = workflow(seeded_store().await, ScriptedProvider::new(vec![]));
        wf.reset();
        assert_eq!(wf.state().name(), "idle");

        wf.fetch("P001".into(), None, &caps()).await.unwrap();
        wf.reset();
        assert_eq!(wf.state().name(), "idle");
        wf.fetch("P001".into(), None, &caps()).await.unwrap();
        assert_eq!(wf.state().name(), "prepared");
    }

    #[tokio::test]
    async fn transitions_publish_events() {
        let bus = Arc::new(EventBus::default());
        let mut rx = bus.subscribe();
        let provider = ScriptedProvider::new(vec![Ok("summary".into())]);
        let mut wf = workflow(seeded_store().await, provider).with_event_bus(bus);

        wf.fetch("P001".into(), None, &caps()).await.unwrap();
        wf.edit_instruction("edited").unwrap();
        wf.finalize().await.unwrap();
        wf.reset();

        let kinds: Vec<&'static str> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|event| match event.as_ref() {
                DomainEvent::RecordsFetched { .. } => "fetched",
                DomainEvent::FetchFailed { .. } => "fetch_failed",
                DomainEvent::InstructionEdited { .. } => "edited",
                DomainEvent::SummaryGenerated { .. } => "generated",
                DomainEvent::GenerationFailed { .. } => "generation_failed",
                DomainEvent::WorkflowReset { .. } => "reset",
            })
            .collect();
        assert_eq!(kinds, vec!["fetched", "edited", "generated", "reset"]);
    }
}
