//! Workflow state and operator selections.

use edsum_config::WorkflowConfig;
use edsum_core::record::{PatientId, PatientRecordBundle};
use edsum_core::template::{FocusArea, StyleMode, TemplateKind};
use edsum_summary::{ComposedInstruction, default_focus_for};
use serde::{Deserialize, Serialize};

/// Where a workflow is in its fetch → review → finalize cycle.
#[derive(Debug, Clone, Default)]
pub enum WorkflowState {
    /// Nothing loaded.
    #[default]
    Idle,

    /// Records loaded and an instruction ready for review.
    Prepared {
        patient: PatientId,
        bundle: PatientRecordBundle,
        instruction: ComposedInstruction,
    },

    /// A summary was generated. Read-only until reset.
    Finalized {
        patient: PatientId,
        bundle: PatientRecordBundle,
        instruction: ComposedInstruction,
        result: String,
    },
}

impl WorkflowState {
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowState::Idle => "idle",
            WorkflowState::Prepared { .. } => "prepared",
            WorkflowState::Finalized { .. } => "finalized",
        }
    }

    pub fn patient(&self) -> Option<&PatientId> {
        match self {
            WorkflowState::Idle => None,
            WorkflowState::Prepared { patient, .. } | WorkflowState::Finalized { patient, .. } => {
                Some(patient)
            }
        }
    }

    pub fn bundle(&self) -> Option<&PatientRecordBundle> {
        match self {
            WorkflowState::Idle => None,
            WorkflowState::Prepared { bundle, .. } | WorkflowState::Finalized { bundle, .. } => {
                Some(bundle)
            }
        }
    }

    pub fn instruction(&self) -> Option<&ComposedInstruction> {
        match self {
            WorkflowState::Idle => None,
            WorkflowState::Prepared { instruction, .. }
            | WorkflowState::Finalized { instruction, .. } => Some(instruction),
        }
    }

    pub fn result(&self) -> Option<&str> {
        match self {
            WorkflowState::Finalized { result, .. } => Some(result),
            _ => None,
        }
    }
}

impl std::fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Template, style and focus chosen by the operator. Survives `reset()`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub template: TemplateKind,
    pub style: StyleMode,
    /// `None` until the operator picks focus areas explicitly. Once set,
    /// even to an empty list, it replaces the template's suggestion.
    pub focus: Option<Vec<FocusArea>>,
}

impl Selection {
    /// The focus areas that go into the next composed instruction.
    pub fn effective_focus(&self) -> Vec<FocusArea> {
        match &self.focus {
            Some(explicit) => explicit.clone(),
            None => default_focus_for(self.template),
        }
    }
}

impl From<&WorkflowConfig> for Selection {
    fn from(config: &WorkflowConfig) -> Self {
        Self {
            template: config.template,
            style: config.style,
            focus: config.focus.clone(),
        }
    }
}

/// A finalized summary packaged for download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryExport {
    pub file_name: String,
    pub content: String,
}

impl SummaryExport {
    pub fn new(patient: &PatientId, content: impl Into<String>) -> Self {
        Self {
            file_name: format!("summary_{patient}.txt"),
            content: content.into(),
        }
    }
}
