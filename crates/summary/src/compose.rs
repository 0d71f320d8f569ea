//! Instruction composition.
//!
//! An instruction is layered from three parts, always in this order and
//! separated by a blank line:
//!
//! 1. the template's base text,
//! 2. exactly one style directive,
//! 3. a focus directive listing the chosen areas (omitted when none).

use crate::catalog::TemplateCatalog;
use edsum_core::template::{FocusArea, StyleMode, TemplateKind};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The system instruction sent to the generator. Editable by the operator
/// before finalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComposedInstruction(String);

impl ComposedInstruction {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for ComposedInstruction {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ComposedInstruction {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for ComposedInstruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Suggested focus areas for a template.
pub fn default_focus_for(kind: TemplateKind) -> Vec<FocusArea> {
    match kind {
        TemplateKind::Consult => vec![FocusArea::AbnormalLabs, FocusArea::VitalTrends],
        TemplateKind::Isbar => vec![FocusArea::Interventions, FocusArea::Consciousness],
        TemplateKind::Discharge => vec![FocusArea::Interventions, FocusArea::VitalTrends],
        TemplateKind::General | TemplateKind::Soap => Vec::new(),
    }
}

/// Builds instructions from a template catalog.
#[derive(Debug, Clone)]
pub struct InstructionComposer {
    catalog: Arc<TemplateCatalog>,
}

impl InstructionComposer {
    pub fn new(catalog: Arc<TemplateCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &TemplateCatalog {
        &self.catalog
    }

    /// Compose an instruction. Focus areas are listed exactly as given,
    /// duplicates included.
    pub fn compose(
        &self,
        kind: TemplateKind,
        style: StyleMode,
        focus: &[FocusArea],
    ) -> ComposedInstruction {
        let mut parts = vec![
            self.catalog.body(kind).to_string(),
            self.catalog.style_directive(style).to_string(),
        ];
        if !focus.is_empty() {
            parts.push(self.focus_directive(focus));
        }
        ComposedInstruction(parts.join("\n\n"))
    }

    fn focus_directive(&self, focus: &[FocusArea]) -> String {
        let mut directive = self.catalog.focus_header().to_string();
        for (i, area) in focus.iter().enumerate() {
            directive.push_str(&format!("\n{}. {}", i + 1, area.description()));
        }
        directive
    }
}
