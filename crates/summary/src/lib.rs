//! # EDSum Summary
//!
//! The summary pipeline, in the order a workflow uses it:
//!
//! 1. [`RecordAggregator`] reads the three record streams for a patient.
//! 2. [`truncate`] keeps the most recent entries of each stream.
//! 3. [`InstructionComposer`] builds the system instruction from the
//!    [`TemplateCatalog`].
//! 4. [`render_transcript`] turns the bundle into the user message.
//! 5. [`Summarizer`] sends both to the configured provider.

pub mod aggregate;
pub mod catalog;
pub mod compose;
pub mod generate;
pub mod transcript;
pub mod truncate;

pub use aggregate::RecordAggregator;
pub use catalog::{CatalogError, TemplateCatalog};
pub use compose::{ComposedInstruction, InstructionComposer, default_focus_for};
pub use generate::Summarizer;
pub use transcript::render_transcript;
pub use truncate::{WindowCaps, keep_latest, truncate};
