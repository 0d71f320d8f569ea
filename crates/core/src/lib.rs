//! # EDSum Core
//!
//! Domain types, traits, and error definitions for EDSum, the emergency
//! department record summarizer. This crate has no framework dependencies:
//! it defines the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (record storage, text generation) is defined as
//! a trait here. Implementations live in their respective crates, so stores
//! and providers can be swapped via configuration and replaced by stubs in
//! tests.

pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod record;
pub mod store;
pub mod template;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, Result, StoreError};
pub use event::{DomainEvent, EventBus};
pub use message::{Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
pub use record::{
    LabResult, NursingEntry, PatientId, PatientOverview, PatientRecordBundle, TimeWindow,
    VitalSign,
};
pub use store::RecordStore;
pub use template::{FocusArea, StyleMode, TemplateKind};
