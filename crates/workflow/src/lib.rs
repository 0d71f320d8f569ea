//! Summary workflow state machine.
//!
//! A workflow walks one patient through fetch, review and generation:
//!
//! ```text
//! Idle ──fetch──▶ Prepared ──finalize──▶ Finalized
//!  ▲                │  ▲  edit_instruction   │
//!  └──────reset─────┴──┘                     │
//!  └──────────────────reset──────────────────┘
//! ```
//!
//! Actions attempted from the wrong state are rejected with
//! [`WorkflowError::ContractViolation`] and change nothing.

pub mod error;
pub mod machine;
pub mod state;

pub use error::WorkflowError;
pub use machine::Workflow;
pub use state::{Selection, SummaryExport, WorkflowState};
