//! # OfficeFlow Workflow
//!
//! Documents and memos move through an ordered list of signers:
//!
//! ```text
//! Draft ──submit──▶ InReview ──approve (last signer)──▶ Completed
//!   ▲                  │
//!   └────revise──── Rejected ◀──reject──┘
//! ```
//!
//! Only the current signer may approve or reject. Every transition is
//! recorded in the workflow's history.

pub mod error;
pub mod workflow;

pub use error::WorkflowError;
pub use workflow::{
    Decision, SignerStep, Workflow, WorkflowAction, WorkflowEvent, WorkflowStatus,
};
