//! Workflow errors

use thiserror::Error;

use crate::workflow::WorkflowStatus;

/// Rejected workflow operations. The workflow is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("A workflow needs at least one signer")]
    NoSigners,

    #[error("Signer listed more than once: {0}")]
    DuplicateSigner(String),

    #[error("Signer name must not be empty")]
    EmptySigner,

    #[error("Cannot {action} a workflow that is {status}")]
    InvalidTransition {
        action: &'static str,
        status: WorkflowStatus,
    },

    #[error("Waiting on {expected}, not {actual}")]
    NotCurrentSigner { expected: String, actual: String },

    #[error("A rejection needs a reason")]
    MissingReason,

    #[error("Workflow state is inconsistent: {0}")]
    Inconsistent(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for WorkflowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
