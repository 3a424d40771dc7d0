use thiserror::Error;

use super::status::Status;
use crate::store::StoreError;

/// Typed failure of a workflow operation.
///
/// Everything except `Store` is a domain outcome the presentation layer
/// turns into a user-facing message. `Store` is infrastructure and is the
/// only kind treated as unexpected.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("not authorized: {0}")]
    Unauthorized(&'static str),

    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition { from: Status, to: Status },

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("submission not found")]
    NotFound,

    #[error("storage failure: {0}")]
    Store(#[from] StoreError),
}

impl WorkflowError {
    /// True for the two shapes of "the submission is not in the phase this
    /// operation requires".
    pub fn is_invalid_state(&self) -> bool {
        matches!(
            self,
            WorkflowError::InvalidState(_) | WorkflowError::InvalidTransition { .. }
        )
    }
}
