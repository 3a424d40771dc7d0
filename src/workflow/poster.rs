//! Poster submission after approval.
//!
//! The file itself lives with the host's upload storage; the core only
//! records the document reference and moves the status along.

use std::sync::Arc;

use crate::auth::Actor;
use crate::domain::{Outcome, Status, StatusMachine, SubmissionId, WorkflowError};
use crate::store::SubmissionStore;

pub struct PosterWorkflow {
    store: Arc<dyn SubmissionStore>,
    machine: StatusMachine,
}

impl PosterWorkflow {
    pub fn new(store: Arc<dyn SubmissionStore>) -> Self {
        let machine = StatusMachine::new(store.clone());
        Self { store, machine }
    }

    /// Attach a poster document. First upload moves `approved` to
    /// `poster_submitted`; replacing an existing poster leaves the status
    /// alone.
    pub async fn submit_poster(
        &self,
        actor: &Actor,
        id: SubmissionId,
        document: &str,
    ) -> Result<Outcome, WorkflowError> {
        let submission = self.store.get(id).await?.ok_or(WorkflowError::NotFound)?;

        if submission.author != actor.id {
            return Err(WorkflowError::Unauthorized(
                "only the author may submit the poster",
            ));
        }

        if !matches!(
            submission.status,
            Status::Approved | Status::PosterSubmitted
        ) {
            return Err(WorkflowError::InvalidState(format!(
                "poster requires an approved submission (status {})",
                submission.status
            )));
        }

        self.store.set_poster(id, document).await?;

        if submission.status == Status::Approved {
            let changed = self.machine.transition(id, Status::PosterSubmitted).await?;
            Ok(Outcome::with_status(changed.to))
        } else {
            Ok(Outcome::none())
        }
    }
}
