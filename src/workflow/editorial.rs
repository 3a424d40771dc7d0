//! Editor-facing operations: reviewer assignment and editorial decisions.

use std::collections::HashSet;
use std::sync::Arc;

use crate::auth::{Actor, Capability, Role};
use crate::clock::Clock;
use crate::domain::{
    EditorialDecision, HistoryEntry, HistoryRole, Notification, Outcome, Status, StatusMachine,
    SubmissionId, UserId, WorkflowError,
};
use crate::store::SubmissionStore;

pub struct EditorialWorkflow {
    store: Arc<dyn SubmissionStore>,
    machine: StatusMachine,
    clock: Arc<dyn Clock>,
}

impl EditorialWorkflow {
    pub fn new(store: Arc<dyn SubmissionStore>, clock: Arc<dyn Clock>) -> Self {
        let machine = StatusMachine::new(store.clone());
        Self {
            store,
            machine,
            clock,
        }
    }

    /// Assign a reviewer. The reviewer's roles are asserted by the host's
    /// identity collaborator; a user without a reviewer-eligible role is
    /// rejected here.
    pub async fn assign_reviewer(
        &self,
        actor: &Actor,
        id: SubmissionId,
        reviewer: UserId,
        reviewer_roles: &HashSet<Role>,
    ) -> Result<Outcome, WorkflowError> {
        if !actor.can(Capability::AssignReviewers) {
            return Err(WorkflowError::Unauthorized(
                "missing capability: assign_reviewers",
            ));
        }

        let status = self
            .store
            .get_status(id)
            .await?
            .ok_or(WorkflowError::NotFound)?;
        if !matches!(status, Status::Submitted | Status::FitForReview) {
            return Err(WorkflowError::InvalidState(format!(
                "reviewer can only be assigned while submitted or fit for review (status {})",
                status
            )));
        }

        if !Role::reviewer_eligible(reviewer_roles) {
            return Err(WorkflowError::Validation(
                "the user does not hold a reviewer role".into(),
            ));
        }

        self.store.set_reviewer(id, reviewer).await?;
        let changed = self.machine.transition(id, Status::UnderReview).await?;

        tracing::info!(submission = %id, reviewer = %reviewer, "reviewer assigned");

        Ok(
            Outcome::with_status(changed.to).notify(Notification::AssignedReviewer {
                submission_id: id,
                reviewer,
            }),
        )
    }

    /// Record an editorial decision on a submission awaiting one.
    pub async fn make_decision(
        &self,
        actor: &Actor,
        id: SubmissionId,
        decision: EditorialDecision,
        notes: &str,
    ) -> Result<Outcome, WorkflowError> {
        if !actor.can(Capability::ManageWorkflow) {
            return Err(WorkflowError::Unauthorized(
                "missing capability: manage_workflow",
            ));
        }

        let status = self
            .store
            .get_status(id)
            .await?
            .ok_or(WorkflowError::NotFound)?;
        if status != Status::AwaitingDecision {
            return Err(WorkflowError::InvalidState(format!(
                "submission is not awaiting an editorial decision (status {})",
                status
            )));
        }

        if !notes.is_empty() {
            self.store
                .append_history(
                    id,
                    HistoryEntry {
                        role: HistoryRole::Editor,
                        content: notes.to_string(),
                        timestamp: self.clock.now(),
                        actor: actor.id,
                    },
                )
                .await?;
        }
        self.store
            .record_editorial_decision(id, decision, notes)
            .await?;

        let changed = self.machine.transition(id, decision.target_status()).await?;

        tracing::info!(submission = %id, %decision, to = %changed.to, "editorial decision");

        let mut outcome =
            Outcome::with_status(changed.to).notify(Notification::EditorialDecision {
                submission_id: id,
                decision,
                notes: notes.to_string(),
            });
        match decision {
            EditorialDecision::Approve => {
                outcome = outcome.notify(Notification::PosterRequest { submission_id: id });
            }
            EditorialDecision::ReturnToReviewer => {
                outcome = outcome.notify(Notification::ReturnedToReviewer { submission_id: id });
            }
            _ => {}
        }
        Ok(outcome)
    }
}
