//! Author-facing operations: create, resubmit, confirm payment.

use std::sync::Arc;

use serde::Deserialize;

use crate::auth::Actor;
use crate::clock::Clock;
use crate::domain::{
    EventTrack, HistoryEntry, HistoryRole, Notification, Outcome, PaymentStatus, Status,
    StatusMachine, Submission, SubmissionContent, SubmissionId, WorkflowError,
};
use crate::store::SubmissionStore;

pub const MAX_PER_AUTHOR_PER_EVENT: u64 = 2;

#[derive(Debug, Clone, Deserialize)]
pub struct NewSubmission {
    pub event: EventTrack,
    pub content: SubmissionContent,
}

pub struct SubmissionWorkflow {
    store: Arc<dyn SubmissionStore>,
    machine: StatusMachine,
    clock: Arc<dyn Clock>,
    /// Whether a payment gateway gates non-draft submissions. Deployments
    /// without one confirm payment at creation time.
    payment_gateway: bool,
}

impl SubmissionWorkflow {
    pub fn new(
        store: Arc<dyn SubmissionStore>,
        clock: Arc<dyn Clock>,
        payment_gateway: bool,
    ) -> Self {
        let machine = StatusMachine::new(store.clone());
        Self {
            store,
            machine,
            clock,
            payment_gateway,
        }
    }

    /// Create a new submission.
    ///
    /// Drafts skip the content rules (except the author bound) and the
    /// paid-registration gate; the quota applies to both, since a draft
    /// already occupies one of the author's two slots for the event.
    pub async fn create(
        &self,
        actor: &Actor,
        submission: NewSubmission,
        is_draft: bool,
    ) -> Result<(SubmissionId, Outcome), WorkflowError> {
        let NewSubmission { event, mut content } = submission;
        content.normalize();

        if !is_draft && !actor.paid_registration {
            return Err(WorkflowError::Unauthorized(
                "a paid registration is required to submit",
            ));
        }

        let existing = self.store.count_by_author_and_event(actor.id, event).await?;
        if existing >= MAX_PER_AUTHOR_PER_EVENT {
            return Err(WorkflowError::Validation(format!(
                "limit of {} abstracts for {} reached",
                MAX_PER_AUTHOR_PER_EVENT, event
            )));
        }

        if is_draft {
            content.validate_authors()?;
        } else {
            content.validate()?;
        }

        let (status, payment) = if is_draft {
            let payment = if self.payment_gateway {
                PaymentStatus::Pending
            } else {
                PaymentStatus::Confirmed
            };
            (Status::Draft, payment)
        } else if self.payment_gateway {
            (Status::PendingPayment, PaymentStatus::Pending)
        } else {
            (Status::Submitted, PaymentStatus::Confirmed)
        };

        let id = uuid::Uuid::new_v4();
        let record = Submission::new(id, event, actor.id, content, status, payment, self.clock.now());
        self.store.insert(&record).await?;

        tracing::info!(submission = %id, %event, %status, "submission created");

        let mut outcome = Outcome::with_status(status);
        if status == Status::Submitted {
            outcome = outcome.notify(Notification::NewSubmission {
                submission_id: id,
                event,
            });
        }
        Ok((id, outcome))
    }

    /// Author sends a new version: finalizing a draft, or answering a
    /// correction request / rejection / approval-with-considerations.
    pub async fn resubmit(
        &self,
        actor: &Actor,
        id: SubmissionId,
        mut content: SubmissionContent,
    ) -> Result<Outcome, WorkflowError> {
        let submission = self.store.get(id).await?.ok_or(WorkflowError::NotFound)?;

        if submission.author != actor.id {
            return Err(WorkflowError::Unauthorized("only the author may resubmit"));
        }

        let editable = matches!(
            submission.status,
            Status::Draft
                | Status::InCorrection
                | Status::ApprovedWithConsiderations
                | Status::Rejected
        );
        if !editable {
            return Err(WorkflowError::InvalidState(format!(
                "submission is not editable in status {}",
                submission.status
            )));
        }

        content.normalize();
        content.validate()?;
        self.store.update_content(id, &content).await?;

        // A draft heading out the door meets the payment gate for the
        // first time, unless its payment already cleared while it was a
        // draft; corrected work already passed the gate.
        let target = if submission.status == Status::Draft
            && self.payment_gateway
            && submission.payment != PaymentStatus::Confirmed
        {
            Status::PendingPayment
        } else {
            Status::Submitted
        };
        let changed = self.machine.transition(id, target).await?;

        let mut outcome = Outcome::with_status(changed.to);
        if submission.status != Status::Draft {
            self.store
                .append_history(
                    id,
                    HistoryEntry {
                        role: HistoryRole::Author,
                        content: "the author sent the requested corrections".to_string(),
                        timestamp: self.clock.now(),
                        actor: actor.id,
                    },
                )
                .await?;
        }
        if changed.to == Status::Submitted {
            outcome = outcome.notify(Notification::NewSubmission {
                submission_id: id,
                event: submission.event,
            });
        }
        Ok(outcome)
    }

    /// Payment collaborator reports a confirmed payment.
    ///
    /// Confirming twice is a benign no-op: the second call finds the
    /// payment already confirmed (or the transition already taken) and
    /// returns an empty outcome instead of an error. A payment arriving
    /// while the submission is still a draft is recorded without
    /// publishing anything.
    pub async fn confirm_payment(&self, id: SubmissionId) -> Result<Outcome, WorkflowError> {
        let submission = self.store.get(id).await?.ok_or(WorkflowError::NotFound)?;

        if submission.payment == PaymentStatus::Confirmed
            && submission.status != Status::PendingPayment
        {
            tracing::debug!(submission = %id, "payment already confirmed");
            return Ok(Outcome::none());
        }

        self.store
            .set_payment_status(id, PaymentStatus::Confirmed)
            .await?;

        // Only a submission parked at the payment gate moves forward. A
        // draft keeps the payment on record and proceeds when the author
        // finalizes it, which is where the content rules are enforced.
        if submission.status != Status::PendingPayment {
            tracing::debug!(
                submission = %id,
                status = %submission.status,
                "payment recorded outside the payment phase"
            );
            return Ok(Outcome::none());
        }

        match self.machine.transition(id, Status::Submitted).await {
            Ok(changed) => Ok(Outcome::with_status(changed.to).notify(
                Notification::NewSubmission {
                    submission_id: id,
                    event: submission.event,
                },
            )),
            Err(err) if err.is_invalid_state() => {
                // Already past the payment phase.
                tracing::debug!(submission = %id, %err, "payment confirmation was a no-op");
                Ok(Outcome::none())
            }
            Err(err) => Err(err),
        }
    }
}
