//! Reviewer-facing operations.

use std::sync::Arc;

use crate::auth::Actor;
use crate::clock::Clock;
use crate::domain::{
    aggregate, HistoryEntry, HistoryRole, Notification, Outcome, RankingWeights, ReviewerDecision,
    ScoreSet, Status, StatusMachine, SubmissionId, WorkflowError,
};
use crate::store::SubmissionStore;

pub struct ReviewWorkflow {
    store: Arc<dyn SubmissionStore>,
    machine: StatusMachine,
    clock: Arc<dyn Clock>,
}

impl ReviewWorkflow {
    pub fn new(store: Arc<dyn SubmissionStore>, clock: Arc<dyn Clock>) -> Self {
        let machine = StatusMachine::new(store.clone());
        Self {
            store,
            machine,
            clock,
        }
    }

    /// Record the assigned reviewer's scores, decision and notes.
    ///
    /// From `under_review` or `submitted` this moves the submission to
    /// `awaiting_decision` and asks for the review-complete notification.
    /// In the middle of a correction loop (`in_correction`) the scores are
    /// updated in place without forcing a new editorial cycle.
    pub async fn submit_review(
        &self,
        actor: &Actor,
        id: SubmissionId,
        scores: ScoreSet,
        decision: ReviewerDecision,
        notes: &str,
        weights: &RankingWeights,
    ) -> Result<Outcome, WorkflowError> {
        let submission = self.store.get(id).await?.ok_or(WorkflowError::NotFound)?;

        if submission.reviewer != Some(actor.id) {
            return Err(WorkflowError::Unauthorized(
                "you are not the assigned reviewer",
            ));
        }

        let reviewable = matches!(
            submission.status,
            Status::UnderReview | Status::InCorrection | Status::Submitted
        );
        if !reviewable {
            return Err(WorkflowError::InvalidState(format!(
                "submission is not under review (status {})",
                submission.status
            )));
        }

        scores.validate()?;
        let ranking_score = aggregate(&scores, weights);

        self.store
            .record_review(id, &scores, decision, notes, ranking_score)
            .await?;
        self.store
            .append_history(
                id,
                HistoryEntry {
                    role: HistoryRole::Reviewer,
                    content: notes.to_string(),
                    timestamp: self.clock.now(),
                    actor: actor.id,
                },
            )
            .await?;

        tracing::info!(submission = %id, score = ranking_score, decision = decision.as_str(), "review recorded");

        if matches!(submission.status, Status::UnderReview | Status::Submitted) {
            let changed = self.machine.transition(id, Status::AwaitingDecision).await?;
            Ok(Outcome::with_status(changed.to)
                .notify(Notification::ReviewComplete { submission_id: id }))
        } else {
            Ok(Outcome::none())
        }
    }
}
