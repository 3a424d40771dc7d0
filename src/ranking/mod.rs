//! Ranking, presentation-slot selection, confirmation deadlines and
//! escalation.
//!
//! Selection is a greedy, event-fair quota walk with a global top-up:
//! every event is guaranteed its `per_event` slots before the general
//! ranking rewards overall excellence with `general_extra` more. Batch
//! operations collect per-item failures instead of aborting, so one racing
//! edit cannot starve the rest of a sweep.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::auth::Actor;
use crate::domain::{
    EventTrack, Notification, Outcome, Status, StatusMachine, Submission, SubmissionId,
    WorkflowError,
};
use crate::store::{StoreError, SubmissionStore};

#[derive(Debug, Clone, Copy)]
pub struct SelectionConfig {
    pub per_event: usize,
    pub general_extra: usize,
    /// How long an author has to confirm a presentation slot.
    pub confirmation_window: Duration,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            per_event: 6,
            general_extra: 3,
            confirmation_window: Duration::days(3),
        }
    }
}

/// Result of a batch operation: what was done, what to notify, and which
/// items failed without stopping the batch.
#[derive(Debug, Default)]
pub struct SweepReport {
    pub processed: Vec<SubmissionId>,
    pub notifications: Vec<Notification>,
    pub failures: Vec<(SubmissionId, WorkflowError)>,
}

pub struct RankingEngine {
    store: Arc<dyn SubmissionStore>,
    machine: StatusMachine,
    config: SelectionConfig,
}

impl RankingEngine {
    pub fn new(store: Arc<dyn SubmissionStore>, config: SelectionConfig) -> Self {
        let machine = StatusMachine::new(store.clone());
        Self {
            store,
            machine,
            config,
        }
    }

    /// Score descending; equal scores fall back to submission id so the
    /// order is deterministic.
    fn sort_ranking(submissions: &mut [Submission]) {
        submissions.sort_by(|a, b| {
            b.ranking_score
                .partial_cmp(&a.ranking_score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
    }

    /// Ranked candidates of one event: score > 0 and a post-approval
    /// status, best first.
    pub async fn rank_event(&self, event: EventTrack) -> Result<Vec<Submission>, StoreError> {
        let mut candidates = self.store.list_ranking_candidates(event).await?;
        Self::sort_ranking(&mut candidates);
        Ok(candidates)
    }

    /// Both events merged and re-sorted.
    pub async fn rank_general(&self) -> Result<Vec<Submission>, StoreError> {
        let mut all = Vec::new();
        for event in EventTrack::ALL {
            all.extend(self.store.list_ranking_candidates(event).await?);
        }
        Self::sort_ranking(&mut all);
        Ok(all)
    }

    /// Select the top submissions for presentation: up to `per_event` per
    /// event, then up to `general_extra` more from the combined ranking.
    /// Already-selected submissions count toward the quotas without being
    /// touched again, which makes the operation idempotent.
    pub async fn select_top(&self) -> Result<SweepReport, StoreError> {
        let mut report = SweepReport::default();

        for event in EventTrack::ALL {
            let ranking = self.rank_event(event).await?;
            let mut count = 0usize;

            for submission in ranking {
                if count >= self.config.per_event {
                    break;
                }
                if submission.selected_for_presentation {
                    report.processed.push(submission.id);
                    count += 1;
                    continue;
                }
                // A timed-out-and-rejected candidate stays out of the pool.
                if submission.status == Status::Rejected {
                    continue;
                }
                match self.store.set_selected(submission.id, true).await {
                    Ok(()) => {
                        report.processed.push(submission.id);
                        count += 1;
                    }
                    Err(err) => {
                        tracing::warn!(submission = %submission.id, %err, "selection failed");
                        report.failures.push((submission.id, err.into()));
                    }
                }
            }
        }

        let general = self.rank_general().await?;
        let mut extra = 0usize;
        for submission in general {
            if extra >= self.config.general_extra {
                break;
            }
            if report.processed.contains(&submission.id) {
                continue;
            }
            // A submission selected by an earlier run occupies one of the
            // general slots; it must not push selection further down the
            // ranking.
            if submission.selected_for_presentation {
                report.processed.push(submission.id);
                extra += 1;
                continue;
            }
            match self.store.set_selected(submission.id, true).await {
                Ok(()) => {
                    report.processed.push(submission.id);
                    extra += 1;
                }
                Err(err) => {
                    tracing::warn!(submission = %submission.id, %err, "selection failed");
                    report.failures.push((submission.id, err.into()));
                }
            }
        }

        tracing::info!(selected = report.processed.len(), "selection complete");
        Ok(report)
    }

    /// Start the confirmation window for freshly selected submissions.
    /// Only `approved` and `poster_submitted` are ready for it; anything
    /// else is skipped rather than forced.
    pub async fn notify_selected(
        &self,
        ids: &[SubmissionId],
        now: DateTime<Utc>,
    ) -> Result<SweepReport, StoreError> {
        let mut report = SweepReport::default();
        let deadline = now + self.config.confirmation_window;

        for &id in ids {
            let submission = match self.store.get(id).await? {
                Some(s) => s,
                None => continue,
            };
            if !matches!(
                submission.status,
                Status::Approved | Status::PosterSubmitted
            ) {
                continue;
            }

            match self.offer_slot(id, deadline).await {
                Ok(notification) => {
                    report.processed.push(id);
                    report.notifications.push(notification);
                }
                Err(err) => {
                    tracing::warn!(submission = %id, %err, "confirmation offer failed");
                    report.failures.push((id, err));
                }
            }
        }
        Ok(report)
    }

    /// The author accepts the presentation slot.
    pub async fn confirm_presentation(
        &self,
        actor: &Actor,
        id: SubmissionId,
    ) -> Result<Outcome, WorkflowError> {
        let submission = self.store.get(id).await?.ok_or(WorkflowError::NotFound)?;

        if submission.author != actor.id {
            return Err(WorkflowError::Unauthorized(
                "only the author may confirm the presentation",
            ));
        }
        if submission.status != Status::AwaitingConfirmation {
            return Err(WorkflowError::InvalidState(format!(
                "no confirmation requested (status {})",
                submission.status
            )));
        }

        let changed = self.machine.transition(id, Status::Confirmed).await?;
        self.store.set_presentation_confirmed(id, true).await?;

        tracing::info!(submission = %id, "presentation confirmed");
        Ok(Outcome::with_status(changed.to))
    }

    /// Periodic sweep: every expired confirmation is withdrawn (back to
    /// `approved`, deselected) and its slot escalated to the next-ranked
    /// candidate of the same event.
    pub async fn check_deadlines(&self, now: DateTime<Utc>) -> Result<SweepReport, StoreError> {
        let mut report = SweepReport::default();
        let waiting = self.store.list_awaiting_confirmation().await?;

        for submission in waiting {
            let deadline = match submission.confirmation_deadline {
                Some(d) => d,
                None => continue,
            };
            if now <= deadline {
                continue;
            }

            tracing::info!(submission = %submission.id, %deadline, "confirmation deadline expired");

            if let Err(err) = self.withdraw(submission.id).await {
                tracing::warn!(submission = %submission.id, %err, "withdrawal failed");
                report.failures.push((submission.id, err));
                continue;
            }
            report.processed.push(submission.id);

            match self.escalate(submission.event, submission.id, now).await {
                Ok(Some(notification)) => {
                    report.processed.push(notification.submission_id());
                    report.notifications.push(notification);
                }
                Ok(None) => {
                    tracing::info!(event = %submission.event, "no candidate left to escalate to");
                }
                Err(err) => {
                    report.failures.push((submission.id, err.into()));
                }
            }
        }
        Ok(report)
    }

    /// Offer the slot to the best unselected candidate of the event,
    /// skipping the excluded (just-expired) submission. At most one
    /// escalation per call.
    pub async fn escalate(
        &self,
        event: EventTrack,
        excluded: SubmissionId,
        now: DateTime<Utc>,
    ) -> Result<Option<Notification>, StoreError> {
        let ranking = self.rank_event(event).await?;
        let deadline = now + self.config.confirmation_window;

        for candidate in ranking {
            if candidate.id == excluded {
                continue;
            }
            if candidate.selected_for_presentation || candidate.presentation_confirmed {
                continue;
            }
            if !matches!(
                candidate.status,
                Status::Approved | Status::PosterSubmitted
            ) {
                continue;
            }

            self.store.set_selected(candidate.id, true).await?;
            match self.offer_slot(candidate.id, deadline).await {
                Ok(notification) => {
                    tracing::info!(submission = %candidate.id, %event, "escalated selection");
                    return Ok(Some(notification));
                }
                Err(err) => {
                    // Lost a race on this candidate; try the next one.
                    tracing::warn!(submission = %candidate.id, %err, "escalation candidate failed");
                    let _ = self.store.set_selected(candidate.id, false).await;
                }
            }
        }
        Ok(None)
    }

    async fn offer_slot(
        &self,
        id: SubmissionId,
        deadline: DateTime<Utc>,
    ) -> Result<Notification, WorkflowError> {
        self.store
            .set_confirmation_deadline(id, Some(deadline))
            .await?;
        self.machine
            .transition(id, Status::AwaitingConfirmation)
            .await?;
        Ok(Notification::ConfirmationNeeded {
            submission_id: id,
            deadline,
        })
    }

    async fn withdraw(&self, id: SubmissionId) -> Result<(), WorkflowError> {
        self.store.set_selected(id, false).await?;
        self.machine.transition(id, Status::Approved).await?;
        self.store.set_confirmation_deadline(id, None).await?;
        Ok(())
    }
}
