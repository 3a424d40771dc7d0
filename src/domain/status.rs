//! Submission status lifecycle.
//!
//! The status field only ever moves along the edges declared in
//! [`Status::allows`], and only through [`StatusMachine::transition`].
//! Workflow components never write the status directly, which keeps
//! illegal states unrepresentable at the persistence boundary too: the
//! write is a compare-and-set against the status that was checked, so two
//! racing callers cannot both succeed on stale state.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::error::WorkflowError;
use super::SubmissionId;
use crate::store::SubmissionStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Draft,
    PendingPayment,
    Submitted,
    FitForReview,
    UnderReview,
    AwaitingDecision,
    InCorrection,
    Approved,
    ApprovedWithConsiderations,
    Rejected,
    FitForPublication,
    PosterSubmitted,
    AwaitingConfirmation,
    Confirmed,
}

impl Status {
    pub const ALL: [Status; 14] = [
        Status::Draft,
        Status::PendingPayment,
        Status::Submitted,
        Status::FitForReview,
        Status::UnderReview,
        Status::AwaitingDecision,
        Status::InCorrection,
        Status::Approved,
        Status::ApprovedWithConsiderations,
        Status::Rejected,
        Status::FitForPublication,
        Status::PosterSubmitted,
        Status::AwaitingConfirmation,
        Status::Confirmed,
    ];

    /// Legal outgoing edges for each status.
    pub fn successors(self) -> &'static [Status] {
        match self {
            Status::Draft => &[Status::PendingPayment, Status::Submitted],
            Status::PendingPayment => &[Status::Submitted],
            Status::Submitted => &[
                Status::UnderReview,
                Status::FitForReview,
                Status::AwaitingDecision,
            ],
            Status::FitForReview => &[Status::UnderReview],
            Status::UnderReview => &[Status::AwaitingDecision],
            Status::AwaitingDecision => &[
                Status::InCorrection,
                Status::Approved,
                Status::Rejected,
                Status::ApprovedWithConsiderations,
                Status::FitForReview,
                Status::FitForPublication,
                Status::UnderReview,
            ],
            Status::InCorrection => &[Status::Submitted],
            Status::Approved => &[Status::PosterSubmitted, Status::AwaitingConfirmation],
            Status::ApprovedWithConsiderations => &[Status::Submitted],
            Status::Rejected => &[Status::Submitted],
            Status::FitForPublication => &[Status::Approved],
            Status::PosterSubmitted => &[Status::AwaitingConfirmation],
            Status::AwaitingConfirmation => &[Status::Confirmed, Status::Approved],
            Status::Confirmed => &[],
        }
    }

    pub fn allows(self, target: Status) -> bool {
        self.successors().contains(&target)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Draft => "draft",
            Status::PendingPayment => "pending_payment",
            Status::Submitted => "submitted",
            Status::FitForReview => "fit_for_review",
            Status::UnderReview => "under_review",
            Status::AwaitingDecision => "awaiting_decision",
            Status::InCorrection => "in_correction",
            Status::Approved => "approved",
            Status::ApprovedWithConsiderations => "approved_with_considerations",
            Status::Rejected => "rejected",
            Status::FitForPublication => "fit_for_publication",
            Status::PosterSubmitted => "poster_submitted",
            Status::AwaitingConfirmation => "awaiting_confirmation",
            Status::Confirmed => "confirmed",
        }
    }

    pub fn parse(s: &str) -> Option<Status> {
        Status::ALL.into_iter().find(|status| status.as_str() == s)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::Draft
    }
}

/// Emitted on every successful transition, for the host to relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusChanged {
    pub submission_id: SubmissionId,
    pub from: Status,
    pub to: Status,
}

/// The single component allowed to mutate a submission's status.
#[derive(Clone)]
pub struct StatusMachine {
    store: Arc<dyn SubmissionStore>,
}

impl StatusMachine {
    pub fn new(store: Arc<dyn SubmissionStore>) -> Self {
        Self { store }
    }

    /// Attempt a transition to `target`.
    ///
    /// Re-reads the current status, checks the edge table, then writes via
    /// compare-and-set. A lost race surfaces as `InvalidState` rather than
    /// clobbering the concurrent writer.
    pub async fn transition(
        &self,
        id: SubmissionId,
        target: Status,
    ) -> Result<StatusChanged, WorkflowError> {
        let current = self
            .store
            .get_status(id)
            .await?
            .ok_or(WorkflowError::NotFound)?;

        if !current.allows(target) {
            return Err(WorkflowError::InvalidTransition {
                from: current,
                to: target,
            });
        }

        let swapped = self.store.compare_and_set_status(id, current, target).await?;
        if !swapped {
            return Err(WorkflowError::InvalidState(format!(
                "status of {} changed concurrently",
                id
            )));
        }

        tracing::debug!(submission = %id, from = %current, to = %target, "status transition");

        Ok(StatusChanged {
            submission_id: id,
            from: current,
            to: target,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_declared_edge_is_allowed() {
        for from in Status::ALL {
            for to in from.successors() {
                assert!(from.allows(*to), "{} -> {} should be legal", from, to);
            }
        }
    }

    #[test]
    fn non_edges_are_rejected() {
        // Spot-check a few edges that must never exist.
        assert!(!Status::Confirmed.allows(Status::Draft));
        assert!(!Status::Draft.allows(Status::Approved));
        assert!(!Status::Rejected.allows(Status::Approved));
        assert!(!Status::Submitted.allows(Status::Confirmed));

        // And the full complement of the table.
        for from in Status::ALL {
            for to in Status::ALL {
                let declared = from.successors().contains(&to);
                assert_eq!(from.allows(to), declared);
            }
        }
    }

    #[test]
    fn round_trips_through_names() {
        for status in Status::ALL {
            assert_eq!(Status::parse(status.as_str()), Some(status));
        }
        assert_eq!(Status::parse("nonsense"), None);
    }

    #[test]
    fn resubmission_cycle_is_open() {
        // Rejected and approved-with-considerations loop back to submitted.
        assert!(Status::Rejected.allows(Status::Submitted));
        assert!(Status::ApprovedWithConsiderations.allows(Status::Submitted));
        assert!(Status::InCorrection.allows(Status::Submitted));
    }
}
