//! Explicit output events of workflow calls.
//!
//! Instead of firing side effects through an ambient hook mechanism, every
//! workflow operation returns the notifications the host should relay.
//! They are drained only after the state change has committed; a delivery
//! failure can never roll the transition back.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::status::Status;
use super::submission::{EditorialDecision, EventTrack};
use super::{SubmissionId, UserId};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    NewSubmission {
        submission_id: SubmissionId,
        event: EventTrack,
    },
    AssignedReviewer {
        submission_id: SubmissionId,
        reviewer: UserId,
    },
    ReviewComplete {
        submission_id: SubmissionId,
    },
    EditorialDecision {
        submission_id: SubmissionId,
        decision: EditorialDecision,
        notes: String,
    },
    ReturnedToReviewer {
        submission_id: SubmissionId,
    },
    PosterRequest {
        submission_id: SubmissionId,
    },
    ConfirmationNeeded {
        submission_id: SubmissionId,
        deadline: DateTime<Utc>,
    },
}

impl Notification {
    pub fn submission_id(&self) -> SubmissionId {
        match self {
            Notification::NewSubmission { submission_id, .. }
            | Notification::AssignedReviewer { submission_id, .. }
            | Notification::ReviewComplete { submission_id }
            | Notification::EditorialDecision { submission_id, .. }
            | Notification::ReturnedToReviewer { submission_id }
            | Notification::PosterRequest { submission_id }
            | Notification::ConfirmationNeeded { submission_id, .. } => *submission_id,
        }
    }
}

/// What a successful workflow call produced.
#[derive(Debug, Default)]
pub struct Outcome {
    pub new_status: Option<Status>,
    pub notifications: Vec<Notification>,
}

impl Outcome {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_status(status: Status) -> Self {
        Self {
            new_status: Some(status),
            notifications: Vec::new(),
        }
    }

    pub fn notify(mut self, notification: Notification) -> Self {
        self.notifications.push(notification);
        self
    }
}
