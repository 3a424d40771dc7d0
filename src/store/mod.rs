//! Persistence abstraction for submissions.
//!
//! The workflow components are written against this narrow interface, not
//! against a specific store. `memory` backs the tests, `postgres` the
//! deployment. The one non-obvious contract is `compare_and_set_status`:
//! the status write must be atomic relative to the expected value, so the
//! status machine's table check cannot be raced.

mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{
    EditorialDecision, EventTrack, HistoryEntry, PaymentStatus, ReviewerDecision, ScoreSet,
    Status, Submission, SubmissionContent, SubmissionId, UserId,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("submission {0} not found")]
    Missing(SubmissionId),

    #[error("corrupt record for {id}: {detail}")]
    Corrupt { id: SubmissionId, detail: String },
}

#[async_trait]
pub trait SubmissionStore: Send + Sync {
    async fn insert(&self, submission: &Submission) -> Result<(), StoreError>;

    async fn get(&self, id: SubmissionId) -> Result<Option<Submission>, StoreError>;

    async fn get_status(&self, id: SubmissionId) -> Result<Option<Status>, StoreError>;

    /// Write `next` only if the stored status still equals `expected`.
    /// Returns false when the row is gone or the status moved underneath us.
    async fn compare_and_set_status(
        &self,
        id: SubmissionId,
        expected: Status,
        next: Status,
    ) -> Result<bool, StoreError>;

    async fn update_content(
        &self,
        id: SubmissionId,
        content: &SubmissionContent,
    ) -> Result<(), StoreError>;

    async fn set_payment_status(
        &self,
        id: SubmissionId,
        payment: PaymentStatus,
    ) -> Result<(), StoreError>;

    async fn set_reviewer(&self, id: SubmissionId, reviewer: UserId) -> Result<(), StoreError>;

    async fn record_review(
        &self,
        id: SubmissionId,
        scores: &ScoreSet,
        decision: ReviewerDecision,
        notes: &str,
        ranking_score: f64,
    ) -> Result<(), StoreError>;

    async fn record_editorial_decision(
        &self,
        id: SubmissionId,
        decision: EditorialDecision,
        notes: &str,
    ) -> Result<(), StoreError>;

    async fn append_history(&self, id: SubmissionId, entry: HistoryEntry)
        -> Result<(), StoreError>;

    async fn set_selected(&self, id: SubmissionId, selected: bool) -> Result<(), StoreError>;

    async fn set_confirmation_deadline(
        &self,
        id: SubmissionId,
        deadline: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError>;

    async fn set_presentation_confirmed(
        &self,
        id: SubmissionId,
        confirmed: bool,
    ) -> Result<(), StoreError>;

    async fn set_poster(&self, id: SubmissionId, document: &str) -> Result<(), StoreError>;

    async fn count_by_author_and_event(
        &self,
        author: UserId,
        event: EventTrack,
    ) -> Result<u64, StoreError>;

    /// Candidate pool for ranking: score > 0 and status in
    /// {approved, poster_submitted, awaiting_confirmation, confirmed}.
    /// Ordering is left to the ranking engine.
    async fn list_ranking_candidates(
        &self,
        event: EventTrack,
    ) -> Result<Vec<Submission>, StoreError>;

    async fn list_awaiting_confirmation(&self) -> Result<Vec<Submission>, StoreError>;

    async fn list_by_author(&self, author: UserId) -> Result<Vec<Submission>, StoreError>;

    async fn list_by_reviewer(&self, reviewer: UserId) -> Result<Vec<Submission>, StoreError>;
}

/// Statuses that make a submission visible to the ranking.
pub(crate) const RANKED_STATUSES: [Status; 4] = [
    Status::Approved,
    Status::PosterSubmitted,
    Status::AwaitingConfirmation,
    Status::Confirmed,
];
