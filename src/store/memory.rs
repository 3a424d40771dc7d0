//! In-memory submission store.
//!
//! A `HashMap` behind a `RwLock`; compare-and-set runs under the write
//! lock. All state is lost on restart, which is exactly what the tests
//! want.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{StoreError, SubmissionStore, RANKED_STATUSES};
use crate::domain::{
    EditorialDecision, EventTrack, HistoryEntry, PaymentStatus, ReviewerDecision, ScoreSet,
    Status, Submission, SubmissionContent, SubmissionId, UserId,
};

#[derive(Default)]
pub struct InMemoryStore {
    submissions: RwLock<HashMap<SubmissionId, Submission>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn modify<F>(&self, id: SubmissionId, apply: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Submission),
    {
        let mut submissions = self.submissions.write().await;
        let submission = submissions.get_mut(&id).ok_or(StoreError::Missing(id))?;
        apply(submission);
        Ok(())
    }
}

#[async_trait]
impl SubmissionStore for InMemoryStore {
    async fn insert(&self, submission: &Submission) -> Result<(), StoreError> {
        let mut submissions = self.submissions.write().await;
        submissions.insert(submission.id, submission.clone());
        Ok(())
    }

    async fn get(&self, id: SubmissionId) -> Result<Option<Submission>, StoreError> {
        let submissions = self.submissions.read().await;
        Ok(submissions.get(&id).cloned())
    }

    async fn get_status(&self, id: SubmissionId) -> Result<Option<Status>, StoreError> {
        let submissions = self.submissions.read().await;
        Ok(submissions.get(&id).map(|s| s.status))
    }

    async fn compare_and_set_status(
        &self,
        id: SubmissionId,
        expected: Status,
        next: Status,
    ) -> Result<bool, StoreError> {
        let mut submissions = self.submissions.write().await;
        match submissions.get_mut(&id) {
            Some(submission) if submission.status == expected => {
                submission.status = next;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_content(
        &self,
        id: SubmissionId,
        content: &SubmissionContent,
    ) -> Result<(), StoreError> {
        self.modify(id, |s| s.content = content.clone()).await
    }

    async fn set_payment_status(
        &self,
        id: SubmissionId,
        payment: PaymentStatus,
    ) -> Result<(), StoreError> {
        self.modify(id, |s| s.payment = payment).await
    }

    async fn set_reviewer(&self, id: SubmissionId, reviewer: UserId) -> Result<(), StoreError> {
        self.modify(id, |s| s.reviewer = Some(reviewer)).await
    }

    async fn record_review(
        &self,
        id: SubmissionId,
        scores: &ScoreSet,
        decision: ReviewerDecision,
        notes: &str,
        ranking_score: f64,
    ) -> Result<(), StoreError> {
        self.modify(id, |s| {
            s.scores = Some(*scores);
            s.reviewer_decision = Some(decision);
            s.reviewer_notes = Some(notes.to_string());
            s.ranking_score = ranking_score;
        })
        .await
    }

    async fn record_editorial_decision(
        &self,
        id: SubmissionId,
        decision: EditorialDecision,
        notes: &str,
    ) -> Result<(), StoreError> {
        self.modify(id, |s| {
            s.editorial_decision = Some(decision);
            s.editorial_notes = Some(notes.to_string());
        })
        .await
    }

    async fn append_history(
        &self,
        id: SubmissionId,
        entry: HistoryEntry,
    ) -> Result<(), StoreError> {
        self.modify(id, |s| s.history.push(entry)).await
    }

    async fn set_selected(&self, id: SubmissionId, selected: bool) -> Result<(), StoreError> {
        self.modify(id, |s| s.selected_for_presentation = selected)
            .await
    }

    async fn set_confirmation_deadline(
        &self,
        id: SubmissionId,
        deadline: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        self.modify(id, |s| s.confirmation_deadline = deadline).await
    }

    async fn set_presentation_confirmed(
        &self,
        id: SubmissionId,
        confirmed: bool,
    ) -> Result<(), StoreError> {
        self.modify(id, |s| s.presentation_confirmed = confirmed)
            .await
    }

    async fn set_poster(&self, id: SubmissionId, document: &str) -> Result<(), StoreError> {
        self.modify(id, |s| s.poster = Some(document.to_string()))
            .await
    }

    async fn count_by_author_and_event(
        &self,
        author: UserId,
        event: EventTrack,
    ) -> Result<u64, StoreError> {
        let submissions = self.submissions.read().await;
        Ok(submissions
            .values()
            .filter(|s| s.author == author && s.event == event)
            .count() as u64)
    }

    async fn list_ranking_candidates(
        &self,
        event: EventTrack,
    ) -> Result<Vec<Submission>, StoreError> {
        let submissions = self.submissions.read().await;
        Ok(submissions
            .values()
            .filter(|s| {
                s.event == event && s.ranking_score > 0.0 && RANKED_STATUSES.contains(&s.status)
            })
            .cloned()
            .collect())
    }

    async fn list_awaiting_confirmation(&self) -> Result<Vec<Submission>, StoreError> {
        let submissions = self.submissions.read().await;
        Ok(submissions
            .values()
            .filter(|s| s.status == Status::AwaitingConfirmation)
            .cloned()
            .collect())
    }

    async fn list_by_author(&self, author: UserId) -> Result<Vec<Submission>, StoreError> {
        let submissions = self.submissions.read().await;
        let mut found: Vec<Submission> = submissions
            .values()
            .filter(|s| s.author == author)
            .cloned()
            .collect();
        found.sort_by_key(|s| s.created_at);
        Ok(found)
    }

    async fn list_by_reviewer(&self, reviewer: UserId) -> Result<Vec<Submission>, StoreError> {
        let submissions = self.submissions.read().await;
        let mut found: Vec<Submission> = submissions
            .values()
            .filter(|s| s.reviewer == Some(reviewer))
            .cloned()
            .collect();
        found.sort_by_key(|s| s.created_at);
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::domain::{Language, SubmissionContent};

    fn submission(status: Status) -> Submission {
        Submission::new(
            Uuid::new_v4(),
            EventTrack::Enfrute,
            Uuid::new_v4(),
            SubmissionContent {
                title: "t".into(),
                body: "b".into(),
                authors_text: String::new(),
                language: Language::Pt,
                keywords: vec![],
                coauthors: vec![],
                presenting_coauthor: None,
            },
            status,
            PaymentStatus::Confirmed,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn compare_and_set_rejects_stale_expectations() {
        let store = InMemoryStore::new();
        let sub = submission(Status::Submitted);
        store.insert(&sub).await.unwrap();

        assert!(store
            .compare_and_set_status(sub.id, Status::Submitted, Status::UnderReview)
            .await
            .unwrap());
        // Second caller still believes the status is `submitted`.
        assert!(!store
            .compare_and_set_status(sub.id, Status::Submitted, Status::AwaitingDecision)
            .await
            .unwrap());
        assert_eq!(
            store.get_status(sub.id).await.unwrap(),
            Some(Status::UnderReview)
        );
    }

    #[tokio::test]
    async fn compare_and_set_on_missing_row_is_false() {
        let store = InMemoryStore::new();
        assert!(!store
            .compare_and_set_status(Uuid::new_v4(), Status::Draft, Status::Submitted)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn ranking_candidates_filter_by_score_and_status() {
        let store = InMemoryStore::new();

        let mut ranked = submission(Status::Approved);
        ranked.ranking_score = 7.5;
        store.insert(&ranked).await.unwrap();

        let mut unscored = submission(Status::Approved);
        unscored.ranking_score = 0.0;
        store.insert(&unscored).await.unwrap();

        let mut wrong_status = submission(Status::Submitted);
        wrong_status.ranking_score = 9.0;
        store.insert(&wrong_status).await.unwrap();

        let candidates = store
            .list_ranking_candidates(EventTrack::Enfrute)
            .await
            .unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, ranked.id);
    }
}
