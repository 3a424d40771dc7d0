//! End-to-end scenarios over the in-memory store.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use uuid::Uuid;

use sciflow::auth::{Actor, Capability, Role};
use sciflow::clock::{Clock, ManualClock};
use sciflow::domain::{
    EditorialDecision, EventTrack, Language, Notification, PaymentStatus, RankingWeights,
    ReviewerDecision, ScoreSet, Status, Submission, SubmissionContent, SubmissionId,
    WorkflowError,
};
use sciflow::ranking::{RankingEngine, SelectionConfig};
use sciflow::store::{InMemoryStore, SubmissionStore};
use sciflow::workflow::{
    EditorialWorkflow, NewSubmission, PosterWorkflow, ReviewWorkflow, SubmissionWorkflow,
};

struct Harness {
    store: Arc<InMemoryStore>,
    clock: Arc<ManualClock>,
}

impl Harness {
    fn new() -> Self {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        Self {
            store: Arc::new(InMemoryStore::new()),
            clock: Arc::new(ManualClock::new(start)),
        }
    }

    fn store_dyn(&self) -> Arc<dyn SubmissionStore> {
        self.store.clone()
    }

    fn submissions(&self, payment_gateway: bool) -> SubmissionWorkflow {
        SubmissionWorkflow::new(self.store_dyn(), self.clock.clone(), payment_gateway)
    }

    fn reviews(&self) -> ReviewWorkflow {
        ReviewWorkflow::new(self.store_dyn(), self.clock.clone())
    }

    fn editorial(&self) -> EditorialWorkflow {
        EditorialWorkflow::new(self.store_dyn(), self.clock.clone())
    }

    fn posters(&self) -> PosterWorkflow {
        PosterWorkflow::new(self.store_dyn())
    }

    fn ranking(&self, per_event: usize, general_extra: usize) -> RankingEngine {
        RankingEngine::new(
            self.store_dyn(),
            SelectionConfig {
                per_event,
                general_extra,
                confirmation_window: Duration::days(3),
            },
        )
    }

    async fn status_of(&self, id: SubmissionId) -> Status {
        self.store.get_status(id).await.unwrap().unwrap()
    }

    async fn get(&self, id: SubmissionId) -> Submission {
        self.store.get(id).await.unwrap().unwrap()
    }

    /// Seed a reviewed submission directly in a post-approval state.
    async fn seed_ranked(
        &self,
        event: EventTrack,
        score: f64,
        status: Status,
    ) -> Submission {
        let mut submission = Submission::new(
            Uuid::new_v4(),
            event,
            Uuid::new_v4(),
            valid_content(),
            status,
            PaymentStatus::Confirmed,
            self.clock.now(),
        );
        submission.ranking_score = score;
        self.store.insert(&submission).await.unwrap();
        submission
    }
}

fn valid_content() -> SubmissionContent {
    SubmissionContent {
        title: "Produtividade de cultivares de cebola em sistema de plantio direto".into(),
        body: "b".repeat(3300),
        authors_text: "Fulano de Tal; Beltrana de Souza".into(),
        language: Language::Pt,
        keywords: vec!["cebola".into(), "plantio direto".into(), "cultivares".into()],
        coauthors: vec![],
        presenting_coauthor: None,
    }
}

fn author() -> Actor {
    let mut actor = Actor::new(Uuid::new_v4());
    actor.paid_registration = true;
    actor
}

fn editor() -> Actor {
    let mut actor = Actor::new(Uuid::new_v4());
    actor.capabilities =
        HashSet::from([Capability::AssignReviewers, Capability::ManageWorkflow]);
    actor.roles = HashSet::from([Role::Editor]);
    actor
}

fn reviewer() -> Actor {
    let mut actor = Actor::new(Uuid::new_v4());
    actor.roles = HashSet::from([Role::Reviewer]);
    actor
}

fn scores(value: f64) -> ScoreSet {
    ScoreSet {
        originality: value,
        objectivity: value,
        organization: value,
        methodology: value,
        goal_adherence: value,
    }
}

fn reviewer_roles() -> HashSet<Role> {
    HashSet::from([Role::Reviewer])
}

#[tokio::test]
async fn quota_is_two_per_author_per_event() {
    let h = Harness::new();
    let workflow = h.submissions(false);
    let alice = author();

    for _ in 0..2 {
        workflow
            .create(
                &alice,
                NewSubmission {
                    event: EventTrack::Enfrute,
                    content: valid_content(),
                },
                false,
            )
            .await
            .unwrap();
    }

    let third = workflow
        .create(
            &alice,
            NewSubmission {
                event: EventTrack::Enfrute,
                content: valid_content(),
            },
            false,
        )
        .await;
    assert!(matches!(third, Err(WorkflowError::Validation(_))));

    // The same author still has both slots free on the other event.
    workflow
        .create(
            &alice,
            NewSubmission {
                event: EventTrack::Senco,
                content: valid_content(),
            },
            false,
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn unpaid_actor_cannot_submit_but_may_draft() {
    let h = Harness::new();
    let workflow = h.submissions(false);
    let mut unpaid = author();
    unpaid.paid_registration = false;

    let result = workflow
        .create(
            &unpaid,
            NewSubmission {
                event: EventTrack::Enfrute,
                content: valid_content(),
            },
            false,
        )
        .await;
    assert!(matches!(result, Err(WorkflowError::Unauthorized(_))));

    let (id, _) = workflow
        .create(
            &unpaid,
            NewSubmission {
                event: EventTrack::Enfrute,
                content: valid_content(),
            },
            true,
        )
        .await
        .unwrap();
    assert_eq!(h.status_of(id).await, Status::Draft);
}

#[tokio::test]
async fn review_to_decision_scenario() {
    let h = Harness::new();
    let alice = author();
    let ed = editor();
    let rev = reviewer();

    let (id, outcome) = h
        .submissions(false)
        .create(
            &alice,
            NewSubmission {
                event: EventTrack::Enfrute,
                content: valid_content(),
            },
            false,
        )
        .await
        .unwrap();
    assert_eq!(h.status_of(id).await, Status::Submitted);
    assert!(matches!(
        outcome.notifications[..],
        [Notification::NewSubmission { .. }]
    ));

    let outcome = h
        .editorial()
        .assign_reviewer(&ed, id, rev.id, &reviewer_roles())
        .await
        .unwrap();
    assert_eq!(h.status_of(id).await, Status::UnderReview);
    assert!(matches!(
        outcome.notifications[..],
        [Notification::AssignedReviewer { .. }]
    ));

    let outcome = h
        .reviews()
        .submit_review(
            &rev,
            id,
            scores(8.0),
            ReviewerDecision::Approved,
            "solid methodology",
            &RankingWeights::default(),
        )
        .await
        .unwrap();
    assert_eq!(h.status_of(id).await, Status::AwaitingDecision);
    assert!(matches!(
        outcome.notifications[..],
        [Notification::ReviewComplete { .. }]
    ));
    assert_eq!(h.get(id).await.ranking_score, 8.0);

    let outcome = h
        .editorial()
        .make_decision(&ed, id, EditorialDecision::Approve, "accepted")
        .await
        .unwrap();
    assert_eq!(h.status_of(id).await, Status::Approved);
    // Approval also asks for the poster.
    assert!(outcome
        .notifications
        .iter()
        .any(|n| matches!(n, Notification::PosterRequest { .. })));

    let record = h.get(id).await;
    assert_eq!(record.editorial_decision, Some(EditorialDecision::Approve));
    assert_eq!(record.history.len(), 2); // reviewer notes + editor notes
}

#[tokio::test]
async fn correction_loop_scenario() {
    let h = Harness::new();
    let alice = author();
    let ed = editor();
    let rev = reviewer();

    let (id, _) = h
        .submissions(false)
        .create(
            &alice,
            NewSubmission {
                event: EventTrack::Senco,
                content: valid_content(),
            },
            false,
        )
        .await
        .unwrap();
    h.editorial()
        .assign_reviewer(&ed, id, rev.id, &reviewer_roles())
        .await
        .unwrap();
    h.reviews()
        .submit_review(
            &rev,
            id,
            scores(6.0),
            ReviewerDecision::ApprovedWithConsiderations,
            "needs work",
            &RankingWeights::default(),
        )
        .await
        .unwrap();

    h.editorial()
        .make_decision(&ed, id, EditorialDecision::ReturnToAuthor, "fix the stats")
        .await
        .unwrap();
    assert_eq!(h.status_of(id).await, Status::InCorrection);

    // The reviewer may amend the scores mid-correction without forcing a
    // new editorial cycle.
    let outcome = h
        .reviews()
        .submit_review(
            &rev,
            id,
            scores(6.5),
            ReviewerDecision::ApprovedWithConsiderations,
            "slightly better",
            &RankingWeights::default(),
        )
        .await
        .unwrap();
    assert!(outcome.new_status.is_none());
    assert_eq!(h.status_of(id).await, Status::InCorrection);

    let outcome = h
        .submissions(false)
        .resubmit(&alice, id, valid_content())
        .await
        .unwrap();
    assert_eq!(h.status_of(id).await, Status::Submitted);
    assert!(matches!(
        outcome.notifications[..],
        [Notification::NewSubmission { .. }]
    ));

    // Resubmission leaves an author entry in the history.
    let record = h.get(id).await;
    assert!(record
        .history
        .iter()
        .any(|e| e.content.contains("corrections")));
}

#[tokio::test]
async fn resubmit_is_author_only_and_phase_checked() {
    let h = Harness::new();
    let alice = author();
    let (id, _) = h
        .submissions(false)
        .create(
            &alice,
            NewSubmission {
                event: EventTrack::Enfrute,
                content: valid_content(),
            },
            false,
        )
        .await
        .unwrap();

    let stranger = author();
    let result = h
        .submissions(false)
        .resubmit(&stranger, id, valid_content())
        .await;
    assert!(matches!(result, Err(WorkflowError::Unauthorized(_))));

    // `submitted` is not an editable phase.
    let result = h
        .submissions(false)
        .resubmit(&alice, id, valid_content())
        .await;
    assert!(matches!(result, Err(WorkflowError::InvalidState(_))));
}

#[tokio::test]
async fn payment_gateway_regime_and_double_confirmation() {
    let h = Harness::new();
    let workflow = h.submissions(true);
    let alice = author();

    let (id, outcome) = workflow
        .create(
            &alice,
            NewSubmission {
                event: EventTrack::Enfrute,
                content: valid_content(),
            },
            false,
        )
        .await
        .unwrap();
    assert_eq!(h.status_of(id).await, Status::PendingPayment);
    assert_eq!(h.get(id).await.payment, PaymentStatus::Pending);
    // No notification until the payment clears.
    assert!(outcome.notifications.is_empty());

    let outcome = workflow.confirm_payment(id).await.unwrap();
    assert_eq!(h.status_of(id).await, Status::Submitted);
    assert_eq!(h.get(id).await.payment, PaymentStatus::Confirmed);
    assert!(matches!(
        outcome.notifications[..],
        [Notification::NewSubmission { .. }]
    ));

    // A duplicate gateway callback is a benign no-op.
    let outcome = workflow.confirm_payment(id).await.unwrap();
    assert!(outcome.new_status.is_none());
    assert!(outcome.notifications.is_empty());
    assert_eq!(h.status_of(id).await, Status::Submitted);
}

#[tokio::test]
async fn payment_confirmation_never_publishes_a_draft() {
    let h = Harness::new();
    let workflow = h.submissions(true);
    let alice = author();

    // A draft may hold content that would never pass submission.
    let mut content = valid_content();
    content.body = "notes".into();
    content.keywords.clear();
    let (id, _) = workflow
        .create(
            &alice,
            NewSubmission {
                event: EventTrack::Enfrute,
                content,
            },
            true,
        )
        .await
        .unwrap();

    // The gateway callback records the payment but publishes nothing.
    let outcome = workflow.confirm_payment(id).await.unwrap();
    assert!(outcome.new_status.is_none());
    assert!(outcome.notifications.is_empty());
    assert_eq!(h.status_of(id).await, Status::Draft);
    assert_eq!(h.get(id).await.payment, PaymentStatus::Confirmed);

    // Finalizing still enforces the content rules.
    let invalid = h.get(id).await.content;
    let result = workflow.resubmit(&alice, id, invalid).await;
    assert!(matches!(result, Err(WorkflowError::Validation(_))));
    assert_eq!(h.status_of(id).await, Status::Draft);

    // With valid content the already-paid draft skips the payment gate.
    let outcome = workflow.resubmit(&alice, id, valid_content()).await.unwrap();
    assert_eq!(outcome.new_status, Some(Status::Submitted));
}

#[tokio::test]
async fn review_authorization_and_phase() {
    let h = Harness::new();
    let alice = author();
    let ed = editor();
    let rev = reviewer();

    let (id, _) = h
        .submissions(false)
        .create(
            &alice,
            NewSubmission {
                event: EventTrack::Enfrute,
                content: valid_content(),
            },
            false,
        )
        .await
        .unwrap();
    h.editorial()
        .assign_reviewer(&ed, id, rev.id, &reviewer_roles())
        .await
        .unwrap();

    // Someone other than the assigned reviewer.
    let impostor = reviewer();
    let result = h
        .reviews()
        .submit_review(
            &impostor,
            id,
            scores(9.0),
            ReviewerDecision::Approved,
            "",
            &RankingWeights::default(),
        )
        .await;
    assert!(matches!(result, Err(WorkflowError::Unauthorized(_))));

    // Out-of-range score.
    let mut bad = scores(9.0);
    bad.methodology = 11.0;
    let result = h
        .reviews()
        .submit_review(
            &rev,
            id,
            bad,
            ReviewerDecision::Approved,
            "",
            &RankingWeights::default(),
        )
        .await;
    assert!(matches!(result, Err(WorkflowError::Validation(_))));

    // Drive to approval, then a late review must be rejected.
    h.reviews()
        .submit_review(
            &rev,
            id,
            scores(9.0),
            ReviewerDecision::Approved,
            "",
            &RankingWeights::default(),
        )
        .await
        .unwrap();
    h.editorial()
        .make_decision(&ed, id, EditorialDecision::Approve, "")
        .await
        .unwrap();
    let result = h
        .reviews()
        .submit_review(
            &rev,
            id,
            scores(9.5),
            ReviewerDecision::Approved,
            "",
            &RankingWeights::default(),
        )
        .await;
    assert!(matches!(result, Err(WorkflowError::InvalidState(_))));
}

#[tokio::test]
async fn assignment_requires_capability_and_reviewer_role() {
    let h = Harness::new();
    let alice = author();
    let (id, _) = h
        .submissions(false)
        .create(
            &alice,
            NewSubmission {
                event: EventTrack::Enfrute,
                content: valid_content(),
            },
            false,
        )
        .await
        .unwrap();

    let result = h
        .editorial()
        .assign_reviewer(&alice, id, Uuid::new_v4(), &reviewer_roles())
        .await;
    assert!(matches!(result, Err(WorkflowError::Unauthorized(_))));

    let ed = editor();
    let result = h
        .editorial()
        .assign_reviewer(&ed, id, Uuid::new_v4(), &HashSet::from([Role::Author]))
        .await;
    assert!(matches!(result, Err(WorkflowError::Validation(_))));
}

#[tokio::test]
async fn selection_is_event_fair_with_general_top_up() {
    let h = Harness::new();
    let enfrute_best = h.seed_ranked(EventTrack::Enfrute, 9.0, Status::Approved).await;
    let enfrute_next = h.seed_ranked(EventTrack::Enfrute, 8.5, Status::Approved).await;
    let senco_best = h.seed_ranked(EventTrack::Senco, 5.0, Status::Approved).await;
    let _senco_low = h.seed_ranked(EventTrack::Senco, 4.0, Status::Approved).await;

    let engine = h.ranking(1, 1);
    let report = engine.select_top().await.unwrap();

    // One per event even though enfrute_next outscores senco_best, then
    // the general extra rewards the best remaining overall.
    let selected: Vec<SubmissionId> = report.processed.clone();
    assert!(selected.contains(&enfrute_best.id));
    assert!(selected.contains(&senco_best.id));
    assert!(selected.contains(&enfrute_next.id));
    assert_eq!(selected.len(), 3);
    assert!(report.failures.is_empty());
}

#[tokio::test]
async fn general_top_up_counts_prior_selections() {
    let h = Harness::new();
    let a = h.seed_ranked(EventTrack::Enfrute, 9.0, Status::Approved).await;
    let b = h.seed_ranked(EventTrack::Enfrute, 8.0, Status::Approved).await;
    let c = h.seed_ranked(EventTrack::Enfrute, 7.0, Status::Approved).await;

    // One per-event slot plus one general slot: a and b, never c.
    let engine = h.ranking(1, 1);
    let first: HashSet<SubmissionId> =
        engine.select_top().await.unwrap().processed.into_iter().collect();
    assert_eq!(first, HashSet::from([a.id, b.id]));

    // Re-running with no state change must not spill onto the next rank.
    let second: HashSet<SubmissionId> =
        engine.select_top().await.unwrap().processed.into_iter().collect();
    assert_eq!(first, second);
    assert!(!h.get(c.id).await.selected_for_presentation);
}

#[tokio::test]
async fn select_top_is_idempotent() {
    let h = Harness::new();
    h.seed_ranked(EventTrack::Enfrute, 9.0, Status::Approved).await;
    h.seed_ranked(EventTrack::Enfrute, 8.0, Status::Approved).await;
    h.seed_ranked(EventTrack::Senco, 7.0, Status::Approved).await;

    let engine = h.ranking(2, 1);
    let first: HashSet<SubmissionId> =
        engine.select_top().await.unwrap().processed.into_iter().collect();
    let second: HashSet<SubmissionId> =
        engine.select_top().await.unwrap().processed.into_iter().collect();
    assert_eq!(first, second);
}

#[tokio::test]
async fn ranking_order_is_deterministic_on_ties() {
    let h = Harness::new();
    let a = h.seed_ranked(EventTrack::Enfrute, 8.0, Status::Approved).await;
    let b = h.seed_ranked(EventTrack::Enfrute, 8.0, Status::Approved).await;

    let engine = h.ranking(6, 3);
    let ranking = engine.rank_event(EventTrack::Enfrute).await.unwrap();
    let ids: Vec<SubmissionId> = ranking.iter().map(|s| s.id).collect();
    let mut expected = vec![a.id, b.id];
    expected.sort();
    assert_eq!(ids, expected);
}

#[tokio::test]
async fn escalation_scenario() {
    let h = Harness::new();
    let a = h.seed_ranked(EventTrack::Enfrute, 9.0, Status::Approved).await;
    let b = h.seed_ranked(EventTrack::Enfrute, 7.0, Status::Approved).await;

    let engine = h.ranking(1, 0);
    let report = engine.select_top().await.unwrap();
    assert_eq!(report.processed, vec![a.id]);

    let now = h.clock.now();
    let offers = engine.notify_selected(&[a.id], now).await.unwrap();
    assert_eq!(h.status_of(a.id).await, Status::AwaitingConfirmation);
    assert_eq!(
        h.get(a.id).await.confirmation_deadline,
        Some(now + Duration::days(3))
    );
    assert!(matches!(
        offers.notifications[..],
        [Notification::ConfirmationNeeded { .. }]
    ));

    // Four days later the author still has not confirmed.
    h.clock.advance(Duration::days(4));
    let sweep = engine.check_deadlines(h.clock.now()).await.unwrap();

    let a_after = h.get(a.id).await;
    assert_eq!(a_after.status, Status::Approved);
    assert!(!a_after.selected_for_presentation);
    assert_eq!(a_after.confirmation_deadline, None);

    let b_after = h.get(b.id).await;
    assert_eq!(b_after.status, Status::AwaitingConfirmation);
    assert!(b_after.selected_for_presentation);
    assert_eq!(
        b_after.confirmation_deadline,
        Some(h.clock.now() + Duration::days(3))
    );

    assert!(sweep
        .notifications
        .iter()
        .any(|n| n.submission_id() == b.id));
}

#[tokio::test]
async fn deadline_sweep_ignores_unexpired_offers() {
    let h = Harness::new();
    let a = h.seed_ranked(EventTrack::Senco, 9.0, Status::Approved).await;

    let engine = h.ranking(1, 0);
    engine.select_top().await.unwrap();
    engine.notify_selected(&[a.id], h.clock.now()).await.unwrap();

    h.clock.advance(Duration::days(2));
    let sweep = engine.check_deadlines(h.clock.now()).await.unwrap();
    assert!(sweep.processed.is_empty());
    assert_eq!(h.status_of(a.id).await, Status::AwaitingConfirmation);
}

#[tokio::test]
async fn confirmation_scenario() {
    let h = Harness::new();
    let a = h.seed_ranked(EventTrack::Enfrute, 9.0, Status::Approved).await;

    let engine = h.ranking(1, 0);
    engine.select_top().await.unwrap();
    engine.notify_selected(&[a.id], h.clock.now()).await.unwrap();

    let stranger = author();
    let result = engine.confirm_presentation(&stranger, a.id).await;
    assert!(matches!(result, Err(WorkflowError::Unauthorized(_))));

    let mut owner = Actor::new(a.author);
    owner.paid_registration = true;
    engine.confirm_presentation(&owner, a.id).await.unwrap();

    let record = h.get(a.id).await;
    assert_eq!(record.status, Status::Confirmed);
    assert!(record.presentation_confirmed);

    // Confirming twice is an invalid state, not a double transition.
    let result = engine.confirm_presentation(&owner, a.id).await;
    assert!(matches!(result, Err(WorkflowError::InvalidState(_))));
}

#[tokio::test]
async fn poster_flow() {
    let h = Harness::new();
    let a = h.seed_ranked(EventTrack::Senco, 8.0, Status::Approved).await;
    let mut owner = Actor::new(a.author);
    owner.paid_registration = true;

    let posters = h.posters();
    let outcome = posters
        .submit_poster(&owner, a.id, "uploads/poster-final.pdf")
        .await
        .unwrap();
    assert_eq!(outcome.new_status, Some(Status::PosterSubmitted));

    // Replacing the poster keeps the status.
    let outcome = posters
        .submit_poster(&owner, a.id, "uploads/poster-final-v2.pdf")
        .await
        .unwrap();
    assert!(outcome.new_status.is_none());
    assert_eq!(
        h.get(a.id).await.poster.as_deref(),
        Some("uploads/poster-final-v2.pdf")
    );

    // A poster-submitted work can still be offered a slot and confirmed.
    let engine = h.ranking(1, 0);
    engine.select_top().await.unwrap();
    engine.notify_selected(&[a.id], h.clock.now()).await.unwrap();
    assert_eq!(h.status_of(a.id).await, Status::AwaitingConfirmation);
    engine.confirm_presentation(&owner, a.id).await.unwrap();
    assert_eq!(h.status_of(a.id).await, Status::Confirmed);
}

#[tokio::test]
async fn notify_selected_skips_submissions_not_ready() {
    let h = Harness::new();
    // In the candidate pool but already waiting on a confirmation.
    let waiting = h
        .seed_ranked(EventTrack::Enfrute, 9.0, Status::AwaitingConfirmation)
        .await;

    let engine = h.ranking(6, 3);
    let offers = engine
        .notify_selected(&[waiting.id], h.clock.now())
        .await
        .unwrap();
    assert!(offers.processed.is_empty());
    assert!(offers.notifications.is_empty());
}

#[tokio::test]
async fn draft_finalization_goes_through_resubmit() {
    let h = Harness::new();
    let workflow = h.submissions(false);
    let alice = author();

    let (id, _) = workflow
        .create(
            &alice,
            NewSubmission {
                event: EventTrack::Enfrute,
                content: valid_content(),
            },
            true,
        )
        .await
        .unwrap();
    assert_eq!(h.status_of(id).await, Status::Draft);

    let outcome = workflow.resubmit(&alice, id, valid_content()).await.unwrap();
    assert_eq!(outcome.new_status, Some(Status::Submitted));

    // Under a payment gateway, a finalized draft waits for payment first.
    let gated = h.submissions(true);
    let (gated_id, _) = gated
        .create(
            &alice,
            NewSubmission {
                event: EventTrack::Senco,
                content: valid_content(),
            },
            true,
        )
        .await
        .unwrap();
    let outcome = gated.resubmit(&alice, gated_id, valid_content()).await.unwrap();
    assert_eq!(outcome.new_status, Some(Status::PendingPayment));
    assert!(outcome.notifications.is_empty());
}
