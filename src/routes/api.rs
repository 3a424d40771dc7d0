//! HTTP shell over the workflow components.
//!
//! The host (reverse proxy / identity layer) authenticates callers and
//! asserts identity, roles and capabilities through trusted headers; this
//! layer only translates requests into workflow calls and typed errors
//! into status codes. Notifications are dispatched after the call
//! returns, off the request path.

use std::collections::HashSet;
use std::sync::Arc;

use axum::extract::{FromRequestParts, Path, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::{Actor, Capability, Role};
use crate::certificates;
use crate::domain::{
    EditorialDecision, EventTrack, Notification, Outcome, ReviewerDecision, ScoreSet,
    SubmissionContent, SubmissionId, WorkflowError,
};
use crate::state::AppState;
use crate::workflow::NewSubmission;

impl IntoResponse for WorkflowError {
    fn into_response(self) -> Response {
        let status = match &self {
            WorkflowError::Unauthorized(_) => StatusCode::FORBIDDEN,
            WorkflowError::NotFound => StatusCode::NOT_FOUND,
            WorkflowError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            WorkflowError::InvalidTransition { .. } | WorkflowError::InvalidState(_) => {
                StatusCode::CONFLICT
            }
            WorkflowError::Store(err) => {
                tracing::error!(%err, "store failure");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Caller identity asserted by the host through trusted headers.
pub struct ActorContext(pub Actor);

#[axum::async_trait]
impl<S> FromRequestParts<S> for ActorContext
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<serde_json::Value>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        let id = header("x-actor-id")
            .and_then(|raw| Uuid::parse_str(&raw).ok())
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({ "error": "missing or malformed x-actor-id header" })),
                )
            })?;

        let mut actor = Actor::new(id);
        if let Some(roles) = header("x-actor-roles") {
            actor.roles = roles
                .split(',')
                .filter_map(|r| Role::parse(r.trim()))
                .collect();
        }
        if let Some(capabilities) = header("x-actor-capabilities") {
            actor.capabilities = capabilities
                .split(',')
                .filter_map(|c| Capability::parse(c.trim()))
                .collect();
        }
        actor.paid_registration = header("x-paid-registration")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok(ActorContext(actor))
    }
}

/// Relay the outcome's notifications off the request path. A failure here
/// never affects the already-committed workflow result.
fn dispatch(state: &Arc<AppState>, notifications: Vec<Notification>) {
    if notifications.is_empty() {
        return;
    }
    let state = state.clone();
    tokio::spawn(async move {
        for notification in notifications {
            match state.store.get(notification.submission_id()).await {
                Ok(Some(submission)) => state.notifier.dispatch(&notification, &submission),
                Ok(None) => {}
                Err(err) => {
                    tracing::error!(%err, "failed to load submission for notification");
                }
            }
        }
    });
}

fn outcome_body(id: SubmissionId, outcome: &Outcome) -> Json<serde_json::Value> {
    Json(json!({
        "submission_id": id,
        "status": outcome.new_status,
    }))
}

#[derive(Deserialize)]
pub struct CreateRequest {
    pub event: EventTrack,
    #[serde(default)]
    pub is_draft: bool,
    #[serde(flatten)]
    pub content: SubmissionContent,
}

pub async fn create_submission(
    State(state): State<Arc<AppState>>,
    ActorContext(actor): ActorContext,
    Json(request): Json<CreateRequest>,
) -> Result<impl IntoResponse, WorkflowError> {
    let new = NewSubmission {
        event: request.event,
        content: request.content,
    };
    let (id, outcome) = state
        .submissions()
        .create(&actor, new, request.is_draft)
        .await?;
    dispatch(&state, outcome.notifications.clone());
    Ok((StatusCode::CREATED, outcome_body(id, &outcome)))
}

pub async fn resubmit(
    State(state): State<Arc<AppState>>,
    ActorContext(actor): ActorContext,
    Path(id): Path<SubmissionId>,
    Json(content): Json<SubmissionContent>,
) -> Result<impl IntoResponse, WorkflowError> {
    let outcome = state.submissions().resubmit(&actor, id, content).await?;
    dispatch(&state, outcome.notifications.clone());
    Ok(outcome_body(id, &outcome))
}

/// Payment collaborator callback. Idempotent: repeated confirmations are
/// benign no-ops.
pub async fn confirm_payment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<SubmissionId>,
) -> Result<impl IntoResponse, WorkflowError> {
    let outcome = state.submissions().confirm_payment(id).await?;
    dispatch(&state, outcome.notifications.clone());
    Ok(outcome_body(id, &outcome))
}

#[derive(Deserialize)]
pub struct AssignRequest {
    pub reviewer_id: Uuid,
    #[serde(default)]
    pub reviewer_roles: Vec<String>,
}

pub async fn assign_reviewer(
    State(state): State<Arc<AppState>>,
    ActorContext(actor): ActorContext,
    Path(id): Path<SubmissionId>,
    Json(request): Json<AssignRequest>,
) -> Result<impl IntoResponse, WorkflowError> {
    let roles: HashSet<Role> = request
        .reviewer_roles
        .iter()
        .filter_map(|r| Role::parse(r))
        .collect();
    let outcome = state
        .editorial()
        .assign_reviewer(&actor, id, request.reviewer_id, &roles)
        .await?;
    dispatch(&state, outcome.notifications.clone());
    Ok(outcome_body(id, &outcome))
}

#[derive(Deserialize)]
pub struct ReviewRequest {
    pub scores: ScoreSet,
    pub decision: String,
    #[serde(default)]
    pub notes: String,
}

pub async fn submit_review(
    State(state): State<Arc<AppState>>,
    ActorContext(actor): ActorContext,
    Path(id): Path<SubmissionId>,
    Json(request): Json<ReviewRequest>,
) -> Result<impl IntoResponse, WorkflowError> {
    let decision = ReviewerDecision::parse(&request.decision).ok_or_else(|| {
        WorkflowError::Validation(format!("unknown reviewer decision: {}", request.decision))
    })?;
    let outcome = state
        .reviews()
        .submit_review(
            &actor,
            id,
            request.scores,
            decision,
            &request.notes,
            &state.config.ranking_weights,
        )
        .await?;
    dispatch(&state, outcome.notifications.clone());
    Ok(outcome_body(id, &outcome))
}

#[derive(Deserialize)]
pub struct DecisionRequest {
    pub decision: String,
    #[serde(default)]
    pub notes: String,
}

pub async fn make_decision(
    State(state): State<Arc<AppState>>,
    ActorContext(actor): ActorContext,
    Path(id): Path<SubmissionId>,
    Json(request): Json<DecisionRequest>,
) -> Result<impl IntoResponse, WorkflowError> {
    let decision = EditorialDecision::parse(&request.decision).ok_or_else(|| {
        WorkflowError::Validation(format!("unknown editorial decision: {}", request.decision))
    })?;
    let outcome = state
        .editorial()
        .make_decision(&actor, id, decision, &request.notes)
        .await?;
    dispatch(&state, outcome.notifications.clone());
    Ok(outcome_body(id, &outcome))
}

#[derive(Deserialize)]
pub struct PosterRequest {
    pub document: String,
}

pub async fn submit_poster(
    State(state): State<Arc<AppState>>,
    ActorContext(actor): ActorContext,
    Path(id): Path<SubmissionId>,
    Json(request): Json<PosterRequest>,
) -> Result<impl IntoResponse, WorkflowError> {
    let outcome = state
        .posters()
        .submit_poster(&actor, id, &request.document)
        .await?;
    dispatch(&state, outcome.notifications.clone());
    Ok(outcome_body(id, &outcome))
}

pub async fn confirm_presentation(
    State(state): State<Arc<AppState>>,
    ActorContext(actor): ActorContext,
    Path(id): Path<SubmissionId>,
) -> Result<impl IntoResponse, WorkflowError> {
    let outcome = state.ranking().confirm_presentation(&actor, id).await?;
    dispatch(&state, outcome.notifications.clone());
    Ok(outcome_body(id, &outcome))
}

pub async fn get_submission(
    State(state): State<Arc<AppState>>,
    ActorContext(actor): ActorContext,
    Path(id): Path<SubmissionId>,
) -> Result<impl IntoResponse, WorkflowError> {
    let submission = state.store.get(id).await?.ok_or(WorkflowError::NotFound)?;
    let privileged = actor.can(Capability::ManageWorkflow)
        || submission.author == actor.id
        || submission.reviewer == Some(actor.id);
    if !privileged {
        return Err(WorkflowError::Unauthorized(
            "not involved with this submission",
        ));
    }
    Ok(Json(submission))
}

pub async fn my_submissions(
    State(state): State<Arc<AppState>>,
    ActorContext(actor): ActorContext,
) -> Result<impl IntoResponse, WorkflowError> {
    let submissions = state.store.list_by_author(actor.id).await?;
    Ok(Json(submissions))
}

pub async fn review_queue(
    State(state): State<Arc<AppState>>,
    ActorContext(actor): ActorContext,
) -> Result<impl IntoResponse, WorkflowError> {
    let submissions = state.store.list_by_reviewer(actor.id).await?;
    Ok(Json(submissions))
}

fn ranking_entry(submission: &crate::domain::Submission) -> serde_json::Value {
    json!({
        "submission_id": submission.id,
        "event": submission.event,
        "title": submission.content.title,
        "ranking_score": submission.ranking_score,
        "status": submission.status,
        "selected_for_presentation": submission.selected_for_presentation,
    })
}

pub async fn event_ranking(
    State(state): State<Arc<AppState>>,
    Path(event): Path<String>,
) -> Result<impl IntoResponse, WorkflowError> {
    let event = EventTrack::parse(&event)
        .ok_or_else(|| WorkflowError::Validation(format!("unknown event: {}", event)))?;
    let ranking = state.ranking().rank_event(event).await?;
    Ok(Json(
        ranking.iter().map(ranking_entry).collect::<Vec<_>>(),
    ))
}

pub async fn general_ranking(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, WorkflowError> {
    let ranking = state.ranking().rank_general().await?;
    Ok(Json(
        ranking.iter().map(ranking_entry).collect::<Vec<_>>(),
    ))
}

/// Run selection and open the confirmation window for the newly selected.
pub async fn run_selection(
    State(state): State<Arc<AppState>>,
    ActorContext(actor): ActorContext,
) -> Result<impl IntoResponse, WorkflowError> {
    if !actor.can(Capability::ManageWorkflow) {
        return Err(WorkflowError::Unauthorized(
            "missing capability: manage_workflow",
        ));
    }

    let engine = state.ranking();
    let selection = engine.select_top().await?;
    let offers = engine
        .notify_selected(&selection.processed, state.clock.now())
        .await?;
    dispatch(&state, offers.notifications.clone());

    Ok(Json(json!({
        "selected": selection.processed,
        "offered": offers.processed,
        "failures": selection.failures.len() + offers.failures.len(),
    })))
}

/// Manual trigger of the deadline sweep (the binary also runs it on an
/// interval).
pub async fn run_deadline_sweep(
    State(state): State<Arc<AppState>>,
    ActorContext(actor): ActorContext,
) -> Result<impl IntoResponse, WorkflowError> {
    if !actor.can(Capability::ManageWorkflow) {
        return Err(WorkflowError::Unauthorized(
            "missing capability: manage_workflow",
        ));
    }

    let report = state.ranking().check_deadlines(state.clock.now()).await?;
    dispatch(&state, report.notifications.clone());

    Ok(Json(json!({
        "processed": report.processed,
        "failures": report.failures.len(),
    })))
}

pub async fn download_certificate(
    State(state): State<Arc<AppState>>,
    ActorContext(actor): ActorContext,
    Path(id): Path<SubmissionId>,
) -> Result<impl IntoResponse, WorkflowError> {
    let submission = state.store.get(id).await?.ok_or(WorkflowError::NotFound)?;

    if submission.author != actor.id && !actor.can(Capability::ManageWorkflow) {
        return Err(WorkflowError::Unauthorized(
            "only the author may download the certificate",
        ));
    }
    if !certificates::is_eligible(&submission) {
        return Err(WorkflowError::InvalidState(
            "submission is not eligible for a certificate".into(),
        ));
    }

    let folder = &state.config.certificates_folder;
    if let Err(err) = std::fs::create_dir_all(folder) {
        tracing::error!(%err, "failed to create certificates folder");
        return Err(WorkflowError::InvalidState(
            "certificate storage unavailable".into(),
        ));
    }
    let path = folder.join(format!("certificate-{}.pdf", submission.id));

    if let Err(err) = certificates::generate(&submission, &path) {
        tracing::error!(%err, "certificate generation failed");
        return Err(WorkflowError::InvalidState(
            "certificate generation failed".into(),
        ));
    }

    let content = std::fs::read(&path).map_err(|err| {
        tracing::error!(%err, "failed to read generated certificate");
        WorkflowError::InvalidState("certificate generation failed".into())
    })?;

    Ok(axum::response::Response::builder()
        .header("Content-Type", "application/pdf")
        .header(
            "Content-Disposition",
            format!("attachment; filename=\"certificate-{}.pdf\"", submission.id),
        )
        .body(axum::body::Body::from(content))
        .unwrap()
        .into_response())
}
