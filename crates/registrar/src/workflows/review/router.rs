use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::AppError;

use super::domain::{ActorId, ApplicationId, StepId};
use super::engine::Decision;
use super::repository::{ApplicationRepository, DocumentStore};
use super::service::ReviewService;
use super::views::{ApplicationStatusView, ReviewQueueEntry, TransitionView, WorkflowView};

#[derive(Debug, Deserialize)]
pub struct StartStepRequest {
    pub actor: ActorId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    Approve,
    Reject,
    MarkIncomplete,
}

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub actor: ActorId,
    pub decision: DecisionKind,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub expected_last_updated: Option<DateTime<Utc>>,
}

impl DecisionRequest {
    /// Missing notes on reject/incomplete are passed through as empty so the
    /// engine reports the violation.
    fn decision(&self) -> Decision {
        let notes = self.notes.clone();
        match self.decision {
            DecisionKind::Approve => Decision::Approve { notes },
            DecisionKind::Reject => Decision::reject(notes.unwrap_or_default()),
            DecisionKind::MarkIncomplete => Decision::mark_incomplete(notes.unwrap_or_default()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ReopenRequest {
    pub actor: ActorId,
    #[serde(default)]
    pub expected_last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct QueueParams {
    pub limit: Option<usize>,
}

/// Router builder exposing the staff review and student status endpoints.
pub fn review_router<R, D>(service: Arc<ReviewService<R, D>>) -> Router
where
    R: ApplicationRepository + 'static,
    D: DocumentStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/applications/:application_id/workflow",
            get(workflow_handler::<R, D>),
        )
        .route(
            "/api/v1/applications/:application_id/status",
            get(status_handler::<R, D>),
        )
        .route(
            "/api/v1/applications/:application_id/workflow/steps/:step/start",
            post(start_handler::<R, D>),
        )
        .route(
            "/api/v1/applications/:application_id/workflow/steps/:step/decision",
            post(decision_handler::<R, D>),
        )
        .route(
            "/api/v1/applications/:application_id/workflow/reopen",
            post(reopen_handler::<R, D>),
        )
        .route("/api/v1/review/queue", get(queue_handler::<R, D>))
        .with_state(service)
}

pub(crate) async fn workflow_handler<R, D>(
    State(service): State<Arc<ReviewService<R, D>>>,
    Path(application_id): Path<String>,
) -> Result<Json<WorkflowView>, AppError>
where
    R: ApplicationRepository + 'static,
    D: DocumentStore + 'static,
{
    let snapshot = service.snapshot(&ApplicationId(application_id))?;
    Ok(Json(WorkflowView::from(snapshot)))
}

pub(crate) async fn status_handler<R, D>(
    State(service): State<Arc<ReviewService<R, D>>>,
    Path(application_id): Path<String>,
) -> Result<Json<ApplicationStatusView>, AppError>
where
    R: ApplicationRepository + 'static,
    D: DocumentStore + 'static,
{
    let view = service.status_view(&ApplicationId(application_id))?;
    Ok(Json(view))
}

pub(crate) async fn start_handler<R, D>(
    State(service): State<Arc<ReviewService<R, D>>>,
    Path((application_id, step)): Path<(String, String)>,
    Json(request): Json<StartStepRequest>,
) -> Result<Json<WorkflowView>, AppError>
where
    R: ApplicationRepository + 'static,
    D: DocumentStore + 'static,
{
    let step: StepId = step.parse()?;
    let snapshot = service.start_step(&ApplicationId(application_id), step, &request.actor)?;
    Ok(Json(WorkflowView::from(snapshot)))
}

pub(crate) async fn decision_handler<R, D>(
    State(service): State<Arc<ReviewService<R, D>>>,
    Path((application_id, step)): Path<(String, String)>,
    Json(request): Json<DecisionRequest>,
) -> Result<Json<TransitionView>, AppError>
where
    R: ApplicationRepository + 'static,
    D: DocumentStore + 'static,
{
    let step: StepId = step.parse()?;
    let transition = service.decide(
        &ApplicationId(application_id),
        step,
        request.decision(),
        &request.actor,
        request.expected_last_updated,
    )?;
    Ok(Json(TransitionView {
        workflow: WorkflowView::from(transition.snapshot),
        record: transition.record,
    }))
}

pub(crate) async fn reopen_handler<R, D>(
    State(service): State<Arc<ReviewService<R, D>>>,
    Path(application_id): Path<String>,
    Json(request): Json<ReopenRequest>,
) -> Result<Json<TransitionView>, AppError>
where
    R: ApplicationRepository + 'static,
    D: DocumentStore + 'static,
{
    let transition = service.reopen(
        &ApplicationId(application_id),
        &request.actor,
        request.expected_last_updated,
    )?;
    Ok(Json(TransitionView {
        workflow: WorkflowView::from(transition.snapshot),
        record: transition.record,
    }))
}

pub(crate) async fn queue_handler<R, D>(
    State(service): State<Arc<ReviewService<R, D>>>,
    Query(params): Query<QueueParams>,
) -> Result<Json<Vec<ReviewQueueEntry>>, AppError>
where
    R: ApplicationRepository + 'static,
    D: DocumentStore + 'static,
{
    let entries = service.queue(params.limit)?;
    Ok(Json(entries))
}
