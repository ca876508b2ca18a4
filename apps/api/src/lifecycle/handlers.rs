//! Axum route handlers for the Application API.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::ids::RecordId;
use crate::lifecycle;
use crate::models::application::{ApplicationFilter, ApplicationRecord, ApplicationStatus};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SubmitApplicationRequest {
    pub candidate_id: String,
    pub resume_id: String,
    pub job_id: String,
}

#[derive(Debug, Serialize)]
pub struct SubmitApplicationResponse {
    pub application_id: RecordId,
    pub status: ApplicationStatus,
}

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub candidate_accept: bool,
}

#[derive(Debug, Serialize)]
pub struct DecisionResponse {
    pub application_id: RecordId,
    pub candidate_accept: bool,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /applications
///
/// Creates a pending application; resume scoring continues in the background.
pub async fn handle_submit(
    State(state): State<AppState>,
    Json(request): Json<SubmitApplicationRequest>,
) -> Result<(StatusCode, Json<SubmitApplicationResponse>), AppError> {
    let application = lifecycle::submit(
        state.store.as_ref(),
        &state.scoring,
        &request.candidate_id,
        &request.resume_id,
        &request.job_id,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(SubmitApplicationResponse {
            application_id: application.id,
            status: application.status,
        }),
    ))
}

/// GET /applications/:id
pub async fn handle_get_application(
    State(state): State<AppState>,
    Path(application_id): Path<String>,
) -> Result<Json<ApplicationRecord>, AppError> {
    let record = lifecycle::get_status(state.store.as_ref(), &application_id).await?;
    Ok(Json(record))
}

/// POST /applications/:id/decision
pub async fn handle_decision(
    State(state): State<AppState>,
    Path(application_id): Path<String>,
    Json(request): Json<DecisionRequest>,
) -> Result<Json<DecisionResponse>, AppError> {
    let record = lifecycle::set_candidate_decision(
        state.store.as_ref(),
        &application_id,
        request.candidate_accept,
    )
    .await?;

    Ok(Json(DecisionResponse {
        application_id: record.id,
        candidate_accept: request.candidate_accept,
    }))
}

/// GET /jobs/:id/applications
pub async fn handle_list_for_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<Vec<ApplicationRecord>>, AppError> {
    let filter = ApplicationFilter::Job(RecordId::parse(&job_id, "job_id")?);
    Ok(Json(lifecycle::list_by(state.store.as_ref(), &filter).await?))
}

/// GET /candidates/:id/applications
pub async fn handle_list_for_candidate(
    State(state): State<AppState>,
    Path(candidate_id): Path<String>,
) -> Result<Json<Vec<ApplicationRecord>>, AppError> {
    let filter = ApplicationFilter::Candidate(RecordId::parse(&candidate_id, "candidate_id")?);
    Ok(Json(lifecycle::list_by(state.store.as_ref(), &filter).await?))
}
