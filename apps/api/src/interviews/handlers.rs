//! Axum route handlers for the Interview and Assessment APIs.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::fusion::AnsweredQuestion;
use crate::ids::RecordId;
use crate::interviews::{self, AssessInput, QuestionInput, ScheduleInput};
use crate::models::assessment::{AssessmentRecord, FitmentRating};
use crate::models::interview::{ChatTurn, InterviewRecord, Speaker, VideoAnalysis};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ScheduleRequest {
    pub resume_id: String,
    pub job_id: String,
    pub candidate_id: String,
    #[serde(default)]
    pub application_id: Option<String>,
    pub scheduled_time: String,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub custom_instructions: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ScheduleResponse {
    pub interview_id: RecordId,
    pub scheduled_time: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct ListInterviewsQuery {
    pub candidate_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AppendTurnsRequest {
    pub turns: Vec<ChatTurn>,
}

#[derive(Debug, Serialize)]
pub struct AppendTurnsResponse {
    pub interview_id: RecordId,
    pub turn_count: usize,
}

#[derive(Debug, Serialize)]
pub struct VideoAnalysisResponse {
    pub interview_id: RecordId,
}

#[derive(Debug, Deserialize)]
pub struct NextQuestionRequest {
    #[serde(default)]
    pub resume: serde_json::Value,
    #[serde(default)]
    pub job_description: serde_json::Value,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub turns: Vec<AnsweredQuestion>,
    #[serde(default)]
    pub duration_seconds: u64,
}

#[derive(Debug, Serialize)]
pub struct NextQuestionResponse {
    pub next_question: String,
}

/// A chat message as sent by the interview client (`role` is "model" or "user").
#[derive(Debug, Deserialize)]
pub struct RoleMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct AssessRequest {
    pub job_id: String,
    pub resume_id: String,
    pub application_id: String,
    #[serde(default)]
    pub chat_history: Vec<RoleMessage>,
    #[serde(default)]
    pub difficulty: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AssessResponse {
    pub assessment_id: RecordId,
    pub capabilities_summary: String,
    pub fitment_rating: FitmentRating,
    pub justification: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_analysis_insights: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /interviews
pub async fn handle_schedule(
    State(state): State<AppState>,
    Json(request): Json<ScheduleRequest>,
) -> Result<(StatusCode, Json<ScheduleResponse>), AppError> {
    let interview = interviews::schedule(
        state.store.as_ref(),
        ScheduleInput {
            resume_id: request.resume_id,
            job_id: request.job_id,
            candidate_id: request.candidate_id,
            application_id: request.application_id,
            scheduled_time: request.scheduled_time,
            difficulty: request.difficulty,
            custom_instructions: request.custom_instructions,
        },
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(ScheduleResponse {
            interview_id: interview.id,
            scheduled_time: interview.scheduled_time,
        }),
    ))
}

/// GET /interviews/:id
pub async fn handle_get_interview(
    State(state): State<AppState>,
    Path(interview_id): Path<String>,
) -> Result<Json<InterviewRecord>, AppError> {
    Ok(Json(
        interviews::get_interview(state.store.as_ref(), &interview_id).await?,
    ))
}

/// GET /interviews?candidate_id=
pub async fn handle_list_interviews(
    State(state): State<AppState>,
    Query(query): Query<ListInterviewsQuery>,
) -> Result<Json<Vec<InterviewRecord>>, AppError> {
    Ok(Json(
        interviews::list_interviews(state.store.as_ref(), query.candidate_id.as_deref()).await?,
    ))
}

/// POST /interviews/:id/turns
pub async fn handle_append_turns(
    State(state): State<AppState>,
    Path(interview_id): Path<String>,
    Json(request): Json<AppendTurnsRequest>,
) -> Result<Json<AppendTurnsResponse>, AppError> {
    let interview_id = RecordId::parse(&interview_id, "interview_id")?;
    let turn_count =
        interviews::append_turns(state.store.as_ref(), interview_id.as_str(), &request.turns)
            .await?;
    Ok(Json(AppendTurnsResponse {
        interview_id,
        turn_count,
    }))
}

/// PUT /interviews/:id/video-analysis
pub async fn handle_put_video_analysis(
    State(state): State<AppState>,
    Path(interview_id): Path<String>,
    Json(analysis): Json<VideoAnalysis>,
) -> Result<Json<VideoAnalysisResponse>, AppError> {
    let interview_id =
        interviews::attach_video_analysis(state.store.as_ref(), &interview_id, analysis).await?;
    Ok(Json(VideoAnalysisResponse { interview_id }))
}

/// POST /interviews/:id/next-question
pub async fn handle_next_question(
    State(state): State<AppState>,
    Path(interview_id): Path<String>,
    Json(request): Json<NextQuestionRequest>,
) -> Result<Json<NextQuestionResponse>, AppError> {
    let next_question = interviews::next_question(
        state.store.as_ref(),
        &state.fusion,
        &interview_id,
        QuestionInput {
            resume: &request.resume,
            job: &request.job_description,
            difficulty: request.difficulty.as_deref(),
            turns: &request.turns,
            elapsed_secs: request.duration_seconds,
        },
    )
    .await?;
    Ok(Json(NextQuestionResponse { next_question }))
}

/// POST /interviews/:id/assess
///
/// Runs the final multi-modal assessment synchronously and returns the verdict.
pub async fn handle_assess(
    State(state): State<AppState>,
    Path(interview_id): Path<String>,
    Json(request): Json<AssessRequest>,
) -> Result<Json<AssessResponse>, AppError> {
    let chat_history = request
        .chat_history
        .into_iter()
        .map(|m| ChatTurn {
            speaker: Speaker::from_role(&m.role),
            content: m.content,
        })
        .collect();

    let (record, result) = interviews::assess(
        state.store.as_ref(),
        &state.fusion,
        &interview_id,
        AssessInput {
            resume_id: request.resume_id,
            job_id: request.job_id,
            application_id: request.application_id,
            chat_history,
            difficulty: request.difficulty,
        },
    )
    .await?;

    Ok(Json(AssessResponse {
        assessment_id: record.id,
        capabilities_summary: result.capabilities_summary,
        fitment_rating: result.fitment_rating,
        justification: result.justification,
        video_analysis_insights: result.video_analysis_insights,
    }))
}

/// GET /assessments/:id
pub async fn handle_get_assessment(
    State(state): State<AppState>,
    Path(assessment_id): Path<String>,
) -> Result<Json<AssessmentRecord>, AppError> {
    Ok(Json(
        interviews::get_assessment(state.store.as_ref(), &assessment_id).await?,
    ))
}
