//! Axum route handlers for resume and job-description documents.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use serde::Serialize;

use crate::errors::AppError;
use crate::ids::RecordId;
use crate::ingest;
use crate::models::job::JobRecord;
use crate::models::resume::ResumeRecord;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ResumeUploadResponse {
    pub resume_id: RecordId,
    pub candidate_name: String,
}

#[derive(Debug, Serialize)]
pub struct JobUploadResponse {
    pub job_id: RecordId,
    pub job_title: String,
}

/// A document upload: the `file` part plus one owner id field.
struct DocumentForm {
    owner: String,
    filename: Option<String>,
    bytes: Bytes,
}

async fn read_document_form(
    mut multipart: Multipart,
    owner_field: &'static str,
) -> Result<DocumentForm, AppError> {
    let mut owner = None;
    let mut file = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == owner_field {
            owner = Some(field.text().await.map_err(multipart_error)?);
        } else if name == "file" {
            let filename = field.file_name().map(str::to_string);
            let bytes = field.bytes().await.map_err(multipart_error)?;
            file = Some((filename, bytes));
        }
    }

    let owner = owner.ok_or_else(|| {
        AppError::Validation(format!("multipart form is missing '{owner_field}'"))
    })?;
    let (filename, bytes) =
        file.ok_or_else(|| AppError::Validation("multipart form is missing 'file'".to_string()))?;
    Ok(DocumentForm {
        owner,
        filename,
        bytes,
    })
}

/// POST /resumes
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ResumeUploadResponse>), AppError> {
    let form = read_document_form(multipart, "candidate_id").await?;
    let record = ingest::ingest_resume(
        state.store.as_ref(),
        &state.fusion,
        &form.owner,
        form.filename,
        form.bytes,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(ResumeUploadResponse {
            candidate_name: record.resume.candidate_name().to_string(),
            resume_id: record.id,
        }),
    ))
}

/// GET /resumes/:id
pub async fn handle_get_resume(
    State(state): State<AppState>,
    Path(resume_id): Path<String>,
) -> Result<Json<ResumeRecord>, AppError> {
    Ok(Json(ingest::get_resume(state.store.as_ref(), &resume_id).await?))
}

/// POST /jobs
pub async fn handle_upload_job(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<JobUploadResponse>), AppError> {
    let form = read_document_form(multipart, "owner_id").await?;
    let record = ingest::ingest_job(
        state.store.as_ref(),
        &state.fusion,
        &form.owner,
        form.filename,
        form.bytes,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(JobUploadResponse {
            job_id: record.id,
            job_title: record.job.job_title,
        }),
    ))
}

/// GET /jobs/:id
pub async fn handle_get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobRecord>, AppError> {
    Ok(Json(ingest::get_job(state.store.as_ref(), &job_id).await?))
}

/// GET /users/:id/jobs
pub async fn handle_list_jobs_for_owner(
    State(state): State<AppState>,
    Path(owner_id): Path<String>,
) -> Result<Json<Vec<JobRecord>>, AppError> {
    Ok(Json(ingest::list_jobs(state.store.as_ref(), &owner_id).await?))
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> AppError {
    AppError::Validation(format!("invalid multipart body: {e}"))
}
