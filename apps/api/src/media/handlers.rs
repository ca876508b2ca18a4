//! Axum route handlers for interview media.

use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::Response,
    Json,
};
use serde::Serialize;
use tokio_util::io::ReaderStream;

use crate::errors::AppError;
use crate::ids::RecordId;
use crate::media::range::content_range;
use crate::media::store::{container_for_filename, content_type_for, MediaArtifact};
use crate::state::AppState;

/// Chunk size for streamed media bodies.
const STREAM_CHUNK_BYTES: usize = 64 * 1024;

// ────────────────────────────────────────────────────────────────────────────
// Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub application_id: RecordId,
    pub file_path: String,
    pub filename: String,
    pub size_mb: f64,
}

#[derive(Debug, Serialize)]
pub struct VideoEntry {
    pub application_id: String,
    pub filename: String,
    pub size_mb: f64,
    pub modified: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub candidate_id: RecordId,
    pub videos: Vec<VideoEntry>,
    pub total_count: usize,
    pub total_size_mb: f64,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted_count: usize,
    pub deleted_files: Vec<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /media
///
/// Multipart form: `application_id`, `candidate_id`, then the `video` part.
/// The video is streamed to disk, so both ids must precede it in the form.
pub async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut application_id: Option<RecordId> = None;
    let mut candidate_id: Option<RecordId> = None;
    let mut saved: Option<MediaArtifact> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "application_id" => {
                let raw = field.text().await.map_err(multipart_error)?;
                application_id = Some(RecordId::parse(&raw, "application_id")?);
            }
            "candidate_id" => {
                let raw = field.text().await.map_err(multipart_error)?;
                candidate_id = Some(RecordId::parse(&raw, "candidate_id")?);
            }
            "video" => {
                let (Some(app), Some(cand)) = (&application_id, &candidate_id) else {
                    return Err(AppError::Validation(
                        "application_id and candidate_id must be sent before the video part"
                            .to_string(),
                    ));
                };
                let container = container_for_filename(field.file_name())?;
                saved = Some(state.media.save(app, cand, field, container).await?);
            }
            _ => {}
        }
    }

    let (Some(application_id), Some(artifact)) = (application_id, saved) else {
        return Err(AppError::Validation(
            "multipart form requires application_id, candidate_id and video".to_string(),
        ));
    };

    Ok(Json(UploadResponse {
        application_id,
        file_path: artifact.path.display().to_string(),
        filename: artifact.filename,
        size_mb: to_mb(artifact.size_bytes),
    }))
}

/// GET /media/:application_id/:candidate_id
///
/// Serves the newest recording, as 206 partial content when a satisfiable
/// `Range` header is present and as 200 otherwise.
pub async fn handle_stream(
    State(state): State<AppState>,
    Path((application_id, candidate_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let application_id = RecordId::parse(&application_id, "application_id")?;
    let candidate_id = RecordId::parse(&candidate_id, "candidate_id")?;
    let range = headers
        .get(header::RANGE)
        .and_then(|value| value.to_str().ok());

    let fetch = state
        .media
        .fetch(&application_id, &candidate_id, range)
        .await?;

    let content_type = content_type_for(fetch.artifact.container());
    let content_length = fetch.content_length();
    let mut builder = Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CONTENT_LENGTH, content_length);

    builder = match fetch.span {
        Some(span) => builder
            .status(StatusCode::PARTIAL_CONTENT)
            .header(header::CONTENT_RANGE, content_range(span, fetch.total_size)),
        None => builder.status(StatusCode::OK),
    };

    let body = Body::from_stream(ReaderStream::with_capacity(fetch.reader, STREAM_CHUNK_BYTES));
    builder
        .body(body)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("building media response: {e}")))
}

/// GET /media/list/:candidate_id
pub async fn handle_list(
    State(state): State<AppState>,
    Path(candidate_id): Path<String>,
) -> Result<Json<ListResponse>, AppError> {
    let candidate_id = RecordId::parse(&candidate_id, "candidate_id")?;
    let artifacts = state.media.list(&candidate_id).await?;

    let total_bytes: u64 = artifacts.iter().map(|a| a.size_bytes).sum();
    let videos: Vec<VideoEntry> = artifacts
        .into_iter()
        .map(|a| VideoEntry {
            application_id: a.application_id,
            size_mb: to_mb(a.size_bytes),
            filename: a.filename,
            modified: a.modified,
        })
        .collect();

    Ok(Json(ListResponse {
        candidate_id,
        total_count: videos.len(),
        videos,
        total_size_mb: to_mb(total_bytes),
    }))
}

/// DELETE /media/:application_id/:candidate_id
pub async fn handle_delete(
    State(state): State<AppState>,
    Path((application_id, candidate_id)): Path<(String, String)>,
) -> Result<Json<DeleteResponse>, AppError> {
    let application_id = RecordId::parse(&application_id, "application_id")?;
    let candidate_id = RecordId::parse(&candidate_id, "candidate_id")?;
    let deleted_files = state.media.delete(&application_id, &candidate_id).await?;

    Ok(Json(DeleteResponse {
        deleted_count: deleted_files.len(),
        deleted_files,
    }))
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> AppError {
    AppError::Validation(format!("invalid multipart body: {e}"))
}

/// Megabytes, rounded to two decimals.
fn to_mb(bytes: u64) -> f64 {
    (bytes as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0
}
