pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};

use crate::ingest::handlers as ingest;
use crate::interviews::handlers as interviews;
use crate::lifecycle::handlers as applications;
use crate::media::handlers as media;
use crate::state::AppState;

/// Upload cap for resume / job-description documents.
const DOCUMENT_BODY_LIMIT: usize = 20 * 1024 * 1024;
/// Multipart framing on top of the raw video bytes.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let media_body_limit =
        usize::try_from(state.config.media_max_upload_bytes()).unwrap_or(usize::MAX);

    Router::new()
        .route("/health", get(health::health_handler))
        // Documents
        .route(
            "/resumes",
            post(ingest::handle_upload_resume).layer(DefaultBodyLimit::max(DOCUMENT_BODY_LIMIT)),
        )
        .route("/resumes/:id", get(ingest::handle_get_resume))
        .route(
            "/jobs",
            post(ingest::handle_upload_job).layer(DefaultBodyLimit::max(DOCUMENT_BODY_LIMIT)),
        )
        .route("/jobs/:id", get(ingest::handle_get_job))
        .route("/users/:id/jobs", get(ingest::handle_list_jobs_for_owner))
        // Applications
        .route("/applications", post(applications::handle_submit))
        .route("/applications/:id", get(applications::handle_get_application))
        .route("/applications/:id/decision", post(applications::handle_decision))
        .route("/jobs/:id/applications", get(applications::handle_list_for_job))
        .route(
            "/candidates/:id/applications",
            get(applications::handle_list_for_candidate),
        )
        // Interviews & assessments
        .route(
            "/interviews",
            post(interviews::handle_schedule).get(interviews::handle_list_interviews),
        )
        .route("/interviews/:id", get(interviews::handle_get_interview))
        .route("/interviews/:id/turns", post(interviews::handle_append_turns))
        .route(
            "/interviews/:id/video-analysis",
            put(interviews::handle_put_video_analysis),
        )
        .route(
            "/interviews/:id/next-question",
            post(interviews::handle_next_question),
        )
        .route("/interviews/:id/assess", post(interviews::handle_assess))
        .route("/assessments/:id", get(interviews::handle_get_assessment))
        // Media
        .route(
            "/media",
            post(media::handle_upload).layer(DefaultBodyLimit::max(
                media_body_limit.saturating_add(MULTIPART_OVERHEAD),
            )),
        )
        .route("/media/list/:candidate_id", get(media::handle_list))
        .route(
            "/media/:application_id/:candidate_id",
            get(media::handle_stream).delete(media::handle_delete),
        )
        .with_state(state)
}
