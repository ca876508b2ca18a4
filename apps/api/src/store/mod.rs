//! Structured Record Store: the single source of truth for all five record kinds.
//!
//! `AppState` holds an `Arc<dyn RecordStore>`; `PgRecordStore` backs production and
//! `MemoryRecordStore` backs tests and database-less local runs.
//! Payloads are validated here before they are written.

use async_trait::async_trait;

use crate::errors::AppError;
use crate::ids::RecordId;
use crate::models::application::{
    ApplicationFilter, ApplicationRecord, ApplicationStatus, StatusUpdate,
};
use crate::models::assessment::{AssessmentRecord, NewAssessment};
use crate::models::interview::{ChatTurn, InterviewRecord, NewInterview, VideoAnalysis};
use crate::models::job::{JobDescription, JobRecord};
use crate::models::resume::{Resume, ResumeRecord};

pub mod memory;
pub mod postgres;

pub use memory::MemoryRecordStore;
pub use postgres::PgRecordStore;

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert_resume(
        &self,
        candidate_id: &RecordId,
        original_filename: Option<String>,
        resume: Resume,
    ) -> Result<ResumeRecord, AppError>;

    async fn get_resume(&self, id: &RecordId) -> Result<Option<ResumeRecord>, AppError>;

    async fn insert_job(
        &self,
        owner_id: &RecordId,
        original_filename: Option<String>,
        job: JobDescription,
    ) -> Result<JobRecord, AppError>;

    async fn get_job(&self, id: &RecordId) -> Result<Option<JobRecord>, AppError>;

    /// Jobs created by `owner_id`, newest first.
    async fn list_jobs(&self, owner_id: &RecordId) -> Result<Vec<JobRecord>, AppError>;

    /// Creates an application in `pending`.
    async fn insert_application(
        &self,
        candidate_id: &RecordId,
        resume_id: &RecordId,
        job_id: &RecordId,
    ) -> Result<ApplicationRecord, AppError>;

    async fn get_application(&self, id: &RecordId)
        -> Result<Option<ApplicationRecord>, AppError>;

    async fn list_applications(
        &self,
        filter: &ApplicationFilter,
    ) -> Result<Vec<ApplicationRecord>, AppError>;

    /// Compare-and-set on `status`. Returns `false` (and writes nothing) when the
    /// application is absent or not currently in `from`.
    async fn transition_application(
        &self,
        id: &RecordId,
        from: ApplicationStatus,
        to: ApplicationStatus,
        update: StatusUpdate,
    ) -> Result<bool, AppError>;

    /// Last write wins. Returns the updated record, or `None` if absent.
    async fn set_candidate_decision(
        &self,
        id: &RecordId,
        accept: bool,
    ) -> Result<Option<ApplicationRecord>, AppError>;

    /// When `new.application_id` is set, the application moves
    /// `resume_assessed → scheduled` in the same write. Returns `None`, writing
    /// nothing, when that application is absent or not `resume_assessed`.
    async fn insert_interview(
        &self,
        new: NewInterview,
    ) -> Result<Option<InterviewRecord>, AppError>;

    async fn get_interview(&self, id: &RecordId) -> Result<Option<InterviewRecord>, AppError>;

    async fn list_interviews(
        &self,
        candidate_id: Option<&RecordId>,
    ) -> Result<Vec<InterviewRecord>, AppError>;

    /// Appends turns atomically at the end of the transcript of an interview that
    /// is not completed. A `scheduled` interview moves to `in_progress` in the same write.
    async fn append_chat_turns(
        &self,
        id: &RecordId,
        turns: &[ChatTurn],
    ) -> Result<TranscriptAppend, AppError>;

    async fn set_video_analysis(
        &self,
        id: &RecordId,
        analysis: VideoAnalysis,
    ) -> Result<bool, AppError>;

    async fn insert_assessment(&self, new: NewAssessment) -> Result<AssessmentRecord, AppError>;

    /// Inserts an interview-fit assessment, moves its application
    /// `interview_completed → final_assessed` referencing it and completes its
    /// interview, as one write. Returns `None`, writing nothing, unless the
    /// application is `interview_completed` and the interview belongs to it and
    /// is not yet completed.
    async fn commit_final_assessment(
        &self,
        new: NewAssessment,
    ) -> Result<Option<AssessmentRecord>, AppError>;

    async fn get_assessment(&self, id: &RecordId) -> Result<Option<AssessmentRecord>, AppError>;
}

/// Result of appending to an interview transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptAppend {
    /// New transcript length.
    Appended(usize),
    /// The interview is completed; nothing was written.
    Closed,
    Missing,
}

/// Boundary validation shared by both backends.
pub(crate) fn check_resume(resume: &Resume) -> Result<(), AppError> {
    resume.validate().map_err(AppError::Validation)
}

pub(crate) fn check_job(job: &JobDescription) -> Result<(), AppError> {
    job.validate().map_err(AppError::Validation)
}

pub(crate) fn check_turns(turns: &[ChatTurn]) -> Result<(), AppError> {
    if turns.iter().any(|t| t.content.trim().is_empty()) {
        return Err(AppError::Validation(
            "chat turns must have non-empty content".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn check_video_analysis(analysis: &VideoAnalysis) -> Result<(), AppError> {
    analysis.validate().map_err(AppError::Validation)
}

pub(crate) fn final_interview_id(new: &NewAssessment) -> Result<&RecordId, AppError> {
    new.interview_id.as_ref().ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!(
            "final assessment for application {} has no interview",
            new.application_id
        ))
    })
}

pub(crate) fn check_verdict(new: &NewAssessment) -> Result<(), AppError> {
    use crate::models::assessment::AssessmentVerdict;
    match &new.verdict {
        AssessmentVerdict::ResumeFit(r) => r.validate(),
        AssessmentVerdict::InterviewFit(f) => f.validate(),
    }
    .map_err(AppError::Validation)
}
