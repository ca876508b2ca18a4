//! Application State Machine: the only writer of `Application.status`.
//!
//! Every transition is a compare-and-set against the store (expected current
//! status), so a stale or duplicate writer can never move an application backwards.

use tracing::{error, info, warn};

use crate::errors::AppError;
use crate::fusion::FusionEngine;
use crate::ids::RecordId;
use crate::models::application::{
    ApplicationFilter, ApplicationRecord, ApplicationStatus, StatusUpdate,
};
use crate::models::assessment::{
    AssessmentRecord, AssessmentResult, AssessmentVerdict, NewAssessment,
};
use crate::models::interview::{InterviewRecord, NewInterview};
use crate::models::job::JobDescription;
use crate::models::resume::Resume;
use crate::store::RecordStore;

pub mod handlers;
pub mod machine;
pub mod worker;

pub use worker::{spawn_scoring_workers, ScoringQueue};

/// Result of the background resume-only scoring.
#[derive(Debug)]
pub enum ResumeScoringOutcome {
    Scored(AssessmentResult),
    Failed(String),
}

/// Creates a `pending` application and hands resume scoring to the worker pool.
/// Returns without waiting for the score.
pub async fn submit(
    store: &dyn RecordStore,
    queue: &ScoringQueue,
    candidate_id: &str,
    resume_id: &str,
    job_id: &str,
) -> Result<ApplicationRecord, AppError> {
    let candidate_id = RecordId::parse(candidate_id, "candidate_id")?;
    let resume_id = RecordId::parse(resume_id, "resume_id")?;
    let job_id = RecordId::parse(job_id, "job_id")?;

    if store.get_resume(&resume_id).await?.is_none() {
        return Err(AppError::NotFound(format!("Resume {resume_id} not found")));
    }
    if store.get_job(&job_id).await?.is_none() {
        return Err(AppError::NotFound(format!("Job {job_id} not found")));
    }

    let application = store
        .insert_application(&candidate_id, &resume_id, &job_id)
        .await?;
    info!(
        application_id = %application.id,
        %candidate_id,
        %job_id,
        "Application submitted"
    );

    if let Err(e) = queue.enqueue(application.id.clone()).await {
        // Nothing will ever score it; close it out rather than leave it pending.
        record_resume_assessment_outcome(
            store,
            &application.id,
            ResumeScoringOutcome::Failed(e.to_string()),
        )
        .await?;
        return Err(e);
    }
    Ok(application)
}

/// Records the background scoring outcome. Once the application has left
/// `pending` this is a no-op, so a duplicate delivery never rewrites history.
/// Returns the status the application ends up in.
pub async fn record_resume_assessment_outcome(
    store: &dyn RecordStore,
    application_id: &RecordId,
    outcome: ResumeScoringOutcome,
) -> Result<ApplicationStatus, AppError> {
    let application = load_application(store, application_id).await?;
    if application.status != ApplicationStatus::Pending {
        info!(
            %application_id,
            status = %application.status,
            "Resume assessment already recorded; ignoring"
        );
        return Ok(application.status);
    }

    let (to, update) = match outcome {
        ResumeScoringOutcome::Scored(result) => {
            let assessment = store
                .insert_assessment(NewAssessment {
                    application_id: application.id.clone(),
                    interview_id: None,
                    resume_id: application.resume_id.clone(),
                    job_id: application.job_id.clone(),
                    verdict: AssessmentVerdict::ResumeFit(result),
                })
                .await?;
            (
                ApplicationStatus::ResumeAssessed,
                StatusUpdate {
                    assessment_id: Some(assessment.id),
                    ..Default::default()
                },
            )
        }
        ResumeScoringOutcome::Failed(reason) => {
            warn!(%application_id, %reason, "Resume assessment failed");
            (ApplicationStatus::AssessmentFailed, StatusUpdate::default())
        }
    };

    if store
        .transition_application(application_id, ApplicationStatus::Pending, to, update)
        .await?
    {
        info!(%application_id, status = %to, "Application status updated");
        return Ok(to);
    }

    // Lost the compare-and-set to a concurrent writer; report what won.
    let current = load_application(store, application_id).await?;
    warn!(
        %application_id,
        status = %current.status,
        "Resume assessment raced with another writer"
    );
    Ok(current.status)
}

/// Loads the application's inputs, scores them and records the outcome.
/// Dangling references are integrity errors: logged, then captured as a failure.
pub async fn run_resume_scoring(
    store: &dyn RecordStore,
    fusion: &FusionEngine,
    application_id: &RecordId,
) -> Result<ApplicationStatus, AppError> {
    let application = store.get_application(application_id).await?.ok_or_else(|| {
        AppError::Integrity(format!("queued application {application_id} does not exist"))
    })?;

    let outcome = match load_scoring_inputs(store, &application).await {
        Ok((resume, job)) => match fusion.score_resume_fit(&resume, &job).await {
            Ok(result) => ResumeScoringOutcome::Scored(result),
            Err(e) => ResumeScoringOutcome::Failed(e.to_string()),
        },
        Err(e) => {
            error!(%application_id, code = e.code(), error = %e, "Cannot score application");
            ResumeScoringOutcome::Failed(e.to_string())
        }
    };

    record_resume_assessment_outcome(store, application_id, outcome).await
}

async fn load_scoring_inputs(
    store: &dyn RecordStore,
    application: &ApplicationRecord,
) -> Result<(Resume, JobDescription), AppError> {
    let resume = store.get_resume(&application.resume_id).await?.ok_or_else(|| {
        AppError::Integrity(format!(
            "application {} references missing resume {}",
            application.id, application.resume_id
        ))
    })?;
    let job = store.get_job(&application.job_id).await?.ok_or_else(|| {
        AppError::Integrity(format!(
            "application {} references missing job {}",
            application.id, application.job_id
        ))
    })?;
    Ok((resume.resume, job.job))
}

/// Sets `candidate_accept`. Never touches `status`; last write wins.
pub async fn set_candidate_decision(
    store: &dyn RecordStore,
    application_id: &str,
    accept: bool,
) -> Result<ApplicationRecord, AppError> {
    let id = RecordId::parse(application_id, "application_id")?;
    let record = store
        .set_candidate_decision(&id, accept)
        .await?
        .ok_or_else(|| not_found(&id))?;
    info!(application_id = %id, accept, "Candidate decision recorded");
    Ok(record)
}

pub async fn get_status(
    store: &dyn RecordStore,
    application_id: &str,
) -> Result<ApplicationRecord, AppError> {
    let id = RecordId::parse(application_id, "application_id")?;
    load_application(store, &id).await
}

pub async fn list_by(
    store: &dyn RecordStore,
    filter: &ApplicationFilter,
) -> Result<Vec<ApplicationRecord>, AppError> {
    store.list_applications(filter).await
}

/// Books an interview. With an `application_id` the application moves
/// `resume_assessed → scheduled` in the same write as the interview insert.
pub async fn schedule_interview(
    store: &dyn RecordStore,
    new: NewInterview,
) -> Result<InterviewRecord, AppError> {
    let from = ApplicationStatus::ResumeAssessed;
    let to = ApplicationStatus::Scheduled;
    check_edge(from, to)?;

    let application_id = new.application_id.clone();
    match store.insert_interview(new).await? {
        Some(interview) => {
            if let Some(id) = &application_id {
                info!(application_id = %id, %from, %to, "Application status updated");
            }
            Ok(interview)
        }
        None => match application_id {
            Some(id) => Err(lost_transition(store, &id, from).await),
            None => Err(AppError::Internal(anyhow::anyhow!(
                "interview insert without an application wrote nothing"
            ))),
        },
    }
}

/// `scheduled → interview_completed`. An application already at
/// `interview_completed` (a retried final scoring) is accepted as-is.
pub async fn mark_interview_completed(
    store: &dyn RecordStore,
    application_id: &RecordId,
) -> Result<(), AppError> {
    let application = load_application(store, application_id).await?;
    if application.status == ApplicationStatus::InterviewCompleted {
        return Ok(());
    }
    advance(
        store,
        application_id,
        ApplicationStatus::Scheduled,
        ApplicationStatus::InterviewCompleted,
        StatusUpdate::default(),
    )
    .await
}

/// `interview_completed → final_assessed`. The assessment is stored, referenced
/// and its interview completed in one write, or nothing is written.
pub async fn record_final_assessment(
    store: &dyn RecordStore,
    new: NewAssessment,
) -> Result<AssessmentRecord, AppError> {
    let from = ApplicationStatus::InterviewCompleted;
    let to = ApplicationStatus::FinalAssessed;
    check_edge(from, to)?;

    let application_id = new.application_id.clone();
    let interview_id = new.interview_id.clone();
    if let Some(record) = store.commit_final_assessment(new).await? {
        info!(%application_id, %from, %to, "Application status updated");
        return Ok(record);
    }

    let current = load_application(store, &application_id).await?;
    if current.status != from {
        return Err(lost_transition(store, &application_id, from).await);
    }
    Err(AppError::Validation(format!(
        "interview {} is already assessed or does not belong to application {application_id}",
        interview_id.map(|id| id.to_string()).unwrap_or_default()
    )))
}

async fn advance(
    store: &dyn RecordStore,
    application_id: &RecordId,
    from: ApplicationStatus,
    to: ApplicationStatus,
    update: StatusUpdate,
) -> Result<(), AppError> {
    check_edge(from, to)?;

    if store
        .transition_application(application_id, from, to, update)
        .await?
    {
        info!(%application_id, %from, %to, "Application status updated");
        return Ok(());
    }
    Err(lost_transition(store, application_id, from).await)
}

fn check_edge(from: ApplicationStatus, to: ApplicationStatus) -> Result<(), AppError> {
    if machine::can_transition(from, to) {
        Ok(())
    } else {
        Err(AppError::Internal(anyhow::anyhow!(
            "illegal lifecycle edge {from} -> {to}"
        )))
    }
}

/// Error for a compare-and-set that found the application somewhere other than `from`.
async fn lost_transition(
    store: &dyn RecordStore,
    application_id: &RecordId,
    from: ApplicationStatus,
) -> AppError {
    let current = match load_application(store, application_id).await {
        Ok(current) => current,
        Err(e) => return e,
    };
    let detail = if machine::is_terminal(current.status) {
        " (terminal)"
    } else {
        ""
    };
    AppError::Validation(format!(
        "application {application_id} is {}{detail}, expected {from}",
        current.status
    ))
}

async fn load_application(
    store: &dyn RecordStore,
    id: &RecordId,
) -> Result<ApplicationRecord, AppError> {
    store
        .get_application(id)
        .await?
        .ok_or_else(|| not_found(id))
}

fn not_found(id: &RecordId) -> AppError {
    AppError::NotFound(format!("Application {id} not found"))
}
