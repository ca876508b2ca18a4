//! Interview Conductor: scheduling, transcript accumulation, signal-analysis
//! attachment, adaptive questioning and the final multi-modal assessment.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::fusion::{AnsweredQuestion, FusionEngine, InterviewFitInput};
use crate::ids::RecordId;
use crate::lifecycle;
use crate::models::application::ApplicationStatus;
use crate::models::assessment::{
    AssessmentRecord, AssessmentVerdict, FinalAssessmentResult, NewAssessment,
};
use crate::models::interview::{
    ChatTurn, Difficulty, InterviewRecord, InterviewStatus, NewInterview, VideoAnalysis,
};
use crate::store::{RecordStore, TranscriptAppend};

pub mod handlers;

/// Unvalidated scheduling input, as received over HTTP.
#[derive(Debug, Clone)]
pub struct ScheduleInput {
    pub resume_id: String,
    pub job_id: String,
    pub candidate_id: String,
    pub application_id: Option<String>,
    pub scheduled_time: String,
    pub difficulty: Option<String>,
    pub custom_instructions: Option<String>,
}

/// Unvalidated final-assessment input. `chat_history` may be empty, in which
/// case the stored transcript is used.
#[derive(Debug, Clone)]
pub struct AssessInput {
    pub resume_id: String,
    pub job_id: String,
    pub application_id: String,
    pub chat_history: Vec<ChatTurn>,
    pub difficulty: Option<String>,
}

pub async fn schedule(
    store: &dyn RecordStore,
    input: ScheduleInput,
) -> Result<InterviewRecord, AppError> {
    let resume_id = RecordId::parse(&input.resume_id, "resume_id")?;
    let job_id = RecordId::parse(&input.job_id, "job_id")?;
    let candidate_id = RecordId::parse(&input.candidate_id, "candidate_id")?;
    let application_id = input
        .application_id
        .as_deref()
        .map(|raw| RecordId::parse(raw, "application_id"))
        .transpose()?;
    let scheduled_time = parse_scheduled_time(&input.scheduled_time)?;
    let difficulty = parse_difficulty(input.difficulty.as_deref())?;

    if store.get_resume(&resume_id).await?.is_none() {
        return Err(AppError::NotFound(format!("Resume {resume_id} not found")));
    }
    if store.get_job(&job_id).await?.is_none() {
        return Err(AppError::NotFound(format!("Job {job_id} not found")));
    }
    if let Some(id) = &application_id {
        let application = store
            .get_application(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Application {id} not found")))?;
        if application.status != ApplicationStatus::ResumeAssessed {
            return Err(AppError::Validation(format!(
                "application {id} is {}, an interview can only be scheduled once the resume is assessed",
                application.status
            )));
        }
    }

    let interview = lifecycle::schedule_interview(
        store,
        NewInterview {
            resume_id,
            job_id,
            candidate_id,
            application_id,
            scheduled_time,
            difficulty,
            custom_instructions: input
                .custom_instructions
                .filter(|s| !s.trim().is_empty()),
        },
    )
    .await?;

    info!(
        interview_id = %interview.id,
        scheduled_time = %interview.scheduled_time,
        "Interview scheduled"
    );
    Ok(interview)
}

pub async fn get_interview(
    store: &dyn RecordStore,
    interview_id: &str,
) -> Result<InterviewRecord, AppError> {
    let id = RecordId::parse(interview_id, "interview_id")?;
    load_interview(store, &id).await
}

pub async fn list_interviews(
    store: &dyn RecordStore,
    candidate_id: Option<&str>,
) -> Result<Vec<InterviewRecord>, AppError> {
    let candidate_id = candidate_id
        .map(|raw| RecordId::parse(raw, "candidate_id"))
        .transpose()?;
    store.list_interviews(candidate_id.as_ref()).await
}

/// Appends turns to the end of the transcript. The first turn moves the
/// interview to `in_progress`; a completed interview accepts no more turns.
pub async fn append_turns(
    store: &dyn RecordStore,
    interview_id: &str,
    turns: &[ChatTurn],
) -> Result<usize, AppError> {
    let id = RecordId::parse(interview_id, "interview_id")?;
    if turns.is_empty() {
        return Err(AppError::Validation("turns must not be empty".to_string()));
    }

    match store.append_chat_turns(&id, turns).await? {
        TranscriptAppend::Appended(count) => Ok(count),
        TranscriptAppend::Closed => Err(transcript_closed(&id)),
        TranscriptAppend::Missing => Err(not_found(&id)),
    }
}

pub async fn attach_video_analysis(
    store: &dyn RecordStore,
    interview_id: &str,
    analysis: VideoAnalysis,
) -> Result<RecordId, AppError> {
    let id = RecordId::parse(interview_id, "interview_id")?;
    if !store.set_video_analysis(&id, analysis).await? {
        return Err(not_found(&id));
    }
    info!(interview_id = %id, "Video signal analysis attached");
    Ok(id)
}

/// Inputs for the next adaptive question; `difficulty` falls back to the
/// interview's own when absent.
pub struct QuestionInput<'a> {
    pub resume: &'a serde_json::Value,
    pub job: &'a serde_json::Value,
    pub difficulty: Option<&'a str>,
    pub turns: &'a [AnsweredQuestion],
    pub elapsed_secs: u64,
}

/// Next adaptive question for a live interview.
pub async fn next_question(
    store: &dyn RecordStore,
    fusion: &FusionEngine,
    interview_id: &str,
    input: QuestionInput<'_>,
) -> Result<String, AppError> {
    let id = RecordId::parse(interview_id, "interview_id")?;
    let interview = load_interview(store, &id).await?;
    let difficulty = match input.difficulty {
        Some(raw) => parse_difficulty(Some(raw))?,
        None => interview.difficulty,
    };

    Ok(fusion
        .next_question(
            input.resume,
            input.job,
            difficulty,
            input.turns,
            input.elapsed_secs,
        )
        .await?)
}

/// Final multi-modal assessment of a conducted interview.
///
/// The interview must have been scheduled for the application, and the resume
/// and job must be the application's own. Moves the application
/// `scheduled → interview_completed` before scoring; a failed scoring leaves it
/// there so the call can be retried.
pub async fn assess(
    store: &dyn RecordStore,
    fusion: &FusionEngine,
    interview_id: &str,
    input: AssessInput,
) -> Result<(AssessmentRecord, FinalAssessmentResult), AppError> {
    let interview_id = RecordId::parse(interview_id, "interview_id")?;
    let resume_id = RecordId::parse(&input.resume_id, "resume_id")?;
    let job_id = RecordId::parse(&input.job_id, "job_id")?;
    let application_id = RecordId::parse(&input.application_id, "application_id")?;
    let requested_difficulty = input
        .difficulty
        .as_deref()
        .map(|raw| parse_difficulty(Some(raw)))
        .transpose()?;

    let interview = load_interview(store, &interview_id).await?;
    let resume = store
        .get_resume(&resume_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resume {resume_id} not found")))?;
    let job = store
        .get_job(&job_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))?;
    let application = store
        .get_application(&application_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Application {application_id} not found")))?;

    if interview.application_id.as_ref() != Some(&application_id) {
        return Err(AppError::Validation(format!(
            "interview {interview_id} was not scheduled for application {application_id}"
        )));
    }
    if application.resume_id != resume_id || application.job_id != job_id {
        return Err(AppError::Validation(format!(
            "resume {resume_id} and job {job_id} do not match application {application_id}"
        )));
    }
    if interview.status == InterviewStatus::Completed {
        return Err(AppError::Validation(format!(
            "interview {interview_id} is already assessed"
        )));
    }
    if !matches!(
        application.status,
        ApplicationStatus::Scheduled | ApplicationStatus::InterviewCompleted
    ) {
        return Err(AppError::Validation(format!(
            "application {application_id} is {}, expected scheduled or interview_completed",
            application.status
        )));
    }

    // A transcript posted with the request is kept when nothing was streamed in.
    let transcript = if input.chat_history.is_empty() {
        interview.chat_history.clone()
    } else {
        if interview.chat_history.is_empty() {
            match store
                .append_chat_turns(&interview_id, &input.chat_history)
                .await?
            {
                TranscriptAppend::Appended(_) => {}
                TranscriptAppend::Closed => return Err(transcript_closed(&interview_id)),
                TranscriptAppend::Missing => return Err(not_found(&interview_id)),
            }
        }
        input.chat_history
    };
    if transcript.is_empty() {
        warn!(%interview_id, "Assessing an interview with an empty transcript");
    }

    lifecycle::mark_interview_completed(store, &application_id).await?;

    let result = fusion
        .score_interview_fit(InterviewFitInput {
            resume: &resume.resume,
            job: &job.job,
            transcript: &transcript,
            difficulty: requested_difficulty.unwrap_or(interview.difficulty),
            video_analysis: interview.video_analysis.as_ref(),
        })
        .await?;

    let record = lifecycle::record_final_assessment(
        store,
        NewAssessment {
            application_id: application_id.clone(),
            interview_id: Some(interview_id.clone()),
            resume_id,
            job_id,
            verdict: AssessmentVerdict::InterviewFit(result.clone()),
        },
    )
    .await?;

    info!(
        %interview_id,
        %application_id,
        assessment_id = %record.id,
        "Final assessment recorded"
    );
    Ok((record, result))
}

pub async fn get_assessment(
    store: &dyn RecordStore,
    assessment_id: &str,
) -> Result<AssessmentRecord, AppError> {
    let id = RecordId::parse(assessment_id, "assessment_id")?;
    store
        .get_assessment(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Assessment {id} not found")))
}

fn parse_scheduled_time(raw: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            AppError::Validation(format!(
                "scheduled_time '{raw}' is not an RFC 3339 timestamp: {e}"
            ))
        })
}

fn parse_difficulty(raw: Option<&str>) -> Result<Difficulty, AppError> {
    match raw {
        Some(raw) => raw.parse().map_err(AppError::Validation),
        None => Ok(Difficulty::default()),
    }
}

async fn load_interview(
    store: &dyn RecordStore,
    id: &RecordId,
) -> Result<InterviewRecord, AppError> {
    store
        .get_interview(id)
        .await?
        .ok_or_else(|| not_found(id))
}

fn not_found(id: &RecordId) -> AppError {
    AppError::NotFound(format!("Interview {id} not found"))
}

fn transcript_closed(id: &RecordId) -> AppError {
    AppError::Validation(format!(
        "interview {id} is completed; its transcript is closed"
    ))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::fusion::prompts::NO_VIDEO_ANALYSIS_NOTE;
    use crate::lifecycle::ResumeScoringOutcome;
    use crate::llm_client::testing::ScriptedModel;
    use crate::llm_client::LlmError;
    use crate::models::assessment::fixtures::resume_fit;
    use crate::models::assessment::FitmentRating;
    use crate::models::interview::{AudioMetrics, Speaker};
    use crate::models::job::fixtures::job;
    use crate::models::resume::fixtures::resume;
    use crate::store::MemoryRecordStore;

    const FINAL_JSON: &str = r#"{
        "capabilities_summary": "Strong systems engineer.",
        "fitment_rating": "Best Fit",
        "justification": "Clear, correct answers throughout.",
        "video_analysis_insights": "Calm delivery at a steady pace."
    }"#;

    struct Fixture {
        store: MemoryRecordStore,
        candidate_id: RecordId,
        resume_id: RecordId,
        job_id: RecordId,
        application_id: RecordId,
    }

    /// A stored resume, job and an application already at `resume_assessed`.
    async fn fixture() -> Fixture {
        let store = MemoryRecordStore::new();
        let candidate_id = RecordId::generate();
        let resume_id = store
            .insert_resume(&candidate_id, None, resume("Ada Lovelace"))
            .await
            .unwrap()
            .id;
        let job_id = store
            .insert_job(&RecordId::generate(), None, job("Backend Engineer"))
            .await
            .unwrap()
            .id;
        let application_id = store
            .insert_application(&candidate_id, &resume_id, &job_id)
            .await
            .unwrap()
            .id;
        lifecycle::record_resume_assessment_outcome(
            &store,
            &application_id,
            ResumeScoringOutcome::Scored(resume_fit(82.0)),
        )
        .await
        .unwrap();
        Fixture {
            store,
            candidate_id,
            resume_id,
            job_id,
            application_id,
        }
    }

    fn schedule_input(f: &Fixture, scheduled_time: &str) -> ScheduleInput {
        ScheduleInput {
            resume_id: f.resume_id.to_string(),
            job_id: f.job_id.to_string(),
            candidate_id: f.candidate_id.to_string(),
            application_id: Some(f.application_id.to_string()),
            scheduled_time: scheduled_time.to_string(),
            difficulty: Some("hard".to_string()),
            custom_instructions: None,
        }
    }

    fn assess_input(f: &Fixture) -> AssessInput {
        AssessInput {
            resume_id: f.resume_id.to_string(),
            job_id: f.job_id.to_string(),
            application_id: f.application_id.to_string(),
            chat_history: Vec::new(),
            difficulty: None,
        }
    }

    fn turn(speaker: Speaker, content: &str) -> ChatTurn {
        ChatTurn {
            speaker,
            content: content.to_string(),
        }
    }

    fn engine(model: ScriptedModel) -> FusionEngine {
        FusionEngine::new(Arc::new(model), Duration::from_secs(5))
    }

    async fn application_status(f: &Fixture) -> ApplicationStatus {
        f.store
            .get_application(&f.application_id)
            .await
            .unwrap()
            .unwrap()
            .status
    }

    #[tokio::test]
    async fn test_schedule_moves_application_to_scheduled() {
        let f = fixture().await;
        let interview = schedule(&f.store, schedule_input(&f, "2026-11-02T15:30:00+02:00"))
            .await
            .unwrap();

        assert_eq!(interview.status, InterviewStatus::Scheduled);
        assert_eq!(interview.difficulty, Difficulty::Hard);
        assert_eq!(
            interview.scheduled_time.to_rfc3339(),
            "2026-11-02T13:30:00+00:00"
        );
        assert_eq!(application_status(&f).await, ApplicationStatus::Scheduled);
    }

    #[tokio::test]
    async fn test_schedule_rejects_bad_timestamp() {
        let f = fixture().await;
        let err = schedule(&f.store, schedule_input(&f, "next tuesday"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(f.store.list_interviews(None).await.unwrap().is_empty());
        assert_eq!(application_status(&f).await, ApplicationStatus::ResumeAssessed);
    }

    #[tokio::test]
    async fn test_schedule_requires_assessed_application() {
        let f = fixture().await;
        schedule(&f.store, schedule_input(&f, "2026-11-02T09:00:00Z"))
            .await
            .unwrap();
        // Already scheduled: a second booking for the same application is refused.
        let err = schedule(&f.store, schedule_input(&f, "2026-11-03T09:00:00Z"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(f.store.list_interviews(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_turns_append_in_order_and_start_interview() {
        let f = fixture().await;
        let interview = schedule(&f.store, schedule_input(&f, "2026-11-02T09:00:00Z"))
            .await
            .unwrap();
        let id = interview.id.to_string();

        let count = append_turns(&f.store, &id, &[turn(Speaker::Interviewer, "Q1")])
            .await
            .unwrap();
        assert_eq!(count, 1);
        let count = append_turns(
            &f.store,
            &id,
            &[turn(Speaker::Candidate, "A1"), turn(Speaker::Interviewer, "Q2")],
        )
        .await
        .unwrap();
        assert_eq!(count, 3);

        let stored = get_interview(&f.store, &id).await.unwrap();
        assert_eq!(stored.status, InterviewStatus::InProgress);
        let contents: Vec<_> = stored.chat_history.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["Q1", "A1", "Q2"]);
    }

    #[tokio::test]
    async fn test_assess_without_video_reaches_final_assessed() {
        let f = fixture().await;
        let interview = schedule(&f.store, schedule_input(&f, "2026-11-02T09:00:00Z"))
            .await
            .unwrap();
        let id = interview.id.to_string();
        append_turns(
            &f.store,
            &id,
            &[turn(Speaker::Interviewer, "Q1"), turn(Speaker::Candidate, "A1")],
        )
        .await
        .unwrap();

        let fusion = engine(ScriptedModel::ok(FINAL_JSON));
        let (record, result) = assess(&f.store, &fusion, &id, assess_input(&f)).await.unwrap();

        assert_eq!(result.fitment_rating, FitmentRating::BestFit);
        assert!(result.video_analysis_insights.is_none());
        assert!(result.justification.contains(NO_VIDEO_ANALYSIS_NOTE));
        assert_eq!(record.interview_id.as_ref(), Some(&interview.id));

        let application = f
            .store
            .get_application(&f.application_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(application.status, ApplicationStatus::FinalAssessed);
        assert_eq!(application.final_assessment_id, Some(record.id));
        let stored = get_interview(&f.store, &id).await.unwrap();
        assert_eq!(stored.status, InterviewStatus::Completed);
    }

    #[tokio::test]
    async fn test_assess_uses_attached_video_analysis() {
        let f = fixture().await;
        let interview = schedule(&f.store, schedule_input(&f, "2026-11-02T09:00:00Z"))
            .await
            .unwrap();
        let id = interview.id.to_string();
        attach_video_analysis(
            &f.store,
            &id,
            VideoAnalysis {
                audio: Some(AudioMetrics {
                    speaking_rate_wpm: Some(138.0),
                    ..Default::default()
                }),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let mut input = assess_input(&f);
        input.chat_history = vec![turn(Speaker::Interviewer, "Q1"), turn(Speaker::Candidate, "A1")];
        let fusion = engine(ScriptedModel::ok(FINAL_JSON));
        let (_, result) = assess(&f.store, &fusion, &id, input).await.unwrap();

        assert!(result.video_analysis_insights.is_some());
        // The posted transcript was kept since nothing had been streamed in.
        let stored = get_interview(&f.store, &id).await.unwrap();
        assert_eq!(stored.chat_history.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_assessment_can_be_retried() {
        let f = fixture().await;
        let interview = schedule(&f.store, schedule_input(&f, "2026-11-02T09:00:00Z"))
            .await
            .unwrap();
        let id = interview.id.to_string();

        let failing = engine(ScriptedModel::replying(vec![Err(LlmError::EmptyContent)]));
        let err = assess(&f.store, &failing, &id, assess_input(&f))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Upstream(_)));
        assert_eq!(application_status(&f).await, ApplicationStatus::InterviewCompleted);

        let fusion = engine(ScriptedModel::ok(FINAL_JSON));
        assess(&f.store, &fusion, &id, assess_input(&f)).await.unwrap();
        assert_eq!(application_status(&f).await, ApplicationStatus::FinalAssessed);
    }

    #[tokio::test]
    async fn test_next_question_defaults_to_interview_difficulty() {
        let f = fixture().await;
        let interview = schedule(&f.store, schedule_input(&f, "2026-11-02T09:00:00Z"))
            .await
            .unwrap();
        let model = Arc::new(ScriptedModel::ok("Walk me through a recent outage."));
        let fusion = FusionEngine::new(model.clone(), Duration::from_secs(5));

        let question = next_question(
            &f.store,
            &fusion,
            interview.id.as_str(),
            QuestionInput {
                resume: &serde_json::json!({"skills": ["Rust"]}),
                job: &serde_json::json!({"job_title": "Backend Engineer"}),
                difficulty: None,
                turns: &[],
                elapsed_secs: 0,
            },
        )
        .await
        .unwrap();

        assert_eq!(question, "Walk me through a recent outage.");
        assert!(model.calls()[0].system.contains("(hard)"));
    }

    /// A second application for the same resume and job, at `resume_assessed`.
    async fn second_application(f: &Fixture) -> RecordId {
        let id = f
            .store
            .insert_application(&f.candidate_id, &f.resume_id, &f.job_id)
            .await
            .unwrap()
            .id;
        lifecycle::record_resume_assessment_outcome(
            &f.store,
            &id,
            ResumeScoringOutcome::Scored(resume_fit(70.0)),
        )
        .await
        .unwrap();
        id
    }

    #[tokio::test]
    async fn test_assess_refuses_interview_of_another_application() {
        let f = fixture().await;
        let own = schedule(&f.store, schedule_input(&f, "2026-11-02T09:00:00Z"))
            .await
            .unwrap();

        let other_id = second_application(&f).await;
        let mut other_input = schedule_input(&f, "2026-11-03T09:00:00Z");
        other_input.application_id = Some(other_id.to_string());
        schedule(&f.store, other_input).await.unwrap();

        let model = Arc::new(ScriptedModel::ok(FINAL_JSON));
        let fusion = FusionEngine::new(model.clone(), Duration::from_secs(5));
        let mut crossed = assess_input(&f);
        crossed.application_id = other_id.to_string();
        let err = assess(&f.store, &fusion, own.id.as_str(), crossed)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(model.calls().is_empty());
        let other = f.store.get_application(&other_id).await.unwrap().unwrap();
        assert_eq!(other.status, ApplicationStatus::Scheduled);

        // The rightful owner still gets its assessment, exactly once.
        assess(&f.store, &fusion, own.id.as_str(), assess_input(&f))
            .await
            .unwrap();
        let err = assess(&f.store, &fusion, own.id.as_str(), assess_input(&f))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(model.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_assess_requires_the_applications_resume_and_job() {
        let f = fixture().await;
        let interview = schedule(&f.store, schedule_input(&f, "2026-11-02T09:00:00Z"))
            .await
            .unwrap();
        let other_job = f
            .store
            .insert_job(&RecordId::generate(), None, job("Data Engineer"))
            .await
            .unwrap()
            .id;

        let mut input = assess_input(&f);
        input.job_id = other_job.to_string();
        let fusion = engine(ScriptedModel::ok(FINAL_JSON));
        let err = assess(&f.store, &fusion, interview.id.as_str(), input)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(application_status(&f).await, ApplicationStatus::Scheduled);
    }

    #[tokio::test]
    async fn test_transcript_closed_after_assessment() {
        let f = fixture().await;
        let interview = schedule(&f.store, schedule_input(&f, "2026-11-02T09:00:00Z"))
            .await
            .unwrap();
        let id = interview.id.to_string();
        let fusion = engine(ScriptedModel::ok(FINAL_JSON));
        assess(&f.store, &fusion, &id, assess_input(&f)).await.unwrap();

        let err = append_turns(&f.store, &id, &[turn(Speaker::Candidate, "late answer")])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(get_interview(&f.store, &id).await.unwrap().chat_history.is_empty());
    }

    #[tokio::test]
    async fn test_assess_unknown_interview_is_not_found() {
        let f = fixture().await;
        let fusion = engine(ScriptedModel::ok(FINAL_JSON));
        let err = assess(
            &f.store,
            &fusion,
            RecordId::generate().as_str(),
            assess_input(&f),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
