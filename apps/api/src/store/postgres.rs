//! PostgreSQL record store. Typed columns for everything the lifecycle filters or
//! updates on; JSONB for the structured documents.

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, PgConnection, PgPool};

use crate::errors::AppError;
use crate::ids::RecordId;
use crate::models::application::{
    ApplicationFilter, ApplicationRecord, ApplicationStatus, StatusUpdate,
};
use crate::models::assessment::{AssessmentRecord, AssessmentVerdict, NewAssessment};
use crate::models::interview::{
    ChatTurn, InterviewRecord, InterviewStatus, NewInterview, VideoAnalysis,
};
use crate::models::job::{JobDescription, JobRecord};
use crate::models::resume::{Resume, ResumeRecord};
use crate::store::{
    check_job, check_resume, check_turns, check_verdict, check_video_analysis,
    final_interview_id, RecordStore, TranscriptAppend,
};

#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Row types
// ────────────────────────────────────────────────────────────────────────────

#[derive(FromRow)]
struct ResumeRow {
    id: String,
    candidate_id: String,
    original_filename: Option<String>,
    data: Json<Resume>,
    created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct JobRow {
    id: String,
    owner_id: String,
    original_filename: Option<String>,
    data: Json<JobDescription>,
    created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct ApplicationRow {
    id: String,
    candidate_id: String,
    resume_id: String,
    job_id: String,
    status: String,
    assessment_id: Option<String>,
    final_assessment_id: Option<String>,
    candidate_accept: Option<bool>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct InterviewRow {
    id: String,
    resume_id: String,
    job_id: String,
    candidate_id: String,
    application_id: Option<String>,
    scheduled_time: DateTime<Utc>,
    difficulty: String,
    custom_instructions: Option<String>,
    status: String,
    chat_history: Json<Vec<ChatTurn>>,
    video_analysis: Option<Json<VideoAnalysis>>,
    created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct AssessmentRow {
    id: String,
    application_id: String,
    interview_id: Option<String>,
    resume_id: String,
    job_id: String,
    verdict: Json<AssessmentVerdict>,
    created_at: DateTime<Utc>,
}

fn stored_id(raw: &str) -> Result<RecordId, AppError> {
    RecordId::parse(raw, "stored id")
        .map_err(|e| AppError::Internal(anyhow!("corrupt identifier in store: {e}")))
}

fn stored_opt_id(raw: Option<&str>) -> Result<Option<RecordId>, AppError> {
    raw.map(stored_id).transpose()
}

/// Text form of a unit-variant enum, as serde names it.
fn enum_text<T: Serialize>(value: &T) -> Result<String, AppError> {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(s)) => Ok(s),
        Ok(other) => Err(AppError::Internal(anyhow!("expected string enum, got {other}"))),
        Err(e) => Err(AppError::Internal(e.into())),
    }
}

fn parse_enum_text<T: DeserializeOwned>(raw: &str) -> Result<T, AppError> {
    serde_json::from_value(serde_json::Value::String(raw.to_string()))
        .map_err(|e| AppError::Internal(anyhow!("corrupt enum value '{raw}' in store: {e}")))
}

impl TryFrom<ResumeRow> for ResumeRecord {
    type Error = AppError;

    fn try_from(row: ResumeRow) -> Result<Self, Self::Error> {
        Ok(ResumeRecord {
            id: stored_id(&row.id)?,
            candidate_id: stored_id(&row.candidate_id)?,
            original_filename: row.original_filename,
            resume: row.data.0,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<JobRow> for JobRecord {
    type Error = AppError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        Ok(JobRecord {
            id: stored_id(&row.id)?,
            owner_id: stored_id(&row.owner_id)?,
            original_filename: row.original_filename,
            job: row.data.0,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<ApplicationRow> for ApplicationRecord {
    type Error = AppError;

    fn try_from(row: ApplicationRow) -> Result<Self, Self::Error> {
        Ok(ApplicationRecord {
            id: stored_id(&row.id)?,
            candidate_id: stored_id(&row.candidate_id)?,
            resume_id: stored_id(&row.resume_id)?,
            job_id: stored_id(&row.job_id)?,
            status: row
                .status
                .parse::<ApplicationStatus>()
                .map_err(|e| AppError::Internal(anyhow!(e)))?,
            assessment_id: stored_opt_id(row.assessment_id.as_deref())?,
            final_assessment_id: stored_opt_id(row.final_assessment_id.as_deref())?,
            candidate_accept: row.candidate_accept,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl TryFrom<InterviewRow> for InterviewRecord {
    type Error = AppError;

    fn try_from(row: InterviewRow) -> Result<Self, Self::Error> {
        Ok(InterviewRecord {
            id: stored_id(&row.id)?,
            resume_id: stored_id(&row.resume_id)?,
            job_id: stored_id(&row.job_id)?,
            candidate_id: stored_id(&row.candidate_id)?,
            application_id: stored_opt_id(row.application_id.as_deref())?,
            scheduled_time: row.scheduled_time,
            difficulty: parse_enum_text(&row.difficulty)?,
            custom_instructions: row.custom_instructions,
            status: parse_enum_text(&row.status)?,
            chat_history: row.chat_history.0,
            video_analysis: row.video_analysis.map(|j| j.0),
            created_at: row.created_at,
        })
    }
}

impl TryFrom<AssessmentRow> for AssessmentRecord {
    type Error = AppError;

    fn try_from(row: AssessmentRow) -> Result<Self, Self::Error> {
        Ok(AssessmentRecord {
            id: stored_id(&row.id)?,
            application_id: stored_id(&row.application_id)?,
            interview_id: stored_opt_id(row.interview_id.as_deref())?,
            resume_id: stored_id(&row.resume_id)?,
            job_id: stored_id(&row.job_id)?,
            verdict: row.verdict.0,
            created_at: row.created_at,
        })
    }
}

async fn insert_assessment_row(
    conn: &mut PgConnection,
    id: &RecordId,
    new: &NewAssessment,
) -> Result<AssessmentRow, AppError> {
    Ok(sqlx::query_as::<_, AssessmentRow>(
        r#"
        INSERT INTO assessments
            (id, application_id, interview_id, resume_id, job_id, kind, verdict)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, application_id, interview_id, resume_id, job_id, verdict, created_at
        "#,
    )
    .bind(id.as_str())
    .bind(new.application_id.as_str())
    .bind(new.interview_id.as_ref().map(RecordId::as_str))
    .bind(new.resume_id.as_str())
    .bind(new.job_id.as_str())
    .bind(new.verdict.kind_str())
    .bind(Json(&new.verdict))
    .fetch_one(conn)
    .await?)
}

// ────────────────────────────────────────────────────────────────────────────
// RecordStore
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn insert_resume(
        &self,
        candidate_id: &RecordId,
        original_filename: Option<String>,
        resume: Resume,
    ) -> Result<ResumeRecord, AppError> {
        check_resume(&resume)?;
        let row = sqlx::query_as::<_, ResumeRow>(
            r#"
            INSERT INTO resumes (id, candidate_id, original_filename, data)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(RecordId::generate().as_str())
        .bind(candidate_id.as_str())
        .bind(original_filename)
        .bind(Json(&resume))
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn get_resume(&self, id: &RecordId) -> Result<Option<ResumeRecord>, AppError> {
        sqlx::query_as::<_, ResumeRow>("SELECT * FROM resumes WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?
            .map(TryInto::try_into)
            .transpose()
    }

    async fn insert_job(
        &self,
        owner_id: &RecordId,
        original_filename: Option<String>,
        job: JobDescription,
    ) -> Result<JobRecord, AppError> {
        check_job(&job)?;
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            INSERT INTO job_descriptions (id, owner_id, original_filename, data)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(RecordId::generate().as_str())
        .bind(owner_id.as_str())
        .bind(original_filename)
        .bind(Json(&job))
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn get_job(&self, id: &RecordId) -> Result<Option<JobRecord>, AppError> {
        sqlx::query_as::<_, JobRow>("SELECT * FROM job_descriptions WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?
            .map(TryInto::try_into)
            .transpose()
    }

    async fn list_jobs(&self, owner_id: &RecordId) -> Result<Vec<JobRecord>, AppError> {
        sqlx::query_as::<_, JobRow>(
            "SELECT * FROM job_descriptions WHERE owner_id = $1 ORDER BY created_at DESC",
        )
        .bind(owner_id.as_str())
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(TryInto::try_into)
        .collect()
    }

    async fn insert_application(
        &self,
        candidate_id: &RecordId,
        resume_id: &RecordId,
        job_id: &RecordId,
    ) -> Result<ApplicationRecord, AppError> {
        let row = sqlx::query_as::<_, ApplicationRow>(
            r#"
            INSERT INTO applications (id, candidate_id, resume_id, job_id, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(RecordId::generate().as_str())
        .bind(candidate_id.as_str())
        .bind(resume_id.as_str())
        .bind(job_id.as_str())
        .bind(ApplicationStatus::Pending.as_str())
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn get_application(
        &self,
        id: &RecordId,
    ) -> Result<Option<ApplicationRecord>, AppError> {
        sqlx::query_as::<_, ApplicationRow>("SELECT * FROM applications WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?
            .map(TryInto::try_into)
            .transpose()
    }

    async fn list_applications(
        &self,
        filter: &ApplicationFilter,
    ) -> Result<Vec<ApplicationRecord>, AppError> {
        let (sql, id) = match filter {
            ApplicationFilter::Job(id) => ("SELECT * FROM applications WHERE job_id = $1", id),
            ApplicationFilter::Candidate(id) => {
                ("SELECT * FROM applications WHERE candidate_id = $1", id)
            }
        };
        sqlx::query_as::<_, ApplicationRow>(sql)
            .bind(id.as_str())
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(TryInto::try_into)
            .collect()
    }

    async fn transition_application(
        &self,
        id: &RecordId,
        from: ApplicationStatus,
        to: ApplicationStatus,
        update: StatusUpdate,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE applications
            SET status = $3,
                assessment_id = COALESCE($4, assessment_id),
                final_assessment_id = COALESCE($5, final_assessment_id),
                updated_at = now()
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(id.as_str())
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(update.assessment_id.as_ref().map(RecordId::as_str))
        .bind(update.final_assessment_id.as_ref().map(RecordId::as_str))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn set_candidate_decision(
        &self,
        id: &RecordId,
        accept: bool,
    ) -> Result<Option<ApplicationRecord>, AppError> {
        sqlx::query_as::<_, ApplicationRow>(
            r#"
            UPDATE applications
            SET candidate_accept = $2, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id.as_str())
        .bind(accept)
        .fetch_optional(&self.pool)
        .await?
        .map(TryInto::try_into)
        .transpose()
    }

    async fn insert_interview(
        &self,
        new: NewInterview,
    ) -> Result<Option<InterviewRecord>, AppError> {
        let mut tx = self.pool.begin().await?;

        if let Some(application_id) = &new.application_id {
            let claimed = sqlx::query(
                r#"
                UPDATE applications
                SET status = $3, updated_at = now()
                WHERE id = $1 AND status = $2
                "#,
            )
            .bind(application_id.as_str())
            .bind(ApplicationStatus::ResumeAssessed.as_str())
            .bind(ApplicationStatus::Scheduled.as_str())
            .execute(&mut *tx)
            .await?;
            if claimed.rows_affected() != 1 {
                return Ok(None);
            }
        }

        let row = sqlx::query_as::<_, InterviewRow>(
            r#"
            INSERT INTO interviews
                (id, resume_id, job_id, candidate_id, application_id,
                 scheduled_time, difficulty, custom_instructions, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(RecordId::generate().as_str())
        .bind(new.resume_id.as_str())
        .bind(new.job_id.as_str())
        .bind(new.candidate_id.as_str())
        .bind(new.application_id.as_ref().map(RecordId::as_str))
        .bind(new.scheduled_time)
        .bind(new.difficulty.as_str())
        .bind(new.custom_instructions)
        .bind(enum_text(&InterviewStatus::Scheduled)?)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        InterviewRecord::try_from(row).map(Some)
    }

    async fn get_interview(&self, id: &RecordId) -> Result<Option<InterviewRecord>, AppError> {
        sqlx::query_as::<_, InterviewRow>("SELECT * FROM interviews WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?
            .map(TryInto::try_into)
            .transpose()
    }

    async fn list_interviews(
        &self,
        candidate_id: Option<&RecordId>,
    ) -> Result<Vec<InterviewRecord>, AppError> {
        let rows = match candidate_id {
            Some(candidate_id) => {
                sqlx::query_as::<_, InterviewRow>(
                    "SELECT * FROM interviews WHERE candidate_id = $1 ORDER BY scheduled_time",
                )
                .bind(candidate_id.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, InterviewRow>(
                    "SELECT * FROM interviews ORDER BY scheduled_time",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn append_chat_turns(
        &self,
        id: &RecordId,
        turns: &[ChatTurn],
    ) -> Result<TranscriptAppend, AppError> {
        check_turns(turns)?;
        // jsonb `||` appends at the tail in one statement; existing turns are untouched.
        let len: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE interviews
            SET chat_history = chat_history || $2,
                status = CASE WHEN status = $3 THEN $4 ELSE status END
            WHERE id = $1 AND status <> $5
            RETURNING jsonb_array_length(chat_history)
            "#,
        )
        .bind(id.as_str())
        .bind(Json(turns))
        .bind(enum_text(&InterviewStatus::Scheduled)?)
        .bind(enum_text(&InterviewStatus::InProgress)?)
        .bind(enum_text(&InterviewStatus::Completed)?)
        .fetch_optional(&self.pool)
        .await?;
        if let Some(n) = len {
            return Ok(TranscriptAppend::Appended(n.max(0) as usize));
        }

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM interviews WHERE id = $1)")
                .bind(id.as_str())
                .fetch_one(&self.pool)
                .await?;
        Ok(if exists {
            TranscriptAppend::Closed
        } else {
            TranscriptAppend::Missing
        })
    }

    async fn set_video_analysis(
        &self,
        id: &RecordId,
        analysis: VideoAnalysis,
    ) -> Result<bool, AppError> {
        check_video_analysis(&analysis)?;
        let result = sqlx::query("UPDATE interviews SET video_analysis = $2 WHERE id = $1")
            .bind(id.as_str())
            .bind(Json(&analysis))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn insert_assessment(&self, new: NewAssessment) -> Result<AssessmentRecord, AppError> {
        check_verdict(&new)?;
        let mut conn = self.pool.acquire().await?;
        let row = insert_assessment_row(&mut conn, &RecordId::generate(), &new).await?;
        row.try_into()
    }

    async fn commit_final_assessment(
        &self,
        new: NewAssessment,
    ) -> Result<Option<AssessmentRecord>, AppError> {
        check_verdict(&new)?;
        let interview_id = final_interview_id(&new)?;
        let assessment_id = RecordId::generate();
        let completed = enum_text(&InterviewStatus::Completed)?;
        let mut tx = self.pool.begin().await?;

        let closed = sqlx::query(
            r#"
            UPDATE interviews
            SET status = $3
            WHERE id = $1 AND application_id = $2 AND status <> $3
            "#,
        )
        .bind(interview_id.as_str())
        .bind(new.application_id.as_str())
        .bind(&completed)
        .execute(&mut *tx)
        .await?;
        if closed.rows_affected() != 1 {
            return Ok(None);
        }

        let advanced = sqlx::query(
            r#"
            UPDATE applications
            SET status = $3, final_assessment_id = $4, updated_at = now()
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(new.application_id.as_str())
        .bind(ApplicationStatus::InterviewCompleted.as_str())
        .bind(ApplicationStatus::FinalAssessed.as_str())
        .bind(assessment_id.as_str())
        .execute(&mut *tx)
        .await?;
        if advanced.rows_affected() != 1 {
            return Ok(None);
        }

        let row = insert_assessment_row(&mut *tx, &assessment_id, &new).await?;
        tx.commit().await?;
        AssessmentRecord::try_from(row).map(Some)
    }

    async fn get_assessment(&self, id: &RecordId) -> Result<Option<AssessmentRecord>, AppError> {
        sqlx::query_as::<_, AssessmentRow>(
            r#"
            SELECT id, application_id, interview_id, resume_id, job_id, verdict, created_at
            FROM assessments WHERE id = $1
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?
        .map(TryInto::try_into)
        .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::interview::Difficulty;

    #[test]
    fn test_enum_text_matches_serde_names() {
        assert_eq!(enum_text(&InterviewStatus::InProgress).unwrap(), "in_progress");
        let parsed: Difficulty = parse_enum_text("hard").unwrap();
        assert_eq!(parsed, Difficulty::Hard);
        assert!(parse_enum_text::<Difficulty>("extreme").is_err());
    }

    #[test]
    fn test_stored_id_flags_corruption_as_internal() {
        assert!(matches!(stored_id("xyz"), Err(AppError::Internal(_))));
        assert!(stored_id("65f1a2b3c4d5e6f708192a3b").is_ok());
    }
}
