//! In-process record store. Used when no `DATABASE_URL` is configured and by tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::errors::AppError;
use crate::ids::RecordId;
use crate::models::application::{
    ApplicationFilter, ApplicationRecord, ApplicationStatus, StatusUpdate,
};
use crate::models::assessment::{AssessmentRecord, NewAssessment};
use crate::models::interview::{
    ChatTurn, InterviewRecord, InterviewStatus, NewInterview, VideoAnalysis,
};
use crate::models::job::{JobDescription, JobRecord};
use crate::models::resume::{Resume, ResumeRecord};
use crate::store::{
    check_job, check_resume, check_turns, check_verdict, check_video_analysis,
    final_interview_id, RecordStore, TranscriptAppend,
};

#[derive(Default)]
struct Tables {
    resumes: BTreeMap<RecordId, ResumeRecord>,
    jobs: BTreeMap<RecordId, JobRecord>,
    applications: BTreeMap<RecordId, ApplicationRecord>,
    interviews: BTreeMap<RecordId, InterviewRecord>,
    assessments: BTreeMap<RecordId, AssessmentRecord>,
}

#[derive(Default)]
pub struct MemoryRecordStore {
    tables: RwLock<Tables>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn insert_resume(
        &self,
        candidate_id: &RecordId,
        original_filename: Option<String>,
        resume: Resume,
    ) -> Result<ResumeRecord, AppError> {
        check_resume(&resume)?;
        let record = ResumeRecord {
            id: RecordId::generate(),
            candidate_id: candidate_id.clone(),
            original_filename,
            resume,
            created_at: Utc::now(),
        };
        self.tables
            .write()
            .await
            .resumes
            .insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn get_resume(&self, id: &RecordId) -> Result<Option<ResumeRecord>, AppError> {
        Ok(self.tables.read().await.resumes.get(id).cloned())
    }

    async fn insert_job(
        &self,
        owner_id: &RecordId,
        original_filename: Option<String>,
        job: JobDescription,
    ) -> Result<JobRecord, AppError> {
        check_job(&job)?;
        let record = JobRecord {
            id: RecordId::generate(),
            owner_id: owner_id.clone(),
            original_filename,
            job,
            created_at: Utc::now(),
        };
        self.tables
            .write()
            .await
            .jobs
            .insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn get_job(&self, id: &RecordId) -> Result<Option<JobRecord>, AppError> {
        Ok(self.tables.read().await.jobs.get(id).cloned())
    }

    async fn list_jobs(&self, owner_id: &RecordId) -> Result<Vec<JobRecord>, AppError> {
        let mut jobs: Vec<JobRecord> = self
            .tables
            .read()
            .await
            .jobs
            .values()
            .filter(|j| &j.owner_id == owner_id)
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs)
    }

    async fn insert_application(
        &self,
        candidate_id: &RecordId,
        resume_id: &RecordId,
        job_id: &RecordId,
    ) -> Result<ApplicationRecord, AppError> {
        let now = Utc::now();
        let record = ApplicationRecord {
            id: RecordId::generate(),
            candidate_id: candidate_id.clone(),
            resume_id: resume_id.clone(),
            job_id: job_id.clone(),
            status: ApplicationStatus::Pending,
            assessment_id: None,
            final_assessment_id: None,
            candidate_accept: None,
            created_at: now,
            updated_at: now,
        };
        self.tables
            .write()
            .await
            .applications
            .insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn get_application(
        &self,
        id: &RecordId,
    ) -> Result<Option<ApplicationRecord>, AppError> {
        Ok(self.tables.read().await.applications.get(id).cloned())
    }

    async fn list_applications(
        &self,
        filter: &ApplicationFilter,
    ) -> Result<Vec<ApplicationRecord>, AppError> {
        Ok(self
            .tables
            .read()
            .await
            .applications
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect())
    }

    async fn transition_application(
        &self,
        id: &RecordId,
        from: ApplicationStatus,
        to: ApplicationStatus,
        update: StatusUpdate,
    ) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        let Some(record) = tables.applications.get_mut(id) else {
            return Ok(false);
        };
        if record.status != from {
            return Ok(false);
        }
        record.status = to;
        if update.assessment_id.is_some() {
            record.assessment_id = update.assessment_id;
        }
        if update.final_assessment_id.is_some() {
            record.final_assessment_id = update.final_assessment_id;
        }
        record.updated_at = Utc::now();
        Ok(true)
    }

    async fn set_candidate_decision(
        &self,
        id: &RecordId,
        accept: bool,
    ) -> Result<Option<ApplicationRecord>, AppError> {
        let mut tables = self.tables.write().await;
        Ok(tables.applications.get_mut(id).map(|record| {
            record.candidate_accept = Some(accept);
            record.updated_at = Utc::now();
            record.clone()
        }))
    }

    async fn insert_interview(
        &self,
        new: NewInterview,
    ) -> Result<Option<InterviewRecord>, AppError> {
        let mut tables = self.tables.write().await;
        if let Some(application_id) = &new.application_id {
            let Some(application) = tables.applications.get_mut(application_id) else {
                return Ok(None);
            };
            if application.status != ApplicationStatus::ResumeAssessed {
                return Ok(None);
            }
            application.status = ApplicationStatus::Scheduled;
            application.updated_at = Utc::now();
        }

        let record = InterviewRecord {
            id: RecordId::generate(),
            resume_id: new.resume_id,
            job_id: new.job_id,
            candidate_id: new.candidate_id,
            application_id: new.application_id,
            scheduled_time: new.scheduled_time,
            difficulty: new.difficulty,
            custom_instructions: new.custom_instructions,
            status: InterviewStatus::Scheduled,
            chat_history: Vec::new(),
            video_analysis: None,
            created_at: Utc::now(),
        };
        tables.interviews.insert(record.id.clone(), record.clone());
        Ok(Some(record))
    }

    async fn get_interview(&self, id: &RecordId) -> Result<Option<InterviewRecord>, AppError> {
        Ok(self.tables.read().await.interviews.get(id).cloned())
    }

    async fn list_interviews(
        &self,
        candidate_id: Option<&RecordId>,
    ) -> Result<Vec<InterviewRecord>, AppError> {
        Ok(self
            .tables
            .read()
            .await
            .interviews
            .values()
            .filter(|i| candidate_id.map_or(true, |c| &i.candidate_id == c))
            .cloned()
            .collect())
    }

    async fn append_chat_turns(
        &self,
        id: &RecordId,
        turns: &[ChatTurn],
    ) -> Result<TranscriptAppend, AppError> {
        check_turns(turns)?;
        let mut tables = self.tables.write().await;
        let Some(record) = tables.interviews.get_mut(id) else {
            return Ok(TranscriptAppend::Missing);
        };
        match record.status {
            InterviewStatus::Completed => return Ok(TranscriptAppend::Closed),
            InterviewStatus::Scheduled => record.status = InterviewStatus::InProgress,
            InterviewStatus::InProgress => {}
        }
        record.chat_history.extend_from_slice(turns);
        Ok(TranscriptAppend::Appended(record.chat_history.len()))
    }

    async fn set_video_analysis(
        &self,
        id: &RecordId,
        analysis: VideoAnalysis,
    ) -> Result<bool, AppError> {
        check_video_analysis(&analysis)?;
        let mut tables = self.tables.write().await;
        Ok(match tables.interviews.get_mut(id) {
            Some(record) => {
                record.video_analysis = Some(analysis);
                true
            }
            None => false,
        })
    }

    async fn insert_assessment(&self, new: NewAssessment) -> Result<AssessmentRecord, AppError> {
        check_verdict(&new)?;
        let record = AssessmentRecord {
            id: RecordId::generate(),
            application_id: new.application_id,
            interview_id: new.interview_id,
            resume_id: new.resume_id,
            job_id: new.job_id,
            verdict: new.verdict,
            created_at: Utc::now(),
        };
        self.tables
            .write()
            .await
            .assessments
            .insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn commit_final_assessment(
        &self,
        new: NewAssessment,
    ) -> Result<Option<AssessmentRecord>, AppError> {
        check_verdict(&new)?;
        let interview_id = final_interview_id(&new)?.clone();
        let mut tables = self.tables.write().await;

        let interview_open = tables.interviews.get(&interview_id).is_some_and(|i| {
            i.status != InterviewStatus::Completed
                && i.application_id.as_ref() == Some(&new.application_id)
        });
        let application_ready = tables
            .applications
            .get(&new.application_id)
            .is_some_and(|a| a.status == ApplicationStatus::InterviewCompleted);
        if !interview_open || !application_ready {
            return Ok(None);
        }

        let now = Utc::now();
        let record = AssessmentRecord {
            id: RecordId::generate(),
            application_id: new.application_id,
            interview_id: new.interview_id,
            resume_id: new.resume_id,
            job_id: new.job_id,
            verdict: new.verdict,
            created_at: now,
        };
        if let Some(application) = tables.applications.get_mut(&record.application_id) {
            application.status = ApplicationStatus::FinalAssessed;
            application.final_assessment_id = Some(record.id.clone());
            application.updated_at = now;
        }
        if let Some(interview) = tables.interviews.get_mut(&interview_id) {
            interview.status = InterviewStatus::Completed;
        }
        tables.assessments.insert(record.id.clone(), record.clone());
        Ok(Some(record))
    }

    async fn get_assessment(&self, id: &RecordId) -> Result<Option<AssessmentRecord>, AppError> {
        Ok(self.tables.read().await.assessments.get(id).cloned())
    }
}
