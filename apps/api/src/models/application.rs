use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::RecordId;

/// Lifecycle status of an application. Only the lifecycle module writes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    ResumeAssessed,
    AssessmentFailed,
    Scheduled,
    InterviewCompleted,
    FinalAssessed,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::ResumeAssessed => "resume_assessed",
            ApplicationStatus::AssessmentFailed => "assessment_failed",
            ApplicationStatus::Scheduled => "scheduled",
            ApplicationStatus::InterviewCompleted => "interview_completed",
            ApplicationStatus::FinalAssessed => "final_assessed",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ApplicationStatus::Pending),
            "resume_assessed" => Ok(ApplicationStatus::ResumeAssessed),
            "assessment_failed" => Ok(ApplicationStatus::AssessmentFailed),
            "scheduled" => Ok(ApplicationStatus::Scheduled),
            "interview_completed" => Ok(ApplicationStatus::InterviewCompleted),
            "final_assessed" => Ok(ApplicationStatus::FinalAssessed),
            other => Err(format!("unknown application status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub id: RecordId,
    pub candidate_id: RecordId,
    pub resume_id: RecordId,
    pub job_id: RecordId,
    pub status: ApplicationStatus,
    pub assessment_id: Option<RecordId>,
    pub final_assessment_id: Option<RecordId>,
    pub candidate_accept: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields written alongside a status change.
#[derive(Debug, Clone, Default)]
pub struct StatusUpdate {
    pub assessment_id: Option<RecordId>,
    pub final_assessment_id: Option<RecordId>,
}

/// Filter for application scans.
#[derive(Debug, Clone)]
pub enum ApplicationFilter {
    Job(RecordId),
    Candidate(RecordId),
}

impl ApplicationFilter {
    pub fn matches(&self, record: &ApplicationRecord) -> bool {
        match self {
            ApplicationFilter::Job(id) => &record.job_id == id,
            ApplicationFilter::Candidate(id) => &record.candidate_id == id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_string_round_trip() {
        for status in [
            ApplicationStatus::Pending,
            ApplicationStatus::ResumeAssessed,
            ApplicationStatus::AssessmentFailed,
            ApplicationStatus::Scheduled,
            ApplicationStatus::InterviewCompleted,
            ApplicationStatus::FinalAssessed,
        ] {
            assert_eq!(status.as_str().parse::<ApplicationStatus>().unwrap(), status);
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
        assert!("rejected".parse::<ApplicationStatus>().is_err());
    }
}
