use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::RecordId;

/// Resume-only fitment verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentResult {
    pub candidate_name: String,
    pub job_title: String,
    pub overall_match_score: f64,
    pub skills_match_score: f64,
    pub experience_match_score: f64,
    pub education_match_score: f64,
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub recommendation: String,
    pub detailed_analysis: String,
}

impl AssessmentResult {
    pub fn validate(&self) -> Result<(), String> {
        for (field, score) in [
            ("overall_match_score", self.overall_match_score),
            ("skills_match_score", self.skills_match_score),
            ("experience_match_score", self.experience_match_score),
            ("education_match_score", self.education_match_score),
        ] {
            if !score.is_finite() || !(0.0..=100.0).contains(&score) {
                return Err(format!("{field} = {score} is outside [0, 100]"));
            }
        }
        if self.recommendation.trim().is_empty() {
            return Err("recommendation is empty".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitmentRating {
    #[serde(rename = "Best Fit")]
    BestFit,
    #[serde(rename = "Moderate Fit")]
    ModerateFit,
    #[serde(rename = "Worst Fit")]
    WorstFit,
}

/// Interview-stage verdict fusing resume, job, transcript and video signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalAssessmentResult {
    pub capabilities_summary: String,
    pub fitment_rating: FitmentRating,
    pub justification: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_analysis_insights: Option<String>,
}

impl FinalAssessmentResult {
    pub fn validate(&self) -> Result<(), String> {
        if self.capabilities_summary.trim().is_empty() {
            return Err("capabilities_summary is empty".to_string());
        }
        if self.justification.trim().is_empty() {
            return Err("justification is empty".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssessmentVerdict {
    ResumeFit(AssessmentResult),
    InterviewFit(FinalAssessmentResult),
}

impl AssessmentVerdict {
    pub fn kind_str(&self) -> &'static str {
        match self {
            AssessmentVerdict::ResumeFit(_) => "resume_fit",
            AssessmentVerdict::InterviewFit(_) => "interview_fit",
        }
    }
}

/// Immutable assessment snapshot. Referenced (never owned) by one application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentRecord {
    pub id: RecordId,
    pub application_id: RecordId,
    pub interview_id: Option<RecordId>,
    pub resume_id: RecordId,
    pub job_id: RecordId,
    pub verdict: AssessmentVerdict,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAssessment {
    pub application_id: RecordId,
    pub interview_id: Option<RecordId>,
    pub resume_id: RecordId,
    pub job_id: RecordId,
    pub verdict: AssessmentVerdict,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn resume_fit(overall: f64) -> AssessmentResult {
        AssessmentResult {
            candidate_name: "Ada Lovelace".to_string(),
            job_title: "Backend Engineer".to_string(),
            overall_match_score: overall,
            skills_match_score: 90.0,
            experience_match_score: 75.0,
            education_match_score: 80.0,
            matched_skills: vec!["Rust".to_string()],
            missing_skills: vec!["Kubernetes".to_string()],
            strengths: vec!["Systems depth".to_string()],
            weaknesses: vec!["No cloud certs".to_string()],
            recommendation: "Strong Fit".to_string(),
            detailed_analysis: "Solid match on the core stack.".to_string(),
        }
    }

    pub fn interview_fit() -> FinalAssessmentResult {
        FinalAssessmentResult {
            capabilities_summary: "Strong systems engineer.".to_string(),
            fitment_rating: FitmentRating::BestFit,
            justification: "Clear, correct answers throughout.".to_string(),
            video_analysis_insights: None,
        }
    }
}
