use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::RecordId;
use crate::models::interview::Difficulty;

/// Structured job description. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDescription {
    pub job_title: String,
    pub company_name: Option<String>,
    #[serde(default)]
    pub job_requirements: Vec<String>,
    #[serde(default)]
    pub required_skills: Vec<String>,
    #[serde(default)]
    pub preferred_skills: Vec<String>,
    #[serde(default)]
    pub qualifications: Vec<String>,
    pub experience_required: Option<String>,
    pub job_description: Option<String>,
    #[serde(default)]
    pub interview_difficulty: Difficulty,
}

impl JobDescription {
    pub fn validate(&self) -> Result<(), String> {
        if self.job_title.trim().is_empty() {
            return Err("job.job_title is empty".to_string());
        }
        if self.required_skills.iter().any(|s| s.trim().is_empty()) {
            return Err("job.required_skills contains an empty entry".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: RecordId,
    pub owner_id: RecordId,
    pub original_filename: Option<String>,
    pub job: JobDescription,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn job(title: &str) -> JobDescription {
        JobDescription {
            job_title: title.to_string(),
            company_name: Some("Initech".to_string()),
            job_requirements: vec!["5+ years backend development".to_string()],
            required_skills: vec!["Rust".to_string(), "PostgreSQL".to_string()],
            preferred_skills: vec!["Kubernetes".to_string()],
            qualifications: vec!["BSc Computer Science".to_string()],
            experience_required: Some("5 years".to_string()),
            job_description: None,
            interview_difficulty: Difficulty::Moderate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_defaults_to_moderate() {
        let json = r#"{"job_title": "Platform Engineer", "required_skills": ["Go"]}"#;
        let job: JobDescription = serde_json::from_str(json).unwrap();
        assert_eq!(job.interview_difficulty, Difficulty::Moderate);
        assert!(job.validate().is_ok());
    }

    #[test]
    fn test_unknown_difficulty_is_rejected() {
        let json = r#"{"job_title": "X", "interview_difficulty": "brutal"}"#;
        assert!(serde_json::from_str::<JobDescription>(json).is_err());
    }
}
