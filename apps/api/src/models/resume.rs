use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::RecordId;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactInformation {
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(alias = "linkedIn")]
    pub linkedin: Option<String>,
    pub github: Option<String>,
    pub portfolio_website: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub full_name: String,
    #[serde(default)]
    pub contact_information: ContactInformation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    pub job_title: String,
    pub company_name: Option<String>,
    pub location: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    #[serde(default)]
    pub responsibilities: Vec<String>,
    #[serde(default)]
    pub technologies_used: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Education {
    pub degree: Option<String>,
    pub major: Option<String>,
    pub university: Option<String>,
    pub location: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub additional_info: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub project_name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub technologies_used: Vec<String>,
    pub role: Option<String>,
    pub link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Certification {
    pub certification_name: String,
    pub issuing_organization: Option<String>,
    pub issue_date: Option<String>,
    pub expiration_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AwardHonor {
    pub title: String,
    pub issuer: Option<String>,
    pub date_received: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Language {
    pub language: String,
    pub proficiency: Option<String>,
}

/// Structured resume as produced by document ingest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resume {
    pub header: Header,
    pub summary: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub experience: Vec<Experience>,
    #[serde(default)]
    pub education: Vec<Education>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub certifications: Vec<Certification>,
    #[serde(default)]
    pub awards_and_honors: Vec<AwardHonor>,
    #[serde(default)]
    pub languages: Vec<Language>,
    #[serde(default)]
    pub interests: Vec<String>,
}

impl Resume {
    /// Rejects on the first violation.
    pub fn validate(&self) -> Result<(), String> {
        if self.header.full_name.trim().is_empty() {
            return Err("resume.header.full_name is empty".to_string());
        }
        if let Some(exp) = self.experience.iter().find(|e| e.job_title.trim().is_empty()) {
            return Err(format!(
                "resume.experience entry at {:?} has an empty job_title",
                exp.company_name
            ));
        }
        if self.projects.iter().any(|p| p.project_name.trim().is_empty()) {
            return Err("resume.projects contains an entry without a project_name".to_string());
        }
        Ok(())
    }

    pub fn candidate_name(&self) -> &str {
        &self.header.full_name
    }
}

/// A stored resume. Immutable once written; a re-upload creates a new record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeRecord {
    pub id: RecordId,
    pub candidate_id: RecordId,
    pub original_filename: Option<String>,
    pub resume: Resume,
    pub created_at: DateTime<Utc>,
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resume_deserializes_with_missing_lists() {
        let json = r#"{
            "header": {
                "full_name": "Ada Lovelace",
                "contact_information": {"email": "ada@example.com", "linkedIn": "in/ada"}
            },
            "skills": ["Rust"]
        }"#;
        let resume: Resume = serde_json::from_str(json).unwrap();
        assert_eq!(resume.candidate_name(), "Ada Lovelace");
        assert_eq!(
            resume.header.contact_information.linkedin.as_deref(),
            Some("in/ada")
        );
        assert!(resume.experience.is_empty());
        assert!(resume.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_blank_name() {
        let mut resume = fixtures::resume("Ada");
        resume.header.full_name = "  ".to_string();
        assert!(resume.validate().is_err());
    }
}
