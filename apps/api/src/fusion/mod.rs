//! Assessment Fusion Engine: fuses resume, job description, interview transcript and
//! video signal analysis into one call to the generative capability, then validates
//! the structured verdict.
//!
//! Every upstream call is bounded by the engine timeout; a timeout is reported the
//! same way as any other upstream failure. Results are never guessed: output that
//! does not conform after one repair pass is a `ParseError`.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::fusion::prompts::*;
use crate::fusion::repair::{parse_conforming, Conforming};
use crate::llm_client::prompts::{EVIDENCE_INSTRUCTION, JSON_ONLY_SYSTEM};
use crate::llm_client::{ChatMessage, GenerativeModel};
use crate::models::assessment::{AssessmentResult, FinalAssessmentResult};
use crate::models::interview::{ChatTurn, Difficulty, VideoAnalysis};
use crate::models::job::JobDescription;
use crate::models::resume::Resume;

pub mod prompts;
pub mod repair;

/// Planned interview length; past it the conductor closes instead of asking.
pub const INTERVIEW_DURATION_SECS: u64 = 8 * 60;

#[derive(Debug, Error)]
pub enum FusionError {
    /// The capability was unreachable, errored, or timed out.
    #[error("{0}")]
    Upstream(String),

    /// The capability answered, but not in the required shape.
    #[error("{0}")]
    Parse(String),
}

impl Conforming for AssessmentResult {
    fn check(&self) -> Result<(), String> {
        self.validate()
    }
}

impl Conforming for FinalAssessmentResult {
    fn check(&self) -> Result<(), String> {
        self.validate()
    }
}

impl Conforming for Resume {
    fn check(&self) -> Result<(), String> {
        self.validate()
    }
}

impl Conforming for JobDescription {
    fn check(&self) -> Result<(), String> {
        self.validate()
    }
}

/// Inputs to the interview-stage verdict.
pub struct InterviewFitInput<'a> {
    pub resume: &'a Resume,
    pub job: &'a JobDescription,
    pub transcript: &'a [ChatTurn],
    pub difficulty: Difficulty,
    pub video_analysis: Option<&'a VideoAnalysis>,
}

/// One answered question, as sent by the interview client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnsweredQuestion {
    pub question: String,
    pub answer: String,
    pub timestamp: String,
}

#[derive(Clone)]
pub struct FusionEngine {
    model: Arc<dyn GenerativeModel>,
    timeout: Duration,
}

impl FusionEngine {
    pub fn new(model: Arc<dyn GenerativeModel>, timeout: Duration) -> Self {
        Self { model, timeout }
    }

    /// Resume-only fitment score.
    pub async fn score_resume_fit(
        &self,
        resume: &Resume,
        job: &JobDescription,
    ) -> Result<AssessmentResult, FusionError> {
        let content = RESUME_FIT_USER_TEMPLATE
            .replace("{job_json}", &to_prompt_json(job))
            .replace("{resume_json}", &to_prompt_json(resume));
        let system = format!("{RESUME_FIT_SYSTEM}\n\n{EVIDENCE_INSTRUCTION}\n\n{JSON_ONLY_SYSTEM}");

        let raw = self
            .invoke("resume fit", &system, vec![ChatMessage::user(content)])
            .await?;
        let result: AssessmentResult = parse_conforming(&raw)?;

        info!(
            "Resume fit scored: overall={} for '{}'",
            result.overall_match_score, job.job_title
        );
        Ok(result)
    }

    /// Interview-stage verdict. Without signal analysis the verdict carries no
    /// video insights and the justification says so explicitly.
    pub async fn score_interview_fit(
        &self,
        input: InterviewFitInput<'_>,
    ) -> Result<FinalAssessmentResult, FusionError> {
        let content = build_interview_fit_content(&input);
        let system =
            format!("{INTERVIEW_FIT_SYSTEM}\n\n{EVIDENCE_INSTRUCTION}\n\n{JSON_ONLY_SYSTEM}");

        let raw = self
            .invoke("interview fit", &system, vec![ChatMessage::user(content)])
            .await?;
        let mut result: FinalAssessmentResult = parse_conforming(&raw)?;

        if input.video_analysis.is_none() {
            if result.video_analysis_insights.take().is_some() {
                warn!("Dropping video insights returned without any signal analysis");
            }
            if !result.justification.contains(NO_VIDEO_ANALYSIS_NOTE) {
                result.justification =
                    format!("{} {NO_VIDEO_ANALYSIS_NOTE}", result.justification.trim_end());
            }
        }

        info!(
            "Interview fit scored: {:?} (video analysis: {})",
            result.fitment_rating,
            input.video_analysis.is_some()
        );
        Ok(result)
    }

    /// Next adaptive interview question, as plain text.
    pub async fn next_question(
        &self,
        resume: &serde_json::Value,
        job: &serde_json::Value,
        difficulty: Difficulty,
        turns: &[AnsweredQuestion],
        elapsed_secs: u64,
    ) -> Result<String, FusionError> {
        if elapsed_secs >= INTERVIEW_DURATION_SECS {
            return Ok(INTERVIEW_CLOSING_LINE.to_string());
        }

        let system = NEXT_QUESTION_SYSTEM
            .replace("{minutes}", &(INTERVIEW_DURATION_SECS / 60).to_string())
            .replace("{difficulty}", difficulty.as_str());

        let mut messages = Vec::with_capacity(turns.len() * 2 + 2);
        messages.push(ChatMessage::user(
            NEXT_QUESTION_CONTEXT_TEMPLATE
                .replace("{resume_json}", &to_prompt_json(resume))
                .replace("{job_json}", &to_prompt_json(job))
                .replace("{difficulty}", difficulty.as_str()),
        ));
        for turn in turns {
            messages.push(ChatMessage::assistant(turn.question.clone()));
            messages.push(ChatMessage::user(format!(
                "Answer [{}]: {}",
                turn.timestamp, turn.answer
            )));
        }
        messages.push(ChatMessage::user(
            NEXT_QUESTION_REQUEST_TEMPLATE.replace("{elapsed}", &elapsed_secs.to_string()),
        ));

        let raw = self.invoke("next question", &system, messages).await?;
        let question = raw.trim().trim_matches('"').trim();
        if question.is_empty() {
            return Err(FusionError::Parse(
                "next question: capability returned an empty question".to_string(),
            ));
        }
        Ok(question.to_string())
    }

    /// Structures extracted resume text into the tagged resume schema.
    pub async fn structure_resume(&self, text: &str) -> Result<Resume, FusionError> {
        self.structure_document("Resume", RESUME_STRUCTURE_SYSTEM, text)
            .await
    }

    /// Structures extracted job-description text into the tagged job schema.
    pub async fn structure_job(&self, text: &str) -> Result<JobDescription, FusionError> {
        self.structure_document("Job Description", JOB_STRUCTURE_SYSTEM, text)
            .await
    }

    async fn structure_document<T: Conforming>(
        &self,
        label: &str,
        schema_system: &str,
        text: &str,
    ) -> Result<T, FusionError> {
        let system = format!("{schema_system}\n\n{JSON_ONLY_SYSTEM}");
        let content = DOCUMENT_USER_TEMPLATE
            .replace("{label}", label)
            .replace("{text}", text);
        let raw = self
            .invoke(label, &system, vec![ChatMessage::user(content)])
            .await?;
        parse_conforming(&raw)
    }

    async fn invoke(
        &self,
        purpose: &str,
        system: &str,
        messages: Vec<ChatMessage>,
    ) -> Result<String, FusionError> {
        match tokio::time::timeout(self.timeout, self.model.complete(system, &messages)).await {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(FusionError::Upstream(format!("{purpose}: {e}"))),
            Err(_) => Err(FusionError::Upstream(format!(
                "{purpose}: no response within {}s",
                self.timeout.as_secs()
            ))),
        }
    }
}

fn build_interview_fit_content(input: &InterviewFitInput<'_>) -> String {
    let transcript = if input.transcript.is_empty() {
        "(no turns recorded)".to_string()
    } else {
        input
            .transcript
            .iter()
            .map(|turn| format!("{}: {}", turn.speaker.label(), turn.content))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let video_analysis = match input.video_analysis {
        Some(analysis) => to_prompt_json(analysis),
        None => NO_VIDEO_ANALYSIS_BLOCK.to_string(),
    };

    INTERVIEW_FIT_USER_TEMPLATE
        .replace("{job_json}", &to_prompt_json(input.job))
        .replace("{resume_json}", &to_prompt_json(input.resume))
        .replace("{difficulty}", input.difficulty.as_str())
        .replace("{transcript}", &transcript)
        .replace("{video_analysis}", &video_analysis)
}

/// Prompt rendering of a structured input. Serializing these plain data types
/// cannot fail, so an error degrades to an empty object rather than aborting.
fn to_prompt_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::testing::ScriptedModel;
    use crate::llm_client::LlmError;
    use crate::models::assessment::FitmentRating;
    use crate::models::interview::{AudioMetrics, Speaker};
    use crate::models::job::fixtures::job;
    use crate::models::resume::fixtures::resume;

    const RESUME_FIT_JSON: &str = r#"{
        "candidate_name": "Ada Lovelace",
        "job_title": "Backend Engineer",
        "overall_match_score": 82,
        "skills_match_score": 90,
        "experience_match_score": 75,
        "education_match_score": 80,
        "matched_skills": ["Rust", "PostgreSQL"],
        "missing_skills": ["Kubernetes"],
        "strengths": ["Systems depth"],
        "weaknesses": ["Limited cloud exposure"],
        "recommendation": "Strong Fit",
        "detailed_analysis": "Covers the core stack."
    }"#;

    fn engine(model: ScriptedModel) -> (FusionEngine, Arc<ScriptedModel>) {
        let model = Arc::new(model);
        (
            FusionEngine::new(model.clone(), Duration::from_secs(5)),
            model,
        )
    }

    fn transcript() -> Vec<ChatTurn> {
        vec![
            ChatTurn {
                speaker: Speaker::Interviewer,
                content: "How do you handle backpressure?".to_string(),
            },
            ChatTurn {
                speaker: Speaker::Candidate,
                content: "Bounded channels and load shedding.".to_string(),
            },
        ]
    }

    #[tokio::test]
    async fn test_score_resume_fit_parses_scores() {
        let (engine, model) = engine(ScriptedModel::ok(RESUME_FIT_JSON));
        let result = engine
            .score_resume_fit(&resume("Ada Lovelace"), &job("Backend Engineer"))
            .await
            .unwrap();

        assert_eq!(result.overall_match_score, 82.0);
        assert_eq!(result.missing_skills, vec!["Kubernetes".to_string()]);

        let calls = model.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].messages[0].content.contains("Backend Engineer"));
        assert!(calls[0].messages[0].content.contains("Ada Lovelace"));
    }

    #[tokio::test]
    async fn test_score_resume_fit_upstream_failure() {
        let (engine, _) = engine(ScriptedModel::replying(vec![Err(LlmError::Api {
            status: 503,
            message: "overloaded".to_string(),
        })]));
        let err = engine
            .score_resume_fit(&resume("Ada"), &job("Backend Engineer"))
            .await
            .unwrap_err();
        assert!(matches!(err, FusionError::Upstream(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_upstream_error() {
        let model = Arc::new(ScriptedModel::ok(RESUME_FIT_JSON).with_delay(Duration::from_secs(60)));
        let engine = FusionEngine::new(model, Duration::from_secs(2));
        let err = engine
            .score_resume_fit(&resume("Ada"), &job("Backend Engineer"))
            .await
            .unwrap_err();
        match err {
            FusionError::Upstream(msg) => assert!(msg.contains("no response within 2s")),
            other => panic!("expected upstream error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_out_of_range_score_is_parse_error() {
        let bad = RESUME_FIT_JSON.replace("\"overall_match_score\": 82", "\"overall_match_score\": 120");
        let (engine, _) = engine(ScriptedModel::ok(bad));
        let err = engine
            .score_resume_fit(&resume("Ada"), &job("Backend Engineer"))
            .await
            .unwrap_err();
        assert!(matches!(err, FusionError::Parse(_)));
    }

    #[tokio::test]
    async fn test_interview_fit_without_video_states_it() {
        let reply = r#"{
            "capabilities_summary": "Solid backend fundamentals.",
            "fitment_rating": "Moderate Fit",
            "justification": "Good answers on concurrency.",
            "video_analysis_insights": "Maintained eye contact."
        }"#;
        let (engine, model) = engine(ScriptedModel::ok(reply));
        let resume = resume("Ada");
        let job = job("Backend Engineer");
        let turns = transcript();

        let result = engine
            .score_interview_fit(InterviewFitInput {
                resume: &resume,
                job: &job,
                transcript: &turns,
                difficulty: Difficulty::Hard,
                video_analysis: None,
            })
            .await
            .unwrap();

        assert_eq!(result.fitment_rating, FitmentRating::ModerateFit);
        assert!(result.video_analysis_insights.is_none());
        assert!(result.justification.ends_with(NO_VIDEO_ANALYSIS_NOTE));

        let prompt = &model.calls()[0].messages[0].content;
        assert!(prompt.contains("Interviewer: How do you handle backpressure?"));
        assert!(prompt.contains("Candidate: Bounded channels and load shedding."));
        assert!(prompt.contains(NO_VIDEO_ANALYSIS_BLOCK));
    }

    #[tokio::test]
    async fn test_interview_fit_with_video_keeps_insights() {
        let reply = r#"{
            "capabilities_summary": "Strong systems thinker.",
            "fitment_rating": "Best Fit",
            "justification": "Precise, calm answers.",
            "video_analysis_insights": "Steady 140 wpm pace with few pauses."
        }"#;
        let (engine, model) = engine(ScriptedModel::ok(reply));
        let resume = resume("Ada");
        let job = job("Backend Engineer");
        let turns = transcript();
        let analysis = VideoAnalysis {
            audio: Some(AudioMetrics {
                speaking_rate_wpm: Some(140.0),
                pause_ratio: Some(0.12),
                ..Default::default()
            }),
            ..Default::default()
        };

        let result = engine
            .score_interview_fit(InterviewFitInput {
                resume: &resume,
                job: &job,
                transcript: &turns,
                difficulty: Difficulty::Moderate,
                video_analysis: Some(&analysis),
            })
            .await
            .unwrap();

        assert_eq!(result.fitment_rating, FitmentRating::BestFit);
        assert!(result.video_analysis_insights.is_some());
        assert!(!result.justification.contains(NO_VIDEO_ANALYSIS_NOTE));
        assert!(model.calls()[0].messages[0].content.contains("speaking_rate_wpm"));
    }

    #[tokio::test]
    async fn test_unknown_rating_is_parse_error() {
        let reply = r#"{"capabilities_summary": "x", "fitment_rating": "Great Fit", "justification": "y"}"#;
        let (engine, _) = engine(ScriptedModel::ok(reply));
        let resume = resume("Ada");
        let job = job("Backend Engineer");
        let err = engine
            .score_interview_fit(InterviewFitInput {
                resume: &resume,
                job: &job,
                transcript: &[],
                difficulty: Difficulty::Easy,
                video_analysis: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, FusionError::Parse(_)));
    }

    #[tokio::test]
    async fn test_next_question_builds_conversation() {
        let (engine, model) = engine(ScriptedModel::ok("\"How would you shard this table?\"\n"));
        let turns = vec![AnsweredQuestion {
            question: "Describe your last project.".to_string(),
            answer: "A payments ledger in Rust.".to_string(),
            timestamp: "2026-10-18T10:01:00Z".to_string(),
        }];

        let question = engine
            .next_question(
                &serde_json::json!({"skills": ["Rust"]}),
                &serde_json::json!({"job_title": "Backend Engineer"}),
                Difficulty::Hard,
                &turns,
                95,
            )
            .await
            .unwrap();
        assert_eq!(question, "How would you shard this table?");

        let call = &model.calls()[0];
        assert!(call.system.contains("8 minutes"));
        assert_eq!(call.messages.len(), 4);
        assert_eq!(call.messages[1].content, "Describe your last project.");
        assert!(call.messages[2].content.starts_with("Answer [2026-10-18T10:01:00Z]"));
        assert!(call.messages[3].content.contains("95 seconds"));
    }

    #[tokio::test]
    async fn test_next_question_closes_after_time_limit() {
        let (engine, model) = engine(ScriptedModel::default());
        let question = engine
            .next_question(
                &serde_json::json!({}),
                &serde_json::json!({}),
                Difficulty::Easy,
                &[],
                INTERVIEW_DURATION_SECS + 5,
            )
            .await
            .unwrap();
        assert_eq!(question, INTERVIEW_CLOSING_LINE);
        assert!(model.calls().is_empty());
    }

    #[tokio::test]
    async fn test_structure_job_repairs_trailing_comma() {
        let reply = r#"{"job_title": "Data Engineer", "required_skills": ["SQL",], "interview_difficulty": "hard",}"#;
        let (engine, _) = engine(ScriptedModel::ok(reply));
        let job = engine.structure_job("Data Engineer ... SQL required").await.unwrap();
        assert_eq!(job.job_title, "Data Engineer");
        assert_eq!(job.interview_difficulty, Difficulty::Hard);
    }
}
