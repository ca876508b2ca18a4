use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::RecordId;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Moderate,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Moderate => "moderate",
            Difficulty::Hard => "hard",
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "moderate" | "medium" => Ok(Difficulty::Moderate),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("difficulty must be easy, moderate or hard (got '{other}')")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewStatus {
    Scheduled,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Interviewer,
    Candidate,
}

impl Speaker {
    /// Maps chat roles from the interview client ("model" is the interviewer).
    pub fn from_role(role: &str) -> Self {
        match role.trim().to_ascii_lowercase().as_str() {
            "model" | "assistant" | "interviewer" => Speaker::Interviewer,
            _ => Speaker::Candidate,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Speaker::Interviewer => "Interviewer",
            Speaker::Candidate => "Candidate",
        }
    }
}

/// One transcript turn. Append-only; never edited or reordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub speaker: Speaker,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioMetrics {
    pub speaking_rate_wpm: Option<f64>,
    pub pause_ratio: Option<f64>,
    pub filler_word_count: Option<u32>,
    pub average_pitch_hz: Option<f64>,
    pub energy_level: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonVisualMetrics {
    pub person_index: u32,
    pub eye_contact_ratio: Option<f64>,
    pub dominant_emotion: Option<String>,
    #[serde(default)]
    pub emotion_distribution: BTreeMap<String, f64>,
    pub posture: Option<String>,
    pub face_visible_ratio: Option<f64>,
}

/// Derived audio/video signals, computed outside this service and attached
/// to an interview once video processing completes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoAnalysis {
    pub audio: Option<AudioMetrics>,
    #[serde(default)]
    pub persons: Vec<PersonVisualMetrics>,
    pub notes: Option<String>,
}

impl VideoAnalysis {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(audio) = &self.audio {
            check_ratio("audio.pause_ratio", audio.pause_ratio)?;
            if audio.speaking_rate_wpm.is_some_and(|v| !v.is_finite() || v < 0.0) {
                return Err("audio.speaking_rate_wpm must be a non-negative number".to_string());
            }
        }
        for person in &self.persons {
            check_ratio("persons[].eye_contact_ratio", person.eye_contact_ratio)?;
            check_ratio("persons[].face_visible_ratio", person.face_visible_ratio)?;
            for (emotion, share) in &person.emotion_distribution {
                if !share.is_finite() || *share < 0.0 {
                    return Err(format!("emotion share for '{emotion}' must be non-negative"));
                }
            }
        }
        Ok(())
    }
}

fn check_ratio(field: &str, value: Option<f64>) -> Result<(), String> {
    match value {
        Some(v) if !(0.0..=1.0).contains(&v) => Err(format!("{field} must be within [0, 1]")),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewRecord {
    pub id: RecordId,
    pub resume_id: RecordId,
    pub job_id: RecordId,
    pub candidate_id: RecordId,
    pub application_id: Option<RecordId>,
    pub scheduled_time: DateTime<Utc>,
    pub difficulty: Difficulty,
    pub custom_instructions: Option<String>,
    pub status: InterviewStatus,
    pub chat_history: Vec<ChatTurn>,
    pub video_analysis: Option<VideoAnalysis>,
    pub created_at: DateTime<Utc>,
}

/// Payload for scheduling a new interview.
#[derive(Debug, Clone)]
pub struct NewInterview {
    pub resume_id: RecordId,
    pub job_id: RecordId,
    pub candidate_id: RecordId,
    pub application_id: Option<RecordId>,
    pub scheduled_time: DateTime<Utc>,
    pub difficulty: Difficulty,
    pub custom_instructions: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_parses_case_insensitively() {
        assert_eq!("Hard".parse::<Difficulty>().unwrap(), Difficulty::Hard);
        assert_eq!("medium".parse::<Difficulty>().unwrap(), Difficulty::Moderate);
        assert!("extreme".parse::<Difficulty>().is_err());
    }

    #[test]
    fn test_speaker_from_role() {
        assert_eq!(Speaker::from_role("model"), Speaker::Interviewer);
        assert_eq!(Speaker::from_role(" Model "), Speaker::Interviewer);
        assert_eq!(Speaker::from_role("user"), Speaker::Candidate);
    }

    #[test]
    fn test_video_analysis_rejects_out_of_range_ratio() {
        let analysis = VideoAnalysis {
            audio: Some(AudioMetrics {
                pause_ratio: Some(1.4),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(analysis.validate().is_err());
    }

    #[test]
    fn test_video_analysis_deserializes_partial_block() {
        let json = r#"{
            "audio": {"speaking_rate_wpm": 142.0, "pause_ratio": 0.18},
            "persons": [{"person_index": 0, "dominant_emotion": "neutral",
                         "emotion_distribution": {"neutral": 0.7, "happy": 0.3}}]
        }"#;
        let analysis: VideoAnalysis = serde_json::from_str(json).unwrap();
        assert!(analysis.validate().is_ok());
        assert_eq!(analysis.persons[0].dominant_emotion.as_deref(), Some("neutral"));
    }
}
