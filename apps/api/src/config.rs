use std::path::PathBuf;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    /// Absent means the in-process record store.
    pub database_url: Option<String>,
    pub anthropic_api_key: String,
    pub port: u16,
    pub media_root: PathBuf,
    pub media_max_upload_mb: u64,
    pub scoring_workers: usize,
    pub scoring_queue_capacity: usize,
    pub llm_timeout_secs: u64,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: optional_env("DATABASE_URL"),
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            port: parse_env("PORT", 8080)?,
            media_root: optional_env("MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./data/interview-video")),
            media_max_upload_mb: parse_env("MEDIA_MAX_UPLOAD_MB", 500)?,
            scoring_workers: parse_env("SCORING_WORKERS", 4)?,
            scoring_queue_capacity: parse_env("SCORING_QUEUE_CAPACITY", 256)?,
            llm_timeout_secs: parse_env("LLM_TIMEOUT_SECS", 90)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    pub fn media_max_upload_bytes(&self) -> u64 {
        self.media_max_upload_mb * 1024 * 1024
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number (got '{raw}')")),
        None => Ok(default),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn config(media_root: PathBuf) -> Config {
        Config {
            database_url: None,
            anthropic_api_key: "test-key".to_string(),
            port: 0,
            media_root,
            media_max_upload_mb: 1,
            scoring_workers: 1,
            scoring_queue_capacity: 8,
            llm_timeout_secs: 5,
            rust_log: "info".to_string(),
        }
    }
}
