//! Record identifiers: opaque 24-hex-character tokens shared by every collection.
//!
//! Identifiers arriving from clients are validated here before any store access.
//! The store mints new ones with [`RecordId::generate`].

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub const ID_LEN: usize = 24;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("invalid {field}: expected 24 hex characters, got {len}")]
    Length { field: &'static str, len: usize },

    #[error("invalid {field}: contains non-hex character '{ch}'")]
    Charset { field: &'static str, ch: char },
}

/// A validated, lowercase 24-hex identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordId(String);

impl RecordId {
    /// Validates and normalizes a client-supplied identifier.
    /// Surrounding whitespace is ignored; hex digits are lowercased.
    pub fn parse(raw: &str, field: &'static str) -> Result<Self, IdError> {
        let trimmed = raw.trim();
        if trimmed.len() != ID_LEN {
            return Err(IdError::Length {
                field,
                len: trimmed.chars().count(),
            });
        }
        if let Some(ch) = trimmed.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(IdError::Charset { field, ch });
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    /// Mints a fresh identifier: 4 bytes of big-endian unix seconds followed by
    /// 8 random bytes. Sorts roughly by creation time.
    pub fn generate() -> Self {
        let secs = Utc::now().timestamp().clamp(0, u32::MAX as i64) as u32;
        let random = Uuid::new_v4();

        let mut bytes = [0u8; 12];
        bytes[..4].copy_from_slice(&secs.to_be_bytes());
        bytes[4..].copy_from_slice(&random.as_bytes()[..8]);

        Self(bytes.iter().map(|b| format!("{b:02x}")).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RecordId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        RecordId::parse(&value, "id")
    }
}

impl From<RecordId> for String {
    fn from(id: RecordId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_and_normalizes() {
        let id = RecordId::parse("  65F1A2B3C4D5E6F708192A3B ", "resume_id").unwrap();
        assert_eq!(id.as_str(), "65f1a2b3c4d5e6f708192a3b");
    }

    #[test]
    fn test_parse_rejects_wrong_length() {
        let err = RecordId::parse("abc123", "job_id").unwrap_err();
        assert_eq!(
            err,
            IdError::Length {
                field: "job_id",
                len: 6
            }
        );
        assert!(RecordId::parse("", "job_id").is_err());
        assert!(RecordId::parse(&"a".repeat(25), "job_id").is_err());
    }

    #[test]
    fn test_parse_rejects_non_hex() {
        let err = RecordId::parse("65f1a2b3c4d5e6f708192a3z", "candidate_id").unwrap_err();
        assert_eq!(
            err,
            IdError::Charset {
                field: "candidate_id",
                ch: 'z'
            }
        );
    }

    #[test]
    fn test_generate_is_valid_and_unique() {
        let a = RecordId::generate();
        let b = RecordId::generate();
        assert_ne!(a, b);
        assert!(RecordId::parse(a.as_str(), "id").is_ok());
        assert_eq!(a.as_str().len(), ID_LEN);
    }

    #[test]
    fn test_serde_rejects_malformed() {
        let ok: RecordId = serde_json::from_str(r#""65f1a2b3c4d5e6f708192a3b""#).unwrap();
        assert_eq!(ok.to_string(), "65f1a2b3c4d5e6f708192a3b");
        assert!(serde_json::from_str::<RecordId>(r#""not-an-id""#).is_err());
    }
}
