//! Structured-output parsing: strict parse, one textual repair pass, strict parse again.

use serde::de::DeserializeOwned;
use tracing::warn;

use crate::fusion::FusionError;
use crate::llm_client::strip_json_fences;

/// A type the generative capability is asked to produce. `check` enforces the
/// field-level rules serde cannot express (score ranges, non-empty text).
pub trait Conforming: DeserializeOwned {
    fn check(&self) -> Result<(), String>;
}

/// Parses `raw` into `T`. Never attempts more than one repair.
pub fn parse_conforming<T: Conforming>(raw: &str) -> Result<T, FusionError> {
    let text = strip_json_fences(raw);

    let first = match strict_parse::<T>(text) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    warn!("Structured output failed strict parse ({first}); attempting one repair pass");
    let repaired = repair_json(text);

    strict_parse::<T>(&repaired)
        .map_err(|second| FusionError::Parse(format!("{second} (before repair: {first})")))
}

fn strict_parse<T: Conforming>(text: &str) -> Result<T, String> {
    let value: T = serde_json::from_str(text).map_err(|e| e.to_string())?;
    value.check()?;
    Ok(value)
}

/// Best-effort textual repair of almost-JSON.
///
/// Handles: prose before the first `{`/`[` and after the matching close,
/// unescaped quotes inside strings, raw control characters inside strings,
/// trailing commas, and output truncated mid-string or mid-container.
pub fn repair_json(text: &str) -> String {
    let Some(start) = text.find(['{', '[']) else {
        return text.to_string();
    };
    let chars: Vec<char> = text[start..].chars().collect();

    let mut out = String::with_capacity(chars.len() + 16);
    let mut closers: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            if escaped {
                out.push(c);
                escaped = false;
                continue;
            }
            match c {
                '\\' => {
                    out.push(c);
                    escaped = true;
                }
                '"' if ends_string(&chars, i + 1) => {
                    out.push('"');
                    in_string = false;
                }
                '"' => out.push_str("\\\""),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                c if (c as u32) < 0x20 => {}
                c => out.push(c),
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '{' => {
                closers.push('}');
                out.push(c);
            }
            '[' => {
                closers.push(']');
                out.push(c);
            }
            '}' | ']' => {
                trim_trailing_comma(&mut out);
                if closers.last() == Some(&c) {
                    closers.pop();
                    out.push(c);
                    if closers.is_empty() {
                        // Anything after the outermost close is commentary.
                        return out;
                    }
                }
            }
            c => out.push(c),
        }
    }

    // Truncated output: close whatever is still open.
    if in_string {
        if escaped {
            out.pop();
        }
        out.push('"');
    }
    let trimmed_len = out.trim_end().len();
    out.truncate(trimmed_len);
    if out.ends_with(':') {
        out.push_str(" null");
    }
    while let Some(closer) = closers.pop() {
        trim_trailing_comma(&mut out);
        out.push(closer);
    }
    out
}

/// Decides whether a quote at `chars[from - 1]` closes the current string by
/// looking at what follows it.
fn ends_string(chars: &[char], from: usize) -> bool {
    let mut rest = chars[from..].iter().copied().filter(|c| !c.is_whitespace());
    match rest.next() {
        None | Some(':') | Some('}') | Some(']') => true,
        Some(',') => matches!(
            rest.next(),
            None | Some('"') | Some('{') | Some('[') | Some('}') | Some(']') | Some('-')
        ) || rest_starts_with_digit(chars, from),
        _ => false,
    }
}

fn rest_starts_with_digit(chars: &[char], from: usize) -> bool {
    chars[from..]
        .iter()
        .copied()
        .filter(|c| !c.is_whitespace())
        .nth(1)
        .is_some_and(|c| c.is_ascii_digit())
}

fn trim_trailing_comma(out: &mut String) {
    let trimmed_len = out.trim_end().len();
    if out[..trimmed_len].ends_with(',') {
        out.truncate(trimmed_len - 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Verdict {
        score: f64,
        note: String,
    }

    impl Conforming for Verdict {
        fn check(&self) -> Result<(), String> {
            if (0.0..=100.0).contains(&self.score) {
                Ok(())
            } else {
                Err(format!("score {} out of range", self.score))
            }
        }
    }

    #[test]
    fn test_strict_parse_succeeds_without_repair() {
        let v: Verdict = parse_conforming(r#"{"score": 82, "note": "ok"}"#).unwrap();
        assert_eq!(v.score, 82.0);
    }

    #[test]
    fn test_fenced_output_is_accepted() {
        let v: Verdict = parse_conforming("```json\n{\"score\": 10, \"note\": \"x\"}\n```").unwrap();
        assert_eq!(v.note, "x");
    }

    #[test]
    fn test_repairs_trailing_commas() {
        let v: Verdict = parse_conforming(r#"{"score": 50, "note": "fine",}"#).unwrap();
        assert_eq!(v.score, 50.0);
        assert_eq!(repair_json(r#"{"a": [1, 2, ], }"#), r#"{"a": [1, 2]}"#);
    }

    #[test]
    fn test_repairs_unescaped_inner_quotes() {
        let raw = r#"{"score": 70, "note": "Candidate said "I love Rust" twice"}"#;
        let v: Verdict = parse_conforming(raw).unwrap();
        assert_eq!(v.note, r#"Candidate said "I love Rust" twice"#);
    }

    #[test]
    fn test_repairs_raw_newlines_in_strings() {
        let raw = "{\"score\": 1, \"note\": \"line one\nline two\"}";
        let v: Verdict = parse_conforming(raw).unwrap();
        assert_eq!(v.note, "line one\nline two");
    }

    #[test]
    fn test_repairs_truncation_and_surrounding_prose() {
        let raw = "Here is the result: {\"score\": 64, \"note\": \"cut off mid";
        let v: Verdict = parse_conforming(raw).unwrap();
        assert_eq!(v.score, 64.0);
        assert_eq!(v.note, "cut off mid");

        assert_eq!(
            repair_json("{\"a\": 1} Hope this helps!"),
            "{\"a\": 1}"
        );
        assert_eq!(repair_json("{\"a\": {\"b\":"), "{\"a\": {\"b\": null}}");
    }

    #[test]
    fn test_out_of_range_fails_even_after_repair() {
        let err = parse_conforming::<Verdict>(r#"{"score": 180, "note": "too high"}"#).unwrap_err();
        assert!(matches!(err, FusionError::Parse(_)));
    }

    #[test]
    fn test_unrepairable_output_is_parse_error() {
        let err = parse_conforming::<Verdict>("I cannot assess this candidate.").unwrap_err();
        assert!(matches!(err, FusionError::Parse(_)));
    }
}
