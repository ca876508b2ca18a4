// Shared prompt constants.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Appended to every assessment prompt.
pub const EVIDENCE_INSTRUCTION: &str = "\
    Base every score, list entry and sentence on evidence present in the inputs. \
    Do NOT invent employers, skills, dates or answers the candidate did not give. \
    If an input is missing, say so instead of guessing.";
