//! Response Validator — pulls the proposal HTML out of a `generateContent` envelope.
//!
//! Envelope shape: `candidates[0].content.parts[0].text`. Every level is optional
//! because the model can legitimately return empty or truncated results; each
//! missing level has its own error variant for diagnostics. Only the path that is
//! read gets decoded: other candidates and parts may have any shape.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::models::proposal::Proposal;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Could not generate proposal: response has no candidates")]
    MissingCandidates,

    #[error("Could not generate proposal: first candidate has no content")]
    MissingContent,

    #[error("Could not generate proposal: content has no parts")]
    MissingParts,

    #[error("Could not generate proposal: first part has no text")]
    MissingText,

    #[error("Could not generate proposal: malformed envelope")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    candidates: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

/// Extracts the first candidate's first text part, unmodified.
pub fn extract(raw: &Value) -> Result<Proposal, ValidationError> {
    let envelope = Envelope::deserialize(raw)?;

    let first_candidate = envelope
        .candidates
        .and_then(|c| c.into_iter().next())
        .ok_or(ValidationError::MissingCandidates)?;
    let candidate = Candidate::deserialize(&first_candidate)?;

    let content = candidate.content.ok_or(ValidationError::MissingContent)?;

    let first_part = content
        .parts
        .and_then(|p| p.into_iter().next())
        .ok_or(ValidationError::MissingParts)?;
    let part = CandidatePart::deserialize(&first_part)?;

    let text = part
        .text
        .filter(|t| !t.is_empty())
        .ok_or(ValidationError::MissingText)?;

    Ok(Proposal::new(text))
}
