//! Prompt Builder — turns a raw idea into the fixed system instruction plus a user message.

use thiserror::Error;

use crate::models::proposal::Idea;
use crate::proposal::prompts::{ARCHITECT_SYSTEM, CLIENT_IDEA_TEMPLATE};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PromptError {
    #[error("idea cannot be empty")]
    InvalidInput,
}

/// The two halves of a generation request. Built fresh per submit and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPayload {
    system_instruction: &'static str,
    user_message: String,
}

impl PromptPayload {
    pub fn system_instruction(&self) -> &str {
        self.system_instruction
    }

    pub fn user_message(&self) -> &str {
        &self.user_message
    }
}

/// Builds the payload for `idea`. Pure; fails only on an empty or whitespace idea.
pub fn build(idea: &str) -> Result<PromptPayload, PromptError> {
    let idea = Idea::parse(idea).ok_or(PromptError::InvalidInput)?;

    Ok(PromptPayload {
        system_instruction: ARCHITECT_SYSTEM,
        user_message: CLIENT_IDEA_TEMPLATE.replace("{idea}", idea.as_str()),
    })
}
