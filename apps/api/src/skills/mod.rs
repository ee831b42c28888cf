//! Skill suggestion: turns a worker's free-text experience into skill tags.
//!
//! `AppState` holds an `Arc<dyn SkillSuggester>`; the default backend is
//! `LlmSkillSuggester`.

pub mod handlers;
pub mod prompts;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::llm_client::LlmClient;
use crate::models::profile::normalize_entries;

pub const MIN_EXPERIENCE_CHARS: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillSuggestions {
    pub suggested_skills: Vec<String>,
}

#[async_trait]
pub trait SkillSuggester: Send + Sync {
    /// Raw suggestions from the backend; callers go through `suggest_skills`.
    async fn suggest(&self, text: &str) -> Result<SkillSuggestions, AppError>;
}

pub struct LlmSkillSuggester {
    llm: LlmClient,
}

impl LlmSkillSuggester {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl SkillSuggester for LlmSkillSuggester {
    async fn suggest(&self, text: &str) -> Result<SkillSuggestions, AppError> {
        self.llm
            .call_json(&prompts::suggest_skills_prompt(text), prompts::JSON_ONLY_SYSTEM)
            .await
            .map_err(|e| AppError::Llm(e.to_string()))
    }
}

/// Validates the input and returns trimmed, de-duplicated suggestions.
pub async fn suggest_skills(
    suggester: &dyn SkillSuggester,
    text: &str,
) -> Result<SkillSuggestions, AppError> {
    let text = text.trim();
    if text.chars().count() < MIN_EXPERIENCE_CHARS {
        return Err(AppError::Validation(format!(
            "Please describe your experience in at least {MIN_EXPERIENCE_CHARS} characters."
        )));
    }

    let raw = suggester.suggest(text).await?;
    Ok(SkillSuggestions {
        suggested_skills: normalize_entries(raw.suggested_skills),
    })
}
