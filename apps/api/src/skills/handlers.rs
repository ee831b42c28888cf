use axum::{extract::State, Json};
use serde::Deserialize;

use crate::errors::AppError;
use crate::skills::{suggest_skills, SkillSuggestions};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SuggestRequest {
    pub text: String,
}

/// POST /api/v1/skills/suggest
pub async fn handle_suggest_skills(
    State(state): State<AppState>,
    Json(req): Json<SuggestRequest>,
) -> Result<Json<SkillSuggestions>, AppError> {
    Ok(Json(suggest_skills(state.skills.as_ref(), &req.text).await?))
}
