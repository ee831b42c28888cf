use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;

use crate::errors::AppError;
use crate::identity::Identity;
use crate::models::profile::{Profile, ProfileUpdate, Role};
use crate::signin::AuthenticatedUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SkillsRequest {
    pub skills: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct LocationsRequest {
    pub working_locations: Vec<String>,
}

async fn load_profile(state: &AppState, id: &Identity) -> Result<Profile, AppError> {
    state
        .profiles
        .read_profile(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile {id} not found")))
}

/// GET /api/v1/profile
pub async fn handle_get_own_profile(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<Profile>, AppError> {
    Ok(Json(load_profile(&state, &user.identity).await?))
}

/// GET /api/v1/profiles/:id
pub async fn handle_get_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Profile>, AppError> {
    Ok(Json(load_profile(&state, &Identity::new(id)).await?))
}

/// PATCH /api/v1/profile
pub async fn handle_update_profile(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<Profile>, AppError> {
    let profile = state
        .profiles
        .modify_profile(&user.identity, &|p: &mut Profile| p.apply_update(&update))
        .await?;
    Ok(Json(profile))
}

/// PUT /api/v1/profile/skills
pub async fn handle_set_skills(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(req): Json<SkillsRequest>,
) -> Result<Json<Profile>, AppError> {
    let profile = state
        .profiles
        .modify_profile(&user.identity, &|p: &mut Profile| {
            p.set_skills(req.skills.clone())
        })
        .await?;
    Ok(Json(profile))
}

/// PUT /api/v1/profile/locations
pub async fn handle_set_locations(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(req): Json<LocationsRequest>,
) -> Result<Json<Profile>, AppError> {
    let profile = state
        .profiles
        .modify_profile(&user.identity, &|p: &mut Profile| {
            p.set_working_locations(req.working_locations.clone())
        })
        .await?;
    Ok(Json(profile))
}

/// GET /api/v1/workers
pub async fn handle_list_workers(
    State(state): State<AppState>,
) -> Result<Json<Vec<Profile>>, AppError> {
    Ok(Json(state.profiles.list_by_role(Role::Worker).await?))
}
