use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::errors::AppError;
use crate::jobs::repository::{add_job, get_job, list_jobs, JobFilter};
use crate::jobs::validation::{validate_new_job, NewJobRequest};
use crate::models::job::JobRow;
use crate::signin::AuthenticatedUser;
use crate::state::AppState;

/// POST /api/v1/jobs
pub async fn handle_post_job(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(req): Json<NewJobRequest>,
) -> Result<(StatusCode, Json<JobRow>), AppError> {
    validate_new_job(&req).map_err(|problems| AppError::Validation(problems.join(" ")))?;

    let customer_name = state
        .profiles
        .read_profile(&user.identity)
        .await?
        .map(|p| p.display_name);

    let job = add_job(&state.db, &user.identity, customer_name.as_deref(), &req).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

/// GET /api/v1/jobs
pub async fn handle_list_jobs(
    State(state): State<AppState>,
    Query(filter): Query<JobFilter>,
) -> Result<Json<Vec<JobRow>>, AppError> {
    Ok(Json(list_jobs(&state.db, &filter).await?))
}

/// GET /api/v1/jobs/:id
pub async fn handle_get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobRow>, AppError> {
    get_job(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Job {id} not found")))
}
