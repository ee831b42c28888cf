pub mod health;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::jobs::handlers as jobs;
use crate::profiles::handlers as profiles;
use crate::signin::handlers as signin;
use crate::skills::handlers as skills;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Sign-in
        .route(
            "/api/v1/auth/credential",
            post(signin::handle_request_credential),
        )
        .route("/api/v1/auth/verify", post(signin::handle_verify_credential))
        .route("/api/v1/auth/bootstrap", post(signin::handle_retry_bootstrap))
        // Profiles
        .route(
            "/api/v1/profile",
            get(profiles::handle_get_own_profile).patch(profiles::handle_update_profile),
        )
        .route("/api/v1/profile/skills", put(profiles::handle_set_skills))
        .route(
            "/api/v1/profile/locations",
            put(profiles::handle_set_locations),
        )
        .route("/api/v1/profiles/:id", get(profiles::handle_get_profile))
        .route("/api/v1/workers", get(profiles::handle_list_workers))
        // Jobs
        .route(
            "/api/v1/jobs",
            get(jobs::handle_list_jobs).post(jobs::handle_post_job),
        )
        .route("/api/v1/jobs/:id", get(jobs::handle_get_job))
        // Skills
        .route("/api/v1/skills/suggest", post(skills::handle_suggest_skills))
        .with_state(state)
}
