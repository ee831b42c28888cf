use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::identity::CredentialMaterial;
use crate::models::profile::{Profile, Role};
use crate::signin::session::session_lookup_error;
use crate::signin::{PendingVerification, Ready};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CredentialRequest {
    pub contact: String,
    /// Absent on the login form; only used if this sign-in creates the profile.
    #[serde(default)]
    pub role: Role,
    pub app_verification: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CredentialResponse {
    /// Kept by the client and sent back with the credential.
    pub pending: PendingVerification,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub pending: Option<PendingVerification>,
    pub credential: CredentialMaterial,
}

#[derive(Debug, Deserialize)]
pub struct BootstrapRequest {
    pub session_token: String,
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub profile: Profile,
    pub session_token: String,
    pub created: bool,
}

impl From<Ready> for SessionResponse {
    fn from(ready: Ready) -> Self {
        Self {
            profile: ready.profile,
            session_token: ready.session.session_token,
            created: ready.created,
        }
    }
}

/// POST /api/v1/auth/credential
pub async fn handle_request_credential(
    State(state): State<AppState>,
    Json(req): Json<CredentialRequest>,
) -> Result<Json<CredentialResponse>, AppError> {
    let mut sign_in = state.sign_in();
    let pending = sign_in
        .request_credential(&req.contact, req.role, req.app_verification.as_deref())
        .await?;
    Ok(Json(CredentialResponse { pending }))
}

/// POST /api/v1/auth/verify
pub async fn handle_verify_credential(
    State(state): State<AppState>,
    Json(req): Json<VerifyRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let mut sign_in = state.sign_in().with_pending(req.pending);
    let ready = sign_in.submit_credential(&req.credential).await?;
    Ok(Json(ready.into()))
}

/// POST /api/v1/auth/bootstrap
/// Retries profile creation for an already verified session.
pub async fn handle_retry_bootstrap(
    State(state): State<AppState>,
    Json(req): Json<BootstrapRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let verified = state
        .identity
        .lookup_session(&req.session_token)
        .await
        .map_err(session_lookup_error)?;
    let mut sign_in = state.sign_in().with_failed_bootstrap(verified, req.role);
    let ready = sign_in.retry_bootstrap().await?;
    Ok(Json(ready.into()))
}
