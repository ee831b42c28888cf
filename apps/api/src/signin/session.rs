use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::errors::AppError;
use crate::identity::{ProviderError, VerifiedIdentity};
use crate::state::AppState;

/// Extractor for routes that need a signed-in user.
///
/// Reads `Authorization: Bearer <session_token>` and resolves it with the
/// identity provider.
pub struct AuthenticatedUser(pub VerifiedIdentity);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AppError::Unauthorized)?;

        let verified = state
            .identity
            .lookup_session(token)
            .await
            .map_err(session_lookup_error)?;

        Ok(Self(verified))
    }
}

/// An outage stays retryable; any other lookup failure means the token is no good.
pub fn session_lookup_error(err: ProviderError) -> AppError {
    match err {
        ProviderError::Unavailable(msg) => AppError::IdentityUnavailable(msg),
        _ => AppError::Unauthorized,
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
