use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::profiles::store::StoreError;
use crate::signin::{Recovery, SignInError};

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Profile store error: {0}")]
    Store(#[from] StoreError),

    #[error("Sign-in error: {0}")]
    SignIn(#[from] SignInError),

    #[error("Identity provider unavailable: {0}")]
    IdentityUnavailable(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

struct ErrorBody {
    status: StatusCode,
    code: &'static str,
    message: String,
    recovery: Option<Recovery>,
    details: Option<Value>,
}

impl ErrorBody {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            recovery: None,
            details: None,
        }
    }
}

fn sign_in_body(err: &SignInError) -> ErrorBody {
    let (status, code) = match err {
        SignInError::IssueFailed(_) => (StatusCode::BAD_REQUEST, "ISSUE_FAILED"),
        SignInError::InvalidCode(_) => (StatusCode::UNAUTHORIZED, "INVALID_CODE"),
        SignInError::ContextLost => (StatusCode::GONE, "CONTEXT_LOST"),
        SignInError::BootstrapFailed { .. } => {
            (StatusCode::SERVICE_UNAVAILABLE, "BOOTSTRAP_FAILED")
        }
    };
    let mut body = ErrorBody::new(status, code, err.to_string());
    body.recovery = Some(err.recovery());
    if let SignInError::BootstrapFailed { verified, role, source } = err {
        tracing::error!("Profile bootstrap failed for {}: {source}", verified.identity);
        body.details = Some(json!({
            "session_token": verified.session_token,
            "role": role,
        }));
    }
    body
}

fn store_body(err: &StoreError) -> ErrorBody {
    match err {
        StoreError::NotFound => ErrorBody::new(StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string()),
        StoreError::Rejected(rule) => ErrorBody::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "VALIDATION_ERROR",
            rule.to_string(),
        ),
        StoreError::Unavailable(_) | StoreError::Corrupt(_) => {
            tracing::error!("Profile store error: {err}");
            ErrorBody::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "STORE_ERROR",
                "A profile storage error occurred",
            )
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = match &self {
            AppError::NotFound(msg) => ErrorBody::new(StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            AppError::Validation(msg) => {
                ErrorBody::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg)
            }
            AppError::Unauthorized => ErrorBody::new(
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Authentication required",
            ),
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                ErrorBody::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred",
                )
            }
            AppError::Store(e) => store_body(e),
            AppError::SignIn(e) => sign_in_body(e),
            AppError::IdentityUnavailable(msg) => {
                tracing::error!("Identity provider unavailable: {msg}");
                ErrorBody::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "IDENTITY_UNAVAILABLE",
                    "The sign-in service is unavailable, try again shortly",
                )
            }
            AppError::Llm(msg) => {
                tracing::error!("LLM error: {msg}");
                ErrorBody::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "LLM_ERROR",
                    "An AI processing error occurred",
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                ErrorBody::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred",
                )
            }
        };

        let mut error = json!({
            "code": body.code,
            "message": body.message,
        });
        if let Some(recovery) = body.recovery {
            error["recovery"] = json!(recovery);
        }
        if let Some(details) = body.details {
            error["details"] = details;
        }

        (body.status, Json(json!({ "error": error }))).into_response()
    }
}
