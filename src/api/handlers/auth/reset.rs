//! Password reset endpoints: request, verify, and apply.

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;

use crate::api::error::ApiError;
use crate::api::handlers::{normalize_email, valid_email};

use super::{
    state::AuthConfig,
    storage::{consume_reset_token, create_reset_request, lookup_admin_by_email, reset_token_valid},
    types::{ForgotPasswordRequest, MessageResponse, ResetPasswordRequest, VerifyResetTokenResponse},
    utils::{hash_password, hash_token},
    MIN_PASSWORD_LENGTH,
};

#[utoipa::path(
    post,
    path = "/v1/admin/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Reset token issued and email queued.", body = MessageResponse),
        (status = 404, description = "No admin account for that email.")
    ),
    tag = "admin"
)]
pub async fn forgot_password(
    pool: Extension<PgPool>,
    auth_config: Extension<Arc<AuthConfig>>,
    payload: Option<Json<ForgotPasswordRequest>>,
) -> Result<Response, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::Validation("Missing payload"));
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return Err(ApiError::Validation("A valid email is required"));
    }

    let Some(auth_record) = lookup_admin_by_email(&pool, &email).await? else {
        return Err(ApiError::NotFound("No admin account for that email"));
    };

    // Token issue and outbox enqueue commit together; delivery itself is
    // asynchronous, so the response never reports mailer health.
    create_reset_request(&pool, &auth_record.record, &auth_config).await?;

    let body = MessageResponse {
        message: "Password reset email queued".to_string(),
    };
    Ok((StatusCode::OK, Json(body)).into_response())
}

#[utoipa::path(
    get,
    path = "/v1/admin/verify-reset-token/{token}",
    params(
        ("token" = String, Path, description = "Reset token from the email link")
    ),
    responses(
        (status = 200, description = "Token is valid.", body = VerifyResetTokenResponse),
        (status = 400, description = "Token is unknown, expired, or used.")
    ),
    tag = "admin"
)]
pub async fn verify_reset_token(
    Path(token): Path<String>,
    pool: Extension<PgPool>,
) -> Result<Response, ApiError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(ApiError::InvalidOrExpiredToken);
    }

    // Pure check: the token is not consumed here so the client can render
    // the reset form first.
    let token_hash = hash_token(token);
    if reset_token_valid(&pool, &token_hash).await? {
        let body = VerifyResetTokenResponse { valid: true };
        Ok((StatusCode::OK, Json(body)).into_response())
    } else {
        Err(ApiError::InvalidOrExpiredToken)
    }
}

#[utoipa::path(
    post,
    path = "/v1/admin/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password replaced; token consumed.", body = MessageResponse),
        (status = 400, description = "Token invalid/expired or password too short.")
    ),
    tag = "admin"
)]
pub async fn reset_password(
    pool: Extension<PgPool>,
    payload: Option<Json<ResetPasswordRequest>>,
) -> Result<Response, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::Validation("Missing payload"));
    };

    let token = request.token.trim();
    if token.is_empty() {
        return Err(ApiError::InvalidOrExpiredToken);
    }
    if request.new_password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::Validation(
            "Password must be at least 8 characters",
        ));
    }

    let token_hash = hash_token(token);
    let new_password_hash = hash_password(&request.new_password)?;

    if consume_reset_token(&pool, &token_hash, &new_password_hash).await? {
        let body = MessageResponse {
            message: "Password has been reset".to_string(),
        };
        Ok((StatusCode::OK, Json(body)).into_response())
    } else {
        Err(ApiError::InvalidOrExpiredToken)
    }
}
