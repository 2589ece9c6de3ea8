//! Admin registration and login endpoints.

use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;

use crate::api::error::ApiError;
use crate::api::handlers::{normalize_email, valid_email, valid_name};

use super::{
    session::session_cookie,
    state::AuthConfig,
    storage::{insert_admin, insert_session, lookup_admin_by_email, AdminRecord, RegisterOutcome},
    types::{AdminSummary, LoginRequest, RegisterRequest},
    utils::{hash_password, level_password_timing, verify_password},
    MIN_PASSWORD_LENGTH,
};

#[utoipa::path(
    post,
    path = "/v1/admin/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Admin registered; session cookie set.", body = AdminSummary),
        (status = 400, description = "Invalid input or email already registered.")
    ),
    tag = "admin"
)]
pub async fn register(
    pool: Extension<PgPool>,
    auth_config: Extension<Arc<AuthConfig>>,
    payload: Option<Json<RegisterRequest>>,
) -> Result<Response, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::Validation("Missing payload"));
    };

    let name = request.name.trim();
    if !valid_name(name) {
        return Err(ApiError::Validation("Name is required (max 30 characters)"));
    }
    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return Err(ApiError::Validation("A valid email is required"));
    }
    if request.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::Validation(
            "Password must be at least 8 characters",
        ));
    }

    let password_hash = hash_password(&request.password)?;

    let admin = match insert_admin(&pool, name, &email, &password_hash).await? {
        RegisterOutcome::Created(admin) => admin,
        RegisterOutcome::Conflict => {
            return Err(ApiError::Conflict("Admin already exists"));
        }
    };

    start_session(&pool, &auth_config, &admin, StatusCode::CREATED).await
}

#[utoipa::path(
    post,
    path = "/v1/admin/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful; session cookie set.", body = AdminSummary),
        (status = 401, description = "Invalid credentials.")
    ),
    tag = "admin"
)]
pub async fn login(
    pool: Extension<PgPool>,
    auth_config: Extension<Arc<AuthConfig>>,
    payload: Option<Json<LoginRequest>>,
) -> Result<Response, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::Validation("Missing payload"));
    };

    let email = normalize_email(&request.email);

    let Some(auth_record) = lookup_admin_by_email(&pool, &email).await? else {
        // Unknown email takes the same path and cost as a wrong password.
        level_password_timing(&request.password);
        return Err(ApiError::InvalidCredentials);
    };

    if !verify_password(&request.password, &auth_record.password_hash) {
        return Err(ApiError::InvalidCredentials);
    }

    start_session(&pool, &auth_config, &auth_record.record, StatusCode::OK).await
}

/// Mint a session for the admin and attach the cookie to the response.
async fn start_session(
    pool: &PgPool,
    auth_config: &AuthConfig,
    admin: &AdminRecord,
    status: StatusCode,
) -> Result<Response, ApiError> {
    let token = insert_session(pool, admin.admin_id, auth_config.session_ttl_seconds()).await?;

    let mut headers = HeaderMap::new();
    match session_cookie(auth_config, &token) {
        Ok(cookie) => {
            headers.insert(SET_COOKIE, cookie);
        }
        Err(err) => {
            error!("Failed to build session cookie: {err}");
            return Err(ApiError::Internal(anyhow::anyhow!(
                "failed to build session cookie"
            )));
        }
    }

    let body = AdminSummary {
        id: admin.admin_id.to_string(),
        name: admin.name.clone(),
        email: admin.email.clone(),
        created_at: admin.created_at.clone(),
    };
    Ok((status, headers, Json(body)).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    fn pool() -> PgPool {
        PgPoolOptions::new()
            .connect_lazy("postgres://postgres@localhost/postgres")
            .expect("lazy pool")
    }

    fn config() -> Arc<AuthConfig> {
        Arc::new(AuthConfig::new("http://localhost:5173".to_string()))
    }

    #[tokio::test]
    async fn register_missing_payload() {
        let result = register(Extension(pool()), Extension(config()), None).await;
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }

    #[tokio::test]
    async fn register_rejects_short_password() {
        let request = RegisterRequest {
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            password: "short".to_string(),
        };
        let result = register(
            Extension(pool()),
            Extension(config()),
            Some(Json(request)),
        )
        .await;
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }

    #[tokio::test]
    async fn register_rejects_bad_email() {
        let request = RegisterRequest {
            name: "Alice".to_string(),
            email: "not-an-email".to_string(),
            password: "pw12345678".to_string(),
        };
        let result = register(
            Extension(pool()),
            Extension(config()),
            Some(Json(request)),
        )
        .await;
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }

    #[tokio::test]
    async fn login_missing_payload() {
        let result = login(Extension(pool()), Extension(config()), None).await;
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }
}
