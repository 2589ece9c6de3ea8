//! Session cookie handling plus the `me` and `logout` endpoints.

use axum::{
    extract::Extension,
    http::{
        header::{InvalidHeaderValue, AUTHORIZATION, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;

use crate::api::error::ApiError;

use super::{
    state::AuthConfig,
    storage::{delete_session, lookup_session, SessionRecord},
    types::{AdminSummary, MessageResponse},
    utils::hash_token,
};

const SESSION_COOKIE_NAME: &str = "roster_session";

/// Resolve the request's session token into a session record.
///
/// Returns `Ok(None)` when the token is unknown or expired; a missing
/// carrier is the caller's concern (see `principal::require_auth`).
pub(super) async fn resolve_session(
    pool: &PgPool,
    token: &str,
) -> Result<Option<SessionRecord>, ApiError> {
    // Only the hash is stored; never compare raw tokens against the database.
    let token_hash = hash_token(token);
    match lookup_session(pool, &token_hash).await {
        Ok(record) => Ok(record),
        Err(err) => {
            error!("Failed to lookup session: {err}");
            Err(ApiError::Internal(err))
        }
    }
}

#[utoipa::path(
    get,
    path = "/v1/admin/me",
    responses(
        (status = 200, description = "The authenticated admin.", body = AdminSummary),
        (status = 401, description = "Missing or invalid session credential.")
    ),
    tag = "admin"
)]
pub async fn me(headers: HeaderMap, pool: Extension<PgPool>) -> Result<Response, ApiError> {
    let principal = super::principal::require_auth(&headers, &pool).await?;
    let response = AdminSummary {
        id: principal.admin_id.to_string(),
        name: principal.name,
        email: principal.email,
        created_at: principal.created_at,
    };
    Ok((StatusCode::OK, Json(response)).into_response())
}

#[utoipa::path(
    post,
    path = "/v1/admin/logout",
    responses(
        (status = 200, description = "Session cleared.", body = MessageResponse),
        (status = 401, description = "Missing or invalid session credential.")
    ),
    tag = "admin"
)]
pub async fn logout(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_config: Extension<Arc<AuthConfig>>,
) -> Result<Response, ApiError> {
    // Logout is guarded like every other session route so a stray call
    // without credentials is surfaced, but deletion itself is idempotent.
    let _principal = super::principal::require_auth(&headers, &pool).await?;

    if let Some(token) = extract_session_token(&headers) {
        let token_hash = hash_token(&token);
        if let Err(err) = delete_session(&pool, &token_hash).await {
            error!("Failed to delete session: {err}");
        }
    }

    // Always clear the cookie, even if the session record was missing.
    let mut response_headers = HeaderMap::new();
    if let Ok(cookie) = clear_session_cookie(&auth_config) {
        response_headers.insert(SET_COOKIE, cookie);
    }
    let body = MessageResponse {
        message: "Logged out".to_string(),
    };
    Ok((StatusCode::OK, response_headers, Json(body)).into_response())
}

/// Build a secure `HttpOnly` cookie for the session token.
pub(super) fn session_cookie(
    auth_config: &AuthConfig,
    token: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let ttl_seconds = auth_config.session_ttl_seconds();
    // Only mark cookies secure when the frontend is served over HTTPS.
    let secure = auth_config.session_cookie_secure();
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Strict; Max-Age={ttl_seconds}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn clear_session_cookie(auth_config: &AuthConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    let secure = auth_config.session_cookie_secure();
    let mut cookie =
        format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(super) fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = extract_bearer_token(headers) {
        return Some(token);
    }
    let header = headers.get(axum::http::header::COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == SESSION_COOKIE_NAME {
            return Some(val.to_string());
        }
    }
    None
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AuthConfig {
        AuthConfig::new("https://roster.example.com".to_string())
    }

    #[test]
    fn session_cookie_sets_attributes() {
        let cookie = session_cookie(&config(), "tok").expect("valid header value");
        let value = cookie.to_str().expect("ascii cookie");
        assert!(value.starts_with("roster_session=tok;"));
        assert!(value.contains("HttpOnly"));
        assert!(value.contains("SameSite=Strict"));
        assert!(value.contains("Max-Age=86400"));
        assert!(value.contains("Secure"));
    }

    #[test]
    fn session_cookie_omits_secure_for_http_frontend() {
        let config = AuthConfig::new("http://localhost:5173".to_string());
        let cookie = session_cookie(&config, "tok").expect("valid header value");
        assert!(!cookie.to_str().expect("ascii cookie").contains("Secure"));
    }

    #[test]
    fn clear_cookie_expires_immediately() {
        let cookie = clear_session_cookie(&config()).expect("valid header value");
        assert!(cookie.to_str().expect("ascii cookie").contains("Max-Age=0"));
    }

    #[test]
    fn extract_token_from_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::COOKIE,
            HeaderValue::from_static("other=1; roster_session=abc123; theme=dark"),
        );
        assert_eq!(extract_session_token(&headers), Some("abc123".to_string()));
    }

    #[test]
    fn extract_token_prefers_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer tok-a"));
        headers.insert(
            axum::http::header::COOKIE,
            HeaderValue::from_static("roster_session=tok-b"),
        );
        assert_eq!(extract_session_token(&headers), Some("tok-a".to_string()));
    }

    #[test]
    fn extract_token_none_when_missing() {
        let headers = HeaderMap::new();
        assert_eq!(extract_session_token(&headers), None);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(extract_session_token(&headers), None);
    }
}
