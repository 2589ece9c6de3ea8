//! Router surface tests.
//!
//! Drives the assembled router in-process with `tower::ServiceExt::oneshot`
//! and a lazy (never-connected) pool, covering every path that must resolve
//! before the database is touched: the auth gate on employee routes,
//! payload validation on account endpoints, and the undocumented root
//! banner.

use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body},
    http::{header::CONTENT_TYPE, Request, StatusCode},
    routing::get,
    Extension, Router,
};
use roster::api::{
    error::ErrorBody,
    handlers::{auth::AuthConfig, root},
    media::{MediaConfig, MediaStore},
};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::sync::Arc;
use tower::ServiceExt;

fn lazy_pool() -> PgPool {
    PgPoolOptions::new()
        .connect_lazy("postgres://postgres@localhost:1/postgres")
        .expect("lazy pool")
}

fn app() -> Result<Router> {
    let auth_config = Arc::new(AuthConfig::new("http://localhost:5173".to_string()));
    let media_config = MediaConfig::new(
        "http://localhost:9000/roster-media".to_string(),
        "http://localhost:9000/roster-media".to_string(),
    );
    let media_store = Arc::new(MediaStore::new(media_config)?);

    let (router, _openapi) = roster::api::router().split_for_parts();
    Ok(router
        .route("/", get(root::root))
        .layer(Extension(auth_config))
        .layer(Extension(media_store))
        .layer(Extension(lazy_pool())))
}

async fn error_body(response: axum::response::Response) -> Result<ErrorBody> {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .context("failed to read response body")?;
    serde_json::from_slice(&bytes).context("failed to parse error body")
}

#[tokio::test]
async fn root_banner_is_public() -> Result<()> {
    let response = app()?
        .oneshot(Request::builder().uri("/").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn unknown_route_is_404() -> Result<()> {
    let response = app()?
        .oneshot(Request::builder().uri("/v1/nope").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn employee_routes_reject_missing_credential() -> Result<()> {
    let guarded = [
        ("GET", "/v1/employees"),
        ("GET", "/v1/employees/deleted"),
        ("GET", "/v1/employees/search"),
        ("GET", "/v1/employees/EM-000123"),
        ("DELETE", "/v1/employees/EM-000123"),
        ("POST", "/v1/employees/EM-000123/restore"),
        ("GET", "/v1/admin/me"),
        ("POST", "/v1/admin/logout"),
    ];

    for (method, uri) in guarded {
        let response = app()?
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())?,
            )
            .await?;
        assert_eq!(
            response.status(),
            StatusCode::UNAUTHORIZED,
            "{method} {uri} should be gated"
        );
        let body = error_body(response).await?;
        assert_eq!(body.error, "unauthenticated", "{method} {uri}");
        assert_eq!(body.message, "Authentication required", "{method} {uri}");
    }
    Ok(())
}

#[tokio::test]
async fn picture_upload_rejects_missing_credential() -> Result<()> {
    // The multipart extractor only inspects headers, so the auth gate still
    // answers first.
    let response = app()?
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/employees/EM-000123/picture")
                .header(CONTENT_TYPE, "multipart/form-data; boundary=xyz")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = error_body(response).await?;
    assert_eq!(body.error, "unauthenticated");
    Ok(())
}

#[tokio::test]
async fn register_validates_before_touching_store() -> Result<()> {
    let payload = serde_json::json!({
        "name": "Alice",
        "email": "alice@example.com",
        "password": "short",
    });
    let response = app()?
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/admin/register")
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(payload.to_string()))?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = error_body(response).await?;
    assert_eq!(body.error, "validation_error");
    Ok(())
}

#[tokio::test]
async fn login_without_payload_is_validation_error() -> Result<()> {
    let response = app()?
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/admin/login")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = error_body(response).await?;
    assert_eq!(body.error, "validation_error");
    Ok(())
}

#[tokio::test]
async fn blank_reset_token_is_rejected_without_lookup() -> Result<()> {
    let response = app()?
        .oneshot(
            Request::builder()
                .uri("/v1/admin/verify-reset-token/%20")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = error_body(response).await?;
    assert_eq!(body.error, "invalid_or_expired_token");
    Ok(())
}

#[tokio::test]
async fn create_employee_requires_credential_before_validation() -> Result<()> {
    // Even a garbage body comes back 401: the gate runs first.
    let response = app()?
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/employees")
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}
