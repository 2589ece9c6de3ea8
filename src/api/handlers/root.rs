use axum::{response::IntoResponse, Json};
use serde_json::json;

// Service banner for the bare root path; intentionally undocumented in OpenAPI.
pub async fn root() -> impl IntoResponse {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "admin": "/v1/admin",
            "employees": "/v1/employees",
        },
    }))
}
