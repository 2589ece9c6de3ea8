//! Employee search: substring match with filtering and sorting.

use axum::{
    extract::{Extension, Query},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use sqlx::PgPool;

use crate::api::error::ApiError;
use crate::api::handlers::auth::principal::require_auth;

use super::storage::{search_employees, SortBy, SortOrder};
use super::types::{EmployeeListResponse, EmployeeResponse, SearchQuery};

#[utoipa::path(
    get,
    path = "/v1/employees/search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching employees and their count.", body = EmployeeListResponse),
        (status = 400, description = "Unknown sort field or order."),
        (status = 401, description = "Missing or invalid session credential.")
    ),
    tag = "employees"
)]
pub async fn search(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    query: Query<SearchQuery>,
) -> Result<Response, ApiError> {
    require_auth(&headers, &pool).await?;

    let term = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty());
    let employment_type = query
        .employment_type
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty());

    let Some(sort_by) = SortBy::parse(query.sort_by.as_deref()) else {
        return Err(ApiError::Validation(
            "sort_by must be one of name, email, created_at",
        ));
    };
    let Some(sort_order) = SortOrder::parse(query.sort_order.as_deref()) else {
        return Err(ApiError::Validation("sort_order must be asc or desc"));
    };

    let records = search_employees(
        &pool,
        term,
        employment_type,
        query.include_deleted.unwrap_or(false),
        sort_by,
        sort_order,
    )
    .await?;

    let employees: Vec<EmployeeResponse> = records.into_iter().map(Into::into).collect();
    let body = EmployeeListResponse {
        count: employees.len(),
        employees,
    };
    Ok((StatusCode::OK, Json(body)).into_response())
}
