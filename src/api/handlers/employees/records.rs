//! Employee CRUD, soft delete, and restore endpoints.

use axum::{
    extract::{Extension, Path, Query},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use sqlx::PgPool;
use tracing::warn;

use crate::api::error::ApiError;
use crate::api::handlers::auth::principal::require_auth;
use crate::api::handlers::auth::types::MessageResponse;
use crate::api::handlers::auth::utils::hash_password;
use crate::api::handlers::{normalize_email, valid_email, valid_name};

use super::generate_one_time_password;
use super::storage::{
    enqueue_credentials_email, get_by_employee_id, insert_employee, list_deleted_employees,
    list_employees, restore_employee, soft_delete_employee, update_employee, EmployeeChanges,
    InsertOutcome, NewEmployee, UpdateOutcome,
};
use super::types::{
    CreateEmployeeRequest, CreateEmployeeResponse, EmployeeListResponse, EmployeeResponse,
    ListQuery, UpdateEmployeeRequest,
};

/// Trim project tags, rejecting empty lists and blank entries.
fn normalize_projects(projects: &[String]) -> Option<Vec<String>> {
    if projects.is_empty() {
        return None;
    }
    let mut normalized = Vec::with_capacity(projects.len());
    for project in projects {
        let trimmed = project.trim();
        if trimmed.is_empty() {
            return None;
        }
        normalized.push(trimmed.to_string());
    }
    Some(normalized)
}

#[utoipa::path(
    post,
    path = "/v1/employees",
    request_body = CreateEmployeeRequest,
    responses(
        (status = 201, description = "Employee created; one-time password included.", body = CreateEmployeeResponse),
        (status = 400, description = "Invalid input or email already registered."),
        (status = 401, description = "Missing or invalid session credential.")
    ),
    tag = "employees"
)]
pub async fn create(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    payload: Option<Json<CreateEmployeeRequest>>,
) -> Result<Response, ApiError> {
    let principal = require_auth(&headers, &pool).await?;

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
    let Some(projects) = normalize_projects(&request.projects) else {
        return Err(ApiError::Validation("At least one project is required"));
    };
    let address = request.address.trim();
    if address.is_empty() {
        return Err(ApiError::Validation("Address is required"));
    }
    let phone = request.phone.trim();
    if phone.is_empty() {
        return Err(ApiError::Validation("Phone number is required"));
    }
    let employment_type = request
        .employment_type
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty());

    // The initial password is returned once in the response and otherwise
    // exists only as a hash.
    let one_time_password = generate_one_time_password();
    let password_hash = hash_password(&one_time_password)?;

    let fields = NewEmployee {
        name,
        email: &email,
        password_hash: &password_hash,
        date_of_birth: request.date_of_birth,
        date_of_joining: request.date_of_joining,
        employment_type,
        manager_id: principal.admin_id,
        projects: &projects,
        address,
        phone,
    };
    let record = match insert_employee(&pool, &fields).await? {
        InsertOutcome::Created(record) => record,
        InsertOutcome::EmailConflict => {
            return Err(ApiError::Conflict("Employee email already registered"));
        }
    };

    // The row is committed; a full outbox is not a reason to fail the create.
    let email_queued = match enqueue_credentials_email(&pool, &record, &one_time_password).await {
        Ok(()) => true,
        Err(err) => {
            warn!("Failed to enqueue credentials email: {err}");
            false
        }
    };

    let body = CreateEmployeeResponse {
        employee: EmployeeResponse::from(record),
        one_time_password,
        email_queued,
    };
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

#[utoipa::path(
    get,
    path = "/v1/employees",
    params(ListQuery),
    responses(
        (status = 200, description = "Employees, newest first.", body = EmployeeListResponse),
        (status = 401, description = "Missing or invalid session credential.")
    ),
    tag = "employees"
)]
pub async fn list(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    query: Query<ListQuery>,
) -> Result<Response, ApiError> {
    require_auth(&headers, &pool).await?;

    let records = list_employees(&pool, query.include_deleted.unwrap_or(false)).await?;
    let employees: Vec<EmployeeResponse> = records.into_iter().map(Into::into).collect();
    let body = EmployeeListResponse {
        count: employees.len(),
        employees,
    };
    Ok((StatusCode::OK, Json(body)).into_response())
}

#[utoipa::path(
    get,
    path = "/v1/employees/deleted",
    responses(
        (status = 200, description = "Soft-deleted employees only.", body = EmployeeListResponse),
        (status = 401, description = "Missing or invalid session credential.")
    ),
    tag = "employees"
)]
pub async fn list_deleted(
    headers: HeaderMap,
    pool: Extension<PgPool>,
) -> Result<Response, ApiError> {
    require_auth(&headers, &pool).await?;

    let records = list_deleted_employees(&pool).await?;
    let employees: Vec<EmployeeResponse> = records.into_iter().map(Into::into).collect();
    let body = EmployeeListResponse {
        count: employees.len(),
        employees,
    };
    Ok((StatusCode::OK, Json(body)).into_response())
}

#[utoipa::path(
    get,
    path = "/v1/employees/{id}",
    params(
        ("id" = String, Path, description = "External employee id, e.g. EM-000123")
    ),
    responses(
        (status = 200, description = "The employee record.", body = EmployeeResponse),
        (status = 401, description = "Missing or invalid session credential."),
        (status = 404, description = "Unknown or soft-deleted employee.")
    ),
    tag = "employees"
)]
pub async fn get_by_id(
    headers: HeaderMap,
    Path(id): Path<String>,
    pool: Extension<PgPool>,
) -> Result<Response, ApiError> {
    require_auth(&headers, &pool).await?;

    let Some(record) = get_by_employee_id(&pool, id.trim()).await? else {
        return Err(ApiError::NotFound("Employee not found"));
    };
    Ok((StatusCode::OK, Json(EmployeeResponse::from(record))).into_response())
}

#[utoipa::path(
    put,
    path = "/v1/employees/{id}",
    params(
        ("id" = String, Path, description = "External employee id, e.g. EM-000123")
    ),
    request_body = UpdateEmployeeRequest,
    responses(
        (status = 200, description = "Updated employee record.", body = EmployeeResponse),
        (status = 400, description = "Invalid input or email already registered."),
        (status = 401, description = "Missing or invalid session credential."),
        (status = 404, description = "Unknown or soft-deleted employee.")
    ),
    tag = "employees"
)]
pub async fn update(
    headers: HeaderMap,
    Path(id): Path<String>,
    pool: Extension<PgPool>,
    payload: Option<Json<UpdateEmployeeRequest>>,
) -> Result<Response, ApiError> {
    require_auth(&headers, &pool).await?;

    let Some(Json(request)) = payload else {
        return Err(ApiError::Validation("Missing payload"));
    };

    let name = request.name.as_deref().map(str::trim);
    if let Some(name) = name {
        if !valid_name(name) {
            return Err(ApiError::Validation("Name is required (max 30 characters)"));
        }
    }
    let email = request.email.as_deref().map(normalize_email);
    if let Some(email) = &email {
        if !valid_email(email) {
            return Err(ApiError::Validation("A valid email is required"));
        }
    }
    let projects = match &request.projects {
        Some(projects) => match normalize_projects(projects) {
            Some(projects) => Some(projects),
            None => return Err(ApiError::Validation("At least one project is required")),
        },
        None => None,
    };
    let address = request.address.as_deref().map(str::trim);
    if address.is_some_and(str::is_empty) {
        return Err(ApiError::Validation("Address is required"));
    }
    let phone = request.phone.as_deref().map(str::trim);
    if phone.is_some_and(str::is_empty) {
        return Err(ApiError::Validation("Phone number is required"));
    }
    let employment_type = request
        .employment_type
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty());

    let changes = EmployeeChanges {
        name,
        email: email.as_deref(),
        date_of_birth: request.date_of_birth,
        date_of_joining: request.date_of_joining,
        employment_type,
        projects: projects.as_deref(),
        address,
        phone,
    };
    match update_employee(&pool, id.trim(), &changes).await? {
        UpdateOutcome::Updated(record) => {
            Ok((StatusCode::OK, Json(EmployeeResponse::from(record))).into_response())
        }
        UpdateOutcome::EmailConflict => Err(ApiError::Conflict("Employee email already registered")),
        UpdateOutcome::NotFound => Err(ApiError::NotFound("Employee not found")),
    }
}

#[utoipa::path(
    delete,
    path = "/v1/employees/{id}",
    params(
        ("id" = String, Path, description = "External employee id, e.g. EM-000123")
    ),
    responses(
        (status = 200, description = "Employee soft-deleted.", body = MessageResponse),
        (status = 401, description = "Missing or invalid session credential."),
        (status = 404, description = "Unknown or already deleted employee.")
    ),
    tag = "employees"
)]
pub async fn remove(
    headers: HeaderMap,
    Path(id): Path<String>,
    pool: Extension<PgPool>,
) -> Result<Response, ApiError> {
    require_auth(&headers, &pool).await?;

    if soft_delete_employee(&pool, id.trim()).await? {
        let body = MessageResponse {
            message: "Employee deleted".to_string(),
        };
        Ok((StatusCode::OK, Json(body)).into_response())
    } else {
        Err(ApiError::NotFound("Employee not found"))
    }
}

#[utoipa::path(
    post,
    path = "/v1/employees/{id}/restore",
    params(
        ("id" = String, Path, description = "External employee id, e.g. EM-000123")
    ),
    responses(
        (status = 200, description = "Employee restored.", body = MessageResponse),
        (status = 401, description = "Missing or invalid session credential."),
        (status = 404, description = "No soft-deleted employee with that id.")
    ),
    tag = "employees"
)]
pub async fn restore(
    headers: HeaderMap,
    Path(id): Path<String>,
    pool: Extension<PgPool>,
) -> Result<Response, ApiError> {
    require_auth(&headers, &pool).await?;

    if restore_employee(&pool, id.trim()).await? {
        let body = MessageResponse {
            message: "Employee restored".to_string(),
        };
        Ok((StatusCode::OK, Json(body)).into_response())
    } else {
        Err(ApiError::NotFound("Employee not found"))
    }
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

    #[test]
    fn normalize_projects_trims_entries() {
        let projects = vec![" P1 ".to_string(), "P2".to_string()];
        assert_eq!(
            normalize_projects(&projects),
            Some(vec!["P1".to_string(), "P2".to_string()])
        );
    }

    #[test]
    fn normalize_projects_rejects_empty_and_blank() {
        assert_eq!(normalize_projects(&[]), None);
        assert_eq!(normalize_projects(&["  ".to_string()]), None);
        assert_eq!(normalize_projects(&["P1".to_string(), String::new()]), None);
    }

    #[tokio::test]
    async fn create_requires_session() {
        let result = create(HeaderMap::new(), Extension(pool()), None).await;
        assert!(matches!(result, Err(ApiError::Unauthenticated)));
    }

    #[tokio::test]
    async fn list_requires_session() {
        let result = list(
            HeaderMap::new(),
            Extension(pool()),
            Query(ListQuery::default()),
        )
        .await;
        assert!(matches!(result, Err(ApiError::Unauthenticated)));
    }

    #[tokio::test]
    async fn update_requires_session() {
        let result = update(
            HeaderMap::new(),
            Path("EM-000123".to_string()),
            Extension(pool()),
            Some(Json(UpdateEmployeeRequest::default())),
        )
        .await;
        assert!(matches!(result, Err(ApiError::Unauthenticated)));
    }

    #[tokio::test]
    async fn remove_requires_session() {
        let result = remove(
            HeaderMap::new(),
            Path("EM-000123".to_string()),
            Extension(pool()),
        )
        .await;
        assert!(matches!(result, Err(ApiError::Unauthenticated)));
    }
}
