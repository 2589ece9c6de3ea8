//! Request/response types for employee registry endpoints.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct CreateEmployeeRequest {
    pub name: String,
    pub email: String,
    pub date_of_birth: NaiveDate,
    pub date_of_joining: NaiveDate,
    /// Free-form, typically full-time/part-time/contract/intern.
    pub employment_type: Option<String>,
    pub projects: Vec<String>,
    pub address: String,
    pub phone: String,
}

/// Partial update: only supplied fields change.
#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
pub struct UpdateEmployeeRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub date_of_joining: Option<NaiveDate>,
    pub employment_type: Option<String>,
    pub projects: Option<Vec<String>>,
    pub address: Option<String>,
    pub phone: Option<String>,
}

/// Employee fields exposed to API responses. The password hash is never
/// serialized.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct EmployeeResponse {
    pub id: String,
    pub employee_id: String,
    pub name: String,
    pub email: String,
    pub date_of_birth: NaiveDate,
    pub date_of_joining: NaiveDate,
    pub employment_type: Option<String>,
    pub manager_id: String,
    pub projects: Vec<String>,
    pub address: String,
    pub phone: String,
    pub picture_url: String,
    pub deleted_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct CreateEmployeeResponse {
    #[serde(flatten)]
    pub employee: EmployeeResponse,
    /// Shown exactly once; only a hash is stored.
    pub one_time_password: String,
    /// Whether the credentials email made it into the outbox.
    pub email_queued: bool,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct EmployeeListResponse {
    pub employees: Vec<EmployeeResponse>,
    pub count: usize,
}

#[derive(IntoParams, Deserialize, Debug, Default)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// Include soft-deleted records in the listing.
    pub include_deleted: Option<bool>,
}

#[derive(IntoParams, Deserialize, Debug, Default)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Case-insensitive substring matched against name, email, employee id,
    /// and employment type.
    pub q: Option<String>,
    /// Exact employment type filter.
    pub employment_type: Option<String>,
    pub include_deleted: Option<bool>,
    /// One of name, email, created_at.
    pub sort_by: Option<String>,
    /// asc or desc.
    pub sort_order: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct PictureResponse {
    pub picture_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn create_request_parses_dates() -> Result<()> {
        let request: CreateEmployeeRequest = serde_json::from_value(serde_json::json!({
            "name": "Bob",
            "email": "bob@example.com",
            "date_of_birth": "1990-04-01",
            "date_of_joining": "2024-09-16",
            "employment_type": "full-time",
            "projects": ["P1"],
            "address": "1 Main St",
            "phone": "+1 555 0100",
        }))?;
        assert_eq!(request.date_of_birth.to_string(), "1990-04-01");
        assert_eq!(request.projects, vec!["P1".to_string()]);
        Ok(())
    }

    #[test]
    fn update_request_fields_default_to_none() -> Result<()> {
        let request: UpdateEmployeeRequest = serde_json::from_value(serde_json::json!({
            "phone": "+1 555 0199",
        }))?;
        assert!(request.name.is_none());
        assert!(request.email.is_none());
        assert!(request.projects.is_none());
        assert_eq!(request.phone.as_deref(), Some("+1 555 0199"));
        Ok(())
    }

    #[test]
    fn create_response_flattens_employee() -> Result<()> {
        let response = CreateEmployeeResponse {
            employee: EmployeeResponse {
                id: "3e8f9f1e-0000-0000-0000-000000000000".to_string(),
                employee_id: "EM-000123".to_string(),
                name: "Bob".to_string(),
                email: "bob@example.com".to_string(),
                date_of_birth: NaiveDate::from_ymd_opt(1990, 4, 1).expect("valid date"),
                date_of_joining: NaiveDate::from_ymd_opt(2024, 9, 16).expect("valid date"),
                employment_type: Some("full-time".to_string()),
                manager_id: "6a1b2c3d-0000-0000-0000-000000000000".to_string(),
                projects: vec!["P1".to_string()],
                address: "1 Main St".to_string(),
                phone: "+1 555 0100".to_string(),
                picture_url: super::super::DEFAULT_AVATAR_URL.to_string(),
                deleted_at: None,
                created_at: "2026-01-01T00:00:00Z".to_string(),
                updated_at: "2026-01-01T00:00:00Z".to_string(),
            },
            one_time_password: "a1B2c3D4".to_string(),
            email_queued: true,
        };
        let value = serde_json::to_value(&response)?;
        assert_eq!(
            value.get("employee_id").and_then(serde_json::Value::as_str),
            Some("EM-000123")
        );
        assert_eq!(
            value
                .get("one_time_password")
                .and_then(serde_json::Value::as_str),
            Some("a1B2c3D4")
        );
        assert!(value.get("password_hash").is_none());
        Ok(())
    }
}
