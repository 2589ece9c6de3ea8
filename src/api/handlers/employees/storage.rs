//! Database helpers for the employee registry.
//!
//! Soft deletion is a `deleted_at` timestamp: NULL means active. Every
//! default read filters on it; the deleted listing and search inversions
//! opt back in explicitly. Uniqueness (email, employee id) is enforced by
//! the store's UNIQUE constraints; the insert loop below only decides how
//! to react to a violation.

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use serde_json::json;
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use crate::api::email::TEMPLATE_EMPLOYEE_CREDENTIALS;
use crate::api::handlers::auth::utils::{is_unique_violation, unique_violation_constraint};

use super::generate_employee_id;
use super::types::EmployeeResponse;

const EMAIL_CONSTRAINT: &str = "employees_email_key";
const EMPLOYEE_ID_CONSTRAINT: &str = "employees_employee_id_key";

/// How many fresh external ids to try before giving up on creation.
const ID_GENERATION_ATTEMPTS: usize = 5;

/// Employee row as read from the store. Never carries the password hash
/// out of this module.
#[derive(Debug, Clone)]
pub(super) struct EmployeeRecord {
    pub(super) id: Uuid,
    pub(super) employee_id: String,
    pub(super) name: String,
    pub(super) email: String,
    pub(super) date_of_birth: NaiveDate,
    pub(super) date_of_joining: NaiveDate,
    pub(super) employment_type: Option<String>,
    pub(super) manager_id: Uuid,
    pub(super) projects: Vec<String>,
    pub(super) address: String,
    pub(super) phone: String,
    pub(super) picture_url: String,
    pub(super) deleted_at: Option<String>,
    pub(super) created_at: String,
    pub(super) updated_at: String,
}

impl From<EmployeeRecord> for EmployeeResponse {
    fn from(record: EmployeeRecord) -> Self {
        Self {
            id: record.id.to_string(),
            employee_id: record.employee_id,
            name: record.name,
            email: record.email,
            date_of_birth: record.date_of_birth,
            date_of_joining: record.date_of_joining,
            employment_type: record.employment_type,
            manager_id: record.manager_id.to_string(),
            projects: record.projects,
            address: record.address,
            phone: record.phone,
            picture_url: record.picture_url,
            deleted_at: record.deleted_at,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Validated fields for a new employee row.
pub(super) struct NewEmployee<'a> {
    pub(super) name: &'a str,
    pub(super) email: &'a str,
    pub(super) password_hash: &'a str,
    pub(super) date_of_birth: NaiveDate,
    pub(super) date_of_joining: NaiveDate,
    pub(super) employment_type: Option<&'a str>,
    pub(super) manager_id: Uuid,
    pub(super) projects: &'a [String],
    pub(super) address: &'a str,
    pub(super) phone: &'a str,
}

#[derive(Debug)]
pub(super) enum InsertOutcome {
    Created(EmployeeRecord),
    EmailConflict,
}

#[derive(Debug)]
pub(super) enum UpdateOutcome {
    Updated(EmployeeRecord),
    EmailConflict,
    NotFound,
}

/// Whitelisted sort columns for listings and search.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum SortBy {
    Name,
    Email,
    CreatedAt,
}

impl SortBy {
    /// Parse a query string value; `None` input means the default.
    pub(super) fn parse(value: Option<&str>) -> Option<Self> {
        match value {
            None => Some(Self::CreatedAt),
            Some("name") => Some(Self::Name),
            Some("email") => Some(Self::Email),
            Some("created_at") => Some(Self::CreatedAt),
            Some(_) => None,
        }
    }

    const fn column(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Email => "email",
            Self::CreatedAt => "created_at",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    /// Parse a query string value; `None` input means the default.
    pub(super) fn parse(value: Option<&str>) -> Option<Self> {
        match value {
            None => Some(Self::Desc),
            Some("asc") => Some(Self::Asc),
            Some("desc") => Some(Self::Desc),
            Some(_) => None,
        }
    }

    const fn direction(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

fn employee_from_row(row: &PgRow) -> EmployeeRecord {
    EmployeeRecord {
        id: row.get("id"),
        employee_id: row.get("employee_id"),
        name: row.get("name"),
        email: row.get("email"),
        date_of_birth: row.get("date_of_birth"),
        date_of_joining: row.get("date_of_joining"),
        employment_type: row.get("employment_type"),
        manager_id: row.get("manager_id"),
        projects: row.get("projects"),
        address: row.get("address"),
        phone: row.get("phone"),
        picture_url: row.get("picture_url"),
        deleted_at: row.get("deleted_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Insert a new employee, generating a fresh external id on collision.
///
/// The UNIQUE constraints are authoritative: an email violation surfaces
/// as a conflict, an id violation picks a new candidate and retries.
pub(super) async fn insert_employee(
    pool: &PgPool,
    fields: &NewEmployee<'_>,
) -> Result<InsertOutcome> {
    let query = r#"
        INSERT INTO employees (
            employee_id, name, email, password_hash, date_of_birth,
            date_of_joining, employment_type, manager_id, projects,
            address, phone
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING id, employee_id, name, email, date_of_birth, date_of_joining,
            employment_type, manager_id, projects, address, phone, picture_url,
            to_char(deleted_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS deleted_at,
            to_char(created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at,
            to_char(updated_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS updated_at
    "#;
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );

    for _ in 0..ID_GENERATION_ATTEMPTS {
        let employee_id = generate_employee_id();
        let row = sqlx::query(query)
            .bind(&employee_id)
            .bind(fields.name)
            .bind(fields.email)
            .bind(fields.password_hash)
            .bind(fields.date_of_birth)
            .bind(fields.date_of_joining)
            .bind(fields.employment_type)
            .bind(fields.manager_id)
            .bind(fields.projects)
            .bind(fields.address)
            .bind(fields.phone)
            .fetch_one(pool)
            .instrument(span.clone())
            .await;

        match row {
            Ok(row) => return Ok(InsertOutcome::Created(employee_from_row(&row))),
            Err(err) if is_unique_violation(&err) => {
                match unique_violation_constraint(&err).as_deref() {
                    Some(EMPLOYEE_ID_CONSTRAINT) => {}
                    Some(EMAIL_CONSTRAINT) | None => return Ok(InsertOutcome::EmailConflict),
                    Some(constraint) => {
                        return Err(anyhow!("unexpected unique violation: {constraint}"));
                    }
                }
            }
            Err(err) => return Err(err).context("failed to insert employee"),
        }
    }

    Err(anyhow!("failed to generate unique employee id"))
}

/// Queue the one-time credentials email for a freshly created employee.
pub(super) async fn enqueue_credentials_email(
    pool: &PgPool,
    record: &EmployeeRecord,
    one_time_password: &str,
) -> Result<()> {
    let payload = json!({
        "email": record.email,
        "name": record.name,
        "employee_id": record.employee_id,
        "one_time_password": one_time_password,
    });
    let payload_text =
        serde_json::to_string(&payload).context("failed to serialize credentials email payload")?;

    let query = r"
        INSERT INTO email_outbox (to_email, template, payload_json)
        VALUES ($1, $2, $3::jsonb)
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(&record.email)
        .bind(TEMPLATE_EMPLOYEE_CREDENTIALS)
        .bind(payload_text)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to insert credentials email outbox row")?;
    Ok(())
}

/// All employees, newest first. Soft-deleted rows only when requested.
pub(super) async fn list_employees(
    pool: &PgPool,
    include_deleted: bool,
) -> Result<Vec<EmployeeRecord>> {
    let query = r#"
        SELECT id, employee_id, name, email, date_of_birth, date_of_joining,
            employment_type, manager_id, projects, address, phone, picture_url,
            to_char(deleted_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS deleted_at,
            to_char(created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at,
            to_char(updated_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS updated_at
        FROM employees
        WHERE deleted_at IS NULL OR $1
        ORDER BY created_at DESC
    "#;
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let rows = sqlx::query(query)
        .bind(include_deleted)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to list employees")?;

    Ok(rows.iter().map(employee_from_row).collect())
}

/// Only the soft-deleted records, newest first.
pub(super) async fn list_deleted_employees(pool: &PgPool) -> Result<Vec<EmployeeRecord>> {
    let query = r#"
        SELECT id, employee_id, name, email, date_of_birth, date_of_joining,
            employment_type, manager_id, projects, address, phone, picture_url,
            to_char(deleted_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS deleted_at,
            to_char(created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at,
            to_char(updated_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS updated_at
        FROM employees
        WHERE deleted_at IS NOT NULL
        ORDER BY created_at DESC
    "#;
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let rows = sqlx::query(query)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to list deleted employees")?;

    Ok(rows.iter().map(employee_from_row).collect())
}

/// Look up an active employee by external id.
pub(super) async fn get_by_employee_id(
    pool: &PgPool,
    employee_id: &str,
) -> Result<Option<EmployeeRecord>> {
    let query = r#"
        SELECT id, employee_id, name, email, date_of_birth, date_of_joining,
            employment_type, manager_id, projects, address, phone, picture_url,
            to_char(deleted_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS deleted_at,
            to_char(created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at,
            to_char(updated_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS updated_at
        FROM employees
        WHERE employee_id = $1
          AND deleted_at IS NULL
        LIMIT 1
    "#;
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(employee_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup employee")?;

    Ok(row.map(|row| employee_from_row(&row)))
}

/// Fields to change in a partial update. `None` keeps the stored value.
pub(super) struct EmployeeChanges<'a> {
    pub(super) name: Option<&'a str>,
    pub(super) email: Option<&'a str>,
    pub(super) date_of_birth: Option<NaiveDate>,
    pub(super) date_of_joining: Option<NaiveDate>,
    pub(super) employment_type: Option<&'a str>,
    pub(super) projects: Option<&'a [String]>,
    pub(super) address: Option<&'a str>,
    pub(super) phone: Option<&'a str>,
}

/// Apply a partial update to an active employee.
pub(super) async fn update_employee(
    pool: &PgPool,
    employee_id: &str,
    changes: &EmployeeChanges<'_>,
) -> Result<UpdateOutcome> {
    let query = r#"
        UPDATE employees
        SET name = COALESCE($2, name),
            email = COALESCE($3, email),
            date_of_birth = COALESCE($4, date_of_birth),
            date_of_joining = COALESCE($5, date_of_joining),
            employment_type = COALESCE($6, employment_type),
            projects = COALESCE($7, projects),
            address = COALESCE($8, address),
            phone = COALESCE($9, phone),
            updated_at = NOW()
        WHERE employee_id = $1
          AND deleted_at IS NULL
        RETURNING id, employee_id, name, email, date_of_birth, date_of_joining,
            employment_type, manager_id, projects, address, phone, picture_url,
            to_char(deleted_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS deleted_at,
            to_char(created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at,
            to_char(updated_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS updated_at
    "#;
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(employee_id)
        .bind(changes.name)
        .bind(changes.email)
        .bind(changes.date_of_birth)
        .bind(changes.date_of_joining)
        .bind(changes.employment_type)
        .bind(changes.projects)
        .bind(changes.address)
        .bind(changes.phone)
        .fetch_optional(pool)
        .instrument(span)
        .await;

    match row {
        Ok(Some(row)) => Ok(UpdateOutcome::Updated(employee_from_row(&row))),
        Ok(None) => Ok(UpdateOutcome::NotFound),
        Err(err) if is_unique_violation(&err) => Ok(UpdateOutcome::EmailConflict),
        Err(err) => Err(err).context("failed to update employee"),
    }
}

/// Soft-delete an active employee. `false` when absent or already deleted.
pub(super) async fn soft_delete_employee(pool: &PgPool, employee_id: &str) -> Result<bool> {
    let query = r"
        UPDATE employees
        SET deleted_at = NOW(),
            updated_at = NOW()
        WHERE employee_id = $1
          AND deleted_at IS NULL
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(employee_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to soft-delete employee")?;
    Ok(result.rows_affected() > 0)
}

/// Restore a soft-deleted employee. `false` when no deleted record matches.
pub(super) async fn restore_employee(pool: &PgPool, employee_id: &str) -> Result<bool> {
    let query = r"
        UPDATE employees
        SET deleted_at = NULL,
            updated_at = NOW()
        WHERE employee_id = $1
          AND deleted_at IS NOT NULL
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(employee_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to restore employee")?;
    Ok(result.rows_affected() > 0)
}

/// Record a new picture URL and return the one it replaced.
///
/// `None` when the employee is unknown or soft-deleted. The select locks
/// the row so a concurrent upload cannot lose the previous URL.
pub(super) async fn replace_picture_url(
    pool: &PgPool,
    employee_id: &str,
    picture_url: &str,
) -> Result<Option<String>> {
    let mut tx = pool.begin().await.context("begin picture transaction")?;

    let query = r"
        SELECT picture_url
        FROM employees
        WHERE employee_id = $1
          AND deleted_at IS NULL
        FOR UPDATE
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(employee_id)
        .fetch_optional(&mut *tx)
        .instrument(span)
        .await
        .context("failed to lookup current picture")?;

    let Some(row) = row else {
        let _ = tx.rollback().await;
        return Ok(None);
    };
    let previous: String = row.get("picture_url");

    let query = r"
        UPDATE employees
        SET picture_url = $2,
            updated_at = NOW()
        WHERE employee_id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(employee_id)
        .bind(picture_url)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to update picture url")?;

    tx.commit().await.context("commit picture transaction")?;
    Ok(Some(previous))
}

/// Case-insensitive substring search ORed across name, email, employee id,
/// and employment type, with an optional exact type filter.
pub(super) async fn search_employees(
    pool: &PgPool,
    term: Option<&str>,
    employment_type: Option<&str>,
    include_deleted: bool,
    sort_by: SortBy,
    sort_order: SortOrder,
) -> Result<Vec<EmployeeRecord>> {
    let pattern = term.map(|term| format!("%{}%", escape_like(term)));

    // ORDER BY cannot be bound; both parts come from whitelisted enums.
    let query = format!(
        r#"
        SELECT id, employee_id, name, email, date_of_birth, date_of_joining,
            employment_type, manager_id, projects, address, phone, picture_url,
            to_char(deleted_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS deleted_at,
            to_char(created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at,
            to_char(updated_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS updated_at
        FROM employees
        WHERE ($1::text IS NULL
               OR name ILIKE $1
               OR email ILIKE $1
               OR employee_id ILIKE $1
               OR employment_type ILIKE $1)
          AND ($2::text IS NULL OR employment_type = $2)
          AND (deleted_at IS NULL OR $3)
        ORDER BY {} {}
    "#,
        sort_by.column(),
        sort_order.direction()
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let rows = sqlx::query(&query)
        .bind(pattern)
        .bind(employment_type)
        .bind(include_deleted)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to search employees")?;

    Ok(rows.iter().map(employee_from_row).collect())
}

/// Escape LIKE wildcards so user input matches literally.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_like_handles_wildcards() {
        assert_eq!(escape_like("plain"), "plain");
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
    }

    #[test]
    fn sort_by_parses_whitelist_only() {
        assert_eq!(SortBy::parse(None), Some(SortBy::CreatedAt));
        assert_eq!(SortBy::parse(Some("name")), Some(SortBy::Name));
        assert_eq!(SortBy::parse(Some("email")), Some(SortBy::Email));
        assert_eq!(SortBy::parse(Some("created_at")), Some(SortBy::CreatedAt));
        assert_eq!(SortBy::parse(Some("password_hash")), None);
        assert_eq!(SortBy::parse(Some("name; DROP TABLE employees")), None);
    }

    #[test]
    fn sort_order_defaults_descending() {
        assert_eq!(SortOrder::parse(None), Some(SortOrder::Desc));
        assert_eq!(SortOrder::parse(Some("asc")), Some(SortOrder::Asc));
        assert_eq!(SortOrder::parse(Some("desc")), Some(SortOrder::Desc));
        assert_eq!(SortOrder::parse(Some("sideways")), None);
    }

    #[test]
    fn record_converts_to_response_without_hash() {
        let record = EmployeeRecord {
            id: Uuid::nil(),
            employee_id: "EM-000123".to_string(),
            name: "Bob".to_string(),
            email: "bob@example.com".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 4, 1).expect("valid date"),
            date_of_joining: NaiveDate::from_ymd_opt(2024, 9, 16).expect("valid date"),
            employment_type: Some("full-time".to_string()),
            manager_id: Uuid::nil(),
            projects: vec!["P1".to_string()],
            address: "1 Main St".to_string(),
            phone: "+1 555 0100".to_string(),
            picture_url: super::super::DEFAULT_AVATAR_URL.to_string(),
            deleted_at: None,
            created_at: "2026-01-01T00:00:00Z".to_string(),
            updated_at: "2026-01-01T00:00:00Z".to_string(),
        };
        let response = EmployeeResponse::from(record);
        assert_eq!(response.employee_id, "EM-000123");
        let value = serde_json::to_value(&response).expect("serializable");
        assert!(value.get("password_hash").is_none());
    }
}
