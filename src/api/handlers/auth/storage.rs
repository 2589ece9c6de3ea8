//! Database helpers for admin accounts, sessions, and reset tokens.

use anyhow::{anyhow, Context, Result};
use serde_json::json;
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use crate::api::email::TEMPLATE_PASSWORD_RESET;

use super::state::AuthConfig;
use super::utils::{generate_token, hash_token, is_unique_violation};

/// Outcome when attempting to create a new admin account.
#[derive(Debug)]
pub(super) enum RegisterOutcome {
    Created(AdminRecord),
    Conflict,
}

/// Admin fields exposed to API responses. Never carries the password hash.
#[derive(Debug)]
pub(crate) struct AdminRecord {
    pub(crate) admin_id: Uuid,
    pub(crate) name: String,
    pub(crate) email: String,
    pub(crate) created_at: String,
}

/// Admin record plus the stored password hash, for login verification only.
pub(super) struct AdminAuthRecord {
    pub(super) record: AdminRecord,
    pub(super) password_hash: String,
}

/// Minimal data returned for a valid session token.
pub(crate) struct SessionRecord {
    pub(crate) admin_id: Uuid,
    pub(crate) name: String,
    pub(crate) email: String,
    pub(crate) created_at: String,
}

pub(super) async fn insert_admin(
    pool: &PgPool,
    name: &str,
    email: &str,
    password_hash: &str,
) -> Result<RegisterOutcome> {
    // The UNIQUE constraint on email is the authoritative duplicate guard.
    let query = r#"
        INSERT INTO admins (name, email, password_hash)
        VALUES ($1, $2, $3)
        RETURNING id, name, email,
            to_char(created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at
    "#;
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(pool)
        .instrument(span)
        .await;

    match row {
        Ok(row) => Ok(RegisterOutcome::Created(AdminRecord {
            admin_id: row.get("id"),
            name: row.get("name"),
            email: row.get("email"),
            created_at: row.get("created_at"),
        })),
        Err(err) if is_unique_violation(&err) => Ok(RegisterOutcome::Conflict),
        Err(err) => Err(err).context("failed to insert admin"),
    }
}

/// Look up login data by email.
pub(super) async fn lookup_admin_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<AdminAuthRecord>> {
    let query = r#"
        SELECT id, name, email, password_hash,
            to_char(created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at
        FROM admins
        WHERE email = $1
        LIMIT 1
    "#;
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup admin by email")?;

    Ok(row.map(|row| AdminAuthRecord {
        record: AdminRecord {
            admin_id: row.get("id"),
            name: row.get("name"),
            email: row.get("email"),
            created_at: row.get("created_at"),
        },
        password_hash: row.get("password_hash"),
    }))
}

pub(super) async fn insert_session(
    pool: &PgPool,
    admin_id: Uuid,
    ttl_seconds: i64,
) -> Result<String> {
    // Generate a random token, store only its hash, and return the raw value
    // so the caller can set the session cookie.
    let query = r"
        INSERT INTO admin_sessions (admin_id, session_hash, expires_at)
        VALUES ($1, $2, NOW() + ($3 * INTERVAL '1 second'))
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );

    for _ in 0..3 {
        let token = generate_token()?;
        let token_hash = hash_token(&token);
        let result = sqlx::query(query)
            .bind(admin_id)
            .bind(token_hash)
            .bind(ttl_seconds)
            .execute(pool)
            .instrument(span.clone())
            .await;

        match result {
            Ok(_) => return Ok(token),
            Err(err) if is_unique_violation(&err) => {}
            Err(err) => return Err(err).context("failed to insert session"),
        }
    }

    Err(anyhow!("failed to generate unique session token"))
}

pub(super) async fn lookup_session(
    pool: &PgPool,
    token_hash: &[u8],
) -> Result<Option<SessionRecord>> {
    // Only accept unexpired sessions whose admin still exists.
    let query = r#"
        SELECT admins.id, admins.name, admins.email,
            to_char(admins.created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at
        FROM admin_sessions
        JOIN admins ON admins.id = admin_sessions.admin_id
        WHERE admin_sessions.session_hash = $1
          AND admin_sessions.expires_at > NOW()
        LIMIT 1
    "#;
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(token_hash)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup session")?;

    if row.is_none() {
        return Ok(None);
    }

    // Record activity for audit/visibility without extending the session TTL.
    let query = r"
        UPDATE admin_sessions
        SET last_seen_at = NOW()
        WHERE session_hash = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(token_hash)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to update session last_seen_at")?;

    Ok(row.map(|row| SessionRecord {
        admin_id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        created_at: row.get("created_at"),
    }))
}

pub(super) async fn delete_session(pool: &PgPool, token_hash: &[u8]) -> Result<()> {
    // Logout is idempotent; it's fine if no rows are deleted.
    let query = "DELETE FROM admin_sessions WHERE session_hash = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(token_hash)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to delete session")?;
    Ok(())
}

/// Issue a reset token for the admin and enqueue the reset email.
///
/// Runs as a transaction so the token and the outbox row stay consistent.
/// The table is keyed by admin id, so a new request replaces any earlier
/// token for the same account.
pub(super) async fn create_reset_request(
    pool: &PgPool,
    admin: &AdminRecord,
    config: &AuthConfig,
) -> Result<()> {
    // A unique violation aborts the surrounding transaction, so each attempt
    // gets its own transaction instead of retrying inside a poisoned one.
    for _ in 0..3 {
        let token = generate_token()?;
        let token_hash = hash_token(&token);

        let mut tx = pool.begin().await.context("begin reset transaction")?;

        let query = r"
            INSERT INTO password_reset_tokens (admin_id, token_hash, expires_at)
            VALUES ($1, $2, NOW() + ($3 * INTERVAL '1 second'))
            ON CONFLICT (admin_id)
            DO UPDATE SET token_hash = EXCLUDED.token_hash,
                          created_at = NOW(),
                          expires_at = EXCLUDED.expires_at
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(admin.admin_id)
            .bind(token_hash)
            .bind(config.reset_token_ttl_seconds())
            .execute(&mut *tx)
            .instrument(span)
            .await;

        match result {
            Ok(_) => {}
            // A hash collision with another admin's token; try a fresh one.
            Err(err) if is_unique_violation(&err) => {
                let _ = tx.rollback().await;
                continue;
            }
            Err(err) => return Err(err).context("failed to upsert reset token"),
        }

        let payload = json!({
            "email": admin.email,
            "name": admin.name,
            "reset_url": config.reset_url(&token),
        });
        let payload_text =
            serde_json::to_string(&payload).context("failed to serialize reset email payload")?;

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
            .bind(&admin.email)
            .bind(TEMPLATE_PASSWORD_RESET)
            .bind(payload_text)
            .execute(&mut *tx)
            .instrument(span)
            .await
            .context("failed to insert reset email outbox row")?;

        tx.commit().await.context("commit reset transaction")?;
        return Ok(());
    }

    Err(anyhow!("failed to generate unique reset token"))
}

/// Non-consuming validity check used to gate the reset form.
pub(super) async fn reset_token_valid(pool: &PgPool, token_hash: &[u8]) -> Result<bool> {
    let query = r"
        SELECT 1
        FROM password_reset_tokens
        WHERE token_hash = $1
          AND expires_at > NOW()
        LIMIT 1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(token_hash)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to check reset token")?;
    Ok(row.is_some())
}

/// Consume a reset token and replace the admin's password.
///
/// Returns `false` when the token is unknown, expired, or already used.
/// On success the token row is gone (single use) and every session for the
/// admin is revoked.
pub(super) async fn consume_reset_token(
    pool: &PgPool,
    token_hash: &[u8],
    new_password_hash: &str,
) -> Result<bool> {
    let mut tx = pool.begin().await.context("begin reset-password transaction")?;

    let query = r"
        DELETE FROM password_reset_tokens
        WHERE token_hash = $1
          AND expires_at > NOW()
        RETURNING admin_id
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(token_hash)
        .fetch_optional(&mut *tx)
        .instrument(span)
        .await
        .context("failed to consume reset token")?;

    let Some(row) = row else {
        let _ = tx.rollback().await;
        return Ok(false);
    };
    let admin_id: Uuid = row.get("admin_id");

    let query = r"
        UPDATE admins
        SET password_hash = $2,
            updated_at = NOW()
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(admin_id)
        .bind(new_password_hash)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to update admin password")?;

    // A reset proves the old credentials may be compromised; drop every
    // outstanding session for the account.
    let query = "DELETE FROM admin_sessions WHERE admin_id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(admin_id)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to revoke admin sessions")?;

    tx.commit().await.context("commit reset-password transaction")?;
    Ok(true)
}
