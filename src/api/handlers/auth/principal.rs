//! Authenticated principal extraction: the gate in front of every
//! admin-only route.
//!
//! Flow Overview: read the session cookie (or bearer header), resolve it to
//! an admin, and return a principal downstream handlers can use. A missing
//! carrier and an invalid one are reported as distinct errors so clients
//! can tell "log in" apart from "session expired".

use axum::http::HeaderMap;
use sqlx::PgPool;
use uuid::Uuid;

use crate::api::error::ApiError;

use super::session::{extract_session_token, resolve_session};

/// Authenticated admin context derived from the session credential.
#[derive(Clone, Debug)]
pub struct AdminPrincipal {
    pub admin_id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: String,
}

/// Resolve the request credential into a principal.
///
/// # Errors
/// `Unauthenticated` when no credential is present, `InvalidToken` when one
/// is present but unknown, expired, or orphaned.
pub async fn require_auth(headers: &HeaderMap, pool: &PgPool) -> Result<AdminPrincipal, ApiError> {
    let Some(token) = extract_session_token(headers) else {
        return Err(ApiError::Unauthenticated);
    };
    match resolve_session(pool, &token).await? {
        Some(record) => Ok(AdminPrincipal {
            admin_id: record.admin_id,
            name: record.name,
            email: record.email,
            created_at: record.created_at,
        }),
        None => Err(ApiError::InvalidToken),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    #[tokio::test]
    async fn missing_credential_is_unauthenticated() {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://postgres@localhost/postgres")
            .expect("lazy pool");
        let headers = HeaderMap::new();
        let result = require_auth(&headers, &pool).await;
        assert!(matches!(result, Err(ApiError::Unauthenticated)));
    }
}
