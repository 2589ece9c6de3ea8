//! Tagged error taxonomy for the HTTP boundary.
//!
//! Handlers map every failure into one `ApiError` variant so clients can
//! switch on a stable `error` kind instead of parsing free-form messages.
//! Database and collaborator failures are logged server-side and surfaced
//! without internal detail.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

/// Wire shape of every error response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Stable machine-readable kind.
    pub error: String,
    /// Short human-readable message.
    pub message: String,
}

#[derive(Debug)]
pub enum ApiError {
    /// Missing or malformed required field.
    Validation(&'static str),
    /// Uniqueness violation (email, employee id).
    Conflict(&'static str),
    /// Login failure; message is identical for unknown email and wrong
    /// password to avoid account enumeration.
    InvalidCredentials,
    /// No credential carrier on a guarded route.
    Unauthenticated,
    /// Credential present but unknown, expired, or orphaned.
    InvalidToken,
    /// Password reset token failed verification or was already used.
    InvalidOrExpiredToken,
    NotFound(&'static str),
    /// Mailer / object store failure.
    Upstream(anyhow::Error),
    Database(sqlx::Error),
    Internal(anyhow::Error),
}

impl ApiError {
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::Conflict(_) => "conflict",
            Self::InvalidCredentials => "invalid_credentials",
            Self::Unauthenticated => "unauthenticated",
            Self::InvalidToken => "invalid_token",
            Self::InvalidOrExpiredToken => "invalid_or_expired_token",
            Self::NotFound(_) => "not_found",
            Self::Upstream(_) => "upstream_failure",
            Self::Database(_) | Self::Internal(_) => "internal",
        }
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Conflict(_) | Self::InvalidOrExpiredToken => {
                StatusCode::BAD_REQUEST
            }
            Self::InvalidCredentials | Self::Unauthenticated | Self::InvalidToken => {
                StatusCode::UNAUTHORIZED
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Upstream(_) | Self::Database(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Validation(message) | Self::Conflict(message) | Self::NotFound(message) => {
                (*message).to_string()
            }
            Self::InvalidCredentials => "Invalid credentials".to_string(),
            Self::Unauthenticated => "Authentication required".to_string(),
            Self::InvalidToken => "Invalid session token".to_string(),
            Self::InvalidOrExpiredToken => "Invalid or expired reset token".to_string(),
            Self::Upstream(_) => "Upstream service failure".to_string(),
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            Self::Upstream(err) => error!("Upstream failure: {err}"),
            Self::Database(err) => error!("Database error: {err}"),
            Self::Internal(err) => error!("Internal error: {err}"),
            _ => {}
        }
        let body = ErrorBody {
            error: self.kind().to_string(),
            message: self.message(),
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_reflect_taxonomy() {
        assert_eq!(
            ApiError::Validation("bad").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::Conflict("dup").status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::InvalidCredentials.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::InvalidToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::InvalidOrExpiredToken.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::NotFound("gone").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Database(sqlx::Error::RowNotFound).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn kinds_are_stable() {
        assert_eq!(ApiError::Validation("x").kind(), "validation_error");
        assert_eq!(ApiError::Conflict("x").kind(), "conflict");
        assert_eq!(ApiError::InvalidCredentials.kind(), "invalid_credentials");
        assert_eq!(ApiError::Unauthenticated.kind(), "unauthenticated");
        assert_eq!(ApiError::InvalidToken.kind(), "invalid_token");
        assert_eq!(
            ApiError::InvalidOrExpiredToken.kind(),
            "invalid_or_expired_token"
        );
        assert_eq!(ApiError::NotFound("x").kind(), "not_found");
    }

    #[test]
    fn credentials_message_is_generic() {
        // Unknown email and wrong password must be indistinguishable.
        assert_eq!(ApiError::InvalidCredentials.message(), "Invalid credentials");
    }

    #[test]
    fn database_errors_hide_detail() {
        let err = ApiError::Database(sqlx::Error::PoolTimedOut);
        assert_eq!(err.message(), "Internal server error");
    }
}
