//! Error taxonomy for the authentication service
//!
//! Unknown-username and wrong-password deliberately collapse into one
//! `InvalidCredentials` message so responses cannot be used to enumerate
//! usernames. The audit log keeps the distinct internal reason.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Errors surfaced by the authentication service
#[derive(Error, Debug)]
pub enum AuthError {
    /// Unknown user or wrong password; one generic message for both
    #[error("invalid username or password")]
    InvalidCredentials,

    /// Account is locked out; the unlock time is not disclosed
    #[error("account is locked, try again later")]
    AccountLocked,

    /// Missing, malformed, expired, or revoked token
    #[error("token is invalid or has expired")]
    TokenExpiredOrInvalid,

    /// Authenticated but not authorized for the operation
    #[error("permission denied")]
    PermissionDenied,

    /// Account exists but is not active
    #[error("account is disabled")]
    AccountDisabled,

    /// Request payload failed validation
    #[error("{0}")]
    Validation(String),

    /// Username or email already registered
    #[error("{0}")]
    Conflict(String),

    /// Per-IP login throttle tripped
    #[error("too many attempts, slow down")]
    TooManyRequests,

    /// Database failure
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Anything else
    #[error("internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    fn status(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::AccountLocked => StatusCode::LOCKED,
            AuthError::TokenExpiredOrInvalid => StatusCode::UNAUTHORIZED,
            AuthError::PermissionDenied => StatusCode::FORBIDDEN,
            AuthError::AccountDisabled => StatusCode::FORBIDDEN,
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::Conflict(_) => StatusCode::CONFLICT,
            AuthError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            AuthError::Database(_) | AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Infrastructure details stay out of the response body.
        let message = match &self {
            AuthError::Database(e) => {
                tracing::error!("database error: {}", e);
                "internal server error".to_string()
            }
            AuthError::Internal(e) => {
                tracing::error!("internal error: {}", e);
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

/// Type alias for handler results
pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_user_and_bad_password_share_a_message() {
        // Both cases map to the same variant, so the user-visible message is
        // byte-identical and usernames cannot be probed.
        let unknown_user = AuthError::InvalidCredentials;
        let bad_password = AuthError::InvalidCredentials;
        assert_eq!(unknown_user.to_string(), bad_password.to_string());
    }

    #[test]
    fn locked_message_omits_unlock_time() {
        let msg = AuthError::AccountLocked.to_string();
        assert!(!msg.contains(':'));
        assert!(!msg.chars().any(|c| c.is_ascii_digit()));
    }

    #[test]
    fn status_mapping() {
        assert_eq!(
            AuthError::InvalidCredentials.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AuthError::AccountLocked.status(), StatusCode::LOCKED);
        assert_eq!(AuthError::PermissionDenied.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            AuthError::TooManyRequests.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }
}
