//! Bearer-token authentication middleware
//!
//! Validates the `Authorization: Bearer` header, rejects revoked or
//! non-access tokens, re-checks the account against the credential store,
//! and hands the handler an `AuthUser` with the role/permission closure
//! from the claims. Authorization is enforced here and in the handlers;
//! whatever the browser hides is cosmetic and never trusted.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use tracing::warn;
use uuid::Uuid;

use crate::AppState;
use crate::error::AuthError;
use crate::jwt::TokenType;
use crate::models::UserStatus;
use crate::rbac::AccessProfile;

/// The authenticated caller, attached to request extensions
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
    pub profile: AccessProfile,
}

/// Pull the raw bearer token out of a request
pub fn bearer_token(req: &Request<Body>) -> Option<&str> {
    req.headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
}

/// Authentication middleware for protected routes
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let token = bearer_token(&req)
        .ok_or(AuthError::TokenExpiredOrInvalid)?
        .to_string();

    let claims = state.jwt.validate_token(&token).map_err(|e| {
        warn!("token validation failed: {}", e);
        AuthError::TokenExpiredOrInvalid
    })?;

    // Refresh tokens only open the refresh endpoint, never a resource.
    if claims.token_type != TokenType::Access {
        return Err(AuthError::TokenExpiredOrInvalid);
    }

    if state
        .jwt
        .is_token_blacklisted(&state.redis_pool, &token)
        .await
        .map_err(AuthError::Internal)?
    {
        return Err(AuthError::TokenExpiredOrInvalid);
    }

    // The token may outlive the account; the store stays authoritative.
    let user = state
        .users
        .find_by_id(claims.sub)
        .await
        .map_err(AuthError::Internal)?
        .ok_or(AuthError::TokenExpiredOrInvalid)?;

    if user.status != UserStatus::Active {
        return Err(AuthError::AccountDisabled);
    }

    let profile =
        AccessProfile::from_codes(&claims.roles, &claims.permissions).map_err(|e| {
            warn!("token carries a code outside the catalog: {}", e);
            AuthError::TokenExpiredOrInvalid
        })?;

    req.extensions_mut().insert(AuthUser {
        id: user.id,
        username: user.username,
        profile,
    });

    Ok(next.run(req).await)
}
