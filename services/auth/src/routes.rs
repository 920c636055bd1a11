//! Authentication service routes

use axum::{
    Extension, Json, Router,
    extract::{ConnectInfo, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, UserAgent, authorization::Bearer},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::AppState;
use crate::catalog::{PermissionCode, RoleCode};
use crate::error::{AuthError, AuthResult};
use crate::jwt::TokenType;
use crate::middleware::{AuthUser, auth_middleware};
use crate::models::{LoginLog, NewLoginLog, NewUser, Role, UpdateProfile, User, UserStatus};
use crate::repositories::RoleDeletion;
use crate::validation::{validate_email, validate_password, validate_username};

/// Request for user registration
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
}

/// Request for user login
#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Response for a successful login
#[derive(Serialize)]
pub struct LoginResponse {
    pub user: UserView,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

/// Request for token refresh and logout
#[derive(Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// Response for token refresh
#[derive(Serialize)]
pub struct RefreshTokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

/// Request for a password change
#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

/// Role summary embedded in user payloads
#[derive(Serialize)]
pub struct RoleView {
    pub role_code: String,
    pub role_name: String,
    pub description: Option<String>,
}

/// Public view of a user account
#[derive(Serialize)]
pub struct UserView {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub status: UserStatus,
    pub email_verified: bool,
    pub phone_verified: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub roles: Vec<RoleView>,
}

impl UserView {
    fn new(user: User, roles: Vec<Role>) -> Self {
        UserView {
            id: user.id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            phone: user.phone,
            avatar_url: user.avatar_url,
            status: user.status,
            email_verified: user.email_verified,
            phone_verified: user.phone_verified,
            last_login_at: user.last_login_at,
            created_at: user.created_at,
            roles: roles
                .into_iter()
                .map(|role| RoleView {
                    role_code: role.role_code,
                    role_name: role.role_name,
                    description: role.description,
                })
                .collect(),
        }
    }
}

/// Create the router for the authentication service
pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/auth/logout", post(logout))
        .route("/auth/profile", get(profile).put(update_profile))
        .route("/auth/change-password", post(change_password))
        .route("/auth/admin/login-logs", get(list_login_logs))
        .route("/auth/admin/users/:id", delete(delete_user))
        .route("/auth/admin/users/:id/roles", post(grant_role))
        .route("/auth/admin/users/:id/roles/:role", delete(revoke_role))
        .route("/auth/admin/roles/:role", delete(delete_role))
        .route("/auth/admin/roles/:role/permissions", post(grant_permission))
        .route(
            "/auth/admin/roles/:role/permissions/:permission",
            delete(revoke_permission),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh_token))
        .merge(protected)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "auth-service"
    }))
}

/// Append an audit row; a failed append is reported but never breaks the
/// authentication outcome it describes
async fn record_audit(state: &AppState, entry: NewLoginLog) {
    if let Err(e) = state.audit.append(&entry).await {
        error!("failed to append login audit row: {}", e);
    }
}

fn unix_now() -> AuthResult<u64> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AuthError::Internal(anyhow::anyhow!("failed to read current time: {}", e)))?
        .as_secs())
}

/// User registration endpoint
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AuthResult<impl IntoResponse> {
    validate_username(&payload.username)?;
    validate_email(&payload.email)?;
    validate_password(&payload.password)?;

    if state
        .users
        .username_exists(&payload.username)
        .await
        .map_err(AuthError::Internal)?
    {
        return Err(AuthError::Conflict("username already exists".into()));
    }
    if state
        .users
        .email_exists(&payload.email)
        .await
        .map_err(AuthError::Internal)?
    {
        return Err(AuthError::Conflict("email already registered".into()));
    }

    let user = state
        .users
        .create(&NewUser {
            username: payload.username,
            email: payload.email,
            password: payload.password,
            full_name: payload.full_name,
        })
        .await
        .map_err(AuthError::Internal)?;

    // Every fresh account starts as a normal user.
    state
        .rbac
        .grant_role(user.id, RoleCode::Normal)
        .await
        .map_err(AuthError::Internal)?;

    info!("Registered user: {}", user.username);

    let roles = state
        .rbac
        .roles_for_user(user.id)
        .await
        .map_err(AuthError::Internal)?;

    Ok((StatusCode::CREATED, Json(UserView::new(user, roles))))
}

/// User login endpoint
pub async fn login(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    user_agent: Option<TypedHeader<UserAgent>>,
    Json(payload): Json<LoginRequest>,
) -> AuthResult<impl IntoResponse> {
    let ip = addr.ip().to_string();
    let agent = user_agent.map(|TypedHeader(ua)| ua.as_str().to_string());
    let origin = |entry: NewLoginLog| entry.with_origin(Some(ip.clone()), agent.clone());

    if !state.throttle.allow(&ip).await {
        record_audit(
            &state,
            origin(NewLoginLog::failure(&payload.username, "rate limited")),
        )
        .await;
        return Err(AuthError::TooManyRequests);
    }

    let user = match state
        .users
        .find_by_username_or_email(&payload.username)
        .await
        .map_err(AuthError::Internal)?
    {
        Some(user) => user,
        None => {
            record_audit(
                &state,
                origin(NewLoginLog::failure(&payload.username, "user not found")),
            )
            .await;
            // Same message as a wrong password; usernames are not probeable.
            return Err(AuthError::InvalidCredentials);
        }
    };

    if user.is_locked(Utc::now()) {
        record_audit(
            &state,
            origin(NewLoginLog::failure(&payload.username, "account locked")),
        )
        .await;
        return Err(AuthError::AccountLocked);
    }

    if user.status == UserStatus::Inactive {
        record_audit(
            &state,
            origin(NewLoginLog::failure(&payload.username, "account disabled")),
        )
        .await;
        return Err(AuthError::AccountDisabled);
    }

    if !state
        .users
        .verify_password(&user, &payload.password)
        .map_err(AuthError::Internal)?
    {
        // The increment is atomic in the store; concurrent failures all
        // count. The audit row is appended regardless of how it went.
        let reason = match state.users.record_failed_login(user.id, &state.lockout).await {
            Ok(record) if record.locked => {
                warn!(
                    "Account {} locked after {} failed attempts",
                    user.username, record.failed_attempts
                );
                "wrong password; lockout engaged"
            }
            Ok(_) => "wrong password",
            Err(e) => {
                error!("failed to record login failure: {}", e);
                "wrong password"
            }
        };
        let mut entry = origin(NewLoginLog::failure(&payload.username, reason));
        entry.user_id = Some(user.id);
        record_audit(&state, entry).await;
        return Err(AuthError::InvalidCredentials);
    }

    state
        .users
        .record_successful_login(user.id, Some(&ip))
        .await
        .map_err(AuthError::Internal)?;

    let profile = state
        .rbac
        .access_profile(user.id)
        .await
        .map_err(AuthError::Internal)?;

    let access_token = state
        .jwt
        .generate_access_token(&user, &profile)
        .map_err(AuthError::Internal)?;
    let refresh_token = state
        .jwt
        .generate_refresh_token(&user)
        .map_err(AuthError::Internal)?;

    state
        .sessions
        .create_session(user.id, &refresh_token)
        .await
        .map_err(AuthError::Internal)?;

    record_audit(&state, origin(NewLoginLog::success(user.id, &user.username))).await;
    info!("User logged in: {}", user.username);

    let roles = state
        .rbac
        .roles_for_user(user.id)
        .await
        .map_err(AuthError::Internal)?;

    let response = LoginResponse {
        user: UserView::new(user, roles),
        access_token,
        refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: state.jwt.access_token_expiry(),
    };

    Ok((StatusCode::OK, Json(response)))
}

/// Refresh token endpoint
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshTokenRequest>,
) -> AuthResult<impl IntoResponse> {
    let claims = state
        .jwt
        .validate_token(&payload.refresh_token)
        .map_err(|_| AuthError::TokenExpiredOrInvalid)?;

    if claims.token_type != TokenType::Refresh {
        return Err(AuthError::TokenExpiredOrInvalid);
    }

    if state
        .jwt
        .is_token_blacklisted(&state.redis_pool, &payload.refresh_token)
        .await
        .map_err(AuthError::Internal)?
    {
        return Err(AuthError::TokenExpiredOrInvalid);
    }

    // Rotation only works against a live server-side session.
    if !state
        .sessions
        .is_session_valid(claims.sub, &payload.refresh_token)
        .await
        .map_err(AuthError::Internal)?
    {
        return Err(AuthError::TokenExpiredOrInvalid);
    }

    let user = state
        .users
        .find_by_id(claims.sub)
        .await
        .map_err(AuthError::Internal)?
        .ok_or(AuthError::TokenExpiredOrInvalid)?;

    if user.status != UserStatus::Active {
        return Err(AuthError::AccountDisabled);
    }

    let profile = state
        .rbac
        .access_profile(user.id)
        .await
        .map_err(AuthError::Internal)?;

    let access_token = state
        .jwt
        .generate_access_token(&user, &profile)
        .map_err(AuthError::Internal)?;

    let new_refresh_token = state
        .jwt
        .rotate_refresh_token(&state.redis_pool, &user, &payload.refresh_token)
        .await
        .map_err(AuthError::Internal)?;

    state
        .sessions
        .rotate_session(user.id, &payload.refresh_token, &new_refresh_token)
        .await
        .map_err(AuthError::Internal)?;

    let response = RefreshTokenResponse {
        access_token,
        refresh_token: new_refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: state.jwt.access_token_expiry(),
    };

    Ok((StatusCode::OK, Json(response)))
}

/// Logout endpoint
///
/// Revokes the presented access token and, when one is supplied, the
/// refresh token and its session. The client drops its cached access
/// token, refresh token, and user object.
pub async fn logout(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    TypedHeader(authorization): TypedHeader<Authorization<Bearer>>,
    payload: Option<Json<RefreshTokenRequest>>,
) -> AuthResult<impl IntoResponse> {
    let now = unix_now()?;
    let access_token = authorization.token();

    // The middleware already validated this token; revoke it for whatever
    // lifetime it has left.
    if let Ok(claims) = state.jwt.validate_token(access_token) {
        state
            .jwt
            .blacklist_token(&state.redis_pool, access_token, claims.remaining_lifetime(now))
            .await
            .map_err(AuthError::Internal)?;
    }

    if let Some(Json(body)) = payload {
        if let Ok(claims) = state.jwt.validate_token(&body.refresh_token) {
            if claims.token_type == TokenType::Refresh && claims.sub == auth_user.id {
                state
                    .jwt
                    .blacklist_token(
                        &state.redis_pool,
                        &body.refresh_token,
                        claims.remaining_lifetime(now),
                    )
                    .await
                    .map_err(AuthError::Internal)?;
                state
                    .sessions
                    .delete_session(auth_user.id, &body.refresh_token)
                    .await
                    .map_err(AuthError::Internal)?;
            }
        }
    }

    info!("User logged out: {}", auth_user.username);

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({"message": "logged out"})),
    ))
}

/// Current user profile
pub async fn profile(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AuthResult<impl IntoResponse> {
    let user = state
        .users
        .find_by_id(auth_user.id)
        .await
        .map_err(AuthError::Internal)?
        .ok_or(AuthError::TokenExpiredOrInvalid)?;

    let roles = state
        .rbac
        .roles_for_user(user.id)
        .await
        .map_err(AuthError::Internal)?;

    Ok(Json(UserView::new(user, roles)))
}

/// Profile update endpoint
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<UpdateProfile>,
) -> AuthResult<impl IntoResponse> {
    state
        .users
        .update_profile(auth_user.id, &payload)
        .await
        .map_err(AuthError::Internal)?;

    let user = state
        .users
        .find_by_id(auth_user.id)
        .await
        .map_err(AuthError::Internal)?
        .ok_or(AuthError::TokenExpiredOrInvalid)?;

    let roles = state
        .rbac
        .roles_for_user(user.id)
        .await
        .map_err(AuthError::Internal)?;

    Ok(Json(UserView::new(user, roles)))
}

/// Password change endpoint; every session dies with the old password
pub async fn change_password(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<ChangePasswordRequest>,
) -> AuthResult<impl IntoResponse> {
    validate_password(&payload.new_password)?;

    let user = state
        .users
        .find_by_id(auth_user.id)
        .await
        .map_err(AuthError::Internal)?
        .ok_or(AuthError::TokenExpiredOrInvalid)?;

    if !state
        .users
        .verify_password(&user, &payload.old_password)
        .map_err(AuthError::Internal)?
    {
        return Err(AuthError::InvalidCredentials);
    }

    state
        .users
        .set_password(user.id, &payload.new_password)
        .await
        .map_err(AuthError::Internal)?;

    state
        .sessions
        .delete_all_sessions(user.id)
        .await
        .map_err(AuthError::Internal)?;

    Ok(Json(serde_json::json!({
        "message": "password changed, sign in again"
    })))
}

/// Query parameters for the audit log listing
#[derive(Deserialize)]
pub struct LoginLogQuery {
    pub user_id: Option<Uuid>,
    pub limit: Option<i64>,
}

/// Audit log listing, gated by `system.log.view`
pub async fn list_login_logs(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<LoginLogQuery>,
) -> AuthResult<Json<Vec<LoginLog>>> {
    auth_user
        .profile
        .require_permission(PermissionCode::SystemLogView)?;

    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    let logs = match query.user_id {
        Some(user_id) => state.audit.recent_for_user(user_id, limit).await,
        None => state.audit.recent(limit).await,
    }
    .map_err(AuthError::Internal)?;

    Ok(Json(logs))
}

/// Request naming a role
#[derive(Deserialize)]
pub struct RoleGrantRequest {
    pub role_code: String,
}

/// Request naming a permission
#[derive(Deserialize)]
pub struct PermissionGrantRequest {
    pub permission_code: String,
}

fn parse_role(code: &str) -> AuthResult<RoleCode> {
    code.parse()
        .map_err(|_| AuthError::Validation(format!("unknown role code: {}", code)))
}

fn parse_permission(code: &str) -> AuthResult<PermissionCode> {
    code.parse()
        .map_err(|_| AuthError::Validation(format!("unknown permission code: {}", code)))
}

/// Soft-delete a user, gated by `system.user.manage`
///
/// The row stays behind (soft delete only) so audit references keep
/// resolving; every live session of the account is swept.
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
) -> AuthResult<impl IntoResponse> {
    auth_user
        .profile
        .require_permission(PermissionCode::SystemUserManage)?;

    let deleted = state
        .users
        .soft_delete(user_id)
        .await
        .map_err(AuthError::Internal)?;
    if !deleted {
        return Err(AuthError::Validation("user not found".into()));
    }

    state
        .sessions
        .delete_all_sessions(user_id)
        .await
        .map_err(AuthError::Internal)?;

    Ok(Json(serde_json::json!({ "deleted": true })))
}

/// Grant a role to a user, gated by `system.user.manage`
pub async fn grant_role(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<RoleGrantRequest>,
) -> AuthResult<impl IntoResponse> {
    auth_user
        .profile
        .require_permission(PermissionCode::SystemUserManage)?;

    let role = parse_role(&payload.role_code)?;
    let granted = state
        .rbac
        .grant_role(user_id, role)
        .await
        .map_err(AuthError::Internal)?;

    Ok(Json(serde_json::json!({ "granted": granted })))
}

/// Revoke a role from a user, gated by `system.user.manage`
pub async fn revoke_role(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path((user_id, role_code)): Path<(Uuid, String)>,
) -> AuthResult<impl IntoResponse> {
    auth_user
        .profile
        .require_permission(PermissionCode::SystemUserManage)?;

    let role = parse_role(&role_code)?;
    let revoked = state
        .rbac
        .revoke_role(user_id, role)
        .await
        .map_err(AuthError::Internal)?;

    Ok(Json(serde_json::json!({ "revoked": revoked })))
}

/// Grant a permission to a role, gated by `system.role.manage`
pub async fn grant_permission(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(role_code): Path<String>,
    Json(payload): Json<PermissionGrantRequest>,
) -> AuthResult<impl IntoResponse> {
    auth_user
        .profile
        .require_permission(PermissionCode::SystemRoleManage)?;

    let role = parse_role(&role_code)?;
    let permission = parse_permission(&payload.permission_code)?;
    let granted = state
        .rbac
        .grant_permission(role, permission)
        .await
        .map_err(AuthError::Internal)?;

    Ok(Json(serde_json::json!({ "granted": granted })))
}

/// Revoke a permission from a role, gated by `system.role.manage`
pub async fn revoke_permission(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path((role_code, permission_code)): Path<(String, String)>,
) -> AuthResult<impl IntoResponse> {
    auth_user
        .profile
        .require_permission(PermissionCode::SystemRoleManage)?;

    let role = parse_role(&role_code)?;
    let permission = parse_permission(&permission_code)?;
    let revoked = state
        .rbac
        .revoke_permission(role, permission)
        .await
        .map_err(AuthError::Internal)?;

    Ok(Json(serde_json::json!({ "revoked": revoked })))
}

/// Delete a non-system role, gated by `system.role.manage`
pub async fn delete_role(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(role_code): Path<String>,
) -> AuthResult<impl IntoResponse> {
    auth_user
        .profile
        .require_permission(PermissionCode::SystemRoleManage)?;

    let role = parse_role(&role_code)?;
    match state
        .rbac
        .delete_role(role)
        .await
        .map_err(AuthError::Internal)?
    {
        RoleDeletion::Deleted => Ok(Json(serde_json::json!({ "deleted": true }))),
        RoleDeletion::NotFound => Err(AuthError::Validation("role not found".into())),
        RoleDeletion::SystemRole => {
            Err(AuthError::Validation("system roles cannot be deleted".into()))
        }
    }
}
