//! Role and permission models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Role entity
///
/// `is_system` marks the built-in roles seeded at startup; they cannot be
/// deleted through the admin API.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Role {
    pub id: i32,
    pub role_name: String,
    pub role_code: String,
    pub description: Option<String>,
    pub is_system: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Permission entity
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Permission {
    pub id: i32,
    pub permission_name: String,
    pub permission_code: String,
    pub resource_type: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// User-to-role assignment
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserRole {
    pub user_id: Uuid,
    pub role_id: i32,
    pub created_at: DateTime<Utc>,
}

/// Role-to-permission grant
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RolePermission {
    pub role_id: i32,
    pub permission_id: i32,
    pub created_at: DateTime<Utc>,
}
