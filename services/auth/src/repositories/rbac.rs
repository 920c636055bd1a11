//! RBAC graph repository
//!
//! Loads role/permission closures and applies admin grant/revoke mutations.
//! Join rows are unique per (user, role) and (role, permission) pairs and
//! cascade away with either endpoint.

use anyhow::{Context, Result};
use sqlx::{PgPool, Row};
use tracing::info;
use uuid::Uuid;

use crate::catalog::{PermissionCode, RoleCode};
use crate::models::Role;
use crate::rbac::AccessProfile;

/// Outcome of a role-deletion request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleDeletion {
    Deleted,
    NotFound,
    /// Built-in roles refuse deletion
    SystemRole,
}

/// RBAC repository
#[derive(Clone)]
pub struct RbacRepository {
    pool: PgPool,
}

impl RbacRepository {
    /// Create a new RBAC repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Roles assigned to a user
    pub async fn roles_for_user(&self, user_id: Uuid) -> Result<Vec<Role>> {
        let rows = sqlx::query(
            "SELECT r.id, r.role_name, r.role_code, r.description, r.is_system, \
                    r.created_at, r.updated_at \
             FROM roles r \
             JOIN user_roles ur ON ur.role_id = r.id \
             WHERE ur.user_id = $1 \
             ORDER BY r.role_code",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| Role {
                id: row.get("id"),
                role_name: row.get("role_name"),
                role_code: row.get("role_code"),
                description: row.get("description"),
                is_system: row.get("is_system"),
                created_at: row.get("created_at"),
                updated_at: row.get("updated_at"),
            })
            .collect())
    }

    /// Load a user's full role/permission closure
    ///
    /// The permission set is the union over all assigned roles. Codes are
    /// parsed against the closed catalog; a code outside it means the store
    /// has drifted from the build and is reported as an error.
    pub async fn access_profile(&self, user_id: Uuid) -> Result<AccessProfile> {
        let role_rows = sqlx::query(
            "SELECT r.role_code \
             FROM roles r \
             JOIN user_roles ur ON ur.role_id = r.id \
             WHERE ur.user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let permission_rows = sqlx::query(
            "SELECT DISTINCT p.permission_code \
             FROM permissions p \
             JOIN role_permissions rp ON rp.permission_id = p.id \
             JOIN user_roles ur ON ur.role_id = rp.role_id \
             WHERE ur.user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let roles = role_rows
            .into_iter()
            .map(|row| {
                let code: String = row.get("role_code");
                code.parse::<RoleCode>()
                    .context("role code outside the seeded catalog")
            })
            .collect::<Result<Vec<_>>>()?;

        let permissions = permission_rows
            .into_iter()
            .map(|row| {
                let code: String = row.get("permission_code");
                code.parse::<PermissionCode>()
                    .context("permission code outside the seeded catalog")
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(AccessProfile::new(roles, permissions))
    }

    /// Assign a role to a user; a repeat grant is a no-op
    pub async fn grant_role(&self, user_id: Uuid, role: RoleCode) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO user_roles (user_id, role_id) \
             SELECT $1, id FROM roles WHERE role_code = $2 \
             ON CONFLICT (user_id, role_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(role.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            info!("Granted role {} to user {}", role, user_id);
        }
        Ok(result.rows_affected() > 0)
    }

    /// Remove a role from a user
    pub async fn revoke_role(&self, user_id: Uuid, role: RoleCode) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM user_roles ur \
             USING roles r \
             WHERE ur.role_id = r.id AND ur.user_id = $1 AND r.role_code = $2",
        )
        .bind(user_id)
        .bind(role.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            info!("Revoked role {} from user {}", role, user_id);
        }
        Ok(result.rows_affected() > 0)
    }

    /// Grant a permission to a role; a repeat grant is a no-op
    pub async fn grant_permission(&self, role: RoleCode, permission: PermissionCode) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO role_permissions (role_id, permission_id) \
             SELECT r.id, p.id FROM roles r, permissions p \
             WHERE r.role_code = $1 AND p.permission_code = $2 \
             ON CONFLICT (role_id, permission_id) DO NOTHING",
        )
        .bind(role.as_str())
        .bind(permission.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            info!("Granted permission {} to role {}", permission, role);
        }
        Ok(result.rows_affected() > 0)
    }

    /// Remove a permission from a role
    pub async fn revoke_permission(
        &self,
        role: RoleCode,
        permission: PermissionCode,
    ) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM role_permissions rp \
             USING roles r, permissions p \
             WHERE rp.role_id = r.id AND rp.permission_id = p.id \
               AND r.role_code = $1 AND p.permission_code = $2",
        )
        .bind(role.as_str())
        .bind(permission.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            info!("Revoked permission {} from role {}", permission, role);
        }
        Ok(result.rows_affected() > 0)
    }

    /// Delete a role; system roles are protected
    ///
    /// Join rows cascade away with the role.
    pub async fn delete_role(&self, role: RoleCode) -> Result<RoleDeletion> {
        let row = sqlx::query("SELECT is_system FROM roles WHERE role_code = $1")
            .bind(role.as_str())
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(RoleDeletion::NotFound);
        };

        if row.get::<bool, _>("is_system") {
            return Ok(RoleDeletion::SystemRole);
        }

        sqlx::query("DELETE FROM roles WHERE role_code = $1 AND is_system = FALSE")
            .bind(role.as_str())
            .execute(&self.pool)
            .await?;

        info!("Deleted role {}", role);
        Ok(RoleDeletion::Deleted)
    }
}
