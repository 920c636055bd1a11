//! Catalog seeding and startup verification
//!
//! Seeds the five built-in roles, the fixed permission catalog, and the
//! default grants, all idempotently. `verify_catalog` then confirms the
//! store matches the closed enums the binary was compiled with, so a code
//! referenced in a handler can never be missing at runtime.

use anyhow::{Result, bail};
use sqlx::{PgPool, Row};
use tracing::{info, warn};

use crate::catalog::{PermissionCode, RoleCode, default_grants};
use crate::models::NewUser;
use crate::repositories::{RbacRepository, UserRepository};

/// Seed roles, permissions, and default grants
pub async fn seed_catalog(pool: &PgPool) -> Result<()> {
    info!("Seeding role and permission catalog");

    for role in RoleCode::ALL {
        let (name, description) = role.seed_info();
        sqlx::query(
            "INSERT INTO roles (role_code, role_name, description, is_system) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (role_code) DO NOTHING",
        )
        .bind(role.as_str())
        .bind(name)
        .bind(description)
        .bind(role.is_system())
        .execute(pool)
        .await?;
    }

    for permission in PermissionCode::ALL {
        sqlx::query(
            "INSERT INTO permissions (permission_code, permission_name, resource_type) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (permission_code) DO NOTHING",
        )
        .bind(permission.as_str())
        .bind(permission.seed_name())
        .bind(permission.resource_type().as_str())
        .execute(pool)
        .await?;
    }

    for role in RoleCode::ALL {
        for permission in default_grants(role) {
            sqlx::query(
                "INSERT INTO role_permissions (role_id, permission_id) \
                 SELECT r.id, p.id FROM roles r, permissions p \
                 WHERE r.role_code = $1 AND p.permission_code = $2 \
                 ON CONFLICT (role_id, permission_id) DO NOTHING",
            )
            .bind(role.as_str())
            .bind(permission.as_str())
            .execute(pool)
            .await?;
        }
    }

    info!("Catalog seeded");
    Ok(())
}

/// Verify the stored catalog covers every compiled-in code
///
/// Extra rows are reported but tolerated; a missing code is fatal since a
/// handler may depend on it.
pub async fn verify_catalog(pool: &PgPool) -> Result<()> {
    let stored_roles: Vec<String> = sqlx::query("SELECT role_code FROM roles")
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(|row| row.get("role_code"))
        .collect();

    for role in RoleCode::ALL {
        if !stored_roles.iter().any(|code| code == role.as_str()) {
            bail!("seeded catalog is missing role: {}", role);
        }
    }

    let stored_permissions: Vec<String> = sqlx::query("SELECT permission_code FROM permissions")
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(|row| row.get("permission_code"))
        .collect();

    for permission in PermissionCode::ALL {
        if !stored_permissions
            .iter()
            .any(|code| code == permission.as_str())
        {
            bail!("seeded catalog is missing permission: {}", permission);
        }
    }

    for code in &stored_permissions {
        if code.parse::<PermissionCode>().is_err() {
            warn!("store carries a permission outside the catalog: {}", code);
        }
    }

    info!("Catalog verified against the store");
    Ok(())
}

/// Create the initial administrator account when configured
///
/// Runs only when `ADMIN_INITIAL_PASSWORD` is set and no `admin` user
/// exists yet; the account gets the super_admin role.
pub async fn seed_admin_user(users: &UserRepository, rbac: &RbacRepository) -> Result<()> {
    let Ok(password) = std::env::var("ADMIN_INITIAL_PASSWORD") else {
        return Ok(());
    };

    if users.username_exists("admin").await? {
        return Ok(());
    }

    let admin = users
        .create(&NewUser {
            username: "admin".to_string(),
            email: "admin@localhost".to_string(),
            password,
            full_name: Some("Administrator".to_string()),
        })
        .await?;

    rbac.grant_role(admin.id, RoleCode::SuperAdmin).await?;
    info!("Seeded initial administrator account");
    Ok(())
}
