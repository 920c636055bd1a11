//! Idempotent schema setup
//!
//! The deployment path creates everything it needs on startup, so a fresh
//! database only needs connectivity. Statements run one by one; each is
//! safe to repeat.

use anyhow::{Context, Result};
use sqlx::PgPool;
use tracing::info;

const STATEMENTS: &[&str] = &[
    // Enum types; CREATE TYPE has no IF NOT EXISTS
    "DO $$ BEGIN \
        CREATE TYPE user_status AS ENUM ('active', 'inactive', 'locked'); \
     EXCEPTION WHEN duplicate_object THEN NULL; END $$",
    "DO $$ BEGIN \
        CREATE TYPE login_channel AS ENUM ('web', 'api', 'mobile'); \
     EXCEPTION WHEN duplicate_object THEN NULL; END $$",
    "DO $$ BEGIN \
        CREATE TYPE login_outcome AS ENUM ('success', 'failed'); \
     EXCEPTION WHEN duplicate_object THEN NULL; END $$",
    // Credential store
    "CREATE TABLE IF NOT EXISTS users ( \
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(), \
        username VARCHAR(50) NOT NULL, \
        email VARCHAR(100) NOT NULL, \
        password_hash VARCHAR(255) NOT NULL, \
        full_name VARCHAR(100), \
        phone VARCHAR(20), \
        avatar_url VARCHAR(255), \
        status user_status NOT NULL DEFAULT 'active', \
        email_verified BOOLEAN NOT NULL DEFAULT FALSE, \
        phone_verified BOOLEAN NOT NULL DEFAULT FALSE, \
        failed_login_attempts INT NOT NULL DEFAULT 0, \
        locked_until TIMESTAMPTZ, \
        last_login_at TIMESTAMPTZ, \
        last_login_ip VARCHAR(45), \
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(), \
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now(), \
        deleted_at TIMESTAMPTZ \
     )",
    // Uniqueness holds among non-deleted rows only
    "CREATE UNIQUE INDEX IF NOT EXISTS users_username_active_uniq \
        ON users (username) WHERE deleted_at IS NULL",
    "CREATE UNIQUE INDEX IF NOT EXISTS users_email_active_uniq \
        ON users (email) WHERE deleted_at IS NULL",
    // RBAC graph
    "CREATE TABLE IF NOT EXISTS roles ( \
        id SERIAL PRIMARY KEY, \
        role_name VARCHAR(50) NOT NULL UNIQUE, \
        role_code VARCHAR(50) NOT NULL UNIQUE, \
        description TEXT, \
        is_system BOOLEAN NOT NULL DEFAULT FALSE, \
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(), \
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now() \
     )",
    "CREATE TABLE IF NOT EXISTS permissions ( \
        id SERIAL PRIMARY KEY, \
        permission_name VARCHAR(100) NOT NULL, \
        permission_code VARCHAR(100) NOT NULL UNIQUE, \
        resource_type VARCHAR(50) NOT NULL, \
        description TEXT, \
        created_at TIMESTAMPTZ NOT NULL DEFAULT now() \
     )",
    "CREATE TABLE IF NOT EXISTS user_roles ( \
        user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE, \
        role_id INT NOT NULL REFERENCES roles(id) ON DELETE CASCADE, \
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(), \
        PRIMARY KEY (user_id, role_id) \
     )",
    "CREATE TABLE IF NOT EXISTS role_permissions ( \
        role_id INT NOT NULL REFERENCES roles(id) ON DELETE CASCADE, \
        permission_id INT NOT NULL REFERENCES permissions(id) ON DELETE CASCADE, \
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(), \
        PRIMARY KEY (role_id, permission_id) \
     )",
    // Audit log: append-only, no updates or deletes anywhere in the code
    "CREATE TABLE IF NOT EXISTS login_logs ( \
        id BIGSERIAL PRIMARY KEY, \
        user_id UUID REFERENCES users(id), \
        username VARCHAR(50) NOT NULL, \
        channel login_channel NOT NULL DEFAULT 'web', \
        outcome login_outcome NOT NULL, \
        failure_reason VARCHAR(255), \
        ip_address VARCHAR(45), \
        user_agent TEXT, \
        location VARCHAR(100), \
        created_at TIMESTAMPTZ NOT NULL DEFAULT now() \
     )",
    "CREATE INDEX IF NOT EXISTS login_logs_user_created_idx \
        ON login_logs (user_id, created_at DESC)",
];

/// Create types, tables, and indexes that are not there yet
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    info!("Ensuring database schema");

    for statement in STATEMENTS {
        sqlx::query(statement)
            .execute(pool)
            .await
            .with_context(|| format!("schema statement failed: {}", &statement[..40.min(statement.len())]))?;
    }

    info!("Database schema ready");
    Ok(())
}
