//! User repository for credential-store operations

use anyhow::{Context, Result};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::info;
use uuid::Uuid;

use crate::lockout::LockoutPolicy;
use crate::models::{NewUser, UpdateProfile, User, UserStatus};

const USER_COLUMNS: &str = "id, username, email, password_hash, full_name, phone, avatar_url, \
     status, email_verified, phone_verified, failed_login_attempts, locked_until, \
     last_login_at, last_login_ip, created_at, updated_at, deleted_at";

fn user_from_row(row: PgRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        full_name: row.get("full_name"),
        phone: row.get("phone"),
        avatar_url: row.get("avatar_url"),
        status: row.get("status"),
        email_verified: row.get("email_verified"),
        phone_verified: row.get("phone_verified"),
        failed_login_attempts: row.get("failed_login_attempts"),
        locked_until: row.get("locked_until"),
        last_login_at: row.get("last_login_at"),
        last_login_ip: row.get("last_login_ip"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        deleted_at: row.get("deleted_at"),
    }
}

/// Outcome of recording a failed login
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureRecord {
    /// Failure count after the increment
    pub failed_attempts: i32,
    /// Whether this failure engaged the lock
    pub locked: bool,
}

/// User repository
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn hash_password(password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut rand::thread_rng());
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("failed to hash password: {}", e))?
            .to_string();
        Ok(hash)
    }

    /// Create a new user with a freshly hashed password
    pub async fn create(&self, new_user: &NewUser) -> Result<User> {
        info!("Creating user: {}", new_user.username);

        let password_hash = Self::hash_password(&new_user.password)?;

        let row = sqlx::query(&format!(
            "INSERT INTO users (username, email, password_hash, full_name) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&password_hash)
        .bind(&new_user.full_name)
        .fetch_one(&self.pool)
        .await?;

        Ok(user_from_row(row))
    }

    /// Find a non-deleted user by username or email
    pub async fn find_by_username_or_email(&self, username_or_email: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE (username = $1 OR email = $1) AND deleted_at IS NULL"
        ))
        .bind(username_or_email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(user_from_row))
    }

    /// Find a non-deleted user by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(user_from_row))
    }

    /// Whether a username is taken among non-deleted rows
    pub async fn username_exists(&self, username: &str) -> Result<bool> {
        let row = sqlx::query(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1 AND deleted_at IS NULL) AS taken",
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get("taken"))
    }

    /// Whether an email is registered among non-deleted rows
    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        let row = sqlx::query(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1 AND deleted_at IS NULL) AS taken",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get("taken"))
    }

    /// Verify a password against the stored hash
    pub fn verify_password(&self, user: &User, password: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(&user.password_hash)
            .map_err(|e| anyhow::anyhow!("failed to parse password hash: {}", e))?;

        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Record a failed login attempt
    ///
    /// The increment and the lock transition happen in one UPDATE so two
    /// concurrent failures for the same account both count; there is no
    /// read-modify-write window to lose an increment in.
    pub async fn record_failed_login(
        &self,
        user_id: Uuid,
        policy: &LockoutPolicy,
    ) -> Result<FailureRecord> {
        let lock_until: DateTime<Utc> = policy.lock_until(Utc::now());

        let row = sqlx::query(
            "UPDATE users SET \
                failed_login_attempts = failed_login_attempts + 1, \
                status = CASE WHEN failed_login_attempts + 1 >= $2 \
                    THEN 'locked'::user_status ELSE status END, \
                locked_until = CASE WHEN failed_login_attempts + 1 >= $2 \
                    THEN $3 ELSE locked_until END, \
                updated_at = now() \
             WHERE id = $1 \
             RETURNING failed_login_attempts, status",
        )
        .bind(user_id)
        .bind(policy.max_failed_attempts)
        .bind(lock_until)
        .fetch_one(&self.pool)
        .await
        .context("failed to record login failure")?;

        let failed_attempts: i32 = row.get("failed_login_attempts");
        let status: UserStatus = row.get("status");

        Ok(FailureRecord {
            failed_attempts,
            locked: status == UserStatus::Locked,
        })
    }

    /// Record a successful login: reset the failure counter, clear an
    /// expired lock, and stamp last-login metadata
    pub async fn record_successful_login(&self, user_id: Uuid, ip: Option<&str>) -> Result<()> {
        sqlx::query(
            "UPDATE users SET \
                failed_login_attempts = 0, \
                locked_until = NULL, \
                status = CASE WHEN status = 'locked'::user_status \
                    THEN 'active'::user_status ELSE status END, \
                last_login_at = now(), \
                last_login_ip = $2, \
                updated_at = now() \
             WHERE id = $1",
        )
        .bind(user_id)
        .bind(ip)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Replace the password hash
    pub async fn set_password(&self, user_id: Uuid, new_password: &str) -> Result<()> {
        let password_hash = Self::hash_password(new_password)?;

        sqlx::query("UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1")
            .bind(user_id)
            .bind(&password_hash)
            .execute(&self.pool)
            .await?;

        info!("Password updated for user: {}", user_id);
        Ok(())
    }

    /// Update profile fields; absent fields are left untouched
    pub async fn update_profile(&self, user_id: Uuid, update: &UpdateProfile) -> Result<()> {
        sqlx::query(
            "UPDATE users SET \
                full_name = COALESCE($2, full_name), \
                phone = COALESCE($3, phone), \
                avatar_url = COALESCE($4, avatar_url), \
                updated_at = now() \
             WHERE id = $1",
        )
        .bind(user_id)
        .bind(&update.full_name)
        .bind(&update.phone)
        .bind(&update.avatar_url)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Soft-delete a user; the row stays so audit references keep resolving
    pub async fn soft_delete(&self, user_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE users SET deleted_at = now(), status = 'inactive'::user_status, \
                updated_at = now() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
