//! Login audit log repository
//!
//! Appends run on the pool directly, never inside another transaction: a
//! rejected lockout update must still leave its audit row behind.

use anyhow::Result;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{LoginLog, NewLoginLog};

/// Login log repository
#[derive(Clone)]
pub struct LoginLogRepository {
    pool: PgPool,
}

impl LoginLogRepository {
    /// Create a new login log repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append one audit row for a login attempt
    pub async fn append(&self, entry: &NewLoginLog) -> Result<()> {
        sqlx::query(
            "INSERT INTO login_logs \
                (user_id, username, channel, outcome, failure_reason, \
                 ip_address, user_agent, location) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(entry.user_id)
        .bind(&entry.username)
        .bind(entry.channel)
        .bind(entry.outcome)
        .bind(&entry.failure_reason)
        .bind(&entry.ip_address)
        .bind(&entry.user_agent)
        .bind(&entry.location)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn log_from_row(row: sqlx::postgres::PgRow) -> LoginLog {
        LoginLog {
            id: row.get("id"),
            user_id: row.get("user_id"),
            username: row.get("username"),
            channel: row.get("channel"),
            outcome: row.get("outcome"),
            failure_reason: row.get("failure_reason"),
            ip_address: row.get("ip_address"),
            user_agent: row.get("user_agent"),
            location: row.get("location"),
            created_at: row.get("created_at"),
        }
    }

    /// Most recent attempts, newest first
    pub async fn recent(&self, limit: i64) -> Result<Vec<LoginLog>> {
        let rows = sqlx::query(
            "SELECT id, user_id, username, channel, outcome, failure_reason, \
                    ip_address, user_agent, location, created_at \
             FROM login_logs ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Self::log_from_row).collect())
    }

    /// Most recent attempts for one user, newest first
    pub async fn recent_for_user(&self, user_id: Uuid, limit: i64) -> Result<Vec<LoginLog>> {
        let rows = sqlx::query(
            "SELECT id, user_id, username, channel, outcome, failure_reason, \
                    ip_address, user_agent, location, created_at \
             FROM login_logs WHERE user_id = $1 \
             ORDER BY created_at DESC LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Self::log_from_row).collect())
    }
}
