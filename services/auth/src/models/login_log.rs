//! Login audit log model
//!
//! Rows are write-once. Security auditing must observe every attempt, so
//! the repository appends on its own connection, outside any lockout
//! transaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Channel a login attempt arrived on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "login_channel", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LoginChannel {
    Web,
    Api,
    Mobile,
}

/// Outcome of a login attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "login_outcome", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LoginOutcome {
    Success,
    Failed,
}

/// Persisted audit row
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LoginLog {
    pub id: i64,
    pub user_id: Option<Uuid>,
    pub username: String,
    pub channel: LoginChannel,
    pub outcome: LoginOutcome,
    pub failure_reason: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Audit row to append
#[derive(Debug, Clone)]
pub struct NewLoginLog {
    pub user_id: Option<Uuid>,
    pub username: String,
    pub channel: LoginChannel,
    pub outcome: LoginOutcome,
    pub failure_reason: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub location: Option<String>,
}

impl NewLoginLog {
    /// Audit row for a failed attempt that may not resolve to a user
    pub fn failure(username: &str, reason: &str) -> Self {
        Self {
            user_id: None,
            username: username.to_string(),
            channel: LoginChannel::Web,
            outcome: LoginOutcome::Failed,
            failure_reason: Some(reason.to_string()),
            ip_address: None,
            user_agent: None,
            location: None,
        }
    }

    /// Audit row for a successful attempt
    pub fn success(user_id: Uuid, username: &str) -> Self {
        Self {
            user_id: Some(user_id),
            username: username.to_string(),
            channel: LoginChannel::Web,
            outcome: LoginOutcome::Success,
            failure_reason: None,
            ip_address: None,
            user_agent: None,
            location: None,
        }
    }

    pub fn with_origin(mut self, ip: Option<String>, user_agent: Option<String>) -> Self {
        self.ip_address = ip;
        self.user_agent = user_agent;
        self
    }
}
