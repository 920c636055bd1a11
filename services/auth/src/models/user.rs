//! User model and related payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Account status
///
/// `Locked` is entered by the lockout policy after repeated failures and
/// left again once `locked_until` elapses and a login succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Inactive,
    Locked,
}

/// User entity
///
/// Rows are soft-deleted (`deleted_at`), never removed, so login audit rows
/// keep resolving to the account they refer to.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub status: UserStatus,
    pub email_verified: bool,
    pub phone_verified: bool,
    pub failed_login_attempts: i32,
    pub locked_until: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub last_login_ip: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    /// Whether the account is currently locked out
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        if let Some(until) = self.locked_until {
            if until > now {
                return true;
            }
        }
        self.status == UserStatus::Locked && self.locked_until.is_none()
    }
}

/// New user creation payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
}

/// Profile update payload
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateProfile {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
}

/// User login credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginCredentials {
    pub username_or_email: String,
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "bob".to_string(),
            email: "bob@example.com".to_string(),
            password_hash: String::new(),
            full_name: None,
            phone: None,
            avatar_url: None,
            status: UserStatus::Active,
            email_verified: false,
            phone_verified: false,
            failed_login_attempts: 0,
            locked_until: None,
            last_login_at: None,
            last_login_ip: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }

    #[test]
    fn lock_holds_until_expiry() {
        let now = Utc::now();
        let mut user = sample_user();
        user.status = UserStatus::Locked;
        user.locked_until = Some(now + Duration::minutes(30));
        assert!(user.is_locked(now));
    }

    #[test]
    fn expired_lock_no_longer_holds() {
        let now = Utc::now();
        let mut user = sample_user();
        user.status = UserStatus::Locked;
        user.locked_until = Some(now - Duration::minutes(1));
        assert!(!user.is_locked(now));
    }

    #[test]
    fn active_account_is_not_locked() {
        assert!(!sample_user().is_locked(Utc::now()));
    }
}
