//! Account lockout policy
//!
//! A simple two-state policy (unlocked <-> locked) keyed by the per-account
//! failure counter and an expiry timestamp. The repository applies the
//! counter increment atomically; this module only decides when the lock
//! engages and for how long.

use chrono::{DateTime, Duration, Utc};

/// Lockout policy configuration
#[derive(Debug, Clone)]
pub struct LockoutPolicy {
    /// Consecutive failures before the account locks
    pub max_failed_attempts: i32,
    /// How long the lock holds, in minutes
    pub lock_minutes: i64,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_failed_attempts: 5,
            lock_minutes: 30,
        }
    }
}

impl LockoutPolicy {
    /// Build a LockoutPolicy from environment variables
    ///
    /// # Environment Variables
    /// - `LOCKOUT_MAX_FAILED_ATTEMPTS`: failure threshold (default: 5)
    /// - `LOCKOUT_MINUTES`: lock duration in minutes (default: 30)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let max_failed_attempts = std::env::var("LOCKOUT_MAX_FAILED_ATTEMPTS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_failed_attempts);

        let lock_minutes = std::env::var("LOCKOUT_MINUTES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.lock_minutes);

        Self {
            max_failed_attempts,
            lock_minutes,
        }
    }

    /// Whether an account with `failed_attempts` recorded failures locks
    pub fn locks_at(&self, failed_attempts: i32) -> bool {
        failed_attempts >= self.max_failed_attempts
    }

    /// Expiry timestamp for a lock engaged at `now`
    pub fn lock_until(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::minutes(self.lock_minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn env_overrides_the_defaults() {
        unsafe {
            std::env::set_var("LOCKOUT_MAX_FAILED_ATTEMPTS", "3");
            std::env::set_var("LOCKOUT_MINUTES", "10");
        }

        let policy = LockoutPolicy::from_env();
        assert_eq!(policy.max_failed_attempts, 3);
        assert_eq!(policy.lock_minutes, 10);

        unsafe {
            std::env::remove_var("LOCKOUT_MAX_FAILED_ATTEMPTS");
            std::env::remove_var("LOCKOUT_MINUTES");
        }
    }

    #[test]
    #[serial]
    fn defaults_without_env() {
        unsafe {
            std::env::remove_var("LOCKOUT_MAX_FAILED_ATTEMPTS");
            std::env::remove_var("LOCKOUT_MINUTES");
        }
        let policy = LockoutPolicy::from_env();
        assert_eq!(policy.max_failed_attempts, 5);
        assert_eq!(policy.lock_minutes, 30);
    }

    #[test]
    fn locks_exactly_at_threshold() {
        let policy = LockoutPolicy::default();
        assert!(!policy.locks_at(4));
        assert!(policy.locks_at(5));
        assert!(policy.locks_at(6));
    }

    #[test]
    fn lock_window_matches_configuration() {
        let policy = LockoutPolicy {
            max_failed_attempts: 3,
            lock_minutes: 10,
        };
        let now = Utc::now();
        assert_eq!(policy.lock_until(now), now + Duration::minutes(10));
    }
}
