//! Per-origin login throttle
//!
//! Shields the credential store from brute-force sweeps before any account
//! lookup happens. This is per-IP and complements the per-account lockout
//! policy, which covers the case of one account hit from many origins.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::warn;

/// Throttle configuration
#[derive(Debug, Clone)]
pub struct ThrottleConfig {
    /// Attempts allowed per window
    pub max_attempts: u32,
    /// Window length in seconds
    pub window_seconds: u64,
    /// How long an origin stays banned after exceeding the window
    pub ban_seconds: u64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            window_seconds: 300,
            ban_seconds: 900,
        }
    }
}

#[derive(Debug)]
struct OriginState {
    window_start: Instant,
    attempts: u32,
    banned_until: Option<Instant>,
}

/// Login throttle keyed by origin (client IP)
#[derive(Clone)]
pub struct LoginThrottle {
    config: ThrottleConfig,
    origins: Arc<Mutex<HashMap<String, OriginState>>>,
}

impl LoginThrottle {
    /// Create a new throttle
    pub fn new(config: ThrottleConfig) -> Self {
        Self {
            config,
            origins: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Record an attempt from `origin` and report whether it may proceed
    pub async fn allow(&self, origin: &str) -> bool {
        self.allow_at(origin, Instant::now()).await
    }

    async fn allow_at(&self, origin: &str, now: Instant) -> bool {
        let mut origins = self.origins.lock().await;

        let state = origins.entry(origin.to_string()).or_insert(OriginState {
            window_start: now,
            attempts: 0,
            banned_until: None,
        });

        if let Some(until) = state.banned_until {
            if now < until {
                return false;
            }
            state.banned_until = None;
            state.window_start = now;
            state.attempts = 0;
        }

        if now.duration_since(state.window_start)
            >= Duration::from_secs(self.config.window_seconds)
        {
            state.window_start = now;
            state.attempts = 0;
        }

        state.attempts += 1;
        if state.attempts > self.config.max_attempts {
            state.banned_until = Some(now + Duration::from_secs(self.config.ban_seconds));
            warn!(
                "Origin {} banned for {} seconds after {} attempts",
                origin, self.config.ban_seconds, state.attempts
            );
            return false;
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tight_config() -> ThrottleConfig {
        ThrottleConfig {
            max_attempts: 3,
            window_seconds: 60,
            ban_seconds: 120,
        }
    }

    #[tokio::test]
    async fn allows_up_to_the_limit() {
        let throttle = LoginThrottle::new(tight_config());
        let now = Instant::now();
        for _ in 0..3 {
            assert!(throttle.allow_at("10.0.0.1", now).await);
        }
        assert!(!throttle.allow_at("10.0.0.1", now).await);
    }

    #[tokio::test]
    async fn origins_are_independent() {
        let throttle = LoginThrottle::new(tight_config());
        let now = Instant::now();
        for _ in 0..4 {
            throttle.allow_at("10.0.0.1", now).await;
        }
        assert!(throttle.allow_at("10.0.0.2", now).await);
    }

    #[tokio::test]
    async fn ban_expires() {
        let throttle = LoginThrottle::new(tight_config());
        let now = Instant::now();
        for _ in 0..4 {
            throttle.allow_at("10.0.0.1", now).await;
        }
        assert!(!throttle.allow_at("10.0.0.1", now).await);

        let later = now + Duration::from_secs(121);
        assert!(throttle.allow_at("10.0.0.1", later).await);
    }

    #[tokio::test]
    async fn window_resets_the_count() {
        let throttle = LoginThrottle::new(tight_config());
        let now = Instant::now();
        for _ in 0..3 {
            throttle.allow_at("10.0.0.1", now).await;
        }
        let later = now + Duration::from_secs(61);
        assert!(throttle.allow_at("10.0.0.1", later).await);
    }
}
