//! Server-side session state in Redis
//!
//! One key per device session, `session:{user_id}:{fingerprint}`, holding
//! the refresh token it was issued with. Logout deletes the one session;
//! a password change sweeps every session the user has.

use anyhow::Result;
use common::cache::RedisPool;
use tracing::info;
use uuid::Uuid;

use crate::jwt::JwtService;

/// Derive a short stable fingerprint from a refresh token
///
/// JWTs end with the base64url signature segment, already unique per token;
/// its tail is enough to key a session without storing the token in the key.
fn token_fingerprint(token: &str) -> &str {
    let signature = token.rsplit('.').next().unwrap_or(token);
    let len = signature.len();
    &signature[len.saturating_sub(32)..]
}

/// Session manager for per-user refresh sessions
#[derive(Clone)]
pub struct SessionManager {
    redis_pool: RedisPool,
    jwt_service: JwtService,
}

impl SessionManager {
    /// Create a new session manager
    pub fn new(redis_pool: RedisPool, jwt_service: JwtService) -> Self {
        Self {
            redis_pool,
            jwt_service,
        }
    }

    fn session_key(user_id: Uuid, refresh_token: &str) -> String {
        format!("session:{}:{}", user_id, token_fingerprint(refresh_token))
    }

    /// Open a session for a freshly issued refresh token
    pub async fn create_session(&self, user_id: Uuid, refresh_token: &str) -> Result<()> {
        info!("Creating session for user: {}", user_id);

        self.redis_pool
            .set(
                &Self::session_key(user_id, refresh_token),
                refresh_token,
                Some(self.jwt_service.refresh_token_expiry()),
            )
            .await
    }

    /// Whether a refresh token still has a live session behind it
    pub async fn is_session_valid(&self, user_id: Uuid, refresh_token: &str) -> Result<bool> {
        let stored = self
            .redis_pool
            .get(&Self::session_key(user_id, refresh_token))
            .await?;

        Ok(stored.as_deref() == Some(refresh_token))
    }

    /// Replace a rotated session: the old key goes, the new one opens
    pub async fn rotate_session(
        &self,
        user_id: Uuid,
        old_refresh_token: &str,
        new_refresh_token: &str,
    ) -> Result<()> {
        self.redis_pool
            .delete(&Self::session_key(user_id, old_refresh_token))
            .await?;
        self.create_session(user_id, new_refresh_token).await
    }

    /// Close the session behind one refresh token
    pub async fn delete_session(&self, user_id: Uuid, refresh_token: &str) -> Result<()> {
        info!("Deleting session for user: {}", user_id);

        self.redis_pool
            .delete(&Self::session_key(user_id, refresh_token))
            .await?;
        Ok(())
    }

    /// Close every session a user has (password change, forced logout)
    pub async fn delete_all_sessions(&self, user_id: Uuid) -> Result<u64> {
        info!("Deleting all sessions for user: {}", user_id);

        self.redis_pool
            .delete_matching(&format!("session:{}:*", user_id))
            .await
    }

    /// Redis reachability
    pub async fn health_check(&self) -> Result<bool> {
        self.redis_pool.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_uses_signature_tail() {
        let token = "aaaa.bbbb.cccccccccccccccccccccccccccccccdddd";
        let fp = token_fingerprint(token);
        assert_eq!(fp.len(), 32);
        assert!(fp.ends_with("dddd"));
        assert!(!fp.contains('.'));
    }

    #[test]
    fn short_tokens_fingerprint_whole_signature() {
        assert_eq!(token_fingerprint("x.y.sig"), "sig");
    }

    #[test]
    fn distinct_tokens_get_distinct_keys() {
        let user = Uuid::new_v4();
        let a = SessionManager::session_key(user, "h.p.signature-one-abcdefghijklmnop");
        let b = SessionManager::session_key(user, "h.p.signature-two-abcdefghijklmnop");
        assert_ne!(a, b);
    }
}
