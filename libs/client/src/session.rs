//! Client session state
//!
//! Exactly three things are cached after a login: the access token, the
//! refresh token, and the user object with its role/permission closure.
//! Logout and any unauthorized response clear all three together.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The user object cached at login time
///
/// Carries the closure the server issued with the token; it reflects the
/// grants at login and is only used for advisory UI decisions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedUser {
    pub id: Uuid,
    pub username: String,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
}

impl CachedUser {
    /// Direct role membership test against the cached closure
    pub fn has_role(&self, code: &str) -> bool {
        self.roles.iter().any(|role| role == code)
    }

    /// Permission reachability test against the cached closure
    pub fn has_permission(&self, code: &str) -> bool {
        self.permissions.iter().any(|permission| permission == code)
    }
}

/// Explicit client-side session, passed into each guarded call
#[derive(Debug, Clone, Default)]
pub struct AuthSession {
    access_token: Option<String>,
    refresh_token: Option<String>,
    user: Option<CachedUser>,
}

impl AuthSession {
    /// An empty, unauthenticated session
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the three items a successful login returns
    pub fn store_login(&mut self, access_token: String, refresh_token: String, user: CachedUser) {
        self.access_token = Some(access_token);
        self.refresh_token = Some(refresh_token);
        self.user = Some(user);
    }

    /// Replace the tokens after a refresh rotation
    pub fn store_tokens(&mut self, access_token: String, refresh_token: String) {
        self.access_token = Some(access_token);
        self.refresh_token = Some(refresh_token);
    }

    /// Drop the access token, refresh token, and cached user
    pub fn clear(&mut self) {
        self.access_token = None;
        self.refresh_token = None;
        self.user = None;
    }

    /// Whether a token is currently stored
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    /// The stored access token, if any
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    /// The stored refresh token, if any
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    /// The cached user, if any
    pub fn user(&self) -> Option<&CachedUser> {
        self.user.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cached_user(roles: &[&str], permissions: &[&str]) -> CachedUser {
        CachedUser {
            id: Uuid::new_v4(),
            username: "normal".to_string(),
            roles: roles.iter().map(|s| s.to_string()).collect(),
            permissions: permissions.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn clear_drops_all_three_items() {
        let mut session = AuthSession::new();
        session.store_login(
            "access".into(),
            "refresh".into(),
            cached_user(&["normal"], &["strategy.view"]),
        );
        assert!(session.is_authenticated());

        session.clear();
        assert!(!session.is_authenticated());
        assert!(session.access_token().is_none());
        assert!(session.refresh_token().is_none());
        assert!(session.user().is_none());
    }

    #[test]
    fn cached_closure_answers_membership() {
        let user = cached_user(&["normal"], &["strategy.view", "trade.view"]);
        assert!(user.has_role("normal"));
        assert!(!user.has_role("admin"));
        assert!(user.has_permission("trade.view"));
        assert!(!user.has_permission("strategy.delete"));
    }

    #[test]
    fn token_rotation_keeps_the_user() {
        let mut session = AuthSession::new();
        session.store_login("a1".into(), "r1".into(), cached_user(&["normal"], &[]));
        session.store_tokens("a2".into(), "r2".into());
        assert_eq!(session.access_token(), Some("a2"));
        assert_eq!(session.refresh_token(), Some("r2"));
        assert!(session.user().is_some());
    }
}
