//! Request guard around reqwest
//!
//! Attaches the session's bearer token to every outbound request and turns
//! unauthorized responses into a cleared session plus a redirect decision.

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use thiserror::Error;
use tracing::info;

use crate::session::AuthSession;

/// Errors surfaced by guarded requests
#[derive(Debug, Error)]
pub enum GuardError {
    /// The server rejected the token; local state has been cleared.
    /// `redirect` names the login entry point, or is `None` when the
    /// current page is already public and redirecting would loop.
    #[error("unauthorized; session cleared")]
    Unauthorized { redirect: Option<String> },

    /// Network-level failure
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// HTTP client that carries the session token on every request
#[derive(Debug, Clone)]
pub struct GuardedClient {
    http: reqwest::Client,
    login_path: String,
    public_paths: Vec<String>,
}

impl GuardedClient {
    /// Create a guard redirecting to `login_path` on expiry
    ///
    /// `public_paths` are the pages reachable without a session; an
    /// unauthorized response on one of them never triggers a redirect.
    pub fn new(login_path: impl Into<String>, public_paths: Vec<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            login_path: login_path.into(),
            public_paths,
        }
    }

    /// Guard with the default page layout of the trading UI
    pub fn with_defaults() -> Self {
        Self::new(
            "/auth/login",
            vec!["/auth/login".to_string(), "/auth/register".to_string()],
        )
    }

    /// Build a request carrying the session's bearer token, if present
    pub fn request(&self, session: &AuthSession, method: Method, url: &str) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match session.access_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Whether a page is reachable without authentication
    pub fn is_public_path(&self, path: &str) -> bool {
        self.public_paths.iter().any(|public| public == path)
    }

    /// Redirect decision for an unauthorized response seen on `current_path`
    pub fn unauthorized_redirect(&self, current_path: &str) -> Option<String> {
        if self.is_public_path(current_path) {
            None
        } else {
            Some(self.login_path.clone())
        }
    }

    /// Send a guarded request
    ///
    /// On any unauthorized status the session is cleared (all three cached
    /// items) and the caller receives the redirect decision for
    /// `current_path`. Other statuses pass through untouched.
    pub async fn send(
        &self,
        session: &mut AuthSession,
        request: RequestBuilder,
        current_path: &str,
    ) -> Result<Response, GuardError> {
        let response = request.send().await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            info!("unauthorized response; clearing client session");
            session.clear();
            return Err(GuardError::Unauthorized {
                redirect: self.unauthorized_redirect(current_path),
            });
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::CachedUser;
    use uuid::Uuid;

    fn logged_in_session() -> AuthSession {
        let mut session = AuthSession::new();
        session.store_login(
            "token-abc".into(),
            "refresh-abc".into(),
            CachedUser {
                id: Uuid::new_v4(),
                username: "bob".into(),
                roles: vec!["normal".into()],
                permissions: vec![],
            },
        );
        session
    }

    #[test]
    fn requests_carry_the_bearer_token() {
        let guard = GuardedClient::with_defaults();
        let session = logged_in_session();

        let request = guard
            .request(&session, Method::GET, "http://localhost:3000/auth/profile")
            .build()
            .unwrap();

        let header = request
            .headers()
            .get(reqwest::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .unwrap();
        assert_eq!(header, "Bearer token-abc");
    }

    #[test]
    fn anonymous_requests_carry_no_token() {
        let guard = GuardedClient::with_defaults();
        let session = AuthSession::new();

        let request = guard
            .request(&session, Method::GET, "http://localhost:3000/health")
            .build()
            .unwrap();

        assert!(
            request
                .headers()
                .get(reqwest::header::AUTHORIZATION)
                .is_none()
        );
    }

    #[test]
    fn unauthorized_on_private_page_redirects_to_login() {
        let guard = GuardedClient::with_defaults();
        assert_eq!(
            guard.unauthorized_redirect("/strategy/list"),
            Some("/auth/login".to_string())
        );
    }

    #[test]
    fn unauthorized_on_public_page_stays_put() {
        // Redirecting the login page to itself would loop.
        let guard = GuardedClient::with_defaults();
        assert_eq!(guard.unauthorized_redirect("/auth/login"), None);
        assert_eq!(guard.unauthorized_redirect("/auth/register"), None);
    }
}
