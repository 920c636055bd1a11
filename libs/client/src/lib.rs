//! Client-side authorization guard
//!
//! Wraps outbound requests to the auth-gated API: every request carries the
//! stored bearer token, an unauthorized response clears the local session
//! and redirects to the login entry point (unless the current page is
//! itself public, which would loop), and UI elements tagged with a role or
//! permission code are hidden when the cached user does not satisfy them.
//!
//! The hiding is advisory only. It is NOT a security boundary: the server
//! re-checks authorization on every request independently of anything this
//! crate does.
//!
//! Session state is an explicit [`session::AuthSession`] value handed into
//! each call, never ambient globals, so the guard is testable in isolation.

pub mod guard;
pub mod session;
pub mod visibility;

pub use guard::{GuardError, GuardedClient};
pub use session::{AuthSession, CachedUser};
pub use visibility::ElementTag;
