//! Database repositories

pub mod login_log;
pub mod rbac;
pub mod user;

pub use login_log::LoginLogRepository;
pub use rbac::{RbacRepository, RoleDeletion};
pub use user::{FailureRecord, UserRepository};
