//! Error types shared by the infrastructure modules

use sqlx::Error as SqlxError;
use thiserror::Error;

/// Errors raised by the database layer
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to establish or acquire a connection
    #[error("database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// A query failed to execute
    #[error("database query error: {0}")]
    Query(#[source] SqlxError),

    /// The connection URL or pool settings were invalid
    #[error("database configuration error: {0}")]
    Configuration(String),
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;
