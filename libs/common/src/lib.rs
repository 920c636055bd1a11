//! Shared infrastructure for the quant trading system services
//!
//! This crate provides the pieces every service needs: the PostgreSQL
//! connection pool, the Redis pool used for session and token state, and
//! the database error types.

pub mod cache;
pub mod database;
pub mod error;
