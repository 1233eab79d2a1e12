//! PostgreSQL plumbing
//!
//! - `pool`: connection pool creation, health check and shutdown
//! - `migrations`: embedded schema migrations
//!
//! Queries themselves live in [`crate::store::postgres`].

pub mod migrations;
pub mod pool;
