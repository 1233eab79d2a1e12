//! # TaskHub Shared Library
//!
//! This crate contains the domain types, validation rules, authentication
//! primitives and persistence layer used by the TaskHub API server.
//!
//! ## Module Organization
//!
//! - `models`: Users, tasks and projects, their inputs and response views
//! - `validation`: Store-independent field validation
//! - `auth`: Password hashing, JWT issuance/verification, auth context, role gates
//! - `db`: PostgreSQL pool management and migrations
//! - `store`: Repository traits with PostgreSQL and in-memory backends
//! - `analytics`: Dashboard aggregation over tasks and projects

pub mod analytics;
pub mod auth;
pub mod db;
pub mod models;
pub mod store;
pub mod validation;

/// Current version of the TaskHub shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
