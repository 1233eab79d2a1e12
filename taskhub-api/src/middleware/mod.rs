//! Custom middleware for the API server
//!
//! - `auth`: bearer-token gate for protected routes
//! - `rate_limit`: fixed-window limiter applied to every route
//! - `security`: security response headers

pub mod auth;
pub mod rate_limit;
pub mod security;
