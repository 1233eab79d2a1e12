//! API route handlers, organized by resource:
//!
//! - `health`: Health check endpoint
//! - `auth`: Registration, login, token refresh and logout
//! - `users`: Profiles and user administration
//! - `tasks`: Task CRUD, comments and attachments
//! - `projects`: Project CRUD
//! - `analytics`: Dashboard aggregation

pub mod analytics;
pub mod auth;
pub mod health;
pub mod projects;
pub mod tasks;
pub mod users;

use serde::Serialize;

/// Body of delete/logout confirmations
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
