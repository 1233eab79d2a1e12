//! Health check endpoint
//!
//! ```text
//! GET /api/health
//! ```
//!
//! ```json
//! {
//!   "status": "healthy",
//!   "timestamp": "2025-01-01T00:00:00Z",
//!   "service": "taskhub-api",
//!   "version": "0.1.0",
//!   "database": "connected"
//! }
//! ```

use crate::app::AppState;
use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const SERVICE_NAME: &str = "taskhub-api";

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `healthy`, or `degraded` when the store does not answer
    pub status: String,

    pub timestamp: DateTime<Utc>,
    pub service: String,
    pub version: String,

    /// `connected` or `disconnected`
    pub database: String,
}

/// Always answers 200; a failing store only degrades the status
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database_status = match state.store.ping().await {
        Ok(()) => "connected",
        Err(e) => {
            tracing::warn!(
                error = %e,
                backend = state.store.backend_name(),
                "Health check: store unreachable"
            );
            "disconnected"
        }
    };

    Json(HealthResponse {
        status: if database_status == "connected" {
            "healthy".to_string()
        } else {
            "degraded".to_string()
        },
        timestamp: Utc::now(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: database_status.to_string(),
    })
}
