//! Analytics endpoint
//!
//! ```text
//! GET /api/analytics/dashboard
//! ```
//!
//! Recomputed on every request; see [`taskhub_shared::analytics`].

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Json};
use taskhub_shared::analytics::{dashboard, Dashboard};

pub async fn get_dashboard(State(state): State<AppState>) -> ApiResult<Json<Dashboard>> {
    Ok(Json(dashboard(&state.store).await?))
}
