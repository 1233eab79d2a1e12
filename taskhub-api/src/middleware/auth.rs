//! JWT authentication middleware
//!
//! Rejects requests without a bearer token with 401 and requests with an
//! invalid or expired token with 403; on success the caller's
//! [`AuthContext`] is added to the request extensions for handlers to take
//! with `Extension<AuthContext>`.

use crate::{app::AppState, error::ApiError};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use taskhub_shared::auth::middleware::{authenticate, AuthContext};

pub async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_context: AuthContext =
        authenticate(req.headers(), state.jwt_secret()).map_err(|e| {
            tracing::warn!(
                error = %e,
                path = %req.uri().path(),
                "Authentication failed"
            );
            ApiError::from(e)
        })?;

    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}
