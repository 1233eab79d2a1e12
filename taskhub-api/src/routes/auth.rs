//! Authentication endpoints
//!
//! - `POST /api/auth/register` - Create an account and start a session
//! - `POST /api/auth/login` - Exchange credentials for tokens
//! - `POST /api/auth/refresh` - Rotate a refresh token
//! - `POST /api/auth/logout` - Revoke a refresh token
//!
//! Sessions consist of a 24 hour access token and a 7 day single-use refresh
//! token whose `jti` is persisted. Presenting a refresh token that was
//! already used revokes every refresh token of that user.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ApiJson,
    routes::MessageResponse,
};
use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use taskhub_shared::{
    auth::{jwt, password},
    models::user::{LoginInput, RegisterInput, User, UserProfile},
    store::{ConsumeOutcome, RefreshTokenRecord},
    validation::FieldError,
};

/// Successful register/login/refresh response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    /// Access token (24h)
    pub token: String,

    /// Single-use refresh token (7d)
    pub refresh_token: String,

    pub user: UserProfile,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

impl RefreshRequest {
    fn token(&self) -> Result<&str, ApiError> {
        let token = self.refresh_token.trim();
        if token.is_empty() {
            return Err(ApiError::ValidationError(vec![FieldError::new(
                "refreshToken",
                "Refresh token is required",
            )]));
        }
        Ok(token)
    }
}

/// Issues an access/refresh pair and persists the refresh token id
async fn start_session(state: &AppState, user: &User) -> ApiResult<AuthResponse> {
    let issued = jwt::issue_tokens(user.id, &user.username, user.role, state.jwt_secret())?;

    state
        .store
        .refresh_tokens
        .insert(RefreshTokenRecord::new(
            issued.refresh_claims.jti,
            user.id,
            issued.refresh_claims.expires_at(),
        ))
        .await?;

    Ok(AuthResponse {
        token: issued.access_token,
        refresh_token: issued.refresh_token,
        user: user.profile(),
    })
}

/// Register a new user
///
/// ```text
/// POST /api/auth/register
///
/// {
///   "username": "alice",
///   "email": "alice@example.com",
///   "password": "secret123",
///   "firstName": "Alice",
///   "lastName": "Smith"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed, or username/email already taken
pub async fn register(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<RegisterInput>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let registration = input.into_registration()?;

    let password_hash = password::hash_password_blocking(registration.password.clone()).await?;
    let user = state
        .store
        .users
        .create(registration.into_create(password_hash))
        .await?;

    tracing::info!(user_id = %user.id, username = %user.username, "User registered");

    let response = start_session(&state, &user).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Login with username or email
///
/// # Errors
///
/// - `400 Bad Request`: Missing fields
/// - `401 Unauthorized`: Unknown account or wrong password
/// - `403 Forbidden`: Account deactivated
pub async fn login(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<LoginInput>,
) -> ApiResult<Json<AuthResponse>> {
    let (login, plaintext) = input.credentials()?;

    let invalid_credentials = || ApiError::Unauthorized("Invalid credentials".to_string());

    let mut user = match state.store.users.find_by_login(login).await? {
        Some(user) => user,
        None => {
            tracing::warn!(login = %login, "Login failed: unknown account");
            return Err(invalid_credentials());
        }
    };

    let valid =
        password::verify_password_blocking(plaintext.to_string(), user.password_hash.clone())
            .await?;
    if !valid {
        tracing::warn!(user_id = %user.id, "Login failed: wrong password");
        return Err(invalid_credentials());
    }

    if !user.is_active {
        tracing::warn!(user_id = %user.id, "Login refused: account deactivated");
        return Err(ApiError::Forbidden("Account is deactivated".to_string()));
    }

    state.store.users.touch_last_login(user.id).await?;
    user.last_login_at = Some(Utc::now());

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(start_session(&state, &user).await?))
}

/// Rotate a refresh token
///
/// The presented token is consumed; a second presentation is treated as
/// theft and revokes all of the user's refresh tokens.
///
/// # Errors
///
/// - `400 Bad Request`: Missing `refreshToken`
/// - `403 Forbidden`: Invalid, expired, revoked or reused token
pub async fn refresh(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RefreshRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let claims = jwt::validate_refresh_token(req.token()?, state.jwt_secret())?;

    match state.store.refresh_tokens.consume(claims.jti).await? {
        ConsumeOutcome::Consumed { user_id } => {
            let user = state
                .store
                .users
                .find_by_id(user_id)
                .await?
                .filter(|user| user.is_active)
                .ok_or_else(|| ApiError::Forbidden("Account is no longer active".to_string()))?;

            tracing::debug!(user_id = %user.id, "Refresh token rotated");
            Ok(Json(start_session(&state, &user).await?))
        }
        ConsumeOutcome::Reused { user_id } => {
            let revoked = state.store.refresh_tokens.revoke_all_for_user(user_id).await?;
            tracing::warn!(
                user_id = %user_id,
                jti = %claims.jti,
                revoked,
                "Refresh token reuse detected, revoked all sessions"
            );
            Err(ApiError::Forbidden("Refresh token has already been used".to_string()))
        }
        ConsumeOutcome::Rejected => Err(ApiError::Forbidden(
            "Invalid or expired refresh token".to_string(),
        )),
    }
}

/// Revoke a refresh token
///
/// Logging out with an already revoked token still succeeds.
pub async fn logout(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RefreshRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let claims = jwt::validate_refresh_token(req.token()?, state.jwt_secret())?;

    if state.store.refresh_tokens.revoke(claims.jti).await? {
        tracing::info!(user_id = %claims.sub, "User logged out");
    }

    Ok(Json(MessageResponse::new("Logged out successfully")))
}
