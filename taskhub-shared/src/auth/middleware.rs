/// Bearer-token authentication for protected routes
///
/// [`authenticate`] is the state-free core of the auth gate: it reads the
/// `Authorization` header, verifies the access token and returns the
/// [`AuthContext`] that the API layer inserts into request extensions.
/// Nothing here touches the store.
///
/// | Situation | Error | Status |
/// |---|---|---|
/// | no `Authorization` header | `MissingCredentials` | 401 |
/// | header without `Bearer ` scheme | `InvalidFormat` | 401 |
/// | bad signature, malformed, expired, wrong issuer or type | `InvalidToken` | 403 |
///
/// # Example
///
/// ```
/// use axum::Extension;
/// use taskhub_shared::auth::middleware::AuthContext;
///
/// async fn handler(Extension(auth): Extension<AuthContext>) -> String {
///     format!("{} ({})", auth.username, auth.role)
/// }
/// ```

use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::jwt::{validate_access_token, Claims, JwtError};
use crate::models::user::UserRole;

/// Identity of the caller, added to request extensions after authentication
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub username: String,
    pub role: UserRole,
}

impl AuthContext {
    pub fn from_claims(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            username: claims.username,
            role: claims.role,
        }
    }
}

/// Error type for authentication
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Access token required")]
    MissingCredentials,

    #[error("{0}")]
    InvalidFormat(String),

    #[error("{0}")]
    InvalidToken(String),
}

impl AuthError {
    /// Missing or unusable credentials (401) as opposed to a rejected token (403)
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, AuthError::MissingCredentials | AuthError::InvalidFormat(_))
    }
}

impl From<JwtError> for AuthError {
    fn from(e: JwtError) -> Self {
        match e {
            JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
            JwtError::WrongType { .. } => AuthError::InvalidToken("Invalid token type".to_string()),
            _ => AuthError::InvalidToken("Invalid or malformed token".to_string()),
        }
    }
}

/// Extracts the raw bearer token from the `Authorization` header
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingCredentials)?
        .to_str()
        .map_err(|_| AuthError::InvalidFormat("Malformed Authorization header".to_string()))?;

    let token = value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?;

    if token.is_empty() {
        return Err(AuthError::MissingCredentials);
    }
    Ok(token)
}

/// Verifies the bearer access token in `headers`
pub fn authenticate(headers: &HeaderMap, secret: &str) -> Result<AuthContext, AuthError> {
    let token = bearer_token(headers)?;
    let claims = validate_access_token(token, secret)?;
    Ok(AuthContext::from_claims(claims))
}
