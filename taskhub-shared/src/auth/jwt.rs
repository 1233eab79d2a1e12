/// JWT issuance and verification
///
/// Tokens are signed with HS256 and carry the caller's identity (`sub`,
/// `username`, `role`) so protected requests never need a store lookup to
/// authenticate.
///
/// # Token Types
///
/// - **Access Token**: 24 hours, presented as `Authorization: Bearer <token>`
/// - **Refresh Token**: 7 days, single use; its `jti` is persisted and
///   consumed on `POST /api/auth/refresh`
///
/// Every token gets a random `jti`, so two tokens issued for the same user in
/// the same second still differ.
///
/// # Example
///
/// ```
/// use taskhub_shared::auth::jwt::{create_token, validate_access_token, Claims, TokenType};
/// use taskhub_shared::models::user::UserRole;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "an-example-secret-that-is-32-bytes!";
/// let user_id = Uuid::new_v4();
///
/// let claims = Claims::new(user_id, "alice", UserRole::User, TokenType::Access);
/// let token = create_token(&claims, secret)?;
///
/// let validated = validate_access_token(&token, secret)?;
/// assert_eq!(validated.sub, user_id);
/// assert_eq!(validated.username, "alice");
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::UserRole;

/// `iss` claim of every token this service signs
pub const ISSUER: &str = "taskhub";

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Bad signature, malformed token or wrong issuer
    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    #[error("Token has expired")]
    Expired,

    /// A refresh token was presented where an access token is required, or
    /// the other way round
    #[error("Expected {expected} token, got {actual} token")]
    WrongType {
        expected: &'static str,
        actual: &'static str,
    },
}

/// Token type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    pub fn default_expiration(&self) -> Duration {
        match self {
            TokenType::Access => Duration::hours(24),
            TokenType::Refresh => Duration::days(7),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

/// JWT claims
///
/// Standard claims (`sub`, `iss`, `iat`, `nbf`, `exp`, `jti`) plus the
/// identity carried to handlers (`username`, `role`) and `token_type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - user id
    pub sub: Uuid,

    pub username: String,
    pub role: UserRole,

    /// Issuer - always "taskhub"
    pub iss: String,

    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,

    /// Unique token id
    pub jti: Uuid,

    pub token_type: TokenType,
}

impl Claims {
    /// Creates claims with the default lifetime of `token_type`
    pub fn new(user_id: Uuid, username: &str, role: UserRole, token_type: TokenType) -> Self {
        Self::with_expiration(user_id, username, role, token_type, token_type.default_expiration())
    }

    /// Creates claims expiring `expires_in` from now
    pub fn with_expiration(
        user_id: Uuid,
        username: &str,
        role: UserRole,
        token_type: TokenType,
        expires_in: Duration,
    ) -> Self {
        let now = Utc::now();
        let expiration = now + expires_in;

        Self {
            sub: user_id,
            username: username.to_string(),
            role,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: expiration.timestamp(),
            jti: Uuid::new_v4(),
            token_type,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }
}

/// Signs claims with HS256
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Verifies signature, issuer, `exp` and `nbf`, and returns the claims
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;
    validation.validate_nbf = true;

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
        _ => JwtError::ValidationError(format!("Token validation failed: {}", e)),
    })?;

    Ok(token_data.claims)
}

fn expect_type(claims: Claims, expected: TokenType) -> Result<Claims, JwtError> {
    if claims.token_type != expected {
        return Err(JwtError::WrongType {
            expected: expected.as_str(),
            actual: claims.token_type.as_str(),
        });
    }
    Ok(claims)
}

/// [`validate_token`] that also requires an access token
pub fn validate_access_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    expect_type(validate_token(token, secret)?, TokenType::Access)
}

/// [`validate_token`] that also requires a refresh token
pub fn validate_refresh_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    expect_type(validate_token(token, secret)?, TokenType::Refresh)
}

/// An access/refresh pair issued at login, registration or refresh
#[derive(Debug, Clone)]
pub struct IssuedTokens {
    pub access_token: String,
    pub refresh_token: String,

    /// Claims of the refresh token, persisted so the token can be consumed once
    pub refresh_claims: Claims,
}

/// Issues a fresh access/refresh pair for a user
pub fn issue_tokens(
    user_id: Uuid,
    username: &str,
    role: UserRole,
    secret: &str,
) -> Result<IssuedTokens, JwtError> {
    let access_claims = Claims::new(user_id, username, role, TokenType::Access);
    let refresh_claims = Claims::new(user_id, username, role, TokenType::Refresh);

    Ok(IssuedTokens {
        access_token: create_token(&access_claims, secret)?,
        refresh_token: create_token(&refresh_claims, secret)?,
        refresh_claims,
    })
}
