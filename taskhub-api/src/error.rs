//! Error handling for the API server
//!
//! Every handler returns [`ApiResult`]; errors from the store, the auth
//! primitives and request extraction convert into [`ApiError`] with `?` and
//! are rendered here as `{ "error", "message", "details"? }`.
//!
//! # Example
//!
//! ```
//! use taskhub_api::error::{ApiError, ApiResult};
//! use axum::Json;
//! use serde_json::{json, Value};
//!
//! async fn handler(found: bool) -> ApiResult<Json<Value>> {
//!     if !found {
//!         return Err(ApiError::NotFound("Task not found".to_string()));
//!     }
//!     Ok(Json(json!({ "ok": true })))
//! }
//! ```

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use taskhub_shared::auth::authorization::AuthzError;
use taskhub_shared::auth::jwt::JwtError;
use taskhub_shared::auth::middleware::AuthError;
use taskhub_shared::auth::password::PasswordError;
use taskhub_shared::store::StoreError;
use taskhub_shared::validation::FieldError;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Malformed JSON, query string or path (400)
    BadRequest(String),

    /// Field-level validation failures (400)
    ValidationError(Vec<FieldError>),

    /// Unique constraint violation (400)
    Duplicate { field: String },

    /// Missing credentials (401)
    Unauthorized(String),

    /// Invalid token or insufficient role (403)
    Forbidden(String),

    NotFound(String),

    RateLimitExceeded { retry_after: u64, message: String },

    /// Internal server error (500); the message is logged, never returned
    InternalError(String),
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "bad_request", "unauthorized")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::ValidationError(_) | ApiError::Duplicate { .. } => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::ValidationError(_) => "validation_error",
            ApiError::Duplicate { .. } => "duplicate_entry",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::NotFound(_) => "not_found",
            ApiError::RateLimitExceeded { .. } => "rate_limit_exceeded",
            ApiError::InternalError(_) => "internal_error",
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::Duplicate { field } => write!(f, "Duplicate: {} already exists", field),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::RateLimitExceeded { message, .. } => {
                write!(f, "Rate limit exceeded: {}", message)
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let retry_after = match &self {
            ApiError::RateLimitExceeded { retry_after, .. } => Some(*retry_after),
            _ => None,
        };

        let (message, details) = match self {
            ApiError::ValidationError(errors) => {
                ("Validation failed".to_string(), Some(errors))
            }
            ApiError::Duplicate { field } => {
                let message = format!("{} already exists", field);
                let details = vec![FieldError::new(field, message.clone())];
                (message, Some(details))
            }
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {}", msg);
                ("An internal error occurred".to_string(), None)
            }
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::RateLimitExceeded { message: msg, .. } => (msg, None),
        };

        let body = Json(ErrorResponse {
            error: code.to_string(),
            message,
            details,
        });

        let mut response = (status, body).into_response();
        if let Some(seconds) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(seconds));
        }
        response
    }
}

impl From<Vec<FieldError>> for ApiError {
    fn from(errors: Vec<FieldError>) -> Self {
        ApiError::ValidationError(errors)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate { field } => ApiError::Duplicate {
                field: field.to_string(),
            },
            StoreError::Database(e) => ApiError::InternalError(format!("Database error: {}", e)),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        if err.is_unauthenticated() {
            ApiError::Unauthorized(err.to_string())
        } else {
            ApiError::Forbidden(err.to_string())
        }
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::InsufficientRole { .. } => {
                ApiError::Forbidden("Insufficient permissions".to_string())
            }
            AuthzError::NotAuthorized => {
                ApiError::Forbidden("Not authorized to modify this resource".to_string())
            }
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::InternalError(format!("Password operation failed: {}", err))
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::CreateError(msg) => {
                ApiError::InternalError(format!("Token creation failed: {}", msg))
            }
            other => AuthError::from(other).into(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(_: PathRejection) -> Self {
        ApiError::BadRequest("Invalid resource id".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::BadRequest("Invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: Invalid input");

        let err = ApiError::NotFound("Task not found".to_string());
        assert_eq!(err.to_string(), "Not found: Task not found");
    }

    #[test]
    fn test_auth_errors_split_401_and_403() {
        assert_eq!(
            ApiError::from(AuthError::MissingCredentials).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(AuthError::InvalidFormat("Expected Bearer token".to_string())).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::from(JwtError::Expired).status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::from(AuthzError::NotAuthorized).status(),
            StatusCode::FORBIDDEN
        );
    }

    #[tokio::test]
    async fn test_duplicate_names_field() {
        let response = ApiError::from(StoreError::Duplicate { field: "email" }).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"], "duplicate_entry");
        assert_eq!(body["message"], "email already exists");
        assert_eq!(body["details"][0]["field"], "email");
    }

    #[tokio::test]
    async fn test_validation_details() {
        let response = ApiError::from(vec![
            FieldError::new("title", "Title is required"),
            FieldError::new("priority", "must be one of: low, medium, high, urgent"),
        ])
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"], "validation_error");
        assert_eq!(body["details"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_internal_error_hides_detail() {
        let response = ApiError::InternalError("connection refused".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["message"], "An internal error occurred");
        assert!(body.get("details").is_none());
    }

    #[test]
    fn test_rate_limit_sets_retry_after() {
        let response = ApiError::RateLimitExceeded {
            retry_after: 42,
            message: "Too many requests".to_string(),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "42");
    }
}
