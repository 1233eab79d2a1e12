//! Authentication and authorization primitives
//!
//! # Modules
//!
//! - [`password`]: Argon2id hashing, verification and the password policy
//! - [`jwt`]: Access/refresh token issuance and verification
//! - [`middleware`]: Bearer-token extraction and the request
//!   [`AuthContext`](middleware::AuthContext)
//! - [`authorization`]: Role and ownership gates
//!
//! # Example
//!
//! ```
//! use taskhub_shared::auth::jwt::{issue_tokens, validate_access_token};
//! use taskhub_shared::auth::password::{hash_password, verify_password};
//! use taskhub_shared::models::user::UserRole;
//! use uuid::Uuid;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let hash = hash_password("wonderland42")?;
//! assert!(verify_password("wonderland42", &hash)?);
//!
//! let secret = "a-secret-of-at-least-32-bytes!!";
//! let tokens = issue_tokens(Uuid::new_v4(), "alice", UserRole::User, secret)?;
//! let claims = validate_access_token(&tokens.access_token, secret)?;
//! assert_eq!(claims.username, "alice");
//! # Ok(())
//! # }
//! ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
