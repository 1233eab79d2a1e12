//! User accounts, roles and the public user projections
//!
//! The stored [`User`] record carries the Argon2id password hash and is
//! deliberately not `Serialize`: everything that leaves the service goes
//! through [`UserProfile`] (the caller's own view, admin views) or
//! [`UserSummary`] (references embedded in tasks, projects and comments).
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE users (
//!     id UUID PRIMARY KEY,
//!     username VARCHAR(30) NOT NULL,       -- unique on LOWER(username)
//!     email VARCHAR(255) NOT NULL,         -- stored lower-cased, unique
//!     password_hash VARCHAR(255) NOT NULL,
//!     first_name VARCHAR(50) NOT NULL,
//!     last_name VARCHAR(50) NOT NULL,
//!     role user_role NOT NULL DEFAULT 'user',
//!     is_active BOOLEAN NOT NULL DEFAULT TRUE,
//!     last_login_at TIMESTAMPTZ,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use super::fields::Page;
use crate::auth::password::validate_password_strength;
use crate::validation::{FieldError, UnknownVariant, Violations};

/// Default page size for `GET /api/users`
pub const DEFAULT_USER_PAGE_SIZE: u32 = 100;

/// Account role
///
/// Carried in access tokens; a role change takes effect at the next token
/// issuance.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Regular account (the registration default)
    #[default]
    User,

    /// Full administrative access, including role management
    Admin,

    /// May modify any task or project
    Manager,
}

impl UserRole {
    pub const ALL: [UserRole; 3] = [UserRole::User, UserRole::Admin, UserRole::Manager];
    pub const VARIANTS: &'static [&'static str] = &["user", "admin", "manager"];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
            UserRole::Manager => "manager",
        }
    }

    /// Managers and admins may act on resources they do not own
    pub fn is_staff(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Manager)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(UserRole::User),
            "admin" => Ok(UserRole::Admin),
            "manager" => Ok(UserRole::Manager),
            _ => Err(UnknownVariant {
                expected: Self::VARIANTS,
            }),
        }
    }
}

/// Stored user record
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,

    /// Always lower-cased
    pub email: String,

    /// Argon2id PHC string, never returned to clients
    pub password_hash: String,

    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            role: self.role,
            is_active: self.is_active,
            last_login_at: self.last_login_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            username: self.username.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
        }
    }
}

/// Full public view of an account (everything except the password hash)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Display projection used wherever another entity references a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

/// Insert payload; the password is already hashed
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
}

/// Partial update; only `Some` fields change
#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    pub role: Option<UserRole>,
}

impl UserFilter {
    pub fn matches(&self, user: &User) -> bool {
        self.role.map_or(true, |role| user.role == role)
    }
}

/// `POST /api/auth/register` body
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct RegisterInput {
    #[validate(length(min = 3, max = 30, message = "Username must be 3-30 characters"))]
    pub username: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub password: String,

    #[validate(length(min = 1, max = 50, message = "First name must be 1-50 characters"))]
    pub first_name: String,

    #[validate(length(min = 1, max = 50, message = "Last name must be 1-50 characters"))]
    pub last_name: String,
}

/// Validated registration; the password is still plaintext and must be hashed
#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

impl Registration {
    pub fn into_create(self, password_hash: String) -> CreateUser {
        CreateUser {
            username: self.username,
            email: self.email,
            password_hash,
            first_name: self.first_name,
            last_name: self.last_name,
            role: UserRole::User,
        }
    }
}

impl RegisterInput {
    pub fn into_registration(self) -> Result<Registration, Vec<FieldError>> {
        let username = self.username.trim().to_string();
        let first_name = self.first_name.trim().to_string();
        let last_name = self.last_name.trim().to_string();
        let email = self.email.trim().to_lowercase();
        let trimmed = RegisterInput {
            username,
            email,
            password: self.password,
            first_name,
            last_name,
        };

        let mut violations = Violations::check(&trimmed);
        check_username_chars(&mut violations, &trimmed.username);
        if let Err(message) = validate_password_strength(&trimmed.password) {
            violations.push("password", message);
        }

        violations.into_result(Registration {
            username: trimmed.username,
            email: trimmed.email,
            password: trimmed.password,
            first_name: trimmed.first_name,
            last_name: trimmed.last_name,
        })
    }
}

fn check_username_chars(violations: &mut Violations, username: &str) {
    let valid = username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if !valid {
        violations.push(
            "username",
            "Username may only contain letters, digits, '_', '-' and '.'",
        );
    }
}

/// `POST /api/auth/login` body; either `username` or `email` identifies the account
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginInput {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: String,
}

impl LoginInput {
    /// Returns the login identifier (username or email) and the password
    pub fn credentials(&self) -> Result<(&str, &str), Vec<FieldError>> {
        let mut violations = Violations::new();
        fn present(field: &Option<String>) -> Option<&str> {
            field
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
        }
        let login = present(&self.username).or_else(|| present(&self.email));

        if login.is_none() {
            violations.push("username", "Username or email is required");
        }
        if self.password.is_empty() {
            violations.push("password", "Password is required");
        }

        violations.finish()?;
        login
            .map(|login| (login, self.password.as_str()))
            .ok_or_else(|| vec![FieldError::new("username", "Username or email is required")])
    }
}

/// `PUT /api/users/profile` body
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct ProfileUpdateInput {
    #[validate(length(min = 1, max = 50, message = "First name must be 1-50 characters"))]
    pub first_name: Option<String>,

    #[validate(length(min = 1, max = 50, message = "Last name must be 1-50 characters"))]
    pub last_name: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    pub password: Option<String>,
}

impl ProfileUpdateInput {
    /// Returns the update plus the new plaintext password, if one was supplied
    pub fn into_update(self) -> Result<(UpdateUser, Option<String>), Vec<FieldError>> {
        let trimmed = ProfileUpdateInput {
            first_name: self.first_name.map(|s| s.trim().to_string()),
            last_name: self.last_name.map(|s| s.trim().to_string()),
            email: self.email.map(|s| s.trim().to_lowercase()),
            password: self.password,
        };

        let mut violations = Violations::check(&trimmed);
        if let Some(password) = &trimmed.password {
            if let Err(message) = validate_password_strength(password) {
                violations.push("password", message);
            }
        }
        violations.finish()?;

        let update = UpdateUser {
            email: trimmed.email,
            first_name: trimmed.first_name,
            last_name: trimmed.last_name,
            ..Default::default()
        };
        Ok((update, trimmed.password))
    }
}

/// `PUT /api/users/:id/role` body
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RoleUpdateInput {
    pub role: Option<String>,
}

impl RoleUpdateInput {
    pub fn into_role(self) -> Result<UserRole, Vec<FieldError>> {
        let mut violations = Violations::new();
        let role = violations.parse_enum::<UserRole>("role", self.role.as_deref());
        match (role, violations.finish()) {
            (Some(role), Ok(())) => Ok(role),
            (_, Err(errors)) => Err(errors),
            (None, Ok(())) => Err(vec![FieldError::new("role", "Role is required")]),
        }
    }
}

/// `PUT /api/users/:id/status` body
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StatusUpdateInput {
    pub is_active: Option<bool>,
}

impl StatusUpdateInput {
    pub fn into_update(self) -> Result<UpdateUser, Vec<FieldError>> {
        let is_active = self
            .is_active
            .ok_or_else(|| vec![FieldError::new("isActive", "isActive is required")])?;
        Ok(UpdateUser {
            is_active: Some(is_active),
            ..Default::default()
        })
    }
}

/// `GET /api/users` query string
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserQuery {
    pub role: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl UserQuery {
    pub fn into_filter(self) -> Result<(UserFilter, Page), Vec<FieldError>> {
        let mut violations = Violations::new();
        let role = violations.parse_enum("role", self.role.as_deref());
        let page = Page::parse(
            &mut violations,
            self.page.as_deref(),
            self.limit.as_deref(),
            DEFAULT_USER_PAGE_SIZE,
        );
        violations.into_result((UserFilter { role }, page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register_input() -> RegisterInput {
        RegisterInput {
            username: "alice".to_string(),
            email: "Alice@Example.com".to_string(),
            password: "wonderland42".to_string(),
            first_name: "Alice".to_string(),
            last_name: "Liddell".to_string(),
        }
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("manager".parse::<UserRole>().unwrap(), UserRole::Manager);
        assert!("customer".parse::<UserRole>().is_err());
        for role in UserRole::ALL {
            assert_eq!(role.as_str().parse::<UserRole>().unwrap(), role);
        }
        assert!(UserRole::Admin.is_staff());
        assert!(!UserRole::User.is_staff());
        assert_eq!(UserRole::default(), UserRole::User);
    }

    #[test]
    fn test_registration_lowercases_email() {
        let registration = register_input().into_registration().unwrap();
        assert_eq!(registration.email, "alice@example.com");

        let user = registration.into_create("$argon2id$hash".to_string());
        assert_eq!(user.role, UserRole::User);
    }

    #[test]
    fn test_registration_reports_every_field() {
        let input = RegisterInput {
            username: "a b".to_string(),
            email: "not-an-email".to_string(),
            password: "short".to_string(),
            first_name: String::new(),
            last_name: "Liddell".to_string(),
        };

        let errors = input.into_registration().unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"email"));
        assert!(fields.contains(&"firstName"));
        assert!(fields.contains(&"username"));
        assert!(fields.contains(&"password"));
    }

    #[test]
    fn test_registration_rejects_weak_password() {
        let mut input = register_input();
        input.password = "onlyletters".to_string();
        let errors = input.into_registration().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "password");
    }

    #[test]
    fn test_login_credentials() {
        let login: LoginInput =
            serde_json::from_str(r#"{"email": "alice@example.com", "password": "pw"}"#).unwrap();
        assert_eq!(login.credentials().unwrap(), ("alice@example.com", "pw"));

        let missing: LoginInput = serde_json::from_str(r#"{"password": ""}"#).unwrap();
        assert_eq!(missing.credentials().unwrap_err().len(), 2);
    }

    #[test]
    fn test_login_credentials_skip_blank_username() {
        let login: LoginInput = serde_json::from_str(
            r#"{"username": "  ", "email": " alice@example.com ", "password": "pw"}"#,
        )
        .unwrap();
        assert_eq!(login.credentials().unwrap(), ("alice@example.com", "pw"));

        let both_blank: LoginInput =
            serde_json::from_str(r#"{"username": "", "email": "", "password": "pw"}"#).unwrap();
        let errors = both_blank.credentials().unwrap_err();
        assert_eq!(errors[0].field, "username");
    }

    #[test]
    fn test_profile_update() {
        let input: ProfileUpdateInput =
            serde_json::from_str(r#"{"firstName": " Al ", "email": "AL@EXAMPLE.COM"}"#).unwrap();
        let (update, password) = input.into_update().unwrap();
        assert_eq!(update.first_name.as_deref(), Some("Al"));
        assert_eq!(update.email.as_deref(), Some("al@example.com"));
        assert!(update.last_name.is_none());
        assert!(password.is_none());

        let weak: ProfileUpdateInput = serde_json::from_str(r#"{"password": "abc"}"#).unwrap();
        assert!(weak.into_update().is_err());
    }

    #[test]
    fn test_role_update_input() {
        let input = RoleUpdateInput {
            role: Some("admin".to_string()),
        };
        assert_eq!(input.into_role().unwrap(), UserRole::Admin);

        let missing = RoleUpdateInput::default().into_role().unwrap_err();
        assert_eq!(missing[0].message, "Role is required");

        let invalid = RoleUpdateInput {
            role: Some("root".to_string()),
        };
        assert!(invalid.into_role().is_err());
    }

    #[test]
    fn test_status_update_input() {
        let input: StatusUpdateInput = serde_json::from_str(r#"{"isActive": false}"#).unwrap();
        assert_eq!(input.into_update().unwrap().is_active, Some(false));

        let missing = StatusUpdateInput::default().into_update().unwrap_err();
        assert_eq!(missing[0].field, "isActive");

        assert!(serde_json::from_str::<StatusUpdateInput>(r#"{"isActive": "no"}"#).is_err());
    }

    #[test]
    fn test_user_query() {
        let query = UserQuery {
            role: Some("manager".to_string()),
            ..Default::default()
        };
        let (filter, page) = query.into_filter().unwrap();
        assert_eq!(filter.role, Some(UserRole::Manager));
        assert_eq!(page, Page::new(1, DEFAULT_USER_PAGE_SIZE));
    }

    #[test]
    fn test_profile_never_serializes_hash() {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            first_name: "Alice".to_string(),
            last_name: "Liddell".to_string(),
            role: UserRole::User,
            is_active: true,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(user.profile()).unwrap();
        assert!(json.get("password").is_none());
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["firstName"], "Alice");
        assert_eq!(json["role"], "user");
    }
}
