//! PostgreSQL repositories
//!
//! Static statements use `sqlx::query_as` with raw strings; list filters and
//! partial updates are assembled with `sqlx::QueryBuilder` so every value is
//! still bound, never interpolated.

mod projects;
mod refresh_tokens;
mod tasks;
mod users;

pub use projects::PgProjectRepository;
pub use refresh_tokens::PgRefreshTokenRepository;
pub use tasks::PgTaskRepository;
pub use users::PgUserRepository;

use super::StoreError;

/// Maps unique-index names to the client-facing field they guard
const UNIQUE_FIELDS: &[(&str, &str)] = &[
    ("users_username_key", "username"),
    ("users_email_key", "email"),
];

/// Converts unique violations on known indexes into `StoreError::Duplicate`
fn map_unique_violation(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let field = db_err.constraint().and_then(|constraint| {
                UNIQUE_FIELDS
                    .iter()
                    .find(|(name, _)| *name == constraint)
                    .map(|(_, field)| *field)
            });
            if let Some(field) = field {
                return StoreError::Duplicate { field };
            }
        }
    }
    StoreError::Database(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_database_errors_pass_through() {
        let err = map_unique_violation(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Database(sqlx::Error::RowNotFound)));
    }
}
