//! Embedded schema migrations
//!
//! The SQL files live in the workspace-level `migrations/` directory and are
//! compiled into the binary with `sqlx::migrate!`, so a deployed server needs
//! no migration files on disk.

use sqlx::postgres::PgPool;
use tracing::{info, warn};

fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("../migrations")
}

/// Applies every pending migration
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!("Starting database migrations");

    match migrator().run(pool).await {
        Ok(()) => {
            info!("All database migrations completed successfully");
            Ok(())
        }
        Err(e) => {
            warn!("Migration failed: {}", e);
            Err(e)
        }
    }
}
