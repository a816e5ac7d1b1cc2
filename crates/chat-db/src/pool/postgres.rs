//! PostgreSQL connection pool and schema migrations

use chat_common::DatabaseConfig;
use sqlx::migrate::{MigrateError, Migrator};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// SQL migrations in the source tree. Deployed binaries point
/// `DATABASE_MIGRATIONS_DIR` at their own copy instead.
pub const MIGRATIONS_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/migrations");

/// Where `run_migrations` should read from for this configuration
pub fn migrations_dir(config: &DatabaseConfig) -> PathBuf {
    config
        .migrations_dir
        .as_deref()
        .map_or_else(|| PathBuf::from(MIGRATIONS_DIR), PathBuf::from)
}

pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(300))
        .max_lifetime(Duration::from_secs(1800))
        .connect(&config.url)
        .await
}

/// Apply pending migrations. Concurrent callers serialize on the migrator's
/// advisory lock.
pub async fn run_migrations(pool: &PgPool, dir: &Path) -> Result<(), MigrateError> {
    let migrator = Migrator::new(dir).await?;
    migrator.run(pool).await?;
    info!(
        migrations = migrator.iter().count(),
        dir = %dir.display(),
        "database schema is up to date"
    );
    Ok(())
}
