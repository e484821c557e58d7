//! Data-access layer for the carbide control plane: PostgreSQL models,
//! repositories, and transaction helpers.

use sqlx::migrate::Migrator;

pub mod config;
pub mod error;
pub mod models;
pub mod repositories;
pub mod tx;

pub use error::DbError;

pub type DbPool = sqlx::PgPool;

/// Schema migrations shipped with this crate.
pub static MIGRATOR: Migrator = sqlx::migrate!("../../db/migrations");

/// Verify the database answers a trivial query.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply any pending migrations.
pub async fn run_migrations(pool: &DbPool) -> Result<(), DbError> {
    MIGRATOR.run(pool).await?;
    tracing::info!("database migrations applied");
    Ok(())
}
