use std::time::Duration;

use sqlx::postgres::PgPoolOptions;

use crate::tx::DEFAULT_LOCK_TIMEOUT_SECS;
use crate::{DbError, DbPool};

/// Database configuration loaded from environment variables.
///
/// A `.env` file in the working directory is honoured when present.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub database_url: String,
    /// Pool size (default: `20`).
    pub max_connections: u32,
    /// Seconds to wait for a pooled connection (default: `30`).
    pub acquire_timeout_secs: u64,
    /// `lock_timeout` applied to transactions opened via [`crate::tx::begin`] (default: `300`).
    pub lock_timeout_secs: u64,
}

impl DbConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default     |
    /// |---------------------------|-------------|
    /// | `DATABASE_URL`            | (required)  |
    /// | `DB_MAX_CONNECTIONS`      | `20`        |
    /// | `DB_ACQUIRE_TIMEOUT_SECS` | `30`        |
    /// | `DB_LOCK_TIMEOUT_SECS`    | `300`       |
    pub fn from_env() -> Result<Self, DbError> {
        dotenvy::dotenv().ok();

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| DbError::Config("DATABASE_URL must be set".into()))?;

        Ok(Self {
            database_url,
            max_connections: env_or("DB_MAX_CONNECTIONS", 20)?,
            acquire_timeout_secs: env_or("DB_ACQUIRE_TIMEOUT_SECS", 30)?,
            lock_timeout_secs: env_or("DB_LOCK_TIMEOUT_SECS", DEFAULT_LOCK_TIMEOUT_SECS)?,
        })
    }

    /// Open a connection pool using this configuration.
    pub async fn connect(&self) -> Result<DbPool, DbError> {
        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(Duration::from_secs(self.acquire_timeout_secs))
            .connect(&self.database_url)
            .await?;
        tracing::debug!(max_connections = self.max_connections, "database pool ready");
        Ok(pool)
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, DbError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| DbError::Config(format!("{key} must be a valid number, got '{raw}'"))),
        Err(_) => Ok(default),
    }
}
