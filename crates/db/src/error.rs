//! Error type returned by every repository method.

use std::fmt::Display;

use carbide_core::error::CoreError;

/// PostgreSQL SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

/// PostgreSQL SQLSTATE for `foreign_key_violation`.
const FOREIGN_KEY_VIOLATION: &str = "23503";

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("{entity} with id {id} does not exist")]
    DoesNotExist { entity: &'static str, id: String },

    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    #[error("failed to acquire advisory lock {0}")]
    AdvisoryLockNotAcquired(i64),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl DbError {
    pub fn not_found(entity: &'static str, id: impl Display) -> Self {
        DbError::DoesNotExist {
            entity,
            id: id.to_string(),
        }
    }

    /// True when the underlying database error is a unique constraint violation.
    pub fn is_unique_violation(&self) -> bool {
        self.has_sqlstate(UNIQUE_VIOLATION)
    }

    /// True when the underlying database error is a foreign key violation.
    pub fn is_foreign_key_violation(&self) -> bool {
        self.has_sqlstate(FOREIGN_KEY_VIOLATION)
    }

    fn has_sqlstate(&self, code: &str) -> bool {
        match self {
            DbError::Database(sqlx::Error::Database(db_err)) => {
                db_err.code().as_deref() == Some(code)
            }
            _ => false,
        }
    }
}

impl From<CoreError> for DbError {
    fn from(err: CoreError) -> Self {
        DbError::InvalidParams(err.to_string())
    }
}

impl From<validator::ValidationErrors> for DbError {
    fn from(err: validator::ValidationErrors) -> Self {
        DbError::InvalidParams(err.to_string())
    }
}
