//! Transaction helpers: lock timeouts and transaction-scoped advisory locks.
//!
//! Repository methods accept any [`sqlx::Acquire`] implementor, so several
//! calls can share one transaction:
//!
//! ```ignore
//! let mut tx = carbide_db::tx::begin(&pool, DEFAULT_LOCK_TIMEOUT_SECS).await?;
//! let lock_id = advisory_lock_id(&site_id.to_string());
//! try_acquire_advisory_lock(&mut *tx, lock_id, &LockRetryOptions::default()).await?;
//! let vpc = VpcRepo::create(&mut *tx, &input).await?;
//! tx.commit().await?;
//! ```

use std::time::Duration;

use rand::Rng;
use sha2::{Digest, Sha256};
use sqlx::{PgConnection, PgPool, Postgres, Transaction};

use crate::DbError;

/// `lock_timeout` applied to every transaction opened with [`begin`].
pub const DEFAULT_LOCK_TIMEOUT_SECS: u64 = 300;

const DEFAULT_RETRIES: u32 = 3;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(300);
const DEFAULT_RETRY_MAX_JITTER: Duration = Duration::from_millis(100);

/// Retry policy for [`try_acquire_advisory_lock`].
#[derive(Debug, Clone)]
pub struct LockRetryOptions {
    /// Total attempts, including the first.
    pub retries: u32,
    /// Base delay, doubled after every failed attempt.
    pub delay: Duration,
    /// Upper bound of the random delay added to each wait.
    pub max_jitter: Duration,
}

impl Default for LockRetryOptions {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            delay: DEFAULT_RETRY_DELAY,
            max_jitter: DEFAULT_RETRY_MAX_JITTER,
        }
    }
}

/// Begin a transaction with `SET LOCAL lock_timeout` applied.
pub async fn begin(
    pool: &PgPool,
    lock_timeout_secs: u64,
) -> Result<Transaction<'static, Postgres>, DbError> {
    let mut tx = pool.begin().await?;
    sqlx::query(&format!("SET LOCAL lock_timeout = '{lock_timeout_secs}s'"))
        .execute(&mut *tx)
        .await?;
    Ok(tx)
}

/// Derive a stable, non-negative advisory lock ID from an arbitrary key.
pub fn advisory_lock_id(key: &str) -> i64 {
    let digest = Sha256::digest(key.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(prefix) & 0x7fff_ffff_ffff_ffff) as i64
}

/// Take a transaction-scoped advisory lock.
///
/// Blocking mode waits (bounded by `lock_timeout`); non-blocking mode fails
/// immediately with [`DbError::AdvisoryLockNotAcquired`] if the lock is held.
/// The lock is released when the surrounding transaction ends.
pub async fn acquire_advisory_lock(
    conn: &mut PgConnection,
    lock_id: i64,
    blocking: bool,
) -> Result<(), DbError> {
    if blocking {
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(lock_id)
            .execute(&mut *conn)
            .await?;
        return Ok(());
    }

    let acquired: bool = sqlx::query_scalar("SELECT pg_try_advisory_xact_lock($1)")
        .bind(lock_id)
        .fetch_one(&mut *conn)
        .await?;
    if acquired {
        Ok(())
    } else {
        Err(DbError::AdvisoryLockNotAcquired(lock_id))
    }
}

/// Non-blocking lock attempts with exponential backoff and random jitter.
pub async fn try_acquire_advisory_lock(
    conn: &mut PgConnection,
    lock_id: i64,
    options: &LockRetryOptions,
) -> Result<(), DbError> {
    let attempts = options.retries.max(1);
    let mut delay = options.delay;

    for attempt in 1..=attempts {
        match acquire_advisory_lock(conn, lock_id, false).await {
            Err(DbError::AdvisoryLockNotAcquired(_)) if attempt < attempts => {
                let wait = delay + jitter(options.max_jitter);
                tracing::warn!(lock_id, attempt, ?wait, "advisory lock busy, retrying");
                tokio::time::sleep(wait).await;
                delay *= 2;
            }
            result => return result,
        }
    }

    Err(DbError::AdvisoryLockNotAcquired(lock_id))
}

fn jitter(max: Duration) -> Duration {
    let max_ms = max.as_millis() as u64;
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::rng().random_range(0..=max_ms))
}
