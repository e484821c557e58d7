//! Integration tests for transaction helpers and advisory locks.

mod common;

use std::time::Duration;

use assert_matches::assert_matches;
use carbide_db::repositories::{SiteRepo, TenantRepo};
use carbide_db::tx::{
    self, acquire_advisory_lock, advisory_lock_id, try_acquire_advisory_lock, LockRetryOptions,
};
use carbide_db::DbError;
use common::{new_site, new_tenant, seed_provider};
use sqlx::PgPool;

fn fast_retries() -> LockRetryOptions {
    LockRetryOptions {
        retries: 2,
        delay: Duration::from_millis(10),
        max_jitter: Duration::from_millis(5),
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_begin_applies_lock_timeout(pool: PgPool) {
    let mut tx = tx::begin(&pool, 7).await.unwrap();
    let (timeout,): (String,) = sqlx::query_as("SHOW lock_timeout")
        .fetch_one(&mut *tx)
        .await
        .unwrap();
    assert_eq!(timeout, "7s");
    tx.rollback().await.unwrap();
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_repositories_share_a_transaction(pool: PgPool) {
    let provider = seed_provider(&pool).await;

    let mut tx = tx::begin(&pool, tx::DEFAULT_LOCK_TIMEOUT_SECS).await.unwrap();
    let tenant = TenantRepo::create(&mut *tx, &new_tenant("t", "tx-org"))
        .await
        .unwrap();
    let site = SiteRepo::create(&mut *tx, &new_site("tx-site", provider.id))
        .await
        .unwrap();
    // Visible inside the transaction.
    SiteRepo::get_by_id(&mut *tx, site.id, &[]).await.unwrap();
    tx.rollback().await.unwrap();

    assert_matches!(
        TenantRepo::get_by_id(&pool, tenant.id).await,
        Err(DbError::DoesNotExist { .. })
    );
    assert_matches!(
        SiteRepo::get_by_id(&pool, site.id, &[]).await,
        Err(DbError::DoesNotExist { .. })
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_advisory_lock_is_exclusive_until_commit(pool: PgPool) {
    let lock_id = advisory_lock_id("site-42");

    let mut holder = tx::begin(&pool, 5).await.unwrap();
    acquire_advisory_lock(&mut *holder, lock_id, true).await.unwrap();

    let mut contender = tx::begin(&pool, 5).await.unwrap();
    let err = acquire_advisory_lock(&mut *contender, lock_id, false)
        .await
        .unwrap_err();
    assert_matches!(err, DbError::AdvisoryLockNotAcquired(id) if id == lock_id);

    let err = try_acquire_advisory_lock(&mut *contender, lock_id, &fast_retries())
        .await
        .unwrap_err();
    assert_matches!(err, DbError::AdvisoryLockNotAcquired(_));

    holder.commit().await.unwrap();
    try_acquire_advisory_lock(&mut *contender, lock_id, &fast_retries())
        .await
        .unwrap();
    contender.commit().await.unwrap();
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_different_keys_do_not_contend(pool: PgPool) {
    let mut a = tx::begin(&pool, 5).await.unwrap();
    let mut b = tx::begin(&pool, 5).await.unwrap();

    acquire_advisory_lock(&mut *a, advisory_lock_id("vpc-a"), false)
        .await
        .unwrap();
    acquire_advisory_lock(&mut *b, advisory_lock_id("vpc-b"), false)
        .await
        .unwrap();

    a.rollback().await.unwrap();
    b.rollback().await.unwrap();
}
