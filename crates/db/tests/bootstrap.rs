use sqlx::PgPool;

/// Full bootstrap test: connect, migrate, verify schema.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_full_bootstrap(pool: PgPool) {
    carbide_db::health_check(&pool).await.unwrap();

    let tables = [
        "infrastructure_provider",
        "tenant",
        "site",
        "tenant_site",
        "vpc",
        "ip_block",
        "instance_type",
        "allocation",
        "allocation_constraint",
        "infiniband_partition",
        "operating_system",
        "operating_system_site_association",
        "expected_machine",
    ];

    for table in tables {
        let count: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&pool)
            .await
            .unwrap_or_else(|e| panic!("{table} query failed: {e}"));
        assert_eq!(count.0, 0, "{table} should start empty");
    }
}

/// Running the embedded migrator again on a migrated database is a no-op.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_run_migrations_is_idempotent(pool: PgPool) {
    carbide_db::run_migrations(&pool).await.unwrap();
    carbide_db::run_migrations(&pool).await.unwrap();
}
