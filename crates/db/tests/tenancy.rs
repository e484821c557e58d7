//! Integration tests for infrastructure providers, tenants, and tenant-site
//! associations.

mod common;

use assert_matches::assert_matches;
use carbide_core::pagination::PageInput;
use carbide_core::types::DbId;
use carbide_db::models::infrastructure_provider::UpdateInfrastructureProvider;
use carbide_db::models::tenant::{TenantConfig, UpdateTenant};
use carbide_db::models::tenant_site::{CreateTenantSite, TenantSiteFilter, UpdateTenantSite};
use carbide_db::models::Relation;
use carbide_db::repositories::{InfrastructureProviderRepo, TenantRepo, TenantSiteRepo};
use carbide_db::DbError;
use common::{fixture, new_provider, new_tenant, seed_site, seed_tenant, user};
use serde_json::json;
use sqlx::PgPool;

fn new_tenant_site(tenant_id: DbId, site_id: DbId) -> CreateTenantSite {
    CreateTenantSite {
        tenant_id,
        tenant_org: "tenant-org".to_string(),
        site_id,
        enable_serial_console: false,
        config: None,
        created_by: user(),
    }
}

// ---------------------------------------------------------------------------
// Infrastructure providers
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_provider_crud(pool: PgPool) {
    let created = InfrastructureProviderRepo::create(&pool, &new_provider("acme", "acme-org"))
        .await
        .unwrap();
    assert_eq!(created.name, "acme");
    assert_eq!(created.created_by, user());

    let fetched = InfrastructureProviderRepo::get_by_id(&pool, created.id)
        .await
        .unwrap();
    assert_eq!(fetched.org, "acme-org");

    let update = UpdateInfrastructureProvider {
        display_name: Some("Acme Corp".to_string()),
        ..Default::default()
    };
    let updated = InfrastructureProviderRepo::update(&pool, created.id, &update)
        .await
        .unwrap();
    assert_eq!(updated.display_name.as_deref(), Some("Acme Corp"));
    assert_eq!(updated.name, "acme", "unset fields are kept");
    assert!(updated.updated >= created.updated);

    InfrastructureProviderRepo::delete_by_id(&pool, created.id)
        .await
        .unwrap();
    let err = InfrastructureProviderRepo::get_by_id(&pool, created.id)
        .await
        .unwrap_err();
    assert_matches!(err, DbError::DoesNotExist { entity: "InfrastructureProvider", .. });
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_provider_get_all_by_org(pool: PgPool) {
    let first = InfrastructureProviderRepo::create(&pool, &new_provider("a", "org-1"))
        .await
        .unwrap();
    let second = InfrastructureProviderRepo::create(&pool, &new_provider("b", "org-1"))
        .await
        .unwrap();
    let deleted = InfrastructureProviderRepo::create(&pool, &new_provider("c", "org-1"))
        .await
        .unwrap();
    InfrastructureProviderRepo::create(&pool, &new_provider("d", "org-2"))
        .await
        .unwrap();
    InfrastructureProviderRepo::delete_by_id(&pool, deleted.id)
        .await
        .unwrap();

    let providers = InfrastructureProviderRepo::get_all_by_org(&pool, "org-1")
        .await
        .unwrap();
    let ids: Vec<DbId> = providers.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![first.id, second.id]);

    let none = InfrastructureProviderRepo::get_all_by_org(&pool, "missing")
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_provider_create_rejects_blank_name(pool: PgPool) {
    let err = InfrastructureProviderRepo::create(&pool, &new_provider("", "org"))
        .await
        .unwrap_err();
    assert_matches!(err, DbError::InvalidParams(_));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_provider_update_missing_is_not_found(pool: PgPool) {
    let err = InfrastructureProviderRepo::update(
        &pool,
        DbId::new_v4(),
        &UpdateInfrastructureProvider::default(),
    )
    .await
    .unwrap_err();
    assert_matches!(err, DbError::DoesNotExist { .. });
}

// ---------------------------------------------------------------------------
// Tenants
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_tenant_config_defaults_and_updates(pool: PgPool) {
    let tenant = TenantRepo::create(&pool, &new_tenant("t", "t-org"))
        .await
        .unwrap();
    assert_eq!(tenant.config.0, TenantConfig::default());

    let update = UpdateTenant {
        config: Some(TenantConfig {
            enable_ssh_access: true,
            targeted_instance_creation: false,
        }),
        ..Default::default()
    };
    let updated = TenantRepo::update(&pool, tenant.id, &update).await.unwrap();
    assert!(updated.config.enable_ssh_access);
    assert_eq!(updated.name, "t");

    let fetched = TenantRepo::get_by_id(&pool, tenant.id).await.unwrap();
    assert!(fetched.config.enable_ssh_access);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_tenant_soft_delete_is_idempotent(pool: PgPool) {
    let tenant = seed_tenant(&pool, "gone").await;

    TenantRepo::delete_by_id(&pool, tenant.id).await.unwrap();
    TenantRepo::delete_by_id(&pool, tenant.id).await.unwrap();

    assert_matches!(
        TenantRepo::get_by_id(&pool, tenant.id).await,
        Err(DbError::DoesNotExist { .. })
    );
    assert!(TenantRepo::get_all_by_org(&pool, "gone")
        .await
        .unwrap()
        .is_empty());

    // The row is still present, only marked deleted.
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tenant WHERE id = $1")
        .bind(tenant.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

// ---------------------------------------------------------------------------
// Tenant-site associations
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_tenant_site_create_and_lookup(pool: PgPool) {
    let fx = fixture(&pool).await;
    let ts = TenantSiteRepo::create(&pool, &new_tenant_site(fx.tenant.id, fx.site.id))
        .await
        .unwrap();
    assert_eq!(ts.config, json!({}));

    let found = TenantSiteRepo::get_by_tenant_id_and_site_id(
        &pool,
        fx.tenant.id,
        fx.site.id,
        &[Relation::Tenant, Relation::Site],
    )
    .await
    .unwrap();
    assert_eq!(found.id, ts.id);
    assert_eq!(found.tenant.as_ref().unwrap().id, fx.tenant.id);
    assert_eq!(found.site.as_ref().unwrap().id, fx.site.id);

    let err = TenantSiteRepo::get_by_tenant_id_and_site_id(&pool, fx.tenant.id, DbId::new_v4(), &[])
        .await
        .unwrap_err();
    assert_matches!(err, DbError::DoesNotExist { .. });
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_tenant_site_rejects_blank_org(pool: PgPool) {
    let fx = fixture(&pool).await;
    let mut input = new_tenant_site(fx.tenant.id, fx.site.id);
    input.tenant_org = "  ".to_string();

    let err = TenantSiteRepo::create(&pool, &input).await.unwrap_err();
    assert_matches!(err, DbError::InvalidParams(_));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_tenant_site_duplicate_is_unique_violation(pool: PgPool) {
    let fx = fixture(&pool).await;
    let input = new_tenant_site(fx.tenant.id, fx.site.id);
    let first = TenantSiteRepo::create(&pool, &input).await.unwrap();

    let err = TenantSiteRepo::create(&pool, &input).await.unwrap_err();
    assert!(err.is_unique_violation(), "expected unique violation, got {err:?}");

    // A deleted association frees the pair.
    TenantSiteRepo::delete_by_id(&pool, first.id).await.unwrap();
    TenantSiteRepo::create(&pool, &input).await.unwrap();
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_tenant_site_unknown_site_is_foreign_key_violation(pool: PgPool) {
    let fx = fixture(&pool).await;
    let err = TenantSiteRepo::create(&pool, &new_tenant_site(fx.tenant.id, DbId::new_v4()))
        .await
        .unwrap_err();
    assert!(err.is_foreign_key_violation(), "got {err:?}");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_tenant_site_filter_by_config(pool: PgPool) {
    let fx = fixture(&pool).await;
    let other_site = seed_site(&pool, fx.provider.id, "site-2").await;

    let mut tagged = new_tenant_site(fx.tenant.id, fx.site.id);
    tagged.config = Some(json!({ "rack": "r1" }));
    let tagged = TenantSiteRepo::create(&pool, &tagged).await.unwrap();
    TenantSiteRepo::create(&pool, &new_tenant_site(fx.tenant.id, other_site.id))
        .await
        .unwrap();

    let filter = TenantSiteFilter {
        config_key: Some("rack".to_string()),
        config_value: Some("r1".to_string()),
        ..Default::default()
    };
    let (rows, total) = TenantSiteRepo::get_all(&pool, &filter, &PageInput::default(), &[])
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(rows[0].id, tagged.id);

    let half = TenantSiteFilter {
        config_key: Some("rack".to_string()),
        ..Default::default()
    };
    let err = TenantSiteRepo::get_all(&pool, &half, &PageInput::default(), &[])
        .await
        .unwrap_err();
    assert_matches!(err, DbError::InvalidParams(_));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_tenant_site_filter_by_org_and_site(pool: PgPool) {
    let fx = fixture(&pool).await;
    let other_tenant = seed_tenant(&pool, "other-org").await;

    TenantSiteRepo::create(&pool, &new_tenant_site(fx.tenant.id, fx.site.id))
        .await
        .unwrap();
    let mut other = new_tenant_site(other_tenant.id, fx.site.id);
    other.tenant_org = "other-org".to_string();
    TenantSiteRepo::create(&pool, &other).await.unwrap();

    let by_site = TenantSiteFilter {
        site_ids: Some(vec![fx.site.id]),
        ..Default::default()
    };
    let (_, total) = TenantSiteRepo::get_all(&pool, &by_site, &PageInput::default(), &[])
        .await
        .unwrap();
    assert_eq!(total, 2);

    let by_org = TenantSiteFilter {
        tenant_orgs: Some(vec!["other-org".to_string()]),
        ..Default::default()
    };
    let (rows, total) = TenantSiteRepo::get_all(&pool, &by_org, &PageInput::default(), &[])
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(rows[0].tenant_id, other_tenant.id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_tenant_site_update(pool: PgPool) {
    let fx = fixture(&pool).await;
    let ts = TenantSiteRepo::create(&pool, &new_tenant_site(fx.tenant.id, fx.site.id))
        .await
        .unwrap();

    let update = UpdateTenantSite {
        enable_serial_console: Some(true),
        config: None,
    };
    let updated = TenantSiteRepo::update(&pool, ts.id, &update).await.unwrap();
    assert!(updated.enable_serial_console);
    assert_eq!(updated.config, json!({}));

    TenantSiteRepo::delete_by_id(&pool, ts.id).await.unwrap();
    let err = TenantSiteRepo::update(&pool, ts.id, &update).await.unwrap_err();
    assert_matches!(err, DbError::DoesNotExist { .. });
}
