mod common;

use assert_matches::assert_matches;
use carbide_core::pagination::{OrderBy, PageInput, DEFAULT_LIMIT};
use carbide_core::status::{self, TOTAL_KEY};
use carbide_db::models::site::{ClearSite, SiteConfig, SiteFilter, SiteLocation, UpdateSite};
use carbide_db::models::tenant_site::CreateTenantSite;
use carbide_db::models::Relation;
use carbide_db::repositories::{SiteRepo, TenantSiteRepo};
use carbide_db::DbError;
use common::{fixture, new_site, seed_provider, seed_site, seed_tenant, user};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Create / get / update
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_site_create_with_json_columns(pool: PgPool) {
    let provider = seed_provider(&pool).await;
    let mut input = new_site("san-jose", provider.id);
    input.config = Some(SiteConfig {
        native_networking: true,
        ..Default::default()
    });
    input.location = Some(SiteLocation {
        city: "San Jose".to_string(),
        state: "CA".to_string(),
        country: "USA".to_string(),
    });

    let site = SiteRepo::create(&pool, &input).await.unwrap();
    assert_eq!(site.status, status::site::PENDING);
    assert!(site.config.as_ref().unwrap().native_networking);
    assert_eq!(site.location.as_ref().unwrap().city, "San Jose");
    assert!(site.contact.is_none());
    assert!(site.infrastructure_provider.is_none());

    let fetched = SiteRepo::get_by_id(&pool, site.id, &[Relation::InfrastructureProvider])
        .await
        .unwrap();
    assert_eq!(
        fetched.infrastructure_provider.as_ref().unwrap().id,
        provider.id
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_site_create_rejects_unknown_status(pool: PgPool) {
    let provider = seed_provider(&pool).await;
    let mut input = new_site("bad", provider.id);
    input.status = "Sleeping".to_string();

    let err = SiteRepo::create(&pool, &input).await.unwrap_err();
    assert_matches!(err, DbError::InvalidParams(msg) if msg.contains("Sleeping"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_site_update_keeps_unset_fields(pool: PgPool) {
    let provider = seed_provider(&pool).await;
    let site = seed_site(&pool, provider.id, "site").await;

    let update = UpdateSite {
        status: Some(status::site::REGISTERED.to_string()),
        site_agent_version: Some("1.2.3".to_string()),
        is_serial_console_enabled: Some(true),
        ..Default::default()
    };
    let updated = SiteRepo::update(&pool, site.id, &update).await.unwrap();
    assert_eq!(updated.status, status::site::REGISTERED);
    assert_eq!(updated.site_agent_version.as_deref(), Some("1.2.3"));
    assert!(updated.is_serial_console_enabled);
    assert_eq!(updated.name, "site");
    assert_eq!(updated.description, site.description);
}

// ---------------------------------------------------------------------------
// Clear
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_site_clear_sets_selected_columns_null(pool: PgPool) {
    let provider = seed_provider(&pool).await;
    let mut input = new_site("site", provider.id);
    input.site_controller_version = Some("9.9".to_string());
    input.location = Some(SiteLocation::default());
    let site = SiteRepo::create(&pool, &input).await.unwrap();

    let clear = ClearSite {
        description: true,
        location: true,
        ..Default::default()
    };
    let cleared = SiteRepo::clear(&pool, site.id, &clear).await.unwrap();
    assert!(cleared.description.is_none());
    assert!(cleared.location.is_none());
    assert_eq!(cleared.site_controller_version.as_deref(), Some("9.9"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_site_clear_without_flags_returns_row_unchanged(pool: PgPool) {
    let provider = seed_provider(&pool).await;
    let site = seed_site(&pool, provider.id, "site").await;

    let same = SiteRepo::clear(&pool, site.id, &ClearSite::default())
        .await
        .unwrap();
    assert_eq!(same.updated, site.updated);
    assert_eq!(same.description, site.description);
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_site_get_all_default_limit(pool: PgPool) {
    let provider = seed_provider(&pool).await;
    for i in 0..25 {
        seed_site(&pool, provider.id, &format!("site-{i:02}")).await;
    }

    let (rows, total) = SiteRepo::get_all(&pool, &SiteFilter::default(), &PageInput::default(), &[])
        .await
        .unwrap();
    assert_eq!(total, 25);
    assert_eq!(rows.len() as i64, DEFAULT_LIMIT);
    assert_eq!(rows[0].name, "site-00");

    let (rest, total) = SiteRepo::get_all(
        &pool,
        &SiteFilter::default(),
        &PageInput::default().offset(20),
        &[],
    )
    .await
    .unwrap();
    assert_eq!(total, 25);
    assert_eq!(rest.len(), 5);
    assert_eq!(rest[0].name, "site-20");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_site_get_all_order_by_name_desc(pool: PgPool) {
    let provider = seed_provider(&pool).await;
    for name in ["bravo", "alpha", "charlie"] {
        seed_site(&pool, provider.id, name).await;
    }

    let page = PageInput::default().order_by(OrderBy::desc("name"));
    let (rows, _) = SiteRepo::get_all(&pool, &SiteFilter::default(), &page, &[])
        .await
        .unwrap();
    let names: Vec<&str> = rows.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["charlie", "bravo", "alpha"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_site_get_all_rejects_unknown_order_field(pool: PgPool) {
    let page = PageInput::default().order_by(OrderBy::asc("registration_token"));
    let err = SiteRepo::get_all(&pool, &SiteFilter::default(), &page, &[])
        .await
        .unwrap_err();
    assert_matches!(err, DbError::InvalidParams(_));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_site_filter_by_tenant_association(pool: PgPool) {
    let fx = fixture(&pool).await;
    let unassociated = seed_site(&pool, fx.provider.id, "lonely").await;
    let outsider = seed_tenant(&pool, "outsider").await;

    TenantSiteRepo::create(
        &pool,
        &CreateTenantSite {
            tenant_id: fx.tenant.id,
            tenant_org: fx.tenant.org.clone(),
            site_id: fx.site.id,
            enable_serial_console: false,
            config: None,
            created_by: user(),
        },
    )
    .await
    .unwrap();

    let filter = SiteFilter {
        tenant_ids: Some(vec![fx.tenant.id]),
        ..Default::default()
    };
    let (rows, total) = SiteRepo::get_all(&pool, &filter, &PageInput::default(), &[])
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(rows[0].id, fx.site.id);
    assert_ne!(rows[0].id, unassociated.id);

    let filter = SiteFilter {
        tenant_ids: Some(vec![outsider.id]),
        ..Default::default()
    };
    let (_, total) = SiteRepo::get_all(&pool, &filter, &PageInput::default(), &[])
        .await
        .unwrap();
    assert_eq!(total, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_site_search(pool: PgPool) {
    let provider = seed_provider(&pool).await;
    let mut input = new_site("frankfurt", provider.id);
    input.description = Some("primary 100% GPU region".to_string());
    let target = SiteRepo::create(&pool, &input).await.unwrap();
    seed_site(&pool, provider.id, "dublin").await;

    for query in ["frankfurt", "Frank", "100%", "  gpu  "] {
        let filter = SiteFilter {
            search_query: Some(query.to_string()),
            ..Default::default()
        };
        let (rows, total) = SiteRepo::get_all(&pool, &filter, &PageInput::default(), &[])
            .await
            .unwrap();
        assert_eq!(total, 1, "query {query:?}");
        assert_eq!(rows[0].id, target.id);
    }

    let blank = SiteFilter {
        search_query: Some("   ".to_string()),
        ..Default::default()
    };
    let (_, total) = SiteRepo::get_all(&pool, &blank, &PageInput::default(), &[])
        .await
        .unwrap();
    assert_eq!(total, 2, "blank search matches everything");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_site_filter_by_status_and_serial_console(pool: PgPool) {
    let provider = seed_provider(&pool).await;
    let mut input = new_site("registered", provider.id);
    input.status = status::site::REGISTERED.to_string();
    input.is_serial_console_enabled = true;
    let registered = SiteRepo::create(&pool, &input).await.unwrap();
    seed_site(&pool, provider.id, "pending").await;

    let filter = SiteFilter {
        statuses: Some(vec![status::site::REGISTERED.to_string()]),
        is_serial_console_enabled: Some(true),
        ..Default::default()
    };
    let (rows, total) = SiteRepo::get_all(&pool, &filter, &PageInput::default(), &[])
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(rows[0].id, registered.id);
}

// ---------------------------------------------------------------------------
// Status counts / delete
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_site_count_by_status(pool: PgPool) {
    let provider = seed_provider(&pool).await;
    seed_site(&pool, provider.id, "a").await;
    seed_site(&pool, provider.id, "b").await;
    let mut input = new_site("c", provider.id);
    input.status = status::site::ERROR.to_string();
    SiteRepo::create(&pool, &input).await.unwrap();
    let deleted = seed_site(&pool, provider.id, "d").await;
    SiteRepo::delete_by_id(&pool, deleted.id).await.unwrap();

    let counts = SiteRepo::get_count_by_status(&pool, Some(provider.id))
        .await
        .unwrap();
    assert_eq!(counts[status::site::PENDING], 2);
    assert_eq!(counts[status::site::ERROR], 1);
    assert_eq!(counts[status::site::REGISTERED], 0);
    assert_eq!(counts[TOTAL_KEY], 3);

    let other = seed_provider(&pool).await;
    let empty = SiteRepo::get_count_by_status(&pool, Some(other.id))
        .await
        .unwrap();
    assert_eq!(empty[TOTAL_KEY], 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_site_delete_hides_from_reads(pool: PgPool) {
    let provider = seed_provider(&pool).await;
    let site = seed_site(&pool, provider.id, "doomed").await;

    SiteRepo::delete_by_id(&pool, site.id).await.unwrap();

    assert_matches!(
        SiteRepo::get_by_id(&pool, site.id, &[]).await,
        Err(DbError::DoesNotExist { entity: "Site", .. })
    );
    let (_, total) = SiteRepo::get_all(&pool, &SiteFilter::default(), &PageInput::default(), &[])
        .await
        .unwrap();
    assert_eq!(total, 0);
    assert_matches!(
        SiteRepo::update(&pool, site.id, &UpdateSite::default()).await,
        Err(DbError::DoesNotExist { .. })
    );
}
