//! Integration tests for instance types, allocations, and allocation constraints.

mod common;

use assert_matches::assert_matches;
use carbide_core::pagination::{OrderBy, PageInput};
use carbide_core::status;
use carbide_core::types::DbId;
use carbide_db::models::allocation::{AllocationFilter, ClearAllocation, CreateAllocation, UpdateAllocation};
use carbide_db::models::allocation_constraint::{
    AllocationConstraintFilter, ClearAllocationConstraint, CreateAllocationConstraint,
    UpdateAllocationConstraint,
};
use carbide_db::models::instance_type::{
    ClearInstanceType, CreateInstanceType, InstanceTypeFilter, UpdateInstanceType,
};
use carbide_db::models::Relation;
use carbide_db::repositories::{AllocationConstraintRepo, AllocationRepo, InstanceTypeRepo};
use carbide_db::DbError;
use common::{fixture, seed_site, user, Fixture};
use sqlx::PgPool;

fn new_instance_type(fx: &Fixture, name: &str) -> CreateInstanceType {
    CreateInstanceType {
        name: name.to_string(),
        display_name: None,
        description: Some("8x GPU".to_string()),
        controller_machine_type: Some("x86_64".to_string()),
        infrastructure_provider_id: fx.provider.id,
        site_id: Some(fx.site.id),
        labels: None,
        status: status::instance_type::READY.to_string(),
        created_by: user(),
    }
}

fn new_allocation(fx: &Fixture, name: &str) -> CreateAllocation {
    CreateAllocation {
        name: name.to_string(),
        description: None,
        infrastructure_provider_id: fx.provider.id,
        tenant_id: fx.tenant.id,
        site_id: fx.site.id,
        status: status::allocation::PENDING.to_string(),
        created_by: user(),
    }
}

fn new_constraint(allocation_id: DbId, resource_type_id: DbId, value: i32) -> CreateAllocationConstraint {
    CreateAllocationConstraint {
        allocation_id,
        resource_type: status::allocation_constraint::RESOURCE_INSTANCE_TYPE.to_string(),
        resource_type_id,
        constraint_type: status::allocation_constraint::RESERVED.to_string(),
        constraint_value: value,
        derived_resource_id: None,
        created_by: user(),
    }
}

// ---------------------------------------------------------------------------
// Instance type
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_instance_type_crud(pool: PgPool) {
    let fx = fixture(&pool).await;
    let it = InstanceTypeRepo::create(&pool, &new_instance_type(&fx, "dgx"))
        .await
        .unwrap();

    let fetched = InstanceTypeRepo::get_by_id(&pool, it.id, &[Relation::Site, Relation::InfrastructureProvider])
        .await
        .unwrap();
    assert_eq!(fetched.site.unwrap().id, fx.site.id);
    assert_eq!(fetched.infrastructure_provider.unwrap().id, fx.provider.id);

    let updated = InstanceTypeRepo::update(
        &pool,
        it.id,
        &UpdateInstanceType {
            display_name: Some("DGX H100".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(updated.display_name.as_deref(), Some("DGX H100"));

    let cleared = InstanceTypeRepo::clear(
        &pool,
        it.id,
        &ClearInstanceType {
            site_id: true,
            controller_machine_type: true,
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert!(cleared.site_id.is_none());
    assert!(cleared.controller_machine_type.is_none());
    assert_eq!(cleared.display_name.as_deref(), Some("DGX H100"));

    let without_site = InstanceTypeRepo::get_by_id(&pool, it.id, &[Relation::Site])
        .await
        .unwrap();
    assert!(without_site.site.is_none());

    InstanceTypeRepo::delete_by_id(&pool, it.id).await.unwrap();
    assert_matches!(
        InstanceTypeRepo::get_by_id(&pool, it.id, &[]).await,
        Err(DbError::DoesNotExist { entity: "InstanceType", .. })
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_instance_type_filter_by_names_and_site(pool: PgPool) {
    let fx = fixture(&pool).await;
    let other_site = seed_site(&pool, fx.provider.id, "site-2").await;

    InstanceTypeRepo::create(&pool, &new_instance_type(&fx, "small"))
        .await
        .unwrap();
    let mut large = new_instance_type(&fx, "large");
    large.site_id = Some(other_site.id);
    let large = InstanceTypeRepo::create(&pool, &large).await.unwrap();

    let filter = InstanceTypeFilter {
        names: Some(vec!["small".to_string(), "large".to_string()]),
        site_ids: Some(vec![other_site.id]),
        ..Default::default()
    };
    let (rows, total) = InstanceTypeRepo::get_all(&pool, &filter, &PageInput::default(), &[])
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(rows[0].id, large.id);
}

// ---------------------------------------------------------------------------
// Allocation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_allocation_crud(pool: PgPool) {
    let fx = fixture(&pool).await;
    let mut input = new_allocation(&fx, "alloc");
    input.description = Some("for training".to_string());
    let allocation = AllocationRepo::create(&pool, &input).await.unwrap();

    let fetched = AllocationRepo::get_by_id(
        &pool,
        allocation.id,
        &[Relation::Tenant, Relation::Site, Relation::InfrastructureProvider],
    )
    .await
    .unwrap();
    assert_eq!(fetched.tenant.unwrap().id, fx.tenant.id);
    assert_eq!(fetched.site.unwrap().id, fx.site.id);
    assert!(fetched.infrastructure_provider.is_some());

    let updated = AllocationRepo::update(
        &pool,
        allocation.id,
        &UpdateAllocation {
            status: Some(status::allocation::REGISTERED.to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(updated.status, status::allocation::REGISTERED);
    assert_eq!(updated.description.as_deref(), Some("for training"));

    let cleared = AllocationRepo::clear(&pool, allocation.id, &ClearAllocation { description: true })
        .await
        .unwrap();
    assert!(cleared.description.is_none());

    assert_matches!(
        AllocationRepo::update(
            &pool,
            allocation.id,
            &UpdateAllocation {
                status: Some("Done".to_string()),
                ..Default::default()
            },
        )
        .await,
        Err(DbError::InvalidParams(_))
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_allocation_constraint_filter_and_count(pool: PgPool) {
    let fx = fixture(&pool).await;
    let it = InstanceTypeRepo::create(&pool, &new_instance_type(&fx, "dgx"))
        .await
        .unwrap();

    let constrained = AllocationRepo::create(&pool, &new_allocation(&fx, "constrained"))
        .await
        .unwrap();
    AllocationRepo::create(&pool, &new_allocation(&fx, "free"))
        .await
        .unwrap();
    AllocationConstraintRepo::create(&pool, &new_constraint(constrained.id, it.id, 4))
        .await
        .unwrap();

    let filter = AllocationFilter {
        resource_type_ids: Some(vec![it.id]),
        constraint_values: Some(vec![4]),
        ..Default::default()
    };
    let (rows, total) = AllocationRepo::get_all(&pool, &filter, &PageInput::default(), &[])
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(rows[0].id, constrained.id);
    assert_eq!(AllocationRepo::get_count(&pool, &filter).await.unwrap(), 1);

    let all = AllocationFilter {
        tenant_ids: Some(vec![fx.tenant.id]),
        ..Default::default()
    };
    assert_eq!(AllocationRepo::get_count(&pool, &all).await.unwrap(), 2);

    let mismatched = AllocationFilter {
        constraint_values: Some(vec![5]),
        ..Default::default()
    };
    assert_eq!(AllocationRepo::get_count(&pool, &mismatched).await.unwrap(), 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_allocation_order_by_constraint_value(pool: PgPool) {
    let fx = fixture(&pool).await;
    let it = InstanceTypeRepo::create(&pool, &new_instance_type(&fx, "dgx"))
        .await
        .unwrap();

    let mut ids = Vec::new();
    for (name, value) in [("ten", 10), ("two", 2), ("six", 6)] {
        let allocation = AllocationRepo::create(&pool, &new_allocation(&fx, name))
            .await
            .unwrap();
        AllocationConstraintRepo::create(&pool, &new_constraint(allocation.id, it.id, value))
            .await
            .unwrap();
        ids.push(allocation.id);
    }

    let page = PageInput::default().order_by(OrderBy::desc("constraint_value"));
    let (rows, _) = AllocationRepo::get_all(&pool, &AllocationFilter::default(), &page, &[])
        .await
        .unwrap();
    let names: Vec<&str> = rows.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["ten", "six", "two"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_allocation_order_by_site_name(pool: PgPool) {
    let fx = fixture(&pool).await;
    let zulu = seed_site(&pool, fx.provider.id, "zulu").await;
    let alpha = seed_site(&pool, fx.provider.id, "alpha").await;

    let mut first = new_allocation(&fx, "on-zulu");
    first.site_id = zulu.id;
    AllocationRepo::create(&pool, &first).await.unwrap();
    let mut second = new_allocation(&fx, "on-alpha");
    second.site_id = alpha.id;
    AllocationRepo::create(&pool, &second).await.unwrap();

    let page = PageInput::default().order_by(OrderBy::asc("site_name"));
    let filter = AllocationFilter {
        site_ids: Some(vec![zulu.id, alpha.id]),
        ..Default::default()
    };
    let (rows, _) = AllocationRepo::get_all(&pool, &filter, &page, &[])
        .await
        .unwrap();
    let names: Vec<&str> = rows.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["on-alpha", "on-zulu"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_allocation_search(pool: PgPool) {
    let fx = fixture(&pool).await;
    let mut input = new_allocation(&fx, "Test Allocation");
    input.description = Some("burst capacity".to_string());
    let target = AllocationRepo::create(&pool, &input).await.unwrap();
    AllocationRepo::create(&pool, &new_allocation(&fx, "unrelated"))
        .await
        .unwrap();

    let filter = AllocationFilter {
        search_query: Some("burst".to_string()),
        ..Default::default()
    };
    let (rows, total) = AllocationRepo::get_all(&pool, &filter, &PageInput::default(), &[])
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(rows[0].id, target.id);
}

// ---------------------------------------------------------------------------
// Allocation constraint
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_constraint_crud(pool: PgPool) {
    let fx = fixture(&pool).await;
    let allocation = AllocationRepo::create(&pool, &new_allocation(&fx, "alloc"))
        .await
        .unwrap();
    let mut input = new_constraint(allocation.id, DbId::new_v4(), 3);
    input.derived_resource_id = Some(DbId::new_v4());
    let constraint = AllocationConstraintRepo::create(&pool, &input).await.unwrap();

    let fetched = AllocationConstraintRepo::get_by_id(&pool, constraint.id, &[Relation::Allocation])
        .await
        .unwrap();
    assert_eq!(fetched.allocation.unwrap().id, allocation.id);

    let updated = AllocationConstraintRepo::update(
        &pool,
        constraint.id,
        &UpdateAllocationConstraint {
            constraint_value: Some(8),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(updated.constraint_value, 8);
    assert_eq!(updated.resource_type, status::allocation_constraint::RESOURCE_INSTANCE_TYPE);

    let cleared = AllocationConstraintRepo::clear(
        &pool,
        constraint.id,
        &ClearAllocationConstraint {
            derived_resource_id: true,
        },
    )
    .await
    .unwrap();
    assert!(cleared.derived_resource_id.is_none());

    AllocationConstraintRepo::delete_by_id(&pool, constraint.id)
        .await
        .unwrap();
    assert_matches!(
        AllocationConstraintRepo::get_by_id(&pool, constraint.id, &[]).await,
        Err(DbError::DoesNotExist { entity: "AllocationConstraint", .. })
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_constraint_rejects_unknown_types(pool: PgPool) {
    let fx = fixture(&pool).await;
    let allocation = AllocationRepo::create(&pool, &new_allocation(&fx, "alloc"))
        .await
        .unwrap();

    let mut bad_resource = new_constraint(allocation.id, DbId::new_v4(), 1);
    bad_resource.resource_type = "Machine".to_string();
    assert_matches!(
        AllocationConstraintRepo::create(&pool, &bad_resource).await,
        Err(DbError::InvalidParams(_))
    );

    let mut bad_constraint = new_constraint(allocation.id, DbId::new_v4(), 1);
    bad_constraint.constraint_type = "Spot".to_string();
    assert_matches!(
        AllocationConstraintRepo::create(&pool, &bad_constraint).await,
        Err(DbError::InvalidParams(_))
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_constraint_filter_and_order(pool: PgPool) {
    let fx = fixture(&pool).await;
    let allocation = AllocationRepo::create(&pool, &new_allocation(&fx, "alloc"))
        .await
        .unwrap();
    let other = AllocationRepo::create(&pool, &new_allocation(&fx, "other"))
        .await
        .unwrap();

    let mut ip = new_constraint(allocation.id, DbId::new_v4(), 1);
    ip.resource_type = status::allocation_constraint::RESOURCE_IP_BLOCK.to_string();
    AllocationConstraintRepo::create(&pool, &ip).await.unwrap();
    AllocationConstraintRepo::create(&pool, &new_constraint(allocation.id, DbId::new_v4(), 2))
        .await
        .unwrap();
    AllocationConstraintRepo::create(&pool, &new_constraint(other.id, DbId::new_v4(), 3))
        .await
        .unwrap();

    let filter = AllocationConstraintFilter {
        allocation_ids: Some(vec![allocation.id]),
        ..Default::default()
    };
    let page = PageInput::default().order_by(OrderBy::asc("resource_type"));
    let (rows, total) = AllocationConstraintRepo::get_all(&pool, &filter, &page, &[])
        .await
        .unwrap();
    assert_eq!(total, 2);
    assert!(rows.iter().all(|c| c.allocation_id == allocation.id));
    assert_ne!(rows[0].resource_type, rows[1].resource_type);

    let by_type = AllocationConstraintFilter {
        resource_type: Some(status::allocation_constraint::RESOURCE_IP_BLOCK.to_string()),
        ..Default::default()
    };
    let (_, total) = AllocationConstraintRepo::get_all(&pool, &by_type, &PageInput::default(), &[])
        .await
        .unwrap();
    assert_eq!(total, 1);

    let bad_order = PageInput::default().order_by(OrderBy::asc("constraint_value"));
    assert_matches!(
        AllocationConstraintRepo::get_all(&pool, &filter, &bad_order, &[]).await,
        Err(DbError::InvalidParams(_))
    );
}
