//! Repository for the `allocation` table.

use carbide_core::pagination::{order_field, OrderField, PageInput};
use carbide_core::status::{self, ensure_valid};
use carbide_core::types::DbId;
use sqlx::{Acquire, PgConnection, Postgres};
use validator::Validate;

use crate::models::allocation::{
    Allocation, AllocationFilter, ClearAllocation, CreateAllocation, UpdateAllocation,
};
use crate::models::infrastructure_provider::InfrastructureProvider;
use crate::models::site::Site;
use crate::models::tenant::Tenant;
use crate::models::{wants, Relation};
use crate::repositories::filter::{clear_assignments, Filter};
use crate::repositories::relations::{attach, Loadable};
use crate::DbError;

const ENTITY: &str = "Allocation";

const COLUMNS: &str = "id, name, description, infrastructure_provider_id, tenant_id, site_id, \
    status, created, updated, created_by";

/// Related-row expressions are correlated subqueries so that ordering never
/// multiplies rows. Constraint-derived fields use the smallest value among
/// the allocation's live constraints.
const ORDER_FIELDS: &[OrderField] = &[
    order_field("name", "a.name"),
    order_field("status", "a.status"),
    order_field("created", "a.created"),
    order_field("updated", "a.updated"),
    order_field("site_name", "(SELECT s.name FROM site s WHERE s.id = a.site_id)"),
    order_field(
        "tenant_org_display_name",
        "(SELECT t.org_display_name FROM tenant t WHERE t.id = a.tenant_id)",
    ),
    order_field(
        "instance_type_name",
        "(SELECT MIN(it.name) FROM allocation_constraint ac \
          JOIN instance_type it ON it.id = ac.resource_type_id \
          WHERE ac.allocation_id = a.id AND ac.deleted IS NULL AND ac.resource_type = 'InstanceType')",
    ),
    order_field(
        "ip_block_name",
        "(SELECT MIN(b.name) FROM allocation_constraint ac \
          JOIN ip_block b ON b.id = ac.resource_type_id \
          WHERE ac.allocation_id = a.id AND ac.deleted IS NULL AND ac.resource_type = 'IPBlock')",
    ),
    order_field(
        "constraint_value",
        "(SELECT MIN(ac.constraint_value) FROM allocation_constraint ac \
          WHERE ac.allocation_id = a.id AND ac.deleted IS NULL)",
    ),
];

const SEARCH_COLUMNS: &[&str] = &["a.name", "a.description", "a.status"];

impl Loadable for Allocation {
    const TABLE: &'static str = "allocation";
    const COLUMNS: &'static str = COLUMNS;

    fn id(&self) -> DbId {
        self.id
    }
}

/// Provides CRUD operations for allocations.
pub struct AllocationRepo;

impl AllocationRepo {
    pub async fn create<'a, A>(db: A, input: &CreateAllocation) -> Result<Allocation, DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        input.validate()?;
        ensure_valid("allocation status", status::allocation::ALL, &input.status)?;
        let mut conn = db.acquire().await?;

        let query = format!(
            "INSERT INTO allocation (
                id, name, description, infrastructure_provider_id, tenant_id, site_id, status, created_by
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {COLUMNS}"
        );
        let allocation = sqlx::query_as::<_, Allocation>(&query)
            .bind(DbId::new_v4())
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.infrastructure_provider_id)
            .bind(input.tenant_id)
            .bind(input.site_id)
            .bind(&input.status)
            .bind(input.created_by)
            .fetch_one(&mut *conn)
            .await?;

        tracing::debug!(
            id = %allocation.id,
            tenant_id = %allocation.tenant_id,
            site_id = %allocation.site_id,
            "created allocation"
        );
        Ok(allocation)
    }

    pub async fn get_by_id<'a, A>(
        db: A,
        id: DbId,
        relations: &[Relation],
    ) -> Result<Allocation, DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = db.acquire().await?;
        let query = format!("SELECT {COLUMNS} FROM allocation WHERE id = $1 AND deleted IS NULL");
        let allocation = sqlx::query_as::<_, Allocation>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found(ENTITY, id))?;

        let mut rows = [allocation];
        Self::load_relations(&mut *conn, &mut rows, relations).await?;
        let [allocation] = rows;
        Ok(allocation)
    }

    /// List live allocations matching `filter`, with the total count before pagination.
    pub async fn get_all<'a, A>(
        db: A,
        filter: &AllocationFilter,
        page: &PageInput,
        relations: &[Relation],
    ) -> Result<(Vec<Allocation>, i64), DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let page = page.resolve(ORDER_FIELDS, "a.id")?;
        if filter.allocation_ids.as_ref().is_some_and(Vec::is_empty) {
            return Ok((Vec::new(), 0));
        }

        let f = build_filter(filter);
        let mut conn = db.acquire().await?;
        let where_clause = f.where_clause();
        let count_query = format!("SELECT COUNT(*) FROM allocation a {where_clause}");
        let total: i64 = f
            .bind_scalar(sqlx::query_scalar(&count_query))
            .fetch_one(&mut *conn)
            .await?;

        let limit_idx = f.next_index();
        let query = format!(
            "SELECT {COLUMNS} FROM allocation a {where_clause} {order}
             LIMIT ${limit_idx} OFFSET ${}",
            limit_idx + 1,
            order = page.order_clause,
        );
        let mut rows = f
            .bind_as(sqlx::query_as::<_, Allocation>(&query))
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&mut *conn)
            .await?;

        Self::load_relations(&mut *conn, &mut rows, relations).await?;
        Ok((rows, total))
    }

    /// Number of live allocations matching `filter`.
    pub async fn get_count<'a, A>(db: A, filter: &AllocationFilter) -> Result<i64, DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        if filter.allocation_ids.as_ref().is_some_and(Vec::is_empty) {
            return Ok(0);
        }

        let f = build_filter(filter);
        let mut conn = db.acquire().await?;
        let query = format!("SELECT COUNT(*) FROM allocation a {}", f.where_clause());
        Ok(f.bind_scalar(sqlx::query_scalar(&query))
            .fetch_one(&mut *conn)
            .await?)
    }

    pub async fn update<'a, A>(
        db: A,
        id: DbId,
        input: &UpdateAllocation,
    ) -> Result<Allocation, DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        if let Some(s) = &input.status {
            ensure_valid("allocation status", status::allocation::ALL, s)?;
        }
        let mut conn = db.acquire().await?;

        let query = format!(
            "UPDATE allocation SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                status = COALESCE($4, status),
                updated = NOW()
             WHERE id = $1 AND deleted IS NULL
             RETURNING {COLUMNS}"
        );
        let allocation = sqlx::query_as::<_, Allocation>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(&input.status)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found(ENTITY, id))?;

        tracing::debug!(id = %id, status = %allocation.status, "updated allocation");
        Ok(allocation)
    }

    pub async fn clear<'a, A>(
        db: A,
        id: DbId,
        input: &ClearAllocation,
    ) -> Result<Allocation, DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = db.acquire().await?;
        let sets = clear_assignments(&[(input.description, "description")]);
        if sets.is_empty() {
            return Self::get_by_id(&mut *conn, id, &[]).await;
        }

        let query = format!(
            "UPDATE allocation SET {}, updated = NOW()
             WHERE id = $1 AND deleted IS NULL
             RETURNING {COLUMNS}",
            sets.join(", ")
        );
        let allocation = sqlx::query_as::<_, Allocation>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found(ENTITY, id))?;

        tracing::debug!(id = %id, "cleared allocation fields");
        Ok(allocation)
    }

    /// Soft-delete an allocation. Its constraints are left to the caller.
    pub async fn delete_by_id<'a, A>(db: A, id: DbId) -> Result<(), DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = db.acquire().await?;
        let result =
            sqlx::query("UPDATE allocation SET deleted = NOW() WHERE id = $1 AND deleted IS NULL")
                .bind(id)
                .execute(&mut *conn)
                .await?;

        if result.rows_affected() > 0 {
            tracing::debug!(id = %id, "deleted allocation");
        }
        Ok(())
    }

    async fn load_relations(
        conn: &mut PgConnection,
        rows: &mut [Allocation],
        relations: &[Relation],
    ) -> Result<(), DbError> {
        if wants(relations, Relation::InfrastructureProvider) {
            attach::<InfrastructureProvider, _>(
                conn,
                rows,
                |a| Some(a.infrastructure_provider_id),
                |a, p| a.infrastructure_provider = Some(Box::new(p)),
            )
            .await?;
        }
        if wants(relations, Relation::Tenant) {
            attach::<Tenant, _>(
                conn,
                rows,
                |a| Some(a.tenant_id),
                |a, t| a.tenant = Some(Box::new(t)),
            )
            .await?;
        }
        if wants(relations, Relation::Site) {
            attach::<Site, _>(
                conn,
                rows,
                |a| Some(a.site_id),
                |a, s| a.site = Some(Box::new(s)),
            )
            .await?;
        }
        Ok(())
    }
}

fn build_filter(filter: &AllocationFilter) -> Filter {
    let mut f = Filter::live("a");
    if let Some(name) = &filter.name {
        f.eq("a.name", name.as_str());
    }
    if let Some(provider_id) = filter.infrastructure_provider_id {
        f.eq("a.infrastructure_provider_id", provider_id);
    }
    if let Some(tenant_ids) = &filter.tenant_ids {
        f.any("a.tenant_id", tenant_ids.clone());
    }
    if let Some(site_ids) = &filter.site_ids {
        f.any("a.site_id", site_ids.clone());
    }
    if let Some(statuses) = &filter.statuses {
        f.any("a.status", statuses.clone());
    }
    if let Some(ids) = &filter.allocation_ids {
        f.any("a.id", ids.clone());
    }

    if filter.has_constraint_filter() {
        let mut conditions = vec![
            "ac.allocation_id = a.id".to_string(),
            "ac.deleted IS NULL".to_string(),
        ];
        if let Some(types) = &filter.resource_types {
            let p = f.placeholder(types.clone());
            conditions.push(format!("ac.resource_type = ANY({p})"));
        }
        if let Some(ids) = &filter.resource_type_ids {
            let p = f.placeholder(ids.clone());
            conditions.push(format!("ac.resource_type_id = ANY({p})"));
        }
        if let Some(types) = &filter.constraint_types {
            let p = f.placeholder(types.clone());
            conditions.push(format!("ac.constraint_type = ANY({p})"));
        }
        if let Some(values) = &filter.constraint_values {
            let p = f.placeholder(values.clone());
            conditions.push(format!("ac.constraint_value = ANY({p})"));
        }
        f.raw(format!(
            "EXISTS (SELECT 1 FROM allocation_constraint ac WHERE {})",
            conditions.join(" AND ")
        ));
    }

    f.search(SEARCH_COLUMNS, filter.search_query.as_deref());
    f
}
