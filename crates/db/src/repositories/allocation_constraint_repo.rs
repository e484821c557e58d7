//! Repository for the `allocation_constraint` table.

use carbide_core::pagination::{order_field, OrderField, PageInput};
use carbide_core::status::{self, ensure_valid};
use carbide_core::types::DbId;
use sqlx::{Acquire, PgConnection, Postgres};
use validator::Validate;

use crate::models::allocation::Allocation;
use crate::models::allocation_constraint::{
    AllocationConstraint, AllocationConstraintFilter, ClearAllocationConstraint,
    CreateAllocationConstraint, UpdateAllocationConstraint,
};
use crate::models::{wants, Relation};
use crate::repositories::filter::{clear_assignments, Filter};
use crate::repositories::relations::attach;
use crate::DbError;

const ENTITY: &str = "AllocationConstraint";

const COLUMNS: &str = "id, allocation_id, resource_type, resource_type_id, constraint_type, \
    constraint_value, derived_resource_id, created, updated, created_by";

const ORDER_FIELDS: &[OrderField] = &[
    order_field("resource_type", "ac.resource_type"),
    order_field("created", "ac.created"),
    order_field("updated", "ac.updated"),
];

/// Provides CRUD operations for allocation constraints.
pub struct AllocationConstraintRepo;

impl AllocationConstraintRepo {
    pub async fn create<'a, A>(
        db: A,
        input: &CreateAllocationConstraint,
    ) -> Result<AllocationConstraint, DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        input.validate()?;
        validate_types(Some(&input.resource_type), Some(&input.constraint_type))?;
        let mut conn = db.acquire().await?;

        let query = format!(
            "INSERT INTO allocation_constraint (
                id, allocation_id, resource_type, resource_type_id, constraint_type,
                constraint_value, derived_resource_id, created_by
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {COLUMNS}"
        );
        let constraint = sqlx::query_as::<_, AllocationConstraint>(&query)
            .bind(DbId::new_v4())
            .bind(input.allocation_id)
            .bind(&input.resource_type)
            .bind(input.resource_type_id)
            .bind(&input.constraint_type)
            .bind(input.constraint_value)
            .bind(input.derived_resource_id)
            .bind(input.created_by)
            .fetch_one(&mut *conn)
            .await?;

        tracing::debug!(
            id = %constraint.id,
            allocation_id = %constraint.allocation_id,
            resource_type = %constraint.resource_type,
            "created allocation constraint"
        );
        Ok(constraint)
    }

    pub async fn get_by_id<'a, A>(
        db: A,
        id: DbId,
        relations: &[Relation],
    ) -> Result<AllocationConstraint, DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = db.acquire().await?;
        let query =
            format!("SELECT {COLUMNS} FROM allocation_constraint WHERE id = $1 AND deleted IS NULL");
        let constraint = sqlx::query_as::<_, AllocationConstraint>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found(ENTITY, id))?;

        let mut rows = [constraint];
        Self::load_relations(&mut *conn, &mut rows, relations).await?;
        let [constraint] = rows;
        Ok(constraint)
    }

    pub async fn get_all<'a, A>(
        db: A,
        filter: &AllocationConstraintFilter,
        page: &PageInput,
        relations: &[Relation],
    ) -> Result<(Vec<AllocationConstraint>, i64), DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let page = page.resolve(ORDER_FIELDS, "ac.id")?;

        let mut f = Filter::live("ac");
        if let Some(ids) = &filter.allocation_ids {
            f.any("ac.allocation_id", ids.clone());
        }
        if let Some(resource_type) = &filter.resource_type {
            f.eq("ac.resource_type", resource_type.as_str());
        }
        if let Some(ids) = &filter.resource_type_ids {
            f.any("ac.resource_type_id", ids.clone());
        }
        if let Some(constraint_type) = &filter.constraint_type {
            f.eq("ac.constraint_type", constraint_type.as_str());
        }
        if let Some(id) = filter.derived_resource_id {
            f.eq("ac.derived_resource_id", id);
        }

        let mut conn = db.acquire().await?;
        let where_clause = f.where_clause();
        let count_query = format!("SELECT COUNT(*) FROM allocation_constraint ac {where_clause}");
        let total: i64 = f
            .bind_scalar(sqlx::query_scalar(&count_query))
            .fetch_one(&mut *conn)
            .await?;

        let limit_idx = f.next_index();
        let query = format!(
            "SELECT {COLUMNS} FROM allocation_constraint ac {where_clause} {order}
             LIMIT ${limit_idx} OFFSET ${}",
            limit_idx + 1,
            order = page.order_clause,
        );
        let mut rows = f
            .bind_as(sqlx::query_as::<_, AllocationConstraint>(&query))
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&mut *conn)
            .await?;

        Self::load_relations(&mut *conn, &mut rows, relations).await?;
        Ok((rows, total))
    }

    pub async fn update<'a, A>(
        db: A,
        id: DbId,
        input: &UpdateAllocationConstraint,
    ) -> Result<AllocationConstraint, DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        validate_types(input.resource_type.as_ref(), input.constraint_type.as_ref())?;
        let mut conn = db.acquire().await?;

        let query = format!(
            "UPDATE allocation_constraint SET
                allocation_id = COALESCE($2, allocation_id),
                resource_type = COALESCE($3, resource_type),
                resource_type_id = COALESCE($4, resource_type_id),
                constraint_type = COALESCE($5, constraint_type),
                constraint_value = COALESCE($6, constraint_value),
                derived_resource_id = COALESCE($7, derived_resource_id),
                updated = NOW()
             WHERE id = $1 AND deleted IS NULL
             RETURNING {COLUMNS}"
        );
        let constraint = sqlx::query_as::<_, AllocationConstraint>(&query)
            .bind(id)
            .bind(input.allocation_id)
            .bind(&input.resource_type)
            .bind(input.resource_type_id)
            .bind(&input.constraint_type)
            .bind(input.constraint_value)
            .bind(input.derived_resource_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found(ENTITY, id))?;

        tracing::debug!(id = %id, "updated allocation constraint");
        Ok(constraint)
    }

    pub async fn clear<'a, A>(
        db: A,
        id: DbId,
        input: &ClearAllocationConstraint,
    ) -> Result<AllocationConstraint, DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = db.acquire().await?;
        let sets = clear_assignments(&[(input.derived_resource_id, "derived_resource_id")]);
        if sets.is_empty() {
            return Self::get_by_id(&mut *conn, id, &[]).await;
        }

        let query = format!(
            "UPDATE allocation_constraint SET {}, updated = NOW()
             WHERE id = $1 AND deleted IS NULL
             RETURNING {COLUMNS}",
            sets.join(", ")
        );
        let constraint = sqlx::query_as::<_, AllocationConstraint>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found(ENTITY, id))?;

        tracing::debug!(id = %id, "cleared allocation constraint fields");
        Ok(constraint)
    }

    pub async fn delete_by_id<'a, A>(db: A, id: DbId) -> Result<(), DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = db.acquire().await?;
        let result = sqlx::query(
            "UPDATE allocation_constraint SET deleted = NOW() WHERE id = $1 AND deleted IS NULL",
        )
        .bind(id)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() > 0 {
            tracing::debug!(id = %id, "deleted allocation constraint");
        }
        Ok(())
    }

    async fn load_relations(
        conn: &mut PgConnection,
        rows: &mut [AllocationConstraint],
        relations: &[Relation],
    ) -> Result<(), DbError> {
        if wants(relations, Relation::Allocation) {
            attach::<Allocation, _>(
                conn,
                rows,
                |ac| Some(ac.allocation_id),
                |ac, a| ac.allocation = Some(Box::new(a)),
            )
            .await?;
        }
        Ok(())
    }
}

fn validate_types(
    resource_type: Option<&String>,
    constraint_type: Option<&String>,
) -> Result<(), DbError> {
    if let Some(rt) = resource_type {
        ensure_valid(
            "resource type",
            status::allocation_constraint::RESOURCE_TYPES,
            rt,
        )?;
    }
    if let Some(ct) = constraint_type {
        ensure_valid(
            "constraint type",
            status::allocation_constraint::CONSTRAINT_TYPES,
            ct,
        )?;
    }
    Ok(())
}
