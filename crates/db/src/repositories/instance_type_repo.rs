//! Repository for the `instance_type` table.

use carbide_core::pagination::{order_field, OrderField, PageInput};
use carbide_core::status::{self, ensure_valid};
use carbide_core::types::DbId;
use sqlx::types::Json;
use sqlx::{Acquire, PgConnection, Postgres};
use validator::Validate;

use crate::models::infrastructure_provider::InfrastructureProvider;
use crate::models::instance_type::{
    ClearInstanceType, CreateInstanceType, InstanceType, InstanceTypeFilter, UpdateInstanceType,
};
use crate::models::site::Site;
use crate::models::{wants, Relation};
use crate::repositories::filter::{clear_assignments, Filter};
use crate::repositories::relations::attach;
use crate::DbError;

const ENTITY: &str = "InstanceType";

const COLUMNS: &str = "id, name, display_name, description, controller_machine_type, \
    infrastructure_provider_id, site_id, labels, status, created, updated, created_by";

const ORDER_FIELDS: &[OrderField] = &[
    order_field("name", "it.name"),
    order_field("status", "it.status"),
    order_field("created", "it.created"),
    order_field("updated", "it.updated"),
];

const SEARCH_COLUMNS: &[&str] = &["it.name", "it.display_name", "it.description", "it.status"];

/// Provides CRUD operations for instance types.
pub struct InstanceTypeRepo;

impl InstanceTypeRepo {
    pub async fn create<'a, A>(db: A, input: &CreateInstanceType) -> Result<InstanceType, DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        input.validate()?;
        ensure_valid("instance type status", status::instance_type::ALL, &input.status)?;
        let mut conn = db.acquire().await?;

        let query = format!(
            "INSERT INTO instance_type (
                id, name, display_name, description, controller_machine_type,
                infrastructure_provider_id, site_id, labels, status, created_by
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {COLUMNS}"
        );
        let instance_type = sqlx::query_as::<_, InstanceType>(&query)
            .bind(DbId::new_v4())
            .bind(&input.name)
            .bind(&input.display_name)
            .bind(&input.description)
            .bind(&input.controller_machine_type)
            .bind(input.infrastructure_provider_id)
            .bind(input.site_id)
            .bind(input.labels.as_ref().map(Json))
            .bind(&input.status)
            .bind(input.created_by)
            .fetch_one(&mut *conn)
            .await?;

        tracing::debug!(id = %instance_type.id, name = %instance_type.name, "created instance type");
        Ok(instance_type)
    }

    pub async fn get_by_id<'a, A>(
        db: A,
        id: DbId,
        relations: &[Relation],
    ) -> Result<InstanceType, DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = db.acquire().await?;
        let query = format!("SELECT {COLUMNS} FROM instance_type WHERE id = $1 AND deleted IS NULL");
        let instance_type = sqlx::query_as::<_, InstanceType>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found(ENTITY, id))?;

        let mut rows = [instance_type];
        Self::load_relations(&mut *conn, &mut rows, relations).await?;
        let [instance_type] = rows;
        Ok(instance_type)
    }

    pub async fn get_all<'a, A>(
        db: A,
        filter: &InstanceTypeFilter,
        page: &PageInput,
        relations: &[Relation],
    ) -> Result<(Vec<InstanceType>, i64), DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let page = page.resolve(ORDER_FIELDS, "it.id")?;

        let mut f = Filter::live("it");
        if let Some(name) = &filter.name {
            f.eq("it.name", name.as_str());
        }
        if let Some(names) = &filter.names {
            f.any("it.name", names.clone());
        }
        if let Some(ids) = &filter.instance_type_ids {
            f.any("it.id", ids.clone());
        }
        if let Some(provider_id) = filter.infrastructure_provider_id {
            f.eq("it.infrastructure_provider_id", provider_id);
        }
        if let Some(site_ids) = &filter.site_ids {
            f.any("it.site_id", site_ids.clone());
        }
        if let Some(statuses) = &filter.statuses {
            f.any("it.status", statuses.clone());
        }
        f.search(SEARCH_COLUMNS, filter.search_query.as_deref());

        let mut conn = db.acquire().await?;
        let where_clause = f.where_clause();
        let count_query = format!("SELECT COUNT(*) FROM instance_type it {where_clause}");
        let total: i64 = f
            .bind_scalar(sqlx::query_scalar(&count_query))
            .fetch_one(&mut *conn)
            .await?;

        let limit_idx = f.next_index();
        let query = format!(
            "SELECT {COLUMNS} FROM instance_type it {where_clause} {order}
             LIMIT ${limit_idx} OFFSET ${}",
            limit_idx + 1,
            order = page.order_clause,
        );
        let mut rows = f
            .bind_as(sqlx::query_as::<_, InstanceType>(&query))
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
        input: &UpdateInstanceType,
    ) -> Result<InstanceType, DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        if let Some(s) = &input.status {
            ensure_valid("instance type status", status::instance_type::ALL, s)?;
        }
        let mut conn = db.acquire().await?;

        let query = format!(
            "UPDATE instance_type SET
                name = COALESCE($2, name),
                display_name = COALESCE($3, display_name),
                description = COALESCE($4, description),
                controller_machine_type = COALESCE($5, controller_machine_type),
                site_id = COALESCE($6, site_id),
                labels = COALESCE($7, labels),
                status = COALESCE($8, status),
                updated = NOW()
             WHERE id = $1 AND deleted IS NULL
             RETURNING {COLUMNS}"
        );
        let instance_type = sqlx::query_as::<_, InstanceType>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.display_name)
            .bind(&input.description)
            .bind(&input.controller_machine_type)
            .bind(input.site_id)
            .bind(input.labels.as_ref().map(Json))
            .bind(&input.status)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found(ENTITY, id))?;

        tracing::debug!(id = %id, "updated instance type");
        Ok(instance_type)
    }

    pub async fn clear<'a, A>(
        db: A,
        id: DbId,
        input: &ClearInstanceType,
    ) -> Result<InstanceType, DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = db.acquire().await?;
        let sets = clear_assignments(&[
            (input.display_name, "display_name"),
            (input.description, "description"),
            (input.controller_machine_type, "controller_machine_type"),
            (input.site_id, "site_id"),
            (input.labels, "labels"),
        ]);
        if sets.is_empty() {
            return Self::get_by_id(&mut *conn, id, &[]).await;
        }

        let query = format!(
            "UPDATE instance_type SET {}, updated = NOW()
             WHERE id = $1 AND deleted IS NULL
             RETURNING {COLUMNS}",
            sets.join(", ")
        );
        let instance_type = sqlx::query_as::<_, InstanceType>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found(ENTITY, id))?;

        tracing::debug!(id = %id, cleared = sets.len(), "cleared instance type fields");
        Ok(instance_type)
    }

    pub async fn delete_by_id<'a, A>(db: A, id: DbId) -> Result<(), DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = db.acquire().await?;
        let result = sqlx::query(
            "UPDATE instance_type SET deleted = NOW() WHERE id = $1 AND deleted IS NULL",
        )
        .bind(id)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() > 0 {
            tracing::debug!(id = %id, "deleted instance type");
        }
        Ok(())
    }

    async fn load_relations(
        conn: &mut PgConnection,
        rows: &mut [InstanceType],
        relations: &[Relation],
    ) -> Result<(), DbError> {
        if wants(relations, Relation::InfrastructureProvider) {
            attach::<InfrastructureProvider, _>(
                conn,
                rows,
                |it| Some(it.infrastructure_provider_id),
                |it, p| it.infrastructure_provider = Some(Box::new(p)),
            )
            .await?;
        }
        if wants(relations, Relation::Site) {
            attach::<Site, _>(conn, rows, |it| it.site_id, |it, s| {
                it.site = Some(Box::new(s))
            })
            .await?;
        }
        Ok(())
    }
}
