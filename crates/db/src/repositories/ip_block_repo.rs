//! Repository for the `ip_block` table.

use std::collections::BTreeMap;

use carbide_core::pagination::{order_field, OrderField, PageInput};
use carbide_core::status::{self, ensure_valid};
use carbide_core::types::DbId;
use sqlx::{Acquire, PgConnection, Postgres};
use validator::Validate;

use crate::models::infrastructure_provider::InfrastructureProvider;
use crate::models::ip_block::{ClearIpBlock, CreateIpBlock, IpBlock, IpBlockFilter, UpdateIpBlock};
use crate::models::site::Site;
use crate::models::tenant::Tenant;
use crate::models::{wants, Relation};
use crate::repositories::filter::{clear_assignments, Filter};
use crate::repositories::relations::attach;
use crate::DbError;

const ENTITY: &str = "IpBlock";

const COLUMNS: &str = "id, name, description, site_id, infrastructure_provider_id, tenant_id, \
    routing_type, prefix, prefix_length, protocol_version, full_grant, status, \
    created, updated, created_by";

const ORDER_FIELDS: &[OrderField] = &[
    order_field("name", "b.name"),
    order_field("prefix", "b.prefix"),
    order_field("status", "b.status"),
    order_field("created", "b.created"),
    order_field("updated", "b.updated"),
];

const SEARCH_COLUMNS: &[&str] = &["b.name", "b.description", "b.status"];

/// Provides CRUD operations for IP blocks.
pub struct IpBlockRepo;

impl IpBlockRepo {
    /// Insert a new IP block. A caller-supplied `id` is kept, otherwise one is generated.
    pub async fn create<'a, A>(db: A, input: &CreateIpBlock) -> Result<IpBlock, DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        input.validate()?;
        ensure_valid("IP block status", status::ip_block::ALL, &input.status)?;
        ensure_valid("routing type", status::ip_block::ROUTING_TYPES, &input.routing_type)?;
        ensure_valid(
            "protocol version",
            status::ip_block::PROTOCOL_VERSIONS,
            &input.protocol_version,
        )?;
        let mut conn = db.acquire().await?;

        let query = format!(
            "INSERT INTO ip_block (
                id, name, description, site_id, infrastructure_provider_id, tenant_id,
                routing_type, prefix, prefix_length, protocol_version, full_grant, status, created_by
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
             RETURNING {COLUMNS}"
        );
        let block = sqlx::query_as::<_, IpBlock>(&query)
            .bind(input.id.unwrap_or_else(DbId::new_v4))
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.site_id)
            .bind(input.infrastructure_provider_id)
            .bind(input.tenant_id)
            .bind(&input.routing_type)
            .bind(&input.prefix)
            .bind(input.prefix_length)
            .bind(&input.protocol_version)
            .bind(input.full_grant)
            .bind(&input.status)
            .bind(input.created_by)
            .fetch_one(&mut *conn)
            .await?;

        tracing::debug!(
            id = %block.id,
            prefix = %block.prefix,
            prefix_length = block.prefix_length,
            "created ip block"
        );
        Ok(block)
    }

    pub async fn get_by_id<'a, A>(
        db: A,
        id: DbId,
        relations: &[Relation],
    ) -> Result<IpBlock, DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = db.acquire().await?;
        let query = format!("SELECT {COLUMNS} FROM ip_block WHERE id = $1 AND deleted IS NULL");
        let block = sqlx::query_as::<_, IpBlock>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found(ENTITY, id))?;

        let mut blocks = [block];
        Self::load_relations(&mut *conn, &mut blocks, relations).await?;
        let [block] = blocks;
        Ok(block)
    }

    /// List live IP blocks matching `filter`, with the total count before pagination.
    ///
    /// `exclude_derived` cannot be combined with `tenant_ids`, since derived
    /// blocks are exactly the ones with a tenant.
    pub async fn get_all<'a, A>(
        db: A,
        filter: &IpBlockFilter,
        page: &PageInput,
        relations: &[Relation],
    ) -> Result<(Vec<IpBlock>, i64), DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        if filter.exclude_derived && filter.tenant_ids.is_some() {
            return Err(DbError::InvalidParams(
                "exclude_derived cannot be combined with tenant_ids".into(),
            ));
        }
        let page = page.resolve(ORDER_FIELDS, "b.id")?;
        if filter.ids.as_ref().is_some_and(Vec::is_empty) {
            return Ok((Vec::new(), 0));
        }

        let mut f = Filter::live("b");
        if let Some(ids) = &filter.ids {
            f.any("b.id", ids.clone());
        }
        if let Some(names) = &filter.names {
            f.any("b.name", names.clone());
        }
        if let Some(site_ids) = &filter.site_ids {
            f.any("b.site_id", site_ids.clone());
        }
        if let Some(ids) = &filter.infrastructure_provider_ids {
            f.any("b.infrastructure_provider_id", ids.clone());
        }
        if let Some(tenant_ids) = &filter.tenant_ids {
            f.any("b.tenant_id", tenant_ids.clone());
        }
        if let Some(types) = &filter.routing_types {
            f.any("b.routing_type", types.clone());
        }
        if let Some(prefixes) = &filter.prefixes {
            f.any("b.prefix", prefixes.clone());
        }
        if let Some(lengths) = &filter.prefix_lengths {
            f.any("b.prefix_length", lengths.clone());
        }
        if let Some(versions) = &filter.protocol_versions {
            f.any("b.protocol_version", versions.clone());
        }
        if let Some(full_grant) = filter.full_grant {
            f.eq("b.full_grant", full_grant);
        }
        if let Some(statuses) = &filter.statuses {
            f.any("b.status", statuses.clone());
        }
        if filter.exclude_derived {
            f.raw("b.tenant_id IS NULL");
        }
        f.search(SEARCH_COLUMNS, filter.search_query.as_deref());

        let mut conn = db.acquire().await?;
        let where_clause = f.where_clause();
        let count_query = format!("SELECT COUNT(*) FROM ip_block b {where_clause}");
        let total: i64 = f
            .bind_scalar(sqlx::query_scalar(&count_query))
            .fetch_one(&mut *conn)
            .await?;

        let limit_idx = f.next_index();
        let query = format!(
            "SELECT {COLUMNS} FROM ip_block b {where_clause} {order}
             LIMIT ${limit_idx} OFFSET ${}",
            limit_idx + 1,
            order = page.order_clause,
        );
        let mut blocks = f
            .bind_as(sqlx::query_as::<_, IpBlock>(&query))
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&mut *conn)
            .await?;

        Self::load_relations(&mut *conn, &mut blocks, relations).await?;
        Ok((blocks, total))
    }

    /// Count live IP blocks per status. Every known status is present, plus `total`.
    pub async fn get_count_by_status<'a, A>(
        db: A,
        infrastructure_provider_id: Option<DbId>,
        site_id: Option<DbId>,
        tenant_id: Option<DbId>,
    ) -> Result<BTreeMap<String, i64>, DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut f = Filter::live("b");
        if let Some(id) = infrastructure_provider_id {
            f.eq("b.infrastructure_provider_id", id);
        }
        if let Some(id) = site_id {
            f.eq("b.site_id", id);
        }
        if let Some(id) = tenant_id {
            f.eq("b.tenant_id", id);
        }

        let mut conn = db.acquire().await?;
        let query = format!(
            "SELECT b.status, COUNT(*) FROM ip_block b {} GROUP BY b.status",
            f.where_clause()
        );
        let rows = f
            .bind_as(sqlx::query_as::<_, (String, i64)>(&query))
            .fetch_all(&mut *conn)
            .await?;
        Ok(status::status_counts(status::ip_block::ALL, &rows))
    }

    pub async fn update<'a, A>(db: A, id: DbId, input: &UpdateIpBlock) -> Result<IpBlock, DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        if let Some(s) = &input.status {
            ensure_valid("IP block status", status::ip_block::ALL, s)?;
        }
        if let Some(rt) = &input.routing_type {
            ensure_valid("routing type", status::ip_block::ROUTING_TYPES, rt)?;
        }
        if let Some(pv) = &input.protocol_version {
            ensure_valid("protocol version", status::ip_block::PROTOCOL_VERSIONS, pv)?;
        }
        let mut conn = db.acquire().await?;

        let query = format!(
            "UPDATE ip_block SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                tenant_id = COALESCE($4, tenant_id),
                routing_type = COALESCE($5, routing_type),
                prefix = COALESCE($6, prefix),
                prefix_length = COALESCE($7, prefix_length),
                protocol_version = COALESCE($8, protocol_version),
                full_grant = COALESCE($9, full_grant),
                status = COALESCE($10, status),
                updated = NOW()
             WHERE id = $1 AND deleted IS NULL
             RETURNING {COLUMNS}"
        );
        let block = sqlx::query_as::<_, IpBlock>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.tenant_id)
            .bind(&input.routing_type)
            .bind(&input.prefix)
            .bind(input.prefix_length)
            .bind(&input.protocol_version)
            .bind(input.full_grant)
            .bind(&input.status)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found(ENTITY, id))?;

        tracing::debug!(id = %id, "updated ip block");
        Ok(block)
    }

    pub async fn clear<'a, A>(db: A, id: DbId, input: &ClearIpBlock) -> Result<IpBlock, DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = db.acquire().await?;
        let sets = clear_assignments(&[
            (input.description, "description"),
            (input.tenant_id, "tenant_id"),
        ]);
        if sets.is_empty() {
            return Self::get_by_id(&mut *conn, id, &[]).await;
        }

        let query = format!(
            "UPDATE ip_block SET {}, updated = NOW()
             WHERE id = $1 AND deleted IS NULL
             RETURNING {COLUMNS}",
            sets.join(", ")
        );
        let block = sqlx::query_as::<_, IpBlock>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found(ENTITY, id))?;

        tracing::debug!(id = %id, cleared = sets.len(), "cleared ip block fields");
        Ok(block)
    }

    /// Soft-delete an IP block. Idempotent.
    pub async fn delete_by_id<'a, A>(db: A, id: DbId) -> Result<(), DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = db.acquire().await?;
        let result =
            sqlx::query("UPDATE ip_block SET deleted = NOW() WHERE id = $1 AND deleted IS NULL")
                .bind(id)
                .execute(&mut *conn)
                .await?;

        if result.rows_affected() > 0 {
            tracing::debug!(id = %id, "deleted ip block");
        }
        Ok(())
    }

    async fn load_relations(
        conn: &mut PgConnection,
        blocks: &mut [IpBlock],
        relations: &[Relation],
    ) -> Result<(), DbError> {
        if wants(relations, Relation::InfrastructureProvider) {
            attach::<InfrastructureProvider, _>(
                conn,
                blocks,
                |b| Some(b.infrastructure_provider_id),
                |b, p| b.infrastructure_provider = Some(Box::new(p)),
            )
            .await?;
        }
        if wants(relations, Relation::Tenant) {
            attach::<Tenant, _>(conn, blocks, |b| b.tenant_id, |b, t| {
                b.tenant = Some(Box::new(t))
            })
            .await?;
        }
        if wants(relations, Relation::Site) {
            attach::<Site, _>(
                conn,
                blocks,
                |b| Some(b.site_id),
                |b, s| b.site = Some(Box::new(s)),
            )
            .await?;
        }
        Ok(())
    }
}
