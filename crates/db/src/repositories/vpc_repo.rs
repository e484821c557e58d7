//! Repository for the `vpc` table.

use std::collections::BTreeMap;

use carbide_core::pagination::{order_field, OrderField, PageInput};
use carbide_core::status::{self, ensure_valid};
use carbide_core::types::DbId;
use sqlx::types::Json;
use sqlx::{Acquire, PgConnection, Postgres};
use validator::Validate;

use crate::models::infrastructure_provider::InfrastructureProvider;
use crate::models::site::Site;
use crate::models::tenant::Tenant;
use crate::models::vpc::{ClearVpc, CreateVpc, UpdateVpc, Vpc, VpcFilter};
use crate::models::{wants, Relation};
use crate::repositories::filter::{clear_assignments, Filter};
use crate::repositories::relations::attach;
use crate::DbError;

const ENTITY: &str = "Vpc";

const COLUMNS: &str = "id, name, description, org, infrastructure_provider_id, tenant_id, site_id, \
    nvlink_logical_partition_id, network_virtualization_type, controller_vpc_id, \
    network_security_group_id, nsg_propagation_details, labels, status, is_missing_on_site, \
    created, updated, created_by";

const ORDER_FIELDS: &[OrderField] = &[
    order_field("name", "v.name"),
    order_field("status", "v.status"),
    order_field("created", "v.created"),
    order_field("updated", "v.updated"),
];

const SEARCH_COLUMNS: &[&str] = &[
    "v.name",
    "v.description",
    "v.network_virtualization_type",
    "v.status",
    "v.labels::text",
];

/// Provides CRUD operations for VPCs.
pub struct VpcRepo;

impl VpcRepo {
    pub async fn create<'a, A>(db: A, input: &CreateVpc) -> Result<Vpc, DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        input.validate()?;
        ensure_valid("VPC status", status::vpc::ALL, &input.status)?;
        if let Some(nvt) = &input.network_virtualization_type {
            ensure_valid(
                "network virtualization type",
                status::vpc::NETWORK_VIRTUALIZATION_TYPES,
                nvt,
            )?;
        }
        let mut conn = db.acquire().await?;

        let query = format!(
            "INSERT INTO vpc (
                id, name, description, org, infrastructure_provider_id, tenant_id, site_id,
                nvlink_logical_partition_id, network_virtualization_type, controller_vpc_id,
                network_security_group_id, nsg_propagation_details, labels, status, created_by
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
             RETURNING {COLUMNS}"
        );
        let vpc = sqlx::query_as::<_, Vpc>(&query)
            .bind(DbId::new_v4())
            .bind(&input.name)
            .bind(&input.description)
            .bind(&input.org)
            .bind(input.infrastructure_provider_id)
            .bind(input.tenant_id)
            .bind(input.site_id)
            .bind(input.nvlink_logical_partition_id)
            .bind(&input.network_virtualization_type)
            .bind(input.controller_vpc_id)
            .bind(&input.network_security_group_id)
            .bind(&input.nsg_propagation_details)
            .bind(input.labels.as_ref().map(Json))
            .bind(&input.status)
            .bind(input.created_by)
            .fetch_one(&mut *conn)
            .await?;

        tracing::debug!(id = %vpc.id, site_id = %vpc.site_id, "created vpc");
        Ok(vpc)
    }

    pub async fn get_by_id<'a, A>(db: A, id: DbId, relations: &[Relation]) -> Result<Vpc, DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = db.acquire().await?;
        let query = format!("SELECT {COLUMNS} FROM vpc WHERE id = $1 AND deleted IS NULL");
        let vpc = sqlx::query_as::<_, Vpc>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found(ENTITY, id))?;

        let mut vpcs = [vpc];
        Self::load_relations(&mut *conn, &mut vpcs, relations).await?;
        let [vpc] = vpcs;
        Ok(vpc)
    }

    /// List live VPCs matching `filter`, with the total count before pagination.
    pub async fn get_all<'a, A>(
        db: A,
        filter: &VpcFilter,
        page: &PageInput,
        relations: &[Relation],
    ) -> Result<(Vec<Vpc>, i64), DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let page = page.resolve(ORDER_FIELDS, "v.id")?;
        if filter.vpc_ids.as_ref().is_some_and(Vec::is_empty) {
            return Ok((Vec::new(), 0));
        }

        let mut f = Filter::live("v");
        if let Some(name) = &filter.name {
            f.eq("v.name", name.as_str());
        }
        if let Some(ids) = &filter.vpc_ids {
            f.any("v.id", ids.clone());
        }
        if let Some(provider_id) = filter.infrastructure_provider_id {
            f.eq("v.infrastructure_provider_id", provider_id);
        }
        if let Some(tenant_ids) = &filter.tenant_ids {
            f.any("v.tenant_id", tenant_ids.clone());
        }
        if let Some(site_ids) = &filter.site_ids {
            f.any("v.site_id", site_ids.clone());
        }
        if let Some(ids) = &filter.nvlink_logical_partition_ids {
            f.any("v.nvlink_logical_partition_id", ids.clone());
        }
        if let Some(ids) = &filter.network_security_group_ids {
            f.any("v.network_security_group_id", ids.clone());
        }
        if let Some(org) = &filter.org {
            f.eq("v.org", org.as_str());
        }
        if let Some(nvt) = &filter.network_virtualization_type {
            f.eq("v.network_virtualization_type", nvt.as_str());
        }
        if let Some(statuses) = &filter.statuses {
            f.any("v.status", statuses.clone());
        }
        f.search(SEARCH_COLUMNS, filter.search_query.as_deref());

        let mut conn = db.acquire().await?;
        let where_clause = f.where_clause();
        let count_query = format!("SELECT COUNT(*) FROM vpc v {where_clause}");
        let total: i64 = f
            .bind_scalar(sqlx::query_scalar(&count_query))
            .fetch_one(&mut *conn)
            .await?;

        let limit_idx = f.next_index();
        let query = format!(
            "SELECT {COLUMNS} FROM vpc v {where_clause} {order}
             LIMIT ${limit_idx} OFFSET ${}",
            limit_idx + 1,
            order = page.order_clause,
        );
        let mut vpcs = f
            .bind_as(sqlx::query_as::<_, Vpc>(&query))
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&mut *conn)
            .await?;

        Self::load_relations(&mut *conn, &mut vpcs, relations).await?;
        Ok((vpcs, total))
    }

    /// Count live VPCs per status. Every known status is present, plus `total`.
    pub async fn get_count_by_status<'a, A>(
        db: A,
        infrastructure_provider_id: Option<DbId>,
        tenant_id: Option<DbId>,
        site_id: Option<DbId>,
    ) -> Result<BTreeMap<String, i64>, DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut f = Filter::live("v");
        if let Some(id) = infrastructure_provider_id {
            f.eq("v.infrastructure_provider_id", id);
        }
        if let Some(id) = tenant_id {
            f.eq("v.tenant_id", id);
        }
        if let Some(id) = site_id {
            f.eq("v.site_id", id);
        }

        let mut conn = db.acquire().await?;
        let query = format!(
            "SELECT v.status, COUNT(*) FROM vpc v {} GROUP BY v.status",
            f.where_clause()
        );
        let rows = f
            .bind_as(sqlx::query_as::<_, (String, i64)>(&query))
            .fetch_all(&mut *conn)
            .await?;
        Ok(status::status_counts(status::vpc::ALL, &rows))
    }

    /// Update a VPC. Only non-`None` fields in `input` are applied.
    pub async fn update<'a, A>(db: A, id: DbId, input: &UpdateVpc) -> Result<Vpc, DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        if let Some(s) = &input.status {
            ensure_valid("VPC status", status::vpc::ALL, s)?;
        }
        if let Some(nvt) = &input.network_virtualization_type {
            ensure_valid(
                "network virtualization type",
                status::vpc::NETWORK_VIRTUALIZATION_TYPES,
                nvt,
            )?;
        }
        let mut conn = db.acquire().await?;

        let query = format!(
            "UPDATE vpc SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                nvlink_logical_partition_id = COALESCE($4, nvlink_logical_partition_id),
                network_virtualization_type = COALESCE($5, network_virtualization_type),
                controller_vpc_id = COALESCE($6, controller_vpc_id),
                network_security_group_id = COALESCE($7, network_security_group_id),
                nsg_propagation_details = COALESCE($8, nsg_propagation_details),
                labels = COALESCE($9, labels),
                status = COALESCE($10, status),
                is_missing_on_site = COALESCE($11, is_missing_on_site),
                updated = NOW()
             WHERE id = $1 AND deleted IS NULL
             RETURNING {COLUMNS}"
        );
        let vpc = sqlx::query_as::<_, Vpc>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.nvlink_logical_partition_id)
            .bind(&input.network_virtualization_type)
            .bind(input.controller_vpc_id)
            .bind(&input.network_security_group_id)
            .bind(&input.nsg_propagation_details)
            .bind(input.labels.as_ref().map(Json))
            .bind(&input.status)
            .bind(input.is_missing_on_site)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found(ENTITY, id))?;

        tracing::debug!(id = %id, status = %vpc.status, "updated vpc");
        Ok(vpc)
    }

    /// Set the flagged columns to NULL.
    pub async fn clear<'a, A>(db: A, id: DbId, input: &ClearVpc) -> Result<Vpc, DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = db.acquire().await?;
        let sets = clear_assignments(&[
            (input.description, "description"),
            (input.controller_vpc_id, "controller_vpc_id"),
            (input.nvlink_logical_partition_id, "nvlink_logical_partition_id"),
            (input.network_security_group_id, "network_security_group_id"),
            (input.nsg_propagation_details, "nsg_propagation_details"),
            (input.labels, "labels"),
        ]);
        if sets.is_empty() {
            return Self::get_by_id(&mut *conn, id, &[]).await;
        }

        let query = format!(
            "UPDATE vpc SET {}, updated = NOW()
             WHERE id = $1 AND deleted IS NULL
             RETURNING {COLUMNS}",
            sets.join(", ")
        );
        let vpc = sqlx::query_as::<_, Vpc>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found(ENTITY, id))?;

        tracing::debug!(id = %id, cleared = sets.len(), "cleared vpc fields");
        Ok(vpc)
    }

    /// Soft-delete a VPC. Idempotent.
    pub async fn delete_by_id<'a, A>(db: A, id: DbId) -> Result<(), DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = db.acquire().await?;
        let result = sqlx::query("UPDATE vpc SET deleted = NOW() WHERE id = $1 AND deleted IS NULL")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() > 0 {
            tracing::debug!(id = %id, "deleted vpc");
        }
        Ok(())
    }

    async fn load_relations(
        conn: &mut PgConnection,
        vpcs: &mut [Vpc],
        relations: &[Relation],
    ) -> Result<(), DbError> {
        if wants(relations, Relation::InfrastructureProvider) {
            attach::<InfrastructureProvider, _>(
                conn,
                vpcs,
                |v| Some(v.infrastructure_provider_id),
                |v, p| v.infrastructure_provider = Some(Box::new(p)),
            )
            .await?;
        }
        if wants(relations, Relation::Tenant) {
            attach::<Tenant, _>(
                conn,
                vpcs,
                |v| Some(v.tenant_id),
                |v, t| v.tenant = Some(Box::new(t)),
            )
            .await?;
        }
        if wants(relations, Relation::Site) {
            attach::<Site, _>(
                conn,
                vpcs,
                |v| Some(v.site_id),
                |v, s| v.site = Some(Box::new(s)),
            )
            .await?;
        }
        Ok(())
    }
}
