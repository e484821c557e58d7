//! Repository for the `infiniband_partition` table.

use carbide_core::pagination::{order_field, OrderField, PageInput};
use carbide_core::status::{self, ensure_valid};
use carbide_core::types::DbId;
use sqlx::types::Json;
use sqlx::{Acquire, PgConnection, Postgres};
use validator::Validate;

use crate::models::infiniband_partition::{
    ClearInfiniBandPartition, CreateInfiniBandPartition, InfiniBandPartition,
    InfiniBandPartitionFilter, UpdateInfiniBandPartition,
};
use crate::models::site::Site;
use crate::models::tenant::Tenant;
use crate::models::{wants, Relation};
use crate::repositories::filter::{clear_assignments, Filter};
use crate::repositories::relations::attach;
use crate::DbError;

const ENTITY: &str = "InfiniBandPartition";

const COLUMNS: &str = "id, name, description, org, site_id, tenant_id, controller_ib_partition_id, \
    partition_key, partition_name, service_level, rate_limit, mtu, enable_sharp, labels, status, \
    is_missing_on_site, created, updated, created_by";

const ORDER_FIELDS: &[OrderField] = &[
    order_field("name", "ibp.name"),
    order_field("status", "ibp.status"),
    order_field("created", "ibp.created"),
    order_field("updated", "ibp.updated"),
];

const SEARCH_COLUMNS: &[&str] = &[
    "ibp.name",
    "ibp.description",
    "ibp.partition_name",
    "ibp.partition_key",
    "ibp.status",
    "ibp.labels::text",
];

/// Provides CRUD operations for InfiniBand partitions.
pub struct InfiniBandPartitionRepo;

impl InfiniBandPartitionRepo {
    /// Insert a new partition. A caller-supplied `id` is kept, otherwise one is generated.
    pub async fn create<'a, A>(
        db: A,
        input: &CreateInfiniBandPartition,
    ) -> Result<InfiniBandPartition, DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        input.validate()?;
        ensure_valid(
            "InfiniBand partition status",
            status::infiniband_partition::ALL,
            &input.status,
        )?;
        let mut conn = db.acquire().await?;

        let query = format!(
            "INSERT INTO infiniband_partition (
                id, name, description, org, site_id, tenant_id, controller_ib_partition_id,
                partition_key, partition_name, service_level, rate_limit, mtu, enable_sharp,
                labels, status, created_by
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
             RETURNING {COLUMNS}"
        );
        let partition = sqlx::query_as::<_, InfiniBandPartition>(&query)
            .bind(input.id.unwrap_or_else(DbId::new_v4))
            .bind(&input.name)
            .bind(&input.description)
            .bind(&input.org)
            .bind(input.site_id)
            .bind(input.tenant_id)
            .bind(input.controller_ib_partition_id)
            .bind(&input.partition_key)
            .bind(&input.partition_name)
            .bind(input.service_level)
            .bind(input.rate_limit)
            .bind(input.mtu)
            .bind(input.enable_sharp)
            .bind(input.labels.as_ref().map(Json))
            .bind(&input.status)
            .bind(input.created_by)
            .fetch_one(&mut *conn)
            .await?;

        tracing::debug!(id = %partition.id, site_id = %partition.site_id, "created infiniband partition");
        Ok(partition)
    }

    pub async fn get_by_id<'a, A>(
        db: A,
        id: DbId,
        relations: &[Relation],
    ) -> Result<InfiniBandPartition, DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = db.acquire().await?;
        let query =
            format!("SELECT {COLUMNS} FROM infiniband_partition WHERE id = $1 AND deleted IS NULL");
        let partition = sqlx::query_as::<_, InfiniBandPartition>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found(ENTITY, id))?;

        let mut rows = [partition];
        Self::load_relations(&mut *conn, &mut rows, relations).await?;
        let [partition] = rows;
        Ok(partition)
    }

    pub async fn get_all<'a, A>(
        db: A,
        filter: &InfiniBandPartitionFilter,
        page: &PageInput,
        relations: &[Relation],
    ) -> Result<(Vec<InfiniBandPartition>, i64), DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let page = page.resolve(ORDER_FIELDS, "ibp.id")?;
        if filter.ids.as_ref().is_some_and(Vec::is_empty) {
            return Ok((Vec::new(), 0));
        }

        let mut f = Filter::live("ibp");
        if let Some(ids) = &filter.ids {
            f.any("ibp.id", ids.clone());
        }
        if let Some(names) = &filter.names {
            f.any("ibp.name", names.clone());
        }
        if let Some(site_ids) = &filter.site_ids {
            f.any("ibp.site_id", site_ids.clone());
        }
        if let Some(orgs) = &filter.tenant_orgs {
            f.any("ibp.org", orgs.clone());
        }
        if let Some(tenant_ids) = &filter.tenant_ids {
            f.any("ibp.tenant_id", tenant_ids.clone());
        }
        if let Some(statuses) = &filter.statuses {
            f.any("ibp.status", statuses.clone());
        }
        if let Some(names) = &filter.partition_names {
            f.any("ibp.partition_name", names.clone());
        }
        if let Some(keys) = &filter.partition_keys {
            f.any("ibp.partition_key", keys.clone());
        }
        if let Some(sharp) = filter.sharp_enabled {
            f.eq("ibp.enable_sharp", sharp);
        }
        f.search(SEARCH_COLUMNS, filter.search_query.as_deref());

        let mut conn = db.acquire().await?;
        let where_clause = f.where_clause();
        let count_query = format!("SELECT COUNT(*) FROM infiniband_partition ibp {where_clause}");
        let total: i64 = f
            .bind_scalar(sqlx::query_scalar(&count_query))
            .fetch_one(&mut *conn)
            .await?;

        let limit_idx = f.next_index();
        let query = format!(
            "SELECT {COLUMNS} FROM infiniband_partition ibp {where_clause} {order}
             LIMIT ${limit_idx} OFFSET ${}",
            limit_idx + 1,
            order = page.order_clause,
        );
        let mut rows = f
            .bind_as(sqlx::query_as::<_, InfiniBandPartition>(&query))
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
        input: &UpdateInfiniBandPartition,
    ) -> Result<InfiniBandPartition, DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        if let Some(s) = &input.status {
            ensure_valid("InfiniBand partition status", status::infiniband_partition::ALL, s)?;
        }
        let mut conn = db.acquire().await?;

        let query = format!(
            "UPDATE infiniband_partition SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                controller_ib_partition_id = COALESCE($4, controller_ib_partition_id),
                partition_key = COALESCE($5, partition_key),
                partition_name = COALESCE($6, partition_name),
                service_level = COALESCE($7, service_level),
                rate_limit = COALESCE($8, rate_limit),
                mtu = COALESCE($9, mtu),
                enable_sharp = COALESCE($10, enable_sharp),
                labels = COALESCE($11, labels),
                status = COALESCE($12, status),
                is_missing_on_site = COALESCE($13, is_missing_on_site),
                updated = NOW()
             WHERE id = $1 AND deleted IS NULL
             RETURNING {COLUMNS}"
        );
        let partition = sqlx::query_as::<_, InfiniBandPartition>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.controller_ib_partition_id)
            .bind(&input.partition_key)
            .bind(&input.partition_name)
            .bind(input.service_level)
            .bind(input.rate_limit)
            .bind(input.mtu)
            .bind(input.enable_sharp)
            .bind(input.labels.as_ref().map(Json))
            .bind(&input.status)
            .bind(input.is_missing_on_site)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found(ENTITY, id))?;

        tracing::debug!(id = %id, "updated infiniband partition");
        Ok(partition)
    }

    pub async fn clear<'a, A>(
        db: A,
        id: DbId,
        input: &ClearInfiniBandPartition,
    ) -> Result<InfiniBandPartition, DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = db.acquire().await?;
        let sets = clear_assignments(&[
            (input.description, "description"),
            (input.controller_ib_partition_id, "controller_ib_partition_id"),
            (input.partition_key, "partition_key"),
            (input.partition_name, "partition_name"),
            (input.service_level, "service_level"),
            (input.rate_limit, "rate_limit"),
            (input.mtu, "mtu"),
            (input.enable_sharp, "enable_sharp"),
            (input.labels, "labels"),
        ]);
        if sets.is_empty() {
            return Self::get_by_id(&mut *conn, id, &[]).await;
        }

        let query = format!(
            "UPDATE infiniband_partition SET {}, updated = NOW()
             WHERE id = $1 AND deleted IS NULL
             RETURNING {COLUMNS}",
            sets.join(", ")
        );
        let partition = sqlx::query_as::<_, InfiniBandPartition>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found(ENTITY, id))?;

        tracing::debug!(id = %id, cleared = sets.len(), "cleared infiniband partition fields");
        Ok(partition)
    }

    pub async fn delete_by_id<'a, A>(db: A, id: DbId) -> Result<(), DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = db.acquire().await?;
        let result = sqlx::query(
            "UPDATE infiniband_partition SET deleted = NOW() WHERE id = $1 AND deleted IS NULL",
        )
        .bind(id)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() > 0 {
            tracing::debug!(id = %id, "deleted infiniband partition");
        }
        Ok(())
    }

    async fn load_relations(
        conn: &mut PgConnection,
        rows: &mut [InfiniBandPartition],
        relations: &[Relation],
    ) -> Result<(), DbError> {
        if wants(relations, Relation::Tenant) {
            attach::<Tenant, _>(
                conn,
                rows,
                |p| Some(p.tenant_id),
                |p, t| p.tenant = Some(Box::new(t)),
            )
            .await?;
        }
        if wants(relations, Relation::Site) {
            attach::<Site, _>(
                conn,
                rows,
                |p| Some(p.site_id),
                |p, s| p.site = Some(Box::new(s)),
            )
            .await?;
        }
        Ok(())
    }
}
