//! Repository for the `tenant_site` table.

use carbide_core::pagination::{order_field, OrderField, PageInput};
use carbide_core::types::DbId;
use sqlx::{Acquire, PgConnection, Postgres};

use crate::models::site::Site;
use crate::models::tenant::Tenant;
use crate::models::tenant_site::{CreateTenantSite, TenantSite, TenantSiteFilter, UpdateTenantSite};
use crate::models::{wants, Relation};
use crate::repositories::filter::Filter;
use crate::repositories::relations::attach;
use crate::DbError;

const ENTITY: &str = "TenantSite";

const COLUMNS: &str = "id, tenant_id, tenant_org, site_id, enable_serial_console, config, \
    created, updated, created_by";

const ORDER_FIELDS: &[OrderField] = &[
    order_field("created", "ts.created"),
    order_field("updated", "ts.updated"),
];

/// Provides CRUD operations for tenant-site associations.
///
/// At most one live association exists per tenant and site; a second
/// `create` fails with a unique violation.
pub struct TenantSiteRepo;

impl TenantSiteRepo {
    pub async fn create<'a, A>(db: A, input: &CreateTenantSite) -> Result<TenantSite, DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        if input.tenant_org.trim().is_empty() {
            return Err(DbError::InvalidParams("tenant_org must not be empty".into()));
        }
        let mut conn = db.acquire().await?;

        let query = format!(
            "INSERT INTO tenant_site (id, tenant_id, tenant_org, site_id, enable_serial_console, config, created_by)
             VALUES ($1, $2, $3, $4, $5, COALESCE($6, '{{}}'::jsonb), $7)
             RETURNING {COLUMNS}"
        );
        let tenant_site = sqlx::query_as::<_, TenantSite>(&query)
            .bind(DbId::new_v4())
            .bind(input.tenant_id)
            .bind(&input.tenant_org)
            .bind(input.site_id)
            .bind(input.enable_serial_console)
            .bind(&input.config)
            .bind(input.created_by)
            .fetch_one(&mut *conn)
            .await?;

        tracing::debug!(
            id = %tenant_site.id,
            tenant_id = %tenant_site.tenant_id,
            site_id = %tenant_site.site_id,
            "created tenant site"
        );
        Ok(tenant_site)
    }

    pub async fn get_by_id<'a, A>(
        db: A,
        id: DbId,
        relations: &[Relation],
    ) -> Result<TenantSite, DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = db.acquire().await?;
        let query = format!("SELECT {COLUMNS} FROM tenant_site WHERE id = $1 AND deleted IS NULL");
        let tenant_site = sqlx::query_as::<_, TenantSite>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found(ENTITY, id))?;

        let mut rows = [tenant_site];
        Self::load_relations(&mut *conn, &mut rows, relations).await?;
        let [tenant_site] = rows;
        Ok(tenant_site)
    }

    /// The live association between `tenant_id` and `site_id`.
    pub async fn get_by_tenant_id_and_site_id<'a, A>(
        db: A,
        tenant_id: DbId,
        site_id: DbId,
        relations: &[Relation],
    ) -> Result<TenantSite, DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = db.acquire().await?;
        let query = format!(
            "SELECT {COLUMNS} FROM tenant_site
             WHERE tenant_id = $1 AND site_id = $2 AND deleted IS NULL"
        );
        let tenant_site = sqlx::query_as::<_, TenantSite>(&query)
            .bind(tenant_id)
            .bind(site_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found(ENTITY, format!("tenant {tenant_id} / site {site_id}")))?;

        let mut rows = [tenant_site];
        Self::load_relations(&mut *conn, &mut rows, relations).await?;
        let [tenant_site] = rows;
        Ok(tenant_site)
    }

    /// List live associations matching `filter`, with the total count before pagination.
    ///
    /// `config_key` and `config_value` must be given together.
    pub async fn get_all<'a, A>(
        db: A,
        filter: &TenantSiteFilter,
        page: &PageInput,
        relations: &[Relation],
    ) -> Result<(Vec<TenantSite>, i64), DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let page = page.resolve(ORDER_FIELDS, "ts.id")?;

        let mut f = Filter::live("ts");
        if let Some(tenant_ids) = &filter.tenant_ids {
            f.any("ts.tenant_id", tenant_ids.clone());
        }
        if let Some(orgs) = &filter.tenant_orgs {
            f.any("ts.tenant_org", orgs.clone());
        }
        if let Some(site_ids) = &filter.site_ids {
            f.any("ts.site_id", site_ids.clone());
        }
        match (&filter.config_key, &filter.config_value) {
            (Some(key), Some(value)) => {
                let k = f.placeholder(key.as_str());
                let v = f.placeholder(value.as_str());
                f.raw(format!("ts.config ->> {k} = {v}"));
            }
            (None, None) => {}
            _ => {
                return Err(DbError::InvalidParams(
                    "config_key and config_value must be provided together".into(),
                ))
            }
        }

        let mut conn = db.acquire().await?;
        let where_clause = f.where_clause();
        let count_query = format!("SELECT COUNT(*) FROM tenant_site ts {where_clause}");
        let total: i64 = f
            .bind_scalar(sqlx::query_scalar(&count_query))
            .fetch_one(&mut *conn)
            .await?;

        let limit_idx = f.next_index();
        let query = format!(
            "SELECT {COLUMNS} FROM tenant_site ts {where_clause} {order}
             LIMIT ${limit_idx} OFFSET ${}",
            limit_idx + 1,
            order = page.order_clause,
        );
        let mut rows = f
            .bind_as(sqlx::query_as::<_, TenantSite>(&query))
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
        input: &UpdateTenantSite,
    ) -> Result<TenantSite, DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = db.acquire().await?;
        let query = format!(
            "UPDATE tenant_site SET
                enable_serial_console = COALESCE($2, enable_serial_console),
                config = COALESCE($3, config),
                updated = NOW()
             WHERE id = $1 AND deleted IS NULL
             RETURNING {COLUMNS}"
        );
        let tenant_site = sqlx::query_as::<_, TenantSite>(&query)
            .bind(id)
            .bind(input.enable_serial_console)
            .bind(&input.config)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found(ENTITY, id))?;

        tracing::debug!(id = %id, "updated tenant site");
        Ok(tenant_site)
    }

    /// Soft-delete an association. Idempotent.
    pub async fn delete_by_id<'a, A>(db: A, id: DbId) -> Result<(), DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = db.acquire().await?;
        let result =
            sqlx::query("UPDATE tenant_site SET deleted = NOW() WHERE id = $1 AND deleted IS NULL")
                .bind(id)
                .execute(&mut *conn)
                .await?;

        if result.rows_affected() > 0 {
            tracing::debug!(id = %id, "deleted tenant site");
        }
        Ok(())
    }

    async fn load_relations(
        conn: &mut PgConnection,
        rows: &mut [TenantSite],
        relations: &[Relation],
    ) -> Result<(), DbError> {
        if wants(relations, Relation::Tenant) {
            attach::<Tenant, _>(
                conn,
                rows,
                |ts| Some(ts.tenant_id),
                |ts, t| ts.tenant = Some(Box::new(t)),
            )
            .await?;
        }
        if wants(relations, Relation::Site) {
            attach::<Site, _>(
                conn,
                rows,
                |ts| Some(ts.site_id),
                |ts, s| ts.site = Some(Box::new(s)),
            )
            .await?;
        }
        Ok(())
    }
}
