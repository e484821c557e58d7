//! Repository for the `site` table.

use std::collections::BTreeMap;

use carbide_core::pagination::{order_field, OrderField, PageInput};
use carbide_core::status::{self, ensure_valid};
use carbide_core::types::DbId;
use sqlx::types::Json;
use sqlx::{Acquire, PgConnection, Postgres};
use validator::Validate;

use crate::models::infrastructure_provider::InfrastructureProvider;
use crate::models::site::{ClearSite, CreateSite, Site, SiteFilter, UpdateSite};
use crate::models::{wants, Relation};
use crate::repositories::filter::{clear_assignments, Filter};
use crate::repositories::relations::{attach, Loadable};
use crate::DbError;

const ENTITY: &str = "Site";

const COLUMNS: &str = "id, name, display_name, description, org, infrastructure_provider_id, \
    site_controller_version, site_agent_version, registration_token, registration_token_expiration, \
    is_infinity_enabled, serial_console_hostname, is_serial_console_enabled, \
    serial_console_idle_timeout, serial_console_max_session_length, config, location, contact, \
    status, created, updated, created_by";

const ORDER_FIELDS: &[OrderField] = &[
    order_field("name", "s.name"),
    order_field("status", "s.status"),
    order_field("created", "s.created"),
    order_field("updated", "s.updated"),
];

const SEARCH_COLUMNS: &[&str] = &["s.name", "s.display_name", "s.description", "s.status"];

impl Loadable for Site {
    const TABLE: &'static str = "site";
    const COLUMNS: &'static str = COLUMNS;

    fn id(&self) -> DbId {
        self.id
    }
}

/// Provides CRUD operations for sites.
pub struct SiteRepo;

impl SiteRepo {
    /// Insert a new site, returning the created row.
    pub async fn create<'a, A>(db: A, input: &CreateSite) -> Result<Site, DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        input.validate()?;
        ensure_valid("site status", status::site::ALL, &input.status)?;
        let mut conn = db.acquire().await?;

        let query = format!(
            "INSERT INTO site (
                id, name, display_name, description, org, infrastructure_provider_id,
                site_controller_version, site_agent_version, registration_token,
                registration_token_expiration, is_infinity_enabled, serial_console_hostname,
                is_serial_console_enabled, serial_console_idle_timeout,
                serial_console_max_session_length, config, location, contact, status, created_by
             ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                $11, $12, $13, $14, $15, $16, $17, $18, $19, $20
             )
             RETURNING {COLUMNS}"
        );
        let site = sqlx::query_as::<_, Site>(&query)
            .bind(DbId::new_v4())
            .bind(&input.name)
            .bind(&input.display_name)
            .bind(&input.description)
            .bind(&input.org)
            .bind(input.infrastructure_provider_id)
            .bind(&input.site_controller_version)
            .bind(&input.site_agent_version)
            .bind(&input.registration_token)
            .bind(input.registration_token_expiration)
            .bind(input.is_infinity_enabled)
            .bind(&input.serial_console_hostname)
            .bind(input.is_serial_console_enabled)
            .bind(input.serial_console_idle_timeout)
            .bind(input.serial_console_max_session_length)
            .bind(input.config.as_ref().map(Json))
            .bind(input.location.as_ref().map(Json))
            .bind(input.contact.as_ref().map(Json))
            .bind(&input.status)
            .bind(input.created_by)
            .fetch_one(&mut *conn)
            .await?;

        tracing::debug!(id = %site.id, name = %site.name, "created site");
        Ok(site)
    }

    /// Find a live site by ID, loading the requested relations.
    pub async fn get_by_id<'a, A>(
        db: A,
        id: DbId,
        relations: &[Relation],
    ) -> Result<Site, DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = db.acquire().await?;
        let query = format!("SELECT {COLUMNS} FROM site WHERE id = $1 AND deleted IS NULL");
        let site = sqlx::query_as::<_, Site>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found(ENTITY, id))?;

        let mut sites = [site];
        Self::load_relations(&mut *conn, &mut sites, relations).await?;
        let [site] = sites;
        Ok(site)
    }

    /// List live sites matching `filter`, with the total count before pagination.
    pub async fn get_all<'a, A>(
        db: A,
        filter: &SiteFilter,
        page: &PageInput,
        relations: &[Relation],
    ) -> Result<(Vec<Site>, i64), DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let page = page.resolve(ORDER_FIELDS, "s.id")?;
        let mut conn = db.acquire().await?;

        let mut f = Filter::live("s");
        if let Some(name) = &filter.name {
            f.eq("s.name", name.as_str());
        }
        if let Some(org) = &filter.org {
            f.eq("s.org", org.as_str());
        }
        if let Some(provider_id) = filter.infrastructure_provider_id {
            f.eq("s.infrastructure_provider_id", provider_id);
        }
        if let Some(ids) = &filter.site_ids {
            f.any("s.id", ids.clone());
        }
        if let Some(statuses) = &filter.statuses {
            f.any("s.status", statuses.clone());
        }
        if let Some(tenant_ids) = &filter.tenant_ids {
            let p = f.placeholder(tenant_ids.clone());
            f.raw(format!(
                "EXISTS (SELECT 1 FROM tenant_site ts
                         WHERE ts.site_id = s.id AND ts.deleted IS NULL AND ts.tenant_id = ANY({p}))"
            ));
        }
        if let Some(enabled) = filter.is_serial_console_enabled {
            f.eq("s.is_serial_console_enabled", enabled);
        }
        f.search(SEARCH_COLUMNS, filter.search_query.as_deref());

        let where_clause = f.where_clause();
        let count_query = format!("SELECT COUNT(*) FROM site s {where_clause}");
        let total: i64 = f
            .bind_scalar(sqlx::query_scalar(&count_query))
            .fetch_one(&mut *conn)
            .await?;

        let limit_idx = f.next_index();
        let offset_idx = limit_idx + 1;
        let query = format!(
            "SELECT {COLUMNS} FROM site s {where_clause} {order}
             LIMIT ${limit_idx} OFFSET ${offset_idx}",
            order = page.order_clause,
        );
        let mut sites = f
            .bind_as(sqlx::query_as::<_, Site>(&query))
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&mut *conn)
            .await?;

        Self::load_relations(&mut *conn, &mut sites, relations).await?;
        Ok((sites, total))
    }

    /// Count live sites per status, optionally for one provider.
    ///
    /// Every known status is present in the result, plus a `total` key.
    pub async fn get_count_by_status<'a, A>(
        db: A,
        infrastructure_provider_id: Option<DbId>,
    ) -> Result<BTreeMap<String, i64>, DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = db.acquire().await?;
        let mut f = Filter::live("s");
        if let Some(provider_id) = infrastructure_provider_id {
            f.eq("s.infrastructure_provider_id", provider_id);
        }

        let query = format!(
            "SELECT s.status, COUNT(*) FROM site s {} GROUP BY s.status",
            f.where_clause()
        );
        let rows = f
            .bind_as(sqlx::query_as::<_, (String, i64)>(&query))
            .fetch_all(&mut *conn)
            .await?;
        Ok(status::status_counts(status::site::ALL, &rows))
    }

    /// Update a site. Only non-`None` fields in `input` are applied.
    pub async fn update<'a, A>(db: A, id: DbId, input: &UpdateSite) -> Result<Site, DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        if let Some(s) = &input.status {
            ensure_valid("site status", status::site::ALL, s)?;
        }
        let mut conn = db.acquire().await?;

        let query = format!(
            "UPDATE site SET
                name = COALESCE($2, name),
                display_name = COALESCE($3, display_name),
                description = COALESCE($4, description),
                org = COALESCE($5, org),
                infrastructure_provider_id = COALESCE($6, infrastructure_provider_id),
                site_controller_version = COALESCE($7, site_controller_version),
                site_agent_version = COALESCE($8, site_agent_version),
                registration_token = COALESCE($9, registration_token),
                registration_token_expiration = COALESCE($10, registration_token_expiration),
                is_infinity_enabled = COALESCE($11, is_infinity_enabled),
                serial_console_hostname = COALESCE($12, serial_console_hostname),
                is_serial_console_enabled = COALESCE($13, is_serial_console_enabled),
                serial_console_idle_timeout = COALESCE($14, serial_console_idle_timeout),
                serial_console_max_session_length = COALESCE($15, serial_console_max_session_length),
                config = COALESCE($16, config),
                location = COALESCE($17, location),
                contact = COALESCE($18, contact),
                status = COALESCE($19, status),
                updated = NOW()
             WHERE id = $1 AND deleted IS NULL
             RETURNING {COLUMNS}"
        );
        let site = sqlx::query_as::<_, Site>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.display_name)
            .bind(&input.description)
            .bind(&input.org)
            .bind(input.infrastructure_provider_id)
            .bind(&input.site_controller_version)
            .bind(&input.site_agent_version)
            .bind(&input.registration_token)
            .bind(input.registration_token_expiration)
            .bind(input.is_infinity_enabled)
            .bind(&input.serial_console_hostname)
            .bind(input.is_serial_console_enabled)
            .bind(input.serial_console_idle_timeout)
            .bind(input.serial_console_max_session_length)
            .bind(input.config.as_ref().map(Json))
            .bind(input.location.as_ref().map(Json))
            .bind(input.contact.as_ref().map(Json))
            .bind(&input.status)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found(ENTITY, id))?;

        tracing::debug!(id = %id, "updated site");
        Ok(site)
    }

    /// Set the flagged columns to NULL. With no flags set the row is returned unchanged.
    pub async fn clear<'a, A>(db: A, id: DbId, input: &ClearSite) -> Result<Site, DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = db.acquire().await?;
        let sets = clear_assignments(&[
            (input.display_name, "display_name"),
            (input.description, "description"),
            (input.site_controller_version, "site_controller_version"),
            (input.site_agent_version, "site_agent_version"),
            (input.registration_token, "registration_token"),
            (input.registration_token_expiration, "registration_token_expiration"),
            (input.serial_console_hostname, "serial_console_hostname"),
            (input.serial_console_idle_timeout, "serial_console_idle_timeout"),
            (input.serial_console_max_session_length, "serial_console_max_session_length"),
            (input.config, "config"),
            (input.location, "location"),
            (input.contact, "contact"),
        ]);
        if sets.is_empty() {
            return Self::get_by_id(&mut *conn, id, &[]).await;
        }

        let query = format!(
            "UPDATE site SET {}, updated = NOW()
             WHERE id = $1 AND deleted IS NULL
             RETURNING {COLUMNS}",
            sets.join(", ")
        );
        let site = sqlx::query_as::<_, Site>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found(ENTITY, id))?;

        tracing::debug!(id = %id, cleared = sets.len(), "cleared site fields");
        Ok(site)
    }

    /// Soft-delete a site. Idempotent.
    pub async fn delete_by_id<'a, A>(db: A, id: DbId) -> Result<(), DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = db.acquire().await?;
        let result =
            sqlx::query("UPDATE site SET deleted = NOW() WHERE id = $1 AND deleted IS NULL")
                .bind(id)
                .execute(&mut *conn)
                .await?;

        if result.rows_affected() > 0 {
            tracing::debug!(id = %id, "deleted site");
        }
        Ok(())
    }

    async fn load_relations(
        conn: &mut PgConnection,
        sites: &mut [Site],
        relations: &[Relation],
    ) -> Result<(), DbError> {
        if wants(relations, Relation::InfrastructureProvider) {
            attach::<InfrastructureProvider, _>(
                conn,
                sites,
                |s| Some(s.infrastructure_provider_id),
                |s, p| s.infrastructure_provider = Some(Box::new(p)),
            )
            .await?;
        }
        Ok(())
    }
}
