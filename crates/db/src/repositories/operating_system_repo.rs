//! Repository for the `operating_system` table.

use carbide_core::pagination::{order_field, OrderField, PageInput};
use carbide_core::status::{self, ensure_valid};
use carbide_core::types::DbId;
use sqlx::{Acquire, PgConnection, Postgres};
use validator::Validate;

use crate::models::infrastructure_provider::InfrastructureProvider;
use crate::models::operating_system::{
    ClearOperatingSystem, CreateOperatingSystem, OperatingSystem, OperatingSystemFilter,
    UpdateOperatingSystem,
};
use crate::models::tenant::Tenant;
use crate::models::{wants, Relation};
use crate::repositories::filter::{clear_assignments, Filter};
use crate::repositories::relations::{attach, Loadable};
use crate::DbError;

const ENTITY: &str = "OperatingSystem";

const COLUMNS: &str = "id, name, description, org, infrastructure_provider_id, tenant_id, \
    controller_operating_system_id, version, type, image_url, image_sha, image_auth_type, \
    image_auth_token, image_disk, root_fs_id, root_fs_label, ipxe_script, user_data, \
    is_cloud_init, allow_override, enable_block_storage, phone_home_enabled, is_active, \
    deactivation_note, status, created, updated, created_by";

const ORDER_FIELDS: &[OrderField] = &[
    order_field("name", "os.name"),
    order_field("version", "os.version"),
    order_field("status", "os.status"),
    order_field("is_cloud_init", "os.is_cloud_init"),
    order_field("created", "os.created"),
    order_field("updated", "os.updated"),
];

const SEARCH_COLUMNS: &[&str] = &["os.name", "os.description", "os.status"];

impl Loadable for OperatingSystem {
    const TABLE: &'static str = "operating_system";
    const COLUMNS: &'static str = COLUMNS;

    fn id(&self) -> DbId {
        self.id
    }
}

/// Provides CRUD operations for operating systems.
pub struct OperatingSystemRepo;

impl OperatingSystemRepo {
    /// Insert a new operating system. It starts active.
    pub async fn create<'a, A>(
        db: A,
        input: &CreateOperatingSystem,
    ) -> Result<OperatingSystem, DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        input.validate()?;
        ensure_valid("operating system status", status::operating_system::ALL, &input.status)?;
        ensure_valid("operating system type", status::operating_system::TYPES, &input.os_type)?;
        if let Some(auth) = &input.image_auth_type {
            ensure_valid("image auth type", status::operating_system::AUTH_TYPES, auth)?;
        }
        let mut conn = db.acquire().await?;

        let query = format!(
            "INSERT INTO operating_system (
                id, name, description, org, infrastructure_provider_id, tenant_id,
                controller_operating_system_id, version, type, image_url, image_sha,
                image_auth_type, image_auth_token, image_disk, root_fs_id, root_fs_label,
                ipxe_script, user_data, is_cloud_init, allow_override, enable_block_storage,
                phone_home_enabled, is_active, status, created_by
             ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                $17, $18, $19, $20, $21, $22, TRUE, $23, $24
             )
             RETURNING {COLUMNS}"
        );
        let os = sqlx::query_as::<_, OperatingSystem>(&query)
            .bind(DbId::new_v4())
            .bind(&input.name)
            .bind(&input.description)
            .bind(&input.org)
            .bind(input.infrastructure_provider_id)
            .bind(input.tenant_id)
            .bind(input.controller_operating_system_id)
            .bind(&input.version)
            .bind(&input.os_type)
            .bind(&input.image_url)
            .bind(&input.image_sha)
            .bind(&input.image_auth_type)
            .bind(&input.image_auth_token)
            .bind(&input.image_disk)
            .bind(&input.root_fs_id)
            .bind(&input.root_fs_label)
            .bind(&input.ipxe_script)
            .bind(&input.user_data)
            .bind(input.is_cloud_init)
            .bind(input.allow_override)
            .bind(input.enable_block_storage)
            .bind(input.phone_home_enabled)
            .bind(&input.status)
            .bind(input.created_by)
            .fetch_one(&mut *conn)
            .await?;

        tracing::debug!(id = %os.id, os_type = %os.os_type, "created operating system");
        Ok(os)
    }

    pub async fn get_by_id<'a, A>(
        db: A,
        id: DbId,
        relations: &[Relation],
    ) -> Result<OperatingSystem, DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = db.acquire().await?;
        let query =
            format!("SELECT {COLUMNS} FROM operating_system WHERE id = $1 AND deleted IS NULL");
        let os = sqlx::query_as::<_, OperatingSystem>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found(ENTITY, id))?;

        let mut rows = [os];
        Self::load_relations(&mut *conn, &mut rows, relations).await?;
        let [os] = rows;
        Ok(os)
    }

    /// List live operating systems matching `filter`.
    ///
    /// With `site_ids`, systems with no live site association count as
    /// available everywhere and are included.
    pub async fn get_all<'a, A>(
        db: A,
        filter: &OperatingSystemFilter,
        page: &PageInput,
        relations: &[Relation],
    ) -> Result<(Vec<OperatingSystem>, i64), DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let page = page.resolve(ORDER_FIELDS, "os.id")?;
        if filter
            .operating_system_ids
            .as_ref()
            .is_some_and(Vec::is_empty)
        {
            return Ok((Vec::new(), 0));
        }

        let mut f = Filter::live("os");
        if let Some(provider_id) = filter.infrastructure_provider_id {
            f.eq("os.infrastructure_provider_id", provider_id);
        }
        if let Some(tenant_ids) = &filter.tenant_ids {
            f.any("os.tenant_id", tenant_ids.clone());
        }
        if let Some(site_ids) = &filter.site_ids {
            let p = f.placeholder(site_ids.clone());
            f.raw(format!(
                "(NOT EXISTS (SELECT 1 FROM operating_system_site_association ossa
                              WHERE ossa.operating_system_id = os.id AND ossa.deleted IS NULL)
                  OR EXISTS (SELECT 1 FROM operating_system_site_association ossa
                             WHERE ossa.operating_system_id = os.id AND ossa.deleted IS NULL
                               AND ossa.site_id = ANY({p})))"
            ));
        }
        if let Some(names) = &filter.names {
            f.any("os.name", names.clone());
        }
        if let Some(orgs) = &filter.orgs {
            f.any("os.org", orgs.clone());
        }
        if let Some(types) = &filter.os_types {
            f.any("os.type", types.clone());
        }
        if let Some(statuses) = &filter.statuses {
            f.any("os.status", statuses.clone());
        }
        if let Some(ids) = &filter.operating_system_ids {
            f.any("os.id", ids.clone());
        }
        if let Some(active) = filter.is_active {
            f.eq("os.is_active", active);
        }
        f.search(SEARCH_COLUMNS, filter.search_query.as_deref());

        let mut conn = db.acquire().await?;
        let where_clause = f.where_clause();
        let count_query = format!("SELECT COUNT(*) FROM operating_system os {where_clause}");
        let total: i64 = f
            .bind_scalar(sqlx::query_scalar(&count_query))
            .fetch_one(&mut *conn)
            .await?;

        let limit_idx = f.next_index();
        let query = format!(
            "SELECT {COLUMNS} FROM operating_system os {where_clause} {order}
             LIMIT ${limit_idx} OFFSET ${}",
            limit_idx + 1,
            order = page.order_clause,
        );
        let mut rows = f
            .bind_as(sqlx::query_as::<_, OperatingSystem>(&query))
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
        input: &UpdateOperatingSystem,
    ) -> Result<OperatingSystem, DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        if let Some(s) = &input.status {
            ensure_valid("operating system status", status::operating_system::ALL, s)?;
        }
        if let Some(auth) = &input.image_auth_type {
            ensure_valid("image auth type", status::operating_system::AUTH_TYPES, auth)?;
        }
        let mut conn = db.acquire().await?;

        let query = format!(
            "UPDATE operating_system SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                controller_operating_system_id = COALESCE($4, controller_operating_system_id),
                version = COALESCE($5, version),
                image_url = COALESCE($6, image_url),
                image_sha = COALESCE($7, image_sha),
                image_auth_type = COALESCE($8, image_auth_type),
                image_auth_token = COALESCE($9, image_auth_token),
                image_disk = COALESCE($10, image_disk),
                root_fs_id = COALESCE($11, root_fs_id),
                root_fs_label = COALESCE($12, root_fs_label),
                ipxe_script = COALESCE($13, ipxe_script),
                user_data = COALESCE($14, user_data),
                is_cloud_init = COALESCE($15, is_cloud_init),
                allow_override = COALESCE($16, allow_override),
                enable_block_storage = COALESCE($17, enable_block_storage),
                phone_home_enabled = COALESCE($18, phone_home_enabled),
                is_active = COALESCE($19, is_active),
                deactivation_note = COALESCE($20, deactivation_note),
                status = COALESCE($21, status),
                updated = NOW()
             WHERE id = $1 AND deleted IS NULL
             RETURNING {COLUMNS}"
        );
        let os = sqlx::query_as::<_, OperatingSystem>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.controller_operating_system_id)
            .bind(&input.version)
            .bind(&input.image_url)
            .bind(&input.image_sha)
            .bind(&input.image_auth_type)
            .bind(&input.image_auth_token)
            .bind(&input.image_disk)
            .bind(&input.root_fs_id)
            .bind(&input.root_fs_label)
            .bind(&input.ipxe_script)
            .bind(&input.user_data)
            .bind(input.is_cloud_init)
            .bind(input.allow_override)
            .bind(input.enable_block_storage)
            .bind(input.phone_home_enabled)
            .bind(input.is_active)
            .bind(&input.deactivation_note)
            .bind(&input.status)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found(ENTITY, id))?;

        tracing::debug!(id = %id, is_active = os.is_active, "updated operating system");
        Ok(os)
    }

    pub async fn clear<'a, A>(
        db: A,
        id: DbId,
        input: &ClearOperatingSystem,
    ) -> Result<OperatingSystem, DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = db.acquire().await?;
        let sets = clear_assignments(&[
            (input.description, "description"),
            (input.infrastructure_provider_id, "infrastructure_provider_id"),
            (input.tenant_id, "tenant_id"),
            (input.controller_operating_system_id, "controller_operating_system_id"),
            (input.version, "version"),
            (input.image_url, "image_url"),
            (input.image_sha, "image_sha"),
            (input.image_auth_type, "image_auth_type"),
            (input.image_auth_token, "image_auth_token"),
            (input.image_disk, "image_disk"),
            (input.root_fs_id, "root_fs_id"),
            (input.root_fs_label, "root_fs_label"),
            (input.ipxe_script, "ipxe_script"),
            (input.user_data, "user_data"),
            (input.deactivation_note, "deactivation_note"),
        ]);
        if sets.is_empty() {
            return Self::get_by_id(&mut *conn, id, &[]).await;
        }

        let query = format!(
            "UPDATE operating_system SET {}, updated = NOW()
             WHERE id = $1 AND deleted IS NULL
             RETURNING {COLUMNS}",
            sets.join(", ")
        );
        let os = sqlx::query_as::<_, OperatingSystem>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found(ENTITY, id))?;

        tracing::debug!(id = %id, cleared = sets.len(), "cleared operating system fields");
        Ok(os)
    }

    pub async fn delete_by_id<'a, A>(db: A, id: DbId) -> Result<(), DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = db.acquire().await?;
        let result = sqlx::query(
            "UPDATE operating_system SET deleted = NOW() WHERE id = $1 AND deleted IS NULL",
        )
        .bind(id)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() > 0 {
            tracing::debug!(id = %id, "deleted operating system");
        }
        Ok(())
    }

    async fn load_relations(
        conn: &mut PgConnection,
        rows: &mut [OperatingSystem],
        relations: &[Relation],
    ) -> Result<(), DbError> {
        if wants(relations, Relation::InfrastructureProvider) {
            attach::<InfrastructureProvider, _>(
                conn,
                rows,
                |os| os.infrastructure_provider_id,
                |os, p| os.infrastructure_provider = Some(Box::new(p)),
            )
            .await?;
        }
        if wants(relations, Relation::Tenant) {
            attach::<Tenant, _>(conn, rows, |os| os.tenant_id, |os, t| {
                os.tenant = Some(Box::new(t))
            })
            .await?;
        }
        Ok(())
    }
}
