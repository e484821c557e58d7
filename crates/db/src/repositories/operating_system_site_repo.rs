//! Repository for the `operating_system_site_association` table.

use carbide_core::pagination::{order_field, OrderField, PageInput};
use carbide_core::status::{self, ensure_valid};
use carbide_core::types::DbId;
use sha2::{Digest, Sha256};
use sqlx::{Acquire, PgConnection, Postgres};

use crate::models::operating_system_site::{
    CreateOperatingSystemSiteAssociation, OperatingSystemSiteAssociation,
    OperatingSystemSiteAssociationFilter, UpdateOperatingSystemSiteAssociation,
};
use crate::models::operating_system::OperatingSystem;
use crate::models::site::Site;
use crate::models::{wants, Relation};
use crate::repositories::filter::Filter;
use crate::repositories::relations::attach;
use crate::DbError;

const ENTITY: &str = "OperatingSystemSiteAssociation";

const COLUMNS: &str = "id, operating_system_id, site_id, version, status, is_missing_on_site, \
    created, updated, created_by";

const ORDER_FIELDS: &[OrderField] = &[
    order_field("status", "ossa.status"),
    order_field("created", "ossa.created"),
    order_field("updated", "ossa.updated"),
];

/// Provides CRUD operations for operating system site associations.
pub struct OperatingSystemSiteRepo;

impl OperatingSystemSiteRepo {
    pub async fn create<'a, A>(
        db: A,
        input: &CreateOperatingSystemSiteAssociation,
    ) -> Result<OperatingSystemSiteAssociation, DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        ensure_valid(
            "operating system site status",
            status::operating_system_site::ALL,
            &input.status,
        )?;
        let mut conn = db.acquire().await?;

        let query = format!(
            "INSERT INTO operating_system_site_association
                (id, operating_system_id, site_id, version, status, created_by)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        let association = sqlx::query_as::<_, OperatingSystemSiteAssociation>(&query)
            .bind(DbId::new_v4())
            .bind(input.operating_system_id)
            .bind(input.site_id)
            .bind(&input.version)
            .bind(&input.status)
            .bind(input.created_by)
            .fetch_one(&mut *conn)
            .await?;

        tracing::debug!(
            id = %association.id,
            operating_system_id = %association.operating_system_id,
            site_id = %association.site_id,
            "created operating system site association"
        );
        Ok(association)
    }

    pub async fn get_by_id<'a, A>(
        db: A,
        id: DbId,
        relations: &[Relation],
    ) -> Result<OperatingSystemSiteAssociation, DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = db.acquire().await?;
        let query = format!(
            "SELECT {COLUMNS} FROM operating_system_site_association WHERE id = $1 AND deleted IS NULL"
        );
        let association = sqlx::query_as::<_, OperatingSystemSiteAssociation>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found(ENTITY, id))?;

        let mut rows = [association];
        Self::load_relations(&mut *conn, &mut rows, relations).await?;
        let [association] = rows;
        Ok(association)
    }

    /// Fetch the live association between an operating system and a site.
    pub async fn get_by_operating_system_id_and_site_id<'a, A>(
        db: A,
        operating_system_id: DbId,
        site_id: DbId,
        relations: &[Relation],
    ) -> Result<OperatingSystemSiteAssociation, DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = db.acquire().await?;
        let query = format!(
            "SELECT {COLUMNS} FROM operating_system_site_association
             WHERE operating_system_id = $1 AND site_id = $2 AND deleted IS NULL"
        );
        let association = sqlx::query_as::<_, OperatingSystemSiteAssociation>(&query)
            .bind(operating_system_id)
            .bind(site_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| {
                DbError::not_found(
                    ENTITY,
                    format!("operating system {operating_system_id} / site {site_id}"),
                )
            })?;

        let mut rows = [association];
        Self::load_relations(&mut *conn, &mut rows, relations).await?;
        let [association] = rows;
        Ok(association)
    }

    pub async fn get_all<'a, A>(
        db: A,
        filter: &OperatingSystemSiteAssociationFilter,
        page: &PageInput,
        relations: &[Relation],
    ) -> Result<(Vec<OperatingSystemSiteAssociation>, i64), DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let page = page.resolve(ORDER_FIELDS, "ossa.id")?;

        let mut f = Filter::live("ossa");
        if let Some(ids) = &filter.operating_system_ids {
            f.any("ossa.operating_system_id", ids.clone());
        }
        if let Some(site_ids) = &filter.site_ids {
            f.any("ossa.site_id", site_ids.clone());
        }
        if let Some(versions) = &filter.versions {
            f.any("ossa.version", versions.clone());
        }
        if let Some(statuses) = &filter.statuses {
            f.any("ossa.status", statuses.clone());
        }

        let mut conn = db.acquire().await?;
        let where_clause = f.where_clause();
        let count_query =
            format!("SELECT COUNT(*) FROM operating_system_site_association ossa {where_clause}");
        let total: i64 = f
            .bind_scalar(sqlx::query_scalar(&count_query))
            .fetch_one(&mut *conn)
            .await?;

        let limit_idx = f.next_index();
        let query = format!(
            "SELECT {COLUMNS} FROM operating_system_site_association ossa {where_clause} {order}
             LIMIT ${limit_idx} OFFSET ${}",
            limit_idx + 1,
            order = page.order_clause,
        );
        let mut rows = f
            .bind_as(sqlx::query_as::<_, OperatingSystemSiteAssociation>(&query))
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
        input: &UpdateOperatingSystemSiteAssociation,
    ) -> Result<OperatingSystemSiteAssociation, DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        if let Some(s) = &input.status {
            ensure_valid("operating system site status", status::operating_system_site::ALL, s)?;
        }
        let mut conn = db.acquire().await?;

        let query = format!(
            "UPDATE operating_system_site_association SET
                version = COALESCE($2, version),
                status = COALESCE($3, status),
                is_missing_on_site = COALESCE($4, is_missing_on_site),
                updated = NOW()
             WHERE id = $1 AND deleted IS NULL
             RETURNING {COLUMNS}"
        );
        let association = sqlx::query_as::<_, OperatingSystemSiteAssociation>(&query)
            .bind(id)
            .bind(&input.version)
            .bind(&input.status)
            .bind(input.is_missing_on_site)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found(ENTITY, id))?;

        tracing::debug!(id = %id, status = %association.status, "updated operating system site association");
        Ok(association)
    }

    /// Recompute the association's version from its operating system's image
    /// settings and store it.
    ///
    /// The version only changes when one of the hashed image fields changes.
    pub async fn generate_and_update_version<'a, A>(
        db: A,
        id: DbId,
    ) -> Result<OperatingSystemSiteAssociation, DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = db.acquire().await?;
        let association = Self::get_by_id(&mut *conn, id, &[Relation::OperatingSystem]).await?;
        let version = image_version(
            association.operating_system_id,
            association.operating_system.as_deref(),
        );

        let update = UpdateOperatingSystemSiteAssociation {
            version: Some(version),
            ..Default::default()
        };
        Self::update(&mut *conn, id, &update).await
    }

    pub async fn delete_by_id<'a, A>(db: A, id: DbId) -> Result<(), DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = db.acquire().await?;
        let result = sqlx::query(
            "UPDATE operating_system_site_association SET deleted = NOW()
             WHERE id = $1 AND deleted IS NULL",
        )
        .bind(id)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() > 0 {
            tracing::debug!(id = %id, "deleted operating system site association");
        }
        Ok(())
    }

    async fn load_relations(
        conn: &mut PgConnection,
        rows: &mut [OperatingSystemSiteAssociation],
        relations: &[Relation],
    ) -> Result<(), DbError> {
        if wants(relations, Relation::OperatingSystem) {
            attach::<OperatingSystem, _>(
                conn,
                rows,
                |a| Some(a.operating_system_id),
                |a, os| a.operating_system = Some(Box::new(os)),
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

/// Hex SHA-256 over the operating system id and the image fields a site
/// needs to re-sync on. A missing operating system hashes the id alone.
fn image_version(operating_system_id: DbId, os: Option<&OperatingSystem>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(operating_system_id.to_string().as_bytes());
    if let Some(os) = os {
        let fields = [
            &os.image_url,
            &os.image_sha,
            &os.image_auth_type,
            &os.image_auth_token,
            &os.image_disk,
            &os.root_fs_id,
            &os.root_fs_label,
        ];
        for value in fields.into_iter().flatten() {
            hasher.update(value.as_bytes());
        }
        hasher.update([u8::from(os.enable_block_storage)]);
    }
    format!("{:x}", hasher.finalize())
}
