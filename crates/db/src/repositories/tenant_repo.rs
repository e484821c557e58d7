//! Repository for the `tenant` table.

use carbide_core::types::DbId;
use sqlx::types::Json;
use sqlx::{Acquire, Postgres};
use validator::Validate;

use crate::models::tenant::{CreateTenant, Tenant, UpdateTenant};
use crate::repositories::relations::Loadable;
use crate::DbError;

const ENTITY: &str = "Tenant";

const COLUMNS: &str =
    "id, name, display_name, org, org_display_name, config, created, updated, created_by";

impl Loadable for Tenant {
    const TABLE: &'static str = "tenant";
    const COLUMNS: &'static str = COLUMNS;

    fn id(&self) -> DbId {
        self.id
    }
}

/// Provides CRUD operations for tenants.
pub struct TenantRepo;

impl TenantRepo {
    /// Insert a new tenant, returning the created row.
    pub async fn create<'a, A>(db: A, input: &CreateTenant) -> Result<Tenant, DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        input.validate()?;
        let mut conn = db.acquire().await?;

        let query = format!(
            "INSERT INTO tenant (id, name, display_name, org, org_display_name, config, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        let tenant = sqlx::query_as::<_, Tenant>(&query)
            .bind(DbId::new_v4())
            .bind(&input.name)
            .bind(&input.display_name)
            .bind(&input.org)
            .bind(&input.org_display_name)
            .bind(Json(input.config.clone().unwrap_or_default()))
            .bind(input.created_by)
            .fetch_one(&mut *conn)
            .await?;

        tracing::debug!(id = %tenant.id, org = %tenant.org, "created tenant");
        Ok(tenant)
    }

    pub async fn get_by_id<'a, A>(db: A, id: DbId) -> Result<Tenant, DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = db.acquire().await?;
        let query = format!("SELECT {COLUMNS} FROM tenant WHERE id = $1 AND deleted IS NULL");
        sqlx::query_as::<_, Tenant>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found(ENTITY, id))
    }

    /// All live tenants belonging to `org`, oldest first.
    pub async fn get_all_by_org<'a, A>(db: A, org: &str) -> Result<Vec<Tenant>, DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = db.acquire().await?;
        let query = format!(
            "SELECT {COLUMNS} FROM tenant
             WHERE org = $1 AND deleted IS NULL
             ORDER BY created ASC, id ASC"
        );
        Ok(sqlx::query_as::<_, Tenant>(&query)
            .bind(org)
            .fetch_all(&mut *conn)
            .await?)
    }

    /// Update a tenant. A provided `config` replaces the stored one wholesale.
    pub async fn update<'a, A>(db: A, id: DbId, input: &UpdateTenant) -> Result<Tenant, DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = db.acquire().await?;
        let query = format!(
            "UPDATE tenant SET
                name = COALESCE($2, name),
                display_name = COALESCE($3, display_name),
                org_display_name = COALESCE($4, org_display_name),
                config = COALESCE($5, config),
                updated = NOW()
             WHERE id = $1 AND deleted IS NULL
             RETURNING {COLUMNS}"
        );
        let tenant = sqlx::query_as::<_, Tenant>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.display_name)
            .bind(&input.org_display_name)
            .bind(input.config.as_ref().map(Json))
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found(ENTITY, id))?;

        tracing::debug!(id = %id, "updated tenant");
        Ok(tenant)
    }

    /// Soft-delete a tenant. Idempotent.
    pub async fn delete_by_id<'a, A>(db: A, id: DbId) -> Result<(), DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = db.acquire().await?;
        let result =
            sqlx::query("UPDATE tenant SET deleted = NOW() WHERE id = $1 AND deleted IS NULL")
                .bind(id)
                .execute(&mut *conn)
                .await?;

        if result.rows_affected() > 0 {
            tracing::debug!(id = %id, "deleted tenant");
        }
        Ok(())
    }
}
