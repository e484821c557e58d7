//! Repository for the `infrastructure_provider` table.

use carbide_core::types::DbId;
use sqlx::{Acquire, Postgres};
use validator::Validate;

use crate::models::infrastructure_provider::{
    CreateInfrastructureProvider, InfrastructureProvider, UpdateInfrastructureProvider,
};
use crate::repositories::relations::Loadable;
use crate::DbError;

const ENTITY: &str = "InfrastructureProvider";

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, display_name, org, org_display_name, created, updated, created_by";

impl Loadable for InfrastructureProvider {
    const TABLE: &'static str = "infrastructure_provider";
    const COLUMNS: &'static str = COLUMNS;

    fn id(&self) -> DbId {
        self.id
    }
}

/// Provides CRUD operations for infrastructure providers.
pub struct InfrastructureProviderRepo;

impl InfrastructureProviderRepo {
    /// Insert a new provider, returning the created row.
    pub async fn create<'a, A>(
        db: A,
        input: &CreateInfrastructureProvider,
    ) -> Result<InfrastructureProvider, DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        input.validate()?;
        let mut conn = db.acquire().await?;

        let query = format!(
            "INSERT INTO infrastructure_provider (id, name, display_name, org, org_display_name, created_by)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        let provider = sqlx::query_as::<_, InfrastructureProvider>(&query)
            .bind(DbId::new_v4())
            .bind(&input.name)
            .bind(&input.display_name)
            .bind(&input.org)
            .bind(&input.org_display_name)
            .bind(input.created_by)
            .fetch_one(&mut *conn)
            .await?;

        tracing::debug!(id = %provider.id, org = %provider.org, "created infrastructure provider");
        Ok(provider)
    }

    /// Find a live provider by ID.
    pub async fn get_by_id<'a, A>(db: A, id: DbId) -> Result<InfrastructureProvider, DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = db.acquire().await?;
        let query =
            format!("SELECT {COLUMNS} FROM infrastructure_provider WHERE id = $1 AND deleted IS NULL");
        sqlx::query_as::<_, InfrastructureProvider>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found(ENTITY, id))
    }

    /// All live providers belonging to `org`, oldest first.
    pub async fn get_all_by_org<'a, A>(
        db: A,
        org: &str,
    ) -> Result<Vec<InfrastructureProvider>, DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = db.acquire().await?;
        let query = format!(
            "SELECT {COLUMNS} FROM infrastructure_provider
             WHERE org = $1 AND deleted IS NULL
             ORDER BY created ASC, id ASC"
        );
        Ok(sqlx::query_as::<_, InfrastructureProvider>(&query)
            .bind(org)
            .fetch_all(&mut *conn)
            .await?)
    }

    /// Update a provider. Only non-`None` fields in `input` are applied.
    pub async fn update<'a, A>(
        db: A,
        id: DbId,
        input: &UpdateInfrastructureProvider,
    ) -> Result<InfrastructureProvider, DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = db.acquire().await?;
        let query = format!(
            "UPDATE infrastructure_provider SET
                name = COALESCE($2, name),
                display_name = COALESCE($3, display_name),
                org_display_name = COALESCE($4, org_display_name),
                updated = NOW()
             WHERE id = $1 AND deleted IS NULL
             RETURNING {COLUMNS}"
        );
        let provider = sqlx::query_as::<_, InfrastructureProvider>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.display_name)
            .bind(&input.org_display_name)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found(ENTITY, id))?;

        tracing::debug!(id = %id, "updated infrastructure provider");
        Ok(provider)
    }

    /// Soft-delete a provider. Deleting a missing or deleted row is a no-op.
    pub async fn delete_by_id<'a, A>(db: A, id: DbId) -> Result<(), DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = db.acquire().await?;
        let result = sqlx::query(
            "UPDATE infrastructure_provider SET deleted = NOW() WHERE id = $1 AND deleted IS NULL",
        )
        .bind(id)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() > 0 {
            tracing::debug!(id = %id, "deleted infrastructure provider");
        }
        Ok(())
    }
}
