//! Repository for the `expected_machine` table.
//!
//! Unlike the other entities, expected machines have caller-assigned IDs and
//! are hard-deleted. Batch create and update each run as a single statement
//! driven by `UNNEST`ed parameter arrays.

use std::collections::{HashMap, HashSet};

use carbide_core::pagination::{order_field, OrderField, PageInput};
use carbide_core::types::{DbId, Labels};
use sqlx::types::Json;
use sqlx::{Acquire, Connection, PgConnection, Postgres};
use validator::Validate;

use crate::models::expected_machine::{
    ClearExpectedMachine, CreateExpectedMachine, ExpectedMachine, ExpectedMachineFilter,
    UpdateExpectedMachine,
};
use crate::models::site::Site;
use crate::models::{wants, Relation};
use crate::repositories::filter::{clear_assignments, Filter};
use crate::repositories::relations::attach;
use crate::DbError;

const ENTITY: &str = "ExpectedMachine";

const COLUMNS: &str = "id, site_id, bmc_mac_address, chassis_serial_number, sku_id, machine_id, \
    fallback_dpu_serial_numbers, labels, created, updated, created_by";

const ORDER_FIELDS: &[OrderField] = &[
    order_field("id", "em.id"),
    order_field("site_id", "em.site_id"),
    order_field("bmc_mac_address", "em.bmc_mac_address"),
    order_field("chassis_serial_number", "em.chassis_serial_number"),
    order_field("created", "em.created"),
    order_field("updated", "em.updated"),
];

const SEARCH_COLUMNS: &[&str] = &[
    "em.bmc_mac_address",
    "em.chassis_serial_number",
    "em.sku_id",
    "em.machine_id",
    "em.fallback_dpu_serial_numbers::text",
    "em.labels::text",
];

/// Matched by `ILIKE` only, never tokenized.
const LIKE_ONLY_COLUMNS: &[&str] = &["em.id::text", "em.site_id::text"];

/// Provides CRUD operations for expected machines.
pub struct ExpectedMachineRepo;

impl ExpectedMachineRepo {
    pub async fn create<'a, A>(
        db: A,
        input: &CreateExpectedMachine,
    ) -> Result<ExpectedMachine, DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        input.validate()?;
        let mut conn = db.acquire().await?;

        let query = format!(
            "INSERT INTO expected_machine (
                id, site_id, bmc_mac_address, chassis_serial_number, sku_id, machine_id,
                fallback_dpu_serial_numbers, labels, created_by
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {COLUMNS}"
        );
        let machine = sqlx::query_as::<_, ExpectedMachine>(&query)
            .bind(input.id)
            .bind(input.site_id)
            .bind(&input.bmc_mac_address)
            .bind(&input.chassis_serial_number)
            .bind(&input.sku_id)
            .bind(&input.machine_id)
            .bind(&input.fallback_dpu_serial_numbers)
            .bind(input.labels.as_ref().map(Json))
            .bind(input.created_by)
            .fetch_one(&mut *conn)
            .await?;

        tracing::debug!(
            id = %machine.id,
            bmc_mac_address = %machine.bmc_mac_address,
            "created expected machine"
        );
        Ok(machine)
    }

    /// Insert many machines in one statement. Rows come back in input order.
    pub async fn create_multiple<'a, A>(
        db: A,
        inputs: &[CreateExpectedMachine],
    ) -> Result<Vec<ExpectedMachine>, DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        for input in inputs {
            input.validate()?;
        }

        let ids: Vec<DbId> = inputs.iter().map(|m| m.id).collect();
        let site_ids: Vec<DbId> = inputs.iter().map(|m| m.site_id).collect();
        let bmcs: Vec<String> = inputs.iter().map(|m| m.bmc_mac_address.clone()).collect();
        let serials: Vec<String> = inputs.iter().map(|m| m.chassis_serial_number.clone()).collect();
        let skus: Vec<Option<String>> = inputs.iter().map(|m| m.sku_id.clone()).collect();
        let machine_ids: Vec<Option<String>> = inputs.iter().map(|m| m.machine_id.clone()).collect();
        // text[][] must be rectangular, so per-row serial lists travel as jsonb.
        let fallbacks: Vec<Json<Vec<String>>> = inputs
            .iter()
            .map(|m| Json(m.fallback_dpu_serial_numbers.clone()))
            .collect();
        let labels: Vec<Option<Json<Labels>>> =
            inputs.iter().map(|m| m.labels.clone().map(Json)).collect();
        let created_by: Vec<DbId> = inputs.iter().map(|m| m.created_by).collect();

        let mut conn = db.acquire().await?;
        let query = format!(
            "INSERT INTO expected_machine (
                id, site_id, bmc_mac_address, chassis_serial_number, sku_id, machine_id,
                fallback_dpu_serial_numbers, labels, created_by
             )
             SELECT u.id, u.site_id, u.bmc_mac_address, u.chassis_serial_number, u.sku_id,
                    u.machine_id, ARRAY(SELECT jsonb_array_elements_text(u.fallback)),
                    u.labels, u.created_by
             FROM UNNEST(
                $1::uuid[], $2::uuid[], $3::text[], $4::text[], $5::text[], $6::text[],
                $7::jsonb[], $8::jsonb[], $9::uuid[]
             ) AS u(id, site_id, bmc_mac_address, chassis_serial_number, sku_id, machine_id,
                    fallback, labels, created_by)
             RETURNING {COLUMNS}"
        );
        let rows = sqlx::query_as::<_, ExpectedMachine>(&query)
            .bind(&ids)
            .bind(&site_ids)
            .bind(&bmcs)
            .bind(&serials)
            .bind(&skus)
            .bind(&machine_ids)
            .bind(&fallbacks)
            .bind(&labels)
            .bind(&created_by)
            .fetch_all(&mut *conn)
            .await?;

        tracing::debug!(count = rows.len(), "created expected machines");
        in_input_order(&ids, rows)
    }

    /// Find a machine by ID. `for_update` row-locks it for the surrounding transaction.
    pub async fn get<'a, A>(
        db: A,
        id: DbId,
        relations: &[Relation],
        for_update: bool,
    ) -> Result<ExpectedMachine, DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = db.acquire().await?;
        let mut query = format!("SELECT {COLUMNS} FROM expected_machine em WHERE em.id = $1");
        if for_update {
            query.push_str(" FOR UPDATE OF em");
        }
        let machine = sqlx::query_as::<_, ExpectedMachine>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found(ENTITY, id))?;

        let mut rows = [machine];
        Self::load_relations(&mut *conn, &mut rows, relations).await?;
        let [machine] = rows;
        Ok(machine)
    }

    pub async fn get_all<'a, A>(
        db: A,
        filter: &ExpectedMachineFilter,
        page: &PageInput,
        relations: &[Relation],
    ) -> Result<(Vec<ExpectedMachine>, i64), DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let page = page.resolve(ORDER_FIELDS, "em.id")?;
        if filter.ids.as_ref().is_some_and(Vec::is_empty) {
            return Ok((Vec::new(), 0));
        }

        let mut f = Filter::default();
        if let Some(ids) = &filter.ids {
            f.any("em.id", ids.clone());
        }
        if let Some(site_ids) = &filter.site_ids {
            f.any("em.site_id", site_ids.clone());
        }
        if let Some(macs) = &filter.bmc_mac_addresses {
            f.any("em.bmc_mac_address", macs.clone());
        }
        if let Some(serials) = &filter.chassis_serial_numbers {
            f.any("em.chassis_serial_number", serials.clone());
        }
        if let Some(skus) = &filter.sku_ids {
            f.any("em.sku_id", skus.clone());
        }
        if let Some(machine_ids) = &filter.machine_ids {
            f.any("em.machine_id", machine_ids.clone());
        }
        f.search_with_like_only(
            SEARCH_COLUMNS,
            LIKE_ONLY_COLUMNS,
            filter.search_query.as_deref(),
        );

        let mut conn = db.acquire().await?;
        let where_clause = f.where_clause();
        let count_query = format!("SELECT COUNT(*) FROM expected_machine em {where_clause}");
        let total: i64 = f
            .bind_scalar(sqlx::query_scalar(&count_query))
            .fetch_one(&mut *conn)
            .await?;

        let limit_idx = f.next_index();
        let query = format!(
            "SELECT {COLUMNS} FROM expected_machine em {where_clause} {order}
             LIMIT ${limit_idx} OFFSET ${}",
            limit_idx + 1,
            order = page.order_clause,
        );
        let mut rows = f
            .bind_as(sqlx::query_as::<_, ExpectedMachine>(&query))
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&mut *conn)
            .await?;

        Self::load_relations(&mut *conn, &mut rows, relations).await?;
        Ok((rows, total))
    }

    /// Update one machine. Only non-`None` fields in `input` are applied.
    pub async fn update<'a, A>(
        db: A,
        input: &UpdateExpectedMachine,
    ) -> Result<ExpectedMachine, DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = db.acquire().await?;
        let query = format!(
            "UPDATE expected_machine SET
                site_id = COALESCE($2, site_id),
                bmc_mac_address = COALESCE($3, bmc_mac_address),
                chassis_serial_number = COALESCE($4, chassis_serial_number),
                sku_id = COALESCE($5, sku_id),
                machine_id = COALESCE($6, machine_id),
                fallback_dpu_serial_numbers = COALESCE($7, fallback_dpu_serial_numbers),
                labels = COALESCE($8, labels),
                updated = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let machine = sqlx::query_as::<_, ExpectedMachine>(&query)
            .bind(input.id)
            .bind(input.site_id)
            .bind(&input.bmc_mac_address)
            .bind(&input.chassis_serial_number)
            .bind(&input.sku_id)
            .bind(&input.machine_id)
            .bind(&input.fallback_dpu_serial_numbers)
            .bind(input.labels.as_ref().map(Json))
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found(ENTITY, input.id))?;

        tracing::debug!(id = %machine.id, "updated expected machine");
        Ok(machine)
    }

    /// Update many machines in one statement. Each row only changes the
    /// fields its input provides.
    ///
    /// Rows come back in input order. If any ID does not exist nothing is
    /// changed and `DoesNotExist` names the first missing ID.
    pub async fn update_multiple<'a, A>(
        db: A,
        inputs: &[UpdateExpectedMachine],
    ) -> Result<Vec<ExpectedMachine>, DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<DbId> = inputs.iter().map(|m| m.id).collect();
        let mut seen = HashSet::with_capacity(ids.len());
        if let Some(dup) = ids.iter().find(|id| !seen.insert(**id)) {
            return Err(DbError::InvalidParams(format!(
                "expected machine {dup} appears more than once"
            )));
        }

        let site_ids: Vec<Option<DbId>> = inputs.iter().map(|m| m.site_id).collect();
        let bmcs: Vec<Option<String>> = inputs.iter().map(|m| m.bmc_mac_address.clone()).collect();
        let serials: Vec<Option<String>> =
            inputs.iter().map(|m| m.chassis_serial_number.clone()).collect();
        let skus: Vec<Option<String>> = inputs.iter().map(|m| m.sku_id.clone()).collect();
        let machine_ids: Vec<Option<String>> = inputs.iter().map(|m| m.machine_id.clone()).collect();
        let fallbacks: Vec<Option<Json<Vec<String>>>> = inputs
            .iter()
            .map(|m| m.fallback_dpu_serial_numbers.clone().map(Json))
            .collect();
        let labels: Vec<Option<Json<Labels>>> =
            inputs.iter().map(|m| m.labels.clone().map(Json)).collect();

        let mut conn = db.acquire().await?;
        let mut tx = Connection::begin(&mut *conn).await?;

        let query = format!(
            "UPDATE expected_machine em SET
                site_id = COALESCE(u.site_id, em.site_id),
                bmc_mac_address = COALESCE(u.bmc_mac_address, em.bmc_mac_address),
                chassis_serial_number = COALESCE(u.chassis_serial_number, em.chassis_serial_number),
                sku_id = COALESCE(u.sku_id, em.sku_id),
                machine_id = COALESCE(u.machine_id, em.machine_id),
                fallback_dpu_serial_numbers = CASE
                    WHEN u.fallback IS NULL THEN em.fallback_dpu_serial_numbers
                    ELSE ARRAY(SELECT jsonb_array_elements_text(u.fallback))
                END,
                labels = COALESCE(u.labels, em.labels),
                updated = NOW()
             FROM UNNEST(
                $1::uuid[], $2::uuid[], $3::text[], $4::text[], $5::text[], $6::text[],
                $7::jsonb[], $8::jsonb[]
             ) AS u(id, site_id, bmc_mac_address, chassis_serial_number, sku_id, machine_id,
                    fallback, labels)
             WHERE em.id = u.id
             RETURNING {}",
            qualified("em")
        );
        let rows = sqlx::query_as::<_, ExpectedMachine>(&query)
            .bind(&ids)
            .bind(&site_ids)
            .bind(&bmcs)
            .bind(&serials)
            .bind(&skus)
            .bind(&machine_ids)
            .bind(&fallbacks)
            .bind(&labels)
            .fetch_all(&mut *tx)
            .await?;

        let machines = in_input_order(&ids, rows)?;
        tx.commit().await?;

        tracing::debug!(count = machines.len(), "updated expected machines");
        Ok(machines)
    }

    /// Reset the flagged columns. Fallback serials reset to an empty list.
    pub async fn clear<'a, A>(
        db: A,
        id: DbId,
        input: &ClearExpectedMachine,
    ) -> Result<ExpectedMachine, DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = db.acquire().await?;
        let mut sets = clear_assignments(&[
            (input.sku_id, "sku_id"),
            (input.machine_id, "machine_id"),
            (input.labels, "labels"),
        ]);
        if input.fallback_dpu_serial_numbers {
            sets.push("fallback_dpu_serial_numbers = '{}'".to_string());
        }
        if sets.is_empty() {
            return Self::get(&mut *conn, id, &[], false).await;
        }

        let query = format!(
            "UPDATE expected_machine SET {}, updated = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}",
            sets.join(", ")
        );
        let machine = sqlx::query_as::<_, ExpectedMachine>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found(ENTITY, id))?;

        tracing::debug!(id = %id, cleared = sets.len(), "cleared expected machine fields");
        Ok(machine)
    }

    /// Permanently delete a machine. Deleting a missing row is a no-op.
    pub async fn delete<'a, A>(db: A, id: DbId) -> Result<(), DbError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = db.acquire().await?;
        let result = sqlx::query("DELETE FROM expected_machine WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() > 0 {
            tracing::debug!(id = %id, "deleted expected machine");
        }
        Ok(())
    }

    async fn load_relations(
        conn: &mut PgConnection,
        rows: &mut [ExpectedMachine],
        relations: &[Relation],
    ) -> Result<(), DbError> {
        if wants(relations, Relation::Site) {
            attach::<Site, _>(
                conn,
                rows,
                |m| Some(m.site_id),
                |m, s| m.site = Some(Box::new(s)),
            )
            .await?;
        }
        Ok(())
    }
}

/// `COLUMNS` prefixed with `alias.`, for statements where names would be ambiguous.
fn qualified(alias: &str) -> String {
    COLUMNS
        .split(',')
        .map(|c| format!("{alias}.{}", c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Reorder `rows` to follow `ids`, failing on the first ID with no row.
fn in_input_order(
    ids: &[DbId],
    rows: Vec<ExpectedMachine>,
) -> Result<Vec<ExpectedMachine>, DbError> {
    let mut by_id: HashMap<DbId, ExpectedMachine> =
        rows.into_iter().map(|m| (m.id, m)).collect();
    ids.iter()
        .map(|id| by_id.remove(id).ok_or_else(|| DbError::not_found(ENTITY, id)))
        .collect()
}
