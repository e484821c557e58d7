//! Batch loading of parent rows for [`Relation`](crate::models::Relation)s.
//!
//! One `id = ANY($1)` query per requested relation, regardless of how many
//! rows are being decorated.

use std::collections::HashMap;

use carbide_core::types::DbId;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgConnection};

use crate::DbError;

/// A soft-deletable row that can be attached to its children.
pub(crate) trait Loadable: for<'r> FromRow<'r, PgRow> + Clone + Send + Unpin {
    const TABLE: &'static str;
    const COLUMNS: &'static str;

    fn id(&self) -> DbId;
}

/// Load live rows of `T` keyed by id. Deleted parents are left out.
pub(crate) async fn load_by_ids<T: Loadable>(
    conn: &mut PgConnection,
    mut ids: Vec<DbId>,
) -> Result<HashMap<DbId, T>, DbError> {
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let query = format!(
        "SELECT {} FROM {} WHERE id = ANY($1) AND deleted IS NULL",
        T::COLUMNS,
        T::TABLE
    );
    let rows = sqlx::query_as::<_, T>(&query)
        .bind(&ids)
        .fetch_all(&mut *conn)
        .await?;

    Ok(rows.into_iter().map(|row| (row.id(), row)).collect())
}

/// Load the parents referenced by `key` and hand each one to `set`.
pub(crate) async fn attach<P, R>(
    conn: &mut PgConnection,
    rows: &mut [R],
    key: impl Fn(&R) -> Option<DbId>,
    set: impl Fn(&mut R, P),
) -> Result<(), DbError>
where
    P: Loadable,
{
    let ids: Vec<DbId> = rows.iter().filter_map(&key).collect();
    let parents = load_by_ids::<P>(conn, ids).await?;
    for row in rows.iter_mut() {
        if let Some(parent) = key(row).and_then(|id| parents.get(&id)) {
            set(row, parent.clone());
        }
    }
    Ok(())
}
