//! Offset/limit pagination and validated ordering for list queries.
//!
//! Every list query in the repository layer goes through [`PageInput::resolve`],
//! which turns caller input into a bounded `LIMIT`/`OFFSET` pair and an
//! `ORDER BY` clause built only from whitelisted SQL expressions.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Page size used when the caller does not provide a limit.
pub const DEFAULT_LIMIT: i64 = 20;

/// Hard cap on page size. Callers that want "everything" ask for this.
pub const TOTAL_LIMIT: i64 = 1000;

/// Field every entity is ordered by when no order is requested.
pub const DEFAULT_ORDER_FIELD: &str = "created";

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

impl OrderDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        }
    }
}

/// A caller-supplied ordering request. `field` is the public name, never SQL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    #[serde(default)]
    pub direction: OrderDirection,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Desc,
        }
    }
}

/// Maps a public order-by name to the SQL expression used in `ORDER BY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderField {
    pub name: &'static str,
    pub column: &'static str,
}

/// Shorthand for building `OrderField` tables in `const` context.
pub const fn order_field(name: &'static str, column: &'static str) -> OrderField {
    OrderField { name, column }
}

// ---------------------------------------------------------------------------
// Page input
// ---------------------------------------------------------------------------

/// Pagination parameters accepted by every `get_all` repository method.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageInput {
    pub offset: Option<i64>,
    pub limit: Option<i64>,
    pub order_by: Option<OrderBy>,
}

/// Pagination resolved against an entity's order-field table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPage {
    pub offset: i64,
    pub limit: i64,
    /// Complete clause including the `ORDER BY` keyword.
    pub order_clause: String,
}

impl PageInput {
    /// A first page of `limit` rows in default order.
    pub fn with_limit(limit: i64) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    /// A single page as large as the hard cap allows.
    pub fn all() -> Self {
        Self::with_limit(TOTAL_LIMIT)
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn order_by(mut self, order_by: OrderBy) -> Self {
        self.order_by = Some(order_by);
        self
    }

    /// Validate the requested ordering and clamp offset/limit.
    ///
    /// - With no `order_by`, rows are ordered by [`DEFAULT_ORDER_FIELD`] ascending.
    /// - A non-default primary field gets the default field appended as a
    ///   secondary key.
    /// - `id_column` is always appended last (unless it is already the primary
    ///   key) so that pages never overlap.
    ///
    /// Returns `CoreError::Validation` if `order_by.field` is not in `fields`.
    pub fn resolve(
        &self,
        fields: &[OrderField],
        id_column: &str,
    ) -> Result<ResolvedPage, CoreError> {
        let requested = self
            .order_by
            .clone()
            .unwrap_or_else(|| OrderBy::asc(DEFAULT_ORDER_FIELD));

        let primary = lookup(fields, &requested.field)?;
        let mut terms = vec![format!("{} {}", primary.column, requested.direction.as_sql())];

        if primary.name != DEFAULT_ORDER_FIELD {
            let default = lookup(fields, DEFAULT_ORDER_FIELD)?;
            terms.push(format!("{} ASC", default.column));
        }
        if primary.column != id_column {
            terms.push(format!("{id_column} ASC"));
        }

        Ok(ResolvedPage {
            offset: clamp_offset(self.offset),
            limit: clamp_limit(self.limit, DEFAULT_LIMIT, TOTAL_LIMIT),
            order_clause: format!("ORDER BY {}", terms.join(", ")),
        })
    }
}

fn lookup<'a>(fields: &'a [OrderField], name: &str) -> Result<&'a OrderField, CoreError> {
    fields.iter().find(|f| f.name == name).ok_or_else(|| {
        let allowed: Vec<&str> = fields.iter().map(|f| f.name).collect();
        CoreError::Validation(format!(
            "invalid order by field '{name}', must be one of: {}",
            allowed.join(", ")
        ))
    })
}

/// Clamp a user-provided limit to valid bounds.
pub fn clamp_limit(limit: Option<i64>, default: i64, max: i64) -> i64 {
    limit.unwrap_or(default).max(1).min(max)
}

/// Clamp a user-provided offset to non-negative.
pub fn clamp_offset(offset: Option<i64>) -> i64 {
    offset.unwrap_or(0).max(0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const FIELDS: &[OrderField] = &[
        order_field("name", "v.name"),
        order_field("status", "v.status"),
        order_field("created", "v.created"),
        order_field("updated", "v.updated"),
    ];

    // -- resolve -------------------------------------------------------------

    #[test]
    fn default_order_is_created_ascending() {
        let page = PageInput::default().resolve(FIELDS, "v.id").unwrap();
        assert_eq!(page.order_clause, "ORDER BY v.created ASC, v.id ASC");
        assert_eq!(page.limit, DEFAULT_LIMIT);
        assert_eq!(page.offset, 0);
    }

    #[test]
    fn non_default_field_gets_created_as_secondary_key() {
        let page = PageInput::default()
            .order_by(OrderBy::desc("name"))
            .resolve(FIELDS, "v.id")
            .unwrap();
        assert_eq!(
            page.order_clause,
            "ORDER BY v.name DESC, v.created ASC, v.id ASC"
        );
    }

    #[test]
    fn explicit_created_descending_is_not_duplicated() {
        let page = PageInput::default()
            .order_by(OrderBy::desc("created"))
            .resolve(FIELDS, "v.id")
            .unwrap();
        assert_eq!(page.order_clause, "ORDER BY v.created DESC, v.id ASC");
    }

    #[test]
    fn ordering_by_id_skips_tie_breaker() {
        let fields = [
            order_field("id", "em.id"),
            order_field("created", "em.created"),
        ];
        let page = PageInput::default()
            .order_by(OrderBy::asc("id"))
            .resolve(&fields, "em.id")
            .unwrap();
        assert_eq!(page.order_clause, "ORDER BY em.id ASC, em.created ASC");
    }

    #[test]
    fn unknown_field_is_rejected() {
        let err = PageInput::default()
            .order_by(OrderBy::asc("v.name; DROP TABLE vpc"))
            .resolve(FIELDS, "v.id")
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(err.to_string().contains("name, status, created, updated"));
    }

    #[test]
    fn limit_and_offset_are_clamped() {
        let page = PageInput::with_limit(50_000)
            .offset(-3)
            .resolve(FIELDS, "v.id")
            .unwrap();
        assert_eq!(page.limit, TOTAL_LIMIT);
        assert_eq!(page.offset, 0);
    }

    #[test]
    fn all_requests_total_limit() {
        assert_eq!(PageInput::all().limit, Some(TOTAL_LIMIT));
    }

    // -- direction -----------------------------------------------------------

    #[test]
    fn direction_deserializes_uppercase() {
        let order: OrderBy =
            serde_json::from_str(r#"{"field":"name","direction":"DESC"}"#).unwrap();
        assert_eq!(order, OrderBy::desc("name"));
    }

    #[test]
    fn direction_defaults_to_asc() {
        let order: OrderBy = serde_json::from_str(r#"{"field":"name"}"#).unwrap();
        assert_eq!(order, OrderBy::asc("name"));
    }

    // -- clamp_limit ---------------------------------------------------------

    #[test]
    fn clamp_limit_uses_default_when_none() {
        assert_eq!(clamp_limit(None, 20, 100), 20);
    }

    #[test]
    fn clamp_limit_floors_at_one() {
        assert_eq!(clamp_limit(Some(-5), 20, 100), 1);
        assert_eq!(clamp_limit(Some(0), 20, 100), 1);
    }

    // -- clamp_offset --------------------------------------------------------

    #[test]
    fn clamp_offset_passes_through_valid_value() {
        assert_eq!(clamp_offset(Some(40)), 40);
    }
}
