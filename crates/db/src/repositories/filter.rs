//! Dynamic WHERE-clause construction shared by the `get_all` queries.
//!
//! Conditions are pushed as SQL fragments with `$n` placeholders while the
//! matching values are collected as [`BindValue`]s, then bound in order once
//! the final query string is known.

use carbide_core::search::{build_tsquery, ilike_pattern, normalize_query, TS_CONFIG};
use carbide_core::types::DbId;
use sqlx::postgres::PgArguments;
use sqlx::query::{QueryAs, QueryScalar};
use sqlx::Postgres;

/// Typed bind value for dynamically-built queries.
#[derive(Debug, Clone)]
pub(crate) enum BindValue {
    Id(DbId),
    Ids(Vec<DbId>),
    Text(String),
    Texts(Vec<String>),
    Int(i32),
    Ints(Vec<i32>),
    Bool(bool),
}

impl From<DbId> for BindValue {
    fn from(v: DbId) -> Self {
        BindValue::Id(v)
    }
}

impl From<Vec<DbId>> for BindValue {
    fn from(v: Vec<DbId>) -> Self {
        BindValue::Ids(v)
    }
}

impl From<String> for BindValue {
    fn from(v: String) -> Self {
        BindValue::Text(v)
    }
}

impl From<&str> for BindValue {
    fn from(v: &str) -> Self {
        BindValue::Text(v.to_string())
    }
}

impl From<Vec<String>> for BindValue {
    fn from(v: Vec<String>) -> Self {
        BindValue::Texts(v)
    }
}

impl From<i32> for BindValue {
    fn from(v: i32) -> Self {
        BindValue::Int(v)
    }
}

impl From<Vec<i32>> for BindValue {
    fn from(v: Vec<i32>) -> Self {
        BindValue::Ints(v)
    }
}

impl From<bool> for BindValue {
    fn from(v: bool) -> Self {
        BindValue::Bool(v)
    }
}

/// Accumulates AND-ed conditions and their bind values.
#[derive(Debug, Default)]
pub(crate) struct Filter {
    conditions: Vec<String>,
    binds: Vec<BindValue>,
}

impl Filter {
    /// Start a filter for a soft-deletable table aliased as `alias`.
    pub fn live(alias: &str) -> Self {
        let mut filter = Self::default();
        filter.raw(format!("{alias}.deleted IS NULL"));
        filter
    }

    /// Register a bind value and return its `$n` placeholder.
    pub fn placeholder(&mut self, value: impl Into<BindValue>) -> String {
        self.binds.push(value.into());
        format!("${}", self.binds.len())
    }

    /// Index the next placeholder pushed after this filter will get.
    pub fn next_index(&self) -> usize {
        self.binds.len() + 1
    }

    pub fn raw(&mut self, condition: impl Into<String>) {
        self.conditions.push(condition.into());
    }

    /// `column = $n`
    pub fn eq(&mut self, column: &str, value: impl Into<BindValue>) {
        let p = self.placeholder(value);
        self.conditions.push(format!("{column} = {p}"));
    }

    /// `column = ANY($n)`
    pub fn any(&mut self, column: &str, values: impl Into<BindValue>) {
        let p = self.placeholder(values);
        self.conditions.push(format!("{column} = ANY({p})"));
    }

    /// Free-text match over `columns`: full-text OR per-column `ILIKE`.
    ///
    /// Blank queries add nothing.
    pub fn search(&mut self, columns: &[&str], query: Option<&str>) {
        self.search_with_like_only(columns, &[], query);
    }

    /// Like [`Filter::search`], with extra columns that are only matched by
    /// `ILIKE` and stay out of the full-text document.
    pub fn search_with_like_only(
        &mut self,
        columns: &[&str],
        like_only: &[&str],
        query: Option<&str>,
    ) {
        let Some(query) = normalize_query(query) else {
            return;
        };

        let mut alternatives = Vec::with_capacity(columns.len() + like_only.len() + 1);
        if let Some(tsquery) = build_tsquery(query) {
            let document = columns
                .iter()
                .map(|c| format!("coalesce({c}, ' ')"))
                .collect::<Vec<_>>()
                .join(" || ' ' || ");
            let p = self.placeholder(tsquery);
            alternatives.push(format!(
                "to_tsvector('{TS_CONFIG}', {document}) @@ to_tsquery('{TS_CONFIG}', {p})"
            ));
        }

        let p = self.placeholder(ilike_pattern(query));
        for column in columns.iter().chain(like_only) {
            alternatives.push(format!("{column} ILIKE {p}"));
        }

        self.conditions.push(format!("({})", alternatives.join(" OR ")));
    }

    /// Empty when no conditions were pushed, otherwise starts with `WHERE `.
    pub fn where_clause(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.conditions.join(" AND "))
        }
    }

    /// Bind every collected value to a `QueryAs`.
    pub fn bind_as<'q, O>(
        &'q self,
        mut q: QueryAs<'q, Postgres, O, PgArguments>,
    ) -> QueryAs<'q, Postgres, O, PgArguments> {
        for val in &self.binds {
            q = match val {
                BindValue::Id(v) => q.bind(*v),
                BindValue::Ids(v) => q.bind(v.clone()),
                BindValue::Text(v) => q.bind(v.as_str()),
                BindValue::Texts(v) => q.bind(v.clone()),
                BindValue::Int(v) => q.bind(*v),
                BindValue::Ints(v) => q.bind(v.clone()),
                BindValue::Bool(v) => q.bind(*v),
            };
        }
        q
    }

    /// Bind every collected value to a `QueryScalar`.
    pub fn bind_scalar<'q, O>(
        &'q self,
        mut q: QueryScalar<'q, Postgres, O, PgArguments>,
    ) -> QueryScalar<'q, Postgres, O, PgArguments> {
        for val in &self.binds {
            q = match val {
                BindValue::Id(v) => q.bind(*v),
                BindValue::Ids(v) => q.bind(v.clone()),
                BindValue::Text(v) => q.bind(v.as_str()),
                BindValue::Texts(v) => q.bind(v.clone()),
                BindValue::Int(v) => q.bind(*v),
                BindValue::Ints(v) => q.bind(v.clone()),
                BindValue::Bool(v) => q.bind(*v),
            };
        }
        q
    }
}

/// `col = NULL` assignments for every flagged column.
pub(crate) fn clear_assignments(flags: &[(bool, &str)]) -> Vec<String> {
    flags
        .iter()
        .filter(|(set, _)| *set)
        .map(|(_, column)| format!("{column} = NULL"))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
