//! Free-text search helpers for list filters.
//!
//! A search query is matched two ways: as a PostgreSQL full-text query over
//! the entity's searchable columns, and as a case-insensitive substring of
//! each column. The helpers here only normalize user input; the SQL lives in
//! the repository layer.

/// Text search configuration passed to `to_tsvector` / `to_tsquery`.
pub const TS_CONFIG: &str = "english";

/// Sanitize user input into a list of terms suitable for tsquery construction.
///
/// - Splits on every character that is neither alphanumeric nor `_`, so
///   tsquery operators in the input can never reach `to_tsquery`.
/// - Drops empty terms.
///
/// Returns `None` if the input yields no usable terms.
fn sanitize_terms(query: &str) -> Option<Vec<&str>> {
    let terms: Vec<&str> = query
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|t| !t.is_empty())
        .collect();

    if terms.is_empty() {
        None
    } else {
        Some(terms)
    }
}

/// Sanitize and convert user input into a PostgreSQL `tsquery` string.
///
/// Whitespace-separated terms are joined with `|`, so a row matches when any
/// term matches. Input with no usable terms returns `None`.
///
/// # Examples
///
/// ```
/// use carbide_core::search::build_tsquery;
/// assert_eq!(build_tsquery("test- ready"), Some("test | ready".to_string()));
/// assert_eq!(build_tsquery("  "), None);
/// ```
pub fn build_tsquery(query: &str) -> Option<String> {
    sanitize_terms(query).map(|terms| terms.join(" | "))
}

/// Wrap a query in `%...%` for `ILIKE`, escaping the pattern metacharacters.
///
/// # Examples
///
/// ```
/// use carbide_core::search::ilike_pattern;
/// assert_eq!(ilike_pattern("50%_off"), "%50\\%\\_off%");
/// ```
pub fn ilike_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Returns the trimmed query, or `None` when nothing is left to search for.
pub fn normalize_query(query: Option<&str>) -> Option<&str> {
    query.map(str::trim).filter(|q| !q.is_empty())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
