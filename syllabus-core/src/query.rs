//! Listing helpers: sort parsing, pagination and search patterns.

use serde::Serialize;
use sqlx::{Postgres, QueryBuilder};

/// One `ORDER BY` term. Column names always come from a static allowlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub column: &'static str,
    pub descending: bool,
}

impl SortKey {
    pub const fn asc(column: &'static str) -> Self {
        Self {
            column,
            descending: false,
        }
    }

    pub const fn desc(column: &'static str) -> Self {
        Self {
            column,
            descending: true,
        }
    }
}

/// Parse `sort=name,-created_at`. Fields outside `allowed` are dropped.
pub fn parse_sort(raw: Option<&str>, allowed: &[&'static str]) -> Vec<SortKey> {
    let Some(raw) = raw else {
        return Vec::new();
    };

    raw.split(',')
        .filter_map(|part| {
            let part = part.trim();
            let (name, descending) = match part.strip_prefix('-') {
                Some(rest) => (rest.trim(), true),
                None => (part, false),
            };
            allowed
                .iter()
                .find(|column| **column == name)
                .map(|column| SortKey {
                    column: *column,
                    descending,
                })
        })
        .collect()
}

/// Append `ORDER BY`, using `fallback` when no usable key was requested.
/// `id` is always the final tiebreaker so pages are stable.
pub fn push_order_by(
    builder: &mut QueryBuilder<'_, Postgres>,
    requested: &[SortKey],
    fallback: &[SortKey],
) {
    let keys = if requested.is_empty() { fallback } else { requested };
    builder.push(" ORDER BY ");
    for key in keys {
        builder.push(key.column);
        builder.push(if key.descending { " DESC, " } else { " ASC, " });
    }
    builder.push("id ASC");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub default_per_page: i64,
    pub max_per_page: i64,
}

impl PageLimits {
    pub const fn new(default_per_page: i64, max_per_page: i64) -> Self {
        Self {
            default_per_page,
            max_per_page,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub per_page: i64,
}

impl PageRequest {
    /// Clamp `per_page` to `[1, max]` and `page` to `>= 1`.
    pub fn new(page: Option<i64>, per_page: Option<i64>, limits: PageLimits) -> Self {
        let per_page = per_page
            .unwrap_or(limits.default_per_page)
            .clamp(1, limits.max_per_page.max(1));
        let page = page.unwrap_or(1).max(1);
        Self { page, per_page }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }

    pub fn push_limit_offset(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        builder.push(" LIMIT ");
        builder.push_bind(self.per_page);
        builder.push(" OFFSET ");
        builder.push_bind(self.offset());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub current_page: i64,
    pub per_page: i64,
    pub total: i64,
    pub last_page: i64,
}

impl PageMeta {
    pub fn new(request: PageRequest, total: i64) -> Self {
        let last_page = if total <= 0 {
            1
        } else {
            (total + request.per_page - 1) / request.per_page
        };
        Self {
            current_page: request.page,
            per_page: request.per_page,
            total,
            last_page,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub meta: PageMeta,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total: i64) -> Self {
        Self {
            items,
            meta: PageMeta::new(request, total),
        }
    }
}

/// Trimmed, non-empty search text.
pub fn search_term(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|term| !term.is_empty())
        .map(str::to_string)
}

/// `%term%` with LIKE wildcards in the term escaped.
pub fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

/// Append `(col_a ILIKE $n OR col_b ILIKE $n ...)` for a search term.
pub fn push_search(
    builder: &mut QueryBuilder<'_, Postgres>,
    columns: &[&'static str],
    term: &str,
) {
    let pattern = contains_pattern(term);
    builder.push("(");
    for (index, column) in columns.iter().enumerate() {
        if index > 0 {
            builder.push(" OR ");
        }
        builder.push(*column);
        builder.push(" ILIKE ");
        builder.push_bind(pattern.clone());
    }
    builder.push(")");
}

/// Tracks whether the next filter needs `WHERE` or `AND`.
#[derive(Debug, Default)]
pub struct WhereClause {
    started: bool,
}

impl WhereClause {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next<'a, 'args>(
        &mut self,
        builder: &'a mut QueryBuilder<'args, Postgres>,
    ) -> &'a mut QueryBuilder<'args, Postgres> {
        builder.push(if self.started { " AND " } else { " WHERE " });
        self.started = true;
        builder
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIELDS: &[&str] = &["name", "position", "created_at"];

    #[test]
    fn sort_parses_direction_and_drops_unknown_fields() {
        let keys = parse_sort(Some("-created_at, bogus ,name,-"), FIELDS);
        assert_eq!(
            keys,
            vec![SortKey::desc("created_at"), SortKey::asc("name")]
        );
        assert!(parse_sort(None, FIELDS).is_empty());
        assert!(parse_sort(Some("password"), FIELDS).is_empty());
    }

    #[test]
    fn order_by_falls_back_and_appends_id() {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT * FROM categories");
        push_order_by(
            &mut builder,
            &[],
            &[SortKey::asc("position"), SortKey::asc("name")],
        );
        assert_eq!(
            builder.sql(),
            "SELECT * FROM categories ORDER BY position ASC, name ASC, id ASC"
        );
    }

    #[test]
    fn page_size_is_clamped() {
        let limits = PageLimits::new(20, 100);
        assert_eq!(PageRequest::new(None, Some(1000), limits).per_page, 100);
        assert_eq!(PageRequest::new(None, Some(0), limits).per_page, 1);
        assert_eq!(PageRequest::new(None, Some(-4), limits).per_page, 1);
        assert_eq!(PageRequest::new(None, None, limits).per_page, 20);
        assert_eq!(PageRequest::new(Some(-3), None, limits).page, 1);
    }

    #[test]
    fn meta_reports_last_page() {
        let request = PageRequest::new(Some(2), Some(10), PageLimits::new(20, 100));
        assert_eq!(request.offset(), 10);
        assert_eq!(PageMeta::new(request, 0).last_page, 1);
        assert_eq!(PageMeta::new(request, 10).last_page, 1);
        assert_eq!(PageMeta::new(request, 11).last_page, 2);
        assert_eq!(PageMeta::new(request, 250).last_page, 25);
    }

    #[test]
    fn search_patterns_escape_wildcards() {
        assert_eq!(contains_pattern("web"), "%web%");
        assert_eq!(contains_pattern("100%_off"), "%100\\%\\_off%");
        assert_eq!(search_term(Some("  rust  ")), Some("rust".to_string()));
        assert_eq!(search_term(Some("   ")), None);
    }

    #[test]
    fn where_clause_joins_filters() {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT * FROM courses");
        let mut clause = WhereClause::new();
        clause.next(&mut builder).push("approved = ").push_bind(true);
        clause.next(&mut builder).push("status IS NOT NULL");
        assert_eq!(
            builder.sql(),
            "SELECT * FROM courses WHERE approved = $1 AND status IS NOT NULL"
        );
    }
}
