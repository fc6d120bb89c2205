/// Query composition helpers shared by the list endpoints
///
/// This module holds the pieces every list query is assembled from:
///
/// - the visibility predicate that hides soft-deleted rows
/// - ordering parsed from a whitelist of client-facing field names
/// - page-number pagination with a fixed page size
/// - escaping for case-insensitive substring search
///
/// # Example
///
/// ```
/// use taskhub_shared::db::query::{OrderBy, PageRequest};
///
/// const FIELDS: &[(&str, &str)] = &[("priority", "t.priority"), ("created_at", "t.created_at")];
///
/// let order = OrderBy::parse(Some("-priority"), FIELDS, "-created_at").unwrap();
/// assert_eq!(order.to_sql("t.id"), "t.priority DESC, t.id DESC");
///
/// let page = PageRequest::parse(Some("3")).unwrap();
/// assert_eq!(page.offset(), 20);
/// ```
use serde::Serialize;

/// Fixed number of results per page
pub const PAGE_SIZE: i64 = 10;

/// Errors raised while interpreting list parameters
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// `ordering` named a field outside the whitelist
    #[error("Cannot order by field '{0}'")]
    UnknownOrdering(String),

    /// `page` is not a positive integer or lies past the last page
    #[error("Invalid page.")]
    InvalidPage,
}

/// SQL fragment that keeps soft-deleted rows out of a query
///
/// Every default read goes through this function so the predicate cannot be
/// forgotten or overridden by request parameters.
pub fn visible(alias: &str) -> String {
    format!("{}.is_deleted = FALSE", alias)
}

/// One ordering term
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTerm {
    /// Whitelisted SQL expression
    pub column: &'static str,

    /// Whether the term sorts descending
    pub descending: bool,
}

/// Parsed `ordering` parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    terms: Vec<OrderTerm>,
}

impl OrderBy {
    /// Parses a comma-separated ordering parameter
    ///
    /// Each name may carry a leading `-` for descending order and must appear
    /// in `allowed`, which maps client-facing names to SQL expressions. When
    /// `raw` is absent or blank, `default` is parsed instead.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::UnknownOrdering` for any name outside `allowed`.
    pub fn parse(
        raw: Option<&str>,
        allowed: &[(&str, &'static str)],
        default: &str,
    ) -> Result<Self, QueryError> {
        let raw = match raw.map(str::trim) {
            Some(value) if !value.is_empty() => value,
            _ => default,
        };

        let mut terms = Vec::new();
        for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (name, descending) = match part.strip_prefix('-') {
                Some(name) => (name, true),
                None => (part, false),
            };

            let column = allowed
                .iter()
                .find(|(field, _)| *field == name)
                .map(|(_, column)| *column)
                .ok_or_else(|| QueryError::UnknownOrdering(name.to_string()))?;

            terms.push(OrderTerm { column, descending });
        }

        if terms.is_empty() {
            return Err(QueryError::UnknownOrdering(raw.to_string()));
        }

        Ok(Self { terms })
    }

    /// Renders the `ORDER BY` body
    ///
    /// `tiebreak` is appended in the direction of the first term so that
    /// pages are stable when the ordered values collide.
    pub fn to_sql(&self, tiebreak: &str) -> String {
        let mut parts: Vec<String> = self
            .terms
            .iter()
            .map(|term| {
                format!(
                    "{} {}",
                    term.column,
                    if term.descending { "DESC" } else { "ASC" }
                )
            })
            .collect();

        let descending = self.terms.first().map(|t| t.descending).unwrap_or(false);
        parts.push(format!(
            "{} {}",
            tiebreak,
            if descending { "DESC" } else { "ASC" }
        ));

        parts.join(", ")
    }
}

/// Requested page (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub number: i64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { number: 1 }
    }
}

impl PageRequest {
    /// Parses the `page` query parameter; absent means the first page
    pub fn parse(raw: Option<&str>) -> Result<Self, QueryError> {
        match raw.map(str::trim) {
            None | Some("") => Ok(Self::default()),
            Some(value) => match value.parse::<i64>() {
                Ok(number) if number >= 1 => Ok(Self { number }),
                _ => Err(QueryError::InvalidPage),
            },
        }
    }

    pub fn limit(&self) -> i64 {
        PAGE_SIZE
    }

    pub fn offset(&self) -> i64 {
        self.number.saturating_sub(1).saturating_mul(PAGE_SIZE)
    }
}

/// One page of results plus the total row count
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub number: i64,
}

impl<T> Page<T> {
    /// Number of pages needed for `total` rows (at least one)
    pub fn num_pages(&self) -> i64 {
        num_pages(self.total)
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages()
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    /// Converts the items while keeping the paging information
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            number: self.number,
        }
    }

    /// Replaces the items wholesale
    pub fn with_items<U>(self, items: Vec<U>) -> Page<U> {
        Page {
            items,
            total: self.total,
            number: self.number,
        }
    }
}

pub fn num_pages(total: i64) -> i64 {
    if total <= 0 {
        1
    } else {
        (total + PAGE_SIZE - 1) / PAGE_SIZE
    }
}

/// Builds a page from rows fetched with `COUNT(*) OVER()`
///
/// When the requested page holds no rows the total is unknown, so only the
/// first page may be empty; anything further is rejected as an invalid page.
pub fn paginate<T>(
    request: PageRequest,
    rows: Vec<T>,
    total_of: impl Fn(&T) -> i64,
) -> Result<Page<T>, QueryError> {
    match rows.first() {
        Some(first) => {
            let total = total_of(first);
            Ok(Page {
                items: rows,
                total,
                number: request.number,
            })
        }
        None if request.number == 1 => Ok(Page {
            items: rows,
            total: 0,
            number: 1,
        }),
        None => Err(QueryError::InvalidPage),
    }
}

/// Builds a `ILIKE` pattern matching `term` anywhere, with `%`, `_` and `\`
/// taken literally
pub fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Builds a `ILIKE` pattern matching `term` exactly, ignoring case
pub fn exact_pattern(term: &str) -> String {
    let pattern = contains_pattern(term);
    pattern[1..pattern.len() - 1].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TASK_FIELDS: &[(&str, &str)] = &[
        ("created_at", "t.created_at"),
        ("priority", "t.priority"),
        ("status", "t.status"),
    ];

    #[test]
    fn test_visible_predicate() {
        assert_eq!(visible("t"), "t.is_deleted = FALSE");
    }

    #[test]
    fn test_ordering_default_when_absent() {
        let order = OrderBy::parse(None, TASK_FIELDS, "-created_at").unwrap();
        assert_eq!(order.to_sql("t.id"), "t.created_at DESC, t.id DESC");

        let order = OrderBy::parse(Some("  "), TASK_FIELDS, "-created_at").unwrap();
        assert_eq!(order.to_sql("t.id"), "t.created_at DESC, t.id DESC");
    }

    #[test]
    fn test_ordering_multiple_fields() {
        let order = OrderBy::parse(Some("status,-priority"), TASK_FIELDS, "-created_at").unwrap();
        assert_eq!(
            order.to_sql("t.id"),
            "t.status ASC, t.priority DESC, t.id ASC"
        );
    }

    #[test]
    fn test_ordering_rejects_unknown_field() {
        let err = OrderBy::parse(Some("-password"), TASK_FIELDS, "-created_at").unwrap_err();
        assert_eq!(err, QueryError::UnknownOrdering("password".to_string()));

        // Column expressions are not accepted as names
        assert!(OrderBy::parse(Some("t.priority"), TASK_FIELDS, "-created_at").is_err());
    }

    #[test]
    fn test_page_request_parse() {
        assert_eq!(PageRequest::parse(None).unwrap().number, 1);
        assert_eq!(PageRequest::parse(Some("2")).unwrap().offset(), 10);
        assert_eq!(PageRequest::parse(Some("0")), Err(QueryError::InvalidPage));
        assert_eq!(PageRequest::parse(Some("-1")), Err(QueryError::InvalidPage));
        assert_eq!(PageRequest::parse(Some("abc")), Err(QueryError::InvalidPage));
    }

    #[test]
    fn test_num_pages() {
        assert_eq!(num_pages(0), 1);
        assert_eq!(num_pages(10), 1);
        assert_eq!(num_pages(11), 2);
        assert_eq!(num_pages(25), 3);
    }

    #[test]
    fn test_paginate() {
        let page = paginate(PageRequest { number: 2 }, vec![(1, 12), (2, 12)], |r| r.1).unwrap();
        assert_eq!(page.total, 12);
        assert!(page.has_previous());
        assert!(!page.has_next());

        let empty: Vec<(i32, i64)> = Vec::new();
        let first = paginate(PageRequest::default(), empty.clone(), |r| r.1).unwrap();
        assert_eq!(first.total, 0);
        assert!(!first.has_next());

        assert_eq!(
            paginate(PageRequest { number: 3 }, empty, |r| r.1).unwrap_err(),
            QueryError::InvalidPage
        );
    }

    #[test]
    fn test_contains_pattern_escapes_metacharacters() {
        assert_eq!(contains_pattern("report"), "%report%");
        assert_eq!(contains_pattern("100%"), "%100\\%%");
        assert_eq!(contains_pattern("a_b"), "%a\\_b%");
        assert_eq!(exact_pattern("Urgent"), "Urgent");
        assert_eq!(exact_pattern("50%"), "50\\%");
    }
}
