//! Cursor Pagination
//!
//! Snowflake ids grow with time, so "newest first" lists page with
//! `id < before` and no offsets.

use serde::{Deserialize, Serialize};

use super::error::AppError;

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Raw query-string cursor (`?before=<id>&limit=<n>`).
#[derive(Debug, Default, Clone, Deserialize)]
pub struct CursorQuery {
    pub before: Option<String>,
    pub limit: Option<i64>,
}

/// Validated cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub before: Option<i64>,
    pub limit: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            before: None,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Page {
    pub fn new(before: Option<i64>, limit: Option<i64>) -> Self {
        Self {
            before,
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Cursor value for SQL: `id < $n` with `i64::MAX` meaning "from the top".
    pub fn before_or_max(&self) -> i64 {
        self.before.unwrap_or(i64::MAX)
    }
}

impl TryFrom<CursorQuery> for Page {
    type Error = AppError;

    fn try_from(query: CursorQuery) -> Result<Self, Self::Error> {
        let before = match query.before.as_deref() {
            None | Some("") => None,
            Some(raw) => Some(
                raw.parse::<i64>()
                    .map_err(|_| AppError::BadRequest("Invalid cursor".into()))?,
            ),
        };
        Ok(Page::new(before, query.limit))
    }
}

/// One page of results plus the cursor for the next page.
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_before: Option<String>,
}

impl<T> Paginated<T> {
    /// Build a page; `id_of` yields the snowflake of an item. A full page
    /// implies there may be more.
    pub fn from_items(items: Vec<T>, page: &Page, id_of: impl Fn(&T) -> i64) -> Self {
        let next_before = if items.len() as i64 >= page.limit {
            items.last().map(|item| id_of(item).to_string())
        } else {
            None
        };
        Self { items, next_before }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            next_before: self.next_before,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(None, DEFAULT_PAGE_SIZE)]
    #[test_case(Some(0), 1)]
    #[test_case(Some(500), MAX_PAGE_SIZE)]
    #[test_case(Some(42), 42)]
    fn test_limit_clamped(limit: Option<i64>, expected: i64) {
        assert_eq!(Page::new(None, limit).limit, expected);
    }

    #[test]
    fn test_cursor_parsing() {
        let page = Page::try_from(CursorQuery {
            before: Some("123".into()),
            limit: None,
        })
        .unwrap();
        assert_eq!(page.before, Some(123));
        assert_eq!(page.before_or_max(), 123);

        let bad = Page::try_from(CursorQuery {
            before: Some("abc".into()),
            limit: None,
        });
        assert!(bad.is_err());
    }

    #[test]
    fn test_next_cursor_only_on_full_page() {
        let page = Page::new(None, Some(2));
        let full = Paginated::from_items(vec![9_i64, 7], &page, |v| *v);
        assert_eq!(full.next_before.as_deref(), Some("7"));

        let partial = Paginated::from_items(vec![9_i64], &page, |v| *v);
        assert!(partial.next_before.is_none());
    }
}
