//! Query-string parameters of list pages
//!
//! [`ListParams`] is meant to be extracted with `axum::extract::Query` and
//! turned into a [`CrudQuery`] with the handler's own allow-lists, so request
//! input never reaches SQL as an identifier.
//!
//! # Example
//!
//! ```rust
//! use webcommon::web::{ListParams, ListSpec, SortOrder};
//!
//! let params = ListParams::new()
//!     .with_page(1, 50)
//!     .with_sort("name", SortOrder::Desc)
//!     .with_keyword("ali");
//!
//! let spec = ListSpec::new("users", &["id", "name"])
//!     .like_columns(&["name", "email"])
//!     .sortable(&["id", "name"]);
//!
//! let query = params.into_query(&spec).unwrap();
//! assert_eq!(query.request.order_by, "name DESC");
//! assert_eq!(query.request.offset(), 50);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::crud::{CrudQuery, DateRange, DEFAULT_PAGE_SIZE};
use crate::error::Result;

/// Maximum rows per page a client may ask for
pub const MAX_PAGE_SIZE: u64 = 100;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => write!(f, "asc"),
            Self::Desc => write!(f, "desc"),
        }
    }
}

impl SortOrder {
    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// What a list endpoint exposes: table, columns and the allow-lists
#[derive(Debug, Clone, Copy)]
pub struct ListSpec<'a> {
    pub table: &'static str,
    pub columns: &'a [&'a str],
    /// Columns searched by `keyword`
    pub like_columns: &'a [&'a str],
    /// Columns a client may sort by
    pub sortable: &'a [&'a str],
    /// Column `date_range` applies to
    pub date_column: &'a str,
    /// ORDER BY used when the client does not pick a valid sort
    pub default_order: &'a str,
}

impl<'a> ListSpec<'a> {
    pub fn new(table: &'static str, columns: &'a [&'a str]) -> Self {
        Self {
            table,
            columns,
            like_columns: &[],
            sortable: &[],
            date_column: "",
            default_order: "",
        }
    }

    #[must_use]
    pub fn like_columns(mut self, columns: &'a [&'a str]) -> Self {
        self.like_columns = columns;
        self
    }

    #[must_use]
    pub fn sortable(mut self, columns: &'a [&'a str]) -> Self {
        self.sortable = columns;
        self
    }

    #[must_use]
    pub fn date_column(mut self, column: &'a str) -> Self {
        self.date_column = column;
        self
    }

    #[must_use]
    pub fn default_order(mut self, clause: &'a str) -> Self {
        self.default_order = clause;
        self
    }
}

/// List page parameters
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ListParams {
    /// Zero-based page index
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pos: Option<u64>,

    /// Rows per page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<SortOrder>,

    /// Prefix searched in the endpoint's like columns
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,

    /// Comma separated tags
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,

    /// `{"start": "...", "end": "..."}`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_range: Option<String>,

    /// Paging switch; on unless set to false
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pager: Option<bool>,
}

impl ListParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_page(mut self, pos: u64, size: u64) -> Self {
        self.pos = Some(pos);
        self.size = Some(size);
        self
    }

    #[must_use]
    pub fn with_sort(mut self, sort: impl Into<String>, order: SortOrder) -> Self {
        self.sort = Some(sort.into());
        self.order = Some(order);
        self
    }

    #[must_use]
    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    #[must_use]
    pub fn with_tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = Some(tags.into());
        self
    }

    #[must_use]
    pub fn with_date_range(mut self, range_json: impl Into<String>) -> Self {
        self.date_range = Some(range_json.into());
        self
    }

    #[must_use]
    pub fn page_pos(&self) -> u64 {
        self.pos.unwrap_or(0)
    }

    /// Requested page size clamped to `1..=MAX_PAGE_SIZE`
    #[must_use]
    pub fn page_size(&self) -> u64 {
        self.size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    /// ORDER BY clause if `sort` names an allowed column
    #[must_use]
    pub fn order_clause(&self, sortable: &[&str]) -> Option<String> {
        let sort = self.sort.as_deref()?.trim();
        if !sortable.contains(&sort) {
            return None;
        }
        Some(format!(
            "{} {}",
            sort,
            self.order.unwrap_or_default().as_sql()
        ))
    }

    /// Build the query for `spec`
    ///
    /// Fails with a bad request when `date_range` is not valid JSON.
    pub fn into_query(self, spec: &ListSpec<'_>) -> Result<CrudQuery> {
        let range = DateRange::parse_json(self.date_range.as_deref().unwrap_or(""))?;
        let order_by = self
            .order_clause(spec.sortable)
            .unwrap_or_else(|| spec.default_order.to_string());

        let mut query = CrudQuery::new(spec.table)
            .columns(spec.columns.iter().copied())
            .order_by(order_by);

        if self.pager.unwrap_or(true) {
            query = query.page(self.page_pos(), self.page_size());
        }
        if let Some(keyword) = self.keyword.as_deref().map(str::trim) {
            if !keyword.is_empty() {
                query = query.like(spec.like_columns.iter().copied(), keyword);
            }
        }
        if let Some(tags) = self.tags {
            query = query.tags(tags);
        }
        if !spec.date_column.is_empty() && !range.is_empty() {
            query = query.date_range(spec.date_column, range);
        }
        Ok(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    const COLUMNS: &[&str] = &["id", "name", "created_at"];

    fn spec() -> ListSpec<'static> {
        ListSpec::new("users", COLUMNS)
            .like_columns(&["name"])
            .sortable(&["id", "name"])
            .date_column("created_at")
            .default_order("id DESC")
    }

    #[test]
    fn test_defaults() {
        let query = ListParams::new().into_query(&spec()).unwrap();
        assert!(query.request.pager);
        assert_eq!(query.request.page_pos, 0);
        assert_eq!(query.request.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(query.request.order_by, "id DESC");
        assert!(query.request.filter.like_value.is_empty());
    }

    #[test]
    fn test_page_size_clamped() {
        assert_eq!(ListParams::new().with_page(0, 0).page_size(), 1);
        assert_eq!(ListParams::new().with_page(0, 1000).page_size(), MAX_PAGE_SIZE);
    }

    #[test]
    fn test_sort_must_be_allowed() {
        let params = ListParams::new().with_sort("password", SortOrder::Asc);
        assert_eq!(params.order_clause(&["id", "name"]), None);
        let query = params.into_query(&spec()).unwrap();
        assert_eq!(query.request.order_by, "id DESC");

        let params = ListParams::new().with_sort("name", SortOrder::Desc);
        assert_eq!(params.order_clause(&["id", "name"]).as_deref(), Some("name DESC"));
    }

    #[test]
    fn test_keyword_tags_and_dates() {
        let query = ListParams::new()
            .with_keyword(" al ")
            .with_tags("a,b")
            .with_date_range(r#"{"start":"2024-01-01","end":"2024-01-31"}"#)
            .into_query(&spec())
            .unwrap();

        let filter = &query.request.filter;
        assert_eq!(filter.like_value, "al");
        assert_eq!(filter.like_columns, vec!["name"]);
        assert_eq!(filter.tags, "a,b");
        assert_eq!(filter.date_column, "created_at");
        assert_eq!(filter.date_range, DateRange::new("2024-01-01", "2024-01-31"));
    }

    #[test]
    fn test_bad_date_range() {
        let err = ListParams::new()
            .with_date_range("not json")
            .into_query(&spec())
            .unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
    }

    #[test]
    fn test_pager_off() {
        let params: ListParams = serde_json::from_str(r#"{"pager": false}"#).unwrap();
        let query = params.into_query(&spec()).unwrap();
        assert!(!query.request.pager);
    }

    #[test]
    fn test_sort_order_sql() {
        assert_eq!(SortOrder::Asc.as_sql(), "ASC");
        assert_eq!(SortOrder::Desc.to_string(), "desc");
    }
}
