//! Paging over filtered queries

use serde::{Deserialize, Serialize};
use sea_query::SelectStatement;
use sqlx::any::AnyRow;
use sqlx::{AnyConnection, FromRow};

use super::exec::StatementRunner;
use super::filter::{FilterSpec, QueryFilterBuilder};
use super::sql::{self, Dialect, Statement};
use crate::error::{DatabaseOperation, Result};

/// Page size used when paging is on and no size was given
pub const DEFAULT_PAGE_SIZE: u64 = 20;

/// A filter plus paging controls
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageRequest {
    #[serde(flatten)]
    pub filter: FilterSpec,
    /// Page the result set
    pub pager: bool,
    pub page_size: u64,
    /// Zero-based page index
    pub page_pos: u64,
    /// Raw ORDER BY clause
    pub order_by: String,
    /// Row cap when paging is off; 0 means unlimited
    pub limit: u64,
}

impl PageRequest {
    /// Paged request for page `pos` of `size` rows
    pub fn paged(pos: u64, size: u64) -> Self {
        Self {
            pager: true,
            page_pos: pos,
            page_size: size,
            ..Self::default()
        }
    }

    /// Effective page size
    pub fn size(&self) -> u64 {
        if self.page_size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            self.page_size
        }
    }

    /// Row offset of the requested page
    pub fn offset(&self) -> u64 {
        self.page_pos.saturating_mul(self.size())
    }

    /// Only the first page of a paged request carries a total
    pub fn needs_count(&self) -> bool {
        self.pager && self.page_pos == 0
    }
}

/// One page of results
///
/// `total_count` is only known for the first page of a paged query; it is 0
/// otherwise and left out of the JSON form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult<T> {
    #[serde(default, skip_serializing_if = "is_zero")]
    pub total_count: i64,
    #[serde(default)]
    pub pos: u64,
    pub data: Vec<T>,
}

fn is_zero(n: &i64) -> bool {
    *n == 0
}

impl<T> PageResult<T> {
    pub fn new(total_count: i64, pos: u64, data: Vec<T>) -> Self {
        Self {
            total_count,
            pos,
            data,
        }
    }

    /// A fresh empty page
    pub fn empty() -> Self {
        Self::new(0, 0, Vec::new())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_rows(self) -> Vec<T> {
        self.data
    }

    /// Convert the rows, keeping the paging fields
    pub fn map<U, F>(self, f: F) -> PageResult<U>
    where
        F: FnMut(T) -> U,
    {
        PageResult {
            total_count: self.total_count,
            pos: self.pos,
            data: self.data.into_iter().map(f).collect(),
        }
    }
}

impl<T> Default for PageResult<T> {
    fn default() -> Self {
        Self::empty()
    }
}

/// Builds and runs the data and count statements of a [`PageRequest`]
#[derive(Debug, Clone, Copy)]
pub struct Paginator<'a> {
    table: &'a str,
    columns: &'a [String],
    request: &'a PageRequest,
}

impl<'a> Paginator<'a> {
    pub fn new(table: &'a str, columns: &'a [String], request: &'a PageRequest) -> Self {
        Self {
            table,
            columns,
            request,
        }
    }

    fn filtered(&self, base: SelectStatement, dialect: Dialect) -> SelectStatement {
        QueryFilterBuilder::new(&self.request.filter, dialect).build(base)
    }

    /// SELECT for the requested rows
    pub fn data_statement(&self, dialect: Dialect) -> Statement {
        let request = self.request;
        let mut select = self.filtered(sql::select(self.table, self.columns), dialect);
        sql::order_by(&mut select, &request.order_by);

        if request.pager {
            select.limit(request.size());
            let offset = request.offset();
            if offset > 0 {
                select.offset(offset);
            }
        } else if request.limit > 0 {
            select.limit(request.limit);
        }
        dialect.render(&select)
    }

    /// `SELECT COUNT(*)` with the same joins and predicates, if this page needs one
    pub fn count_statement(&self, dialect: Dialect) -> Option<Statement> {
        if !self.request.needs_count() {
            return None;
        }
        Some(dialect.render(&self.filtered(sql::count(self.table), dialect)))
    }

    /// Run the data query, then the count query when one is needed
    ///
    /// A data query failure is returned before any count is attempted.
    pub async fn fetch<T>(
        &self,
        conn: &mut AnyConnection,
        runner: &StatementRunner,
    ) -> Result<PageResult<T>>
    where
        T: for<'r> FromRow<'r, AnyRow> + Send + Unpin,
    {
        let dialect = runner.dialect();
        let data = runner
            .fetch_all(
                conn,
                DatabaseOperation::Query,
                self.table,
                &self.data_statement(dialect),
            )
            .await?;

        let total_count = match self.count_statement(dialect) {
            Some(stmt) => runner.fetch_count(conn, self.table, &stmt).await?,
            None => 0,
        };

        let pos = if self.request.pager {
            self.request.page_pos
        } else {
            0
        };
        Ok(PageResult::new(total_count, pos, data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crud::value::FilterValue;
    use sea_query::Value;

    fn columns() -> Vec<String> {
        vec!["id".to_string(), "name".to_string()]
    }

    #[test]
    fn test_offset_multiplies_position() {
        let request = PageRequest::paged(3, 10);
        assert_eq!(request.offset(), 30);
        assert_eq!(PageRequest::paged(u64::MAX, 10).offset(), u64::MAX);
    }

    #[test]
    fn test_zero_size_uses_default() {
        let request = PageRequest::paged(2, 0);
        assert_eq!(request.size(), DEFAULT_PAGE_SIZE);
        assert_eq!(request.offset(), 40);
    }

    #[test]
    fn test_first_page_statements() {
        let mut request = PageRequest::paged(0, 10);
        request.filter = FilterSpec::new()
            .with_eq("status", "active")
            .with_join("groups g ON g.id = users.gid");
        request.order_by = "id DESC".to_string();

        let cols = columns();
        let paginator = Paginator::new("users", &cols, &request);

        let data = paginator.data_statement(Dialect::MySql);
        assert_eq!(
            data.sql,
            "SELECT `id`, `name` FROM `users` \
             INNER JOIN `groups` AS `g` ON g.id = users.gid \
             WHERE `status` = ? ORDER BY `id` DESC LIMIT ?"
        );
        assert_eq!(
            data.values.0,
            vec![Value::from("active"), Value::from(10_u64)]
        );

        let count = paginator.count_statement(Dialect::MySql).unwrap();
        assert_eq!(
            count.sql,
            "SELECT COUNT(*) FROM `users` \
             INNER JOIN `groups` AS `g` ON g.id = users.gid WHERE `status` = ?"
        );
        assert_eq!(count.values.0, vec![Value::from("active")]);
    }

    #[test]
    fn test_later_page_has_no_count() {
        let request = PageRequest::paged(2, 10);
        let cols = columns();
        let paginator = Paginator::new("users", &cols, &request);

        assert!(paginator.count_statement(Dialect::MySql).is_none());
        let data = paginator.data_statement(Dialect::MySql);
        assert_eq!(data.sql, "SELECT `id`, `name` FROM `users` LIMIT ? OFFSET ?");
        assert_eq!(data.values.0, vec![Value::from(10_u64), Value::from(20_u64)]);
    }

    #[test]
    fn test_unpaged_limit() {
        let mut request = PageRequest {
            limit: 5,
            ..PageRequest::default()
        };
        let cols = columns();
        let data = Paginator::new("users", &cols, &request).data_statement(Dialect::Postgres);
        assert_eq!(data.sql, r#"SELECT "id", "name" FROM "users" LIMIT $1"#);
        assert_eq!(data.values.0, vec![Value::from(5_u64)]);
        assert!(Paginator::new("users", &cols, &request)
            .count_statement(Dialect::MySql)
            .is_none());

        request.limit = 0;
        assert_eq!(
            Paginator::new("users", &cols, &request)
                .data_statement(Dialect::MySql)
                .sql,
            "SELECT `id`, `name` FROM `users`"
        );
    }

    #[test]
    fn test_page_result_json() {
        let first = PageResult::new(25, 0, vec![1, 2]);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            r#"{"total_count":25,"pos":0,"data":[1,2]}"#
        );

        let later = PageResult::new(0, 1, vec![3]);
        assert_eq!(
            serde_json::to_string(&later).unwrap(),
            r#"{"pos":1,"data":[3]}"#
        );
    }

    #[test]
    fn test_empty_is_fresh() {
        let mut a: PageResult<i32> = PageResult::empty();
        a.data.push(1);
        let b: PageResult<i32> = PageResult::empty();
        assert!(b.is_empty());
        assert_eq!(b.total_count, 0);
    }

    #[test]
    fn test_page_request_from_json() {
        let request: PageRequest = serde_json::from_str(
            r#"{"pager": true, "page_size": 15, "page_pos": 1, "eq": {"kind": 1}}"#,
        )
        .unwrap();
        assert!(request.pager);
        assert_eq!(request.offset(), 15);
        assert_eq!(request.filter.eq["kind"], FilterValue::Integer(1));
    }
}
