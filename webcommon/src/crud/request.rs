//! Request descriptors accepted by [`CrudGateway`](super::CrudGateway)
//!
//! Table names are `&'static str`: they can only come from constants compiled
//! into the service, never from request input.

use super::filter::{DateRange, FilterSpec};
use super::page::PageRequest;
use super::value::{Conditions, FilterValue, Row};

/// Primary key column used by [`CrudDelete::by_ids`]
pub const ID_COLUMN: &str = "id";

/// What a batch delete does when one id fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeletePolicy {
    /// Log the failure and carry on with the next id
    #[default]
    BestEffort,
    /// Stop at the first failure and return it
    Strict,
}

/// Fetch a single row
#[derive(Debug, Clone, PartialEq)]
pub struct CrudGet {
    pub table: &'static str,
    pub columns: Vec<String>,
    pub eq: Conditions,
}

impl CrudGet {
    pub fn new(table: &'static str) -> Self {
        Self {
            table,
            columns: Vec::new(),
            eq: Conditions::new(),
        }
    }

    #[must_use]
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.eq.insert(column.into(), value.into());
        self
    }
}

/// Filtered, optionally paged list query
#[derive(Debug, Clone, PartialEq)]
pub struct CrudQuery {
    pub table: &'static str,
    pub columns: Vec<String>,
    pub request: PageRequest,
}

impl CrudQuery {
    pub fn new(table: &'static str) -> Self {
        Self {
            table,
            columns: Vec::new(),
            request: PageRequest::default(),
        }
    }

    #[must_use]
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the whole filter
    #[must_use]
    pub fn filter(mut self, filter: FilterSpec) -> Self {
        self.request.filter = filter;
        self
    }

    /// Page `pos` of `size` rows; a zero size falls back to the default
    #[must_use]
    pub fn page(mut self, pos: u64, size: u64) -> Self {
        self.request.pager = true;
        self.request.page_pos = pos;
        self.request.page_size = size;
        self
    }

    /// Row cap for unpaged queries
    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.request.limit = limit;
        self
    }

    #[must_use]
    pub fn order_by(mut self, clause: impl Into<String>) -> Self {
        self.request.order_by = clause.into();
        self
    }

    #[must_use]
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.request.filter.eq.insert(column.into(), value.into());
        self
    }

    /// Equality on a submitted form value; blank values add nothing
    #[must_use]
    pub fn eq_if_present(self, column: impl Into<String>, value: &str) -> Self {
        if value.trim().is_empty() {
            self
        } else {
            self.eq(column, value)
        }
    }

    #[must_use]
    pub fn lt_or_eq(mut self, column: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.request
            .filter
            .lt_or_eq
            .insert(column.into(), value.into());
        self
    }

    #[must_use]
    pub fn gt_or_eq(mut self, column: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.request
            .filter
            .gt_or_eq
            .insert(column.into(), value.into());
        self
    }

    #[must_use]
    pub fn like<I, S>(mut self, columns: I, value: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.request.filter.like_columns = columns.into_iter().map(Into::into).collect();
        self.request.filter.like_value = value.into();
        self
    }

    #[must_use]
    pub fn tags(mut self, tags: impl Into<String>) -> Self {
        self.request.filter.tags = tags.into();
        self
    }

    #[must_use]
    pub fn date_range(mut self, column: impl Into<String>, range: DateRange) -> Self {
        self.request.filter.date_column = column.into();
        self.request.filter.date_range = range;
        self
    }

    #[must_use]
    pub fn join(mut self, clause: impl Into<String>) -> Self {
        self.request.filter.joins.push(clause.into());
        self
    }

    #[must_use]
    pub fn left_join(mut self, clause: impl Into<String>) -> Self {
        self.request.filter.left_joins.push(clause.into());
        self
    }

    #[must_use]
    pub fn where_raw(mut self, clause: impl Into<String>) -> Self {
        self.request.filter.wheres.push(clause.into());
        self
    }
}

/// Insert rows as one all-or-nothing batch
///
/// Rows may use different column sets.
#[derive(Debug, Clone, PartialEq)]
pub struct CrudAdd {
    pub table: &'static str,
    pub rows: Vec<Row>,
}

impl CrudAdd {
    pub fn new(table: &'static str) -> Self {
        Self {
            table,
            rows: Vec::new(),
        }
    }

    #[must_use]
    pub fn row(mut self, row: Row) -> Self {
        self.rows.push(row);
        self
    }

    #[must_use]
    pub fn rows(mut self, rows: impl IntoIterator<Item = Row>) -> Self {
        self.rows.extend(rows);
        self
    }
}

/// Single UPDATE statement
///
/// Empty condition groups are left out; with none at all every row is
/// updated.
#[derive(Debug, Clone, PartialEq)]
pub struct CrudUpdate {
    pub table: &'static str,
    pub values: Row,
    pub eq: Conditions,
    pub lt_or_eq: Conditions,
    pub gt_or_eq: Conditions,
}

impl CrudUpdate {
    pub fn new(table: &'static str) -> Self {
        Self {
            table,
            values: Row::new(),
            eq: Conditions::new(),
            lt_or_eq: Conditions::new(),
            gt_or_eq: Conditions::new(),
        }
    }

    #[must_use]
    pub fn set(mut self, column: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.values.insert(column.into(), value.into());
        self
    }

    #[must_use]
    pub fn values(mut self, values: Row) -> Self {
        self.values = values;
        self
    }

    #[must_use]
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.eq.insert(column.into(), value.into());
        self
    }

    #[must_use]
    pub fn lt_or_eq(mut self, column: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.lt_or_eq.insert(column.into(), value.into());
        self
    }

    #[must_use]
    pub fn gt_or_eq(mut self, column: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.gt_or_eq.insert(column.into(), value.into());
        self
    }
}

/// Rows selected by a delete
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteTarget {
    /// One `DELETE ... WHERE id = ?` per id
    Ids(Vec<FilterValue>),
    /// A single `DELETE` with equality conditions
    Filter(Conditions),
}

/// Delete rows by id or by filter
#[derive(Debug, Clone, PartialEq)]
pub struct CrudDelete {
    pub table: &'static str,
    pub target: DeleteTarget,
    /// Overrides the gateway policy for this call
    pub policy: Option<DeletePolicy>,
}

impl CrudDelete {
    pub fn by_ids<I, V>(table: &'static str, ids: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<FilterValue>,
    {
        Self {
            table,
            target: DeleteTarget::Ids(ids.into_iter().map(Into::into).collect()),
            policy: None,
        }
    }

    pub fn by_filter(table: &'static str, filter: Conditions) -> Self {
        Self {
            table,
            target: DeleteTarget::Filter(filter),
            policy: None,
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: DeletePolicy) -> Self {
        self.policy = Some(policy);
        self
    }
}
