//! Declarative WHERE-clause descriptions and their translation into SQL

use sea_query::{Condition, ConditionalStatement, IntoCondition, SelectStatement};
use serde::{Deserialize, Serialize};

use super::sql::{self, CompareOp, Dialect, JoinKind};
use super::value::{Conditions, FilterValue};
use crate::error::{Error, Result};

/// Column tested by tag filters
pub const TAGS_COLUMN: &str = "tags";

/// Optional closed interval over one date column
///
/// Bounds are kept as text (`2024-01-31` or `2024-01-31 23:59:59`) and bound
/// as parameters. MySQL and SQLite compare them as given; on Postgres they
/// are cast to `timestamp` first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

impl DateRange {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// Parse the `{"start": "...", "end": "..."}` form posted by list pages
    ///
    /// Blank input is an empty range.
    pub fn parse_json(input: &str) -> Result<Self> {
        if input.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(input)
            .map_err(|e| Error::BadRequest(format!("invalid date range: {}", e)))
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_empty() && self.end.is_empty()
    }
}

/// Filter conditions for a SELECT
///
/// Every non-empty group is AND-ed in; tag tokens and LIKE columns are OR-ed
/// within their own group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSpec {
    /// Comma separated tags, any of which must be present in [`TAGS_COLUMN`]
    pub tags: String,
    /// Columns searched by `like_value`
    pub like_columns: Vec<String>,
    /// Prefix matched against `like_columns`
    pub like_value: String,
    /// Column restricted by `date_range`
    pub date_column: String,
    pub date_range: DateRange,
    /// `"<table> ON <condition>"` fragments for inner joins
    pub joins: Vec<String>,
    /// `"<table> ON <condition>"` fragments for left joins
    pub left_joins: Vec<String>,
    /// Trusted raw predicates
    pub wheres: Vec<String>,
    pub eq: Conditions,
    pub lt_or_eq: Conditions,
    pub gt_or_eq: Conditions,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_eq(mut self, column: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.eq.insert(column.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_lt_or_eq(
        mut self,
        column: impl Into<String>,
        value: impl Into<FilterValue>,
    ) -> Self {
        self.lt_or_eq.insert(column.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_gt_or_eq(
        mut self,
        column: impl Into<String>,
        value: impl Into<FilterValue>,
    ) -> Self {
        self.gt_or_eq.insert(column.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_like<I, S>(mut self, columns: I, value: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.like_columns = columns.into_iter().map(Into::into).collect();
        self.like_value = value.into();
        self
    }

    #[must_use]
    pub fn with_tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = tags.into();
        self
    }

    #[must_use]
    pub fn with_date_range(mut self, column: impl Into<String>, range: DateRange) -> Self {
        self.date_column = column.into();
        self.date_range = range;
        self
    }

    #[must_use]
    pub fn with_join(mut self, clause: impl Into<String>) -> Self {
        self.joins.push(clause.into());
        self
    }

    #[must_use]
    pub fn with_left_join(mut self, clause: impl Into<String>) -> Self {
        self.left_joins.push(clause.into());
        self
    }

    #[must_use]
    pub fn with_where(mut self, clause: impl Into<String>) -> Self {
        self.wheres.push(clause.into());
        self
    }

    /// Tag tokens with surrounding blanks removed
    pub fn tag_tokens(&self) -> impl Iterator<Item = &str> {
        self.tags
            .split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
    }
}

/// Applies a [`FilterSpec`] to a base SELECT
///
/// Pure and repeatable: the paginator builds the data query and the count
/// query from the same spec.
#[derive(Debug, Clone, Copy)]
pub struct QueryFilterBuilder<'a> {
    spec: &'a FilterSpec,
    dialect: Dialect,
}

impl<'a> QueryFilterBuilder<'a> {
    pub fn new(spec: &'a FilterSpec, dialect: Dialect) -> Self {
        Self { spec, dialect }
    }

    /// Add the spec's joins and WHERE groups to `base`
    pub fn build(&self, base: SelectStatement) -> SelectStatement {
        let mut select = base;
        for clause in &self.spec.joins {
            sql::join(&mut select, JoinKind::Inner, clause);
        }
        for clause in &self.spec.left_joins {
            sql::join(&mut select, JoinKind::Left, clause);
        }
        if let Some(filter) = sql::and_all(self.conditions()) {
            select.cond_where(filter);
        }
        select
    }

    /// Non-empty groups in application order: tags, date range, raw wheres,
    /// like, eq, lte, gte
    pub fn conditions(&self) -> Vec<Condition> {
        let spec = self.spec;
        let mut groups = Vec::new();

        let tags = spec
            .tag_tokens()
            .fold(Condition::any(), |any, tag| {
                any.add(self.dialect.tag_member(TAGS_COLUMN, tag))
            });
        if spec.tag_tokens().next().is_some() {
            groups.push(tags);
        }

        if !spec.date_column.is_empty() {
            let range = &spec.date_range;
            if !range.end.is_empty() {
                groups.push(
                    sql::column(&spec.date_column)
                        .lte(self.dialect.date_bound(&range.end))
                        .into_condition(),
                );
            }
            if !range.start.is_empty() {
                groups.push(
                    sql::column(&spec.date_column)
                        .gte(self.dialect.date_bound(&range.start))
                        .into_condition(),
                );
            }
        }

        for clause in spec.wheres.iter().filter(|w| !w.trim().is_empty()) {
            groups.push(sql::raw(clause).into_condition());
        }

        if !spec.like_value.is_empty() && !spec.like_columns.is_empty() {
            let pattern = format!("{}%", spec.like_value);
            groups.push(spec.like_columns.iter().fold(Condition::any(), |any, column| {
                any.add(sql::column(column).like(pattern.as_str()))
            }));
        }

        for (op, group) in [
            (CompareOp::Eq, &spec.eq),
            (CompareOp::LtOrEq, &spec.lt_or_eq),
            (CompareOp::GtOrEq, &spec.gt_or_eq),
        ] {
            if !group.is_empty() {
                groups.push(op.all(group));
            }
        }

        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_query::Value;

    fn render_with(dialect: Dialect, spec: &FilterSpec) -> (String, Vec<Value>) {
        let stmt =
            dialect.render(&QueryFilterBuilder::new(spec, dialect).build(sql::select("t", ["id"])));
        (stmt.sql, stmt.values.0)
    }

    fn render(spec: &FilterSpec) -> (String, Vec<Value>) {
        render_with(Dialect::MySql, spec)
    }

    fn position(sql: &str, fragment: &str) -> usize {
        sql.find(fragment)
            .unwrap_or_else(|| panic!("`{}` not found in `{}`", fragment, sql))
    }

    #[test]
    fn test_empty_spec_adds_nothing() {
        let (sql, values) = render(&FilterSpec::new());
        assert_eq!(sql, "SELECT `id` FROM `t`");
        assert!(values.is_empty());
    }

    #[test]
    fn test_single_eq() {
        let (sql, values) = render(&FilterSpec::new().with_eq("status", "active"));
        assert_eq!(sql, "SELECT `id` FROM `t` WHERE `status` = ?");
        assert_eq!(values, vec![Value::from("active")]);
    }

    #[test]
    fn test_eq_group_is_sorted() {
        let (sql, values) = render(&FilterSpec::new().with_eq("b", 2_i64).with_eq("a", 1_i64));
        assert!(position(&sql, "`a` = ?") < position(&sql, "`b` = ?"));
        assert_eq!(values, vec![Value::from(1_i64), Value::from(2_i64)]);
    }

    #[test]
    fn test_group_order() {
        let spec = FilterSpec::new()
            .with_gt_or_eq("score", 10_i64)
            .with_lt_or_eq("age", 60_i64)
            .with_eq("status", "on")
            .with_like(["name", "mobile"], "ab")
            .with_where("t.kind <> 'x'")
            .with_left_join("notes n ON n.tid = t.id")
            .with_join("groups g ON g.id = t.gid")
            .with_date_range("created_at", DateRange::new("2024-01-01", "2024-01-31"))
            .with_tags("vip");

        let (sql, values) = render(&spec);
        let fragments = [
            "INNER JOIN `groups` AS `g` ON g.id = t.gid",
            "LEFT JOIN `notes` AS `n` ON n.tid = t.id",
            "FIND_IN_SET(?, tags) > 0",
            "`created_at` <= ?",
            "`created_at` >= ?",
            "(t.kind <> 'x')",
            "`name` LIKE ?",
            "`mobile` LIKE ?",
            "`status` = ?",
            "`age` <= ?",
            "`score` >= ?",
        ];
        for pair in fragments.windows(2) {
            assert!(
                position(&sql, pair[0]) < position(&sql, pair[1]),
                "`{}` should precede `{}` in `{}`",
                pair[0],
                pair[1],
                sql
            );
        }
        assert_eq!(
            values,
            vec![
                Value::from("vip"),
                Value::from("2024-01-31"),
                Value::from("2024-01-01"),
                Value::from("ab%"),
                Value::from("ab%"),
                Value::from("on"),
                Value::from(60_i64),
                Value::from(10_i64),
            ]
        );
    }

    #[test]
    fn test_tags_are_or_combined_and_trimmed() {
        let (sql, values) = render(&FilterSpec::new().with_tags(" a, ,b "));
        assert!(sql.contains("FIND_IN_SET(?, tags) > 0 OR FIND_IN_SET(?, tags) > 0"));
        assert_eq!(values, vec![Value::from("a"), Value::from("b")]);
    }

    #[test]
    fn test_blank_tags_ignored() {
        let (sql, _) = render(&FilterSpec::new().with_tags(" , "));
        assert_eq!(sql, "SELECT `id` FROM `t`");
    }

    #[test]
    fn test_date_range_needs_column() {
        let spec = FilterSpec {
            date_range: DateRange::new("2024-01-01", ""),
            ..FilterSpec::default()
        };
        let (sql, _) = render(&spec);
        assert_eq!(sql, "SELECT `id` FROM `t`");

        let (sql, _) = render(
            &FilterSpec::new().with_date_range("created_at", DateRange::new("2024-01-01", "")),
        );
        assert_eq!(sql, "SELECT `id` FROM `t` WHERE `created_at` >= ?");
    }

    #[test]
    fn test_postgres_date_range_casts_bounds() {
        let spec = FilterSpec::new()
            .with_date_range("created_at", DateRange::new("2024-01-01", "2024-01-31"));
        let (sql, values) = render_with(Dialect::Postgres, &spec);
        assert!(sql.contains(r#""created_at" <= CAST($1 AS timestamp)"#));
        assert!(sql.contains(r#""created_at" >= CAST($2 AS timestamp)"#));
        assert_eq!(values, vec![Value::from("2024-01-31"), Value::from("2024-01-01")]);
    }

    #[test]
    fn test_empty_raw_wheres_skipped() {
        let (sql, _) = render(&FilterSpec::new().with_where("").with_where("  ").with_where("a > 1"));
        assert_eq!(sql, "SELECT `id` FROM `t` WHERE (a > 1)");
    }

    #[test]
    fn test_like_requires_value_and_columns() {
        let (sql, _) = render(&FilterSpec::new().with_like(["name"], ""));
        assert_eq!(sql, "SELECT `id` FROM `t`");
        let (sql, _) = render(&FilterSpec::new().with_like(Vec::<String>::new(), "x"));
        assert_eq!(sql, "SELECT `id` FROM `t`");
    }

    #[test]
    fn test_builder_is_repeatable() {
        let spec = FilterSpec::new().with_eq("a", 1_i64).with_tags("x,y");
        assert_eq!(render(&spec), render(&spec));
    }

    #[test]
    fn test_date_range_parse_json() {
        let range = DateRange::parse_json(r#"{"start":"2024-01-01","end":"2024-02-01"}"#).unwrap();
        assert_eq!(range, DateRange::new("2024-01-01", "2024-02-01"));

        let range = DateRange::parse_json(r#"{"start":"2024-01-01"}"#).unwrap();
        assert_eq!(range.end, "");

        assert!(DateRange::parse_json("  ").unwrap().is_empty());
        assert!(matches!(
            DateRange::parse_json("{bad"),
            Err(Error::BadRequest(_))
        ));
    }

    #[test]
    fn test_filter_spec_from_json() {
        let spec: FilterSpec =
            serde_json::from_str(r#"{"eq": {"status": "on", "kind": 2}, "tags": "a"}"#).unwrap();
        assert_eq!(spec.eq["kind"], FilterValue::Integer(2));
        assert_eq!(spec.tags, "a");
        assert!(spec.joins.is_empty());
    }
}
