//! Statement assembly on top of `sea_query`
//!
//! Statements are built with `sea_query` and rendered for the connected
//! [`Dialect`]; every value ends up as a bound parameter. Plain column and
//! table names (`name`, `u.name`, `orders o`) are quoted by the query
//! builder. Anything else, such as joins' ON text, raw WHERE fragments or
//! expression columns, is written verbatim and must come from trusted code.
//!
//! # Example
//!
//! ```rust
//! use sea_query::ConditionalStatement;
//! use webcommon::crud::sql::{self, CompareOp, Dialect};
//! use webcommon::crud::FilterValue;
//!
//! let mut select = sql::select("users", ["id", "name"]);
//! select.and_where(CompareOp::Eq.expr("status", &FilterValue::from("active")));
//! sql::order_by(&mut select, "id DESC");
//!
//! let stmt = Dialect::Postgres.render(&select);
//! assert_eq!(
//!     stmt.sql,
//!     r#"SELECT "id", "name" FROM "users" WHERE "status" = $1 ORDER BY "id" DESC"#
//! );
//! assert_eq!(stmt.values.0.len(), 1);
//! ```

use std::fmt;

use sea_query::{
    Alias, Asterisk, Condition, ConditionalStatement, DeleteStatement, Expr, Func, InsertStatement,
    IntoTableRef, JoinType, MysqlQueryBuilder, Order, PostgresQueryBuilder, Query,
    QueryStatementWriter, SchemaStatementBuilder, SelectStatement, SimpleExpr, SqliteQueryBuilder,
    Table, TableRef, UpdateStatement, Value, Values,
};
use serde::{Deserialize, Serialize};
use sqlx::any::AnyArguments;
use sqlx::error::BoxDynError;
use sqlx::Arguments;

use super::value::{FilterValue, Row};
use crate::error::{DatabaseError, DatabaseErrorKind, DatabaseOperation};
use crate::validate::is_identifier;

/// SQL flavour spoken by the connected database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// MySQL / MariaDB
    #[default]
    MySql,
    /// PostgreSQL
    Postgres,
    /// SQLite
    Sqlite,
}

impl Dialect {
    /// Detect the dialect from a connection URL scheme
    ///
    /// ```rust
    /// use webcommon::crud::Dialect;
    ///
    /// assert_eq!(Dialect::from_url("mysql://root@localhost/app"), Some(Dialect::MySql));
    /// assert_eq!(Dialect::from_url("postgresql://localhost/app"), Some(Dialect::Postgres));
    /// assert_eq!(Dialect::from_url("sqlite::memory:"), Some(Dialect::Sqlite));
    /// assert_eq!(Dialect::from_url("redis://localhost"), None);
    /// ```
    pub fn from_url(url: &str) -> Option<Self> {
        let scheme = url.split(':').next()?.to_ascii_lowercase();
        match scheme.as_str() {
            "mysql" | "mariadb" => Some(Self::MySql),
            "postgres" | "postgresql" => Some(Self::Postgres),
            "sqlite" => Some(Self::Sqlite),
            _ => None,
        }
    }

    /// URL scheme used when building a connection URL from parts
    pub fn scheme(&self) -> &'static str {
        match self {
            Self::MySql => "mysql",
            Self::Postgres => "postgres",
            Self::Sqlite => "sqlite",
        }
    }

    /// Default server port, `None` for file databases
    pub fn default_port(&self) -> Option<u16> {
        match self {
            Self::MySql => Some(3306),
            Self::Postgres => Some(5432),
            Self::Sqlite => None,
        }
    }

    /// Render a query with this dialect's quoting and placeholders
    pub fn render<S: QueryStatementWriter>(&self, stmt: &S) -> Statement {
        let (sql, values) = match self {
            Self::MySql => stmt.build(MysqlQueryBuilder),
            Self::Postgres => stmt.build(PostgresQueryBuilder),
            Self::Sqlite => stmt.build(SqliteQueryBuilder),
        };
        Statement { sql, values }
    }

    /// Statement that removes every row of `table`
    ///
    /// SQLite has no `TRUNCATE`; an unfiltered `DELETE` does the same job.
    pub fn truncate(&self, table: &str) -> Statement {
        let (table_ref, _) = table_name(table);
        match self {
            Self::MySql => Statement::raw(
                Table::truncate()
                    .table(table_ref)
                    .build(MysqlQueryBuilder),
            ),
            Self::Postgres => Statement::raw(
                Table::truncate()
                    .table(table_ref)
                    .build(PostgresQueryBuilder),
            ),
            Self::Sqlite => self.render(&delete(table, None)),
        }
    }

    /// Membership of `tag` in a comma separated tag column
    pub fn tag_member(&self, column: &str, tag: &str) -> SimpleExpr {
        match self {
            Self::MySql => Expr::cust_with_values(
                format!("FIND_IN_SET(?, {}) > 0", column),
                [tag.to_string()],
            ),
            Self::Postgres => Expr::cust_with_values(
                format!("$1 = ANY(string_to_array({}, ','))", column),
                [tag.to_string()],
            ),
            Self::Sqlite => Expr::cust_with_values(
                format!("(',' || {} || ',') LIKE ?", column),
                [format!("%,{},%", tag)],
            ),
        }
    }

    /// Bound operand for comparing a date column against text
    ///
    /// Postgres does not compare `timestamp`/`date` columns with `text`
    /// parameters, so the bound is cast there.
    pub fn date_bound(&self, value: &str) -> SimpleExpr {
        match self {
            Self::Postgres => {
                Expr::cust_with_values("CAST($1 AS timestamp)", [value.to_string()])
            }
            Self::MySql | Self::Sqlite => SimpleExpr::Value(value.into()),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme())
    }
}

/// Rendered SQL text plus the values bound to its placeholders
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    /// Values in placeholder order
    pub values: Values,
}

impl Statement {
    /// Plain statement without parameters
    pub fn raw(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            values: Values(Vec::new()),
        }
    }

    /// Convert the bound values into driver arguments
    ///
    /// The `Any` driver carries booleans, integers up to 64 bits, floats,
    /// text and bytes; unsigned values must fit in an `i64`.
    pub fn arguments<'q>(&self) -> Result<AnyArguments<'q>, BoxDynError> {
        let mut args = AnyArguments::default();
        for value in &self.values.0 {
            match value {
                Value::Bool(v) => args.add(*v)?,
                Value::TinyInt(v) => args.add(v.map(i16::from))?,
                Value::SmallInt(v) => args.add(*v)?,
                Value::Int(v) => args.add(*v)?,
                Value::BigInt(v) => args.add(*v)?,
                Value::TinyUnsigned(v) => args.add(v.map(i16::from))?,
                Value::SmallUnsigned(v) => args.add(v.map(i32::from))?,
                Value::Unsigned(v) => args.add(v.map(i64::from))?,
                Value::BigUnsigned(v) => args.add(v.map(i64::try_from).transpose()?)?,
                Value::Float(v) => args.add(*v)?,
                Value::Double(v) => args.add(*v)?,
                Value::String(v) => args.add(v.as_ref().map(|s| s.to_string()))?,
                Value::Char(v) => args.add(v.map(String::from))?,
                Value::Bytes(v) => args.add(v.as_ref().map(|b| b.to_vec()))?,
                #[allow(unreachable_patterns)]
                other => return Err(format!("unsupported parameter type: {:?}", other).into()),
            }
        }
        Ok(args)
    }
}

impl From<&FilterValue> for Value {
    fn from(value: &FilterValue) -> Self {
        match value {
            FilterValue::Null => Value::String(None),
            FilterValue::Boolean(b) => Value::from(*b),
            FilterValue::Integer(n) => Value::from(*n),
            FilterValue::Float(n) => Value::from(*n),
            FilterValue::String(s) => Value::from(s.as_str()),
        }
    }
}

/// Column operand: quoted when it is a plain or qualified name, verbatim
/// otherwise
pub fn column(name: &str) -> Expr {
    if !is_identifier(name) {
        return Expr::expr(Expr::cust(name));
    }
    match name.split_once('.') {
        Some((table, column)) => Expr::col((Alias::new(table), Alias::new(column))),
        None => Expr::col(Alias::new(name)),
    }
}

/// Split `"schema.table alias"` into a table reference and its alias
fn table_name(name: &str) -> (TableRef, Option<Alias>) {
    let mut parts = name.split_whitespace();
    let base = parts.next().unwrap_or(name);
    let alias = match (parts.next(), parts.next()) {
        (Some(keyword), Some(alias)) if keyword.eq_ignore_ascii_case("as") => Some(alias),
        (Some(alias), None) => Some(alias),
        _ => None,
    };
    let table_ref = match base.split_once('.') {
        Some((schema, table)) => (Alias::new(schema), Alias::new(table)).into_table_ref(),
        None => Alias::new(base).into_table_ref(),
    };
    (table_ref, alias.map(Alias::new))
}

/// Comparison applied to each entry of a filter group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `=`, or `IS NULL` against a null value
    Eq,
    /// `<=`
    LtOrEq,
    /// `>=`
    GtOrEq,
}

impl CompareOp {
    pub fn expr(self, name: &str, value: &FilterValue) -> SimpleExpr {
        let col = column(name);
        match (self, value) {
            (Self::Eq, FilterValue::Null) => col.is_null(),
            (Self::Eq, value) => col.eq(Value::from(value)),
            (Self::LtOrEq, value) => col.lte(Value::from(value)),
            (Self::GtOrEq, value) => col.gte(Value::from(value)),
        }
    }

    /// AND of one comparison per entry
    pub fn all<'a, I>(self, conditions: I) -> Condition
    where
        I: IntoIterator<Item = (&'a String, &'a FilterValue)>,
    {
        conditions
            .into_iter()
            .fold(Condition::all(), |all, (name, value)| {
                all.add(self.expr(name, value))
            })
    }
}

/// Trusted SQL fragment, kept inside its own parentheses
pub fn raw(clause: &str) -> SimpleExpr {
    Expr::cust(format!("({})", clause))
}

/// AND the parts together; `None` when there is nothing to filter on
pub fn and_all<I>(parts: I) -> Option<Condition>
where
    I: IntoIterator<Item = Condition>,
{
    let mut parts = parts.into_iter().peekable();
    parts.peek()?;
    Some(parts.fold(Condition::all(), |all, part| all.add(part)))
}

/// Join flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

impl From<JoinKind> for JoinType {
    fn from(kind: JoinKind) -> Self {
        match kind {
            JoinKind::Inner => JoinType::InnerJoin,
            JoinKind::Left => JoinType::LeftJoin,
        }
    }
}

/// SELECT of `columns` from `table`; no columns selects `*`
pub fn select<I, S>(table: &str, columns: I) -> SelectStatement
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut select = Query::select();
    let (table_ref, alias) = table_name(table);
    match alias {
        Some(alias) => select.from_as(table_ref, alias),
        None => select.from(table_ref),
    };

    let mut selected = false;
    for name in columns {
        select.expr(column(name.as_ref()));
        selected = true;
    }
    if !selected {
        select.column(Asterisk);
    }
    select
}

/// `SELECT COUNT(*) FROM table`
pub fn count(table: &str) -> SelectStatement {
    let mut select = Query::select();
    let (table_ref, alias) = table_name(table);
    match alias {
        Some(alias) => select.from_as(table_ref, alias),
        None => select.from(table_ref),
    };
    select.expr(Func::count(Expr::col(Asterisk)));
    select
}

/// Add a `"<table> ON <condition>"` join fragment
///
/// A fragment without ` ON ` joins on `1=1`.
pub fn join(select: &mut SelectStatement, kind: JoinKind, fragment: &str) {
    let lower = fragment.to_ascii_lowercase();
    let (target, on) = match lower.find(" on ") {
        Some(at) => (fragment[..at].trim(), fragment[at + 4..].trim()),
        None => (fragment.trim(), "1=1"),
    };
    let (table_ref, alias) = table_name(target);
    let condition = Expr::cust(on);
    match alias {
        Some(alias) => select.join_as(kind.into(), table_ref, alias, condition),
        None => select.join(kind.into(), table_ref, condition),
    };
}

/// Apply an ORDER BY clause such as `"name DESC, id"`
///
/// Blank input adds nothing. Items without a direction sort ascending.
pub fn order_by(select: &mut SelectStatement, clause: &str) {
    for item in split_top_level(clause) {
        let (target, order) = match item.rsplit_once(char::is_whitespace) {
            Some((target, dir)) if dir.eq_ignore_ascii_case("desc") => (target.trim(), Order::Desc),
            Some((target, dir)) if dir.eq_ignore_ascii_case("asc") => (target.trim(), Order::Asc),
            _ => (item, Order::Asc),
        };
        select.order_by_expr(column(target).into(), order);
    }
}

/// Comma separated items, ignoring commas inside parentheses
fn split_top_level(clause: &str) -> Vec<&str> {
    let mut items = Vec::new();
    let mut depth = 0_usize;
    let mut start = 0;
    for (i, c) in clause.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                items.push(clause[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    items.push(clause[start..].trim());
    items.retain(|item| !item.is_empty());
    items
}

fn build_error(
    operation: DatabaseOperation,
    message: impl Into<String>,
    table: &str,
) -> DatabaseError {
    DatabaseError::with_context(operation, DatabaseErrorKind::QueryBuild, message, table)
}

/// INSERT of one row; an empty row is rejected
pub fn insert(table: &str, row: &Row) -> Result<InsertStatement, DatabaseError> {
    if row.is_empty() {
        return Err(build_error(
            DatabaseOperation::Insert,
            "insert row has no columns",
            table,
        ));
    }
    let (table_ref, _) = table_name(table);
    let mut insert = Query::insert();
    insert
        .into_table(table_ref)
        .columns(row.keys().map(|name| Alias::new(name.as_str())));
    insert
        .values(row.values().map(|value| SimpleExpr::Value(value.into())))
        .map_err(|e| build_error(DatabaseOperation::Insert, e.to_string(), table))?;
    Ok(insert)
}

/// UPDATE of the SET list under an optional filter; an empty SET list is rejected
pub fn update(
    table: &str,
    values: &Row,
    filter: Option<Condition>,
) -> Result<UpdateStatement, DatabaseError> {
    if values.is_empty() {
        return Err(build_error(
            DatabaseOperation::Update,
            "update has no values to set",
            table,
        ));
    }
    let (table_ref, _) = table_name(table);
    let mut update = Query::update();
    update.table(table_ref);
    for (name, value) in values {
        update.value(Alias::new(name.as_str()), SimpleExpr::Value(value.into()));
    }
    if let Some(filter) = filter {
        update.cond_where(filter);
    }
    Ok(update)
}

/// DELETE under an optional filter
pub fn delete(table: &str, filter: Option<Condition>) -> DeleteStatement {
    let (table_ref, _) = table_name(table);
    let mut delete = Query::delete();
    delete.from_table(table_ref);
    if let Some(filter) = filter {
        delete.cond_where(filter);
    }
    delete
}
