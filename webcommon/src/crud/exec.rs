//! Statement execution with uniform logging and error mapping
//!
//! Every statement the gateway runs goes through [`StatementRunner`], so SQL
//! logging and the "log once where detected" rule live in one place.

use sqlx::any::AnyRow;
use sqlx::{Any, AnyConnection, FromRow};

use super::sql::{Dialect, Statement};
use crate::error::{DatabaseError, DatabaseErrorKind, DatabaseOperation, Result};

/// Runs generated statements on a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatementRunner {
    dialect: Dialect,
    log_sql: bool,
}

impl StatementRunner {
    pub fn new(dialect: Dialect, log_sql: bool) -> Self {
        Self { dialect, log_sql }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn log_sql(&self) -> bool {
        self.log_sql
    }

    /// Run a statement that returns no rows, yielding the affected row count
    pub async fn execute(
        &self,
        conn: &mut AnyConnection,
        operation: DatabaseOperation,
        table: &str,
        stmt: &Statement,
    ) -> Result<u64> {
        self.trace(operation, table, stmt);
        let args = self.arguments(operation, table, stmt)?;
        sqlx::query_with::<Any, _>(&stmt.sql, args)
            .execute(&mut *conn)
            .await
            .map(|done| done.rows_affected())
            .map_err(|e| self.fail(operation, table, e))
    }

    /// Fetch every row
    pub async fn fetch_all<T>(
        &self,
        conn: &mut AnyConnection,
        operation: DatabaseOperation,
        table: &str,
        stmt: &Statement,
    ) -> Result<Vec<T>>
    where
        T: for<'r> FromRow<'r, AnyRow> + Send + Unpin,
    {
        self.trace(operation, table, stmt);
        let args = self.arguments(operation, table, stmt)?;
        sqlx::query_as_with::<Any, T, _>(&stmt.sql, args)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| self.fail(operation, table, e))
    }

    /// Fetch exactly one row; no match is the driver's `RowNotFound`
    pub async fn fetch_one<T>(
        &self,
        conn: &mut AnyConnection,
        operation: DatabaseOperation,
        table: &str,
        stmt: &Statement,
    ) -> Result<T>
    where
        T: for<'r> FromRow<'r, AnyRow> + Send + Unpin,
    {
        self.trace(operation, table, stmt);
        let args = self.arguments(operation, table, stmt)?;
        sqlx::query_as_with::<Any, T, _>(&stmt.sql, args)
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| self.fail(operation, table, e))
    }

    /// Fetch a single integer, as produced by `SELECT COUNT(*)`
    pub async fn fetch_count(
        &self,
        conn: &mut AnyConnection,
        table: &str,
        stmt: &Statement,
    ) -> Result<i64> {
        let operation = DatabaseOperation::Count;
        self.trace(operation, table, stmt);
        let args = self.arguments(operation, table, stmt)?;
        sqlx::query_scalar_with::<Any, i64, _>(&stmt.sql, args)
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| self.fail(operation, table, e))
    }

    fn trace(&self, operation: DatabaseOperation, table: &str, stmt: &Statement) {
        if self.log_sql {
            tracing::debug!(
                operation = %operation,
                table,
                sql = %stmt.sql,
                args = ?stmt.values,
                "executing statement"
            );
        }
    }

    fn arguments<'q>(
        &self,
        operation: DatabaseOperation,
        table: &str,
        stmt: &Statement,
    ) -> Result<sqlx::any::AnyArguments<'q>> {
        stmt.arguments().map_err(|e| {
            let err = DatabaseError::with_context(
                operation,
                DatabaseErrorKind::QueryBuild,
                format!("failed to bind arguments: {}", e),
                table,
            );
            log_failure(&err);
            err.into()
        })
    }

    fn fail(
        &self,
        operation: DatabaseOperation,
        table: &str,
        err: sqlx::Error,
    ) -> crate::error::Error {
        let err = DatabaseError::from(err)
            .with_operation(operation)
            .add_context(table);
        log_failure(&err);
        err.into()
    }
}

/// Log a database failure at the point it was detected
pub(crate) fn log_failure(err: &DatabaseError) {
    tracing::error!(
        operation = %err.operation,
        kind = %err.kind,
        context = ?err.context,
        "database operation failed: {}",
        err.message
    );
}
