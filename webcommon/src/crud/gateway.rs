//! The CRUD operation surface
//!
//! Every operation comes in two forms: `op` runs on the gateway's pool, and
//! `op_in` runs on anything that can hand out a connection: `&AnyPool`,
//! `&mut AnyConnection` or `&mut Transaction<'_, Any>`. Callers pick the
//! transactional scope by what they pass in.
//!
//! # Example
//!
//! ```rust,no_run
//! use webcommon::crud::{CrudGateway, CrudQuery, CrudUpdate, Dialect};
//!
//! #[derive(sqlx::FromRow)]
//! struct Device {
//!     id: i64,
//!     name: String,
//! }
//!
//! # async fn example(pool: sqlx::AnyPool) -> webcommon::Result<()> {
//! let gateway = CrudGateway::new(pool, Dialect::MySql).with_sql_logging(true);
//!
//! let page = gateway
//!     .query::<Device>(
//!         &CrudQuery::new("devices")
//!             .columns(["id", "name"])
//!             .eq("status", "online")
//!             .page(0, 20),
//!     )
//!     .await?;
//! println!("{} devices in total", page.total_count);
//!
//! let mut tx = gateway.begin().await?;
//! gateway
//!     .update_in(&mut tx, &CrudUpdate::new("devices").set("status", "offline").eq("id", 7_i64))
//!     .await?;
//! tx.commit().await?;
//! # Ok(())
//! # }
//! ```

use sea_query::{ConditionalStatement, IntoCondition};
use sqlx::any::AnyRow;
use sqlx::{Acquire, Any, AnyPool, FromRow, Transaction};

use super::exec::{log_failure, StatementRunner};
use super::page::{PageResult, Paginator};
use super::request::{
    CrudAdd, CrudDelete, CrudGet, CrudQuery, CrudUpdate, DeletePolicy, DeleteTarget, ID_COLUMN,
};
use super::sql::{self, CompareOp, Dialect, Statement};
use super::value::Conditions;
use crate::error::{DatabaseError, DatabaseOperation, Error, Result};

/// Generic CRUD access to a relational database
///
/// Holds no per-call state; clones share the pool.
#[derive(Debug, Clone)]
pub struct CrudGateway {
    pool: AnyPool,
    runner: StatementRunner,
    delete_policy: DeletePolicy,
}

impl CrudGateway {
    pub fn new(pool: AnyPool, dialect: Dialect) -> Self {
        Self {
            pool,
            runner: StatementRunner::new(dialect, false),
            delete_policy: DeletePolicy::default(),
        }
    }

    /// Log every statement with its arguments at DEBUG
    #[must_use]
    pub fn with_sql_logging(mut self, enabled: bool) -> Self {
        self.runner = StatementRunner::new(self.runner.dialect(), enabled);
        self
    }

    /// Policy for batch deletes that do not set their own
    #[must_use]
    pub fn with_delete_policy(mut self, policy: DeletePolicy) -> Self {
        self.delete_policy = policy;
        self
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    pub fn dialect(&self) -> Dialect {
        self.runner.dialect()
    }

    pub fn delete_policy(&self) -> DeletePolicy {
        self.delete_policy
    }

    /// Open a transaction on the pool for grouping `*_in` calls
    pub async fn begin(&self) -> Result<Transaction<'static, Any>> {
        self.pool
            .begin()
            .await
            .map_err(|e| transaction_error("begin", e))
    }

    pub async fn get<T>(&self, request: &CrudGet) -> Result<T>
    where
        T: for<'r> FromRow<'r, AnyRow> + Send + Unpin,
    {
        self.get_in(&self.pool, request).await
    }

    /// Fetch the first row matching the equality filter
    ///
    /// No match is reported as the driver's no-rows error, i.e. a
    /// [`DatabaseErrorKind::NotFound`](crate::error::DatabaseErrorKind::NotFound)
    /// database error.
    pub async fn get_in<'c, T, A>(&self, conn: A, request: &CrudGet) -> Result<T>
    where
        A: Acquire<'c, Database = Any>,
        T: for<'r> FromRow<'r, AnyRow> + Send + Unpin,
    {
        let stmt = get_statement(request, self.dialect());

        let mut conn = acquire(conn, DatabaseOperation::Query).await?;
        self.runner
            .fetch_one(&mut *conn, DatabaseOperation::Query, request.table, &stmt)
            .await
    }

    pub async fn query<T>(&self, request: &CrudQuery) -> Result<PageResult<T>>
    where
        T: for<'r> FromRow<'r, AnyRow> + Send + Unpin,
    {
        self.query_in(&self.pool, request).await
    }

    /// Run a filtered list query
    ///
    /// The data and count statements share one connection. See
    /// [`PageResult`] for when `total_count` is filled in.
    pub async fn query_in<'c, T, A>(&self, conn: A, request: &CrudQuery) -> Result<PageResult<T>>
    where
        A: Acquire<'c, Database = Any>,
        T: for<'r> FromRow<'r, AnyRow> + Send + Unpin,
    {
        let mut conn = acquire(conn, DatabaseOperation::Query).await?;
        Paginator::new(request.table, &request.columns, &request.request)
            .fetch(&mut *conn, &self.runner)
            .await
    }

    pub async fn add(&self, request: &CrudAdd) -> Result<u64> {
        self.add_in(&self.pool, request).await
    }

    /// Insert every row inside one transaction
    ///
    /// The first failing row rolls the whole batch back and its error is
    /// returned. Inside a caller transaction this uses a savepoint. Returns
    /// the number of rows inserted.
    pub async fn add_in<'c, A>(&self, conn: A, request: &CrudAdd) -> Result<u64>
    where
        A: Acquire<'c, Database = Any>,
    {
        if request.rows.is_empty() {
            return Ok(0);
        }

        let statements = request
            .rows
            .iter()
            .map(|row| sql::insert(request.table, row).map(|insert| self.dialect().render(&insert)))
            .collect::<std::result::Result<Vec<Statement>, DatabaseError>>()
            .map_err(|e| {
                log_failure(&e);
                Error::Database(e)
            })?;

        let mut tx = conn
            .begin()
            .await
            .map_err(|e| transaction_error("begin", e))?;

        let mut inserted = 0;
        for stmt in &statements {
            match self
                .runner
                .execute(&mut *tx, DatabaseOperation::Insert, request.table, stmt)
                .await
            {
                Ok(n) => inserted += n,
                Err(err) => {
                    if let Err(e) = tx.rollback().await {
                        tracing::warn!(table = request.table, "rollback failed: {}", e);
                    }
                    return Err(err);
                }
            }
        }

        tx.commit()
            .await
            .map_err(|e| transaction_error("commit", e))?;
        Ok(inserted)
    }

    pub async fn update(&self, request: &CrudUpdate) -> Result<u64> {
        self.update_in(&self.pool, request).await
    }

    /// Run one UPDATE; returns the number of rows affected
    pub async fn update_in<'c, A>(&self, conn: A, request: &CrudUpdate) -> Result<u64>
    where
        A: Acquire<'c, Database = Any>,
    {
        let filter = sql::and_all(
            [
                (CompareOp::Eq, &request.eq),
                (CompareOp::LtOrEq, &request.lt_or_eq),
                (CompareOp::GtOrEq, &request.gt_or_eq),
            ]
            .into_iter()
            .filter(|(_, group)| !group.is_empty())
            .map(|(op, group)| op.all(group)),
        );
        let update = sql::update(request.table, &request.values, filter).map_err(|e| {
            log_failure(&e);
            Error::Database(e)
        })?;
        let stmt = self.dialect().render(&update);

        let mut conn = acquire(conn, DatabaseOperation::Update).await?;
        self.runner
            .execute(&mut *conn, DatabaseOperation::Update, request.table, &stmt)
            .await
    }

    pub async fn delete(&self, request: &CrudDelete) -> Result<u64> {
        self.delete_in(&self.pool, request).await
    }

    /// Delete by ids (one statement per id) or by filter
    ///
    /// Per-id failures follow the request's policy, falling back to the
    /// gateway's. Returns the number of rows deleted.
    pub async fn delete_in<'c, A>(&self, conn: A, request: &CrudDelete) -> Result<u64>
    where
        A: Acquire<'c, Database = Any>,
    {
        let ids = match &request.target {
            DeleteTarget::Filter(filter) => {
                return self.delete_with_filter_in(conn, request.table, filter).await;
            }
            DeleteTarget::Ids(ids) => ids,
        };
        let policy = request.policy.unwrap_or(self.delete_policy);

        let mut conn = acquire(conn, DatabaseOperation::Delete).await?;
        let mut deleted = 0;
        for id in ids {
            let by_id = CompareOp::Eq.expr(ID_COLUMN, id).into_condition();
            let stmt = self
                .dialect()
                .render(&sql::delete(request.table, Some(by_id)));
            match self
                .runner
                .execute(&mut *conn, DatabaseOperation::Delete, request.table, &stmt)
                .await
            {
                Ok(n) => deleted += n,
                Err(err) => match policy {
                    DeletePolicy::Strict => return Err(err),
                    DeletePolicy::BestEffort => {
                        tracing::warn!(table = request.table, id = %id, "skipping failed delete");
                    }
                },
            }
        }
        Ok(deleted)
    }

    pub async fn delete_with_filter(&self, table: &'static str, filter: &Conditions) -> Result<u64> {
        self.delete_with_filter_in(&self.pool, table, filter).await
    }

    /// Single DELETE restricted by equality conditions
    ///
    /// An empty filter deletes every row.
    pub async fn delete_with_filter_in<'c, A>(
        &self,
        conn: A,
        table: &'static str,
        filter: &Conditions,
    ) -> Result<u64>
    where
        A: Acquire<'c, Database = Any>,
    {
        let filter = (!filter.is_empty()).then(|| CompareOp::Eq.all(filter));
        let stmt = self.dialect().render(&sql::delete(table, filter));

        let mut conn = acquire(conn, DatabaseOperation::Delete).await?;
        self.runner
            .execute(&mut *conn, DatabaseOperation::Delete, table, &stmt)
            .await
    }

    /// Remove every row of `table` immediately, outside any transaction
    pub async fn truncate(&self, table: &'static str) -> Result<()> {
        let stmt = self.dialect().truncate(table);
        let mut conn = acquire(&self.pool, DatabaseOperation::Truncate).await?;
        self.runner
            .execute(&mut *conn, DatabaseOperation::Truncate, table, &stmt)
            .await?;
        Ok(())
    }
}

async fn acquire<'c, A>(conn: A, operation: DatabaseOperation) -> Result<A::Connection>
where
    A: Acquire<'c, Database = Any>,
{
    conn.acquire().await.map_err(|e| {
        let err = DatabaseError::from(e).with_operation(operation);
        log_failure(&err);
        Error::Database(err)
    })
}

fn transaction_error(step: &str, e: sqlx::Error) -> Error {
    let err = DatabaseError::transaction_failed(format!("{} failed: {}", step, e));
    log_failure(&err);
    Error::Database(err)
}

/// First row matching the equality filter
fn get_statement(request: &CrudGet, dialect: Dialect) -> Statement {
    let mut select = sql::select(request.table, &request.columns);
    if !request.eq.is_empty() {
        select.cond_where(CompareOp::Eq.all(&request.eq));
    }
    select.limit(1);
    dialect.render(&select)
}
