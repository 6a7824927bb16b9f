//! Generic CRUD layer
//!
//! Request descriptors ([`CrudGet`], [`CrudQuery`], [`CrudAdd`],
//! [`CrudUpdate`], [`CrudDelete`]) are turned into parameterised SQL and run
//! through a [`CrudGateway`] against any sqlx `Any` database.
//!
//! - [`FilterSpec`] / [`QueryFilterBuilder`]: declarative WHERE clauses
//! - [`PageRequest`] / [`Paginator`] / [`PageResult`]: offset paging with a
//!   first-page total
//! - [`sql`]: dialect-aware statement rendering

mod exec;
mod filter;
mod gateway;
mod page;
mod request;
pub mod sql;
mod value;

pub use exec::StatementRunner;
pub use filter::{DateRange, FilterSpec, QueryFilterBuilder, TAGS_COLUMN};
pub use gateway::CrudGateway;
pub use page::{PageRequest, PageResult, Paginator, DEFAULT_PAGE_SIZE};
pub use request::{
    CrudAdd, CrudDelete, CrudGet, CrudQuery, CrudUpdate, DeletePolicy, DeleteTarget, ID_COLUMN,
};
pub use sql::{CompareOp, Dialect, JoinKind, Statement};
pub use value::{Conditions, FilterValue, Row};
