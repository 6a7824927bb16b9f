//! # webcommon
//!
//! Shared building blocks for internal web backends built on axum and sqlx.
//!
//! ## Features
//!
//! - **Generic CRUD**: get, paged query, batch insert, update and delete over
//!   any table through one [`CrudGateway`](crud::CrudGateway)
//! - **Declarative filters**: equality, ranges, prefix search, tag membership,
//!   date ranges, joins and raw conditions, always bound as parameters
//! - **Paging**: offset pages with a total count on the first page
//! - **Configuration**: TOML files plus `WEBCOMMON_*` environment overrides
//! - **Logging**: JSON tracing output filtered by the configured level
//! - **HTTP helpers**: `{code, msgtype, msg, data}` envelopes, list
//!   parameters and form value access
//!
//! ## Example
//!
//! ```rust,no_run
//! use webcommon::prelude::*;
//! use webcommon::crud::CrudQuery;
//!
//! #[derive(Serialize, sqlx::FromRow)]
//! struct User {
//!     id: i64,
//!     name: String,
//! }
//!
//! async fn list_users(
//!     State(state): State<AppState>,
//!     Query(params): Query<ListParams>,
//! ) -> RestResult<PageResult<User>> {
//!     let spec = ListSpec::new("users", &["id", "name"])
//!         .like_columns(&["name"])
//!         .sortable(&["id", "name"]);
//!     let result = match params.into_query(&spec) {
//!         Ok(query) => state.gateway().query::<User>(&query).await,
//!         Err(e) => Err(e),
//!     };
//!     RestResult::from_result(result)
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load_for_service("users")?;
//!     init_tracing(&config)?;
//!
//!     let bind = config.web.bind_address();
//!     let state = AppState::connect(config).await?;
//!
//!     let app = Router::new()
//!         .route("/users", get(list_users))
//!         .with_state(state);
//!
//!     let listener = tokio::net::TcpListener::bind(bind).await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod crud;
pub mod database;
pub mod error;
pub mod observability;
pub mod state;
pub mod timeutil;
pub mod validate;
pub mod web;

pub use error::{Error, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{Config, DatabaseConfig, ServiceConfig, WebConfig};
    pub use crate::crud::{
        CrudAdd, CrudDelete, CrudGateway, CrudGet, CrudQuery, CrudUpdate, DateRange, Dialect,
        FilterSpec, FilterValue, PageRequest, PageResult, Row,
    };
    pub use crate::database::create_pool;
    pub use crate::error::{DatabaseError, DatabaseErrorKind, DatabaseOperation, Error, Result};
    pub use crate::observability::init_tracing;
    pub use crate::state::AppState;
    pub use crate::web::{FormValues, ListParams, ListSpec, RestResult, SortOrder};

    pub use axum::{
        extract::{Form, Path, Query, State},
        http::StatusCode,
        response::{IntoResponse, Json, Response},
        routing::{delete, get, post, put},
        Router,
    };

    pub use serde::{Deserialize, Serialize};

    pub use tracing::{debug, error, info, warn};

    pub use tokio;
}
