//! JSON envelope returned by REST handlers
//!
//! # Example
//!
//! ```rust
//! use webcommon::web::RestResult;
//!
//! let ok = RestResult::success(vec![1, 2, 3]);
//! assert_eq!(ok.code, 0);
//!
//! let failed: RestResult = RestResult::error("device not found");
//! assert_eq!(failed.code, 9999);
//! assert_eq!(failed.msgtype, "error");
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// `code` of a successful result
pub const CODE_SUCCESS: i32 = 0;

/// `code` of a failed result
pub const CODE_ERROR: i32 = 9999;

/// `{code, msgtype, msg, data}` envelope
///
/// Always sent with HTTP 200; clients branch on `code`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestResult<T = ()> {
    pub code: i32,
    pub msgtype: String,
    pub msg: String,
    pub data: Option<T>,
}

impl<T> RestResult<T> {
    /// Success carrying `data`
    pub fn success(data: T) -> Self {
        Self {
            code: CODE_SUCCESS,
            msgtype: "info".to_string(),
            msg: "success".to_string(),
            data: Some(data),
        }
    }

    /// Success with a message and no data
    pub fn succ(msg: impl Into<String>) -> Self {
        Self {
            code: CODE_SUCCESS,
            msgtype: "info".to_string(),
            msg: msg.into(),
            data: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            code: CODE_ERROR,
            msgtype: "error".to_string(),
            msg: msg.into(),
            data: None,
        }
    }

    /// Wrap a handler result; errors become an error envelope
    pub fn from_result(result: crate::error::Result<T>) -> Self {
        match result {
            Ok(data) => Self::success(data),
            Err(err) => Self::from(err),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == CODE_SUCCESS
    }
}

impl<T> From<Error> for RestResult<T> {
    fn from(err: Error) -> Self {
        match &err {
            // Details of storage failures stay in the log
            Error::Database(db) => {
                tracing::error!(
                    operation = %db.operation,
                    kind = %db.kind,
                    "request failed: {}",
                    db.message
                );
                Self::error("database operation failed")
            }
            _ => Self::error(err.to_string()),
        }
    }
}

impl<T: Serialize> IntoResponse for RestResult<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}
