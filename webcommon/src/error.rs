//! Error types and HTTP response conversion

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Database operation being performed when the error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatabaseOperation {
    Connect,
    /// SELECT of rows
    Query,
    /// The companion COUNT(*) of a paged query
    Count,
    Insert,
    Update,
    Delete,
    Truncate,
    /// Begin, commit or rollback
    Transaction,
    /// Checking a connection out of the pool
    PoolAcquire,
}

impl DatabaseOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Query => "query",
            Self::Count => "count",
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Truncate => "truncate",
            Self::Transaction => "transaction",
            Self::PoolAcquire => "pool_acquire",
        }
    }
}

impl fmt::Display for DatabaseOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of database error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatabaseErrorKind {
    ConnectionFailed,
    /// No row matched (the driver's no-rows condition)
    NotFound,
    /// Unique, foreign key, not null or check constraint
    ConstraintViolation,
    QueryFailed,
    /// Statement could not be generated from the request
    QueryBuild,
    TransactionFailed,
    /// Column value could not be decoded into the requested type
    TypeConversion,
    Configuration,
    PoolExhausted,
    Other,
}

impl DatabaseErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConnectionFailed => "connection_failed",
            Self::NotFound => "not_found",
            Self::ConstraintViolation => "constraint_violation",
            Self::QueryFailed => "query_failed",
            Self::QueryBuild => "query_build",
            Self::TransactionFailed => "transaction_failed",
            Self::TypeConversion => "type_conversion",
            Self::Configuration => "configuration",
            Self::PoolExhausted => "pool_exhausted",
            Self::Other => "other",
        }
    }

    /// HTTP status and the message shown to clients
    ///
    /// Driver messages can leak schema details, so they only go to the log.
    fn public(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound => (StatusCode::NOT_FOUND, "record not found"),
            Self::ConstraintViolation => (StatusCode::CONFLICT, "conflicts with existing data"),
            Self::QueryBuild => (StatusCode::BAD_REQUEST, "invalid request"),
            Self::PoolExhausted => (StatusCode::SERVICE_UNAVAILABLE, "service busy, try again later"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "database operation failed"),
        }
    }
}

impl fmt::Display for DatabaseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured database error with operation context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseError {
    pub operation: DatabaseOperation,
    pub kind: DatabaseErrorKind,
    /// Driver or builder message; never shown to clients
    pub message: String,
    /// Table name, or the sanitized URL for connection failures
    pub context: Option<String>,
}

impl DatabaseError {
    pub fn new(
        operation: DatabaseOperation,
        kind: DatabaseErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            context: None,
        }
    }

    pub fn with_context(
        operation: DatabaseOperation,
        kind: DatabaseErrorKind,
        message: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            context: Some(context.into()),
        }
    }

    pub fn not_found(operation: DatabaseOperation, message: impl Into<String>) -> Self {
        Self::new(operation, DatabaseErrorKind::NotFound, message)
    }

    pub fn transaction_failed(message: impl Into<String>) -> Self {
        Self::new(
            DatabaseOperation::Transaction,
            DatabaseErrorKind::TransactionFailed,
            message,
        )
    }

    /// Lost connections and an exhausted pool may clear up on their own
    pub fn is_retriable(&self) -> bool {
        matches!(
            self.kind,
            DatabaseErrorKind::ConnectionFailed | DatabaseErrorKind::PoolExhausted
        )
    }

    /// Add context to an existing error
    pub fn add_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Re-attribute a statement failure to the gateway operation that ran it
    ///
    /// Connection and pool failures keep their own operation.
    pub fn with_operation(mut self, operation: DatabaseOperation) -> Self {
        if !matches!(
            self.operation,
            DatabaseOperation::Connect | DatabaseOperation::PoolAcquire
        ) {
            self.operation = operation;
        }
        self
    }
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Database {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        if let Some(ref ctx) = self.context {
            write!(f, " [context: {}]", ctx)?;
        }
        Ok(())
    }
}

impl std::error::Error for DatabaseError {}

/// Sanitize a database URL by removing credentials
pub fn sanitize_url(url: &str) -> String {
    if let Some(at_pos) = url.rfind('@') {
        if let Some(scheme_end) = url.find("://") {
            if scheme_end < at_pos {
                let scheme = &url[..scheme_end + 3];
                let after_at = &url[at_pos + 1..];
                return format!("{}<redacted>@{}", scheme, after_at);
            }
        }
    }
    url.to_string()
}

/// Result type alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the crate
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// Structured database error with operation context
    #[error("{0}")]
    Database(DatabaseError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Validation error (422)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal server error
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl Error {
    /// The structured database error, if this is one
    pub fn as_database(&self) -> Option<&DatabaseError> {
        match self {
            Error::Database(e) => Some(e),
            _ => None,
        }
    }
}

/// JSON body of an error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Stable machine-readable code such as `DATABASE_NOT_FOUND`
    pub code: String,
    pub status: u16,
}

impl Error {
    /// Status, code and client-facing message
    fn public(&self) -> (StatusCode, String, String) {
        match self {
            Error::Database(e) => {
                let (status, message) = e.kind.public();
                (
                    status,
                    format!("DATABASE_{}", e.kind.as_str().to_uppercase()),
                    message.to_string(),
                )
            }
            Error::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND".into(), msg.clone()),
            Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST".into(), msg.clone()),
            Error::ValidationError(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "VALIDATION_ERROR".into(),
                msg.clone(),
            ),
            Error::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIG_ERROR".into(),
                "service misconfigured".into(),
            ),
            Error::Io(_) | Error::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR".into(),
                "internal server error".into(),
            ),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, code, error) = self.public();
        // Database failures were logged where they happened
        if status.is_server_error() && self.as_database().is_none() {
            tracing::error!(code = %code, "request failed: {}", self);
        }
        let body = ErrorResponse {
            error,
            code,
            status: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        use sqlx::error::ErrorKind;
        use sqlx::Error as E;
        use DatabaseErrorKind as K;
        use DatabaseOperation as Op;

        let (operation, kind) = match &err {
            E::RowNotFound => (Op::Query, K::NotFound),
            E::PoolTimedOut => (Op::PoolAcquire, K::PoolExhausted),
            E::PoolClosed | E::Io(_) | E::Tls(_) | E::WorkerCrashed => {
                (Op::Connect, K::ConnectionFailed)
            }
            E::Configuration(_) => (Op::Connect, K::Configuration),
            E::TypeNotFound { .. } | E::ColumnDecode { .. } | E::Decode(_) => {
                (Op::Query, K::TypeConversion)
            }
            E::Database(db) => match db.kind() {
                ErrorKind::UniqueViolation
                | ErrorKind::ForeignKeyViolation
                | ErrorKind::NotNullViolation
                | ErrorKind::CheckViolation => (Op::Query, K::ConstraintViolation),
                _ => (Op::Query, K::QueryFailed),
            },
            E::Protocol(_)
            | E::ColumnNotFound(_)
            | E::ColumnIndexOutOfBounds { .. }
            | E::AnyDriverError(_) => (Op::Query, K::QueryFailed),
            _ => (Op::Query, K::Other),
        };
        Self::new(operation, kind, err.to_string())
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Error::Database(DatabaseError::from(err))
    }
}

impl From<DatabaseError> for Error {
    fn from(err: DatabaseError) -> Self {
        Error::Database(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use DatabaseOperation as Op;

    #[test]
    fn test_database_error_with_context() {
        let err = DatabaseError::with_context(
            DatabaseOperation::Insert,
            DatabaseErrorKind::ConstraintViolation,
            "Unique constraint violated",
            "users",
        );
        assert_eq!(err.operation, DatabaseOperation::Insert);
        assert_eq!(err.context, Some("users".to_string()));
        assert_eq!(
            err.to_string(),
            "Database constraint_violation error during insert: Unique constraint violated [context: users]"
        );
    }

    #[test]
    fn test_sqlx_error_mapping() {
        let cases = [
            (sqlx::Error::RowNotFound, Op::Query, DatabaseErrorKind::NotFound),
            (sqlx::Error::PoolTimedOut, Op::PoolAcquire, DatabaseErrorKind::PoolExhausted),
            (sqlx::Error::PoolClosed, Op::Connect, DatabaseErrorKind::ConnectionFailed),
            (
                sqlx::Error::ColumnNotFound("nick".into()),
                Op::Query,
                DatabaseErrorKind::QueryFailed,
            ),
        ];
        for (source, operation, kind) in cases {
            let err = DatabaseError::from(source);
            assert_eq!((err.operation, err.kind), (operation, kind));
        }

        let err = Error::from(sqlx::Error::PoolTimedOut);
        assert!(err.as_database().is_some_and(DatabaseError::is_retriable));
    }

    #[test]
    fn test_is_retriable() {
        assert!(DatabaseError::from(sqlx::Error::PoolClosed).is_retriable());
        assert!(!DatabaseError::not_found(Op::Query, "none").is_retriable());
        assert!(!DatabaseError::new(Op::Insert, DatabaseErrorKind::QueryBuild, "empty row")
            .is_retriable());
    }

    #[test]
    fn test_with_operation_keeps_connection_failures() {
        let err = DatabaseError::new(Op::Query, DatabaseErrorKind::QueryFailed, "syntax error")
            .with_operation(Op::Update);
        assert_eq!(err.operation, Op::Update);

        let err = DatabaseError::from(sqlx::Error::PoolTimedOut).with_operation(Op::Update);
        assert_eq!(err.operation, Op::PoolAcquire);
    }

    #[test]
    fn test_sanitize_url() {
        assert_eq!(
            sanitize_url("mysql://root:secret@db:3306/app"),
            "mysql://<redacted>@db:3306/app"
        );
        assert_eq!(sanitize_url("sqlite::memory:"), "sqlite::memory:");
    }

    async fn body(err: Error) -> (StatusCode, serde_json::Value) {
        let resp = err.into_response();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_database_error_response_hides_driver_message() {
        let (status, json) = body(Error::Database(DatabaseError::with_context(
            Op::Query,
            DatabaseErrorKind::QueryFailed,
            "no such column: secret_col",
            "users",
        )))
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["code"], "DATABASE_QUERY_FAILED");
        assert_eq!(json["error"], "database operation failed");
        assert_eq!(json["status"], 500);
    }

    #[tokio::test]
    async fn test_into_response_status() {
        let (status, json) = body(Error::Database(DatabaseError::not_found(
            Op::Query,
            "Row not found",
        )))
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["code"], "DATABASE_NOT_FOUND");

        let (status, json) = body(Error::ValidationError("mobile is required".into())).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["error"], "mobile is required");

        let (status, json) = body(Error::Internal("pool missing".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "internal server error");
    }
}
