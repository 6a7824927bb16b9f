//! Database connection pool management

use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;
use std::time::Duration;

use crate::config::DatabaseConfig;
use crate::error::{sanitize_url, DatabaseError, DatabaseOperation, Error, Result};

/// Create a connection pool with retry logic
///
/// Installs the compiled-in `Any` drivers, then retries failed connection
/// attempts with exponential backoff up to `max_retries` times.
pub async fn create_pool(config: &DatabaseConfig) -> Result<AnyPool> {
    sqlx::any::install_default_drivers();
    create_pool_with_retries(config, config.max_retries).await
}

async fn create_pool_with_retries(config: &DatabaseConfig, max_retries: u32) -> Result<AnyPool> {
    let mut attempt = 0;
    let base_delay = Duration::from_secs(config.retry_delay_secs);

    loop {
        match try_create_pool(config).await {
            Ok(pool) => {
                if attempt > 0 {
                    tracing::info!(
                        "Database connection established after {} attempt(s)",
                        attempt + 1
                    );
                } else {
                    tracing::info!(
                        dialect = %config.dialect(),
                        "Database connection pool created: max={}, min={}",
                        config.max_connections,
                        config.min_connections
                    );
                }
                return Ok(pool);
            }
            Err(e) => {
                attempt += 1;

                let retriable = e.as_database().is_some_and(DatabaseError::is_retriable);
                if !retriable || attempt > max_retries {
                    tracing::error!(
                        "Failed to connect to database after {} attempt(s): {}",
                        attempt,
                        e
                    );
                    return Err(e);
                }

                let delay = base_delay * 2_u32.saturating_pow(attempt - 1);

                tracing::warn!(
                    "Database connection attempt {} failed: {}. Retrying in {:?}...",
                    attempt,
                    e,
                    delay
                );

                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Single connection attempt
async fn try_create_pool(config: &DatabaseConfig) -> Result<AnyPool> {
    let url = config.connection_url();
    AnyPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.connection_timeout())
        .connect(&url)
        .await
        .map_err(|e| {
            let category = categorize_db_error(&e);
            let err = DatabaseError::from(e)
                .with_operation(DatabaseOperation::Connect)
                .add_context(sanitize_url(&url));
            Error::Database(DatabaseError {
                message: format!("{}: {}", category, err.message),
                ..err
            })
        })
}

/// Short hint for connection failures
fn categorize_db_error(err: &sqlx::Error) -> &'static str {
    use sqlx::Error;
    match err {
        Error::Configuration(_) => "Configuration error",
        Error::Database(_) => "Database rejected the connection",
        Error::Io(_) => "Network I/O error - check connectivity",
        Error::Tls(_) => "TLS/SSL error - check certificate configuration",
        Error::PoolTimedOut => "Connection pool timeout - database may be overloaded",
        Error::PoolClosed => "Connection pool closed",
        Error::WorkerCrashed => "Database worker crashed",
        _ => "Connection error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crud::Dialect;
    use crate::error::DatabaseErrorKind;

    #[tokio::test]
    async fn test_create_sqlite_pool() {
        let config = DatabaseConfig {
            dialect: Some(Dialect::Sqlite),
            max_connections: 1,
            min_connections: 0,
            max_retries: 0,
            ..DatabaseConfig::default()
        };
        let pool = create_pool(&config).await.unwrap();
        let one: i64 = sqlx::query_scalar("SELECT 1").fetch_one(&pool).await.unwrap();
        assert_eq!(one, 1);
    }

    #[tokio::test]
    async fn test_unknown_scheme_fails_without_retry() {
        let config = DatabaseConfig {
            url: "nosuchdb://localhost/x".to_string(),
            max_retries: 0,
            ..DatabaseConfig::default()
        };
        let err = create_pool(&config).await.unwrap_err();
        let db = err.as_database().unwrap();
        assert_eq!(db.kind, DatabaseErrorKind::Configuration);
        assert_eq!(db.context.as_deref(), Some("nosuchdb://localhost/x"));
    }

    #[tokio::test]
    async fn test_configuration_errors_are_not_retried() {
        let config = DatabaseConfig {
            url: "nosuchdb://localhost/x".to_string(),
            max_retries: 5,
            retry_delay_secs: 60,
            ..DatabaseConfig::default()
        };
        let err = tokio::time::timeout(Duration::from_secs(5), create_pool(&config))
            .await
            .expect("gave up without sleeping")
            .unwrap_err();
        assert_eq!(
            err.as_database().map(|e| e.operation),
            Some(DatabaseOperation::Connect)
        );
    }
}
