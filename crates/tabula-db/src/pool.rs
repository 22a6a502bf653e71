//! Database connection pool management.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::error::DbError;

/// Maximum number of pooled connections.
const MAX_CONNECTIONS: u32 = 10;

/// How long to wait for a free connection before failing the query.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// A handle to the shared Postgres connection pool.
#[derive(Debug, Clone)]
pub struct DbPool {
    inner: PgPool,
}

impl DbPool {
    /// Connect to the database and build the pool.
    ///
    /// # Errors
    ///
    /// Returns `DbError::ConnectionFailed` when the database is unreachable
    /// or the credentials are rejected.
    pub async fn connect(database_url: &str) -> Result<Self, DbError> {
        let inner = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect(database_url)
            .await
            .map_err(DbError::ConnectionFailed)?;
        Ok(Self { inner })
    }

    /// Wrap an existing pool (used by tests that provision their own).
    #[must_use]
    pub fn from_pool(inner: PgPool) -> Self {
        Self { inner }
    }

    /// Access the underlying `sqlx` pool.
    #[must_use]
    pub fn inner(&self) -> &PgPool {
        &self.inner
    }
}
