pub mod batch;
pub mod row;
pub mod schema;
pub mod sink;

pub use batch::BatchSink;
pub use row::{RowError, SqlValue};
pub use schema::{ColumnSpec, ColumnType, TableSpec};
pub use sink::SinkSet;

use kingfisher_core::Result;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

/// Shared PostgreSQL connection pool.
///
/// NIST Controls:
/// - SI-10: Information Input Validation (parameterized queries prevent SQL injection)
/// - SC-5: Denial of Service Protection (bounded pool, bounded acquire wait)
///
/// Sessions are opened lazily on first use, so the service comes up while
/// the database is down and inserts resume once it returns. Failed batches
/// are dropped, matching the best-effort semantics of syslog over UDP.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn connect_lazy(
        url: &str,
        min_connections: u32,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .min_connections(min_connections)
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect_lazy(url)?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Close every pooled session. Flushes issued afterwards fail fast and
    /// drop their batch.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
