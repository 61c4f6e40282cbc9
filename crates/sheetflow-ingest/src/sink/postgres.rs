//! Postgres datastore sink
//!
//! Stores each record as a JSONB payload tagged with its dataset identifier.
//! Batches are inserted inside a single transaction, so a batch lands fully
//! or not at all, matching the no-partial-success contract.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::debug;

use super::{DatastoreSink, SinkError};
use crate::layout::Record;

/// Default destination table
pub const DEFAULT_TABLE: &str = "document_rows";

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// JSONB row store backed by a Postgres connection pool
pub struct PostgresSink {
    pool: PgPool,
    table: String,
}

impl PostgresSink {
    /// Wrap an existing pool, writing to the default table
    pub fn new(pool: PgPool) -> Result<Self, SinkError> {
        Self::with_table(pool, DEFAULT_TABLE)
    }

    /// Wrap an existing pool, writing to a caller-chosen table.
    ///
    /// The table name is interpolated into SQL and therefore restricted to
    /// alphanumerics and underscores.
    pub fn with_table(pool: PgPool, table: impl Into<String>) -> Result<Self, SinkError> {
        let table = table.into();
        if table.is_empty()
            || !table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(SinkError::Unavailable(format!(
                "table name must be alphanumeric with underscores only: {:?}",
                table
            )));
        }
        Ok(Self { pool, table })
    }

    /// Connect a fresh pool from a database URL
    pub async fn connect(url: &str) -> Result<Self, SinkError> {
        let pool = PgPoolOptions::new()
            .max_connections(DEFAULT_MAX_CONNECTIONS)
            .connect(url)
            .await
            .map_err(|e| SinkError::Unavailable(e.to_string()))?;
        Self::new(pool)
    }
}

#[async_trait]
impl DatastoreSink for PostgresSink {
    async fn ensure_schema(&self) -> Result<(), SinkError> {
        let statement = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id SERIAL PRIMARY KEY,
                dataset_id TEXT,
                row_data JSONB
            )",
            self.table
        );
        sqlx::query(&statement)
            .execute(&self.pool)
            .await
            .map_err(|e| SinkError::Unavailable(e.to_string()))?;
        Ok(())
    }

    async fn insert_batch(&self, dataset_id: &str, records: &[Record]) -> Result<u64, SinkError> {
        if records.is_empty() {
            return Ok(0);
        }

        let statement = format!(
            "INSERT INTO {} (dataset_id, row_data) VALUES ($1, $2)",
            self.table
        );

        let mut tx = self.pool.begin().await?;
        for record in records {
            sqlx::query(&statement)
                .bind(dataset_id)
                .bind(serde_json::Value::Object(record.clone()))
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        debug!(dataset_id = %dataset_id, batch_size = records.len(), "flushed batch");
        Ok(records.len() as u64)
    }
}
