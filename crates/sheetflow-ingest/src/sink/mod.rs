//! Datastore sinks
//!
//! The pipeline delivers accepted records to a sink in bounded batches. The
//! [`DatastoreSink`] trait keeps the pipeline independent of the storage
//! technology; the shipped implementation writes JSONB rows to Postgres.

use async_trait::async_trait;
use thiserror::Error;

use crate::layout::Record;

mod postgres;

pub use postgres::PostgresSink;

/// Datastore faults
#[derive(Error, Debug)]
pub enum SinkError {
    /// The sink cannot be acquired or configured; raised before any row is
    /// read when the datastore path is requested
    #[error("datastore sink unavailable: {0}")]
    Unavailable(String),

    /// A batch flush failed; fatal for the run, the in-flight batch is lost
    /// and earlier flushes stay written
    #[error("datastore batch insert failed: {0}")]
    Insert(#[from] sqlx::Error),
}

/// Bulk-insert destination for pipeline records
#[async_trait]
pub trait DatastoreSink: Send + Sync {
    /// Create the destination table if it does not exist. Idempotent.
    async fn ensure_schema(&self) -> Result<(), SinkError>;

    /// Insert one batch of records tagged with `dataset_id`, returning the
    /// count actually inserted. A batch either fully succeeds or fails as a
    /// whole; there is no partial-success reporting.
    async fn insert_batch(&self, dataset_id: &str, records: &[Record]) -> Result<u64, SinkError>;
}
