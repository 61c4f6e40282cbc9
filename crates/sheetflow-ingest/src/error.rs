//! Ingest error types
//!
//! Every I/O operation in the pipeline either succeeds or aborts the whole
//! run; there is no retry logic anywhere. `NoHeaderFound` and
//! `NoValidColumns` are deliberately not errors — they are documented no-op
//! outcomes returning an empty result.

use thiserror::Error;

use crate::sink::SinkError;
use crate::source::SourceError;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// Top-level pipeline error
#[derive(Error, Debug)]
pub enum IngestError {
    /// The row source could not be opened or paged
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The datastore sink could not be acquired or a batch flush failed
    #[error(transparent)]
    Sink(#[from] SinkError),

    /// The JSONL output file could not be created or written
    #[error("failed to write output file: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be serialized to JSON
    #[error("failed to serialize record: {0}")]
    Serialization(#[from] serde_json::Error),
}
