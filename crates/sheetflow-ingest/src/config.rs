//! Pipeline configuration
//!
//! Batch sizes are passed to the pipeline explicitly rather than read from
//! the environment inside it; `from_env` exists as a convenience for the CLI.

/// Default number of rows fetched per page from a remote source, and the
/// interval (in accepted records) between progress log events.
pub const DEFAULT_PAGING_BATCH_SIZE: usize = 5000;

/// Default number of records accumulated before a datastore flush.
pub const DEFAULT_DATASTORE_BATCH_SIZE: usize = 500;

/// Tuning knobs for a pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Rows per remote page fetch; also the progress-report interval
    pub paging_batch_size: usize,
    /// Records per datastore bulk insert
    pub datastore_batch_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            paging_batch_size: DEFAULT_PAGING_BATCH_SIZE,
            datastore_batch_size: DEFAULT_DATASTORE_BATCH_SIZE,
        }
    }
}

impl PipelineConfig {
    /// Load batch sizes from the environment, falling back to defaults
    ///
    /// - `SHEETFLOW_PAGING_BATCH_SIZE`
    /// - `SHEETFLOW_DB_BATCH_SIZE`
    pub fn from_env() -> Self {
        Self {
            paging_batch_size: std::env::var("SHEETFLOW_PAGING_BATCH_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&n| n > 0)
                .unwrap_or(DEFAULT_PAGING_BATCH_SIZE),
            datastore_batch_size: std::env::var("SHEETFLOW_DB_BATCH_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&n| n > 0)
                .unwrap_or(DEFAULT_DATASTORE_BATCH_SIZE),
        }
    }
}
