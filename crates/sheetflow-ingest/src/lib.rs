//! Sheetflow Ingest Library
//!
//! Streaming ingestion of messy tabular exports (remote spreadsheets or local
//! workbooks) into clean keyed records, written to a JSONL file and/or a
//! Postgres datastore.
//!
//! The core is a single forward pass over a lazy row sequence: locate the
//! header row with a non-empty-cell threshold, derive a deduplicated column
//! layout once, drop blank and repeated-header rows, and emit one record per
//! surviving row while batching datastore writes. Memory stays bounded by the
//! column layout plus one in-flight batch, regardless of input size.
//!
//! # Example
//!
//! ```no_run
//! use sheetflow_ingest::source::WorkbookSource;
//! use sheetflow_ingest::{Pipeline, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let source = WorkbookSource::open("export.xlsx".as_ref())?;
//!     let pipeline = Pipeline::new(PipelineConfig::default());
//!     let result = pipeline.run_to_file(source, "export.jsonl".as_ref()).await?;
//!     println!("wrote {} rows", result.total_rows);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod layout;
pub mod pipeline;
pub mod sink;
pub mod source;

pub use config::PipelineConfig;
pub use error::IngestError;
pub use layout::{ColumnLayout, Record};
pub use pipeline::{Pipeline, PipelineResult};
