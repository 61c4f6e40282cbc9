//! Row sources
//!
//! A row source produces a lazy, finite, forward-only sequence of raw rows.
//! Two adapters exist: a paged remote spreadsheet reader and a local workbook
//! reader. The pipeline only sees the [`RowSource`] contract, so tests can
//! substitute in-memory sources.

use async_trait::async_trait;
use thiserror::Error;

pub use crate::layout::RawRow;

mod sheets;
mod workbook;

pub use sheets::SheetsSource;
pub use workbook::WorkbookSource;

/// Row source faults; all are fatal for the run that hit them
#[derive(Error, Debug)]
pub enum SourceError {
    /// Transport or authentication failure talking to a remote source
    #[error("row source request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote source answered with something we cannot interpret
    #[error("row source returned unexpected payload: {0}")]
    Payload(String),

    /// The workbook file cannot be opened or read
    #[error("failed to read workbook: {0}")]
    Workbook(#[from] calamine::Error),
}

/// Descriptive metadata for an opened source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceMetadata {
    /// MIME type of the underlying document
    pub content_type: String,
    /// Human-readable name (sheet title or file name)
    pub display_name: String,
}

/// A lazy, forward-only, non-restartable sequence of raw rows
#[async_trait]
pub trait RowSource: Send {
    /// Metadata captured when the source was opened
    fn metadata(&self) -> &SourceMetadata;

    /// Pull the next row, or `None` once the source is exhausted.
    ///
    /// Paging failures surface here and abort the run; there is no retry.
    async fn next_row(&mut self) -> Result<Option<RawRow>, SourceError>;
}
