//! Streaming ingestion pipeline
//!
//! Single forward pass over the row source: discard rows until the header is
//! located, derive the column layout once, then filter, project, and emit
//! every surviving row. JSONL output is appended record by record; datastore
//! writes are batched. Memory stays bounded by the layout plus one batch.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::{error, info};

use crate::config::PipelineConfig;
use crate::error::{IngestError, Result};
use crate::layout::{is_blank_row, is_header_candidate, ColumnLayout, Record};
use crate::sink::DatastoreSink;
use crate::source::RowSource;

/// Counters returned by a completed pipeline run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineResult {
    /// Records built, regardless of sink configuration
    pub total_rows: u64,
    /// Records the datastore sink reported as inserted
    pub rows_inserted: u64,
}

/// Streaming header-discovery and row-normalization pipeline
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Stream the source into a JSONL file: one JSON object per line, keys in
    /// deduplicated header order, non-ASCII characters unescaped.
    ///
    /// The file is created only once a header row is located; a stream with
    /// no header leaves no file behind and returns zero counts.
    pub async fn run_to_file<S: RowSource>(
        &self,
        source: S,
        path: &Path,
    ) -> Result<PipelineResult> {
        self.run(source, Some(path), None).await
    }

    /// Stream the source into a datastore sink, tagging every record with
    /// `dataset_id` and flushing in batches of the configured size.
    ///
    /// A failed flush aborts the run immediately; batches flushed earlier
    /// stay written.
    pub async fn run_to_sink<S: RowSource>(
        &self,
        source: S,
        sink: &dyn DatastoreSink,
        dataset_id: &str,
    ) -> Result<PipelineResult> {
        self.run(source, None, Some((sink, dataset_id))).await
    }

    async fn run<S: RowSource>(
        &self,
        mut source: S,
        output: Option<&Path>,
        sink: Option<(&dyn DatastoreSink, &str)>,
    ) -> Result<PipelineResult> {
        // Phase one: locate the header. Leading rows are discarded, not
        // counted; a stream without a header is a silent no-op.
        let layout = loop {
            let Some(row) = source.next_row().await? else {
                return Ok(PipelineResult::default());
            };
            if !is_header_candidate(&row) {
                continue;
            }
            match ColumnLayout::from_header(&row) {
                Some(layout) => break layout,
                // Header with zero usable columns: abort the whole stream
                // with empty counts. Unreachable through the threshold
                // check, preserved for robustness.
                None => return Ok(PipelineResult::default()),
            }
        };
        info!(columns = layout.final_names.len(), "header row located");

        // The output file exists only once a header was found.
        let mut writer = match output {
            Some(path) => Some(BufWriter::new(File::create(path)?)),
            None => None,
        };
        let mut batch: Vec<Record> = Vec::new();
        let mut total_rows: u64 = 0;
        let mut rows_inserted: u64 = 0;

        // Phase two: filter, project, and emit every remaining row.
        while let Some(row) = source.next_row().await? {
            if is_blank_row(&row) || layout.is_repeated_header(&row) {
                continue;
            }

            let record = layout.build_record(&row);

            if let Some(writer) = writer.as_mut() {
                serde_json::to_writer(&mut *writer, &record)?;
                writer.write_all(b"\n")?;
            }
            total_rows += 1;

            if let Some((sink, dataset_id)) = sink {
                batch.push(record);
                if batch.len() >= self.config.datastore_batch_size {
                    rows_inserted += self.flush(sink, dataset_id, &mut batch).await?;
                }
            }

            if self.config.paging_batch_size > 0
                && total_rows % self.config.paging_batch_size as u64 == 0
            {
                info!(total_rows, "pipeline progress");
            }
        }

        // Trailing partial batch, same failure semantics as a full one.
        if let Some((sink, dataset_id)) = sink {
            if !batch.is_empty() {
                rows_inserted += self.flush(sink, dataset_id, &mut batch).await?;
            }
        }

        if let Some(mut writer) = writer {
            writer.flush()?;
        }

        Ok(PipelineResult {
            total_rows,
            rows_inserted,
        })
    }

    async fn flush(
        &self,
        sink: &dyn DatastoreSink,
        dataset_id: &str,
        batch: &mut Vec<Record>,
    ) -> Result<u64> {
        let inserted = sink.insert_batch(dataset_id, batch).await.map_err(|e| {
            error!(dataset_id = %dataset_id, batch_size = batch.len(), error = %e, "batch insert failed");
            IngestError::from(e)
        })?;
        batch.clear();
        Ok(inserted)
    }
}
