//! Pipeline integration tests
//!
//! Exercise the full streaming pass (header discovery, filtering, record
//! projection, batched sink writes) against in-memory sources and sinks.

use std::io::Read;
use std::sync::Mutex;

use async_trait::async_trait;
use sheetflow_ingest::error::IngestError;
use sheetflow_ingest::layout::Record;
use sheetflow_ingest::sink::{DatastoreSink, SinkError};
use sheetflow_ingest::source::{RawRow, RowSource, SourceError, SourceMetadata};
use sheetflow_ingest::{Pipeline, PipelineConfig};

/// In-memory row source backed by a fixed list of rows
struct StaticSource {
    metadata: SourceMetadata,
    rows: std::vec::IntoIter<RawRow>,
}

impl StaticSource {
    fn new(rows: &[&[&str]]) -> Self {
        let rows: Vec<RawRow> = rows
            .iter()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect();
        Self {
            metadata: SourceMetadata {
                content_type: "test/rows".to_string(),
                display_name: "static".to_string(),
            },
            rows: rows.into_iter(),
        }
    }
}

#[async_trait]
impl RowSource for StaticSource {
    fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }

    async fn next_row(&mut self) -> Result<Option<RawRow>, SourceError> {
        Ok(self.rows.next())
    }
}

/// Sink capturing every batch it receives
#[derive(Default)]
struct MemorySink {
    batches: Mutex<Vec<(String, Vec<Record>)>>,
}

impl MemorySink {
    fn batch_sizes(&self) -> Vec<usize> {
        self.batches
            .lock()
            .unwrap()
            .iter()
            .map(|(_, records)| records.len())
            .collect()
    }
}

#[async_trait]
impl DatastoreSink for MemorySink {
    async fn ensure_schema(&self) -> Result<(), SinkError> {
        Ok(())
    }

    async fn insert_batch(&self, dataset_id: &str, records: &[Record]) -> Result<u64, SinkError> {
        self.batches
            .lock()
            .unwrap()
            .push((dataset_id.to_string(), records.to_vec()));
        Ok(records.len() as u64)
    }
}

/// Sink whose every flush fails
struct FailingSink;

#[async_trait]
impl DatastoreSink for FailingSink {
    async fn ensure_schema(&self) -> Result<(), SinkError> {
        Ok(())
    }

    async fn insert_batch(&self, _dataset_id: &str, _records: &[Record]) -> Result<u64, SinkError> {
        Err(SinkError::Unavailable("sink offline".to_string()))
    }
}

fn config(datastore_batch_size: usize) -> PipelineConfig {
    PipelineConfig {
        paging_batch_size: 5000,
        datastore_batch_size,
    }
}

#[tokio::test]
async fn test_end_to_end_example_stream() {
    // Banner row, header, data row, duplicate data row, blank row.
    let source = StaticSource::new(&[
        &["x"],
        &["c1", "c2", "c3", "c4", "c5", "c6"],
        &["v1", "v2", "v3", "v4", "v5", "v6"],
        &["v1", "v2", "v3", "v4", "v5", "v6"],
        &["", "", "", "", "", ""],
    ]);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.jsonl");

    let pipeline = Pipeline::new(config(500));
    let result = pipeline.run_to_file(source, &path).await.unwrap();

    // The duplicate data row is legitimate data, not a repeated header.
    assert_eq!(result.total_rows, 2);
    assert_eq!(result.rows_inserted, 0);

    let mut contents = String::new();
    std::fs::File::open(&path)
        .unwrap()
        .read_to_string(&mut contents)
        .unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 2);
    let expected = r#"{"c1":"v1","c2":"v2","c3":"v3","c4":"v4","c5":"v5","c6":"v6"}"#;
    assert_eq!(lines[0], expected);
    assert_eq!(lines[1], expected);
}

#[tokio::test]
async fn test_no_header_leaves_no_file_and_no_writes() {
    // Every row has at most 5 non-empty cells, so no header is ever found.
    let rows: &[&[&str]] = &[
        &["a", "b", "c", "d", "e"],
        &["1", "2", "3", "4", "5", ""],
        &[],
    ];

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.jsonl");

    let pipeline = Pipeline::new(config(500));
    let result = pipeline
        .run_to_file(StaticSource::new(rows), &path)
        .await
        .unwrap();
    assert_eq!(result.total_rows, 0);
    assert_eq!(result.rows_inserted, 0);
    assert!(!path.exists());

    let sink = MemorySink::default();
    let result = pipeline
        .run_to_sink(StaticSource::new(rows), &sink, "ds-1")
        .await
        .unwrap();
    assert_eq!(result.total_rows, 0);
    assert_eq!(result.rows_inserted, 0);
    assert!(sink.batch_sizes().is_empty());
}

#[tokio::test]
async fn test_five_cell_row_is_skipped_six_cell_row_is_header() {
    let source = StaticSource::new(&[
        &["a", "b", "c", "d", "e"],
        &["h1", "h2", "h3", "h4", "h5", "h6"],
        &["1", "2", "3", "4", "5", "6"],
    ]);

    let sink = MemorySink::default();
    let pipeline = Pipeline::new(config(500));
    let result = pipeline.run_to_sink(source, &sink, "ds-1").await.unwrap();

    assert_eq!(result.total_rows, 1);
    assert_eq!(result.rows_inserted, 1);

    let batches = sink.batches.lock().unwrap();
    let record = &batches[0].1[0];
    let keys: Vec<&str> = record.keys().map(|k| k.as_str()).collect();
    assert_eq!(keys, vec!["h1", "h2", "h3", "h4", "h5", "h6"]);
}

#[tokio::test]
async fn test_blank_and_repeated_header_rows_are_dropped() {
    let source = StaticSource::new(&[
        &["id", "b", "c", "d", "e", "f"],
        &["1", "x", "x", "x", "x", "x"],
        // Blank row (whitespace only).
        &[" ", "", "\t", "", "", ""],
        // Header re-appearing mid-stream: first retained column matches "id".
        &["id", "b", "c", "d", "e", "f"],
        &["2", "y", "y", "y", "y", "y"],
    ]);

    let sink = MemorySink::default();
    let pipeline = Pipeline::new(config(500));
    let result = pipeline.run_to_sink(source, &sink, "ds-1").await.unwrap();

    assert_eq!(result.total_rows, 2);
    let batches = sink.batches.lock().unwrap();
    assert_eq!(batches.len(), 1);
    let ids: Vec<&serde_json::Value> = batches[0]
        .1
        .iter()
        .map(|record| record.get("id").unwrap())
        .collect();
    assert_eq!(ids, vec!["1", "2"]);
}

#[tokio::test]
async fn test_ragged_rows_are_padded_not_rejected() {
    let source = StaticSource::new(&[
        &["a", "b", "c", "d", "e", "f"],
        &["1", "2"],
        &["1", "2", "3", "4", "5", "6", "extra"],
    ]);

    let sink = MemorySink::default();
    let pipeline = Pipeline::new(config(500));
    let result = pipeline.run_to_sink(source, &sink, "ds-1").await.unwrap();

    assert_eq!(result.total_rows, 2);
    let batches = sink.batches.lock().unwrap();
    let short = &batches[0].1[0];
    assert_eq!(short.get("b"), Some(&serde_json::json!("2")));
    assert_eq!(short.get("c"), Some(&serde_json::json!("")));
    assert_eq!(short.get("f"), Some(&serde_json::json!("")));
    // Cells beyond the header width are dropped.
    let long = &batches[0].1[1];
    assert_eq!(long.len(), 6);
}

#[tokio::test]
async fn test_batches_flush_at_threshold() {
    let source = StaticSource::new(&[
        &["a", "b", "c", "d", "e", "f"],
        &["1", "x", "x", "x", "x", "x"],
        &["2", "x", "x", "x", "x", "x"],
        &["3", "x", "x", "x", "x", "x"],
        &["4", "x", "x", "x", "x", "x"],
        &["5", "x", "x", "x", "x", "x"],
    ]);

    let sink = MemorySink::default();
    let pipeline = Pipeline::new(config(2));
    let result = pipeline.run_to_sink(source, &sink, "ds-42").await.unwrap();

    assert_eq!(result.total_rows, 5);
    assert_eq!(result.rows_inserted, 5);
    assert_eq!(sink.batch_sizes(), vec![2, 2, 1]);

    let batches = sink.batches.lock().unwrap();
    assert!(batches.iter().all(|(dataset_id, _)| dataset_id == "ds-42"));
}

#[tokio::test]
async fn test_failed_flush_aborts_the_run() {
    let source = StaticSource::new(&[
        &["a", "b", "c", "d", "e", "f"],
        &["1", "x", "x", "x", "x", "x"],
        &["2", "x", "x", "x", "x", "x"],
    ]);

    let pipeline = Pipeline::new(config(1));
    let err = pipeline
        .run_to_sink(source, &FailingSink, "ds-1")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        IngestError::Sink(SinkError::Unavailable(_))
    ));
}

#[tokio::test]
async fn test_jsonl_keeps_column_order_and_raw_unicode() {
    let source = StaticSource::new(&[
        &["zeta", "alpha", "zeta", "d", "e", "f"],
        &["café", "2", "3", "4", "5", "6"],
    ]);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.jsonl");

    let pipeline = Pipeline::new(config(500));
    let result = pipeline.run_to_file(source, &path).await.unwrap();
    assert_eq!(result.total_rows, 1);

    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(
        contents.lines().next().unwrap(),
        r#"{"zeta":"café","alpha":"2","zeta_1":"3","d":"4","e":"5","f":"6"}"#
    );
}
