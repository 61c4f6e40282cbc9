//! Header discovery and column layout
//!
//! The column layout is computed exactly once per stream, from the first row
//! that qualifies as a header, and drives every later row's filtering and
//! projection.

use std::collections::HashMap;

/// One raw row from a source: ordered string cells, possibly shorter than the
/// header width.
pub type RawRow = Vec<String>;

/// One clean output record: column name -> cell value, in column order.
///
/// `serde_json`'s `preserve_order` feature keeps insertion order, so JSONL
/// serialization and JSONB payloads follow the deduplicated header order.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Minimum count of non-empty cells (after trim) a row must exceed to be
/// picked as the header.
const HEADER_CELL_THRESHOLD: usize = 5;

/// Returns true when `row` qualifies as the header row: strictly more than
/// [`HEADER_CELL_THRESHOLD`] cells are non-empty after trimming.
pub fn is_header_candidate(row: &[String]) -> bool {
    row.iter().filter(|cell| !cell.trim().is_empty()).count() > HEADER_CELL_THRESHOLD
}

/// Returns true when every cell of `row` trims to empty.
pub fn is_blank_row(row: &[String]) -> bool {
    row.iter().all(|cell| cell.trim().is_empty())
}

/// Column identity for one stream, derived from the located header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
    /// Positions of non-blank header cells, in ascending original order
    pub column_indices: Vec<usize>,
    /// Deduplicated column names, paired index-by-index with `column_indices`
    pub final_names: Vec<String>,
    /// Position of the first retained column
    pub first_column_index: usize,
    /// Trimmed, pre-dedup name of the first retained column; used to spot
    /// header rows repeating mid-stream
    pub first_header_value: String,
}

impl ColumnLayout {
    /// Derive the layout from a header row.
    ///
    /// Returns `None` when the header has no non-blank cells; callers treat
    /// that as a total abort of the stream. Unreachable through
    /// [`is_header_candidate`], but kept so a layout is never built without
    /// at least one column.
    pub fn from_header(header: &[String]) -> Option<Self> {
        let column_indices: Vec<usize> = header
            .iter()
            .enumerate()
            .filter(|(_, cell)| !cell.trim().is_empty())
            .map(|(i, _)| i)
            .collect();

        let first_column_index = *column_indices.first()?;

        let raw_names: Vec<&str> = column_indices.iter().map(|&i| header[i].trim()).collect();
        let first_header_value = raw_names[0].to_string();

        // First occurrence keeps its name; the n-th repeat becomes "{name}_{n-1}".
        let mut seen: HashMap<&str, u32> = HashMap::new();
        let mut final_names = Vec::with_capacity(raw_names.len());
        for name in &raw_names {
            match seen.get_mut(name) {
                Some(count) => {
                    *count += 1;
                    final_names.push(format!("{}_{}", name, count));
                },
                None => {
                    seen.insert(name, 0);
                    final_names.push(name.to_string());
                },
            }
        }

        Some(Self {
            column_indices,
            final_names,
            first_column_index,
            first_header_value,
        })
    }

    /// Returns true when `row` looks like the header row re-appearing
    /// mid-stream (e.g. from a concatenated export).
    ///
    /// Deliberately compares only the first retained column's raw value; a
    /// full-row comparison would misclassify legitimate data rows.
    pub fn is_repeated_header(&self, row: &[String]) -> bool {
        row.get(self.first_column_index)
            .is_some_and(|cell| cell == &self.first_header_value)
    }

    /// Project a raw row into a record keyed by the deduplicated names.
    ///
    /// Rows shorter than the header are tolerated: missing positions read as
    /// empty string.
    pub fn build_record(&self, row: &[String]) -> Record {
        let mut record = Record::new();
        for (&idx, name) in self.column_indices.iter().zip(&self.final_names) {
            let value = row.get(idx).cloned().unwrap_or_default();
            record.insert(name.clone(), serde_json::Value::String(value));
        }
        record
    }
}
