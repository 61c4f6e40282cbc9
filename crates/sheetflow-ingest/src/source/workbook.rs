//! Local workbook source
//!
//! Streams the first worksheet of an XLSX/XLS/ODS file through calamine.
//! calamine materializes the worksheet range up front; rows are still handed
//! to the pipeline one at a time through the [`RowSource`] contract.

use std::path::Path;

use async_trait::async_trait;
use calamine::{open_workbook_auto, Data, Range, Reader};
use tracing::debug;

use super::{RawRow, RowSource, SourceError, SourceMetadata};

/// Reader over the first worksheet of a local workbook file
pub struct WorkbookSource {
    range: Option<Range<Data>>,
    next_row: usize,
    metadata: SourceMetadata,
}

impl WorkbookSource {
    /// Open a workbook and select its first worksheet.
    ///
    /// A workbook without any worksheet opens successfully and yields no
    /// rows.
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let mut workbook = open_workbook_auto(path)?;
        let first_sheet = workbook.sheet_names().first().cloned();
        let range = match first_sheet {
            Some(name) => Some(workbook.worksheet_range(&name)?),
            None => None,
        };

        let display_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        if let Some(ref range) = range {
            let (height, width) = range.get_size();
            debug!(file = %display_name, height, width, "opened workbook");
        }

        Ok(Self {
            range,
            next_row: 0,
            metadata: SourceMetadata {
                content_type: content_type_for(path).to_string(),
                display_name,
            },
        })
    }
}

#[async_trait]
impl RowSource for WorkbookSource {
    fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }

    async fn next_row(&mut self) -> Result<Option<RawRow>, SourceError> {
        let Some(ref range) = self.range else {
            return Ok(None);
        };

        let (height, width) = range.get_size();
        if self.next_row >= height {
            return Ok(None);
        }

        let row = (0..width)
            .map(|col| {
                range
                    .get((self.next_row, col))
                    .map(cell_to_string)
                    .unwrap_or_default()
            })
            .collect();
        self.next_row += 1;

        Ok(Some(row))
    }
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("xlsx") | Some("xlsm") => {
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        },
        Some("xls") => "application/vnd.ms-excel",
        Some("ods") => "application/vnd.oasis.opendocument.spreadsheet",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_by_extension() {
        assert_eq!(
            content_type_for(Path::new("report.XLSX")),
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        );
        assert_eq!(content_type_for(Path::new("old.xls")), "application/vnd.ms-excel");
        assert_eq!(content_type_for(Path::new("data.bin")), "application/octet-stream");
    }

    #[test]
    fn test_cell_stringification() {
        assert_eq!(cell_to_string(&Data::Empty), "");
        assert_eq!(cell_to_string(&Data::String("x".into())), "x");
        assert_eq!(cell_to_string(&Data::Bool(true)), "true");
        assert_eq!(cell_to_string(&Data::Int(7)), "7");
    }
}
