//! Remote paged spreadsheet source
//!
//! Reads the first sheet of a remote spreadsheet through a Sheets-style
//! values API: one metadata call for the grid dimensions, then value ranges
//! of `page_size` rows at a time. Only the current page is held in memory.

use std::collections::VecDeque;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{RawRow, RowSource, SourceError, SourceMetadata};

/// MIME type reported for native remote spreadsheets
pub const SPREADSHEET_MIME_TYPE: &str = "application/vnd.google-apps.spreadsheet";

const METADATA_FIELDS: &str = "sheets(properties(title,gridProperties(rowCount,columnCount)))";

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Debug, Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    title: String,
    #[serde(default)]
    grid_properties: GridProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GridProperties {
    #[serde(default)]
    row_count: usize,
    #[serde(default)]
    column_count: usize,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

/// Paged reader over the first sheet of a remote spreadsheet
#[derive(Debug)]
pub struct SheetsSource {
    client: reqwest::Client,
    base_url: String,
    spreadsheet_id: String,
    access_token: String,
    page_size: usize,
    title: String,
    row_count: usize,
    col_count: usize,
    /// 1-based index of the next unfetched row
    next_start: usize,
    buffer: VecDeque<RawRow>,
    metadata: SourceMetadata,
}

impl SheetsSource {
    /// Open a spreadsheet and capture its grid dimensions.
    ///
    /// A spreadsheet with no sheets or a zero-sized grid opens successfully
    /// and yields no rows.
    pub async fn open(
        base_url: impl Into<String>,
        spreadsheet_id: impl Into<String>,
        access_token: impl Into<String>,
        page_size: usize,
    ) -> Result<Self, SourceError> {
        let client = reqwest::Client::new();
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let spreadsheet_id = spreadsheet_id.into();
        let access_token = access_token.into();

        let url = format!("{}/v4/spreadsheets/{}", base_url, spreadsheet_id);
        let meta: SpreadsheetMeta = client
            .get(&url)
            .bearer_auth(&access_token)
            .query(&[("fields", METADATA_FIELDS)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .map_err(|e| SourceError::Payload(format!("spreadsheet metadata: {}", e)))?;

        // First sheet only; a missing or empty grid means an empty source.
        let (title, row_count, col_count) = match meta.sheets.into_iter().next() {
            Some(sheet) => {
                let props = sheet.properties;
                (props.title, props.grid_properties.row_count, props.grid_properties.column_count)
            },
            None => (String::new(), 0, 0),
        };

        debug!(
            spreadsheet_id = %spreadsheet_id,
            title = %title,
            row_count,
            col_count,
            "opened remote spreadsheet"
        );

        let display_name = if title.is_empty() {
            spreadsheet_id.clone()
        } else {
            title.clone()
        };

        Ok(Self {
            client,
            base_url,
            spreadsheet_id,
            access_token,
            page_size: page_size.max(1),
            title,
            row_count,
            col_count,
            next_start: 1,
            buffer: VecDeque::new(),
            metadata: SourceMetadata {
                content_type: SPREADSHEET_MIME_TYPE.to_string(),
                display_name,
            },
        })
    }

    fn exhausted(&self) -> bool {
        self.row_count == 0 || self.col_count == 0 || self.next_start > self.row_count
    }

    /// Fetch the next value range and refill the buffer.
    ///
    /// Advances the cursor even when the server reports no values for the
    /// range, so the stream always terminates.
    async fn fetch_page(&mut self) -> Result<(), SourceError> {
        let start_row = self.next_start;
        let end_row = self.row_count.min(start_row + self.page_size - 1);
        self.next_start = end_row + 1;

        let range = format!(
            "'{}'!A{}:{}{}",
            self.title,
            start_row,
            column_letter(self.col_count),
            end_row
        );

        let url = format!(
            "{}/v4/spreadsheets/{}/values",
            self.base_url, self.spreadsheet_id
        );
        let page: ValueRange = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&[("range", range.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .map_err(|e| SourceError::Payload(format!("value range {}: {}", range, e)))?;

        for row in page.values {
            // Pad or truncate to the grid width; absent cells read as "".
            let normalized: RawRow = (0..self.col_count)
                .map(|i| row.get(i).map(cell_to_string).unwrap_or_default())
                .collect();
            self.buffer.push_back(normalized);
        }

        Ok(())
    }
}

#[async_trait]
impl RowSource for SheetsSource {
    fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }

    async fn next_row(&mut self) -> Result<Option<RawRow>, SourceError> {
        loop {
            if let Some(row) = self.buffer.pop_front() {
                return Ok(Some(row));
            }
            if self.exhausted() {
                return Ok(None);
            }
            self.fetch_page().await?;
        }
    }
}

/// Stringify one remote cell value the way the values API delivers it:
/// strings pass through, null becomes empty, numbers and booleans take their
/// JSON textual form.
fn cell_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Convert a 1-based column index to its A1-notation letter (1 -> A, 27 -> AA).
fn column_letter(mut index: usize) -> String {
    let mut letters = String::new();
    while index > 0 {
        let rem = (index - 1) % 26;
        letters.insert(0, (b'A' + rem as u8) as char);
        index = (index - 1) / 26;
    }
    letters
}
