//! Sheetflow - streaming spreadsheet ingestion tool

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser};
use sheetflow_common::logging::{init_logging, LogConfig, LogLevel};
use sheetflow_ingest::sink::{DatastoreSink, PostgresSink, SinkError};
use sheetflow_ingest::source::{RowSource, SheetsSource, WorkbookSource};
use sheetflow_ingest::{Pipeline, PipelineConfig};
use tracing::info;

const DEFAULT_API_BASE: &str = "https://sheets.googleapis.com";

#[derive(Parser, Debug)]
#[command(name = "sheetflow")]
#[command(author, version, about = "Streaming spreadsheet-to-records ingestion tool")]
struct Cli {
    /// Row source to ingest
    #[command(subcommand)]
    source: Source,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Parser, Debug)]
enum Source {
    /// Ingest a remote spreadsheet through its paged values API
    Sheet {
        /// Spreadsheet identifier
        #[arg(long)]
        spreadsheet_id: String,

        /// OAuth access token for the spreadsheet API
        #[arg(long, env = "SHEETS_ACCESS_TOKEN", hide_env_values = true)]
        access_token: String,

        /// Base URL of the spreadsheet API
        #[arg(long, default_value = DEFAULT_API_BASE)]
        api_base: String,

        #[command(flatten)]
        dest: Destination,
    },

    /// Ingest the first worksheet of a local workbook file
    Workbook {
        /// Path to the workbook (XLSX/XLS/ODS)
        path: PathBuf,

        #[command(flatten)]
        dest: Destination,
    },
}

#[derive(Args, Debug)]
struct Destination {
    /// Write records to a JSONL file instead of the datastore
    #[arg(long)]
    to_file: bool,

    /// JSONL output path (implies --to-file; default: <source>_<timestamp>.jsonl)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Dataset identifier for datastore writes (default: the source id)
    #[arg(short, long)]
    dataset_id: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };
    let log_config = LogConfig::from_env()
        .unwrap_or_default()
        .with_level(log_level)
        .with_file_prefix("sheetflow");
    init_logging(&log_config)?;

    let config = PipelineConfig::from_env();

    match cli.source {
        Source::Sheet {
            spreadsheet_id,
            access_token,
            api_base,
            dest,
        } => {
            info!(spreadsheet_id = %spreadsheet_id, "opening remote spreadsheet");
            let source = SheetsSource::open(
                api_base,
                spreadsheet_id.clone(),
                access_token,
                config.paging_batch_size,
            )
            .await?;
            run_with_source(source, &spreadsheet_id, &dest, config).await?;
        },
        Source::Workbook { path, dest } => {
            info!(path = %path.display(), "opening workbook");
            let source = WorkbookSource::open(&path)?;
            let source_id = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| "workbook".to_string());
            run_with_source(source, &source_id, &dest, config).await?;
        },
    }

    Ok(())
}

async fn run_with_source<S: RowSource>(
    source: S,
    source_id: &str,
    dest: &Destination,
    config: PipelineConfig,
) -> Result<()> {
    let metadata = source.metadata().clone();
    info!(
        name = %metadata.display_name,
        content_type = %metadata.content_type,
        "starting ingestion"
    );

    let pipeline = Pipeline::new(config);

    if dest.to_file || dest.output.is_some() {
        let path = dest
            .output
            .clone()
            .unwrap_or_else(|| default_output_path(source_id));
        let result = pipeline.run_to_file(source, &path).await?;
        info!(
            output = %path.display(),
            total_rows = result.total_rows,
            "ingestion finished"
        );
    } else {
        let url = std::env::var("DATABASE_URL")
            .map_err(|_| SinkError::Unavailable("DATABASE_URL not set".to_string()))?;
        let sink = PostgresSink::connect(&url).await?;
        sink.ensure_schema().await?;

        let dataset_id = dest
            .dataset_id
            .clone()
            .unwrap_or_else(|| source_id.to_string());
        let result = pipeline.run_to_sink(source, &sink, &dataset_id).await?;
        info!(
            dataset_id = %dataset_id,
            total_rows = result.total_rows,
            rows_inserted = result.rows_inserted,
            "ingestion finished"
        );
    }

    Ok(())
}

fn default_output_path(source_id: &str) -> PathBuf {
    let timestamp = chrono::Utc::now().format("%Y%m%d%H%M%S");
    PathBuf::from(format!("{}_{}.jsonl", source_id, timestamp))
}
