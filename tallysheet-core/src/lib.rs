//! Tallysheet Core - installation reports over a shared spreadsheet
//!
//! This crate implements the pipeline following hexagonal architecture:
//!
//! - **domain**: Rows, datasets, field parsers, filters, metrics, records
//! - **ports**: The `SheetSource` trait the pipeline reads and writes through
//! - **services**: Reader, filter engine, aggregator, writer, export
//! - **adapters**: Concrete sources (Google Sheets, CSV file, in-memory, demo)

pub mod domain;
pub mod ports;
pub mod services;
pub mod adapters;
pub mod config;

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Local;
use tracing::{debug, info};

use adapters::csv_file::CsvFileSource;
use adapters::demo::{write_demo_csv, DEMO_FILE};
use adapters::google_sheets::{get_base_url, Credentials, GoogleSheetsClient, GoogleSheetsSource};
use config::{Config, SourceKind};
use ports::SheetSource;
use services::*;

// Re-export commonly used types at crate root
pub use domain::{
    Dataset, Field, FilterSpec, Metrics, Period, RawRow, RecordDraft, ViewState, WriteRecord,
};
pub use domain::result::{Error, OperationResult};
pub use ports::ValueInputMode;

/// Main context for tally operations
///
/// Holds the configuration, the sheet source and the services built on it.
pub struct TallyContext {
    pub config: Config,
    pub source: Arc<dyn SheetSource>,
    pub report_service: ReportService,
    pub record_service: RecordService,
}

impl TallyContext {
    /// Create a new context from the settings in `tally_dir`
    pub fn new(tally_dir: &Path) -> Result<Self> {
        let config = Config::load(tally_dir)?;
        let source = build_source(&config, tally_dir)?;
        Ok(Self::with_source(config, source))
    }

    /// Create a context over an already built source
    pub fn with_source(config: Config, source: Arc<dyn SheetSource>) -> Self {
        let aggregator = Aggregator::new().with_reschedule_column(config.reschedule_column.clone());
        let report_service = ReportService::new(Arc::clone(&source), aggregator);
        let writer = RowWriter::new(Arc::clone(&source)).with_mode(config.value_input_mode);
        let record_service = RecordService::new(writer, config.choices());

        Self {
            config,
            source,
            report_service,
            record_service,
        }
    }

    /// Tab to use when the caller names none
    pub fn default_tab(&self) -> Option<&str> {
        self.config.source.sheet_name.as_deref()
    }
}

/// Build the sheet source the config points at
///
/// Demo mode always wins and reads `demo.csv` in the tally directory,
/// generating it on first use.
pub fn build_source(config: &Config, tally_dir: &Path) -> Result<Arc<dyn SheetSource>> {
    if config.demo_mode {
        let path = tally_dir.join(DEMO_FILE);
        if !path.exists() {
            std::fs::create_dir_all(tally_dir)
                .with_context(|| format!("Failed to create {}", tally_dir.display()))?;
            write_demo_csv(&path, Local::now().date_naive())?;
        }
        debug!(path = %path.display(), "Using demo workbook");
        return Ok(Arc::new(CsvFileSource::new(path)));
    }

    match config.source.kind {
        SourceKind::Csv => {
            let Some(path) = &config.source.path else {
                bail!("CSV source has no path. Run 'tally setup --csv <FILE>'");
            };
            let path = if path.is_relative() {
                tally_dir.join(path)
            } else {
                path.clone()
            };
            debug!(path = %path.display(), "Using CSV source");
            Ok(Arc::new(CsvFileSource::new(path)))
        }
        SourceKind::Google => {
            let Some(id) = config.source.spreadsheet_id.as_deref() else {
                bail!("No spreadsheet configured. Run 'tally setup --spreadsheet-id <ID>'");
            };
            let credentials = match (&config.source.access_token, &config.source.api_key) {
                (Some(token), _) => Credentials::AccessToken(token.clone()),
                (None, Some(key)) => Credentials::ApiKey(key.clone()),
                (None, None) => bail!(
                    "No Google credentials. Set TALLY_ACCESS_TOKEN or TALLY_API_KEY, or run 'tally setup --token <TOKEN>'"
                ),
            };
            let base_url = config.source.base_url.clone().unwrap_or_else(get_base_url);
            let client = GoogleSheetsClient::new_with_base_url(id, credentials, &base_url)?;
            info!(spreadsheet = id, "Using Google Sheets source");
            Ok(Arc::new(GoogleSheetsSource::new(client)))
        }
    }
}
