//! Report and record services - the pipeline as the CLI consumes it

use std::io::Write;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::domain::result::Result;
use crate::domain::{
    Breakdowns, Choices, Dataset, Field, FilterSpec, Metrics, RecordDraft, ViewState, WriteRecord,
};
use crate::ports::SheetSource;
use crate::services::aggregate::Aggregator;
use crate::services::export::write_csv;
use crate::services::filter::FilterEngine;
use crate::services::reader::SheetReader;
use crate::services::writer::{AppendOutcome, RowWriter};

/// KPIs and breakdowns for one filtered fetch
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub tab: Option<String>,
    pub period: String,
    pub reference_date: NaiveDate,
    /// Rows in the tab before filtering
    pub fetched: usize,
    pub metrics: Metrics,
    pub breakdowns: Breakdowns,
}

/// Filtered rows restricted to the visible columns
#[derive(Debug, Clone, Serialize)]
pub struct RowsView {
    pub tab: Option<String>,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Matching rows, including any cut by a limit
    pub total: usize,
}

/// Which header a canonical field resolved to
#[derive(Debug, Clone, Serialize)]
pub struct ColumnMapping {
    pub field: &'static str,
    pub canonical: &'static str,
    pub header: Option<String>,
    pub index: Option<usize>,
}

/// Read-side service: fetch, filter, aggregate, export
pub struct ReportService {
    reader: SheetReader,
    filter: FilterEngine,
    aggregator: Aggregator,
}

impl ReportService {
    pub fn new(source: Arc<dyn SheetSource>, aggregator: Aggregator) -> Self {
        Self {
            reader: SheetReader::new(source),
            filter: FilterEngine::today(),
            aggregator,
        }
    }

    /// Anchor period filters at a fixed date instead of the local clock
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.filter = FilterEngine::new(today);
        self
    }

    /// Fetch a tab and apply the filter; every call reads the source again
    pub fn load(&self, tab: Option<&str>, filter: &FilterSpec) -> Result<(Dataset, Dataset)> {
        let dataset = self.reader.read(tab)?;
        let view = self.filter.apply(&dataset, filter);
        Ok((dataset, view))
    }

    pub fn report(&self, tab: Option<&str>, filter: &FilterSpec, top_n: usize) -> Result<Report> {
        let (dataset, view) = self.load(tab, filter)?;
        Ok(Report {
            tab: view.tab().map(str::to_string),
            period: filter.period.to_string(),
            reference_date: self.filter.reference_date(),
            fetched: dataset.len(),
            metrics: self.aggregator.metrics(&view),
            breakdowns: self.aggregator.breakdowns(&view, top_n),
        })
    }

    /// Filtered rows, at most `limit` of them
    pub fn rows(&self, tab: Option<&str>, state: &ViewState, limit: Option<usize>) -> Result<RowsView> {
        let (_, view) = self.load(tab, &state.filter)?;
        let columns = view.visible_columns(state.columns.as_deref());
        let rows = view
            .rows()
            .iter()
            .take(limit.unwrap_or(usize::MAX))
            .map(|row| columns.iter().map(|c| row.cell(c.index).to_string()).collect())
            .collect();
        Ok(RowsView {
            tab: view.tab().map(str::to_string),
            columns: columns.into_iter().map(|c| c.name).collect(),
            rows,
            total: view.len(),
        })
    }

    /// Write the filtered rows as CSV; returns the number of data rows
    pub fn export<W: Write>(&self, tab: Option<&str>, state: &ViewState, writer: W) -> Result<usize> {
        let (_, view) = self.load(tab, &state.filter)?;
        let columns = view.visible_columns(state.columns.as_deref());
        write_csv(&view, &columns, writer)?;
        info!(rows = view.len(), columns = columns.len(), "Exported rows");
        Ok(view.len())
    }

    /// Resolved header for every known field
    pub fn columns(&self, tab: Option<&str>) -> Result<(Dataset, Vec<ColumnMapping>)> {
        let dataset = self.reader.read(tab)?;
        let mappings = Field::ALL
            .into_iter()
            .map(|field| {
                let column = dataset.resolve(field);
                ColumnMapping {
                    field: field.key(),
                    canonical: field.canonical(),
                    header: column.as_ref().map(|c| c.name.clone()),
                    index: column.map(|c| c.index),
                }
            })
            .collect();
        Ok((dataset, mappings))
    }

    /// Selectable values for a column over the unfiltered tab
    pub fn options(&self, tab: Option<&str>, column: &str) -> Result<Vec<String>> {
        let dataset = self.reader.read(tab)?;
        Ok(self.filter.options(&dataset, column))
    }
}

/// Write-side service: validate a draft, then write it
pub struct RecordService {
    writer: RowWriter,
    choices: Choices,
}

impl RecordService {
    pub fn new(writer: RowWriter, choices: Choices) -> Self {
        Self { writer, choices }
    }

    pub fn choices(&self) -> &Choices {
        &self.choices
    }

    pub fn validate(&self, draft: &RecordDraft) -> Result<WriteRecord> {
        draft.validate(&self.choices)
    }

    /// Write an already validated record
    pub fn write(&self, tab: Option<&str>, record: &WriteRecord) -> Result<AppendOutcome> {
        self.writer.append(tab, record)
    }

    /// Validate and write; nothing touches the source when validation fails
    pub fn submit(&self, tab: Option<&str>, draft: &RecordDraft) -> Result<AppendOutcome> {
        let record = self.validate(draft)?;
        self.write(tab, &record)
    }
}
