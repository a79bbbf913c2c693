//! Row writer - puts a validated record into the first gap of a tab

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::domain::columns::normalize_header;
use crate::domain::result::{Error, Result};
use crate::domain::{Field, WriteRecord};
use crate::ports::{SheetSource, ValueInputMode};
use crate::services::reader::resolve_tab;

/// Where a record landed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppendOutcome {
    pub tab: String,
    /// 1-based sheet row
    pub row: usize,
    /// True when the record filled a gap instead of going after the last row
    pub inserted: bool,
}

/// Lay a record out in header order
///
/// Keys missing from the header are dropped and headers missing from the
/// record become empty cells. A header that is an alias of a known field also
/// takes the value stored under the field's canonical name.
pub fn serialize_record(header: &[String], record: &WriteRecord) -> Vec<String> {
    header
        .iter()
        .map(|raw| {
            let name = normalize_header(raw);
            if name.is_empty() {
                return String::new();
            }
            record
                .get(&name)
                .or_else(|| Field::for_header(&name).and_then(|f| record.get(f.canonical())))
                .unwrap_or_default()
                .to_string()
        })
        .collect()
}

/// First empty cell of the reference column below the header, 1-based
///
/// `column` holds the column from row 1 down to its last non-empty cell, so a
/// `None` means every row in that extent is occupied.
pub fn first_gap(column: &[String]) -> Option<usize> {
    column
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, cell)| cell.trim().is_empty())
        .map(|(index, _)| index + 1)
}

/// Writes records through a sheet source
pub struct RowWriter {
    source: Arc<dyn SheetSource>,
    mode: ValueInputMode,
}

impl RowWriter {
    pub fn new(source: Arc<dyn SheetSource>) -> Self {
        Self {
            source,
            mode: ValueInputMode::default(),
        }
    }

    pub fn with_mode(mut self, mode: ValueInputMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> ValueInputMode {
        self.mode
    }

    /// Write `record` into `tab`
    ///
    /// The header row is read fresh on every call. The date column (or the
    /// first column) is scanned from row 2 down; the record is inserted at the
    /// first empty cell, shifting the rows below, or appended after the last
    /// row when there is no gap. A row whose reference cell is empty counts
    /// as a gap even when its other cells hold data.
    pub fn append(&self, tab: Option<&str>, record: &WriteRecord) -> Result<AppendOutcome> {
        let tab = resolve_tab(self.source.as_ref(), tab)
            .map_err(into_write)?
            .ok_or_else(|| Error::write(format!("{} has no tabs", self.source.name())))?;

        let header = self.source.read_row(&tab, 1).map_err(into_write)?;
        let normalized: Vec<String> = header.iter().map(|h| normalize_header(h)).collect();
        if normalized.iter().all(String::is_empty) {
            return Err(Error::write(format!("tab '{tab}' has an empty header row")));
        }

        let values = serialize_record(&header, record);
        let reference = Field::Date
            .resolve(&normalized)
            .map_or(0, |column| column.index);
        let column = self
            .source
            .read_column(&tab, reference)
            .map_err(into_write)?;
        debug!(tab = tab.as_str(), reference, extent = column.len(), "Scanning for gap");

        let (row, inserted) = match first_gap(&column) {
            Some(row) => {
                self.source
                    .insert_row(&tab, row, &values, self.mode)
                    .map_err(into_write)?;
                (row, true)
            }
            None => {
                let row = self
                    .source
                    .append_row(&tab, &values, self.mode)
                    .map_err(into_write)?;
                (row, false)
            }
        };

        info!(tab = tab.as_str(), row, inserted, mode = %self.mode, "Wrote record");
        Ok(AppendOutcome { tab, row, inserted })
    }
}

fn into_write(err: Error) -> Error {
    match err {
        Error::Source(msg) => Error::Write(msg),
        other => other,
    }
}
