//! Normalized in-memory table for one fetch

use std::sync::{Arc, OnceLock};

use chrono::NaiveDate;

use super::columns::{normalize_header, normalize_headers, ColumnRef, Field};
use super::parse::{client_base_name, parse_date};

/// One source row: cells aligned to the header row, plus the 1-based row
/// number it occupies in the sheet
///
/// Derived values are computed on first use and cached on the row.
#[derive(Debug)]
pub struct RawRow {
    source_row: usize,
    cells: Vec<String>,
    date: OnceLock<Option<NaiveDate>>,
    client: OnceLock<String>,
}

impl RawRow {
    pub fn new(source_row: usize, cells: Vec<String>) -> Self {
        Self {
            source_row,
            cells,
            date: OnceLock::new(),
            client: OnceLock::new(),
        }
    }

    /// Row number in the sheet (header is row 1)
    pub fn source_row(&self) -> usize {
        self.source_row
    }

    pub fn cells(&self) -> &[String] {
        &self.cells
    }

    /// Cell text, or "" past the end of the row
    pub fn cell(&self, index: usize) -> &str {
        self.cells.get(index).map(String::as_str).unwrap_or("")
    }

    /// True when every cell trims to the empty string
    pub fn is_empty(&self) -> bool {
        is_blank(&self.cells)
    }
}

/// True when every cell trims to the empty string
pub fn is_blank(cells: &[String]) -> bool {
    cells.iter().all(|c| c.trim().is_empty())
}

/// Gap-filtered rows of one tab, with the header row captured at fetch time
///
/// Cloning is cheap and filtered views share rows with their parent.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    tab: Option<String>,
    headers: Arc<Vec<String>>,
    rows: Vec<Arc<RawRow>>,
    date_column: Option<ColumnRef>,
    client_column: Option<ColumnRef>,
}

impl Dataset {
    /// The "no data" dataset
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from normalized headers and rows already aligned to them
    pub fn new(tab: Option<String>, headers: Vec<String>, rows: Vec<RawRow>) -> Self {
        let date_column = Field::Date.resolve(&headers);
        let client_column = Field::Client.resolve(&headers);
        Self {
            tab,
            headers: Arc::new(headers),
            rows: rows.into_iter().map(Arc::new).collect(),
            date_column,
            client_column,
        }
    }

    /// Build from a full value grid (first row is the header)
    ///
    /// Rows are padded or truncated to the header width and rows whose cells
    /// are all blank are skipped. Kept rows remember their sheet row number,
    /// so a gap never shifts the identity of the rows after it. A grid with
    /// fewer than two rows, or with an empty header, is "no data".
    pub fn from_grid(tab: Option<String>, grid: &[Vec<String>]) -> Self {
        if grid.len() < 2 {
            return Self::empty();
        }
        let headers = normalize_headers(&grid[0]);
        if headers.is_empty() {
            return Self::empty();
        }

        let width = headers.len();
        let rows = grid[1..]
            .iter()
            .enumerate()
            .filter_map(|(offset, raw)| {
                let mut cells: Vec<String> = raw.iter().take(width).cloned().collect();
                cells.resize(width, String::new());
                if is_blank(&cells) {
                    None
                } else {
                    Some(RawRow::new(offset + 2, cells))
                }
            })
            .collect();

        Self::new(tab, headers, rows)
    }

    /// Tab the rows were read from
    pub fn tab(&self) -> Option<&str> {
        self.tab.as_deref()
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Arc<RawRow>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column for a canonical field, through its alias list
    pub fn resolve(&self, field: Field) -> Option<ColumnRef> {
        field.resolve(&self.headers)
    }

    /// Column by header name; a name that is an alias of a known field
    /// resolves to whichever alias this sheet actually uses
    pub fn column(&self, name: &str) -> Option<ColumnRef> {
        let name = normalize_header(name);
        if let Some(index) = self.headers.iter().position(|h| *h == name) {
            return Some(ColumnRef::new(index, name));
        }
        Field::for_header(&name).and_then(|field| self.resolve(field))
    }

    /// True when `column` is this dataset's client column
    pub fn is_client_column(&self, column: &ColumnRef) -> bool {
        self.client_column.as_ref() == Some(column)
    }

    /// Parsed date of a row (day-first), cached on the row
    pub fn date(&self, row: &RawRow) -> Option<NaiveDate> {
        *row.date.get_or_init(|| {
            self.date_column
                .as_ref()
                .and_then(|c| parse_date(row.cell(c.index)))
        })
    }

    /// Canonical client name of a row, or `None` without a client column
    pub fn client_base<'a>(&self, row: &'a RawRow) -> Option<&'a str> {
        let column = self.client_column.as_ref()?;
        Some(
            row.client
                .get_or_init(|| client_base_name(row.cell(column.index)))
                .as_str(),
        )
    }

    /// Cell text for a row under a header name
    pub fn get<'a>(&self, row: &'a RawRow, name: &str) -> Option<&'a str> {
        self.column(name).map(|c| row.cell(c.index))
    }

    /// All cell values of a column, in row order
    pub fn values<'a>(&'a self, column: &'a ColumnRef) -> impl Iterator<Item = &'a str> + 'a {
        self.rows.iter().map(move |r| r.cell(column.index))
    }

    /// Header → value pairs for one row, in header order
    pub fn record<'a>(&'a self, row: &'a RawRow) -> Vec<(&'a str, &'a str)> {
        self.headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.as_str(), row.cell(i)))
            .collect()
    }

    /// View with the rows matching `keep`, sharing row storage
    pub fn retain(&self, mut keep: impl FnMut(&RawRow) -> bool) -> Dataset {
        Dataset {
            tab: self.tab.clone(),
            headers: Arc::clone(&self.headers),
            rows: self
                .rows
                .iter()
                .filter(|r| {
                    let row: &RawRow = r;
                    keep(row)
                })
                .cloned()
                .collect(),
            date_column: self.date_column.clone(),
            client_column: self.client_column.clone(),
        }
    }

    /// Columns to show: the requested ones that exist (in request order), or
    /// every non-empty header when nothing usable was requested
    pub fn visible_columns(&self, requested: Option<&[String]>) -> Vec<ColumnRef> {
        let picked: Vec<ColumnRef> = requested
            .unwrap_or_default()
            .iter()
            .filter_map(|name| self.column(name))
            .collect();
        if !picked.is_empty() {
            return picked;
        }
        self.headers
            .iter()
            .enumerate()
            .filter(|(_, h)| !h.is_empty())
            .map(|(i, h)| ColumnRef::new(i, h.clone()))
            .collect()
    }
}
