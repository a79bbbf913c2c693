//! Spreadsheet source port
//!
//! Defines the interface for reading and writing the tabular resource the
//! pipeline runs on (Google Sheets, a CSV file, an in-memory grid).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result};

/// How the source should interpret written values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueInputMode {
    /// Stored verbatim as text
    Raw,
    /// Parsed as if typed into the sheet (dates, numbers, formulas)
    #[default]
    UserEntered,
}

impl ValueInputMode {
    /// Name used by the Sheets API
    pub fn as_api_str(&self) -> &'static str {
        match self {
            ValueInputMode::Raw => "RAW",
            ValueInputMode::UserEntered => "USER_ENTERED",
        }
    }
}

impl fmt::Display for ValueInputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueInputMode::Raw => write!(f, "raw"),
            ValueInputMode::UserEntered => write!(f, "user-entered"),
        }
    }
}

impl FromStr for ValueInputMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "raw" => Ok(ValueInputMode::Raw),
            "user-entered" | "userentered" => Ok(ValueInputMode::UserEntered),
            other => Err(Error::validation(format!("Unknown value input mode '{other}'"))),
        }
    }
}

/// Tabular source trait
///
/// Rows are 1-based (row 1 is the header), columns 0-based. Reads return the
/// cells as displayed text; trailing empty cells and rows may be omitted by
/// the source, so callers pad as needed.
pub trait SheetSource: Send + Sync {
    /// Source name (e.g., "google-sheets", "csv")
    fn name(&self) -> &str;

    /// Tab names in source order
    fn tabs(&self) -> Result<Vec<String>>;

    /// The full rectangular value grid of a tab, blank rows included
    fn read_grid(&self, tab: &str) -> Result<Vec<Vec<String>>>;

    /// One row by 1-based index; empty when past the end
    fn read_row(&self, tab: &str, row: usize) -> Result<Vec<String>>;

    /// One column by 0-based index, from row 1 down to its last non-empty cell
    fn read_column(&self, tab: &str, column: usize) -> Result<Vec<String>>;

    /// Overwrite a row starting at the first column
    fn write_row(&self, tab: &str, row: usize, values: &[String], mode: ValueInputMode)
        -> Result<()>;

    /// Insert a new row at `row`, shifting that row and everything below down
    fn insert_row(&self, tab: &str, row: usize, values: &[String], mode: ValueInputMode)
        -> Result<()>;

    /// Write a row after the last row with data; returns the row it landed on
    fn append_row(&self, tab: &str, values: &[String], mode: ValueInputMode) -> Result<usize>;
}
