//! CSV file source
//!
//! A single-tab workbook backed by one CSV file, named after the file stem.
//! Writes load the whole file, apply the change and rewrite it.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use super::memory::MemorySheet;
use crate::domain::result::{Error, Result};
use crate::ports::{SheetSource, ValueInputMode};
use crate::services::export::{read_csv, write_grid};

/// CSV-backed tabular source
#[derive(Debug)]
pub struct CsvFileSource {
    path: PathBuf,
    tab: String,
    // Serializes read-modify-write cycles on the file
    guard: Mutex<()>,
}

impl CsvFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let tab = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Sheet1".to_string());
        Self {
            path,
            tab,
            guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn check_tab(&self, tab: &str) -> Result<()> {
        if tab == self.tab {
            Ok(())
        } else {
            Err(Error::not_found(format!("tab '{tab}' in {}", self.path.display())))
        }
    }

    fn load(&self) -> Result<Vec<Vec<String>>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(&self.path)?;
        let grid = read_csv(file)?;
        debug!(path = %self.path.display(), rows = grid.len(), "Loaded CSV sheet");
        Ok(grid)
    }

    /// Run one mutation against an in-memory copy and persist the result
    fn modify<T>(&self, op: impl FnOnce(&MemorySheet) -> Result<T>) -> Result<T> {
        let _guard = self
            .guard
            .lock()
            .map_err(|_| Error::Other("CSV sheet lock poisoned".to_string()))?;

        let sheet = MemorySheet::new().with_grid(&self.tab, self.load()?);
        let out = op(&sheet)?;

        let file = File::create(&self.path)?;
        write_grid(&sheet.grid(&self.tab)?, BufWriter::new(file))?;
        Ok(out)
    }
}

impl SheetSource for CsvFileSource {
    fn name(&self) -> &str {
        "csv"
    }

    fn tabs(&self) -> Result<Vec<String>> {
        Ok(vec![self.tab.clone()])
    }

    fn read_grid(&self, tab: &str) -> Result<Vec<Vec<String>>> {
        self.check_tab(tab)?;
        self.load()
    }

    fn read_row(&self, tab: &str, row: usize) -> Result<Vec<String>> {
        self.check_tab(tab)?;
        MemorySheet::new()
            .with_grid(tab, self.load()?)
            .read_row(tab, row)
    }

    fn read_column(&self, tab: &str, column: usize) -> Result<Vec<String>> {
        self.check_tab(tab)?;
        MemorySheet::new()
            .with_grid(tab, self.load()?)
            .read_column(tab, column)
    }

    fn write_row(&self, tab: &str, row: usize, values: &[String], mode: ValueInputMode) -> Result<()> {
        self.check_tab(tab)?;
        self.modify(|sheet| sheet.write_row(tab, row, values, mode))
    }

    fn insert_row(
        &self,
        tab: &str,
        row: usize,
        values: &[String],
        mode: ValueInputMode,
    ) -> Result<()> {
        self.check_tab(tab)?;
        self.modify(|sheet| sheet.insert_row(tab, row, values, mode))
    }

    fn append_row(&self, tab: &str, values: &[String], mode: ValueInputMode) -> Result<usize> {
        self.check_tab(tab)?;
        self.modify(|sheet| sheet.append_row(tab, values, mode))
    }
}
