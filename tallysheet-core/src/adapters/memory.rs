//! In-memory sheet
//!
//! Holds tabs as plain string grids behind a mutex. Used by the integration
//! tests and by callers embedding the pipeline over data they already have.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::domain::is_blank;
use crate::domain::result::{Error, Result};
use crate::ports::{SheetSource, ValueInputMode};

type Tabs = Vec<(String, Vec<Vec<String>>)>;

/// In-memory tabular source
#[derive(Debug, Default)]
pub struct MemorySheet {
    tabs: Mutex<Tabs>,
    fail_writes: AtomicBool,
}

impl MemorySheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add a tab from string slices (first row is the header)
    pub fn with_tab(self, name: &str, rows: &[&[&str]]) -> Self {
        let grid = rows
            .iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect();
        self.with_grid(name, grid)
    }

    /// Builder: add a tab from an owned grid
    pub fn with_grid(self, name: &str, grid: Vec<Vec<String>>) -> Self {
        if let Ok(mut tabs) = self.tabs.lock() {
            tabs.push((name.to_string(), grid));
        }
        self
    }

    /// Make every write fail with a source error
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of one tab
    pub fn grid(&self, tab: &str) -> Result<Vec<Vec<String>>> {
        let tabs = self.lock()?;
        Ok(find(&tabs, tab)?.clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tabs>> {
        self.tabs
            .lock()
            .map_err(|_| Error::Other("memory sheet lock poisoned".to_string()))
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::source("memory sheet is read-only"));
        }
        Ok(())
    }
}

fn find<'a>(tabs: &'a Tabs, tab: &str) -> Result<&'a Vec<Vec<String>>> {
    tabs.iter()
        .find(|(name, _)| name == tab)
        .map(|(_, grid)| grid)
        .ok_or_else(|| Error::not_found(format!("tab '{tab}'")))
}

fn find_mut<'a>(tabs: &'a mut Tabs, tab: &str) -> Result<&'a mut Vec<Vec<String>>> {
    tabs.iter_mut()
        .find(|(name, _)| name == tab)
        .map(|(_, grid)| grid)
        .ok_or_else(|| Error::not_found(format!("tab '{tab}'")))
}

fn row_index(row: usize) -> Result<usize> {
    row.checked_sub(1)
        .ok_or_else(|| Error::validation("row numbers start at 1"))
}

impl SheetSource for MemorySheet {
    fn name(&self) -> &str {
        "memory"
    }

    fn tabs(&self) -> Result<Vec<String>> {
        Ok(self.lock()?.iter().map(|(name, _)| name.clone()).collect())
    }

    fn read_grid(&self, tab: &str) -> Result<Vec<Vec<String>>> {
        self.grid(tab)
    }

    fn read_row(&self, tab: &str, row: usize) -> Result<Vec<String>> {
        let index = row_index(row)?;
        let tabs = self.lock()?;
        Ok(find(&tabs, tab)?.get(index).cloned().unwrap_or_default())
    }

    fn read_column(&self, tab: &str, column: usize) -> Result<Vec<String>> {
        let tabs = self.lock()?;
        let mut values: Vec<String> = find(&tabs, tab)?
            .iter()
            .map(|r| r.get(column).cloned().unwrap_or_default())
            .collect();
        while values.last().is_some_and(|v| v.is_empty()) {
            values.pop();
        }
        Ok(values)
    }

    fn write_row(
        &self,
        tab: &str,
        row: usize,
        values: &[String],
        _mode: ValueInputMode,
    ) -> Result<()> {
        self.check_writable()?;
        let index = row_index(row)?;
        let mut tabs = self.lock()?;
        let grid = find_mut(&mut tabs, tab)?;
        if grid.len() <= index {
            grid.resize(index + 1, Vec::new());
        }
        let target = &mut grid[index];
        if target.len() < values.len() {
            target.resize(values.len(), String::new());
        }
        target[..values.len()].clone_from_slice(values);
        Ok(())
    }

    fn insert_row(
        &self,
        tab: &str,
        row: usize,
        values: &[String],
        _mode: ValueInputMode,
    ) -> Result<()> {
        self.check_writable()?;
        let index = row_index(row)?;
        let mut tabs = self.lock()?;
        let grid = find_mut(&mut tabs, tab)?;
        if grid.len() < index {
            grid.resize(index, Vec::new());
        }
        grid.insert(index, values.to_vec());
        Ok(())
    }

    fn append_row(&self, tab: &str, values: &[String], _mode: ValueInputMode) -> Result<usize> {
        self.check_writable()?;
        let mut tabs = self.lock()?;
        let grid = find_mut(&mut tabs, tab)?;
        let index = grid
            .iter()
            .rposition(|r| !is_blank(r))
            .map_or(0, |last| last + 1);
        grid.insert(index, values.to_vec());
        Ok(index + 1)
    }
}
