//! Sheet reader - fetches a tab into a Dataset

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::result::Result;
use crate::domain::Dataset;
use crate::ports::SheetSource;

/// Pick the tab to use: the requested one when it exists, else the first
///
/// Returns `None` only when the source has no tabs at all.
pub fn resolve_tab(source: &dyn SheetSource, requested: Option<&str>) -> Result<Option<String>> {
    let tabs = source.tabs()?;
    let requested = requested.map(str::trim).filter(|t| !t.is_empty());

    if let Some(name) = requested {
        if let Some(tab) = tabs.iter().find(|t| t.as_str() == name) {
            return Ok(Some(tab.clone()));
        }
    }

    let fallback = tabs.into_iter().next();
    if let (Some(name), Some(first)) = (requested, &fallback) {
        warn!(requested = name, using = first.as_str(), "Tab not found, falling back to first tab");
    }
    Ok(fallback)
}

/// Reads whole tabs into datasets
pub struct SheetReader {
    source: Arc<dyn SheetSource>,
}

impl SheetReader {
    pub fn new(source: Arc<dyn SheetSource>) -> Self {
        Self { source }
    }

    /// Fetch a tab as a Dataset
    ///
    /// The full value grid is fetched, not a record view, so rows after a
    /// blank row are never lost. A source with no tabs or fewer than two
    /// rows yields an empty dataset.
    pub fn read(&self, tab: Option<&str>) -> Result<Dataset> {
        let Some(tab) = resolve_tab(self.source.as_ref(), tab)? else {
            warn!(source = self.source.name(), "Source has no tabs");
            return Ok(Dataset::empty());
        };

        let grid = self.source.read_grid(&tab)?;
        let dataset = Dataset::from_grid(Some(tab.clone()), &grid);
        debug!(
            tab = tab.as_str(),
            grid_rows = grid.len(),
            kept = dataset.len(),
            "Normalized grid"
        );
        info!(source = self.source.name(), tab = tab.as_str(), rows = dataset.len(), "Fetched sheet");
        Ok(dataset)
    }
}
