//! Export command - write the filtered installations as CSV

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;

use anyhow::{Context, Result};
use tallysheet_core::ViewState;

use super::{get_context, FilterArgs};
use crate::output;

pub fn run(filters: FilterArgs, columns: Vec<String>, out: Option<PathBuf>) -> Result<()> {
    let ctx = get_context()?;
    let state = ViewState::new(filters.to_spec()).with_columns(columns);
    let tab = filters.tab(&ctx);

    match out {
        Some(path) => {
            let file = File::create(&path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let rows = output::with_spinner("Fetching sheet...", || {
                ctx.report_service.export(tab, &state, BufWriter::new(file))
            })?;
            output::success(&format!("Exported {rows} row(s) to {}", path.display()));
        }
        None => {
            let stdout = io::stdout();
            ctx.report_service.export(tab, &state, stdout.lock())?;
        }
    }
    Ok(())
}
