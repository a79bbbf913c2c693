//! Rows command - show the filtered installations as a table

use anyhow::Result;
use tallysheet_core::ViewState;

use super::{get_context, FilterArgs};
use crate::output;

pub fn run(filters: FilterArgs, columns: Vec<String>, limit: Option<usize>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let state = ViewState::new(filters.to_spec()).with_columns(columns);
    let tab = filters.tab(&ctx);

    let view = output::with_spinner("Fetching sheet...", || {
        ctx.report_service.rows(tab, &state, limit)
    })?;

    if json {
        return output::json(&view);
    }

    if view.total == 0 {
        output::warning("No installations match these filters.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(&view.columns);
    for row in &view.rows {
        table.add_row(row);
    }
    println!("{table}");
    println!();
    if view.rows.len() < view.total {
        println!("{} of {} row(s) shown", view.rows.len(), view.total);
    } else {
        println!("{} row(s)", view.total);
    }
    Ok(())
}
