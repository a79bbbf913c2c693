//! Columns command - show how the sheet's headers map to known fields

use anyhow::Result;
use colored::Colorize;

use super::get_context;
use crate::output;

pub fn run(tab: Option<String>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let tab = tab.as_deref().or_else(|| ctx.default_tab());
    let (dataset, mappings) = output::with_spinner("Fetching sheet...", || {
        ctx.report_service.columns(tab)
    })?;

    if json {
        return output::json(&serde_json::json!({
            "tab": dataset.tab(),
            "headers": dataset.headers(),
            "fields": mappings,
        }));
    }

    println!(
        "{} {}",
        "Columns".bold(),
        format!("({})", dataset.tab().unwrap_or("-")).dimmed()
    );
    let mut table = output::create_table();
    table.set_header(vec!["Field", "Header", "Column"]);
    for m in &mappings {
        match (&m.header, m.index) {
            (Some(header), Some(index)) => {
                table.add_row(vec![m.canonical.to_string(), header.clone(), (index + 1).to_string()]);
            }
            _ => {
                table.add_row(vec![m.canonical.to_string(), "missing".dimmed().to_string(), String::new()]);
            }
        }
    }
    println!("{table}");

    let known: Vec<&str> = mappings.iter().filter_map(|m| m.header.as_deref()).collect();
    let other: Vec<&str> = dataset
        .headers()
        .iter()
        .map(String::as_str)
        .filter(|h| !h.is_empty() && !known.contains(h))
        .collect();
    if !other.is_empty() {
        println!();
        println!("Other columns: {}", other.join(", "));
    }
    Ok(())
}
