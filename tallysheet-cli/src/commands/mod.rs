//! CLI command implementations

pub mod append;
pub mod columns;
pub mod demo;
pub mod export;
pub mod report;
pub mod rows;
pub mod setup;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tallysheet_core::{FilterSpec, Period, TallyContext};
use tracing::debug;

/// Get the tally directory from environment or default
pub fn get_tally_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("TALLY_DIR") {
        return Ok(PathBuf::from(dir));
    }
    let home = dirs::home_dir().context("Could not find home directory")?;
    Ok(home.join(".tallysheet"))
}

/// Get or create tally context
pub fn get_context() -> Result<TallyContext> {
    let tally_dir = get_tally_dir()?;
    std::fs::create_dir_all(&tally_dir)
        .with_context(|| format!("Failed to create tally directory: {:?}", tally_dir))?;
    debug!(dir = %tally_dir.display(), "Loading tally context");
    TallyContext::new(&tally_dir).context("Failed to initialize tally context")
}

/// Split `COL=VAL`
pub fn parse_pair(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected COLUMN=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing column name in '{raw}'"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

/// Filter flags shared by report, rows and export
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Sheet tab (defaults to the configured tab, else the first one)
    #[arg(long)]
    pub tab: Option<String>,
    /// Period: this-month, this-year, all, or YYYY-MM
    #[arg(long, default_value = "this-month")]
    pub period: Period,
    #[arg(long)]
    pub modality: Vec<String>,
    #[arg(long)]
    pub state: Vec<String>,
    #[arg(long)]
    pub city: Vec<String>,
    /// Client name; numbered branches ("Acme 02") match their base name
    #[arg(long)]
    pub client: Vec<String>,
    #[arg(long)]
    pub technician: Vec<String>,
    #[arg(long)]
    pub consultant: Vec<String>,
    #[arg(long)]
    pub status: Vec<String>,
    /// Any other column, as COLUMN=VALUE (repeatable)
    #[arg(long = "filter", value_parser = parse_pair)]
    pub filters: Vec<(String, String)>,
}

impl FilterArgs {
    pub fn to_spec(&self) -> FilterSpec {
        use tallysheet_core::Field;

        let mut spec = FilterSpec::new(self.period);
        for (field, values) in [
            (Field::Modality, &self.modality),
            (Field::State, &self.state),
            (Field::City, &self.city),
            (Field::Client, &self.client),
            (Field::Technician, &self.technician),
            (Field::Consultant, &self.consultant),
            (Field::Status, &self.status),
        ] {
            if !values.is_empty() {
                spec = spec.with_values(field.canonical(), values);
            }
        }
        for (column, value) in &self.filters {
            spec = spec.with_values(column, [value]);
        }
        spec
    }

    /// Requested tab, falling back to the configured one
    pub fn tab<'a>(&'a self, ctx: &'a TallyContext) -> Option<&'a str> {
        self.tab.as_deref().or_else(|| ctx.default_tab())
    }
}
