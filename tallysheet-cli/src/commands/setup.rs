//! Setup command - point tally at a spreadsheet or CSV file

use std::path::PathBuf;

use anyhow::Result;
use colored::Colorize;
use dialoguer::Input;
use tallysheet_core::config::{Config, SourceKind};
use tallysheet_core::ValueInputMode;

use super::get_tally_dir;
use crate::output;

#[derive(clap::Args, Debug, Clone, Default)]
pub struct SetupArgs {
    /// Google spreadsheet ID (from the sheet URL)
    #[arg(long)]
    pub spreadsheet_id: Option<String>,
    /// Default tab, e.g. the current year
    #[arg(long)]
    pub sheet_name: Option<String>,
    /// OAuth access token
    #[arg(long)]
    pub token: Option<String>,
    /// API key (read-only, public sheets)
    #[arg(long)]
    pub api_key: Option<String>,
    /// Use a local CSV file instead of Google Sheets
    #[arg(long)]
    pub csv: Option<PathBuf>,
    /// How written values are interpreted: raw or user-entered
    #[arg(long)]
    pub input_mode: Option<ValueInputMode>,
    /// Column to read the reschedule rate from
    #[arg(long)]
    pub reschedule_column: Option<String>,
}

pub fn run(args: SetupArgs) -> Result<()> {
    let tally_dir = get_tally_dir()?;
    let mut config = Config::load(&tally_dir).unwrap_or_default();

    if config.demo_mode {
        output::warning("Demo mode is on; run 'tally demo off' to use this source.");
    }

    apply(&mut config, args);

    if config.source.kind == SourceKind::Google && config.source.spreadsheet_id.is_none() {
        if !output::is_interactive() {
            anyhow::bail!("No spreadsheet configured. Pass --spreadsheet-id or --csv.");
        }
        let id: String = Input::new()
            .with_prompt("Spreadsheet ID")
            .interact_text()?;
        config.source.spreadsheet_id = Some(id.trim().to_string());
    }

    config.save(&tally_dir)?;
    println!("{} settings saved to {}", "Success!".green(), tally_dir.join("settings.json").display());
    match config.source.kind {
        SourceKind::Csv => {
            if let Some(path) = &config.source.path {
                output::info(&format!("Source: CSV file {}", path.display()));
            }
        }
        SourceKind::Google => {
            let id = config.source.spreadsheet_id.as_deref().unwrap_or_default();
            output::info(&format!("Source: Google spreadsheet {id}"));
            if config.source.access_token.is_none() && config.source.api_key.is_none() {
                output::warning("No credentials saved; set TALLY_ACCESS_TOKEN or TALLY_API_KEY.");
            }
        }
    }
    println!("Run 'tally report' to see this month's installations.");
    Ok(())
}

fn apply(config: &mut Config, args: SetupArgs) {
    if let Some(path) = args.csv {
        config.source.kind = SourceKind::Csv;
        config.source.path = Some(path);
    }
    if let Some(id) = args.spreadsheet_id {
        config.source.kind = SourceKind::Google;
        config.source.spreadsheet_id = Some(id);
    }
    if let Some(name) = args.sheet_name {
        config.source.sheet_name = Some(name);
    }
    if let Some(token) = args.token {
        config.source.access_token = Some(token);
    }
    if let Some(key) = args.api_key {
        config.source.api_key = Some(key);
    }
    if let Some(mode) = args.input_mode {
        config.value_input_mode = mode;
    }
    if let Some(column) = args.reschedule_column {
        config.reschedule_column = Some(column).filter(|c| !c.trim().is_empty());
    }
}
