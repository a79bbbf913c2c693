//! Tally CLI - installation reports over a shared spreadsheet

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{append, columns, demo, export, report, rows, setup, FilterArgs};

/// Tally - installation reports over a shared spreadsheet
#[derive(Parser)]
#[command(name = "tally", version, about, long_about = None)]
struct Cli {
    /// Log debug output to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show KPIs and breakdowns for the filtered installations
    Report {
        #[command(flatten)]
        filters: FilterArgs,
        /// Entries per breakdown table
        #[arg(long, default_value_t = 10)]
        top: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the filtered installations
    Rows {
        #[command(flatten)]
        filters: FilterArgs,
        /// Columns to show, in order
        #[arg(long, value_delimiter = ',')]
        columns: Vec<String>,
        /// Show at most N rows
        #[arg(long)]
        limit: Option<usize>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export the filtered installations as CSV
    Export {
        #[command(flatten)]
        filters: FilterArgs,
        /// Columns to export, in order
        #[arg(long, value_delimiter = ',')]
        columns: Vec<String>,
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Add a new installation to the sheet
    Append {
        #[command(flatten)]
        args: append::AppendArgs,
    },

    /// Show which sheet columns map to known fields
    Columns {
        /// Sheet tab
        #[arg(long)]
        tab: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Configure the spreadsheet source
    Setup {
        #[command(flatten)]
        args: setup::SetupArgs,
    },

    /// Manage demo mode
    Demo {
        #[command(subcommand)]
        command: Option<demo::DemoCommands>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = run(cli);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr; TALLY_LOG (or RUST_LOG) sets the level, default warn
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        std::env::var("TALLY_LOG")
            .ok()
            .and_then(|v| EnvFilter::try_new(v).ok())
            .or_else(|| EnvFilter::try_from_default_env().ok())
            .unwrap_or_else(|| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Report { filters, top, json } => report::run(filters, top, json),
        Commands::Rows { filters, columns, limit, json } => rows::run(filters, columns, limit, json),
        Commands::Export { filters, columns, output } => export::run(filters, columns, output),
        Commands::Append { args } => append::run(args),
        Commands::Columns { tab, json } => columns::run(tab, json),
        Commands::Setup { args } => setup::run(args),
        Commands::Demo { command } => demo::run(command),
    }
}
