//! Demo command - manage demo mode

use anyhow::Result;
use chrono::Local;
use clap::Subcommand;
use colored::Colorize;
use tallysheet_core::adapters::demo::{write_demo_csv, DEMO_FILE};
use tallysheet_core::config::Config;

use super::get_tally_dir;

#[derive(Subcommand)]
pub enum DemoCommands {
    /// Enable demo mode
    #[command(name = "on")]
    On,
    /// Disable demo mode
    #[command(name = "off")]
    Off,
    /// Show demo mode status
    Status,
}

pub fn run(command: Option<DemoCommands>) -> Result<()> {
    let tally_dir = get_tally_dir()?;
    std::fs::create_dir_all(&tally_dir)?;
    let mut config = Config::load(&tally_dir)?;

    match command {
        Some(DemoCommands::On) => {
            // regenerate so the data ends today
            let rows = write_demo_csv(&tally_dir.join(DEMO_FILE), Local::now().date_naive())?;
            config.enable_demo_mode();
            config.save(&tally_dir)?;
            println!("{}", "Demo mode enabled".green());
            println!("{rows} demo installations generated. Run 'tally report' to see them.");
            Ok(())
        }
        Some(DemoCommands::Off) => {
            config.disable_demo_mode();
            config.save(&tally_dir)?;
            println!("{}", "Demo mode disabled".yellow());
            Ok(())
        }
        Some(DemoCommands::Status) | None => {
            if config.demo_mode {
                println!("Demo mode is {}", "ON".green());
            } else {
                println!("Demo mode is {}", "OFF".yellow());
            }
            Ok(())
        }
    }
}
