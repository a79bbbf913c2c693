//! Append command - validate a new installation and write it to the sheet

use anyhow::Result;
use chrono::Local;
use clap::Args;
use colored::Colorize;
use dialoguer::{Confirm, Input, Select};
use tallysheet_core::domain::Choices;
use tallysheet_core::{Field, OperationResult, RecordDraft};

use super::{get_context, parse_pair};
use crate::output;

#[derive(Args, Debug, Clone, Default)]
pub struct AppendArgs {
    /// Sheet tab to write to
    #[arg(long)]
    pub tab: Option<String>,
    /// Date (DD/MM/YYYY)
    #[arg(long)]
    pub date: Option<String>,
    /// Start time (HH:MM)
    #[arg(long)]
    pub start: Option<String>,
    /// End time (HH:MM)
    #[arg(long)]
    pub end: Option<String>,
    /// Duration; filled from start/end when omitted
    #[arg(long)]
    pub duration: Option<String>,
    #[arg(long)]
    pub modality: Option<String>,
    #[arg(long)]
    pub technician: Option<String>,
    #[arg(long)]
    pub consultant: Option<String>,
    #[arg(long)]
    pub client: Option<String>,
    /// State code (2 letters)
    #[arg(long)]
    pub state: Option<String>,
    #[arg(long)]
    pub city: Option<String>,
    #[arg(long)]
    pub status: Option<String>,
    #[arg(long)]
    pub plan: Option<String>,
    /// Amount, e.g. 1.234,56
    #[arg(long)]
    pub amount: Option<String>,
    #[arg(long)]
    pub kiosks: Option<String>,
    #[arg(long)]
    pub players: Option<String>,
    /// Reschedule reason
    #[arg(long)]
    pub reason: Option<String>,
    /// Any other column, as COLUMN=VALUE (repeatable)
    #[arg(long = "set", value_parser = parse_pair)]
    pub extra: Vec<(String, String)>,
    /// Skip prompts and confirmation
    #[arg(long, short)]
    pub yes: bool,
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AppendArgs {
    pub fn to_draft(&self) -> RecordDraft {
        RecordDraft {
            date: self.date.clone(),
            start_time: self.start.clone(),
            end_time: self.end.clone(),
            duration: self.duration.clone(),
            modality: self.modality.clone(),
            technician: self.technician.clone(),
            consultant: self.consultant.clone(),
            client: self.client.clone(),
            state: self.state.clone(),
            city: self.city.clone(),
            status: self.status.clone(),
            amount: self.amount.clone(),
            plan: self.plan.clone(),
            reschedule_reason: self.reason.clone(),
            kiosk_count: self.kiosks.clone(),
            player_count: self.players.clone(),
            extra: self.extra.iter().cloned().collect(),
        }
    }
}

pub fn run(args: AppendArgs) -> Result<()> {
    let ctx = get_context()?;
    let mut draft = args.to_draft();

    let interactive = !args.yes && !args.json && output::is_interactive();
    if interactive {
        prompt_missing(&mut draft, ctx.record_service.choices())?;
    }

    let record = match ctx.record_service.validate(&draft) {
        Ok(record) => record,
        Err(e) => {
            let count = e.problems().len();
            if count == 0 {
                return Err(e.into());
            }
            if args.json {
                output::json(&OperationResult::<()>::from(Err(e)))?;
            } else {
                output::error("Record not written:");
                for problem in e.problems() {
                    eprintln!("  - {problem}");
                }
            }
            anyhow::bail!("{count} problem(s) in the record");
        }
    };

    if interactive {
        let mut table = output::create_table();
        for (key, value) in record.iter() {
            table.add_row(vec![key, value]);
        }
        println!("{table}");
        if !Confirm::new()
            .with_prompt("Write this installation?")
            .default(true)
            .interact()?
        {
            output::warning("Cancelled");
            return Ok(());
        }
    }

    let tab = args.tab.as_deref().or_else(|| ctx.default_tab());
    let outcome = output::with_spinner("Writing row...", || {
        ctx.record_service.write(tab, &record)
    })?;

    if args.json {
        output::json(&OperationResult::ok(serde_json::json!({ "record": record, "outcome": outcome })))?;
    } else {
        let how = if outcome.inserted { "filled gap at" } else { "appended at" };
        println!("{} {how} row {} of '{}'", "Written:".green(), outcome.row, outcome.tab);
    }
    Ok(())
}

/// Ask for the fields people most often forget
fn prompt_missing(draft: &mut RecordDraft, choices: &Choices) -> Result<()> {
    if !draft.is_given(Field::Date) {
        let today = Local::now().date_naive().format("%d/%m/%Y").to_string();
        let date: String = Input::new()
            .with_prompt("Date (DD/MM/YYYY)")
            .default(today)
            .interact_text()?;
        draft.set_field(Field::Date, date);
    }

    for (field, prompt) in [
        (Field::StartTime, "Start (HH:MM)"),
        (Field::EndTime, "End (HH:MM)"),
        (Field::Client, "Client"),
        (Field::Technician, "Technician"),
    ] {
        if !draft.is_given(field) {
            let value: String = Input::new()
                .with_prompt(prompt)
                .allow_empty(true)
                .interact_text()?;
            draft.set_field(field, value);
        }
    }

    for (field, prompt) in [(Field::Modality, "Modality"), (Field::Status, "Status")] {
        if draft.is_given(field) {
            continue;
        }
        if let Some(options) = choices.for_field(field) {
            let picked = Select::new()
                .with_prompt(prompt)
                .items(options)
                .default(0)
                .interact()?;
            draft.set_field(field, options[picked].clone());
        }
    }
    Ok(())
}
