//! Report command - KPIs and breakdowns for the filtered installations

use anyhow::Result;
use colored::Colorize;
use tallysheet_core::domain::CategoryCount;
use tallysheet_core::services::Report;

use super::{get_context, FilterArgs};
use crate::output;

pub fn run(filters: FilterArgs, top: usize, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let spec = filters.to_spec();
    let tab = filters.tab(&ctx);

    let report = output::with_spinner("Fetching sheet...", || {
        ctx.report_service.report(tab, &spec, top)
    })?;

    if json {
        return output::json(&report);
    }

    print_report(&report);
    Ok(())
}

fn print_report(report: &Report) {
    let m = &report.metrics;
    let tab = report.tab.as_deref().unwrap_or("-");
    println!(
        "{} {}",
        "Installations".bold(),
        format!("({tab}, {}, as of {})", report.period, report.reference_date.format("%d/%m/%Y")).dimmed()
    );
    println!();

    if report.fetched == 0 {
        output::warning("No data in this sheet.");
        return;
    }
    if m.total == 0 {
        output::warning("No installations match these filters.");
        return;
    }

    let mut table = output::create_table();
    table.add_row(vec!["Installations".to_string(), m.total.to_string()]);
    table.add_row(vec!["Mean duration".to_string(), m.mean_duration_label()]);
    if m.total_duration > 0.0 {
        table.add_row(vec!["Total time".to_string(), output::duration(m.total_duration)]);
    }
    table.add_row(vec!["Top modality".to_string(), m.top_modality_label()]);
    let reschedule = match &m.reschedule_column {
        Some(column) => format!("Reschedule rate ({column})"),
        None => "Reschedule rate".to_string(),
    };
    table.add_row(vec![reschedule, m.reschedule_rate_label()]);
    table.add_row(vec!["Revenue".to_string(), format!("R$ {}", m.revenue.round_dp(2))]);
    table.add_row(vec!["Revenue / hour".to_string(), m.revenue_per_hour_label()]);
    if let Some(clients) = &m.clients {
        table.add_row(vec![
            "Clients".to_string(),
            format!("{} ({} installations)", clients.distinct, clients.installations),
        ]);
    }
    if let Some(kiosks) = m.kiosks {
        table.add_row(vec!["Kiosks".to_string(), kiosks.to_string()]);
    }
    if let Some(players) = m.players {
        table.add_row(vec!["Players".to_string(), players.to_string()]);
    }
    println!("{table}");

    let b = &report.breakdowns;
    print_counts("By modality", b.by_modality.as_deref());
    print_counts("By status", b.by_status.as_deref());
    print_counts("By technician", b.by_technician.as_deref());
    print_counts("By state", b.by_state.as_deref());
    if !b.by_month.is_empty() {
        print_counts("By month", Some(&b.by_month));
    }
    if let Some(hours) = &b.by_hour {
        if !hours.is_empty() {
            println!();
            println!("{}", "By start hour".bold());
            let mut table = output::create_table();
            table.set_header(vec!["Hour", "Installations"]);
            for h in hours {
                table.add_row(vec![format!("{:02}h", h.hour), h.count.to_string()]);
            }
            println!("{table}");
        }
    }
}

fn print_counts(title: &str, counts: Option<&[CategoryCount]>) {
    let Some(counts) = counts.filter(|c| !c.is_empty()) else {
        return;
    };
    println!();
    println!("{}", title.bold());
    let mut table = output::create_table();
    table.set_header(vec!["", "Installations"]);
    for c in counts {
        table.add_row(vec![c.label.clone(), c.count.to_string()]);
    }
    println!("{table}");
}
