//! Demo data
//!
//! Generates a realistic installation log for demo mode:
//! - one row per installation over the last 150 days, weekdays only
//! - a handful of blank gap rows, like a hand-edited sheet
//! - clients with numbered branches ("Padaria Central 02")

use std::path::Path;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use tracing::info;

use crate::domain::parse::format_duration;
use crate::domain::result::Result;
use crate::domain::Field;
use crate::services::export::write_grid;

/// File name of the demo workbook inside the tally directory
pub const DEMO_FILE: &str = "demo.csv";

const DAYS: i64 = 150;

const CLIENTS: [&str; 8] = [
    "Padaria Central",
    "Farmácia São José",
    "Mercado Bom Preço",
    "Clínica Vida",
    "Auto Peças Rocha",
    "Supermercado Real",
    "Ótica Visão",
    "Restaurante Sabor",
];

const CITIES: [(&str, &str); 6] = [
    ("São Paulo", "SP"),
    ("Campinas", "SP"),
    ("Rio de Janeiro", "RJ"),
    ("Belo Horizonte", "MG"),
    ("Curitiba", "PR"),
    ("Porto Alegre", "RS"),
];

const TECHNICIANS: [&str; 4] = ["Ana Souza", "Bruno Lima", "Carla Dias", "Diego Alves"];
const CONSULTANTS: [&str; 3] = ["Fernanda", "Gustavo", "Helena"];
const PLANS: [(&str, i64); 3] = [("Básico", 35000), ("Pro", 59000), ("Enterprise", 120000)];

/// Header row of the demo workbook
pub fn demo_headers() -> Vec<String> {
    [
        Field::Date,
        Field::StartTime,
        Field::EndTime,
        Field::Duration,
        Field::Modality,
        Field::Technician,
        Field::Consultant,
        Field::Client,
        Field::State,
        Field::City,
        Field::Status,
        Field::Plan,
        Field::Amount,
        Field::KioskCount,
        Field::PlayerCount,
        Field::RescheduleReason,
    ]
    .iter()
    .map(|f| f.canonical().to_string())
    .collect()
}

/// Generate the demo grid (header first) ending at `today`
///
/// Output is deterministic for a given `today`.
pub fn generate_demo_grid(today: NaiveDate) -> Vec<Vec<String>> {
    let mut grid = vec![demo_headers()];
    let start = today - Duration::days(DAYS - 1);
    let mut n: usize = 0;

    for offset in 0..DAYS {
        let date = start + Duration::days(offset);
        if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            continue;
        }
        // 1 to 3 installations per weekday
        let per_day = 1 + (date.ordinal() as usize * 7) % 3;
        for _ in 0..per_day {
            grid.push(demo_row(date, n));
            n += 1;
            if n % 37 == 0 {
                grid.push(vec![String::new(); grid[0].len()]);
            }
        }
    }
    grid
}

fn demo_row(date: NaiveDate, n: usize) -> Vec<String> {
    let client = CLIENTS[n % CLIENTS.len()];
    let branch = n % 4;
    let client = if branch == 0 {
        client.to_string()
    } else {
        format!("{client} {branch:02}")
    };
    let (city, state) = CITIES[(n * 5) % CITIES.len()];
    let (plan, cents) = PLANS[(n / 3) % PLANS.len()];

    let start_hour = 8 + (n * 3) % 9;
    let start_minute = if n % 2 == 0 { 0 } else { 30 };
    let minutes = 45 + ((n * 17) % 8) * 15;
    let end_total = start_hour * 60 + start_minute + minutes;
    let remote = n % 3 == 0;

    let status = match n % 11 {
        0 => "Reagendada",
        5 => "Cancelada",
        _ => "Concluída",
    };
    let reason = if status == "Reagendada" {
        "Cliente ausente"
    } else {
        ""
    };
    // Older sheets used free-text durations; keep a mix
    let duration = match n % 5 {
        0 => format!("{:02}:{:02}", minutes / 60, minutes % 60),
        1 => format!("{minutes}"),
        _ => format_duration(Some(minutes as f64)),
    };

    vec![
        date.format("%d/%m/%Y").to_string(),
        format!("{start_hour:02}:{start_minute:02}"),
        format!("{:02}:{:02}", end_total / 60, end_total % 60),
        duration,
        if remote { "Remoto" } else { "Presencial" }.to_string(),
        TECHNICIANS[n % TECHNICIANS.len()].to_string(),
        CONSULTANTS[(n / 2) % CONSULTANTS.len()].to_string(),
        client,
        state.to_string(),
        city.to_string(),
        status.to_string(),
        plan.to_string(),
        format_cents(cents),
        (1 + n % 3).to_string(),
        (n % 4).to_string(),
        reason.to_string(),
    ]
}

/// `35000` → `R$ 350,00`
fn format_cents(cents: i64) -> String {
    let reais = cents / 100;
    let mut grouped = String::new();
    let digits = reais.to_string();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    format!("R$ {},{:02}", grouped, cents % 100)
}

/// Write a fresh demo workbook to `path`
pub fn write_demo_csv(path: &Path, today: NaiveDate) -> Result<usize> {
    let grid = generate_demo_grid(today);
    let file = std::fs::File::create(path)?;
    write_grid(&grid, std::io::BufWriter::new(file))?;
    info!(path = %path.display(), rows = grid.len() - 1, "Wrote demo workbook");
    Ok(grid.len() - 1)
}
