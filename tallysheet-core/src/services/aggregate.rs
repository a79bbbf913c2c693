//! Aggregator - report KPIs and chart breakdowns over a filtered Dataset

use std::collections::{BTreeMap, BTreeSet, HashMap};

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::domain::parse::{parse_count, parse_duration, parse_hour, parse_money};
use crate::domain::{
    Breakdowns, CategoryCount, ClientSummary, ColumnRef, Dataset, DayCount, Field, HourCount,
    Metrics,
};

/// Candidate columns for the reschedule rate, in priority order
pub const RESCHEDULE_CANDIDATES: [&str; 8] = [
    "Reagendamento",
    "Reagendado",
    "Reagendamentos",
    "Reagendar",
    "Status",
    "Motivo",
    "Observação",
    "Observacao",
];

const AFFIRMATIVE: [&str; 4] = ["sim", "yes", "true", "1"];

/// Whether a cell marks its row as rescheduled
pub fn is_rescheduled(value: &str) -> bool {
    let value = value.trim().to_lowercase();
    value.contains("reagend") || AFFIRMATIVE.contains(&value.as_str())
}

/// Counts of trimmed non-empty values, most frequent first
///
/// Equal counts keep the order in which values were first seen.
pub fn value_counts<'a>(values: impl Iterator<Item = &'a str>) -> Vec<CategoryCount> {
    let mut counts: Vec<CategoryCount> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for value in values.map(str::trim).filter(|v| !v.is_empty()) {
        match index.get(value) {
            Some(&i) => counts[i].count += 1,
            None => {
                index.insert(value.to_string(), counts.len());
                counts.push(CategoryCount::new(value, 1));
            }
        }
    }
    // stable sort keeps first-seen order among ties
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}

/// Computes metrics over datasets
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    reschedule_column: Option<String>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the reschedule rate from this column instead of guessing
    pub fn with_reschedule_column(mut self, column: Option<String>) -> Self {
        self.reschedule_column = column.filter(|c| !c.trim().is_empty());
        self
    }

    /// All KPIs at once
    pub fn metrics(&self, dataset: &Dataset) -> Metrics {
        let (mean_duration, total_duration) = self.durations(dataset);
        let revenue = self.revenue(dataset);
        let reschedule = self.reschedule_rate(dataset);

        Metrics {
            total: dataset.len(),
            mean_duration,
            total_duration,
            top_modality: dataset
                .resolve(Field::Modality)
                .and_then(|c| self.mode(dataset, &c)),
            reschedule_rate: reschedule.as_ref().map(|(rate, _)| *rate),
            reschedule_column: reschedule.map(|(_, column)| column.name),
            revenue,
            revenue_per_hour: revenue_per_hour(revenue, total_duration),
            clients: self.clients(dataset),
            kiosks: self.quantity(dataset, Field::KioskCount),
            players: self.quantity(dataset, Field::PlayerCount),
        }
    }

    /// Mean and sum of the parsable durations, in minutes
    ///
    /// The mean is `None` when no row has a parsable duration.
    pub fn durations(&self, dataset: &Dataset) -> (Option<f64>, f64) {
        let Some(column) = dataset.resolve(Field::Duration) else {
            return (None, 0.0);
        };
        let minutes: Vec<f64> = dataset
            .values(&column)
            .filter_map(parse_duration)
            .collect();
        let total: f64 = minutes.iter().sum();
        let mean = (!minutes.is_empty()).then(|| total / minutes.len() as f64);
        (mean, total)
    }

    /// Most frequent trimmed non-empty value of a column
    pub fn mode(&self, dataset: &Dataset, column: &ColumnRef) -> Option<String> {
        value_counts(dataset.values(column))
            .into_iter()
            .next()
            .map(|c| c.label)
    }

    /// Column the reschedule rate is read from
    pub fn reschedule_column(&self, dataset: &Dataset) -> Option<ColumnRef> {
        match &self.reschedule_column {
            Some(name) => dataset.column(name),
            None => RESCHEDULE_CANDIDATES
                .iter()
                .find_map(|name| dataset.column(name)),
        }
    }

    /// Share of rows flagged as rescheduled, with the column used
    pub fn reschedule_rate(&self, dataset: &Dataset) -> Option<(f64, ColumnRef)> {
        let column = self.reschedule_column(dataset)?;
        if dataset.is_empty() {
            return None;
        }
        let hits = dataset.values(&column).filter(|v| is_rescheduled(v)).count();
        debug!(column = column.name.as_str(), hits, rows = dataset.len(), "Reschedule rate");
        Some((hits as f64 / dataset.len() as f64, column))
    }

    /// Sum of the amount column; unparsable cells count as zero
    ///
    /// A total past the `Decimal` range stops at `Decimal::MAX` (or `MIN`).
    pub fn revenue(&self, dataset: &Dataset) -> Decimal {
        let Some(column) = dataset.resolve(Field::Amount) else {
            return Decimal::ZERO;
        };
        let mut total = Decimal::ZERO;
        for amount in dataset.values(&column).filter_map(parse_money) {
            match total.checked_add(amount) {
                Some(sum) => total = sum,
                None => {
                    warn!(column = column.name.as_str(), "Revenue total out of range");
                    return if amount.is_sign_negative() { Decimal::MIN } else { Decimal::MAX };
                }
            }
        }
        total
    }

    /// Distinct canonical clients and installation count
    pub fn clients(&self, dataset: &Dataset) -> Option<ClientSummary> {
        dataset.resolve(Field::Client)?;
        let distinct: BTreeSet<&str> = dataset
            .rows()
            .iter()
            .filter_map(|row| dataset.client_base(row))
            .filter(|name| !name.is_empty())
            .collect();
        Some(ClientSummary {
            distinct: distinct.len(),
            installations: dataset.len(),
        })
    }

    /// Sum of a quantity column, `None` when the sheet lacks it
    pub fn quantity(&self, dataset: &Dataset, field: Field) -> Option<f64> {
        let column = dataset.resolve(field)?;
        Some(dataset.values(&column).filter_map(parse_count).sum())
    }

    /// Category counts for the charts, each list capped at `top_n`
    pub fn breakdowns(&self, dataset: &Dataset, top_n: usize) -> Breakdowns {
        let top = |field: Field, upper: bool| {
            dataset.resolve(field).map(|column| {
                let mut counts = if upper {
                    let values: Vec<String> =
                        dataset.values(&column).map(|v| v.trim().to_uppercase()).collect();
                    value_counts(values.iter().map(String::as_str))
                } else {
                    value_counts(dataset.values(&column))
                };
                counts.truncate(top_n);
                counts
            })
        };

        let mut days: BTreeMap<chrono::NaiveDate, usize> = BTreeMap::new();
        for row in dataset.rows() {
            if let Some(date) = dataset.date(row) {
                *days.entry(date).or_default() += 1;
            }
        }

        let mut months: BTreeMap<String, usize> = BTreeMap::new();
        for (date, count) in &days {
            *months.entry(date.format("%Y-%m").to_string()).or_default() += count;
        }
        let mut by_month: Vec<CategoryCount> = if months.len() > 1 {
            months
                .into_iter()
                .map(|(label, count)| CategoryCount::new(label, count))
                .collect()
        } else {
            Vec::new()
        };
        by_month.sort_by(|a, b| b.count.cmp(&a.count));

        let by_hour = dataset.resolve(Field::StartTime).map(|column| {
            let mut hours: BTreeMap<u32, usize> = BTreeMap::new();
            for hour in dataset.values(&column).filter_map(parse_hour) {
                *hours.entry(hour).or_default() += 1;
            }
            hours
                .into_iter()
                .map(|(hour, count)| HourCount { hour, count })
                .collect()
        });

        Breakdowns {
            by_modality: top(Field::Modality, false),
            by_status: top(Field::Status, false),
            by_technician: top(Field::Technician, false),
            by_state: top(Field::State, true),
            by_day: days
                .into_iter()
                .map(|(date, count)| DayCount { date, count })
                .collect(),
            by_month,
            by_hour,
        }
    }
}

/// Revenue per hour of work, `None` when no time was recorded
pub fn revenue_per_hour(revenue: Decimal, total_minutes: f64) -> Option<Decimal> {
    if total_minutes <= 0.0 {
        return None;
    }
    let hours = Decimal::from_f64(total_minutes)?.checked_div(Decimal::from(60))?;
    revenue.checked_div(hours)
}
