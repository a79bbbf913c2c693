//! Report KPIs and chart breakdowns

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use super::parse::{format_duration, PLACEHOLDER};

/// Scalar results over one filtered dataset
///
/// `None` means "undefined" and is rendered as a placeholder; it is never
/// folded into zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub total: usize,
    /// Mean of the parsable durations, in minutes
    pub mean_duration: Option<f64>,
    /// Sum of the parsable durations, in minutes
    pub total_duration: f64,
    pub top_modality: Option<String>,
    /// Share of rows flagged as rescheduled, 0.0 to 1.0
    pub reschedule_rate: Option<f64>,
    /// Column the reschedule rate was read from
    pub reschedule_column: Option<String>,
    pub revenue: Decimal,
    /// Revenue divided by total duration in hours
    pub revenue_per_hour: Option<Decimal>,
    pub clients: Option<ClientSummary>,
    pub kiosks: Option<f64>,
    pub players: Option<f64>,
}

impl Metrics {
    pub fn mean_duration_label(&self) -> String {
        format_duration(self.mean_duration)
    }

    pub fn reschedule_rate_label(&self) -> String {
        self.reschedule_rate
            .map(|rate| format!("{:.1}%", rate * 100.0))
            .unwrap_or_else(|| PLACEHOLDER.to_string())
    }

    pub fn top_modality_label(&self) -> String {
        self.top_modality
            .clone()
            .unwrap_or_else(|| PLACEHOLDER.to_string())
    }

    pub fn revenue_per_hour_label(&self) -> String {
        self.revenue_per_hour
            .map(|v| v.round_dp(2).to_string())
            .unwrap_or_else(|| PLACEHOLDER.to_string())
    }
}

/// Distinct canonical clients versus rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClientSummary {
    pub distinct: usize,
    pub installations: usize,
}

/// One bar of a category chart
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub label: String,
    pub count: usize,
}

impl CategoryCount {
    pub fn new(label: impl Into<String>, count: usize) -> Self {
        Self {
            label: label.into(),
            count,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayCount {
    pub date: NaiveDate,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HourCount {
    pub hour: u32,
    pub count: usize,
}

/// Category counts for the chart surfaces
///
/// A `None` category means the column is absent from the sheet, while an empty
/// list means the column exists but had nothing to count.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Breakdowns {
    pub by_modality: Option<Vec<CategoryCount>>,
    pub by_status: Option<Vec<CategoryCount>>,
    pub by_technician: Option<Vec<CategoryCount>>,
    pub by_state: Option<Vec<CategoryCount>>,
    /// Ascending by date
    pub by_day: Vec<DayCount>,
    /// `YYYY-MM` labels, most installations first; empty for a single month
    pub by_month: Vec<CategoryCount>,
    /// Ascending by hour
    pub by_hour: Option<Vec<HourCount>>,
}
