//! Filter selections as immutable values

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::result::Error;

/// Calendar window applied to a row's parsed date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Period {
    /// No date restriction
    #[default]
    All,
    ThisMonth,
    ThisYear,
    Custom { year: i32, month: u32 },
}

impl Period {
    /// Whether `date` falls inside this period relative to `today`
    ///
    /// Rows without a parsable date only pass [`Period::All`].
    pub fn contains(&self, date: Option<NaiveDate>, today: NaiveDate) -> bool {
        match (self, date) {
            (Period::All, _) => true,
            (_, None) => false,
            (Period::ThisMonth, Some(d)) => d.year() == today.year() && d.month() == today.month(),
            (Period::ThisYear, Some(d)) => d.year() == today.year(),
            (Period::Custom { year, month }, Some(d)) => d.year() == *year && d.month() == *month,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::All => write!(f, "all"),
            Period::ThisMonth => write!(f, "this-month"),
            Period::ThisYear => write!(f, "this-year"),
            Period::Custom { year, month } => write!(f, "{year:04}-{month:02}"),
        }
    }
}

impl FromStr for Period {
    type Err = Error;

    /// `all`, `this-month`, `this-year`, `YYYY-MM` or `MM/YYYY`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "all" | "" => return Ok(Period::All),
            "this-month" | "month" => return Ok(Period::ThisMonth),
            "this-year" | "year" => return Ok(Period::ThisYear),
            _ => {}
        }

        let (year, month) = match (s.split_once('-'), s.split_once('/')) {
            (Some((y, m)), _) => (y, m),
            (None, Some((m, y))) => (y, m),
            _ => return Err(Error::validation(format!("Unknown period '{s}'"))),
        };
        let year: i32 = year
            .parse()
            .map_err(|_| Error::validation(format!("Invalid year in period '{s}'")))?;
        let month: u32 = month
            .parse()
            .ok()
            .filter(|m| (1..=12).contains(m))
            .ok_or_else(|| Error::validation(format!("Invalid month in period '{s}'")))?;
        Ok(Period::Custom { year, month })
    }
}

/// Active period plus categorical restrictions
///
/// Keys are column names (or aliases of a known field); an empty value set
/// means the column is unrestricted. Values are stored trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilterSpec {
    pub period: Period,
    #[serde(default)]
    pub columns: BTreeMap<String, BTreeSet<String>>,
}

impl FilterSpec {
    pub fn new(period: Period) -> Self {
        Self {
            period,
            columns: BTreeMap::new(),
        }
    }

    /// Copy of this spec with another period
    pub fn with_period(&self, period: Period) -> Self {
        Self {
            period,
            columns: self.columns.clone(),
        }
    }

    /// Copy of this spec with `values` added to the accepted set of `column`
    pub fn with_values<I, S>(&self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut columns = self.columns.clone();
        let accepted = columns.entry(column.trim().to_string()).or_default();
        for value in values {
            let value = value.as_ref().trim();
            if !value.is_empty() {
                accepted.insert(value.to_string());
            }
        }
        Self {
            period: self.period,
            columns,
        }
    }

    /// Column restrictions that actually restrict something
    pub fn active_columns(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.columns
            .iter()
            .filter(|(_, values)| !values.is_empty())
            .map(|(name, values)| (name.as_str(), values))
    }

    /// True when nothing is filtered
    pub fn is_unrestricted(&self) -> bool {
        self.period == Period::All && self.active_columns().next().is_none()
    }
}

/// What the presentation layer hands back after each interaction
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ViewState {
    pub filter: FilterSpec,
    /// Columns to show in tables and exports; `None` shows all
    #[serde(default)]
    pub columns: Option<Vec<String>>,
}

impl ViewState {
    pub fn new(filter: FilterSpec) -> Self {
        Self {
            filter,
            columns: None,
        }
    }

    pub fn with_columns(self, columns: Vec<String>) -> Self {
        Self {
            columns: (!columns.is_empty()).then_some(columns),
            ..self
        }
    }
}
