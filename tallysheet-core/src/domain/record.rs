//! New-record form and its validated output

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveTime};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::columns::Field;
use super::parse::{format_duration, parse_duration, parse_money};
use super::result::{Error, Result};

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})$").expect("valid regex"));
static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2}):(\d{2})$").expect("valid regex"));
static AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:R\$\s*)?\d+(?:\.\d{3})*(?:,\d{1,2})?$").expect("valid regex")
});
static STATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]{2}$").expect("valid regex"));

/// Header → value mapping handed to the row writer
///
/// Keys are header names; the writer lines them up against the live header
/// row, dropping keys the sheet does not have.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteRecord(BTreeMap<String, String>);

impl WriteRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for WriteRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Allowed values for the enumerated fields, keyed by [`Field::key`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choices(BTreeMap<String, Vec<String>>);

impl Default for Choices {
    fn default() -> Self {
        let mut choices = BTreeMap::new();
        choices.insert(
            Field::Modality.key().to_string(),
            vec!["Presencial".to_string(), "Remoto".to_string()],
        );
        choices.insert(
            Field::Status.key().to_string(),
            ["Concluída", "Agendada", "Reagendada", "Cancelada"]
                .into_iter()
                .map(String::from)
                .collect(),
        );
        Self(choices)
    }
}

impl Choices {
    /// Allowed values for a field, or `None` when it is free text
    pub fn for_field(&self, field: Field) -> Option<&[String]> {
        self.0
            .get(field.key())
            .map(Vec::as_slice)
            .filter(|values| !values.is_empty())
    }

    /// Override the allowed values of fields; configured entries win
    ///
    /// Overrides may be keyed by field key (`modality`) or by header name
    /// (`Modalidade`).
    pub fn merged(mut self, overrides: &BTreeMap<String, Vec<String>>) -> Self {
        for (key, values) in overrides {
            let key = Field::from_key(key)
                .or_else(|| Field::for_header(key))
                .map_or_else(|| key.clone(), |f| f.key().to_string());
            self.0.insert(key, values.clone());
        }
        self
    }

    /// Configured spelling of `value`, matched case-insensitively
    fn canonical(&self, field: Field, value: &str) -> Option<String> {
        match self.for_field(field) {
            Some(allowed) => allowed
                .iter()
                .find(|a| a.to_lowercase() == value.to_lowercase())
                .cloned(),
            None => Some(value.to_string()),
        }
    }
}

/// Free-form input for one new installation
///
/// Every field is optional text as typed by the user; [`RecordDraft::validate`]
/// checks the whole draft at once and either returns a [`WriteRecord`] or all
/// of the problems found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordDraft {
    pub date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub duration: Option<String>,
    pub modality: Option<String>,
    pub technician: Option<String>,
    pub consultant: Option<String>,
    pub client: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub status: Option<String>,
    pub amount: Option<String>,
    pub plan: Option<String>,
    pub reschedule_reason: Option<String>,
    pub kiosk_count: Option<String>,
    pub player_count: Option<String>,
    /// Extra header → value pairs written as given
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

fn filled(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl RecordDraft {
    /// Raw text of a canonical field
    pub fn field(&self, field: Field) -> Option<&str> {
        let value = match field {
            Field::Date => &self.date,
            Field::StartTime => &self.start_time,
            Field::EndTime => &self.end_time,
            Field::Duration => &self.duration,
            Field::Modality => &self.modality,
            Field::Technician => &self.technician,
            Field::Consultant => &self.consultant,
            Field::Client => &self.client,
            Field::State => &self.state,
            Field::Status => &self.status,
            Field::City => &self.city,
            Field::Amount => &self.amount,
            Field::Plan => &self.plan,
            Field::RescheduleReason => &self.reschedule_reason,
            Field::KioskCount => &self.kiosk_count,
            Field::PlayerCount => &self.player_count,
        };
        filled(value)
    }

    /// Whether `field` has a value, directly or through an extra pair
    pub fn is_given(&self, field: Field) -> bool {
        self.field(field).is_some()
            || self.extra.keys().any(|key| {
                let key = key.trim();
                Field::from_key(key).or_else(|| Field::for_header(key)) == Some(field)
            })
    }

    pub fn set_field(&mut self, field: Field, value: impl Into<String>) {
        let slot = match field {
            Field::Date => &mut self.date,
            Field::StartTime => &mut self.start_time,
            Field::EndTime => &mut self.end_time,
            Field::Duration => &mut self.duration,
            Field::Modality => &mut self.modality,
            Field::Technician => &mut self.technician,
            Field::Consultant => &mut self.consultant,
            Field::Client => &mut self.client,
            Field::State => &mut self.state,
            Field::Status => &mut self.status,
            Field::City => &mut self.city,
            Field::Amount => &mut self.amount,
            Field::Plan => &mut self.plan,
            Field::RescheduleReason => &mut self.reschedule_reason,
            Field::KioskCount => &mut self.kiosk_count,
            Field::PlayerCount => &mut self.player_count,
        };
        *slot = Some(value.into());
    }

    /// Move extra pairs that name a known field into that field's slot
    ///
    /// A pair that collides with a field already given is a problem, so
    /// `--set Data=...` can never replace a checked date.
    fn with_field_extras(&self, problems: &mut Vec<String>) -> RecordDraft {
        let mut draft = self.clone();
        draft.extra.clear();
        for (key, value) in &self.extra {
            let key = key.trim();
            let Some(field) = Field::from_key(key).or_else(|| Field::for_header(key)) else {
                draft.extra.insert(key.to_string(), value.clone());
                continue;
            };
            if draft.field(field).is_some() {
                problems.push(format!("{}: given twice (as '{key}')", field.canonical()));
            } else {
                draft.set_field(field, value.as_str());
            }
        }
        draft
    }

    /// Check every field and build the record to write
    ///
    /// Values are normalized on the way out: dates and times zero-padded,
    /// the state code uppercased, enumerated values in their configured
    /// spelling and amounts rendered with a decimal comma. A blank duration
    /// is derived from the time range when both times are valid.
    pub fn validate(&self, choices: &Choices) -> Result<WriteRecord> {
        let mut problems = Vec::new();
        let mut record = WriteRecord::new();
        let draft = self.with_field_extras(&mut problems);

        match draft.field(Field::Date) {
            None => problems.push(format!("{}: required", Field::Date.canonical())),
            Some(raw) => match validate_date(raw) {
                Some(date) => record.set(Field::Date.canonical(), date.format("%d/%m/%Y").to_string()),
                None => problems.push(format!(
                    "{}: expected DD/MM/YYYY, got '{raw}'",
                    Field::Date.canonical()
                )),
            },
        }

        let mut times = [None, None];
        for (slot, field) in [Field::StartTime, Field::EndTime].into_iter().enumerate() {
            let Some(raw) = draft.field(field) else { continue };
            match validate_time(raw) {
                Some(time) => {
                    record.set(field.canonical(), time.format("%H:%M").to_string());
                    times[slot] = Some(time);
                }
                None => problems.push(format!(
                    "{}: expected HH:MM (24h), got '{raw}'",
                    field.canonical()
                )),
            }
        }
        let range_minutes = match times {
            [Some(start), Some(end)] if end < start => {
                problems.push(format!(
                    "{}: ends before {}",
                    Field::EndTime.canonical(),
                    Field::StartTime.canonical()
                ));
                None
            }
            [Some(start), Some(end)] => Some((end - start).num_minutes() as f64),
            _ => None,
        };

        match draft.field(Field::Duration) {
            Some(raw) if parse_duration(raw).is_none() => problems.push(format!(
                "{}: no number of minutes in '{raw}'",
                Field::Duration.canonical()
            )),
            Some(raw) => record.set(Field::Duration.canonical(), raw),
            None => {
                if let Some(minutes) = range_minutes {
                    record.set(Field::Duration.canonical(), format_duration(Some(minutes)));
                }
            }
        }

        for field in [Field::Modality, Field::Status] {
            let Some(raw) = draft.field(field) else { continue };
            match choices.canonical(field, raw) {
                Some(value) => record.set(field.canonical(), value),
                None => problems.push(format!(
                    "{}: '{raw}' is not one of {}",
                    field.canonical(),
                    choices.for_field(field).unwrap_or_default().join(", ")
                )),
            }
        }

        if let Some(raw) = draft.field(Field::State) {
            if STATE_RE.is_match(raw) {
                record.set(Field::State.canonical(), raw.to_uppercase());
            } else {
                problems.push(format!(
                    "{}: expected a 2-letter code, got '{raw}'",
                    Field::State.canonical()
                ));
            }
        }

        if let Some(raw) = draft.field(Field::Amount) {
            match parse_money(raw).filter(|_| AMOUNT_RE.is_match(raw)) {
                Some(amount) => record.set(
                    Field::Amount.canonical(),
                    format!("{:.2}", amount).replace('.', ","),
                ),
                None => problems.push(format!(
                    "{}: expected an amount like 1.234,56, got '{raw}'",
                    Field::Amount.canonical()
                )),
            }
        }

        for field in [Field::KioskCount, Field::PlayerCount] {
            let Some(raw) = draft.field(field) else { continue };
            match raw.parse::<u32>() {
                Ok(count) => record.set(field.canonical(), count.to_string()),
                Err(_) => problems.push(format!(
                    "{}: expected a whole number, got '{raw}'",
                    field.canonical()
                )),
            }
        }

        for field in [
            Field::Technician,
            Field::Consultant,
            Field::Client,
            Field::City,
            Field::Plan,
            Field::RescheduleReason,
        ] {
            if let Some(raw) = draft.field(field) {
                record.set(field.canonical(), raw.split_whitespace().collect::<Vec<_>>().join(" "));
            }
        }

        for (key, value) in &draft.extra {
            let key = key.trim();
            if !key.is_empty() {
                record.set(key, value.trim());
            }
        }

        if problems.is_empty() {
            Ok(record)
        } else {
            Err(Error::InvalidRecord(problems))
        }
    }
}

fn validate_date(raw: &str) -> Option<NaiveDate> {
    let caps = DATE_RE.captures(raw)?;
    NaiveDate::from_ymd_opt(
        caps[3].parse().ok()?,
        caps[2].parse().ok()?,
        caps[1].parse().ok()?,
    )
}

fn validate_time(raw: &str) -> Option<NaiveTime> {
    let caps = TIME_RE.captures(raw)?;
    NaiveTime::from_hms_opt(caps[1].parse().ok()?, caps[2].parse().ok()?, 0)
}
