//! Column contract
//!
//! Sheets are maintained by hand, so the same field shows up under slightly
//! different headers ("Técnico", "Tecnico", "Técnicos"). Each [`Field`] owns a
//! prioritized alias list; resolving a field against a header row yields a
//! [`ColumnRef`] that the rest of the pipeline uses instead of header strings.

use serde::{Deserialize, Serialize};

/// Canonical fields the pipeline knows how to interpret
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Date,
    StartTime,
    EndTime,
    Duration,
    Modality,
    Technician,
    Consultant,
    Client,
    State,
    Status,
    City,
    Amount,
    Plan,
    RescheduleReason,
    KioskCount,
    PlayerCount,
}

impl Field {
    pub const ALL: [Field; 16] = [
        Field::Date,
        Field::StartTime,
        Field::EndTime,
        Field::Duration,
        Field::Modality,
        Field::Technician,
        Field::Consultant,
        Field::Client,
        Field::State,
        Field::Status,
        Field::City,
        Field::Amount,
        Field::Plan,
        Field::RescheduleReason,
        Field::KioskCount,
        Field::PlayerCount,
    ];

    /// Header names in priority order; the first one is the canonical name
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Field::Date => &["Data", "Data Agendada", "Data agendada"],
            Field::StartTime => &["Início", "Hora início", "Hora Inicio", "Inicio"],
            Field::EndTime => &["Término", "Hora término", "Hora Termino", "Termino", "Fim"],
            Field::Duration => &["Duração", "Duracao"],
            Field::Modality => &["Modalidade"],
            Field::Technician => &["Técnico", "Tecnico", "Técnicos", "Tecnicos"],
            Field::Consultant => &["Consultor", "Consultores", "Consultor(a)"],
            Field::Client => &["Cliente", "Clientes"],
            Field::State => &["UF", "Estado"],
            Field::Status => &[
                "Status",
                "Status da Instalação",
                "Status Instalação",
                "Situacao",
                "Situação",
            ],
            Field::City => &["Cidade"],
            Field::Amount => &["Valor", "Valor (R$)", "Valor Total"],
            Field::Plan => &["Plano"],
            Field::RescheduleReason => &[
                "Motivo Reagendamento",
                "Motivo do Reagendamento",
                "Motivo do reagendamento",
            ],
            Field::KioskCount => &["Quantidade Quiosque", "Quantidade Quiosques"],
            Field::PlayerCount => &["Quantidade Players", "Quantidade Player"],
        }
    }

    /// Canonical header name (first alias)
    pub fn canonical(&self) -> &'static str {
        self.aliases()[0]
    }

    /// Stable identifier used in config files and JSON output
    pub fn key(&self) -> &'static str {
        match self {
            Field::Date => "date",
            Field::StartTime => "start_time",
            Field::EndTime => "end_time",
            Field::Duration => "duration",
            Field::Modality => "modality",
            Field::Technician => "technician",
            Field::Consultant => "consultant",
            Field::Client => "client",
            Field::State => "state",
            Field::Status => "status",
            Field::City => "city",
            Field::Amount => "amount",
            Field::Plan => "plan",
            Field::RescheduleReason => "reschedule_reason",
            Field::KioskCount => "kiosk_count",
            Field::PlayerCount => "player_count",
        }
    }

    pub fn from_key(key: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.key() == key)
    }

    /// Field whose alias list contains this (normalized) header name
    pub fn for_header(name: &str) -> Option<Field> {
        let name = normalize_header(name);
        Field::ALL
            .into_iter()
            .find(|f| f.aliases().iter().any(|a| *a == name))
    }

    /// First header (by alias priority) present in `headers`
    pub fn resolve(&self, headers: &[String]) -> Option<ColumnRef> {
        self.aliases().iter().find_map(|alias| {
            headers
                .iter()
                .position(|h| h == alias)
                .map(|index| ColumnRef::new(index, *alias))
        })
    }
}

/// A resolved column: position in the header row plus the header text
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ColumnRef {
    pub index: usize,
    pub name: String,
}

impl ColumnRef {
    pub fn new(index: usize, name: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
        }
    }
}

/// Trim a header cell, including non-breaking spaces, and collapse inner runs
/// of whitespace to a single space
pub fn normalize_header(raw: &str) -> String {
    raw.split(|c: char| c.is_whitespace())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalize a raw header row and drop trailing empty cells
pub fn normalize_headers(raw: &[String]) -> Vec<String> {
    let mut headers: Vec<String> = raw.iter().map(|h| normalize_header(h)).collect();
    while headers.last().is_some_and(|h| h.is_empty()) {
        headers.pop();
    }
    headers
}
