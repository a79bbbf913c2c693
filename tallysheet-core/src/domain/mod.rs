//! Core domain types
//!
//! Cell parsers, the column contract, datasets, filter values, metrics and
//! the new-record form. Pure data and logic, no I/O.

pub mod columns;
mod dataset;
mod filter;
mod metrics;
pub mod parse;
mod record;
pub mod result;

pub use columns::{ColumnRef, Field};
pub use dataset::{is_blank, Dataset, RawRow};
pub use filter::{FilterSpec, Period, ViewState};
pub use metrics::{Breakdowns, CategoryCount, ClientSummary, DayCount, HourCount, Metrics};
pub use record::{Choices, RecordDraft, WriteRecord};
