//! Service layer - pipeline stages and their orchestration
//!
//! Each stage is usable on its own: the reader fetches, the filter engine
//! narrows, the aggregator computes, the writer writes back. The report and
//! record services tie them together for the CLI.

pub mod aggregate;
pub mod export;
pub mod filter;
pub mod reader;
mod report;
pub mod writer;

pub use aggregate::Aggregator;
pub use filter::FilterEngine;
pub use reader::SheetReader;
pub use report::{ColumnMapping, RecordService, Report, ReportService, RowsView};
pub use writer::{AppendOutcome, RowWriter};
