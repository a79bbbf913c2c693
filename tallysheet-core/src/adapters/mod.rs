//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - Google Sheets REST client for SheetSource
//! - CSV file for SheetSource (offline sheets, demo mode)
//! - In-memory sheet for tests and embedding
//! - Demo data generator

pub mod csv_file;
pub mod demo;
pub mod google_sheets;
pub mod memory;

#[cfg(test)]
pub mod google_sheets_mock;
