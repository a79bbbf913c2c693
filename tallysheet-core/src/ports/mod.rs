//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The pipeline
//! depends only on these traits, not on concrete implementations.

mod sheet_source;

pub use sheet_source::{SheetSource, ValueInputMode};
