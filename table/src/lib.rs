#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Tabular plumbing around the resolution cascade: loading the source
//! dataset, joining resolution records back onto its rows, and counting
//! outcomes for the report.

/// Source dataset loading and distinct-name extraction.
pub mod dataset;

/// Annotation join, output writing, and the match-level summary.
pub mod annotate;

pub use annotate::{annotate, AnnotatedTable, MatchSummary, ANNOTATION_COLUMNS};
pub use dataset::{FoodTable, TableError};
