#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Scientific-name resolution against the Open Tree of Life TNRS.
//!
//! The cascade queries the service up to three times per distinct name,
//! progressively relaxing the query (original, cleaned, genus-only) and
//! recording the provenance of every outcome.

/// Plain-string name normalization helpers.
pub mod name;

/// Wire types and HTTP client for the TNRS match endpoint.
pub mod client;

/// Per-name resolution records and match-level provenance labels.
pub mod record;

/// Resolver configuration with TOML loading.
pub mod config;

/// The three-stage resolution cascade.
pub mod cascade;

pub use cascade::{ResolutionOutcome, Resolver, StageReport};
pub use client::{
    BatchResponse, HttpMatchService, MatchCandidate, MatchService, NameResult,
    ScriptedMatchService, ServiceError, TaxonRecord,
};
pub use config::ResolverConfig;
pub use name::{clean_scientific_name, extract_genus};
pub use record::{MatchLevel, ResolutionRecord};
