//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the month key and per-security observations (`Month`, `Observation`, `InputRow`)
//! - per-month aggregates (`MonthlySummary`)
//! - store / fitter settings (`StoreConfig`, `FitterConfig`)

pub mod types;

pub use types::*;
