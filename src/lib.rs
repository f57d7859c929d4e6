//! `rnpd-curves` library crate.
//!
//! Monthly term structures of risk-neutral default probability (RNPD) per
//! credit-rank group, and nearest-curve classification of new observations.
//!
//! Data flows through the crate as:
//!
//! - `io` / `data`: CSV panels or a generated panel, split by month
//! - `store`: rolling per-(group, duration bucket) windows across months
//! - `aggregate`: window medians for the month being fitted
//! - `fit`: one joint constrained LP fit per month, and the classifier
//! - `registry`: per-month lifecycle (`empty → ingested → fitted`)
//!
//! The binary (`rnpd`) is a thin wrapper around this library so core logic is
//! testable without spawning processes.

pub mod aggregate;
pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod registry;
pub mod report;
pub mod store;
