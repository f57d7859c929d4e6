//! Curve fitting and classification.
//!
//! Responsibilities:
//!
//! - assemble the month's constrained L1 regression as one linear program
//! - solve it and turn the solution into per-group curves
//! - map `(duration, rnpd)` pairs back to the closest rank-group curve

pub mod classify;
pub mod fitter;

pub use classify::*;
pub use fitter::*;
