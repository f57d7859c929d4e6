//! Fitted curve and per-month model types.
//!
//! Curves are plain coefficient vectors so the fitter, the classifier and the
//! exporters can share them without any solver state attached.

pub mod curve;

pub use curve::*;
