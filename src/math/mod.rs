//! Mathematical utilities: power basis, evaluation grids and the linear program.

pub mod grid;
pub mod lp;
pub mod poly;

pub use grid::*;
pub use lp::*;
pub use poly::*;
