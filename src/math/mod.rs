//! Mathematical utilities: residual statistics, least squares and bounded
//! minimisers.

pub mod golden;
pub mod ols;
pub mod simplex;
pub mod stats;

pub use golden::*;
pub use ols::*;
pub use simplex::*;
pub use stats::*;
