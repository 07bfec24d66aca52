//! Mass-to-light fitting.
//!
//! Core pieces:
//! - `grid`: log-spaced M/L grids and 1-D brackets
//! - `fitter`: per-galaxy grid search plus local refinement

pub mod fitter;
pub mod grid;

pub use fitter::*;
pub use grid::*;
