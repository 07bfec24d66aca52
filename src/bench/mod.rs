//! Catalogue-wide benchmark.
//!
//! - `runner`: parallel per-galaxy evaluation
//! - `report`: builder and immutable report
//! - `relation`: pooled acceleration-relation statistics
//! - `density`: surface-density exponent validation

pub mod density;
pub mod relation;
pub mod report;
pub mod runner;

pub use density::*;
pub use relation::*;
pub use report::*;
pub use runner::*;
