//! Reference data and mock catalogues.
//!
//! - `morphology`: SPARC Hubble-type table
//! - `synthetic`: seeded mock rotation curves

pub mod morphology;
pub mod synthetic;

pub use morphology::*;
pub use synthetic::*;
