//! Input/output helpers.
//!
//! - SPARC / CSV ingest + validation (`ingest`)
//! - per-galaxy and per-radius CSV exports (`export`)
//! - JSON run summaries (`summary`)

pub mod export;
pub mod ingest;
pub mod summary;

pub use export::*;
pub use ingest::*;
pub use summary::*;
