//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - validated rotation-curve records (`GalaxyCurve`, `CurvePoint`)
//! - model configuration (`ModelParameters`, `AccelerationLaw`, `FitMode`, `Objective`)
//! - fit outputs (`FitResult`, `FitStatus`)
//! - the universal constant `A0` and other defaults (`constants`)

pub mod constants;
pub mod types;

pub use constants::*;
pub use types::*;
