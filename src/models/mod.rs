//! Rotation-curve models.
//!
//! Models are small, pure functions so the fitter and the benchmark can stay
//! generic over the acceleration law.

pub mod bridge;
pub mod density;
pub mod law;
pub mod limits;

pub use bridge::*;
pub use density::*;
pub use law::*;
pub use limits::*;
