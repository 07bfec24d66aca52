//! Error types.
//!
//! - `ModelError`: typed domain errors raised by the loader, model and fitter.
//!   These are always scoped to a single galaxy.
//! - `AppError`: what the binary reports, carrying a process exit code.
//!
//! Exit codes:
//! - 2: bad input, usage or I/O
//! - 3: no usable data
//! - 4: computation failure

use thiserror::Error;

/// Domain errors for a single galaxy evaluation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("curve has no data points")]
    EmptyCurve,

    #[error("sequence `{field}` has length {actual}, expected {expected}")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("radius at index {index} must be finite and > 0 (got {radius})")]
    NonPositiveRadius { index: usize, radius: f64 },

    #[error("radii must be strictly increasing (index {index}: {previous} -> {radius})")]
    NonIncreasingRadii {
        index: usize,
        previous: f64,
        radius: f64,
    },

    #[error("value `{field}` at index {index} is not finite")]
    NonFinite { field: &'static str, index: usize },

    #[error("velocity error at index {index} is negative ({value})")]
    NegativeError { index: usize, value: f64 },

    #[error("too few data points for a fit: {actual} < {required}")]
    TooFewPoints { required: usize, actual: usize },

    #[error("invalid parameter `{name}` = {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("duplicate galaxy name `{0}`")]
    DuplicateGalaxy(String),
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<ModelError> for AppError {
    fn from(err: ModelError) -> Self {
        let code = match err {
            ModelError::TooFewPoints { .. } | ModelError::EmptyCurve => 3,
            ModelError::InvalidParameter { .. } => 2,
            _ => 4,
        };
        AppError::new(code, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
