//! Mass-to-light grid generation.
//!
//! The fitter starts from a deterministic grid over the M/L bounds before
//! refining locally. Grids are log-spaced: M/L ratios are scale parameters and
//! the interesting range (≈0.1–2) sits near the lower bound.

use crate::error::ModelError;

/// Generate `steps` log-spaced points between `min` and `max` (inclusive).
pub fn log_space(min: f64, max: f64, steps: usize) -> Result<Vec<f64>, ModelError> {
    if !(min.is_finite() && min > 0.0) {
        return Err(ModelError::InvalidParameter {
            name: "ml_min",
            value: min,
        });
    }
    if !(max.is_finite() && max > min) {
        return Err(ModelError::InvalidParameter {
            name: "ml_max",
            value: max,
        });
    }
    if steps < 2 {
        return Err(ModelError::InvalidParameter {
            name: "grid_steps",
            value: steps as f64,
        });
    }

    let ln_min = min.ln();
    let ln_max = max.ln();
    let step = (ln_max - ln_min) / (steps as f64 - 1.0);

    let mut out = Vec::with_capacity(steps);
    for i in 0..steps {
        out.push((ln_min + step * i as f64).exp());
    }
    // Pin the endpoints exactly so bounds are honoured bit-for-bit.
    out[0] = min;
    out[steps - 1] = max;
    Ok(out)
}

/// Cartesian grid of `dims`-tuples over the same 1-D axis.
///
/// `dims = 0` yields a single empty tuple.
pub fn ml_grid(axis: &[f64], dims: usize) -> Vec<Vec<f64>> {
    let mut out: Vec<Vec<f64>> = vec![Vec::new()];
    for _ in 0..dims {
        let mut next = Vec::with_capacity(out.len() * axis.len());
        for prefix in &out {
            for &v in axis {
                let mut tuple = prefix.clone();
                tuple.push(v);
                next.push(tuple);
            }
        }
        out = next;
    }
    out
}

/// Nearest grid neighbours strictly below / above `x`, falling back to the
/// axis bounds. Used to bracket a 1-D refinement.
pub fn bracket(axis: &[f64], x: f64) -> (f64, f64) {
    let lo = axis
        .iter()
        .copied()
        .filter(|&v| v < x)
        .fold(axis[0], f64::max);
    let hi = axis
        .iter()
        .copied()
        .filter(|&v| v > x)
        .fold(axis[axis.len() - 1], f64::min);
    (lo, hi)
}
