//! Least squares via SVD.
//!
//! Used for straight-line fits in log-acceleration space (e.g. the slope of
//! `log g_obs` against `log g_bar` in the deep regime, expected ≈ 0.5).
//!
//! Implementation choices:
//! - SVD handles tall design matrices (more rows than columns), which
//!   nalgebra's `QR::solve` does not.
//! - The design is tiny (2 columns), so SVD cost is irrelevant.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Result of an ordinary least squares line fit `y = intercept + slope * x`.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LineFit {
    pub intercept: f64,
    pub slope: f64,
    pub n: usize,
}

/// Fit a straight line through `(x, y)` pairs.
///
/// `None` for fewer than `min_points` pairs, mismatched lengths, non-finite
/// values, or a degenerate (constant-x) design.
pub fn fit_line(x: &[f64], y: &[f64], min_points: usize) -> Option<LineFit> {
    let n = x.len();
    if n != y.len() || n < min_points.max(2) {
        return None;
    }
    if x.iter().chain(y).any(|v| !v.is_finite()) {
        return None;
    }
    let x_min = x.iter().copied().fold(f64::INFINITY, f64::min);
    let x_max = x.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if x_max - x_min <= 0.0 {
        return None;
    }

    let mut design = DMatrix::<f64>::zeros(n, 2);
    for (i, &xi) in x.iter().enumerate() {
        design[(i, 0)] = 1.0;
        design[(i, 1)] = xi;
    }
    let obs = DVector::from_column_slice(y);

    let beta = solve_least_squares(&design, &obs)?;
    Some(LineFit {
        intercept: beta[0],
        slope: beta[1],
        n,
    })
}
