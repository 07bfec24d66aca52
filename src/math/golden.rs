//! Golden-section search for bounded 1-D minimisation.

/// Result of a scalar minimisation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalarMinimum {
    pub x: f64,
    pub fx: f64,
    pub iterations: usize,
    /// True if the bracket shrank below `tol` before `max_iter` was reached.
    pub converged: bool,
}

/// Minimise `f` on `[lo, hi]` by golden-section search.
///
/// Assumes `f` is unimodal on the bracket (callers bracket around a grid
/// minimum). Non-finite objective values should be mapped to `+inf` by the
/// caller.
pub fn golden_section<F>(f: F, lo: f64, hi: f64, tol: f64, max_iter: usize) -> ScalarMinimum
where
    F: Fn(f64) -> f64,
{
    let inv_phi = (5.0_f64.sqrt() - 1.0) / 2.0;
    let tol = tol.max(f64::EPSILON);

    let (mut a, mut b) = if lo <= hi { (lo, hi) } else { (hi, lo) };
    let mut c = b - inv_phi * (b - a);
    let mut d = a + inv_phi * (b - a);
    let mut fc = f(c);
    let mut fd = f(d);

    let mut iterations = 0;
    while (b - a) > tol && iterations < max_iter {
        iterations += 1;
        if fc <= fd {
            b = d;
            d = c;
            fd = fc;
            c = b - inv_phi * (b - a);
            fc = f(c);
        } else {
            a = c;
            c = d;
            fc = fd;
            d = a + inv_phi * (b - a);
            fd = f(d);
        }
    }

    let (x, fx) = if fc <= fd { (c, fc) } else { (d, fd) };
    ScalarMinimum {
        x,
        fx,
        iterations,
        converged: (b - a) <= tol,
    }
}
