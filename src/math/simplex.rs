//! Bounded Nelder–Mead simplex minimisation.
//!
//! Box constraints are enforced by projecting every trial vertex onto the
//! bounds. Vertex ordering uses a stable sort on the objective, so results are
//! reproducible for identical inputs.

use nalgebra::DVector;

const REFLECT: f64 = 1.0;
const EXPAND: f64 = 2.0;
const CONTRACT: f64 = 0.5;
const SHRINK: f64 = 0.5;

/// Box constraints and stopping rules.
#[derive(Debug, Clone)]
pub struct SimplexOptions {
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
    /// Initial vertex offset along each axis.
    pub step: Vec<f64>,
    /// Stop when every vertex is within `x_tol` (max-norm) of the best one...
    pub x_tol: f64,
    /// ...and the objective spread is below `f_tol`.
    pub f_tol: f64,
    pub max_iter: usize,
}

/// Result of a simplex minimisation.
#[derive(Debug, Clone, PartialEq)]
pub struct SimplexMinimum {
    pub x: Vec<f64>,
    pub fx: f64,
    pub iterations: usize,
    pub converged: bool,
}

#[derive(Debug, Clone)]
struct Vertex {
    x: DVector<f64>,
    fx: f64,
}

/// Minimise `f` from `start` inside the box `[lower, upper]`.
///
/// # Panics
/// Panics if `start`, `lower`, `upper` and `step` do not share one length.
pub fn nelder_mead<F>(f: F, start: &[f64], opts: &SimplexOptions) -> SimplexMinimum
where
    F: Fn(&[f64]) -> f64,
{
    let n = start.len();
    assert!(
        opts.lower.len() == n && opts.upper.len() == n && opts.step.len() == n,
        "simplex dimension mismatch"
    );

    let project = |mut x: DVector<f64>| -> DVector<f64> {
        for i in 0..n {
            x[i] = x[i].clamp(opts.lower[i], opts.upper[i]);
        }
        x
    };
    let eval = |x: DVector<f64>| -> Vertex {
        let fx = f(x.as_slice());
        Vertex {
            fx: if fx.is_finite() { fx } else { f64::INFINITY },
            x,
        }
    };

    let x0 = project(DVector::from_column_slice(start));
    let mut simplex = Vec::with_capacity(n + 1);
    simplex.push(eval(x0.clone()));
    for i in 0..n {
        let mut xi = x0.clone();
        let step = opts.step[i];
        // Step inward if the forward vertex would sit on (or past) the bound.
        xi[i] = if x0[i] + step <= opts.upper[i] {
            x0[i] + step
        } else {
            x0[i] - step
        };
        simplex.push(eval(project(xi)));
    }

    let mut iterations = 0;
    let mut converged = false;
    loop {
        simplex.sort_by(|a, b| a.fx.total_cmp(&b.fx));

        let best = &simplex[0];
        let worst = &simplex[n];
        let f_spread = worst.fx - best.fx;
        let x_spread = simplex[1..]
            .iter()
            .map(|v| (&v.x - &best.x).amax())
            .fold(0.0, f64::max);
        if x_spread <= opts.x_tol && f_spread <= opts.f_tol {
            converged = true;
            break;
        }
        if iterations >= opts.max_iter {
            break;
        }
        iterations += 1;

        let mut centroid = DVector::<f64>::zeros(n);
        for v in &simplex[..n] {
            centroid += &v.x;
        }
        centroid /= n as f64;

        let worst_x = simplex[n].x.clone();
        let worst_f = simplex[n].fx;
        let second_worst_f = simplex[n - 1].fx;
        let best_f = simplex[0].fx;

        let reflected = eval(project(&centroid + (&centroid - &worst_x) * REFLECT));

        if reflected.fx < best_f {
            let expanded = eval(project(&centroid + (&reflected.x - &centroid) * EXPAND));
            simplex[n] = if expanded.fx < reflected.fx { expanded } else { reflected };
            continue;
        }
        if reflected.fx < second_worst_f {
            simplex[n] = reflected;
            continue;
        }

        let contracted = if reflected.fx < worst_f {
            eval(project(&centroid + (&reflected.x - &centroid) * CONTRACT))
        } else {
            eval(project(&centroid + (&worst_x - &centroid) * CONTRACT))
        };
        if contracted.fx < reflected.fx.min(worst_f) {
            simplex[n] = contracted;
            continue;
        }

        let best_x = simplex[0].x.clone();
        for v in simplex.iter_mut().skip(1) {
            let x = &best_x + (&v.x - &best_x) * SHRINK;
            *v = eval(project(x));
        }
    }

    simplex.sort_by(|a, b| a.fx.total_cmp(&b.fx));
    let best = &simplex[0];
    SimplexMinimum {
        x: best.x.iter().copied().collect(),
        fx: best.fx,
        iterations,
        converged,
    }
}
