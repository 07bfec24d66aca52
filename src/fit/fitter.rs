//! Per-galaxy mass-to-light fitting.
//!
//! Given a `GalaxyCurve` and `FitOptions` we:
//! - evaluate the caller's starting point
//! - evaluate a log-spaced M/L grid (parallel)
//! - refine around the best point (golden section in 1-D, bounded
//!   Nelder–Mead in 2-D)
//!
//! and return the best point found. Every step is deterministic: candidates
//! are compared by objective with ties broken by grid index, and a refinement
//! only replaces the incumbent if it does not make the objective worse. The
//! starting point is always a candidate, so a fit never ends worse than the
//! caller's parameters.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::{
    AccelerationLaw, CHI2_ERROR_FLOOR, FitMode, FitResult, FitStatus, GalaxyCurve, MIN_FIT_POINTS,
    ML_MAX_DEFAULT, ML_MIN_DEFAULT, ModelParameters, Objective,
};
use crate::error::ModelError;
use crate::fit::grid::{bracket, log_space, ml_grid};
use crate::math::{SimplexOptions, chi_squared, golden_section, nelder_mead, r_squared, rms};
use crate::models::predict_curve;

/// Fitting options for a single galaxy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitOptions {
    pub law: AccelerationLaw,
    pub mode: FitMode,
    pub objective: Objective,
    /// Starting parameters. For `FitMode::Fixed` these are the answer; `a0`
    /// is never changed by a fit.
    pub initial: ModelParameters,
    /// Lower M/L bound (> 0).
    pub ml_min: f64,
    /// Upper M/L bound.
    pub ml_max: f64,
    /// Grid points per free parameter.
    pub grid_steps: usize,
    /// Refinement iteration cap.
    pub max_iter: usize,
    /// Refinement tolerance on M/L (and on the objective for Nelder–Mead).
    pub tolerance: f64,
    /// Velocity error floor (km/s) for the chi-squared statistic.
    pub error_floor: f64,
    /// Minimum points required to fit (never below `MIN_FIT_POINTS`).
    pub min_points: usize,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            law: AccelerationLaw::GeometricBridge,
            mode: FitMode::DiskBulge,
            objective: Objective::Rms,
            initial: ModelParameters::default(),
            ml_min: ML_MIN_DEFAULT,
            ml_max: ML_MAX_DEFAULT,
            grid_steps: 25,
            max_iter: 800,
            tolerance: 1e-4,
            error_floor: CHI2_ERROR_FLOOR,
            min_points: MIN_FIT_POINTS,
        }
    }
}

impl FitOptions {
    /// Zero-parameter evaluation at `params` with `law`.
    pub fn fixed(law: AccelerationLaw, params: ModelParameters) -> Self {
        Self {
            law,
            mode: FitMode::Fixed,
            initial: params,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
struct Candidate {
    x: Vec<f64>,
    fx: f64,
}

#[derive(Debug, Clone)]
struct Search {
    best: Candidate,
    iterations: usize,
    converged: bool,
}

/// Fit one galaxy.
///
/// Errors are scoped to this galaxy: too few points, invalid parameters or
/// bounds. A refinement that hits its iteration cap is not an error; the
/// result is tagged `FitStatus::IterationCap`.
pub fn fit_galaxy(curve: &GalaxyCurve, opts: &FitOptions) -> Result<FitResult, ModelError> {
    let required = opts.min_points.max(MIN_FIT_POINTS);
    if curve.len() < required {
        return Err(ModelError::TooFewPoints {
            required,
            actual: curve.len(),
        });
    }
    opts.initial.validate()?;

    let (params, status, iterations) = match opts.mode {
        FitMode::Fixed => (opts.initial, FitStatus::Fixed, 0),
        mode => {
            let search = search(curve, opts)?;
            let params = params_for(mode, &opts.initial, &search.best.x);
            let status = if search.converged {
                FitStatus::Converged
            } else {
                FitStatus::IterationCap
            };
            (params, status, search.iterations)
        }
    };

    let predicted = predict_curve(curve, opts.law, &params)?;
    let v_obs = curve.v_obs();

    Ok(FitResult {
        law: opts.law,
        mode: opts.mode,
        ml_disk: params.ml_disk,
        ml_bul: params.ml_bul,
        rms: rms(v_obs, &predicted),
        chi2: chi_squared(v_obs, &predicted, curve.v_obs_err(), opts.error_floor),
        r_squared: r_squared(v_obs, &predicted),
        predicted_velocities: predicted,
        n_points: curve.len(),
        status,
        iterations,
    })
}

/// Map the free parameter vector to full model parameters.
fn params_for(mode: FitMode, initial: &ModelParameters, x: &[f64]) -> ModelParameters {
    match mode {
        FitMode::Fixed => *initial,
        FitMode::Disk => initial.with_ml(x[0], initial.ml_bul),
        FitMode::Shared => initial.with_ml(x[0], x[0]),
        FitMode::DiskBulge => initial.with_ml(x[0], x[1]),
    }
}

fn seed_for(mode: FitMode, initial: &ModelParameters) -> Vec<f64> {
    match mode {
        FitMode::Fixed => Vec::new(),
        FitMode::Disk | FitMode::Shared => vec![initial.ml_disk],
        FitMode::DiskBulge => vec![initial.ml_disk, initial.ml_bul],
    }
}

/// Objective value at free parameters `x`; `+inf` if the model cannot be
/// evaluated there.
fn objective(curve: &GalaxyCurve, opts: &FitOptions, x: &[f64]) -> f64 {
    let params = params_for(opts.mode, &opts.initial, x);
    let Ok(pred) = predict_curve(curve, opts.law, &params) else {
        return f64::INFINITY;
    };
    let value = match opts.objective {
        Objective::Rms => rms(curve.v_obs(), &pred),
        Objective::Chi2 => chi_squared(curve.v_obs(), &pred, curve.v_obs_err(), opts.error_floor),
    };
    if value.is_finite() { value } else { f64::INFINITY }
}

fn search(curve: &GalaxyCurve, opts: &FitOptions) -> Result<Search, ModelError> {
    let dims = opts.mode.free_params();
    let axis = log_space(opts.ml_min, opts.ml_max, opts.grid_steps)?;

    // The caller's starting point competes with the grid (clamped into bounds).
    let seed: Vec<f64> = seed_for(opts.mode, &opts.initial)
        .into_iter()
        .map(|v| v.clamp(opts.ml_min, opts.ml_max))
        .collect();
    let mut best = Candidate {
        fx: objective(curve, opts, &seed),
        x: seed,
    };

    // Evaluate each grid tuple independently (parallel).
    let grid = ml_grid(&axis, dims);
    let scores: Vec<f64> = grid.par_iter().map(|x| objective(curve, opts, x)).collect();

    // Deterministic selection: minimum objective, ties broken by grid index.
    let mut grid_best: Option<usize> = None;
    for (idx, &fx) in scores.iter().enumerate() {
        match grid_best {
            Some(b) if fx >= scores[b] => {}
            _ => grid_best = Some(idx),
        }
    }
    if let Some(idx) = grid_best {
        if scores[idx] < best.fx {
            best = Candidate {
                x: grid[idx].clone(),
                fx: scores[idx],
            };
        }
    }

    let (refined, iterations, converged) = if dims == 1 {
        let (lo, hi) = bracket(&axis, best.x[0]);
        let m = golden_section(
            |v| objective(curve, opts, &[v]),
            lo,
            hi,
            opts.tolerance,
            opts.max_iter,
        );
        (
            Candidate {
                x: vec![m.x],
                fx: m.fx,
            },
            m.iterations,
            m.converged,
        )
    } else {
        let ratio = (opts.ml_max / opts.ml_min).powf(1.0 / (opts.grid_steps as f64 - 1.0));
        let step: Vec<f64> = best
            .x
            .iter()
            .map(|v| (v * (ratio - 1.0)).max(10.0 * opts.tolerance))
            .collect();
        let simplex = SimplexOptions {
            lower: vec![opts.ml_min; dims],
            upper: vec![opts.ml_max; dims],
            step,
            x_tol: opts.tolerance,
            f_tol: opts.tolerance,
            max_iter: opts.max_iter,
        };
        let m = nelder_mead(|x| objective(curve, opts, x), &best.x, &simplex);
        (
            Candidate { x: m.x, fx: m.fx },
            m.iterations,
            m.converged,
        )
    };

    if refined.fx <= best.fx {
        best = refined;
    }

    Ok(Search {
        best,
        iterations,
        converged,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CurvePoint, GalaxyMeta, MorphologyGroup};
    use crate::models::predict_velocities;

    /// Galaxy whose observed curve is the bridge model at the given M/L.
    fn synthetic(name: &str, ml_disk: f64, ml_bul: f64, n: usize) -> GalaxyCurve {
        let radii: Vec<f64> = (1..=n).map(|i| 0.8 * i as f64).collect();
        let v_gas: Vec<f64> = radii.iter().map(|r| 12.0 + 1.5 * r).collect();
        let v_disk: Vec<f64> = radii.iter().map(|r| 110.0 * r / (r + 2.0) * (-r / 25.0).exp()).collect();
        let v_bul: Vec<f64> = radii.iter().map(|r| 60.0 * (-r / 1.5).exp()).collect();
        let params = ModelParameters::default().with_ml(ml_disk, ml_bul);
        let v_obs = predict_velocities(
            AccelerationLaw::GeometricBridge,
            &radii,
            &v_gas,
            &v_disk,
            &v_bul,
            &params,
        )
        .unwrap();
        let points: Vec<CurvePoint> = (0..n)
            .map(|i| CurvePoint {
                radius: radii[i],
                v_obs: v_obs[i],
                v_obs_err: 4.0,
                v_gas: v_gas[i],
                v_disk: v_disk[i],
                v_bul: v_bul[i],
            })
            .collect();
        GalaxyCurve::from_points(name, &points, GalaxyMeta::default()).unwrap()
    }

    /// Curve with a shape the model cannot match exactly.
    fn awkward(n: usize) -> GalaxyCurve {
        let points: Vec<CurvePoint> = (1..=n)
            .map(|i| {
                let r = i as f64;
                CurvePoint {
                    radius: r,
                    v_obs: 40.0 + 30.0 * (r / 3.0).sin().abs() + 2.0 * r,
                    v_obs_err: 3.0,
                    v_gas: 8.0 + r,
                    v_disk: 70.0 * (-r / 6.0).exp() + 10.0,
                    v_bul: if r < 3.0 { 30.0 } else { 5.0 },
                }
            })
            .collect();
        GalaxyCurve::from_points("awkward", &points, GalaxyMeta::default()).unwrap()
    }

    #[test]
    fn fixed_mode_uses_caller_parameters() {
        let curve = synthetic("G", 0.5, 0.7, 12);
        let opts = FitOptions::fixed(AccelerationLaw::GeometricBridge, ModelParameters::default());
        let fit = fit_galaxy(&curve, &opts).unwrap();
        assert_eq!(fit.status, FitStatus::Fixed);
        assert_eq!(fit.iterations, 0);
        assert_eq!((fit.ml_disk, fit.ml_bul), (0.5, 0.7));
        assert!(fit.rms < 1e-9, "rms={}", fit.rms);
        assert_eq!(fit.predicted_velocities.len(), curve.len());
    }

    #[test]
    fn disk_bulge_fit_recovers_injected_ml() {
        let curve = synthetic("G", 1.3, 0.4, 20);
        let fit = fit_galaxy(&curve, &FitOptions::default()).unwrap();
        assert!((fit.ml_disk - 1.3).abs() < 0.02, "ml_disk={}", fit.ml_disk);
        assert!((fit.ml_bul - 0.4).abs() < 0.05, "ml_bul={}", fit.ml_bul);
        assert!(fit.rms < 0.2, "rms={}", fit.rms);
        assert!(fit.r_squared.unwrap() > 0.999);
    }

    #[test]
    fn disk_fit_keeps_bulge_fixed() {
        let curve = synthetic("G", 0.9, 0.7, 15);
        let opts = FitOptions {
            mode: FitMode::Disk,
            ..FitOptions::default()
        };
        let fit = fit_galaxy(&curve, &opts).unwrap();
        assert_eq!(fit.ml_bul, 0.7);
        assert!((fit.ml_disk - 0.9).abs() < 1e-3, "ml_disk={}", fit.ml_disk);
        assert_eq!(fit.status, FitStatus::Converged);
    }

    #[test]
    fn shared_fit_ties_disk_and_bulge() {
        let curve = synthetic("G", 0.8, 0.8, 15);
        let opts = FitOptions {
            mode: FitMode::Shared,
            ..FitOptions::default()
        };
        let fit = fit_galaxy(&curve, &opts).unwrap();
        assert_eq!(fit.ml_disk, fit.ml_bul);
        assert!((fit.ml_disk - 0.8).abs() < 1e-3, "ml={}", fit.ml_disk);
    }

    #[test]
    fn fit_never_worse_than_default_parameters() {
        let fixed_opts = FitOptions::fixed(AccelerationLaw::GeometricBridge, ModelParameters::default());
        let curves = [
            awkward(3),
            awkward(9),
            awkward(30),
            synthetic("a", 2.5, 0.1, 5),
            synthetic("b", 0.2, 3.0, 8),
        ];
        for curve in &curves {
            let fixed = fit_galaxy(curve, &fixed_opts).unwrap();
            for mode in [FitMode::Disk, FitMode::DiskBulge] {
                let opts = FitOptions {
                    mode,
                    ..FitOptions::default()
                };
                let fit = fit_galaxy(curve, &opts).unwrap();
                assert!(
                    fit.rms <= fixed.rms,
                    "{} {:?}: fit rms {} > fixed rms {}",
                    curve.name(),
                    mode,
                    fit.rms,
                    fixed.rms
                );
                assert!(fit.ml_disk >= opts.ml_min && fit.ml_disk <= opts.ml_max);
                assert!(fit.ml_bul >= opts.ml_min && fit.ml_bul <= opts.ml_max);
            }
        }
    }

    #[test]
    fn fit_is_deterministic() {
        let curve = awkward(25);
        let a = fit_galaxy(&curve, &FitOptions::default()).unwrap();
        let b = fit_galaxy(&curve, &FitOptions::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn too_few_points_is_domain_error() {
        let curve = synthetic("tiny", 0.5, 0.7, 1);
        let err = fit_galaxy(&curve, &FitOptions::default()).unwrap_err();
        assert_eq!(err, ModelError::TooFewPoints { required: 2, actual: 1 });

        let curve = synthetic("small", 0.5, 0.7, 2);
        let opts = FitOptions {
            min_points: 3,
            ..FitOptions::default()
        };
        let err = fit_galaxy(&curve, &opts).unwrap_err();
        assert_eq!(err, ModelError::TooFewPoints { required: 3, actual: 2 });
    }

    #[test]
    fn flat_observed_curve_has_undefined_r_squared() {
        let points: Vec<CurvePoint> = (1..=5)
            .map(|i| CurvePoint {
                radius: i as f64,
                v_obs: 100.0,
                v_obs_err: 5.0,
                v_gas: 20.0,
                v_disk: 80.0,
                v_bul: 0.0,
            })
            .collect();
        let curve = GalaxyCurve::from_points("flat", &points, GalaxyMeta::default()).unwrap();
        assert_eq!(curve.morphology(), MorphologyGroup::Unclassified);
        let fit = fit_galaxy(&curve, &FitOptions::default()).unwrap();
        assert_eq!(fit.r_squared, None);
        assert!(fit.rms.is_finite());
    }

    #[test]
    fn iteration_cap_is_tagged_not_fatal() {
        let curve = awkward(20);
        let opts = FitOptions {
            max_iter: 1,
            tolerance: 1e-12,
            ..FitOptions::default()
        };
        let fit = fit_galaxy(&curve, &opts).unwrap();
        assert_eq!(fit.status, FitStatus::IterationCap);
        assert!(fit.is_capped());
        assert!(fit.rms.is_finite());
    }

    #[test]
    fn chi2_objective_runs() {
        let curve = synthetic("G", 0.6, 0.7, 10);
        let opts = FitOptions {
            objective: Objective::Chi2,
            ..FitOptions::default()
        };
        let fit = fit_galaxy(&curve, &opts).unwrap();
        assert!(fit.chi2 < 1e-2, "chi2={}", fit.chi2);
    }

    #[test]
    fn invalid_bounds_are_rejected() {
        let curve = synthetic("G", 0.5, 0.7, 10);
        let opts = FitOptions {
            ml_min: 0.0,
            ..FitOptions::default()
        };
        assert!(matches!(
            fit_galaxy(&curve, &opts),
            Err(ModelError::InvalidParameter { name: "ml_min", .. })
        ));
    }
}
