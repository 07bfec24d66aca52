//! Benchmark driver: fit every galaxy in parallel, fold into a report.

use rayon::prelude::*;

use crate::bench::relation::relation_points;
use crate::bench::report::{
    BenchmarkBuilder, BenchmarkConfig, BenchmarkReport, GalaxyFailure, GalaxyOutcome, GalaxyResult,
    LawRms,
};
use crate::domain::{AccelerationLaw, GalaxyCurve, ModelParameters};
use crate::error::ModelError;
use crate::fit::fit_galaxy;
use crate::math::{r_squared, rms};
use crate::models::{DensityEstimate, enclosed_mass, halo_boundary_radius, predict_curve, trace_curve};

/// Run the benchmark over `curves`.
///
/// A galaxy that fails (too few points, invalid data) is recorded in the
/// report's failure list; it never aborts the run.
pub fn run_benchmark(curves: &[GalaxyCurve], config: &BenchmarkConfig) -> BenchmarkReport {
    let outcomes: Vec<GalaxyOutcome> = curves
        .par_iter()
        .map(|curve| match evaluate_galaxy(curve, config) {
            Ok(outcome) => outcome,
            Err(error) => GalaxyOutcome::Failure(GalaxyFailure {
                name: curve.name().to_string(),
                error,
            }),
        })
        .collect();

    let mut builder = BenchmarkBuilder::new(config);
    for outcome in outcomes {
        builder.push(outcome);
    }
    builder.finish()
}

/// Fit one galaxy and collect everything the report needs from it.
pub fn evaluate_galaxy(
    curve: &GalaxyCurve,
    config: &BenchmarkConfig,
) -> Result<GalaxyOutcome, ModelError> {
    let opts = &config.fit;
    let fit = fit_galaxy(curve, opts)?;

    let fixed = law_rms(curve, opts.law, &opts.initial)?;
    let comparisons = if config.comparisons {
        AccelerationLaw::ALL
            .iter()
            .filter(|&&law| law != opts.law)
            .map(|&law| law_rms(curve, law, &opts.initial))
            .collect::<Result<Vec<_>, _>>()?
    } else {
        Vec::new()
    };

    let fitted = opts.initial.with_ml(fit.ml_disk, fit.ml_bul);
    let trace = trace_curve(curve, opts.law, &fitted)?;
    let relation = relation_points(curve.radii(), curve.v_obs(), &trace);

    let v_flat = curve.v_flat();
    let r_max = curve.r_max();
    let density = trace
        .v_bar
        .last()
        .and_then(|&v| DensityEstimate::new(enclosed_mass(v, r_max), r_max).ok());
    let result = GalaxyResult {
        name: curve.name().to_string(),
        hubble_type: curve.meta().hubble_type,
        group: curve.morphology(),
        n_points: curve.len(),
        r_max,
        v_flat,
        r_halo: halo_boundary_radius(v_flat, opts.initial.a0),
        fixed,
        fit,
        comparisons,
        density,
    };
    Ok(GalaxyOutcome::Success { result, relation })
}

fn law_rms(
    curve: &GalaxyCurve,
    law: AccelerationLaw,
    params: &ModelParameters,
) -> Result<LawRms, ModelError> {
    let pred = predict_curve(curve, law, params)?;
    Ok(LawRms {
        law,
        rms: rms(curve.v_obs(), &pred),
        r_squared: r_squared(curve.v_obs(), &pred),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CurvePoint, FitMode, GalaxyMeta, MorphologyGroup};
    use crate::fit::FitOptions;
    use crate::models::predict_velocities;

    fn galaxy(name: &str, n: usize, ml_disk: f64, hubble_type: Option<u8>) -> GalaxyCurve {
        let radii: Vec<f64> = (1..=n).map(|i| 0.7 * i as f64).collect();
        let v_gas: Vec<f64> = radii.iter().map(|r| 6.0 + 2.0 * r).collect();
        let v_disk: Vec<f64> = radii.iter().map(|r| 90.0 * r / (r + 1.5) * (-r / 30.0).exp()).collect();
        let v_bul = vec![0.0; n];
        let params = ModelParameters::default().with_ml(ml_disk, 0.7);
        let model = predict_velocities(
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
                // Small deterministic wiggle so fits are not exact.
                v_obs: model[i] + if i % 2 == 0 { 1.5 } else { -1.0 },
                v_obs_err: 3.0,
                v_gas: v_gas[i],
                v_disk: v_disk[i],
                v_bul: v_bul[i],
            })
            .collect();
        let meta = GalaxyMeta {
            distance_mpc: Some(10.0),
            hubble_type,
        };
        GalaxyCurve::from_points(name, &points, meta).unwrap()
    }

    fn config() -> BenchmarkConfig {
        BenchmarkConfig {
            fit: FitOptions {
                mode: FitMode::Disk,
                grid_steps: 15,
                ..FitOptions::default()
            },
            ..BenchmarkConfig::default()
        }
    }

    fn catalogue() -> Vec<GalaxyCurve> {
        (0..10)
            .map(|i| {
                let n = if i == 4 { 1 } else { 6 + i };
                let t = match i % 4 {
                    0 => Some(1),
                    1 => Some(5),
                    2 => Some(10),
                    _ => None,
                };
                galaxy(&format!("G{i:02}"), n, 0.3 + 0.1 * i as f64, t)
            })
            .collect()
    }

    #[test]
    fn isolates_partial_failures() {
        let report = run_benchmark(&catalogue(), &config());
        assert_eq!(report.n_success(), 9);
        assert_eq!(report.n_failed(), 1);
        assert_eq!(report.failures[0].name, "G04");
        assert!(matches!(
            report.failures[0].error,
            ModelError::TooFewPoints { actual: 1, .. }
        ));
        assert!(report.median_rms.unwrap() < 3.0);
        assert_eq!(report.rms_below.len(), 2);
        assert_eq!(report.rms_below[1].count, 9);
    }

    #[test]
    fn aggregation_is_order_independent() {
        let curves = catalogue();
        let forward = run_benchmark(&curves, &config());

        let mut shuffled = curves.clone();
        shuffled.reverse();
        shuffled.swap(0, 5);
        let permuted = run_benchmark(&shuffled, &config());

        assert_eq!(forward, permuted);
    }

    #[test]
    fn groups_and_comparisons() {
        let report = run_benchmark(&catalogue(), &config());

        let total: usize = report.groups.iter().map(|g| g.n_galaxies).sum();
        assert_eq!(total, report.n_success());
        let unclassified = report
            .groups
            .iter()
            .find(|g| g.group == MorphologyGroup::Unclassified)
            .unwrap();
        // G03 and G07 carry no Hubble type.
        assert_eq!(unclassified.n_galaxies, 2);

        let laws: Vec<AccelerationLaw> = report.comparisons.iter().map(|c| c.law).collect();
        assert_eq!(laws, vec![AccelerationLaw::Newtonian, AccelerationLaw::Rar]);

        // Without the missing-mass term the baryons undershoot the curve.
        let newton = report.comparisons[0].median_rms.unwrap();
        assert!(newton > report.median_rms.unwrap());

        for r in report.results.values() {
            assert!(r.fit.rms <= r.fixed.rms + 1e-12);
            assert!((r.r_halo - r.v_flat * r.v_flat / 3703.0).abs() < 1e-9);
        }
    }

    #[test]
    fn comparisons_can_be_disabled() {
        let cfg = BenchmarkConfig {
            comparisons: false,
            ..config()
        };
        let report = run_benchmark(&catalogue(), &cfg);
        assert!(report.comparisons.is_empty());
        assert!(report.results.values().all(|r| r.comparisons.is_empty()));
    }

    #[test]
    fn duplicate_names_are_failures() {
        let curves = vec![galaxy("A", 8, 0.5, Some(4)), galaxy("A", 9, 0.6, Some(4)), galaxy("B", 7, 0.4, None)];
        let report = run_benchmark(&curves, &config());
        assert_eq!(report.n_success(), 1);
        assert!(!report.results.contains_key("A"));
        assert_eq!(report.n_failed(), 2);
        for f in &report.failures {
            assert_eq!(f.error, ModelError::DuplicateGalaxy("A".into()));
        }
        let expected: usize = report.results.values().map(|r| r.n_points).sum();
        assert_eq!(report.relation.n_points, expected);
    }

    #[test]
    fn duplicate_resolution_ignores_input_order() {
        let a8 = galaxy("A", 8, 0.5, Some(4));
        let a9 = galaxy("A", 9, 0.6, Some(4));
        let c1 = galaxy("C", 1, 0.5, None);
        let c6 = galaxy("C", 6, 0.5, None);
        let b = galaxy("B", 7, 0.4, None);

        let forward = run_benchmark(&[a8.clone(), a9.clone(), c1.clone(), c6.clone(), b.clone()], &config());
        let swapped = run_benchmark(&[b, c6, a9, c1, a8], &config());

        assert_eq!(forward, swapped);
        assert_eq!(forward.median_rms, swapped.median_rms);
        // A clash between a success and a failure is still a clash.
        assert_eq!(forward.failures.iter().filter(|f| f.name == "C").count(), 2);
        assert_eq!(forward.n_success(), 1);
    }

    #[test]
    fn failures_sort_by_name_then_error() {
        let cfg = config();
        let mut builder = BenchmarkBuilder::new(&cfg);
        builder.push_failure("Z".into(), ModelError::EmptyCurve);
        builder.push_failure("M".into(), ModelError::TooFewPoints { required: 3, actual: 1 });
        builder.push_failure("M2".into(), ModelError::EmptyCurve);
        let report = builder.finish();
        let names: Vec<&str> = report.failures.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["M", "M2", "Z"]);
    }

    #[test]
    fn pooled_relation_is_populated() {
        let report = run_benchmark(&catalogue(), &config());
        let expected: usize = report.results.values().map(|r| r.n_points).sum();
        assert_eq!(report.relation.n_points, expected);
        assert!(report.relation.pearson_r.unwrap() > 0.8);
        assert!(report.relation.scatter_dex.unwrap() < 0.1);
    }

    #[test]
    fn density_phases_cover_every_result() {
        let report = run_benchmark(&catalogue(), &config());
        assert_eq!(report.n_density_undefined, 0);
        let total: usize = report.phases.iter().map(|p| p.n_galaxies).sum();
        assert_eq!(total, report.n_success());
        for r in report.results.values() {
            let d = r.density.unwrap();
            assert_eq!(d.phase, crate::models::DensityPhase::from_sigma(d.sigma));
            let expected = crate::models::surface_density(d.m_bar, r.r_max).unwrap();
            assert!((d.sigma - expected).abs() <= 1e-12 * expected);
        }
    }

    #[test]
    fn empty_input_gives_empty_report() {
        let report = run_benchmark(&[], &config());
        assert_eq!(report.n_total(), 0);
        assert_eq!(report.median_rms, None);
        assert!(report.groups.is_empty());
        assert!(report.phases.is_empty());
    }
}
