//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - loads the catalogue
//! - runs the benchmark, a single-galaxy fit or the density check
//! - prints reports/plots
//! - writes optional exports

use std::path::PathBuf;

use clap::Parser;

use crate::bench::BenchmarkConfig;
use crate::cli::{BenchArgs, Command, DensityArgs, GalaxyArgs, LimitsArgs, ModelArgs, SynthArgs};
use crate::data::{SynthConfig, generate_catalogue, write_catalogue_csv};
use crate::error::AppError;
use crate::fit::FitOptions;
use crate::models::{check_limits, halo_boundary_radius};

pub mod pipeline;

/// Environment variable naming the default benchmark catalogue.
pub const DATA_ENV: &str = "GBRIDGE_DATA";

/// Row errors echoed to stderr before the rest are summarised.
const MAX_ROW_ERRORS: usize = 10;

/// Entry point for the `gbridge` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Benchmark(args) => handle_benchmark(args),
        Command::Galaxy(args) => handle_galaxy(args),
        Command::Synth(args) => handle_synth(args),
        Command::Limits(args) => handle_limits(args),
        Command::Density(args) => handle_density(args),
    }
}

fn handle_benchmark(args: BenchArgs) -> Result<(), AppError> {
    let path = resolve_data_path(args.file.clone())?;
    let config = benchmark_config_from_args(&args)?;

    let run = pipeline::run_benchmark_file(&path, args.model.format, &config)?;
    eprint!(
        "{}",
        crate::report::format_ingest_diagnostics(&run.ingest, MAX_ROW_ERRORS)
    );
    if run.report.n_capped > 0 {
        eprintln!(
            "Warning: {} fit(s) stopped at the iteration cap (--max-iter {}).",
            run.report.n_capped, config.fit.max_iter
        );
    }

    println!("{}", crate::report::format_benchmark_summary(&run.report, args.worst));

    if let Some(out) = &args.export {
        crate::io::export::write_benchmark_csv(out, &run.report)?;
        eprintln!("Wrote {}", out.display());
    }
    if let Some(out) = &args.export_json {
        crate::io::summary::write_benchmark_json(out, &path, &config, &run.report)?;
        eprintln!("Wrote {}", out.display());
    }

    Ok(())
}

fn handle_galaxy(args: GalaxyArgs) -> Result<(), AppError> {
    let opts = fit_options_from_args(&args.model)?;
    let run = pipeline::run_galaxy_file(&args.file, args.model.format, &args.name, &opts)?;
    let a0 = opts.initial.a0;
    if run.fit.is_capped() {
        eprintln!(
            "Warning: refinement stopped at the iteration cap (--max-iter {}).",
            opts.max_iter
        );
    }

    println!(
        "{}",
        crate::report::format_galaxy_summary(&run.curve, &run.fit, &run.trace, a0)
    );
    println!("{}", crate::report::format_law_comparison(&run.comparison));

    if args.plot && !args.no_plot {
        let r_halo = halo_boundary_radius(run.curve.v_flat(), a0);
        let plot = crate::plot::render_rotation_curve(&run.curve, &run.trace, Some(r_halo), args.width, args.height);
        println!("{plot}");
    }

    if let Some(out) = &args.export {
        crate::io::export::write_galaxy_csv(out, &run.curve, &run.fit, &run.trace, a0)?;
        eprintln!("Wrote {}", out.display());
    }
    if let Some(out) = &args.export_json {
        crate::io::summary::write_galaxy_json(
            out,
            &args.file,
            run.curve.name(),
            run.curve.meta(),
            &opts,
            &run.fit,
            &run.trace,
        )?;
        eprintln!("Wrote {}", out.display());
    }

    Ok(())
}

fn handle_synth(args: SynthArgs) -> Result<(), AppError> {
    let config = SynthConfig {
        n_galaxies: args.galaxies,
        min_points: args.min_points,
        max_points: args.max_points,
        noise_kms: args.noise,
        ml_disk_range: (args.ml_disk_min, args.ml_disk_max),
        bulge_fraction: args.bulge_fraction,
        a0: args.a0,
        seed: args.seed,
        ..SynthConfig::default()
    };
    let catalogue = generate_catalogue(&config)?;
    write_catalogue_csv(&args.out, &catalogue)?;

    let n_points: usize = catalogue.galaxies.iter().map(|g| g.len()).sum();
    println!(
        "Wrote {} galaxies ({n_points} points, seed {}) to {}",
        catalogue.galaxies.len(),
        config.seed,
        args.out.display()
    );
    Ok(())
}

fn handle_limits(args: LimitsArgs) -> Result<(), AppError> {
    if !(args.a0.is_finite() && args.a0 > 0.0) {
        return Err(AppError::new(2, format!("Invalid --a0: {} (must be > 0).", args.a0)));
    }
    let checks = check_limits(args.a0);
    println!("{}", crate::report::format_limits(&checks, args.a0));

    let failed = checks.iter().filter(|c| !c.passed()).count();
    if failed > 0 {
        return Err(AppError::new(4, format!("{failed} limit check(s) failed.")));
    }
    Ok(())
}

fn handle_density(args: DensityArgs) -> Result<(), AppError> {
    let run = pipeline::run_density_file(&args.file)?;
    let errors = &run.table.row_errors;
    for e in errors.iter().take(MAX_ROW_ERRORS) {
        eprintln!(
            "line {}{}: {}",
            e.line,
            e.id.as_deref().map(|id| format!(" ({id})")).unwrap_or_default(),
            e.message
        );
    }
    if errors.len() > MAX_ROW_ERRORS {
        eprintln!("... {} more row errors", errors.len() - MAX_ROW_ERRORS);
    }

    println!("{}", crate::report::format_density_validation(&run.validation, args.rows));

    if let Some(out) = &args.export_json {
        crate::io::summary::write_density_json(out, &args.file, &run.validation)?;
        eprintln!("Wrote {}", out.display());
    }
    Ok(())
}

/// Benchmark input: the positional argument, else `$GBRIDGE_DATA` (a `.env`
/// file in the working directory is honoured).
fn resolve_data_path(file: Option<PathBuf>) -> Result<PathBuf, AppError> {
    if let Some(path) = file {
        return Ok(path);
    }
    dotenvy::dotenv().ok();
    std::env::var(DATA_ENV)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| {
            AppError::new(
                2,
                format!("No input file given. Pass a SPARC table or CSV, or set {DATA_ENV}."),
            )
        })
}

pub fn fit_options_from_args(args: &ModelArgs) -> Result<FitOptions, AppError> {
    if !(args.a0.is_finite() && args.a0 > 0.0) {
        return Err(AppError::new(2, format!("Invalid --a0: {} (must be > 0).", args.a0)));
    }
    if !(args.ml_min > 0.0 && args.ml_max > args.ml_min) {
        return Err(AppError::new(
            2,
            format!(
                "Invalid M/L bounds: --ml-min {} --ml-max {} (need 0 < min < max).",
                args.ml_min, args.ml_max
            ),
        ));
    }
    if args.grid_steps < 2 {
        return Err(AppError::new(2, "--grid-steps must be at least 2."));
    }
    if args.max_iter == 0 {
        return Err(AppError::new(2, "--max-iter must be at least 1."));
    }
    if !(args.tolerance.is_finite() && args.tolerance > 0.0) {
        return Err(AppError::new(2, format!("Invalid --tolerance: {}.", args.tolerance)));
    }

    let initial = crate::domain::ModelParameters::new(args.a0, args.ml_disk, args.ml_bul)?;
    Ok(FitOptions {
        law: args.law,
        mode: args.mode,
        objective: args.objective,
        initial,
        ml_min: args.ml_min,
        ml_max: args.ml_max,
        grid_steps: args.grid_steps,
        max_iter: args.max_iter,
        tolerance: args.tolerance,
        min_points: args.min_points,
        ..FitOptions::default()
    })
}

pub fn benchmark_config_from_args(args: &BenchArgs) -> Result<BenchmarkConfig, AppError> {
    if let Some(t) = args.thresholds.iter().find(|t| !(t.is_finite() && **t > 0.0)) {
        return Err(AppError::new(2, format!("Invalid --threshold: {t} (must be > 0).")));
    }
    let mut rms_thresholds = args.thresholds.clone();
    rms_thresholds.sort_by(f64::total_cmp);
    rms_thresholds.dedup();

    Ok(BenchmarkConfig {
        fit: fit_options_from_args(&args.model)?,
        rms_thresholds,
        r2_threshold: args.r2_threshold,
        comparisons: !args.no_compare,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use crate::domain::{A0, FitMode};

    fn bench_args(argv: &[&str]) -> BenchArgs {
        let mut full = vec!["gbridge", "benchmark"];
        full.extend_from_slice(argv);
        match Cli::parse_from(full).command {
            Command::Benchmark(args) => args,
            _ => panic!("expected benchmark"),
        }
    }

    #[test]
    fn config_from_default_args_matches_default_config() {
        let config = benchmark_config_from_args(&bench_args(&["data.txt"])).unwrap();
        let default = BenchmarkConfig::default();
        assert_eq!(config.rms_thresholds, default.rms_thresholds);
        assert_eq!(config.r2_threshold, default.r2_threshold);
        assert_eq!(config.comparisons, default.comparisons);
        assert_eq!(config.fit.min_points, default.fit.min_points);
        assert_eq!(config.fit.mode, FitMode::DiskBulge);
        assert_eq!(config.fit.initial.a0, A0);
    }

    #[test]
    fn thresholds_are_sorted_and_deduplicated() {
        let config =
            benchmark_config_from_args(&bench_args(&["--threshold", "10", "--threshold", "5", "--threshold", "10"]))
                .unwrap();
        assert_eq!(config.rms_thresholds, vec![5.0, 10.0]);
    }

    #[test]
    fn invalid_model_args_are_usage_errors() {
        for argv in [
            &["--ml-min", "2", "--ml-max", "1"][..],
            &["--a0", "0"][..],
            &["--grid-steps", "1"][..],
            &["--ml-disk=-1"][..],
            &["--threshold", "0"][..],
        ] {
            let err = benchmark_config_from_args(&bench_args(argv)).unwrap_err();
            assert_eq!(err.exit_code(), 2, "{argv:?}");
        }
    }

    #[test]
    fn explicit_file_wins_over_environment() {
        let path = resolve_data_path(Some(PathBuf::from("given.txt"))).unwrap();
        assert_eq!(path, PathBuf::from("given.txt"));
    }
}
