//! Shared pipeline steps used by the subcommands.
//!
//! `benchmark`: ingest -> fit every galaxy (parallel) -> aggregate
//! `galaxy`:    ingest -> look up one galaxy -> fit -> trace -> compare laws
//! `density`:   load fitted exponents -> score the density relation
//!
//! The dispatch layer only decides what to print and export.

use std::path::Path;

use crate::bench::{AlphaValidation, BenchmarkConfig, BenchmarkReport, run_benchmark, validate_alpha};
use crate::domain::{AccelerationLaw, FitResult, GalaxyCurve};
use crate::error::AppError;
use crate::fit::{FitOptions, fit_galaxy};
use crate::io::ingest::{DensityTable, IngestedData, InputFormat, load_density_samples, load_galaxies};
use crate::models::{ModelTrace, trace_curve};

/// Outputs of a `gbridge benchmark` run.
#[derive(Debug, Clone)]
pub struct BenchmarkRun {
    pub ingest: IngestedData,
    pub report: BenchmarkReport,
}

/// Outputs of a `gbridge galaxy` run.
#[derive(Debug, Clone)]
pub struct GalaxyRun {
    pub ingest: IngestedData,
    pub curve: GalaxyCurve,
    pub fit: FitResult,
    pub trace: ModelTrace,
    pub comparison: Vec<(AccelerationLaw, f64)>,
}

/// Outputs of a `gbridge density` run.
#[derive(Debug, Clone)]
pub struct DensityRun {
    pub table: DensityTable,
    pub validation: AlphaValidation,
}

/// Load a fitted-exponent table and score the density relation against it.
pub fn run_density_file(path: &Path) -> Result<DensityRun, AppError> {
    let table = load_density_samples(path)?;
    let validation = validate_alpha(&table.samples);
    if validation.rows.is_empty() {
        return Err(AppError::new(
            3,
            format!("No galaxy could be scored ({} rejected).", validation.rejected.len()),
        ));
    }
    Ok(DensityRun { table, validation })
}

/// Load a catalogue and benchmark every galaxy in it.
pub fn run_benchmark_file(path: &Path, format: InputFormat, config: &BenchmarkConfig) -> Result<BenchmarkRun, AppError> {
    let ingest = load_galaxies(path, format)?;
    let report = run_benchmark(&ingest.galaxies, config);
    if report.n_success() == 0 {
        return Err(AppError::new(
            3,
            format!("No galaxy could be fitted ({} failed).", report.n_failed()),
        ));
    }
    Ok(BenchmarkRun { ingest, report })
}

/// Load a catalogue and fit the galaxy called `name`.
pub fn run_galaxy_file(path: &Path, format: InputFormat, name: &str, opts: &FitOptions) -> Result<GalaxyRun, AppError> {
    let ingest = load_galaxies(path, format)?;
    let curve = ingest
        .galaxy(name)
        .cloned()
        .ok_or_else(|| AppError::new(2, format!("Galaxy '{name}' not found in '{}'.", path.display())))?;
    let (fit, trace, comparison) = fit_single(&curve, opts)?;
    Ok(GalaxyRun {
        ingest,
        curve,
        fit,
        trace,
        comparison,
    })
}

/// Fit one curve, trace the fitted model and compare the laws at the fitted M/L.
pub fn fit_single(
    curve: &GalaxyCurve,
    opts: &FitOptions,
) -> Result<(FitResult, ModelTrace, Vec<(AccelerationLaw, f64)>), AppError> {
    let fit = fit_galaxy(curve, opts)?;
    let params = opts.initial.with_ml(fit.ml_disk, fit.ml_bul);
    let trace = trace_curve(curve, fit.law, &params)?;
    let comparison = crate::report::compare_laws(curve, &fit, &opts.initial)?;
    Ok((fit, trace, comparison))
}
