//! Command-line parsing for the `gbridge` rotation-curve benchmark.
//!
//! Keeps **argument parsing** separate from dispatch (`app`) and from the
//! modeling/math code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{A0, AccelerationLaw, FitMode, ML_BUL_DEFAULT, ML_DISK_DEFAULT, ML_MAX_DEFAULT, ML_MIN_DEFAULT, Objective};
use crate::io::ingest::InputFormat;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "gbridge",
    version,
    about = "Geometric-bridge rotation-curve fitter and SPARC benchmark"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit every galaxy in a catalogue and print aggregate statistics.
    Benchmark(BenchArgs),
    /// Fit one galaxy and print its per-radius model trace.
    Galaxy(GalaxyArgs),
    /// Write a seeded synthetic catalogue in the CSV input format.
    Synth(SynthArgs),
    /// Check the analytic limits of the acceleration law.
    Limits(LimitsArgs),
    /// Score the surface-density exponent relation against fitted exponents.
    Density(DensityArgs),
}

/// Model and fitter options shared by `benchmark` and `galaxy`.
#[derive(Debug, Args, Clone)]
pub struct ModelArgs {
    /// Input format.
    #[arg(long, value_enum, default_value_t = InputFormat::Auto)]
    pub format: InputFormat,

    /// Acceleration law used for fitting.
    #[arg(long, value_enum, default_value_t = AccelerationLaw::GeometricBridge)]
    pub law: AccelerationLaw,

    /// Which mass-to-light ratios to fit.
    #[arg(long, value_enum, default_value_t = FitMode::DiskBulge)]
    pub mode: FitMode,

    /// Fit objective.
    #[arg(long, value_enum, default_value_t = Objective::Rms)]
    pub objective: Objective,

    /// Disk M/L (starting value; used as-is with `--mode fixed`).
    #[arg(long, default_value_t = ML_DISK_DEFAULT)]
    pub ml_disk: f64,

    /// Bulge M/L (starting value; used as-is with `--mode fixed` or `--mode disk`).
    #[arg(long, default_value_t = ML_BUL_DEFAULT)]
    pub ml_bul: f64,

    /// Lower M/L bound for fitting.
    #[arg(long, default_value_t = ML_MIN_DEFAULT)]
    pub ml_min: f64,

    /// Upper M/L bound for fitting.
    #[arg(long, default_value_t = ML_MAX_DEFAULT)]
    pub ml_max: f64,

    /// Acceleration scale a0 in (km/s)^2/kpc.
    #[arg(long, default_value_t = A0)]
    pub a0: f64,

    /// Grid points per free M/L.
    #[arg(long, default_value_t = 25)]
    pub grid_steps: usize,

    /// Refinement iteration cap.
    #[arg(long, default_value_t = 800)]
    pub max_iter: usize,

    /// Refinement tolerance.
    #[arg(long, default_value_t = 1e-4)]
    pub tolerance: f64,

    /// Skip galaxies with fewer usable points than this (never below 2).
    #[arg(long, default_value_t = 3)]
    pub min_points: usize,
}

/// Options for `gbridge benchmark`.
#[derive(Debug, Args, Clone)]
pub struct BenchArgs {
    /// SPARC mass-model table or CSV. Defaults to `$GBRIDGE_DATA` (also read
    /// from `.env`).
    pub file: Option<PathBuf>,

    #[command(flatten)]
    pub model: ModelArgs,

    /// rms thresholds (km/s) to count galaxies below; repeatable.
    #[arg(long = "threshold", default_values_t = [5.0, 10.0])]
    pub thresholds: Vec<f64>,

    /// R^2 threshold to count galaxies above.
    #[arg(long, default_value_t = 0.9)]
    pub r2_threshold: f64,

    /// Skip the Newtonian / RAR comparison fits.
    #[arg(long)]
    pub no_compare: bool,

    /// Show the N worst-fitting galaxies.
    #[arg(long, default_value_t = 10)]
    pub worst: usize,

    /// Export per-galaxy results to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export the full report to JSON.
    #[arg(long = "export-json")]
    pub export_json: Option<PathBuf>,
}

/// Options for `gbridge galaxy`.
#[derive(Debug, Args, Clone)]
pub struct GalaxyArgs {
    /// SPARC mass-model table or CSV.
    pub file: PathBuf,

    /// Galaxy name (e.g. NGC3198).
    pub name: String,

    #[command(flatten)]
    pub model: ModelArgs,

    /// Render an ASCII plot in the terminal (enabled by default).
    #[arg(long, default_value_t = true)]
    pub plot: bool,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,

    /// Export the per-radius trace to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export fit + trace to JSON.
    #[arg(long = "export-json")]
    pub export_json: Option<PathBuf>,
}

/// Options for `gbridge synth`.
#[derive(Debug, Args, Clone)]
pub struct SynthArgs {
    /// Output CSV path.
    pub out: PathBuf,

    /// Number of galaxies.
    #[arg(short = 'n', long, default_value_t = 50)]
    pub galaxies: usize,

    /// Minimum points per galaxy.
    #[arg(long, default_value_t = 8)]
    pub min_points: usize,

    /// Maximum points per galaxy.
    #[arg(long, default_value_t = 30)]
    pub max_points: usize,

    /// Velocity noise (km/s).
    #[arg(long, default_value_t = 3.0)]
    pub noise: f64,

    /// Lower bound of the injected disk M/L.
    #[arg(long, default_value_t = 0.3)]
    pub ml_disk_min: f64,

    /// Upper bound of the injected disk M/L.
    #[arg(long, default_value_t = 0.9)]
    pub ml_disk_max: f64,

    /// Fraction of galaxies with a bulge.
    #[arg(long, default_value_t = 0.3)]
    pub bulge_fraction: f64,

    /// Acceleration scale used to generate the curves.
    #[arg(long, default_value_t = A0)]
    pub a0: f64,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// Options for `gbridge limits`.
#[derive(Debug, Args, Clone)]
pub struct LimitsArgs {
    /// Acceleration scale to check.
    #[arg(long, default_value_t = A0)]
    pub a0: f64,
}

/// Options for `gbridge density`.
#[derive(Debug, Args, Clone)]
pub struct DensityArgs {
    /// CSV with columns galaxy, m_bar (M_sun), r_max (kpc), alpha.
    pub file: PathBuf,

    /// Per-galaxy rows to print (0 hides the table).
    #[arg(long, default_value_t = 20)]
    pub rows: usize,

    /// Export the scores and per-galaxy rows to JSON.
    #[arg(long = "export-json")]
    pub export_json: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_benchmark_flags() {
        let cli = Cli::parse_from([
            "gbridge",
            "benchmark",
            "data.txt",
            "--mode",
            "disk",
            "--law",
            "rar",
            "--threshold",
            "8",
            "--no-compare",
        ]);
        let Command::Benchmark(args) = cli.command else {
            panic!("expected benchmark");
        };
        assert_eq!(args.file, Some(PathBuf::from("data.txt")));
        assert_eq!(args.model.mode, FitMode::Disk);
        assert_eq!(args.model.law, AccelerationLaw::Rar);
        assert_eq!(args.thresholds, vec![8.0]);
        assert!(args.no_compare);
        assert_eq!(args.model.a0, A0);
    }

    #[test]
    fn benchmark_file_is_optional() {
        let cli = Cli::parse_from(["gbridge", "benchmark"]);
        let Command::Benchmark(args) = cli.command else {
            panic!("expected benchmark");
        };
        assert_eq!(args.file, None);
        assert_eq!(args.thresholds, vec![5.0, 10.0]);
        assert_eq!(args.model.mode, FitMode::DiskBulge);
    }

    #[test]
    fn parses_density_command() {
        let cli = Cli::parse_from(["gbridge", "density", "alpha.csv", "--rows", "5"]);
        let Command::Density(args) = cli.command else {
            panic!("expected density");
        };
        assert_eq!(args.file, PathBuf::from("alpha.csv"));
        assert_eq!(args.rows, 5);
        assert_eq!(args.export_json, None);
    }

    #[test]
    fn parses_galaxy_and_law_names() {
        let cli = Cli::parse_from([
            "gbridge", "galaxy", "sparc.txt", "NGC3198", "--law", "bridge", "--mode", "fixed", "--no-plot",
        ]);
        let Command::Galaxy(args) = cli.command else {
            panic!("expected galaxy");
        };
        assert_eq!(args.name, "NGC3198");
        assert_eq!(args.model.law, AccelerationLaw::GeometricBridge);
        assert_eq!(args.model.mode, FitMode::Fixed);
        assert!(args.no_plot);
    }
}
