//! JSON summaries.
//!
//! A summary is the portable record of a run:
//! - tool name + generation timestamp + input source
//! - the configuration that produced it
//! - the full report (benchmark), fit + trace (single galaxy) or the
//!   exponent scores (density)

use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::bench::{AlphaValidation, BenchmarkConfig, BenchmarkReport};
use crate::domain::{FitResult, GalaxyMeta};
use crate::error::AppError;
use crate::fit::FitOptions;
use crate::models::ModelTrace;

pub const TOOL_NAME: &str = "gbridge";

#[derive(Debug, Serialize)]
pub struct BenchmarkSummaryFile<'a> {
    pub tool: &'static str,
    pub generated_at: DateTime<Utc>,
    pub source: String,
    pub config: &'a BenchmarkConfig,
    pub report: &'a BenchmarkReport,
}

#[derive(Debug, Serialize)]
pub struct GalaxySummaryFile<'a> {
    pub tool: &'static str,
    pub generated_at: DateTime<Utc>,
    pub source: String,
    pub galaxy: &'a str,
    pub meta: &'a GalaxyMeta,
    pub options: &'a FitOptions,
    pub fit: &'a FitResult,
    pub trace: &'a ModelTrace,
}

#[derive(Debug, Serialize)]
pub struct DensitySummaryFile<'a> {
    pub tool: &'static str,
    pub generated_at: DateTime<Utc>,
    pub source: String,
    pub validation: &'a AlphaValidation,
}

/// Write a benchmark summary JSON file.
pub fn write_benchmark_json(
    path: &Path,
    source: &Path,
    config: &BenchmarkConfig,
    report: &BenchmarkReport,
) -> Result<(), AppError> {
    let summary = BenchmarkSummaryFile {
        tool: TOOL_NAME,
        generated_at: Utc::now(),
        source: source.display().to_string(),
        config,
        report,
    };
    write_json(path, &summary)
}

/// Write a single-galaxy summary JSON file.
pub fn write_galaxy_json(
    path: &Path,
    source: &Path,
    galaxy: &str,
    meta: &GalaxyMeta,
    options: &FitOptions,
    fit: &FitResult,
    trace: &ModelTrace,
) -> Result<(), AppError> {
    let summary = GalaxySummaryFile {
        tool: TOOL_NAME,
        generated_at: Utc::now(),
        source: source.display().to_string(),
        galaxy,
        meta,
        options,
        fit,
        trace,
    };
    write_json(path, &summary)
}

pub fn write_density_json(path: &Path, source: &Path, validation: &AlphaValidation) -> Result<(), AppError> {
    let summary = DensitySummaryFile {
        tool: TOOL_NAME,
        generated_at: Utc::now(),
        source: source.display().to_string(),
        validation,
    };
    write_json(path, &summary)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create summary JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, value)
        .map_err(|e| AppError::new(2, format!("Failed to write summary JSON: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bench::run_benchmark;
    use crate::data::{SynthConfig, generate_catalogue};

    #[test]
    fn benchmark_json_is_readable() {
        let cat = generate_catalogue(&SynthConfig {
            n_galaxies: 3,
            ..SynthConfig::default()
        })
        .unwrap();
        let config = BenchmarkConfig::default();
        let report = run_benchmark(&cat.galaxies, &config);

        let path = std::env::temp_dir().join(format!("gbridge_summary_{}.json", std::process::id()));
        write_benchmark_json(&path, Path::new("mock.csv"), &config, &report).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();

        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["tool"], "gbridge");
        assert_eq!(value["source"], "mock.csv");
        assert!(value["generated_at"].is_string());
        assert_eq!(value["report"]["law"], "geometric-bridge");
        assert_eq!(value["report"]["results"].as_object().unwrap().len(), 3);
        assert_eq!(value["config"]["rms_thresholds"][0], 5.0);
    }

    #[test]
    fn density_json_carries_scores_and_phases() {
        use crate::bench::{DensitySample, validate_alpha};

        let samples: Vec<DensitySample> = [1e8, 1e9, 1e10]
            .iter()
            .enumerate()
            .map(|(i, &m_bar)| DensitySample {
                name: format!("D{i}"),
                m_bar,
                r_max: 15.0,
                alpha_fitted: 1.0 + 0.2 * i as f64,
            })
            .collect();
        let validation = validate_alpha(&samples);

        let path = std::env::temp_dir().join(format!("gbridge_density_{}.json", std::process::id()));
        write_density_json(&path, Path::new("alpha.csv"), &validation).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();

        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["source"], "alpha.csv");
        assert_eq!(value["validation"]["linear"]["n"], 3);
        assert_eq!(value["validation"]["rows"].as_array().unwrap().len(), 3);
        assert!(value["validation"]["regression"]["line"]["slope"].is_number());
    }
}
