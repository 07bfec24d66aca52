//! CSV exports.
//!
//! - one row per galaxy for a benchmark run
//! - one row per radius for a single-galaxy fit
//!
//! Meant to be easy to load in spreadsheets or downstream scripts.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::bench::{BenchmarkReport, GalaxyResult};
use crate::data::morphology_label;
use crate::domain::{AccelerationLaw, FitResult, GalaxyCurve};
use crate::error::AppError;
use crate::models::ModelTrace;

const BENCHMARK_HEADER: &str = "galaxy,t,morph,group,n_points,r_max_kpc,r_halo_kpc,v_flat_kms,law,mode,ml_disk,ml_bul,\
rms_fixed,rms_fit,r2_fit,chi2_fit,status,rms_newtonian,rms_rar,sigma_msun_pc2,phase,alpha_refined";

const GALAXY_HEADER: &str = "r_kpc,v_obs,e_vobs,v_gas,v_disk,v_bul,v_bar,v_pred,residual,g_bar,g_obs,boost";

/// Write per-galaxy benchmark results to a CSV file.
pub fn write_benchmark_csv(path: &Path, report: &BenchmarkReport) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_benchmark_rows(BufWriter::new(file), report)
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV: {e}")))
}

/// Galaxy names come from user files and may contain commas or quotes, so
/// these rows go through `csv::Writer` for quoting.
fn write_benchmark_rows<W: Write>(out: W, report: &BenchmarkReport) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(BENCHMARK_HEADER.split(','))?;
    for r in report.results.values() {
        let f = &r.fit;
        writer.write_record([
            r.name.clone(),
            r.hubble_type.map(|t| t.to_string()).unwrap_or_default(),
            morphology_label(r.hubble_type).to_string(),
            r.group.label().to_string(),
            r.n_points.to_string(),
            format!("{:.4}", r.r_max),
            format!("{:.4}", r.r_halo),
            format!("{:.4}", r.v_flat),
            f.law.key().to_string(),
            f.mode.key().to_string(),
            format!("{:.6}", f.ml_disk),
            format!("{:.6}", f.ml_bul),
            format!("{:.6}", r.fixed.rms),
            format!("{:.6}", f.rms),
            f.r_squared.map(|v| format!("{v:.6}")).unwrap_or_default(),
            format!("{:.6}", f.chi2),
            f.status.label().to_string(),
            comparison_cell(r, AccelerationLaw::Newtonian),
            comparison_cell(r, AccelerationLaw::Rar),
            r.density.map(|d| format!("{:.6e}", d.sigma)).unwrap_or_default(),
            r.density.map(|d| d.phase.key().to_string()).unwrap_or_default(),
            r.density.map(|d| format!("{:.4}", d.alpha_refined)).unwrap_or_default(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// rms of `law` for this galaxy: the fit itself if it used `law`, otherwise
/// the comparison value (empty if none was computed).
fn comparison_cell(r: &GalaxyResult, law: AccelerationLaw) -> String {
    if r.fit.law == law {
        return format!("{:.6}", r.fit.rms);
    }
    r.comparisons
        .iter()
        .find(|c| c.law == law)
        .map(|c| format!("{:.6}", c.rms))
        .unwrap_or_default()
}

/// Write the per-radius model trace of one galaxy to a CSV file.
pub fn write_galaxy_csv(
    path: &Path,
    curve: &GalaxyCurve,
    fit: &FitResult,
    trace: &ModelTrace,
    a0: f64,
) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    let mut out = BufWriter::new(file);
    write_galaxy_rows(&mut out, curve, fit, trace, a0)
        .and_then(|_| out.flush())
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV: {e}")))
}

fn write_galaxy_rows<W: Write>(
    out: &mut W,
    curve: &GalaxyCurve,
    fit: &FitResult,
    trace: &ModelTrace,
    a0: f64,
) -> std::io::Result<()> {
    writeln!(out, "{GALAXY_HEADER}")?;
    let boost = trace.boost(a0);
    for i in 0..curve.len() {
        let v_obs = curve.v_obs()[i];
        let v_pred = fit.predicted_velocities[i];
        writeln!(
            out,
            "{:.4},{:.4},{:.4},{:.4},{:.4},{:.4},{:.4},{:.4},{:.4},{:.6},{:.6},{:.6}",
            curve.radii()[i],
            v_obs,
            curve.v_obs_err()[i],
            curve.v_gas()[i],
            curve.v_disk()[i],
            curve.v_bul()[i],
            trace.v_bar[i],
            v_pred,
            v_obs - v_pred,
            trace.g_bar[i],
            trace.g_obs[i],
            boost[i],
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bench::{BenchmarkConfig, run_benchmark};
    use crate::data::{SynthConfig, generate_catalogue};
    use crate::domain::A0;
    use crate::fit::{FitOptions, fit_galaxy};
    use crate::models::trace_curve;

    #[test]
    fn benchmark_csv_has_header_and_one_row_per_galaxy() {
        let catalogue = generate_catalogue(&SynthConfig {
            n_galaxies: 4,
            ..SynthConfig::default()
        })
        .unwrap();
        let report = run_benchmark(&catalogue.galaxies, &BenchmarkConfig::default());

        let mut buf = Vec::new();
        write_benchmark_rows(&mut buf, &report).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some(BENCHMARK_HEADER));

        let cols = BENCHMARK_HEADER.split(',').count();
        let rows: Vec<&str> = lines.collect();
        assert_eq!(rows.len(), report.n_success());
        for row in rows {
            assert_eq!(row.split(',').count(), cols, "row: {row}");
        }
    }

    #[test]
    fn benchmark_csv_quotes_names_with_commas() {
        let catalogue = generate_catalogue(&SynthConfig {
            n_galaxies: 2,
            ..SynthConfig::default()
        })
        .unwrap();
        let mut report = run_benchmark(&catalogue.galaxies, &BenchmarkConfig::default());
        let (_, mut renamed) = report.results.pop_first().unwrap();
        renamed.name = "UGC 1,\"A\"".to_string();
        report.results.insert(renamed.name.clone(), renamed);

        let mut buf = Vec::new();
        write_benchmark_rows(&mut buf, &report).unwrap();

        let mut reader = csv::Reader::from_reader(buf.as_slice());
        let cols = reader.headers().unwrap().len();
        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.len() == cols));
        assert!(records.iter().any(|r| &r[0] == "UGC 1,\"A\""));
    }

    #[test]
    fn galaxy_csv_round_trips_through_csv_reader() {
        let catalogue = generate_catalogue(&SynthConfig {
            n_galaxies: 1,
            ..SynthConfig::default()
        })
        .unwrap();
        let curve = &catalogue.galaxies[0];
        let fit = fit_galaxy(curve, &FitOptions::default()).unwrap();
        let params = FitOptions::default().initial.with_ml(fit.ml_disk, fit.ml_bul);
        let trace = trace_curve(curve, fit.law, &params).unwrap();

        let path = std::env::temp_dir().join(format!("gbridge_export_{}.csv", std::process::id()));
        write_galaxy_csv(&path, curve, &fit, &trace, A0).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers: Vec<String> = reader.headers().unwrap().iter().map(str::to_string).collect();
        let n_rows = reader.records().count();
        std::fs::remove_file(&path).ok();

        assert_eq!(headers.join(","), GALAXY_HEADER);
        assert_eq!(n_rows, curve.len());
    }
}
