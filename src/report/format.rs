//! Formatted terminal output.
//!
//! Formatting lives in one place so:
//! - the math/fitting code stays clean and testable
//! - output changes are localized

use crate::bench::{AlphaValidation, BenchmarkReport, FormulaScore, GalaxyResult};
use crate::data::morphology_label;
use crate::domain::{AccelerationLaw, FitResult, GalaxyCurve};
use crate::io::ingest::IngestedData;
use crate::models::{DensityEstimate, LimitCheck, ModelTrace, enclosed_mass, halo_boundary_radius};

const RULE: &str = "============================================================";

/// Benchmark summary: median rms per law, threshold counts, morphology
/// breakdown, pooled relation, worst fits and failures.
pub fn format_benchmark_summary(report: &BenchmarkReport, worst: usize) -> String {
    let mut out = String::new();
    let n = report.n_success();

    out.push_str(RULE);
    out.push('\n');
    out.push_str(&format!(
        "BENCHMARK RESULTS: {n} galaxies fitted, {} failed\n",
        report.n_failed()
    ));
    out.push_str(RULE);
    out.push('\n');

    out.push_str(&format!("{:<32} {:>18}\n", "Formula", "Median rms (km/s)"));
    for c in &report.comparisons {
        out.push_str(&format!(
            "  {:<30} {:>18}\n",
            c.law.display_name(),
            fmt_opt(c.median_rms, 1)
        ));
    }
    let label = report.law.display_name();
    out.push_str(&format!(
        "  {:<30} {:>18}\n",
        format!("{label} (M/L fixed)"),
        fmt_opt(report.median_rms_fixed, 1)
    ));
    let mode = report
        .results
        .values()
        .next()
        .map(|r| r.fit.mode.display_name())
        .unwrap_or("fit");
    out.push_str(&format!(
        "  {:<30} {:>18}\n",
        truncate(&format!("{label} ({mode})"), 30),
        fmt_opt(report.median_rms, 1)
    ));
    out.push('\n');

    for t in &report.rms_below {
        out.push_str(&format!(
            "  rms < {:<5} km/s: {}/{n}\n",
            t.threshold, t.count
        ));
    }
    out.push_str(&format!(
        "  R² > {}:        {}/{n}",
        report.r2_threshold, report.n_r2_above
    ));
    if report.n_r2_undefined > 0 {
        out.push_str(&format!("  ({} undefined)", report.n_r2_undefined));
    }
    out.push('\n');
    out.push_str(&format!(
        "  Median M/L disk: {} | bulge: {}\n",
        fmt_opt(report.median_ml_disk, 3),
        fmt_opt(report.median_ml_bul, 3)
    ));
    if report.n_capped > 0 {
        out.push_str(&format!(
            "  Fits stopped at the iteration cap: {}\n",
            report.n_capped
        ));
    }

    if !report.groups.is_empty() {
        out.push_str("\nBy morphology:\n");
        out.push_str(&format!(
            "  {:<14} {:>4} {:>12} {:>12} {:>8}\n",
            "group", "n", "median rms", "median M/L", "R² ok"
        ));
        for g in &report.groups {
            out.push_str(&format!(
                "  {:<14} {:>4} {:>12} {:>12} {:>8}\n",
                g.group.label(),
                g.n_galaxies,
                fmt_opt(g.median_rms, 2),
                fmt_opt(g.median_ml_disk, 3),
                g.n_r2_above
            ));
        }
    }

    let rel = &report.relation;
    out.push_str("\nAcceleration relation (pooled):\n");
    out.push_str(&format!(
        "  points={} | pearson r={} | scatter={} dex\n",
        rel.n_points,
        fmt_opt(rel.pearson_r, 4),
        fmt_opt(rel.scatter_dex, 3)
    ));
    match &rel.deep_fit {
        Some(fit) => out.push_str(&format!(
            "  deep regime: slope={:.3} intercept={:.3} (n={}, expect slope 0.5)\n",
            fit.slope, fit.intercept, fit.n
        )),
        None => out.push_str(&format!(
            "  deep regime: slope undefined (n={})\n",
            rel.n_deep
        )),
    }

    if !report.phases.is_empty() {
        out.push_str("\nBy density phase:\n");
        out.push_str(&format!(
            "  {:<16} {:>4} {:>14} {:>12}\n",
            "phase", "n", "median Σ", "median rms"
        ));
        for p in &report.phases {
            out.push_str(&format!(
                "  {:<16} {:>4} {:>14} {:>12}\n",
                p.phase.label(),
                p.n_galaxies,
                p.median_sigma.map(|v| format!("{v:.3e}")).unwrap_or_else(|| "n/a".into()),
                fmt_opt(p.median_rms, 2)
            ));
        }
        if report.n_density_undefined > 0 {
            out.push_str(&format!("  ({} without a baryonic mass)\n", report.n_density_undefined));
        }
    }

    if worst > 0 && n > 0 {
        let mut ranked: Vec<&GalaxyResult> = report.results.values().collect();
        ranked.sort_by(|a, b| b.fit.rms.total_cmp(&a.fit.rms).then_with(|| a.name.cmp(&b.name)));
        out.push_str(&format!("\nWorst {} fits:\n", worst.min(n)));
        out.push_str(&galaxy_table_header());
        for r in ranked.into_iter().take(worst) {
            out.push_str(&galaxy_table_row(r));
        }
    }

    if !report.failures.is_empty() {
        out.push_str("\nFailures:\n");
        for f in &report.failures {
            out.push_str(&format!("  {:<16} {}\n", truncate(&f.name, 16), f.error));
        }
    }

    out.push_str(RULE);
    out.push('\n');
    out
}

fn galaxy_table_header() -> String {
    let mut out = format!(
        "  {:<16} {:<6} {:>4} {:>8} {:>8} {:>8} {:>8} {:<13}\n",
        "galaxy", "morph", "n", "rms", "R²", "ml_disk", "ml_bul", "status"
    );
    out.push_str(&format!(
        "  {:-<16} {:-<6} {:->4} {:->8} {:->8} {:->8} {:->8} {:-<13}\n",
        "", "", "", "", "", "", "", ""
    ));
    out
}

fn galaxy_table_row(r: &GalaxyResult) -> String {
    format!(
        "  {:<16} {:<6} {:>4} {:>8.2} {:>8} {:>8.3} {:>8.3} {:<13}\n",
        truncate(&r.name, 16),
        morphology_label(r.hubble_type),
        r.n_points,
        r.fit.rms,
        fmt_opt(r.fit.r_squared, 3),
        r.fit.ml_disk,
        r.fit.ml_bul,
        r.fit.status.label()
    )
}

/// Single-galaxy summary plus a per-radius table.
pub fn format_galaxy_summary(curve: &GalaxyCurve, fit: &FitResult, trace: &ModelTrace, a0: f64) -> String {
    let mut out = String::new();
    let t = curve.meta().hubble_type;
    let v_flat = curve.v_flat();
    let r_halo = halo_boundary_radius(v_flat, a0);

    out.push_str(&format!("{} ({})\n", curve.name(), morphology_label(t)));
    out.push_str(&format!("  Law:          {}\n", fit.law.display_name()));
    out.push_str(&format!("  N points:     {}\n", fit.n_points));
    out.push_str(&format!(
        "  M/L:          disk={:.3}, bulge={:.3} ({})\n",
        fit.ml_disk,
        fit.ml_bul,
        fit.mode.display_name()
    ));
    out.push_str(&format!("  rms:          {:.2} km/s\n", fit.rms));
    out.push_str(&format!("  chi²:         {:.2}\n", fit.chi2));
    out.push_str(&format!("  R²:           {}\n", fmt_opt(fit.r_squared, 4)));
    out.push_str(&format!(
        "  Status:       {} ({} iterations)\n",
        fit.status.label(),
        fit.iterations
    ));
    out.push_str(&format!("  V_flat:       {v_flat:.1} km/s\n"));
    out.push_str(&format!(
        "  r_halo:       {r_halo:.1} kpc  (disk extends to {:.1} kpc)\n",
        curve.r_max()
    ));
    out.push_str(&format!("  r_halo/r_max: {:.2}\n", r_halo / curve.r_max()));
    let density = trace
        .v_bar
        .last()
        .and_then(|&v| DensityEstimate::new(enclosed_mass(v, curve.r_max()), curve.r_max()).ok());
    if let Some(d) = density {
        out.push_str(&format!(
            "  Σ:            {:.3e} M_sun/pc² ({}, {})\n",
            d.sigma,
            d.phase.label(),
            d.regime.label()
        ));
        out.push_str(&format!(
            "  α:            {:.3} three-phase, {:.3} linear ({})\n",
            d.alpha_refined,
            d.alpha_linear,
            d.shape.label()
        ));
    }
    out.push('\n');

    out.push_str(&format!(
        "{:>8} {:>8} {:>6} {:>8} {:>8} {:>8} {:>10} {:>6}\n",
        "r", "v_obs", "err", "v_bar", "v_pred", "resid", "g_bar", "boost"
    ));
    out.push_str(&format!(
        "{:->8} {:->8} {:->6} {:->8} {:->8} {:->8} {:->10} {:->6}\n",
        "", "", "", "", "", "", "", ""
    ));
    let boost = trace.boost(a0);
    for i in 0..curve.len() {
        let v_obs = curve.v_obs()[i];
        out.push_str(&format!(
            "{:>8.2} {:>8.1} {:>6.1} {:>8.1} {:>8.1} {:>8.1} {:>10.1} {:>6.2}\n",
            curve.radii()[i],
            v_obs,
            curve.v_obs_err()[i],
            trace.v_bar[i],
            trace.v_pred[i],
            v_obs - trace.v_pred[i],
            trace.g_bar[i],
            boost[i]
        ));
    }

    out
}

/// Per-law rms for one galaxy at its fitted M/L (used by `gbridge galaxy`).
pub fn format_law_comparison(rows: &[(AccelerationLaw, f64)]) -> String {
    let mut out = String::from("Other laws at these M/L:\n");
    for (law, rms) in rows {
        out.push_str(&format!("  {:<24} rms={rms:.2} km/s\n", law.display_name()));
    }
    out
}

/// Predicted versus fitted exponents for `gbridge density`.
pub fn format_density_validation(v: &AlphaValidation, max_rows: usize) -> String {
    let mut out = String::new();
    out.push_str(RULE);
    out.push('\n');
    out.push_str(&format!(
        "DENSITY RELATION: {} galaxies scored, {} rejected\n",
        v.rows.len(),
        v.rejected.len()
    ));
    out.push_str(RULE);
    out.push('\n');

    out.push_str(&format!(
        "  {:<24} {:>10} {:>8} {:>8}\n",
        "Formula", "pearson r", "rmse", "mae"
    ));
    out.push_str(&score_row("linear 1.972-0.487 lgΣ", &v.linear));
    out.push_str(&score_row("three-phase", &v.refined));
    match &v.regression {
        Some(reg) => {
            out.push_str(&score_row("refit to sample", &reg.score));
            out.push_str(&format!(
                "\n  Refit: α = {:.3} {:+.3} lgΣ (n={}, r={})\n",
                reg.line.intercept,
                reg.line.slope,
                reg.line.n,
                fmt_opt(reg.pearson_r, 3)
            ));
        }
        None => out.push_str("\n  Refit: too few galaxies\n"),
    }

    if !v.phases.is_empty() {
        out.push_str("\nBy phase:\n");
        for p in &v.phases {
            out.push_str(&format!(
                "  {:<16} n={:<4} mean α={} rmse={}\n",
                p.phase.label(),
                p.n_galaxies,
                fmt_opt(p.mean_alpha_fitted, 3),
                fmt_opt(p.refined.rmse, 3)
            ));
        }
    }

    if max_rows > 0 && !v.rows.is_empty() {
        out.push_str(&format!(
            "\n  {:<16} {:>10} {:>7} {:>7} {:>7} {:<12}\n",
            "galaxy", "Σ", "α fit", "α lin", "α 3ph", "shape"
        ));
        for r in v.rows.iter().take(max_rows) {
            out.push_str(&format!(
                "  {:<16} {:>10.3e} {:>7.3} {:>7.3} {:>7.3} {:<12}\n",
                truncate(&r.name, 16),
                r.estimate.sigma,
                r.alpha_fitted,
                r.estimate.alpha_linear,
                r.estimate.alpha_refined,
                r.estimate.shape.label()
            ));
        }
        if v.rows.len() > max_rows {
            out.push_str(&format!("  ... {} more\n", v.rows.len() - max_rows));
        }
    }

    if !v.rejected.is_empty() {
        out.push_str("\nRejected:\n");
        for f in &v.rejected {
            out.push_str(&format!("  {:<16} {}\n", truncate(&f.name, 16), f.error));
        }
    }
    out.push_str(RULE);
    out.push('\n');
    out
}

fn score_row(label: &str, s: &FormulaScore) -> String {
    format!(
        "  {:<24} {:>10} {:>8} {:>8}\n",
        label,
        fmt_opt(s.pearson_r, 3),
        fmt_opt(s.rmse, 3),
        fmt_opt(s.mae, 3)
    )
}

/// Ingest diagnostics (written to stderr by the app).
pub fn format_ingest_diagnostics(ingest: &IngestedData, max_rows: usize) -> String {
    let mut out = String::new();
    let s = &ingest.stats;
    out.push_str(&format!(
        "Loaded {} galaxies ({} points) | rows read={} used={} | r=[{:.2}, {:.2}] kpc | v_max={:.1} km/s\n",
        s.n_galaxies, s.n_points, ingest.rows_read, ingest.rows_used, s.r_min, s.r_max, s.v_max
    ));
    if !ingest.row_errors.is_empty() {
        out.push_str(&format!("{} row errors:\n", ingest.row_errors.len()));
        for e in ingest.row_errors.iter().take(max_rows) {
            out.push_str(&format!(
                "  line {}{}: {}\n",
                e.line,
                e.id.as_deref().map(|id| format!(" ({id})")).unwrap_or_default(),
                e.message
            ));
        }
        if ingest.row_errors.len() > max_rows {
            out.push_str(&format!("  ... {} more\n", ingest.row_errors.len() - max_rows));
        }
    }
    for r in &ingest.rejected {
        out.push_str(&format!("Rejected {}: {}\n", r.name, r.error));
    }
    out
}

/// Limit checks as a pass/fail table.
pub fn format_limits(checks: &[LimitCheck], a0: f64) -> String {
    let mut out = format!("Limit checks (a0 = {a0} (km/s)^2/kpc):\n");
    for c in checks {
        out.push_str(&format!(
            "  [{}] {:<10} {:<48} ratio={:.6} (rtol {:e})\n",
            if c.passed() { "ok" } else { "FAIL" },
            c.name,
            c.description,
            c.ratio,
            c.rtol
        ));
    }
    out
}

fn fmt_opt(v: Option<f64>, prec: usize) -> String {
    match v {
        Some(v) => format!("{v:.prec$}"),
        None => "n/a".to_string(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bench::{BenchmarkConfig, run_benchmark};
    use crate::data::{SynthConfig, generate_catalogue};
    use crate::domain::A0;
    use crate::fit::{FitOptions, fit_galaxy};
    use crate::models::{check_limits, trace_curve};

    #[test]
    fn benchmark_summary_mentions_every_section() {
        let mut cat = generate_catalogue(&SynthConfig {
            n_galaxies: 6,
            ..SynthConfig::default()
        })
        .unwrap();
        // One galaxy too short to fit.
        let g = &cat.galaxies[0];
        let points: Vec<crate::domain::CurvePoint> = (0..2)
            .map(|i| crate::domain::CurvePoint {
                radius: g.radii()[i],
                v_obs: g.v_obs()[i],
                v_obs_err: g.v_obs_err()[i],
                v_gas: g.v_gas()[i],
                v_disk: g.v_disk()[i],
                v_bul: g.v_bul()[i],
            })
            .collect();
        cat.galaxies[0] = GalaxyCurve::from_points("SHORT", &points, g.meta().clone()).unwrap();

        let report = run_benchmark(&cat.galaxies, &BenchmarkConfig::default());
        let txt = format_benchmark_summary(&report, 3);

        assert!(txt.contains("5 galaxies fitted, 1 failed"));
        assert!(txt.contains("Newton (no DM)"));
        assert!(txt.contains("RAR (McGaugh+2016)"));
        assert!(txt.contains("rms < 5"));
        assert!(txt.contains("By morphology:"));
        assert!(txt.contains("Acceleration relation"));
        assert!(txt.contains("Worst 3 fits:"));
        assert!(txt.contains("By density phase:"));
        assert!(txt.contains("SHORT"));
    }

    #[test]
    fn galaxy_summary_has_one_row_per_radius() {
        let cat = generate_catalogue(&SynthConfig {
            n_galaxies: 1,
            ..SynthConfig::default()
        })
        .unwrap();
        let curve = &cat.galaxies[0];
        let fit = fit_galaxy(curve, &FitOptions::default()).unwrap();
        let params = FitOptions::default().initial.with_ml(fit.ml_disk, fit.ml_bul);
        let trace = trace_curve(curve, fit.law, &params).unwrap();

        let txt = format_galaxy_summary(curve, &fit, &trace, A0);
        assert!(txt.starts_with(curve.name()));
        assert!(txt.contains("r_halo/r_max"));
        assert!(txt.contains("three-phase"));
        // Header block + blank line + table header + rule + rows.
        let table_rows = txt.lines().skip_while(|l| !l.trim_start().starts_with("r ")).skip(2).count();
        assert_eq!(table_rows, curve.len());
    }

    #[test]
    fn density_validation_lists_scores_and_rejections() {
        use crate::bench::{DensitySample, validate_alpha};

        let samples: Vec<DensitySample> = [(1e8, 0.3), (1e9, 1.8), (1e10, 1.2), (1e11, 0.9)]
            .iter()
            .enumerate()
            .map(|(i, &(m_bar, alpha))| DensitySample {
                name: format!("D{i}"),
                m_bar,
                r_max: 10.0,
                alpha_fitted: alpha,
            })
            .chain(std::iter::once(DensitySample {
                name: "BAD".into(),
                m_bar: 0.0,
                r_max: 10.0,
                alpha_fitted: 1.0,
            }))
            .collect();
        let txt = format_density_validation(&validate_alpha(&samples), 2);

        assert!(txt.contains("4 galaxies scored, 1 rejected"));
        assert!(txt.contains("three-phase"));
        assert!(txt.contains("Refit: α ="));
        assert!(txt.contains("... 2 more"));
        assert!(txt.contains("BAD"));
    }

    #[test]
    fn limits_table_marks_pass() {
        let txt = format_limits(&check_limits(A0), A0);
        assert_eq!(txt.matches("[ok]").count(), 4);
        assert!(!txt.contains("FAIL"));
    }

    #[test]
    fn optional_values_render_as_na() {
        assert_eq!(fmt_opt(None, 2), "n/a");
        assert_eq!(fmt_opt(Some(1.23456), 2), "1.23");
        assert_eq!(truncate("NGC1234567890", 8), "NGC1234.");
    }
}
