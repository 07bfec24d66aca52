//! Pooled acceleration relation across galaxies.
//!
//! Every usable point contributes `log10 g_bar`, the measured
//! `log10 g_obs = log10(v_obs^2 / r)` and the model `log10 g_pred`. From the
//! pool we report how well the model tracks the data (Pearson r, scatter in
//! dex) and the deep-regime slope of measured `g_obs` against `g_bar`, which
//! is ≈ 0.5 when `g_obs → sqrt(a0 * g_bar)`.

use serde::{Deserialize, Serialize};

use crate::domain::DEEP_REGIME_FRACTION;
use crate::math::{LineFit, fit_line, pearson, rms};
use crate::models::ModelTrace;

/// Minimum deep-regime points for a slope.
pub const MIN_DEEP_POINTS: usize = 3;

/// One point of the relation, in log10 units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelationPoint {
    pub log_g_bar: f64,
    pub log_g_obs: f64,
    pub log_g_pred: f64,
}

/// Pooled relation statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationStats {
    pub n_points: usize,
    pub pearson_r: Option<f64>,
    /// rms of `log10 g_obs - log10 g_pred` (dex).
    pub scatter_dex: Option<f64>,
    pub n_deep: usize,
    /// OLS line `log10 g_obs = intercept + slope * log10 g_bar` over
    /// deep-regime points; `None` with fewer than `MIN_DEEP_POINTS`.
    pub deep_fit: Option<LineFit>,
}

/// Relation points of one galaxy.
///
/// Points with a non-positive observed, baryonic or predicted acceleration
/// are skipped (no logarithm).
pub fn relation_points(radii: &[f64], v_obs: &[f64], trace: &ModelTrace) -> Vec<RelationPoint> {
    let mut out = Vec::with_capacity(radii.len());
    for i in 0..radii.len() {
        let (r, v) = (radii[i], v_obs[i]);
        if !(r > 0.0 && v > 0.0) {
            continue;
        }
        let g_meas = v * v / r;
        let (g_bar, g_pred) = (trace.g_bar[i], trace.g_obs[i]);
        if !(g_bar > 0.0 && g_pred > 0.0) {
            continue;
        }
        out.push(RelationPoint {
            log_g_bar: g_bar.log10(),
            log_g_obs: g_meas.log10(),
            log_g_pred: g_pred.log10(),
        });
    }
    out
}

/// Summarise a pool of points. `a0` sets the deep-regime cut.
pub fn summarize<'a, I>(points: I, a0: f64) -> RelationStats
where
    I: IntoIterator<Item = &'a RelationPoint>,
{
    let deep_cut = (DEEP_REGIME_FRACTION * a0).log10();

    let mut obs = Vec::new();
    let mut pred = Vec::new();
    let mut deep_x = Vec::new();
    let mut deep_y = Vec::new();
    for p in points {
        obs.push(p.log_g_obs);
        pred.push(p.log_g_pred);
        if p.log_g_bar < deep_cut {
            deep_x.push(p.log_g_bar);
            deep_y.push(p.log_g_obs);
        }
    }

    RelationStats {
        n_points: obs.len(),
        pearson_r: pearson(&obs, &pred),
        scatter_dex: if obs.is_empty() { None } else { Some(rms(&obs, &pred)) },
        n_deep: deep_x.len(),
        deep_fit: fit_line(&deep_x, &deep_y, MIN_DEEP_POINTS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::A0;
    use crate::models::geometric_bridge;

    fn point(g_bar: f64, g_obs: f64, g_pred: f64) -> RelationPoint {
        RelationPoint {
            log_g_bar: g_bar.log10(),
            log_g_obs: g_obs.log10(),
            log_g_pred: g_pred.log10(),
        }
    }

    #[test]
    fn deep_slope_of_bridge_is_one_half() {
        // Well inside the deep regime the bridge is ≈ sqrt(a0 * g_bar).
        let pts: Vec<RelationPoint> = [0.01, 0.03, 0.1, 0.3, 1.0, 3.0]
            .iter()
            .map(|&g| {
                let g_obs = geometric_bridge(g, A0);
                point(g, g_obs, g_obs)
            })
            .collect();
        let stats = summarize(&pts, A0);
        assert_eq!(stats.n_points, 6);
        assert_eq!(stats.n_deep, 6);
        let fit = stats.deep_fit.unwrap();
        assert!((fit.slope - 0.5).abs() < 1e-3, "slope={}", fit.slope);
        assert!(stats.scatter_dex.unwrap() < 1e-12);
        assert!((stats.pearson_r.unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn too_few_deep_points_leaves_slope_undefined() {
        let pts = vec![
            point(1.0, 60.0, 61.0),
            point(100.0, 700.0, 650.0),
            point(1e5, 1.1e5, 1.05e5),
            point(1e6, 1.0e6, 1.0e6),
        ];
        let stats = summarize(&pts, A0);
        assert_eq!(stats.n_deep, 2);
        assert_eq!(stats.deep_fit, None);
        assert!(stats.pearson_r.unwrap() > 0.99);
    }

    #[test]
    fn empty_pool() {
        let stats = summarize(&[], A0);
        assert_eq!(stats.n_points, 0);
        assert_eq!(stats.pearson_r, None);
        assert_eq!(stats.scatter_dex, None);
        assert_eq!(stats.deep_fit, None);
    }

    #[test]
    fn skips_points_without_a_logarithm() {
        let trace = ModelTrace {
            v_bar: vec![0.0, 50.0, 60.0],
            g_bar: vec![0.0, 1250.0, 900.0],
            g_obs: vec![0.0, 2500.0, 1600.0],
            v_pred: vec![0.0, 70.0, 69.0],
        };
        let pts = relation_points(&[1.0, 2.0, 4.0], &[30.0, 0.0, 80.0], &trace);
        assert_eq!(pts.len(), 1);
        assert!((pts[0].log_g_obs - (1600.0_f64).log10()).abs() < 1e-12);
    }
}
