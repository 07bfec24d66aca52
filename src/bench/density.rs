//! Surface-density relation checked against fitted exponents.
//!
//! Input is one `(M_bar, R_max, α_fitted)` sample per galaxy, as published
//! by rotation-curve shape fits. For every sample we compute `Σ` and the
//! linear and three-phase predictions, then score both predictions against
//! the fitted exponents (Pearson r, RMSE, MAE) and refit the line
//! `α = a + b log10 Σ` to the sample.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::bench::report::GalaxyFailure;
use crate::error::ModelError;
use crate::math::{LineFit, fit_line, mean, pearson, rms};
use crate::models::{DensityEstimate, DensityPhase};

/// Minimum samples for the `α` vs `log10 Σ` regression.
pub const MIN_REGRESSION_POINTS: usize = 3;

/// One galaxy with a fitted exponent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DensitySample {
    pub name: String,
    /// Baryonic mass (M_sun).
    pub m_bar: f64,
    /// Outermost radius (kpc).
    pub r_max: f64,
    pub alpha_fitted: f64,
}

/// Agreement between predicted and fitted exponents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FormulaScore {
    pub n: usize,
    pub pearson_r: Option<f64>,
    pub rmse: Option<f64>,
    pub mae: Option<f64>,
}

impl FormulaScore {
    pub fn new(predicted: &[f64], fitted: &[f64]) -> Self {
        let errors: Vec<f64> = predicted
            .iter()
            .zip(fitted)
            .map(|(p, f)| (f - p).abs())
            .collect();
        Self {
            n: errors.len(),
            pearson_r: pearson(predicted, fitted),
            rmse: (!errors.is_empty()).then(|| rms(fitted, predicted)),
            mae: mean(&errors),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlphaRow {
    pub name: String,
    pub alpha_fitted: f64,
    pub estimate: DensityEstimate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseCount {
    pub phase: DensityPhase,
    pub n_galaxies: usize,
    pub mean_alpha_fitted: Option<f64>,
    pub refined: FormulaScore,
}

/// Refit of `α = intercept + slope * log10 Σ` to the sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AlphaRegression {
    pub line: LineFit,
    pub pearson_r: Option<f64>,
    pub score: FormulaScore,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlphaValidation {
    /// Sorted by name.
    pub rows: Vec<AlphaRow>,
    /// Samples with invalid mass/radius or a repeated name.
    pub rejected: Vec<GalaxyFailure>,
    pub linear: FormulaScore,
    pub refined: FormulaScore,
    pub regression: Option<AlphaRegression>,
    /// Populated phases only, in phase order.
    pub phases: Vec<PhaseCount>,
}

/// Score the density relation against `samples`.
///
/// Invalid samples are rejected individually; a repeated name rejects every
/// sample carrying it. The result does not depend on sample order.
pub fn validate_alpha(samples: &[DensitySample]) -> AlphaValidation {
    let mut by_name: BTreeMap<&str, Vec<&DensitySample>> = BTreeMap::new();
    for s in samples {
        by_name.entry(s.name.as_str()).or_default().push(s);
    }

    let mut rows = Vec::new();
    let mut rejected = Vec::new();
    for (name, group) in by_name {
        if group.len() > 1 {
            for _ in &group {
                rejected.push(GalaxyFailure {
                    name: name.to_string(),
                    error: ModelError::DuplicateGalaxy(name.to_string()),
                });
            }
            continue;
        }
        let s = group[0];
        let estimate = if s.alpha_fitted.is_finite() {
            DensityEstimate::new(s.m_bar, s.r_max)
        } else {
            Err(ModelError::InvalidParameter {
                name: "alpha",
                value: s.alpha_fitted,
            })
        };
        match estimate {
            Ok(estimate) => rows.push(AlphaRow {
                name: name.to_string(),
                alpha_fitted: s.alpha_fitted,
                estimate,
            }),
            Err(error) => rejected.push(GalaxyFailure {
                name: name.to_string(),
                error,
            }),
        }
    }

    let fitted: Vec<f64> = rows.iter().map(|r| r.alpha_fitted).collect();
    let linear: Vec<f64> = rows.iter().map(|r| r.estimate.alpha_linear).collect();
    let refined: Vec<f64> = rows.iter().map(|r| r.estimate.alpha_refined).collect();
    let log_sigma: Vec<f64> = rows.iter().map(|r| r.estimate.sigma.log10()).collect();

    let regression = fit_line(&log_sigma, &fitted, MIN_REGRESSION_POINTS).map(|line| {
        let predicted: Vec<f64> = log_sigma
            .iter()
            .map(|x| line.intercept + line.slope * x)
            .collect();
        AlphaRegression {
            line,
            pearson_r: pearson(&log_sigma, &fitted),
            score: FormulaScore::new(&predicted, &fitted),
        }
    });

    let phases = DensityPhase::ALL
        .iter()
        .filter_map(|&phase| {
            let members: Vec<&AlphaRow> = rows.iter().filter(|r| r.estimate.phase == phase).collect();
            if members.is_empty() {
                return None;
            }
            let fitted: Vec<f64> = members.iter().map(|r| r.alpha_fitted).collect();
            let refined: Vec<f64> = members.iter().map(|r| r.estimate.alpha_refined).collect();
            Some(PhaseCount {
                phase,
                n_galaxies: members.len(),
                mean_alpha_fitted: mean(&fitted),
                refined: FormulaScore::new(&refined, &fitted),
            })
        })
        .collect();

    AlphaValidation {
        linear: FormulaScore::new(&linear, &fitted),
        refined: FormulaScore::new(&refined, &fitted),
        regression,
        phases,
        rows,
        rejected,
    }
}
