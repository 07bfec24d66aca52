//! Surface-density scaling of the rotation-curve exponent.
//!
//! A galaxy's mean baryonic surface density inside its outermost radius,
//! `Σ = M_bar / (π R_max^2)` in M_sun/pc^2, predicts the exponent `α` of its
//! rotation curve:
//!
//! - linear: `α = 1.972 - 0.487 log10 Σ`
//! - three-phase: separate lines below `Σ = 0.05`, between `0.05` and `0.5`,
//!   and above `0.5`, each phase with its own coherence scale `κ`
//!
//! `classify_regime` and `classify_curve` bucket `Σ` and `α` for reporting.

use serde::{Deserialize, Serialize};

use crate::domain::G_KPC;
use crate::error::ModelError;

/// Upper `Σ` (M_sun/pc^2) of the geometric-dominant phase.
pub const PHASE_I_MAX: f64 = 0.05;
/// Upper `Σ` (M_sun/pc^2) of the transitional phase.
pub const PHASE_II_MAX: f64 = 0.5;

/// Coherence scale of the single-line relation.
pub const KAPPA_LINEAR: f64 = 0.6;

const ALPHA_LINEAR_INTERCEPT: f64 = 1.972;
const ALPHA_LINEAR_SLOPE: f64 = -0.487;

const PC_PER_KPC: f64 = 1000.0;

/// Phase of the three-phase `α(Σ)` relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DensityPhase {
    /// `Σ < 0.05`.
    GeometricDominant,
    /// `0.05 <= Σ < 0.5`.
    Transitional,
    /// `Σ >= 0.5`.
    BaryonDominant,
}

impl DensityPhase {
    pub const ALL: [DensityPhase; 3] = [
        DensityPhase::GeometricDominant,
        DensityPhase::Transitional,
        DensityPhase::BaryonDominant,
    ];

    pub fn from_sigma(sigma: f64) -> Self {
        if sigma < PHASE_I_MAX {
            DensityPhase::GeometricDominant
        } else if sigma < PHASE_II_MAX {
            DensityPhase::Transitional
        } else {
            DensityPhase::BaryonDominant
        }
    }

    /// Machine-readable name used in exports.
    pub fn key(self) -> &'static str {
        match self {
            DensityPhase::GeometricDominant => "geometric",
            DensityPhase::Transitional => "transitional",
            DensityPhase::BaryonDominant => "baryonic",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DensityPhase::GeometricDominant => "I geometric",
            DensityPhase::Transitional => "II transitional",
            DensityPhase::BaryonDominant => "III baryonic",
        }
    }

    /// `(intercept, slope)` of `α = intercept + slope * log10 Σ` in this phase.
    pub fn alpha_line(self) -> (f64, f64) {
        match self {
            DensityPhase::GeometricDominant => (2.80, -0.32),
            DensityPhase::Transitional => (2.20, -0.50),
            DensityPhase::BaryonDominant => (1.40, -0.20),
        }
    }

    pub fn kappa(self) -> f64 {
        match self {
            DensityPhase::GeometricDominant => 0.55,
            DensityPhase::Transitional => 0.75,
            DensityPhase::BaryonDominant => 0.95,
        }
    }
}

/// Coarse `Σ` buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DensityRegime {
    /// `Σ < 10`.
    Enhanced,
    /// `10 <= Σ < 100`.
    Active,
    /// `100 <= Σ < 1000`.
    Transitional,
    /// `Σ >= 1000`.
    Newtonian,
}

impl DensityRegime {
    pub fn label(self) -> &'static str {
        match self {
            DensityRegime::Enhanced => "enhanced",
            DensityRegime::Active => "active",
            DensityRegime::Transitional => "transitional",
            DensityRegime::Newtonian => "newtonian",
        }
    }
}

/// Expected rotation-curve shape for an exponent `α`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CurveShape {
    /// `α > 1.5`: rising, strong missing-mass signal.
    Rising,
    /// `1.0 < α <= 1.5`.
    FlatRising,
    /// `0.5 < α <= 1.0`.
    FlatFalling,
    /// `α <= 0.5`: Keplerian decline.
    Falling,
}

impl CurveShape {
    pub fn label(self) -> &'static str {
        match self {
            CurveShape::Rising => "rising",
            CurveShape::FlatRising => "flat/rising",
            CurveShape::FlatFalling => "flat/falling",
            CurveShape::Falling => "falling",
        }
    }
}

/// `Σ = M_bar / (π R_max^2)` in M_sun/pc^2, with `m_bar` in M_sun and
/// `r_max_kpc` in kpc.
pub fn surface_density(m_bar: f64, r_max_kpc: f64) -> Result<f64, ModelError> {
    if !(m_bar.is_finite() && m_bar > 0.0) {
        return Err(ModelError::InvalidParameter {
            name: "m_bar",
            value: m_bar,
        });
    }
    if !(r_max_kpc.is_finite() && r_max_kpc > 0.0) {
        return Err(ModelError::InvalidParameter {
            name: "r_max",
            value: r_max_kpc,
        });
    }
    let r_pc = r_max_kpc * PC_PER_KPC;
    Ok(m_bar / (std::f64::consts::PI * r_pc * r_pc))
}

/// Newtonian mass enclosed at radius `r` (kpc) for circular velocity `v` (km/s).
pub fn enclosed_mass(v: f64, r: f64) -> f64 {
    v * v * r / G_KPC
}

/// Single-line prediction. `sigma` must be > 0.
pub fn alpha_linear(sigma: f64) -> f64 {
    ALPHA_LINEAR_INTERCEPT + ALPHA_LINEAR_SLOPE * sigma.log10()
}

/// Three-phase prediction. `sigma` must be > 0.
pub fn alpha_refined(sigma: f64) -> f64 {
    let (intercept, slope) = DensityPhase::from_sigma(sigma).alpha_line();
    intercept + slope * sigma.log10()
}

pub fn kappa_refined(sigma: f64) -> f64 {
    DensityPhase::from_sigma(sigma).kappa()
}

pub fn classify_regime(sigma: f64) -> DensityRegime {
    if sigma < 10.0 {
        DensityRegime::Enhanced
    } else if sigma < 100.0 {
        DensityRegime::Active
    } else if sigma < 1000.0 {
        DensityRegime::Transitional
    } else {
        DensityRegime::Newtonian
    }
}

pub fn classify_curve(alpha: f64) -> CurveShape {
    if alpha > 1.5 {
        CurveShape::Rising
    } else if alpha > 1.0 {
        CurveShape::FlatRising
    } else if alpha > 0.5 {
        CurveShape::FlatFalling
    } else {
        CurveShape::Falling
    }
}

/// Everything the density relation says about one galaxy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DensityEstimate {
    /// Baryonic mass (M_sun).
    pub m_bar: f64,
    /// Surface density (M_sun/pc^2).
    pub sigma: f64,
    pub phase: DensityPhase,
    pub regime: DensityRegime,
    pub alpha_linear: f64,
    pub alpha_refined: f64,
    pub kappa: f64,
    /// Shape implied by `alpha_refined`.
    pub shape: CurveShape,
}

impl DensityEstimate {
    pub fn new(m_bar: f64, r_max_kpc: f64) -> Result<Self, ModelError> {
        let sigma = surface_density(m_bar, r_max_kpc)?;
        let alpha_refined = alpha_refined(sigma);
        Ok(Self {
            m_bar,
            sigma,
            phase: DensityPhase::from_sigma(sigma),
            regime: classify_regime(sigma),
            alpha_linear: alpha_linear(sigma),
            alpha_refined,
            kappa: kappa_refined(sigma),
            shape: classify_curve(alpha_refined),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_boundaries_are_half_open() {
        assert_eq!(DensityPhase::from_sigma(0.049_999), DensityPhase::GeometricDominant);
        assert_eq!(DensityPhase::from_sigma(PHASE_I_MAX), DensityPhase::Transitional);
        assert_eq!(DensityPhase::from_sigma(0.499_999), DensityPhase::Transitional);
        assert_eq!(DensityPhase::from_sigma(PHASE_II_MAX), DensityPhase::BaryonDominant);
        assert_eq!(kappa_refined(0.01), 0.55);
        assert_eq!(kappa_refined(0.05), 0.75);
        assert_eq!(kappa_refined(0.5), 0.95);
    }

    #[test]
    fn alpha_at_phase_boundaries() {
        // log10(0.05) = -1.30103, log10(0.5) = -0.30103
        let lg05 = 0.05_f64.log10();
        let lg5 = 0.5_f64.log10();
        assert!((alpha_refined(0.05) - (2.20 - 0.50 * lg05)).abs() < 1e-12);
        assert!((alpha_refined(0.05) - 2.850515).abs() < 1e-6);
        assert!((alpha_refined(0.5) - 1.460206).abs() < 1e-6);
        // Just below each boundary the previous phase applies.
        assert!((alpha_refined(0.05 - 1e-12) - (2.80 - 0.32 * lg05)).abs() < 1e-9);
        assert!((alpha_refined(0.5 - 1e-12) - (2.20 - 0.50 * lg5)).abs() < 1e-9);
    }

    #[test]
    fn linear_relation_values() {
        assert!((alpha_linear(1.0) - 1.972).abs() < 1e-12);
        assert!((alpha_linear(10.0) - 1.485).abs() < 1e-12);
        assert!((alpha_linear(100.0) - 0.998).abs() < 1e-12);
    }

    #[test]
    fn classifiers() {
        assert_eq!(classify_regime(5.0), DensityRegime::Enhanced);
        assert_eq!(classify_regime(10.0), DensityRegime::Active);
        assert_eq!(classify_regime(500.0), DensityRegime::Transitional);
        assert_eq!(classify_regime(1000.0), DensityRegime::Newtonian);

        assert_eq!(classify_curve(1.6), CurveShape::Rising);
        assert_eq!(classify_curve(1.5), CurveShape::FlatRising);
        assert_eq!(classify_curve(0.8), CurveShape::FlatFalling);
        assert_eq!(classify_curve(0.5), CurveShape::Falling);
    }

    #[test]
    fn surface_density_units() {
        // 1e9 M_sun inside 10 kpc: 1e9 / (π 1e8) pc^-2.
        let sigma = surface_density(1e9, 10.0).unwrap();
        assert!((sigma - 10.0 / std::f64::consts::PI).abs() < 1e-12);
        assert!(surface_density(0.0, 10.0).is_err());
        assert!(matches!(
            surface_density(1e9, -1.0),
            Err(ModelError::InvalidParameter { name: "r_max", .. })
        ));
    }

    #[test]
    fn estimate_is_consistent() {
        let m = enclosed_mass(100.0, 20.0);
        let est = DensityEstimate::new(m, 20.0).unwrap();
        assert!((est.sigma - surface_density(m, 20.0).unwrap()).abs() < 1e-15);
        assert_eq!(est.phase, DensityPhase::from_sigma(est.sigma));
        assert_eq!(est.shape, classify_curve(est.alpha_refined));
        assert_eq!(est.kappa, est.phase.kappa());
    }
}
