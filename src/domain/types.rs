//! Shared domain types.
//!
//! These types are kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting and benchmarking
//! - exported to JSON/CSV
//! - shared safely across rayon workers (all are `Send + Sync`)

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::domain::constants::{A0, ML_BUL_DEFAULT, ML_DISK_DEFAULT, V_FLAT_TAIL};
use crate::error::ModelError;

/// Which acceleration law maps `g_bar` to `g_obs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum AccelerationLaw {
    /// `g_obs = sqrt(g_bar^2 + a0 * g_bar)`.
    #[value(name = "bridge")]
    GeometricBridge,
    /// `g_obs = g_bar` (baryons only, no missing mass).
    Newtonian,
    /// Radial acceleration relation (McGaugh et al. 2016):
    /// `g_obs = g_bar / (1 - exp(-sqrt(g_bar / a0)))`.
    Rar,
}

impl AccelerationLaw {
    pub const ALL: [AccelerationLaw; 3] = [
        AccelerationLaw::GeometricBridge,
        AccelerationLaw::Newtonian,
        AccelerationLaw::Rar,
    ];

    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            AccelerationLaw::GeometricBridge => "Geometric bridge",
            AccelerationLaw::Newtonian => "Newton (no DM)",
            AccelerationLaw::Rar => "RAR (McGaugh+2016)",
        }
    }

    /// Short machine-friendly label (CSV columns, JSON keys).
    pub fn key(self) -> &'static str {
        match self {
            AccelerationLaw::GeometricBridge => "bridge",
            AccelerationLaw::Newtonian => "newtonian",
            AccelerationLaw::Rar => "rar",
        }
    }
}

/// Which mass-to-light ratios the fitter is allowed to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FitMode {
    /// Use the caller's `ml_disk` / `ml_bul` unchanged (zero free parameters).
    Fixed,
    /// Fit `ml_disk`; `ml_bul` stays at the caller's value.
    Disk,
    /// Fit one M/L shared by disk and bulge.
    Shared,
    /// Fit `ml_disk` and `ml_bul` independently.
    DiskBulge,
}

impl FitMode {
    /// Number of free parameters.
    pub fn free_params(self) -> usize {
        match self {
            FitMode::Fixed => 0,
            FitMode::Disk | FitMode::Shared => 1,
            FitMode::DiskBulge => 2,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            FitMode::Fixed => "fixed M/L",
            FitMode::Disk => "fitted disk M/L",
            FitMode::Shared => "fitted shared M/L",
            FitMode::DiskBulge => "fitted disk+bulge M/L",
        }
    }

    /// Same spelling as the CLI value.
    pub fn key(self) -> &'static str {
        match self {
            FitMode::Fixed => "fixed",
            FitMode::Disk => "disk",
            FitMode::Shared => "shared",
            FitMode::DiskBulge => "disk-bulge",
        }
    }
}

/// Residual objective minimised by the fitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Objective {
    /// Root-mean-square velocity residual (unweighted).
    Rms,
    /// Sum of squared residuals normalised by the (floored) velocity errors.
    Chi2,
}

/// Outcome tag of a fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FitStatus {
    /// No search was run (`FitMode::Fixed`).
    Fixed,
    /// Refinement met its tolerance.
    Converged,
    /// Refinement stopped at its iteration cap; the best point found is returned.
    IterationCap,
}

impl FitStatus {
    pub fn label(self) -> &'static str {
        match self {
            FitStatus::Fixed => "fixed",
            FitStatus::Converged => "converged",
            FitStatus::IterationCap => "iteration-cap",
        }
    }
}

/// Coarse morphology buckets derived from the numeric Hubble type `T`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MorphologyGroup {
    /// S0-Sab (`T` in 0..=2).
    Early,
    /// Sb-Sd (`T` in 3..=7).
    Disk,
    /// Sdm-Im-BCD (`T` in 8..=11).
    Irregular,
    /// No (valid) Hubble type available.
    Unclassified,
}

impl MorphologyGroup {
    pub fn from_hubble_type(t: Option<u8>) -> Self {
        match t {
            Some(0..=2) => MorphologyGroup::Early,
            Some(3..=7) => MorphologyGroup::Disk,
            Some(8..=11) => MorphologyGroup::Irregular,
            _ => MorphologyGroup::Unclassified,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MorphologyGroup::Early => "early",
            MorphologyGroup::Disk => "disk",
            MorphologyGroup::Irregular => "irregular",
            MorphologyGroup::Unclassified => "unclassified",
        }
    }
}

/// Mass-model parameters for one evaluation.
///
/// `a0` is carried explicitly so callers (and tests) can try other values;
/// fitting only ever moves the mass-to-light ratios.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelParameters {
    pub a0: f64,
    pub ml_disk: f64,
    pub ml_bul: f64,
}

impl Default for ModelParameters {
    fn default() -> Self {
        Self {
            a0: A0,
            ml_disk: ML_DISK_DEFAULT,
            ml_bul: ML_BUL_DEFAULT,
        }
    }
}

impl ModelParameters {
    pub fn new(a0: f64, ml_disk: f64, ml_bul: f64) -> Result<Self, ModelError> {
        let params = Self { a0, ml_disk, ml_bul };
        params.validate()?;
        Ok(params)
    }

    /// Same `a0`, different mass-to-light ratios.
    pub fn with_ml(self, ml_disk: f64, ml_bul: f64) -> Self {
        Self {
            ml_disk,
            ml_bul,
            ..self
        }
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if !(self.a0.is_finite() && self.a0 > 0.0) {
            return Err(ModelError::InvalidParameter {
                name: "a0",
                value: self.a0,
            });
        }
        if !(self.ml_disk.is_finite() && self.ml_disk >= 0.0) {
            return Err(ModelError::InvalidParameter {
                name: "ml_disk",
                value: self.ml_disk,
            });
        }
        if !(self.ml_bul.is_finite() && self.ml_bul >= 0.0) {
            return Err(ModelError::InvalidParameter {
                name: "ml_bul",
                value: self.ml_bul,
            });
        }
        Ok(())
    }
}

/// One measured radius of a rotation curve (loader row after normalization).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    /// Radius (kpc).
    pub radius: f64,
    /// Observed rotation velocity (km/s).
    pub v_obs: f64,
    /// Uncertainty on `v_obs` (km/s).
    pub v_obs_err: f64,
    /// Gas contribution (km/s).
    pub v_gas: f64,
    /// Stellar disk contribution at M/L = 1 (km/s).
    pub v_disk: f64,
    /// Bulge contribution at M/L = 1 (km/s).
    pub v_bul: f64,
}

/// Per-galaxy metadata not used by the model itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GalaxyMeta {
    /// Distance (Mpc).
    pub distance_mpc: Option<f64>,
    /// Numeric Hubble type `T` (0 = S0 ... 11 = BCD).
    pub hubble_type: Option<u8>,
}

/// One galaxy's rotation-curve measurement set.
///
/// Constructed once through a validating constructor and read-only afterwards:
/// all sequences have the same length (≥ 1), radii are finite, positive and
/// strictly increasing, velocity errors are non-negative, and every value is
/// finite.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GalaxyCurve {
    name: String,
    radii: Vec<f64>,
    v_obs: Vec<f64>,
    v_obs_err: Vec<f64>,
    v_gas: Vec<f64>,
    v_disk: Vec<f64>,
    v_bul: Vec<f64>,
    meta: GalaxyMeta,
}

impl GalaxyCurve {
    /// Build a curve from per-radius points (in radius order).
    pub fn from_points(
        name: impl Into<String>,
        points: &[CurvePoint],
        meta: GalaxyMeta,
    ) -> Result<Self, ModelError> {
        let n = points.len();
        let mut radii = Vec::with_capacity(n);
        let mut v_obs = Vec::with_capacity(n);
        let mut v_obs_err = Vec::with_capacity(n);
        let mut v_gas = Vec::with_capacity(n);
        let mut v_disk = Vec::with_capacity(n);
        let mut v_bul = Vec::with_capacity(n);
        for p in points {
            radii.push(p.radius);
            v_obs.push(p.v_obs);
            v_obs_err.push(p.v_obs_err);
            v_gas.push(p.v_gas);
            v_disk.push(p.v_disk);
            v_bul.push(p.v_bul);
        }
        Self::from_columns(name, radii, v_obs, v_obs_err, v_gas, v_disk, v_bul, meta)
    }

    /// Build a curve from aligned columns.
    #[allow(clippy::too_many_arguments)]
    pub fn from_columns(
        name: impl Into<String>,
        radii: Vec<f64>,
        v_obs: Vec<f64>,
        v_obs_err: Vec<f64>,
        v_gas: Vec<f64>,
        v_disk: Vec<f64>,
        v_bul: Vec<f64>,
        meta: GalaxyMeta,
    ) -> Result<Self, ModelError> {
        let n = radii.len();
        if n == 0 {
            return Err(ModelError::EmptyCurve);
        }

        let columns: [(&'static str, &[f64]); 5] = [
            ("v_obs", &v_obs),
            ("v_obs_err", &v_obs_err),
            ("v_gas", &v_gas),
            ("v_disk", &v_disk),
            ("v_bul", &v_bul),
        ];
        for (field, values) in columns {
            if values.len() != n {
                return Err(ModelError::LengthMismatch {
                    field,
                    expected: n,
                    actual: values.len(),
                });
            }
            if let Some(index) = values.iter().position(|v| !v.is_finite()) {
                return Err(ModelError::NonFinite { field, index });
            }
        }

        for (index, &radius) in radii.iter().enumerate() {
            if !(radius.is_finite() && radius > 0.0) {
                return Err(ModelError::NonPositiveRadius { index, radius });
            }
            if index > 0 && radius <= radii[index - 1] {
                return Err(ModelError::NonIncreasingRadii {
                    index,
                    previous: radii[index - 1],
                    radius,
                });
            }
        }

        if let Some(index) = v_obs_err.iter().position(|&e| e < 0.0) {
            return Err(ModelError::NegativeError {
                index,
                value: v_obs_err[index],
            });
        }

        Ok(Self {
            name: name.into(),
            radii,
            v_obs,
            v_obs_err,
            v_gas,
            v_disk,
            v_bul,
            meta,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.radii.len()
    }

    /// Always false for a constructed curve; provided for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.radii.is_empty()
    }

    pub fn radii(&self) -> &[f64] {
        &self.radii
    }

    pub fn v_obs(&self) -> &[f64] {
        &self.v_obs
    }

    pub fn v_obs_err(&self) -> &[f64] {
        &self.v_obs_err
    }

    pub fn v_gas(&self) -> &[f64] {
        &self.v_gas
    }

    pub fn v_disk(&self) -> &[f64] {
        &self.v_disk
    }

    pub fn v_bul(&self) -> &[f64] {
        &self.v_bul
    }

    pub fn meta(&self) -> &GalaxyMeta {
        &self.meta
    }

    pub fn morphology(&self) -> MorphologyGroup {
        MorphologyGroup::from_hubble_type(self.meta.hubble_type)
    }

    /// Outermost measured radius (kpc).
    pub fn r_max(&self) -> f64 {
        self.radii[self.radii.len() - 1]
    }

    /// Asymptotic velocity: mean of the outermost `V_FLAT_TAIL` observed points.
    pub fn v_flat(&self) -> f64 {
        let start = self.v_obs.len().saturating_sub(V_FLAT_TAIL);
        let tail = &self.v_obs[start..];
        tail.iter().sum::<f64>() / tail.len() as f64
    }

    /// True if any point has a non-zero bulge component.
    pub fn has_bulge(&self) -> bool {
        self.v_bul.iter().any(|v| *v != 0.0)
    }
}

/// Fit output for one galaxy and one parameter choice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub law: AccelerationLaw,
    pub mode: FitMode,
    pub ml_disk: f64,
    pub ml_bul: f64,
    /// Root-mean-square velocity residual (km/s).
    pub rms: f64,
    /// Chi-squared against the floored velocity errors.
    pub chi2: f64,
    /// Coefficient of determination; `None` when the observed curve has zero
    /// variance and R^2 is undefined.
    pub r_squared: Option<f64>,
    /// Predicted velocity at each radius (aligned with the curve).
    pub predicted_velocities: Vec<f64>,
    pub n_points: usize,
    pub status: FitStatus,
    /// Refinement iterations spent (0 for fixed fits).
    pub iterations: usize,
}

impl FitResult {
    pub fn is_capped(&self) -> bool {
        self.status == FitStatus::IterationCap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(radius: f64, v: f64) -> CurvePoint {
        CurvePoint {
            radius,
            v_obs: v,
            v_obs_err: 2.0,
            v_gas: 10.0,
            v_disk: 40.0,
            v_bul: 0.0,
        }
    }

    #[test]
    fn curve_accepts_valid_points() {
        let points = [point(1.0, 50.0), point(2.0, 60.0), point(4.0, 70.0), point(8.0, 72.0)];
        let curve = GalaxyCurve::from_points("G1", &points, GalaxyMeta::default()).unwrap();
        assert_eq!(curve.len(), 4);
        assert_eq!(curve.name(), "G1");
        assert!((curve.r_max() - 8.0).abs() < 1e-12);
        assert!((curve.v_flat() - (60.0 + 70.0 + 72.0) / 3.0).abs() < 1e-12);
        assert!(!curve.has_bulge());
        assert_eq!(curve.morphology(), MorphologyGroup::Unclassified);
    }

    #[test]
    fn curve_rejects_empty() {
        let err = GalaxyCurve::from_points("G", &[], GalaxyMeta::default()).unwrap_err();
        assert_eq!(err, ModelError::EmptyCurve);
    }

    #[test]
    fn curve_rejects_non_increasing_radii() {
        let points = [point(1.0, 50.0), point(1.0, 55.0)];
        let err = GalaxyCurve::from_points("G", &points, GalaxyMeta::default()).unwrap_err();
        assert!(matches!(err, ModelError::NonIncreasingRadii { index: 1, .. }));
    }

    #[test]
    fn curve_rejects_non_positive_radius() {
        let points = [point(0.0, 50.0)];
        let err = GalaxyCurve::from_points("G", &points, GalaxyMeta::default()).unwrap_err();
        assert!(matches!(err, ModelError::NonPositiveRadius { index: 0, .. }));
    }

    #[test]
    fn curve_rejects_negative_error_and_mismatch() {
        let mut p = point(1.0, 50.0);
        p.v_obs_err = -1.0;
        let err = GalaxyCurve::from_points("G", &[p], GalaxyMeta::default()).unwrap_err();
        assert!(matches!(err, ModelError::NegativeError { index: 0, .. }));

        let err = GalaxyCurve::from_columns(
            "G",
            vec![1.0, 2.0],
            vec![10.0, 20.0],
            vec![1.0],
            vec![0.0, 0.0],
            vec![0.0, 0.0],
            vec![0.0, 0.0],
            GalaxyMeta::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ModelError::LengthMismatch {
                field: "v_obs_err",
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn parameters_validate() {
        assert!(ModelParameters::default().validate().is_ok());
        assert!(ModelParameters::new(0.0, 0.5, 0.7).is_err());
        assert!(ModelParameters::new(A0, -0.1, 0.7).is_err());
        assert!(ModelParameters::new(A0, 0.5, f64::NAN).is_err());
    }

    #[test]
    fn morphology_groups_follow_hubble_type() {
        assert_eq!(MorphologyGroup::from_hubble_type(Some(0)), MorphologyGroup::Early);
        assert_eq!(MorphologyGroup::from_hubble_type(Some(5)), MorphologyGroup::Disk);
        assert_eq!(MorphologyGroup::from_hubble_type(Some(10)), MorphologyGroup::Irregular);
        assert_eq!(MorphologyGroup::from_hubble_type(Some(12)), MorphologyGroup::Unclassified);
        assert_eq!(MorphologyGroup::from_hubble_type(None), MorphologyGroup::Unclassified);
    }
}
