//! Rotation-curve prediction from baryonic mass models.
//!
//! For each radius:
//!
//! 1. `v_bar = sqrt(max(0, v_gas |v_gas| + ml_disk * v_disk^2 + ml_bul * v_bul^2))`
//! 2. `g_bar = v_bar^2 / r`
//! 3. `g_obs = law(g_bar, a0)`
//! 4. `v_pred = sqrt(g_obs * r)`
//!
//! A non-positive radius is a data contract violation and is reported as an
//! error, never turned into NaN.

use serde::Serialize;

use crate::domain::{AccelerationLaw, G_KPC, GalaxyCurve, ModelParameters};
use crate::error::ModelError;
use crate::models::law::{boost, g_obs};

/// Per-radius intermediate quantities of one model evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelTrace {
    pub v_bar: Vec<f64>,
    pub g_bar: Vec<f64>,
    pub g_obs: Vec<f64>,
    pub v_pred: Vec<f64>,
}

impl ModelTrace {
    /// Geometric-bridge boost factor at each radius.
    pub fn boost(&self, a0: f64) -> Vec<f64> {
        self.g_bar.iter().map(|&g| boost(g, a0)).collect()
    }
}

/// Newtonian circular velocity of the baryons.
///
/// A negative `v_gas` (SPARC tables carry a few, where the gas force points
/// outward) subtracts `v_gas^2`; a net negative radicand gives 0.
pub fn baryonic_velocity(v_gas: f64, v_disk: f64, v_bul: f64, ml_disk: f64, ml_bul: f64) -> f64 {
    let v2 = v_gas * v_gas.abs() + ml_disk * v_disk * v_disk + ml_bul * v_bul * v_bul;
    v2.max(0.0).sqrt()
}

/// Evaluate the model over aligned slices and keep every intermediate.
pub fn predict_trace(
    law: AccelerationLaw,
    radii: &[f64],
    v_gas: &[f64],
    v_disk: &[f64],
    v_bul: &[f64],
    params: &ModelParameters,
) -> Result<ModelTrace, ModelError> {
    params.validate()?;
    let n = radii.len();
    for (field, values) in [("v_gas", v_gas), ("v_disk", v_disk), ("v_bul", v_bul)] {
        if values.len() != n {
            return Err(ModelError::LengthMismatch {
                field,
                expected: n,
                actual: values.len(),
            });
        }
    }

    let mut trace = ModelTrace {
        v_bar: Vec::with_capacity(n),
        g_bar: Vec::with_capacity(n),
        g_obs: Vec::with_capacity(n),
        v_pred: Vec::with_capacity(n),
    };

    for i in 0..n {
        let r = radii[i];
        if !(r.is_finite() && r > 0.0) {
            return Err(ModelError::NonPositiveRadius { index: i, radius: r });
        }
        let v_bar = baryonic_velocity(v_gas[i], v_disk[i], v_bul[i], params.ml_disk, params.ml_bul);
        let g_bar = v_bar * v_bar / r;
        let g = g_obs(law, g_bar, params.a0);
        let v_pred = (g * r).max(0.0).sqrt();

        trace.v_bar.push(v_bar);
        trace.g_bar.push(g_bar);
        trace.g_obs.push(g);
        trace.v_pred.push(v_pred);
    }

    Ok(trace)
}

/// Predicted velocities over aligned slices.
pub fn predict_velocities(
    law: AccelerationLaw,
    radii: &[f64],
    v_gas: &[f64],
    v_disk: &[f64],
    v_bul: &[f64],
    params: &ModelParameters,
) -> Result<Vec<f64>, ModelError> {
    predict_trace(law, radii, v_gas, v_disk, v_bul, params).map(|t| t.v_pred)
}

/// Full model trace for a galaxy.
pub fn trace_curve(
    curve: &GalaxyCurve,
    law: AccelerationLaw,
    params: &ModelParameters,
) -> Result<ModelTrace, ModelError> {
    predict_trace(
        law,
        curve.radii(),
        curve.v_gas(),
        curve.v_disk(),
        curve.v_bul(),
        params,
    )
}

/// Predicted rotation curve for a galaxy.
pub fn predict_curve(
    curve: &GalaxyCurve,
    law: AccelerationLaw,
    params: &ModelParameters,
) -> Result<Vec<f64>, ModelError> {
    trace_curve(curve, law, params).map(|t| t.v_pred)
}

/// Radius where `g_bar` drops to `a0`: `r_halo = V_flat^2 / a0` (kpc).
pub fn halo_boundary_radius(v_flat: f64, a0: f64) -> f64 {
    v_flat * v_flat / a0
}

/// Baryonic mass from the Tully–Fisher relation: `M_bar = V_flat^4 / (G * a0)`
/// in solar masses.
pub fn btfr_baryonic_mass(v_flat: f64, a0: f64) -> f64 {
    v_flat.powi(4) / (G_KPC * a0)
}
