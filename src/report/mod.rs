//! Reporting utilities: per-law comparison and terminal formatting.

use crate::domain::{AccelerationLaw, FitResult, GalaxyCurve, ModelParameters};
use crate::error::AppError;
use crate::math::rms;
use crate::models::predict_curve;

pub mod format;

pub use format::*;

/// rms of every acceleration law at the fitted M/L of `fit`.
pub fn compare_laws(
    curve: &GalaxyCurve,
    fit: &FitResult,
    base: &ModelParameters,
) -> Result<Vec<(AccelerationLaw, f64)>, AppError> {
    let params = base.with_ml(fit.ml_disk, fit.ml_bul);
    let mut out = Vec::with_capacity(AccelerationLaw::ALL.len());
    for law in AccelerationLaw::ALL {
        let v_pred = predict_curve(curve, law, &params)?;
        let value = rms(curve.v_obs(), &v_pred);
        if !value.is_finite() {
            return Err(AppError::new(4, "Non-finite model prediction during law comparison."));
        }
        out.push((law, value));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{SynthConfig, generate_catalogue};
    use crate::fit::{FitOptions, fit_galaxy};

    #[test]
    fn fitted_law_matches_fit_rms() {
        let cat = generate_catalogue(&SynthConfig {
            n_galaxies: 1,
            ..SynthConfig::default()
        })
        .unwrap();
        let curve = &cat.galaxies[0];
        let opts = FitOptions::default();
        let fit = fit_galaxy(curve, &opts).unwrap();

        let rows = compare_laws(curve, &fit, &opts.initial).unwrap();
        assert_eq!(rows.len(), 3);
        let (law, value) = rows[0];
        assert_eq!(law, AccelerationLaw::GeometricBridge);
        assert!((value - fit.rms).abs() < 1e-9);
        // Baryons alone fall short of a bridge-generated curve.
        assert!(rows[1].1 > value);
    }
}
