//! Seeded synthetic rotation-curve catalogues.
//!
//! Each mock galaxy gets smooth gas, disk and (sometimes) bulge velocity
//! profiles, a known disk/bulge M/L, and an observed curve equal to the
//! geometric-bridge prediction plus Gaussian noise. Useful for exercising the
//! full pipeline without the SPARC file and for checking that fits recover
//! the injected M/L.

use std::fs::File;
use std::path::Path;

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};

use crate::domain::{A0, AccelerationLaw, CurvePoint, GalaxyCurve, GalaxyMeta, ModelParameters};
use crate::error::AppError;
use crate::io::ingest::V_OBS_MIN;
use crate::models::predict_velocities;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthConfig {
    pub n_galaxies: usize,
    pub min_points: usize,
    pub max_points: usize,
    /// Standard deviation of the velocity noise (km/s); also the quoted error
    /// (never below 1 km/s).
    pub noise_kms: f64,
    /// Injected disk M/L is drawn uniformly from this range.
    pub ml_disk_range: (f64, f64),
    /// Injected bulge M/L range.
    pub ml_bul_range: (f64, f64),
    /// Probability that a galaxy has a bulge.
    pub bulge_fraction: f64,
    pub a0: f64,
    pub seed: u64,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            n_galaxies: 50,
            min_points: 8,
            max_points: 30,
            noise_kms: 3.0,
            ml_disk_range: (0.3, 0.9),
            ml_bul_range: (0.5, 0.9),
            bulge_fraction: 0.3,
            a0: A0,
            seed: 42,
        }
    }
}

/// Injected parameters of one mock galaxy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthTruth {
    pub name: String,
    pub ml_disk: f64,
    pub ml_bul: f64,
    pub has_bulge: bool,
}

#[derive(Debug, Clone)]
pub struct SyntheticCatalogue {
    pub galaxies: Vec<GalaxyCurve>,
    pub truths: Vec<SynthTruth>,
}

/// CSV row; field names match the CSV ingest schema.
#[derive(Debug, Serialize)]
struct CatalogueRow<'a> {
    galaxy: &'a str,
    dist: f64,
    r: f64,
    v_obs: f64,
    e_vobs: f64,
    v_gas: f64,
    v_disk: f64,
    v_bul: f64,
    t: Option<u8>,
}

pub fn generate_catalogue(config: &SynthConfig) -> Result<SyntheticCatalogue, AppError> {
    validate(config)?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let normal = Normal::new(0.0, config.noise_kms)
        .map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;
    let err = config.noise_kms.max(1.0);

    let mut galaxies = Vec::with_capacity(config.n_galaxies);
    let mut truths = Vec::with_capacity(config.n_galaxies);

    for i in 0..config.n_galaxies {
        let name = format!("SYN{:03}", i + 1);
        let n = rng.gen_range(config.min_points..=config.max_points);

        // Profile shape parameters.
        let h = rng.gen_range(1.0..5.0);
        let disk_peak = rng.gen_range(40.0..200.0);
        let gas_peak = rng.gen_range(10.0..40.0);
        let has_bulge = rng.gen_bool(config.bulge_fraction);
        let (bulge_peak, r_bul) = if has_bulge {
            (rng.gen_range(50.0..150.0), rng.gen_range(0.3..1.0))
        } else {
            (0.0, 1.0)
        };
        let ml_disk = rng.gen_range(config.ml_disk_range.0..=config.ml_disk_range.1);
        let ml_bul = if has_bulge {
            rng.gen_range(config.ml_bul_range.0..=config.ml_bul_range.1)
        } else {
            ModelParameters::default().ml_bul
        };
        let r_max = h * rng.gen_range(4.0..6.0);
        let distance = rng.gen_range(2.0..30.0);
        let hubble_type = rng.gen_range(0u8..=11);

        let radii: Vec<f64> = (1..=n).map(|k| r_max * k as f64 / n as f64).collect();
        let v_disk: Vec<f64> = radii
            .iter()
            .map(|r| disk_peak * (1.0 - (-r / h).exp()) * (-r / (8.0 * h)).exp())
            .collect();
        let v_gas: Vec<f64> = radii
            .iter()
            .map(|r| gas_peak * (1.0 - (-r / (2.0 * h)).exp()))
            .collect();
        let v_bul: Vec<f64> = radii
            .iter()
            .map(|r| bulge_peak * (r / r_bul).sqrt() * (-r / (2.0 * r_bul)).exp())
            .collect();

        let params = ModelParameters::new(config.a0, ml_disk, ml_bul)?;
        let model = predict_velocities(
            AccelerationLaw::GeometricBridge,
            &radii,
            &v_gas,
            &v_disk,
            &v_bul,
            &params,
        )?;

        let points: Vec<CurvePoint> = (0..n)
            .map(|k| CurvePoint {
                radius: radii[k],
                v_obs: (model[k] + normal.sample(&mut rng)).max(V_OBS_MIN + 1.0),
                v_obs_err: err,
                v_gas: v_gas[k],
                v_disk: v_disk[k],
                v_bul: v_bul[k],
            })
            .collect();

        let meta = GalaxyMeta {
            distance_mpc: Some(distance),
            hubble_type: Some(hubble_type),
        };
        galaxies.push(GalaxyCurve::from_points(name.clone(), &points, meta)?);
        truths.push(SynthTruth {
            name,
            ml_disk,
            ml_bul,
            has_bulge,
        });
    }

    Ok(SyntheticCatalogue { galaxies, truths })
}

fn validate(config: &SynthConfig) -> Result<(), AppError> {
    if config.n_galaxies == 0 {
        return Err(AppError::new(2, "Galaxy count must be > 0."));
    }
    if config.min_points < 3 || config.max_points < config.min_points {
        return Err(AppError::new(
            2,
            "Points per galaxy must satisfy 3 <= min_points <= max_points.",
        ));
    }
    if !(config.noise_kms.is_finite() && config.noise_kms >= 0.0) {
        return Err(AppError::new(2, "Noise level must be finite and >= 0."));
    }
    for (label, (lo, hi)) in [("disk", config.ml_disk_range), ("bulge", config.ml_bul_range)] {
        if !(lo.is_finite() && hi.is_finite() && lo >= 0.0 && hi >= lo) {
            return Err(AppError::new(2, format!("Invalid {label} M/L range.")));
        }
    }
    if !(0.0..=1.0).contains(&config.bulge_fraction) {
        return Err(AppError::new(2, "Bulge fraction must be in [0, 1]."));
    }
    Ok(())
}

/// Write a catalogue in the CSV ingest format.
pub fn write_catalogue_csv(path: &Path, catalogue: &SyntheticCatalogue) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create catalogue CSV '{}': {e}", path.display())))?;
    let mut writer = csv::Writer::from_writer(file);

    for g in &catalogue.galaxies {
        let dist = g.meta().distance_mpc.unwrap_or(f64::NAN);
        for k in 0..g.len() {
            writer
                .serialize(CatalogueRow {
                    galaxy: g.name(),
                    dist,
                    r: g.radii()[k],
                    v_obs: g.v_obs()[k],
                    e_vobs: g.v_obs_err()[k],
                    v_gas: g.v_gas()[k],
                    v_disk: g.v_disk()[k],
                    v_bul: g.v_bul()[k],
                    t: g.meta().hubble_type,
                })
                .map_err(|e| AppError::new(2, format!("Failed to write catalogue CSV row: {e}")))?;
        }
    }

    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to write catalogue CSV: {e}")))?;
    Ok(())
}
