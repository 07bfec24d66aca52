//! Physical constants and model defaults.
//!
//! Galactic units throughout: radii in kpc, velocities in km/s, accelerations
//! in (km/s)^2/kpc.

/// Acceleration scale `a0` in (km/s)^2/kpc.
///
/// Equivalent to `A0_SI` (1.2e-10 m/s^2): `1.2e-10 * 3.0857e19 / 1e6 ≈ 3702.8`,
/// fixed at 3703 for every model evaluation and for `r_halo = V_flat^2 / a0`.
pub const A0: f64 = 3703.0;

/// Acceleration scale in m/s^2.
pub const A0_SI: f64 = 1.2e-10;

/// Metres per kiloparsec.
pub const KPC_M: f64 = 3.0857e19;

/// Newton's constant in kpc (km/s)^2 / M_sun.
pub const G_KPC: f64 = 4.302e-6;

/// Default stellar disk mass-to-light ratio at 3.6 micron.
pub const ML_DISK_DEFAULT: f64 = 0.5;

/// Default stellar bulge mass-to-light ratio at 3.6 micron.
pub const ML_BUL_DEFAULT: f64 = 0.7;

/// Default lower bound of the M/L search space (must stay > 0).
pub const ML_MIN_DEFAULT: f64 = 0.05;

/// Default upper bound of the M/L search space.
pub const ML_MAX_DEFAULT: f64 = 5.0;

/// Velocity error floor (km/s) used by the chi-squared objective.
pub const CHI2_ERROR_FLOOR: f64 = 0.5;

/// Hard minimum number of points for rms / R^2 to be meaningful.
pub const MIN_FIT_POINTS: usize = 2;

/// Number of outermost points averaged into `V_flat`.
pub const V_FLAT_TAIL: usize = 3;

/// Points with `g_bar < DEEP_REGIME_FRACTION * a0` count as deep-regime.
pub const DEEP_REGIME_FRACTION: f64 = 0.1;
