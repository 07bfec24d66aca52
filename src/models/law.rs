//! Acceleration laws `g_obs(g_bar)`.
//!
//! All laws take the baryonic (Newtonian) acceleration `g_bar` and the scale
//! `a0` in (km/s)^2/kpc and return the predicted observed acceleration in the
//! same units. Negative `g_bar` is clamped to zero.

use crate::domain::AccelerationLaw;

/// Evaluate `law` at `g_bar`.
pub fn g_obs(law: AccelerationLaw, g_bar: f64, a0: f64) -> f64 {
    match law {
        AccelerationLaw::GeometricBridge => geometric_bridge(g_bar, a0),
        AccelerationLaw::Newtonian => g_bar.max(0.0),
        AccelerationLaw::Rar => rar(g_bar, a0),
    }
}

/// The geometric bridge: `g_obs = sqrt(g_bar^2 + a0 * g_bar)`.
///
/// - `g_bar ≫ a0`: `g_obs → g_bar` (Newtonian)
/// - `g_bar ≪ a0`: `g_obs → sqrt(a0 * g_bar)` (flat rotation curve)
/// - `g_bar = a0`: `g_obs = a0 * sqrt(2)`
pub fn geometric_bridge(g_bar: f64, a0: f64) -> f64 {
    let g = g_bar.max(0.0);
    (g * g + a0 * g).sqrt()
}

/// Radial acceleration relation: `g_obs = g_bar / (1 - exp(-sqrt(g_bar / a0)))`.
///
/// `1 - exp(-s)` is computed as `-expm1(-s)` to stay accurate for small `s`.
/// The limit at `g_bar → 0` is `sqrt(a0 * g_bar) → 0`.
pub fn rar(g_bar: f64, a0: f64) -> f64 {
    if g_bar <= 0.0 {
        return 0.0;
    }
    let s = (g_bar / a0).sqrt();
    let denom = -(-s).exp_m1();
    if denom <= 0.0 {
        return (a0 * g_bar).sqrt();
    }
    g_bar / denom
}

/// Boost factor `sqrt(g_obs / g_bar)` of the geometric bridge, i.e.
/// `(1 + a0 / g_bar)^(1/4)`. Infinite for `g_bar <= 0`.
pub fn boost(g_bar: f64, a0: f64) -> f64 {
    if g_bar <= 0.0 {
        return f64::INFINITY;
    }
    (1.0 + a0 / g_bar).powf(0.25)
}
