//! Analytic checks of the geometric bridge.
//!
//! The law has two exact asymptotes, an exact crossover value and a
//! Tully–Fisher identity at the halo boundary. `check_limits` evaluates all
//! four for a given `a0` so a build can verify itself (`gbridge limits`).

use serde::Serialize;

use crate::domain::G_KPC;
use crate::models::bridge::{btfr_baryonic_mass, halo_boundary_radius};
use crate::models::law::geometric_bridge;

/// One check: `ratio` is compared against 1 with relative tolerance `rtol`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LimitCheck {
    pub name: &'static str,
    pub description: &'static str,
    pub ratio: f64,
    pub rtol: f64,
}

impl LimitCheck {
    pub fn passed(&self) -> bool {
        (self.ratio - 1.0).abs() <= self.rtol
    }
}

fn mean_ratio(samples: &[f64], f: impl Fn(f64) -> f64) -> f64 {
    samples.iter().map(|&g| f(g)).sum::<f64>() / samples.len() as f64
}

/// Evaluate every limit check at `a0`.
pub fn check_limits(a0: f64) -> Vec<LimitCheck> {
    let high = [1e6, 1e7, 1e8];
    let low = [0.01, 0.1, 1.0];

    let v_flat = 150.0;
    let r_halo = halo_boundary_radius(v_flat, a0);
    let m_newton = v_flat * v_flat * r_halo / G_KPC;

    vec![
        LimitCheck {
            name: "newtonian",
            description: "g_obs / g_bar for g_bar >> a0",
            ratio: mean_ratio(&high, |g| geometric_bridge(g, a0) / g),
            rtol: 0.01,
        },
        LimitCheck {
            name: "deep",
            description: "g_obs / sqrt(a0 g_bar) for g_bar << a0",
            ratio: mean_ratio(&low, |g| geometric_bridge(g, a0) / (a0 * g).sqrt()),
            rtol: 0.05,
        },
        LimitCheck {
            name: "crossover",
            description: "g_obs / (a0 sqrt 2) at g_bar = a0",
            ratio: geometric_bridge(a0, a0) / (a0 * std::f64::consts::SQRT_2),
            rtol: 1e-6,
        },
        LimitCheck {
            name: "btfr",
            description: "M_newton(r_halo) / M_btfr at V_flat = 150 km/s",
            ratio: m_newton / btfr_baryonic_mass(v_flat, a0),
            rtol: 1e-6,
        },
    ]
}
