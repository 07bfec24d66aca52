//! Residual statistics and robust summaries.
//!
//! All functions are deterministic and allocation-light. Undefined results
//! (empty input, zero variance) are reported as `None` rather than NaN so
//! callers have to decide what "undefined" means for them.

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Median of a copy of `values`.
pub fn median(values: &[f64]) -> Option<f64> {
    let mut sorted = values.to_vec();
    median_mut(&mut sorted)
}

/// Median, sorting `values` in place.
pub fn median_mut(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some((values[mid - 1] + values[mid]) / 2.0)
    }
}

/// Sum of squared residuals `Σ (obs - pred)^2`.
pub fn sum_squared_residuals(obs: &[f64], pred: &[f64]) -> f64 {
    debug_assert_eq!(obs.len(), pred.len());
    obs.iter()
        .zip(pred)
        .map(|(o, p)| {
            let r = o - p;
            r * r
        })
        .sum()
}

/// Root-mean-square residual `sqrt(mean((pred - obs)^2))`.
///
/// Returns NaN for empty input; callers enforce a minimum point count first.
pub fn rms(obs: &[f64], pred: &[f64]) -> f64 {
    if obs.is_empty() {
        return f64::NAN;
    }
    (sum_squared_residuals(obs, pred) / obs.len() as f64).sqrt()
}

/// Coefficient of determination `1 - SS_res / SS_tot`.
///
/// `None` when the observed values have zero variance (R^2 undefined).
pub fn r_squared(obs: &[f64], pred: &[f64]) -> Option<f64> {
    let mean_obs = mean(obs)?;
    let ss_tot: f64 = obs.iter().map(|o| (o - mean_obs) * (o - mean_obs)).sum();
    if ss_tot <= 0.0 {
        return None;
    }
    Some(1.0 - sum_squared_residuals(obs, pred) / ss_tot)
}

/// Chi-squared `Σ ((obs - pred) / max(err, floor))^2`.
pub fn chi_squared(obs: &[f64], pred: &[f64], err: &[f64], floor: f64) -> f64 {
    debug_assert_eq!(obs.len(), pred.len());
    debug_assert_eq!(obs.len(), err.len());
    obs.iter()
        .zip(pred)
        .zip(err)
        .map(|((o, p), e)| {
            let r = (o - p) / e.max(floor);
            r * r
        })
        .sum()
}

/// Pearson correlation coefficient.
///
/// `None` for fewer than two pairs, mismatched lengths, or zero variance in
/// either series.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let mx = mean(x)?;
    let my = mean(y)?;

    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for (&xi, &yi) in x.iter().zip(y) {
        let dx = xi - mx;
        let dy = yi - my;
        cov += dx * dy;
        vx += dx * dx;
        vy += dy * dy;
    }
    if vx <= 0.0 || vy <= 0.0 {
        return None;
    }
    Some(cov / (vx * vy).sqrt())
}
