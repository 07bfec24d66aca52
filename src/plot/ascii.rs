//! ASCII rotation-curve plots for terminal output.
//!
//! Fixed-size character grid, deterministic output (golden tests).
//!
//! Plot elements:
//! - observed velocities: `o`
//! - model curve: `-` line
//! - Newtonian baryonic curve: `.` line
//! - halo boundary radius: `:` column

use crate::domain::GalaxyCurve;
use crate::models::ModelTrace;

/// Render a galaxy's observed curve, model prediction and baryonic curve.
///
/// `r_halo` is drawn only if it falls inside the plotted radius range.
pub fn render_rotation_curve(
    curve: &GalaxyCurve,
    trace: &ModelTrace,
    r_halo: Option<f64>,
    width: usize,
    height: usize,
) -> String {
    render_plot(
        curve.radii(),
        curve.v_obs(),
        &trace.v_pred,
        Some(trace.v_bar.as_slice()),
        r_halo,
        width,
        height,
    )
}

fn render_plot(
    radii: &[f64],
    v_obs: &[f64],
    v_model: &[f64],
    v_bar: Option<&[f64]>,
    marker: Option<f64>,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (r_min, r_max) = radius_range(radii).unwrap_or((0.0, 1.0));
    let series: Vec<&[f64]> = [Some(v_obs), Some(v_model), v_bar].into_iter().flatten().collect();
    let (v_min, v_max) = value_range(&series).unwrap_or((0.0, 1.0));
    let (v_min, v_max) = pad_range(v_min, v_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Lines first so the observed points overlay them.
    draw_series(&mut grid, radii, v_model, (r_min, r_max), (v_min, v_max), '-');
    if let Some(v_bar) = v_bar {
        draw_series(&mut grid, radii, v_bar, (r_min, r_max), (v_min, v_max), '.');
    }
    if let Some(r) = marker.filter(|r| *r >= r_min && *r <= r_max) {
        let x = map_x(r, r_min, r_max, width);
        for row in grid.iter_mut() {
            if row[x] == ' ' {
                row[x] = ':';
            }
        }
    }
    for (&r, &v) in radii.iter().zip(v_obs) {
        let x = map_x(r, r_min, r_max, width);
        let y = map_y(v, v_min, v_max, height);
        grid[y][x] = 'o';
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: r=[{r_min:.2}, {r_max:.2}] kpc | v=[{v_min:.2}, {v_max:.2}] km/s\n"
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    out
}

fn radius_range(radii: &[f64]) -> Option<(f64, f64)> {
    let min = radii.iter().copied().fold(f64::INFINITY, f64::min);
    let max = radii.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if min.is_finite() && max.is_finite() && max > min {
        Some((min, max))
    } else {
        None
    }
}

fn value_range(series: &[&[f64]]) -> Option<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for s in series {
        for &v in s.iter() {
            min = min.min(v);
            max = max.max(v);
        }
    }
    if min.is_finite() && max.is_finite() && max > min {
        Some((min, max))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(r: f64, r_min: f64, r_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((r - r_min) / (r_max - r_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(v: f64, v_min: f64, v_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((v - v_min) / (v_max - v_min)).clamp(0.0, 1.0);
    // Largest velocity on row 0.
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_series(
    grid: &mut [Vec<char>],
    radii: &[f64],
    values: &[f64],
    (r_min, r_max): (f64, f64),
    (v_min, v_max): (f64, f64),
    ch: char,
) {
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for (&r, &v) in radii.iter().zip(values) {
        let x = map_x(r, r_min, r_max, width);
        let y = map_y(v, v_min, v_max, height);
        match prev {
            Some((x0, y0)) => draw_line(grid, x0, y0, x, y, ch),
            None => {
                if grid[y][x] == ' ' {
                    grid[y][x] = ch;
                }
            }
        }
        prev = Some((x, y));
    }
}

/// Integer line drawing (Bresenham). Only fills empty cells.
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
