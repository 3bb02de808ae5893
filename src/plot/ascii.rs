//! ASCII plotting for terminal output.
//!
//! A fixed-size character grid, kept simple so that output is deterministic
//! and easy to eyeball in a terminal:
//!
//! - x axis: period mean temperature
//! - y axis: average daily usage
//! - observed periods: `o` (periods with missing usage are not drawn)
//! - fitted response curve (usage of a single day at each temperature): `-`

use crate::domain::{ModelKind, PeriodResidual};
use crate::models::daily_usage;

/// Render observed average daily usage against the fitted response curve.
pub fn render_ascii_plot(
    residuals: &[PeriodResidual],
    model: ModelKind,
    params: &[f64],
    width: usize,
    height: usize,
) -> String {
    let (t_min, t_max) = temp_range(residuals).unwrap_or((0.0, 100.0));
    let curve = sample_curve(model, params, t_min, t_max, width.max(2));
    render_plot(residuals, &curve, t_min, t_max, width, height)
}

fn render_plot(
    residuals: &[PeriodResidual],
    curve: &[(f64, f64)],
    t_min: f64,
    t_max: f64,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (y_min, y_max) = y_range(residuals, curve).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Curve first so observations overlay it.
    draw_curve(&mut grid, curve, t_min, t_max, y_min, y_max);

    for r in residuals {
        let Some(obs) = r.observed_avg else {
            continue;
        };
        let x = map_x(r.mean_temp, t_min, t_max, width);
        let y = map_y(obs, y_min, y_max, height);
        grid[y][x] = 'o';
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: temp=[{t_min:.1}, {t_max:.1}] | avg daily usage=[{y_min:.2}, {y_max:.2}]\n"
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    out
}

fn temp_range(residuals: &[PeriodResidual]) -> Option<(f64, f64)> {
    let mut min_t = f64::INFINITY;
    let mut max_t = f64::NEG_INFINITY;
    for r in residuals {
        min_t = min_t.min(r.mean_temp);
        max_t = max_t.max(r.mean_temp);
    }
    if min_t.is_finite() && max_t.is_finite() && max_t > min_t {
        Some((min_t, max_t))
    } else {
        None
    }
}

fn sample_curve(model: ModelKind, params: &[f64], t_min: f64, t_max: f64, n: usize) -> Vec<(f64, f64)> {
    let n = n.max(2);
    (0..n)
        .map(|i| {
            let t = t_min + (i as f64 / (n as f64 - 1.0)) * (t_max - t_min);
            (t, daily_usage(model, params, t))
        })
        .collect()
}

fn y_range(residuals: &[PeriodResidual], curve: &[(f64, f64)]) -> Option<(f64, f64)> {
    let observed = residuals.iter().filter_map(|r| r.observed_avg);
    let fitted = curve.iter().map(|&(_, y)| y);
    let (min_y, max_y) = observed
        .chain(fitted)
        .filter(|y| y.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), y| (lo.min(y), hi.max(y)));

    if min_y.is_finite() && max_y.is_finite() && max_y > min_y {
        Some((min_y, max_y))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let pad = ((max - min).abs() * frac).max(1e-12);
    (min - pad, max + pad)
}

/// Position of `v` within `[lo, hi]` on `cells` cells, clamped to the edges.
fn cell(v: f64, lo: f64, hi: f64, cells: usize) -> usize {
    let u = ((v - lo) / (hi - lo)).clamp(0.0, 1.0);
    (u * (cells.max(2) as f64 - 1.0)).round() as usize
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    cell(t, t_min, t_max, width)
}

/// Row index; the largest usage maps to row 0.
fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    height.max(2) - 1 - cell(y, y_min, y_max, height)
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], t_min: f64, t_max: f64, y_min: f64, y_max: f64) {
    let height = grid.len();
    let width = grid.first().map_or(0, Vec::len);
    let points: Vec<(usize, usize)> = curve
        .iter()
        .filter(|(_, y)| y.is_finite())
        .map(|&(t, y)| (map_x(t, t_min, t_max, width), map_y(y, y_min, y_max, height)))
        .collect();

    if let [(x, y)] = points[..] {
        grid[y][x] = '-';
    }
    for pair in points.windows(2) {
        draw_segment(grid, pair[0], pair[1], '-');
    }
}

/// Fill the cells between two points by stepping along the longer axis.
fn draw_segment(grid: &mut [Vec<char>], from: (usize, usize), to: (usize, usize), ch: char) {
    let (x0, y0) = (from.0 as f64, from.1 as f64);
    let (x1, y1) = (to.0 as f64, to.1 as f64);
    let steps = (x1 - x0).abs().max((y1 - y0).abs()) as usize;

    for i in 0..=steps {
        let u = if steps == 0 { 0.0 } else { i as f64 / steps as f64 };
        let x = (x0 + u * (x1 - x0)).round() as usize;
        let y = (y0 + u * (y1 - y0)).round() as usize;
        if let Some(slot) = grid.get_mut(y).and_then(|row| row.get_mut(x)) {
            if *slot == ' ' {
                *slot = ch;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(mean_temp: f64, observed: Option<f64>) -> PeriodResidual {
        PeriodResidual {
            index: 0,
            n_days: 30,
            mean_temp,
            observed_avg: observed,
            fitted_avg: 10.0,
            residual: observed.map(|o| o - 10.0),
            weight: 1.0,
        }
    }

    #[test]
    fn plot_golden_snapshot_small() {
        // Balance point below every temperature: flat curve at the base load.
        let rows = vec![row(50.0, Some(10.0)), row(60.0, None), row(70.0, Some(20.0))];

        let txt = render_ascii_plot(&rows, ModelKind::Heating, &[40.0, 10.0, 2.0], 10, 5);
        let expected = concat!(
            "Plot: temp=[50.0, 70.0] | avg daily usage=[9.50, 20.50]\n",
            "         o\n",
            "          \n",
            "          \n",
            "          \n",
            "o---------\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn plot_has_requested_dimensions() {
        let rows = vec![row(30.0, Some(80.0)), row(75.0, Some(12.0))];
        let txt = render_ascii_plot(&rows, ModelKind::Heating, &[65.0, 10.0, 2.0], 40, 12);
        let lines: Vec<&str> = txt.lines().collect();
        assert_eq!(lines.len(), 13);
        assert!(lines[1..].iter().all(|l| l.chars().count() == 40));
        let marks: usize = lines[1..].iter().map(|l| l.matches('o').count()).sum();
        assert_eq!(marks, 2);
    }
}
