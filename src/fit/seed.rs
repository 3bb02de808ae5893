//! Initial-guess search.
//!
//! With the balance points fixed, every model is linear in its slopes and base
//! load. We therefore seed the optimizer with a deterministic grid search:
//!
//! - lay a linear grid over the balance-point bounds (dual: all
//!   `(bp_low, bp_diff)` pairs)
//! - for each candidate, solve a weighted least-squares problem on the
//!   average-daily regressors (`1`, `HDD/n`, `CDD/n`)
//! - clamp the coefficients into their bounds and score the candidate with
//!   the real objective
//! - keep the lowest SSE, breaking ties by grid index
//!
//! Candidates are independent and evaluated in parallel.

use rayon::prelude::*;

use crate::domain::{Accelerator, ModelKind};
use crate::error::FitError;
use crate::fit::objective::Objective;
use crate::math::{cooling_degree_days, heating_degree_days, weighted_least_squares};

/// Default grid steps per balance-point dimension.
pub const DEFAULT_SEED_STEPS: usize = 21;

/// Generate `steps` linearly spaced points between `min` and `max` (inclusive).
///
/// A degenerate range (`min == max`) yields the single point `min`.
pub fn lin_space(min: f64, max: f64, steps: usize) -> Result<Vec<f64>, FitError> {
    if !(min.is_finite() && max.is_finite() && max >= min) {
        return Err(FitError::config(format!(
            "Invalid grid range: min={min}, max={max} (must be finite and max>=min)."
        )));
    }
    if min == max {
        return Ok(vec![min]);
    }
    if steps < 2 {
        return Err(FitError::config("Grid steps must be >= 2."));
    }

    let step = (max - min) / (steps as f64 - 1.0);
    Ok((0..steps).map(|i| min + step * i as f64).collect())
}

/// Balance-point candidates for a model.
///
/// Heating / cooling: `[reference_temperature]`. Dual: `[bp_low, bp_diff]`.
pub fn balance_point_grid(model: ModelKind, bounds: &[(f64, f64)], steps: usize) -> Result<Vec<Vec<f64>>, FitError> {
    match model {
        ModelKind::Heating | ModelKind::Cooling => {
            let (lo, hi) = bounds[0];
            Ok(lin_space(lo, hi, steps)?.into_iter().map(|bp| vec![bp]).collect())
        }
        ModelKind::Dual => {
            let lows = lin_space(bounds[3].0, bounds[3].1, steps)?;
            let diffs = lin_space(bounds[4].0, bounds[4].1, steps)?;
            let mut out = Vec::with_capacity(lows.len() * diffs.len());
            for &low in &lows {
                for &diff in &diffs {
                    out.push(vec![low, diff]);
                }
            }
            Ok(out)
        }
    }
}

#[derive(Debug, Clone)]
struct Candidate {
    idx: usize,
    params: Vec<f64>,
    sse: f64,
}

/// Derive a starting parameter vector by grid search + weighted least squares.
pub fn initial_guess(
    model: ModelKind,
    observed: &[f64],
    temps: &[Vec<f64>],
    weights: Option<&[f64]>,
    bounds: &[(f64, f64)],
    steps: usize,
) -> Result<Vec<f64>, FitError> {
    // Validates every input the same way the fitter does.
    let objective = Objective::new(model, observed, temps, weights, bounds, Accelerator::Off)?;

    let active: Vec<usize> = (0..observed.len()).filter(|&j| observed[j].is_finite()).collect();
    let y: Vec<f64> = active.iter().map(|&j| observed[j]).collect();
    let w: Vec<f64> = active
        .iter()
        .map(|&j| weights.map_or(1.0, |w| w[j]))
        .collect();

    let grid = balance_point_grid(model, bounds, steps)?;

    let candidates: Vec<Candidate> = grid
        .par_iter()
        .enumerate()
        .filter_map(|(idx, bps)| {
            let rows: Vec<Vec<f64>> = active
                .iter()
                .map(|&j| design_row(model, bps, &temps[j]))
                .collect();
            let (coefs, _) = weighted_least_squares(&rows, &y, &w)?;
            let params = objective.clamp(&assemble_params(model, bps, &coefs));
            let sse = objective.sse(&params);
            sse.is_finite().then_some(Candidate { idx, params, sse })
        })
        .collect();

    // Deterministic selection: pick the minimum SSE; break ties by grid index.
    let best = candidates
        .into_iter()
        .min_by(|a, b| a.sse.total_cmp(&b.sse).then(a.idx.cmp(&b.idx)))
        .ok_or_else(|| {
            FitError::solver(format!(
                "No valid initial-guess candidates for the {} model.",
                model.display_name()
            ))
        })?;

    Ok(best.params)
}

/// Average-daily regressors of one period at fixed balance points.
fn design_row(model: ModelKind, bps: &[f64], days: &[f64]) -> Vec<f64> {
    let n = days.len() as f64;
    match model {
        ModelKind::Heating => vec![1.0, heating_degree_days(bps[0], days) / n],
        ModelKind::Cooling => vec![1.0, cooling_degree_days(bps[0], days) / n],
        ModelKind::Dual => vec![
            heating_degree_days(bps[0], days) / n,
            cooling_degree_days(bps[0] + bps[1], days) / n,
            1.0,
        ],
    }
}

/// Put balance points and linear coefficients back into model order.
fn assemble_params(model: ModelKind, bps: &[f64], coefs: &[f64]) -> Vec<f64> {
    match model {
        // coefs = (base_load, slope)
        ModelKind::Heating | ModelKind::Cooling => vec![bps[0], coefs[0], coefs[1]],
        // coefs = (ts_low, ts_high, base_load)
        ModelKind::Dual => vec![coefs[0], coefs[1], coefs[2], bps[0], bps[1]],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::predict_average_daily;

    fn seasonal_periods() -> Vec<Vec<f64>> {
        (0..12)
            .map(|m| {
                let base = 45.0 + 35.0 * ((m as f64) / 12.0 * std::f64::consts::TAU).sin().abs();
                (0..30).map(|d| (base + ((d * 7) % 11) as f64 - 5.0).round()).collect()
            })
            .collect()
    }

    #[test]
    fn lin_space_includes_endpoints() {
        let v = lin_space(55.0, 65.0, 5).unwrap();
        assert_eq!(v, vec![55.0, 57.5, 60.0, 62.5, 65.0]);
        assert_eq!(lin_space(3.0, 3.0, 10).unwrap(), vec![3.0]);
        assert!(lin_space(5.0, 1.0, 3).is_err());
        assert!(lin_space(1.0, 5.0, 1).is_err());
    }

    #[test]
    fn dual_grid_is_a_full_product() {
        let bounds = [(0.0, 1.0), (0.0, 1.0), (0.0, 1.0), (55.0, 65.0), (0.0, 10.0)];
        let grid = balance_point_grid(ModelKind::Dual, &bounds, 3).unwrap();
        assert_eq!(grid.len(), 9);
        assert_eq!(grid[0], vec![55.0, 0.0]);
        assert_eq!(grid[8], vec![65.0, 10.0]);
    }

    #[test]
    fn heating_guess_recovers_on_grid_truth() {
        let temps = seasonal_periods();
        let truth = [62.0, 12.0, 1.5];
        let observed = predict_average_daily(ModelKind::Heating, &truth, &temps);
        let bounds = [(55.0, 70.0), (0.0, 50.0), (0.0, 10.0)];

        // 62 lies on the 16-step grid over [55, 70].
        let guess = initial_guess(ModelKind::Heating, &observed, &temps, None, &bounds, 16).unwrap();
        for (g, t) in guess.iter().zip(truth.iter()) {
            assert!((g - t).abs() < 1e-6, "guess={guess:?}");
        }
    }

    #[test]
    fn dual_guess_lands_inside_bounds() {
        let temps = seasonal_periods();
        let truth = [1.2, 2.0, 15.0, 60.5, 9.0];
        let mut observed = predict_average_daily(ModelKind::Dual, &truth, &temps);
        observed[3] = f64::NAN;
        let bounds = [(0.0, 10.0), (0.0, 10.0), (0.0, 100.0), (55.0, 65.0), (0.0, 15.0)];

        let guess = initial_guess(ModelKind::Dual, &observed, &temps, None, &bounds, DEFAULT_SEED_STEPS).unwrap();
        assert_eq!(guess.len(), 5);
        for (g, &(lo, hi)) in guess.iter().zip(bounds.iter()) {
            assert!(*g >= lo && *g <= hi, "guess={guess:?}");
        }
        assert!((guess[3] - 60.5).abs() <= 0.5 + 1e-9, "guess={guess:?}");
    }

    #[test]
    fn guess_rejects_degenerate_input() {
        let temps = seasonal_periods();
        let observed = vec![f64::NAN; temps.len()];
        let bounds = [(55.0, 70.0), (0.0, 50.0), (0.0, 10.0)];
        let err = initial_guess(ModelKind::Heating, &observed, &temps, None, &bounds, 5).unwrap_err();
        assert!(matches!(err, FitError::Degenerate(_)));
    }
}
