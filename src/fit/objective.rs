//! Masked, weighted least-squares objective.
//!
//! ```text
//! SSE(θ) = Σ_{j unmasked} w_j (ū_j - Û_j(θ) / n_j)^2
//! ```
//!
//! where `ū_j` is the observed average daily usage of period `j`, `Û_j(θ)`
//! the model's predicted period total and `n_j` the number of days.
//! Periods with a non-finite observation are masked: they are still predicted
//! (so every vector stays aligned with the periods) but never enter the sum.

use crate::domain::{Accelerator, ModelKind};
use crate::error::FitError;
use crate::fit::grid::DegreeDayGrid;
use crate::math::{DailyTemperatures, day_counts};
use crate::models::predict_with;

/// Degree-day evaluation path used by the objective.
#[derive(Debug, Clone)]
enum Evaluator<'a> {
    Direct(DailyTemperatures<'a>),
    Grid(DegreeDayGrid),
}

/// Objective for one fit. Borrowed inputs are validated on construction.
#[derive(Debug, Clone)]
pub struct Objective<'a> {
    model: ModelKind,
    observed: &'a [f64],
    weights: Vec<f64>,
    /// Indices of periods with a finite observation.
    active: Vec<usize>,
    n_days: Vec<f64>,
    bounds: Vec<(f64, f64)>,
    evaluator: Evaluator<'a>,
}

impl<'a> Objective<'a> {
    /// Validate inputs and build the objective (and, if enabled, the grid).
    pub fn new(
        model: ModelKind,
        observed: &'a [f64],
        temps: &'a [Vec<f64>],
        weights: Option<&[f64]>,
        bounds: &[(f64, f64)],
        accelerator: Accelerator,
    ) -> Result<Self, FitError> {
        validate_bounds(model, bounds)?;

        if observed.len() != temps.len() {
            return Err(FitError::config(format!(
                "Observed usage has {} periods but the temperature series has {}.",
                observed.len(),
                temps.len()
            )));
        }
        for (j, days) in temps.iter().enumerate() {
            if days.is_empty() {
                return Err(FitError::config(format!("Period {j} has no daily temperatures.")));
            }
            if days.iter().any(|t| !t.is_finite()) {
                return Err(FitError::config(format!("Period {j} has a non-finite daily temperature.")));
            }
        }

        let weights = match weights {
            None => vec![1.0; observed.len()],
            Some(w) => {
                if w.len() != observed.len() {
                    return Err(FitError::config(format!(
                        "Expected {} weights (one per period), got {}.",
                        observed.len(),
                        w.len()
                    )));
                }
                if let Some((j, v)) = w.iter().enumerate().find(|(_, v)| !(v.is_finite() && **v >= 0.0)) {
                    return Err(FitError::config(format!(
                        "Weight for period {j} must be finite and >= 0, got {v}."
                    )));
                }
                w.to_vec()
            }
        };

        let active: Vec<usize> = (0..observed.len()).filter(|&j| observed[j].is_finite()).collect();
        if active.is_empty() {
            return Err(FitError::degenerate(
                "Every period is missing its observed usage; nothing to fit.",
            ));
        }
        let total_weight: f64 = active.iter().map(|&j| weights[j]).sum();
        if total_weight <= 0.0 {
            return Err(FitError::degenerate(
                "Total weight over periods with observed usage is zero.",
            ));
        }

        let evaluator = match accelerator {
            Accelerator::Off => Evaluator::Direct(DailyTemperatures::new(temps)),
            Accelerator::Grid { scale } => {
                Evaluator::Grid(DegreeDayGrid::for_model(model, temps, bounds, scale)?)
            }
        };

        Ok(Self {
            model,
            observed,
            weights,
            active,
            n_days: day_counts(temps),
            bounds: bounds.to_vec(),
            evaluator,
        })
    }

    pub fn model(&self) -> ModelKind {
        self.model
    }

    pub fn bounds(&self) -> &[(f64, f64)] {
        &self.bounds
    }

    /// Number of periods contributing to the objective.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn is_accelerated(&self) -> bool {
        matches!(self.evaluator, Evaluator::Grid(_))
    }

    /// Clamp a candidate parameter vector into the bounds box.
    pub fn clamp(&self, params: &[f64]) -> Vec<f64> {
        params
            .iter()
            .zip(self.bounds.iter())
            .map(|(&p, &(lo, hi))| p.clamp(lo, hi))
            .collect()
    }

    /// Predicted period totals at `params` (clamped into the bounds).
    pub fn predict_totals(&self, params: &[f64]) -> Vec<f64> {
        let params = self.clamp(params);
        match &self.evaluator {
            Evaluator::Direct(source) => predict_with(self.model, &params, source),
            Evaluator::Grid(grid) => predict_with(self.model, &params, grid),
        }
    }

    /// Weighted SSE of average daily usage over unmasked periods.
    pub fn sse(&self, params: &[f64]) -> f64 {
        let totals = self.predict_totals(params);
        self.active
            .iter()
            .map(|&j| {
                let r = self.observed[j] - totals[j] / self.n_days[j];
                self.weights[j] * r * r
            })
            .sum()
    }
}

/// Check a bounds vector against a model's parameter count.
pub fn validate_bounds(model: ModelKind, bounds: &[(f64, f64)]) -> Result<(), FitError> {
    if bounds.len() != model.param_len() {
        return Err(FitError::config(format!(
            "{} expects {} bounds, got {}.",
            model.display_name(),
            model.param_len(),
            bounds.len()
        )));
    }
    for (name, &(lo, hi)) in model.param_names().iter().zip(bounds.iter()) {
        if !(lo.is_finite() && hi.is_finite() && lo <= hi) {
            return Err(FitError::config(format!(
                "Bound for {name} must be finite with min <= max, got [{lo}, {hi}]."
            )));
        }
    }
    if model == ModelKind::Dual && bounds[4].0 < 0.0 {
        return Err(FitError::config(
            "Lower bound of bp_diff must be >= 0 so that bp_high >= bp_low.",
        ));
    }
    Ok(())
}
