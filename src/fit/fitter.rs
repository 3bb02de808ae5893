//! Parameter fitting for a single balance-point model.
//!
//! Given:
//! - observed average daily usage per period (NaN = missing)
//! - daily temperatures per period
//! - optional per-period weights
//! - an initial guess and box bounds
//!
//! we minimize the masked, weighted SSE of average daily usage over the box
//! and return the best parameter vector with fit diagnostics. The solver's
//! convergence flag is reported but never turns a finished run into an error;
//! judging fit quality is up to the caller.

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::domain::{Accelerator, FitFile, FitQuality, ModelKind, NamedParam};
use crate::error::FitError;
use crate::fit::objective::{Objective, validate_bounds};
use crate::fit::solver::{SolverOptions, minimize};
use crate::models::predict;

/// Fitting options that affect how each model is calibrated.
#[derive(Debug, Clone, Default)]
pub struct FitOptions {
    /// Degree-day evaluation strategy inside the objective.
    ///
    /// The grid accelerator is built once per `fit` call and discarded with it.
    pub accelerator: Accelerator,
    pub solver: SolverOptions,
}

/// A model shape with its starting point and feasible box.
#[derive(Debug, Clone)]
pub struct BalancePointModel {
    pub kind: ModelKind,
    pub initial_guess: Vec<f64>,
    pub bounds: Vec<(f64, f64)>,
    pub options: FitOptions,
}

/// Best fit for a single model.
#[derive(Debug, Clone)]
pub struct ModelFit {
    pub model: ModelKind,
    pub params: Vec<f64>,
    pub quality: FitQuality,
}

/// Inputs of one independent fit (see [`fit_batch`]).
#[derive(Debug, Clone, Copy)]
pub struct FitRequest<'a> {
    pub observed: &'a [f64],
    pub temps: &'a [Vec<f64>],
    pub weights: Option<&'a [f64]>,
}

impl BalancePointModel {
    /// Create a model, checking the guess and bounds against the model shape.
    pub fn new(kind: ModelKind, initial_guess: Vec<f64>, bounds: Vec<(f64, f64)>) -> Result<Self, FitError> {
        let model = Self {
            kind,
            initial_guess,
            bounds,
            options: FitOptions::default(),
        };
        model.validate()?;
        Ok(model)
    }

    pub fn with_options(mut self, options: FitOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_accelerator(mut self, accelerator: Accelerator) -> Self {
        self.options.accelerator = accelerator;
        self
    }

    fn validate(&self) -> Result<(), FitError> {
        let expected = self.kind.param_len();
        if self.initial_guess.len() != expected {
            return Err(FitError::config(format!(
                "{} expects an initial guess of {expected} values, got {}.",
                self.kind.display_name(),
                self.initial_guess.len()
            )));
        }
        if let Some(v) = self.initial_guess.iter().find(|v| !v.is_finite()) {
            return Err(FitError::config(format!("Initial guess contains a non-finite value ({v}).")));
        }
        validate_bounds(self.kind, &self.bounds)
    }

    /// Fit the model to observed average daily usage.
    pub fn fit(&self, observed: &[f64], temps: &[Vec<f64>], weights: Option<&[f64]>) -> Result<ModelFit, FitError> {
        self.validate()?;

        let objective = Objective::new(
            self.kind,
            observed,
            temps,
            weights,
            &self.bounds,
            self.options.accelerator,
        )?;

        debug!(
            model = ?self.kind,
            periods = temps.len(),
            active = objective.active_count(),
            accelerated = objective.is_accelerated(),
            "fitting balance-point model"
        );

        let outcome = minimize(&objective, &self.initial_guess, &self.options.solver)?;

        // The accelerator is only exact for on-grid temperatures; report the
        // brute-force SSE of the returned parameters.
        let sse = if objective.is_accelerated() {
            Objective::new(self.kind, observed, temps, weights, &self.bounds, Accelerator::Off)?
                .sse(&outcome.params)
        } else {
            outcome.cost
        };

        if !outcome.converged {
            warn!(
                model = ?self.kind,
                termination = %outcome.termination,
                "solver finished without formal convergence"
            );
        }

        let n = objective.active_count();
        let quality = FitQuality {
            sse,
            rmse: (sse / n as f64).sqrt(),
            n,
            iterations: outcome.iterations,
            termination: outcome.termination,
            converged: outcome.converged,
        };
        debug!(model = ?self.kind, sse, iterations = quality.iterations, "fit finished");

        Ok(ModelFit {
            model: self.kind,
            params: outcome.params,
            quality,
        })
    }

    /// Predicted per-period usage totals at `params`.
    pub fn predict(&self, params: &[f64], temps: &[Vec<f64>]) -> Vec<f64> {
        predict(self.kind, params, temps)
    }
}

impl ModelFit {
    /// Serializable form of this fit.
    pub fn to_file(&self, model: &BalancePointModel) -> FitFile {
        FitFile {
            tool: "ddfit".to_string(),
            model: self.model,
            display_name: self.model.display_name().to_string(),
            params: self
                .model
                .param_names()
                .iter()
                .zip(self.params.iter())
                .map(|(name, &value)| NamedParam {
                    name: name.to_string(),
                    value,
                })
                .collect(),
            bounds: model.bounds.clone(),
            accelerator: model.options.accelerator,
            quality: self.quality.clone(),
        }
    }
}

/// Run independent fits in parallel, one per request.
///
/// Each fit builds (and drops) its own accelerator; nothing is shared between
/// them. Results are returned in request order.
pub fn fit_batch(model: &BalancePointModel, requests: &[FitRequest<'_>]) -> Vec<Result<ModelFit, FitError>> {
    requests
        .par_iter()
        .map(|req| model.fit(req.observed, req.temps, req.weights))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::predict_average_daily;

    /// Twelve 30-day periods of whole-degree temperatures spanning winter to summer.
    fn seasonal_periods() -> Vec<Vec<f64>> {
        (0..12)
            .map(|m| {
                let mid = 57.0 - 25.0 * ((m as f64) / 12.0 * std::f64::consts::TAU).cos();
                (0..30).map(|d| (mid + ((d * 5) % 13) as f64 - 6.0).round()).collect()
            })
            .collect()
    }

    fn heating_model() -> BalancePointModel {
        BalancePointModel::new(
            ModelKind::Heating,
            vec![64.2, 10.0, 1.2],
            vec![(50.0, 75.0), (0.0, 50.0), (0.0, 10.0)],
        )
        .unwrap()
    }

    #[test]
    fn heating_fit_reproduces_noise_free_usage() {
        let temps = seasonal_periods();
        let truth = [64.5, 12.0, 1.5];
        let observed = predict_average_daily(ModelKind::Heating, &truth, &temps);

        for acc in [Accelerator::Off, Accelerator::grid()] {
            let fit = heating_model().with_accelerator(acc).fit(&observed, &temps, None).unwrap();
            let fitted = predict_average_daily(ModelKind::Heating, &fit.params, &temps);
            for (f, o) in fitted.iter().zip(observed.iter()) {
                assert!((f - o).abs() / o.abs() < 1e-4, "{acc:?}: fitted={f}, observed={o}");
            }
            assert_eq!(fit.quality.n, 12);
            assert!(fit.quality.sse.is_finite());
        }
    }

    #[test]
    fn masked_period_temperatures_do_not_change_the_fit() {
        let temps = seasonal_periods();
        let mut observed = predict_average_daily(ModelKind::Heating, &[64.5, 12.0, 1.5], &temps);
        observed[5] = f64::NAN;
        let model = heating_model();
        let before = model.fit(&observed, &temps, None).unwrap();

        let mut altered = temps.clone();
        altered[5] = vec![-40.0; 31];
        let after = model.fit(&observed, &altered, None).unwrap();

        assert_eq!(before.params, after.params);
        assert_eq!(after.quality.n, 11);
    }

    #[test]
    fn guess_length_mismatch_is_a_configuration_error() {
        let err = BalancePointModel::new(
            ModelKind::Dual,
            vec![1.0, 1.0, 1.0],
            vec![(0.0, 1.0); 5],
        )
        .unwrap_err();
        assert!(matches!(err, FitError::Config(_)));

        let err = BalancePointModel::new(ModelKind::Heating, vec![60.0, 1.0, 1.0], vec![(0.0, 1.0); 5]).unwrap_err();
        assert!(matches!(err, FitError::Config(_)));
    }

    #[test]
    fn all_missing_usage_is_rejected() {
        let temps = seasonal_periods();
        let observed = vec![f64::NAN; temps.len()];
        let err = heating_model().fit(&observed, &temps, None).unwrap_err();
        assert!(matches!(err, FitError::Degenerate(_)));
    }

    #[test]
    fn batch_results_match_individual_fits() {
        let temps = seasonal_periods();
        let a = predict_average_daily(ModelKind::Heating, &[62.5, 10.0, 2.0], &temps);
        let b = predict_average_daily(ModelKind::Heating, &[66.5, 4.0, 0.5], &temps);
        let model = heating_model();

        let requests = [
            FitRequest { observed: &a, temps: &temps, weights: None },
            FitRequest { observed: &b, temps: &temps, weights: None },
        ];
        let results = fit_batch(&model, &requests);
        assert_eq!(results.len(), 2);

        let single_a = model.fit(&a, &temps, None).unwrap();
        let batch_a = results[0].as_ref().unwrap();
        assert_eq!(batch_a.params, single_a.params);
    }

    #[test]
    fn fit_file_lists_named_parameters() {
        let temps = seasonal_periods();
        let observed = predict_average_daily(ModelKind::Heating, &[64.5, 12.0, 1.5], &temps);
        let model = heating_model();
        let fit = model.fit(&observed, &temps, None).unwrap();

        let file = fit.to_file(&model);
        assert_eq!(file.params.len(), 3);
        assert_eq!(file.params[0].name, "reference_temperature");
        assert_eq!(file.param_vector(), fit.params);
    }
}
