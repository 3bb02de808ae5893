//! Shared pipeline logic used by the CLI subcommands.
//!
//! problem JSON -> model resolution -> initial guess -> fit -> residuals
//!
//! The handlers in `app` only deal with presentation (printing, exports).

use std::path::Path;

use tracing::info;

use crate::domain::{Accelerator, FitConfig, FitFile, FitProblem, ModelKind, PeriodResidual};
use crate::error::AppError;
use crate::fit::{BalancePointModel, FitOptions, ModelFit, SolverOptions, initial_guess};
use crate::io::problem::read_problem_json;
use crate::report::{DatasetStats, SavingsReport, compare_fits, period_residuals};

/// Fit settings shared by `fit` and `savings`.
#[derive(Debug, Clone)]
pub struct SolveSettings {
    /// Overrides the problem file's model when set.
    pub model: Option<ModelKind>,
    pub accelerator: Accelerator,
    pub max_iters: u64,
    pub seed_steps: usize,
}

impl From<&FitConfig> for SolveSettings {
    fn from(config: &FitConfig) -> Self {
        Self {
            model: config.model,
            accelerator: config.accelerator,
            max_iters: config.max_iters,
            seed_steps: config.seed_steps,
        }
    }
}

/// Where the optimizer's starting point came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuessSource {
    Problem,
    Search,
}

impl GuessSource {
    pub fn label(self) -> &'static str {
        match self {
            GuessSource::Problem => "from problem file",
            GuessSource::Search => "grid search",
        }
    }
}

/// All computed outputs of a single `ddfit fit` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub problem: FitProblem,
    pub stats: DatasetStats,
    pub model: BalancePointModel,
    pub fit: ModelFit,
    pub residuals: Vec<PeriodResidual>,
    pub guess_source: GuessSource,
}

/// Outputs of a `ddfit savings` run.
#[derive(Debug, Clone)]
pub struct SavingsRun {
    pub model: ModelKind,
    pub baseline: ModelFit,
    pub reporting: ModelFit,
    pub report: SavingsReport,
}

/// Execute the fitting pipeline for the configured problem file.
pub fn run_fit(config: &FitConfig) -> Result<RunOutput, AppError> {
    let problem = read_problem_json(&config.input)?;
    run_fit_with_problem(problem, &SolveSettings::from(config))
}

/// Execute the fitting pipeline on an in-memory problem.
pub fn run_fit_with_problem(problem: FitProblem, settings: &SolveSettings) -> Result<RunOutput, AppError> {
    let observed = problem.observed();
    let temps = problem.temperatures();
    let weights = problem.weights();

    let (model, fit, guess_source) = fit_problem(&problem, settings)?;
    let residuals = period_residuals(fit.model, &fit.params, &observed, &temps, weights.as_deref())?;

    Ok(RunOutput {
        stats: DatasetStats::from_series(&observed, &temps),
        problem,
        model,
        fit,
        residuals,
        guess_source,
    })
}

/// Resolve the model and starting point for a problem, then fit it.
pub fn fit_problem(
    problem: &FitProblem,
    settings: &SolveSettings,
) -> Result<(BalancePointModel, ModelFit, GuessSource), AppError> {
    let kind = resolve_model(problem, settings)?;
    let observed = problem.observed();
    let temps = problem.temperatures();
    let weights = problem.weights();

    let (guess, guess_source) = match &problem.initial_guess {
        Some(guess) => (guess.clone(), GuessSource::Problem),
        None => {
            let guess = initial_guess(
                kind,
                &observed,
                &temps,
                weights.as_deref(),
                &problem.bounds,
                settings.seed_steps,
            )?;
            (guess, GuessSource::Search)
        }
    };

    let options = FitOptions {
        accelerator: settings.accelerator,
        solver: SolverOptions {
            max_iters: settings.max_iters,
            ..SolverOptions::default()
        },
    };
    let model = BalancePointModel::new(kind, guess, problem.bounds.clone())?.with_options(options);
    let fit = model.fit(&observed, &temps, weights.as_deref())?;

    info!(
        model = ?kind,
        sse = fit.quality.sse,
        converged = fit.quality.converged,
        guess = guess_source.label(),
        "fit complete"
    );
    Ok((model, fit, guess_source))
}

/// Predict per-period usage for a problem's temperatures from a saved fit.
pub fn run_predict(fit: &FitFile, problem: &FitProblem) -> Result<Vec<PeriodResidual>, AppError> {
    let temps = problem.temperatures();
    if let Some(j) = temps.iter().position(|days| days.is_empty()) {
        return Err(AppError::new(2, format!("Period {j} has no daily temperatures.")));
    }
    let weights = problem.weights();
    period_residuals(fit.model, &fit.param_vector(), &problem.observed(), &temps, weights.as_deref())
}

/// Fit baseline and reporting problems independently (in parallel) and
/// compare their annualized usage over the reporting-period weather.
pub fn run_savings(baseline: &Path, reporting: &Path, settings: &SolveSettings) -> Result<SavingsRun, AppError> {
    let baseline_problem = read_problem_json(baseline)?;
    let reporting_problem = read_problem_json(reporting)?;

    let model = resolve_model(&baseline_problem, settings)?;
    let reporting_model = resolve_model(&reporting_problem, settings)?;
    if model != reporting_model {
        return Err(AppError::new(
            2,
            format!(
                "Baseline and reporting problems use different models ({} vs {}).",
                model.display_name(),
                reporting_model.display_name()
            ),
        ));
    }

    let (baseline_fit, reporting_fit) = rayon::join(
        || fit_problem(&baseline_problem, settings),
        || fit_problem(&reporting_problem, settings),
    );
    let (_, baseline_fit, _) = baseline_fit?;
    let (_, reporting_fit, _) = reporting_fit?;

    let report = compare_fits(
        model,
        &baseline_fit.params,
        &reporting_fit.params,
        &reporting_problem.temperatures(),
    )?;

    Ok(SavingsRun {
        model,
        baseline: baseline_fit,
        reporting: reporting_fit,
        report,
    })
}

fn resolve_model(problem: &FitProblem, settings: &SolveSettings) -> Result<ModelKind, AppError> {
    settings
        .model
        .or(problem.model)
        .ok_or_else(|| AppError::new(2, "No model given: set \"model\" in the problem file or pass --model."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PeriodRecord;
    use crate::models::predict_average_daily;

    fn settings() -> SolveSettings {
        SolveSettings {
            model: None,
            accelerator: Accelerator::Off,
            max_iters: 200,
            seed_steps: 21,
        }
    }

    fn heating_problem(truth: &[f64]) -> FitProblem {
        let temps: Vec<Vec<f64>> = (0..10)
            .map(|m| (0..30).map(|d| (35.0 + 4.0 * m as f64 + (d % 7) as f64).round()).collect())
            .collect();
        let usage = predict_average_daily(ModelKind::Heating, truth, &temps);
        FitProblem {
            model: Some(ModelKind::Heating),
            periods: temps
                .into_iter()
                .zip(usage)
                .map(|(temps, u)| PeriodRecord {
                    temps,
                    usage: Some(u),
                    weight: None,
                })
                .collect(),
            bounds: vec![(55.0, 75.0), (0.0, 50.0), (0.0, 10.0)],
            initial_guess: None,
        }
    }

    #[test]
    fn missing_model_is_a_configuration_error() {
        let mut problem = heating_problem(&[65.0, 10.0, 2.0]);
        problem.model = None;
        let err = fit_problem(&problem, &settings()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn searched_guess_feeds_the_fit() {
        let problem = heating_problem(&[65.0, 10.0, 2.0]);
        let run = run_fit_with_problem(problem, &settings()).unwrap();

        assert_eq!(run.guess_source, GuessSource::Search);
        assert_eq!(run.residuals.len(), 10);
        assert_eq!(run.stats.n_masked, 0);
        for r in &run.residuals {
            assert!(r.residual.unwrap().abs() < 1e-3, "{r:?}");
        }
    }

    #[test]
    fn predict_uses_saved_parameters() {
        let problem = heating_problem(&[65.0, 10.0, 2.0]);
        let run = run_fit_with_problem(problem.clone(), &settings()).unwrap();
        let file = run.fit.to_file(&run.model);

        let rows = run_predict(&file, &problem).unwrap();
        assert_eq!(rows.len(), run.residuals.len());
        for (a, b) in rows.iter().zip(run.residuals.iter()) {
            assert_eq!(a.fitted_avg, b.fitted_avg);
        }
    }
}
