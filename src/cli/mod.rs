//! Command-line parsing for the degree-day model fitter.
//!
//! Argument parsing and command dispatch stay separate from the modeling
//! code; `app` turns parsed arguments into a `FitConfig`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{DEFAULT_GRID_SCALE, ModelKind};
use crate::fit::DEFAULT_SEED_STEPS;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "ddfit", version, about = "Degree-day balance-point usage model fitter")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit a model to a problem JSON file, print diagnostics, and optionally plot/export.
    Fit(FitArgs),
    /// Predict per-period usage from a saved fit and a problem file's temperatures.
    Predict(PredictArgs),
    /// Fit baseline and reporting problems and estimate annualized savings.
    Savings(SavingsArgs),
}

/// Options controlling how a model is fitted.
#[derive(Debug, Args, Clone)]
pub struct SolveArgs {
    /// Model shape (overrides the problem file).
    #[arg(long, value_enum)]
    pub model: Option<ModelKind>,

    /// Evaluate degree days through a precomputed temperature grid.
    ///
    /// Exact when daily temperatures lie on the 1/grid-scale grid.
    #[arg(long)]
    pub accelerate: bool,

    /// Grid points per degree for `--accelerate`.
    #[arg(long, env = "DDFIT_GRID_SCALE", default_value_t = DEFAULT_GRID_SCALE)]
    pub grid_scale: u32,

    /// Iteration cap per L-BFGS pass.
    #[arg(long, env = "DDFIT_MAX_ITERS", default_value_t = 500)]
    pub max_iters: u64,

    /// Grid steps per balance point when deriving the initial guess.
    #[arg(long, default_value_t = DEFAULT_SEED_STEPS)]
    pub seed_steps: usize,
}

/// Options for `ddfit fit`.
#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    /// Problem JSON file (periods, bounds, optional model and initial guess).
    #[arg(value_name = "PROBLEM")]
    pub input: PathBuf,

    #[command(flatten)]
    pub solve: SolveArgs,

    /// Render an ASCII plot in the terminal (enabled by default).
    #[arg(long, default_value_t = true)]
    pub plot: bool,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,

    /// Export per-period results to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export the fit (model + params + diagnostics) to JSON.
    #[arg(long = "export-fit")]
    pub export_fit: Option<PathBuf>,
}

/// Options for `ddfit predict`.
#[derive(Debug, Args, Clone)]
pub struct PredictArgs {
    /// Fit JSON file produced by `ddfit fit --export-fit`.
    #[arg(long, value_name = "JSON")]
    pub fit: PathBuf,

    /// Problem JSON file providing the daily temperatures.
    #[arg(value_name = "PROBLEM")]
    pub input: PathBuf,

    /// Export per-period results to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,
}

/// Options for `ddfit savings`.
#[derive(Debug, Args, Clone)]
pub struct SavingsArgs {
    /// Problem JSON for the pre-intervention (baseline) period.
    #[arg(long, value_name = "PROBLEM")]
    pub baseline: PathBuf,

    /// Problem JSON for the post-intervention (reporting) period.
    #[arg(long, value_name = "PROBLEM")]
    pub reporting: PathBuf,

    #[command(flatten)]
    pub solve: SolveArgs,
}
