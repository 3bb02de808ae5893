//! Shared domain types.
//!
//! These types are kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting
//! - read from problem files and written to fit files
//! - selected from the command line (`ModelKind` is a clap value enum)

use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Default interpolation grid resolution: `1 / 10` degree.
pub const DEFAULT_GRID_SCALE: u32 = 10;

/// Which balance-point model shape to fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// Single heating balance point:
    /// `(reference_temperature, base_load, heating_slope)`.
    Heating,
    /// Single cooling balance point:
    /// `(reference_temperature, base_load, cooling_slope)`.
    Cooling,
    /// Dual heating + cooling balance points:
    /// `(ts_low, ts_high, base_load, bp_low, bp_diff)` with
    /// `bp_high = bp_low + bp_diff`.
    Dual,
}

impl ModelKind {
    pub const ALL: [ModelKind; 3] = [ModelKind::Heating, ModelKind::Cooling, ModelKind::Dual];

    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            ModelKind::Heating => "HDD balance point",
            ModelKind::Cooling => "CDD balance point",
            ModelKind::Dual => "HDD+CDD dual balance point",
        }
    }

    /// Number of entries in the parameter vector.
    pub fn param_len(self) -> usize {
        self.param_names().len()
    }

    /// Parameter names, in parameter-vector order.
    pub fn param_names(self) -> &'static [&'static str] {
        match self {
            ModelKind::Heating => &["reference_temperature", "base_load", "heating_slope"],
            ModelKind::Cooling => &["reference_temperature", "base_load", "cooling_slope"],
            ModelKind::Dual => &["ts_low", "ts_high", "base_load", "bp_low", "bp_diff"],
        }
    }
}

/// Degree-day evaluation strategy used inside the optimizer.
///
/// `Grid` is exact when every daily temperature lies on the `1 / scale` grid
/// (whole- or half-degree station data with `scale` 1, 2, 10, ...). With finer
/// source data it becomes a close approximation, so it is opt-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Accelerator {
    /// Scan every daily reading on each objective evaluation.
    #[default]
    Off,
    /// Precompute degree days on a `1 / scale` grid once per fit.
    Grid { scale: u32 },
}

impl Accelerator {
    pub fn grid() -> Self {
        Accelerator::Grid {
            scale: DEFAULT_GRID_SCALE,
        }
    }

    pub fn label(self) -> String {
        match self {
            Accelerator::Off => "off".to_string(),
            Accelerator::Grid { scale } => format!("grid (1/{scale} degree)"),
        }
    }
}

/// Fit quality diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitQuality {
    /// Weighted SSE of average daily usage over unmasked periods.
    pub sse: f64,
    /// `sqrt(sse / n)`.
    pub rmse: f64,
    /// Number of periods contributing to the objective.
    pub n: usize,
    pub iterations: u64,
    /// Solver termination status, as reported by the backend.
    pub termination: String,
    pub converged: bool,
}

/// One named parameter value (fit files list parameters by name).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedParam {
    pub name: String,
    pub value: f64,
}

/// A saved fit (JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitFile {
    pub tool: String,
    pub model: ModelKind,
    pub display_name: String,
    pub params: Vec<NamedParam>,
    pub bounds: Vec<(f64, f64)>,
    pub accelerator: Accelerator,
    pub quality: FitQuality,
}

impl FitFile {
    /// Parameter vector in model order.
    pub fn param_vector(&self) -> Vec<f64> {
        self.params.iter().map(|p| p.value).collect()
    }
}

/// One billing period in a problem file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodRecord {
    /// Daily temperatures observed during the period.
    pub temps: Vec<f64>,
    /// Observed average daily usage; `null` means "exclude from the fit".
    #[serde(default)]
    pub usage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

/// A fit problem as read from JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitProblem {
    /// Model shape; may be overridden from the command line.
    #[serde(default)]
    pub model: Option<ModelKind>,
    pub periods: Vec<PeriodRecord>,
    /// One `[min, max]` pair per parameter.
    pub bounds: Vec<(f64, f64)>,
    /// Optional starting point; derived by grid search when absent.
    #[serde(default)]
    pub initial_guess: Option<Vec<f64>>,
}

impl FitProblem {
    /// Daily temperature series, one entry per period.
    pub fn temperatures(&self) -> Vec<Vec<f64>> {
        self.periods.iter().map(|p| p.temps.clone()).collect()
    }

    /// Observed average daily usage with missing values as NaN.
    pub fn observed(&self) -> Vec<f64> {
        self.periods
            .iter()
            .map(|p| p.usage.unwrap_or(f64::NAN))
            .collect()
    }

    /// Per-period weights, or `None` when no period specifies one.
    ///
    /// Periods without a weight default to `1.0` once any weight is given.
    pub fn weights(&self) -> Option<Vec<f64>> {
        if self.periods.iter().all(|p| p.weight.is_none()) {
            return None;
        }
        Some(self.periods.iter().map(|p| p.weight.unwrap_or(1.0)).collect())
    }
}

/// Per-period comparison of observed and fitted average daily usage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodResidual {
    pub index: usize,
    pub n_days: usize,
    pub mean_temp: f64,
    /// `None` when the observation was missing (masked in the fit).
    pub observed_avg: Option<f64>,
    pub fitted_avg: f64,
    pub residual: Option<f64>,
    pub weight: f64,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus environment defaults).
#[derive(Debug, Clone)]
pub struct FitConfig {
    pub input: PathBuf,
    /// Overrides the problem file's model when set.
    pub model: Option<ModelKind>,
    pub accelerator: Accelerator,
    pub max_iters: u64,
    /// Grid steps per balance point for the initial-guess search.
    pub seed_steps: usize,

    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,

    pub export_results: Option<PathBuf>,
    pub export_fit: Option<PathBuf>,
}
