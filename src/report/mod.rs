//! Reporting utilities: per-period residuals, annualized usage and savings.

use crate::domain::{ModelKind, PeriodResidual};
use crate::error::AppError;
use crate::models::predict;

pub mod format;

pub use format::*;

/// Days per year used to annualize predicted usage.
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Baseline vs reporting comparison over the same (reporting) weather.
#[derive(Debug, Clone)]
pub struct SavingsReport {
    /// Annualized usage predicted by the baseline fit.
    pub baseline_annual: f64,
    /// Annualized usage predicted by the reporting fit.
    pub reporting_annual: f64,
    /// `(baseline - reporting) / baseline`; `None` when the baseline is zero.
    pub fraction: Option<f64>,
}

/// Summary of the input series, printed above the fit diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetStats {
    pub n_periods: usize,
    /// Periods without an observed usage value.
    pub n_masked: usize,
    pub n_days: usize,
    pub temp_min: f64,
    pub temp_max: f64,
}

impl DatasetStats {
    pub fn from_series(observed: &[f64], temps: &[Vec<f64>]) -> Self {
        let (temp_min, temp_max) = temps
            .iter()
            .flatten()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &t| (lo.min(t), hi.max(t)));
        Self {
            n_periods: temps.len(),
            n_masked: observed.iter().filter(|v| !v.is_finite()).count(),
            n_days: temps.iter().map(Vec::len).sum(),
            temp_min,
            temp_max,
        }
    }
}

/// Compare observed and fitted average daily usage for each period.
pub fn period_residuals(
    model: ModelKind,
    params: &[f64],
    observed: &[f64],
    temps: &[Vec<f64>],
    weights: Option<&[f64]>,
) -> Result<Vec<PeriodResidual>, AppError> {
    let totals = predict(model, params, temps);
    let mut out = Vec::with_capacity(temps.len());

    for (index, (days, total)) in temps.iter().zip(totals).enumerate() {
        let n_days = days.len();
        let fitted_avg = total / n_days as f64;
        if !fitted_avg.is_finite() {
            return Err(AppError::new(4, "Non-finite model prediction during residual computation."));
        }
        let observed_avg = observed.get(index).copied().filter(|v| v.is_finite());
        out.push(PeriodResidual {
            index,
            n_days,
            mean_temp: days.iter().sum::<f64>() / n_days as f64,
            observed_avg,
            fitted_avg,
            residual: observed_avg.map(|o| o - fitted_avg),
            weight: weights.and_then(|w| w.get(index).copied()).unwrap_or(1.0),
        });
    }

    Ok(out)
}

/// Predicted usage over `temps`, scaled to a 365-day year.
///
/// Returns `None` for an empty series.
pub fn annualized_usage(model: ModelKind, params: &[f64], temps: &[Vec<f64>]) -> Option<f64> {
    let days: usize = temps.iter().map(Vec::len).sum();
    if days == 0 {
        return None;
    }
    let total: f64 = predict(model, params, temps).iter().sum();
    Some(total * DAYS_PER_YEAR / days as f64)
}

/// Fractional savings of `reporting` relative to `baseline`.
pub fn savings_fraction(baseline: f64, reporting: f64) -> Option<f64> {
    (baseline != 0.0 && baseline.is_finite() && reporting.is_finite()).then(|| (baseline - reporting) / baseline)
}

/// Annualize both fits over the same weather and compare them.
pub fn compare_fits(
    model: ModelKind,
    baseline_params: &[f64],
    reporting_params: &[f64],
    temps: &[Vec<f64>],
) -> Result<SavingsReport, AppError> {
    let annual = |params: &[f64]| {
        annualized_usage(model, params, temps)
            .ok_or_else(|| AppError::new(2, "Cannot annualize usage over an empty temperature series."))
    };
    let baseline_annual = annual(baseline_params)?;
    let reporting_annual = annual(reporting_params)?;
    Ok(SavingsReport {
        baseline_annual,
        reporting_annual,
        fraction: savings_fraction(baseline_annual, reporting_annual),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataset_stats_counts_masked_periods() {
        let temps = vec![vec![48.0, 52.0], vec![71.0]];
        let stats = DatasetStats::from_series(&[1.0, f64::NAN], &temps);
        assert_eq!(
            stats,
            DatasetStats {
                n_periods: 2,
                n_masked: 1,
                n_days: 3,
                temp_min: 48.0,
                temp_max: 71.0,
            }
        );
    }

    #[test]
    fn residuals_skip_missing_observations() {
        let temps = vec![vec![50.0; 30], vec![70.0; 30]];
        let observed = [41.0, f64::NAN];
        let r = period_residuals(ModelKind::Heating, &[65.0, 10.0, 2.0], &observed, &temps, None).unwrap();

        assert_eq!(r.len(), 2);
        assert!((r[0].fitted_avg - 40.0).abs() < 1e-12);
        assert!((r[0].residual.unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(r[0].mean_temp, 50.0);
        assert_eq!(r[1].observed_avg, None);
        assert_eq!(r[1].residual, None);
        assert!((r[1].fitted_avg - 10.0).abs() < 1e-12);
    }

    #[test]
    fn annualized_usage_scales_to_a_year() {
        // 10/day base load, no heating below 50 at bp=40.
        let temps = vec![vec![50.0; 73]];
        let annual = annualized_usage(ModelKind::Heating, &[40.0, 10.0, 2.0], &temps).unwrap();
        assert!((annual - 3650.0).abs() < 1e-9);
        assert_eq!(annualized_usage(ModelKind::Heating, &[40.0, 10.0, 2.0], &[]), None);
    }

    #[test]
    fn savings_fraction_handles_zero_baseline() {
        assert_eq!(savings_fraction(100.0, 80.0), Some(0.2));
        assert_eq!(savings_fraction(0.0, 10.0), None);
        assert!(savings_fraction(100.0, 120.0).unwrap() < 0.0);
    }

    #[test]
    fn compare_fits_uses_shared_weather() {
        let temps = vec![vec![50.0; 30], vec![60.0; 30]];
        let report = compare_fits(ModelKind::Heating, &[65.0, 10.0, 2.0], &[65.0, 10.0, 1.0], &temps).unwrap();
        assert!(report.baseline_annual > report.reporting_annual);
        let f = report.fraction.unwrap();
        assert!(f > 0.0 && f < 1.0);
    }
}
