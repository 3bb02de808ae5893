//! Formatted terminal output.
//!
//! Formatting lives here so the fitting code never builds strings and output
//! changes stay local.

use crate::domain::{ModelKind, PeriodResidual};
use crate::fit::{BalancePointModel, ModelFit};
use crate::report::{DatasetStats, SavingsReport};

/// Format the run summary (dataset stats + fit diagnostics + parameters).
pub fn format_run_summary(stats: &DatasetStats, model: &BalancePointModel, fit: &ModelFit, guess_source: &str) -> String {
    let mut out = String::new();

    out.push_str("=== ddfit - Degree-Day Balance-Point Fit ===\n");
    out.push_str(&format!(
        "Periods: n={} (missing usage: {}) | days={} | temp=[{:.1}, {:.1}]\n",
        stats.n_periods, stats.n_masked, stats.n_days, stats.temp_min, stats.temp_max
    ));
    out.push_str(&format!(
        "Model: {} | accelerator: {} | initial guess: {guess_source}\n",
        fit.model.display_name(),
        model.options.accelerator.label()
    ));

    let q = &fit.quality;
    out.push_str("\nFit diagnostics:\n");
    out.push_str(&format!("SSE={:.6} RMSE={:.6} n={}\n", q.sse, q.rmse, q.n));
    out.push_str(&format!(
        "iterations={} converged={} ({})\n",
        q.iterations, q.converged, q.termination
    ));

    out.push_str("\nParameters:\n");
    out.push_str(&format_params(fit.model, &fit.params, &model.bounds));
    out.push('\n');

    out
}

/// Parameter table with the bounds each value was fitted within.
pub fn format_params(model: ModelKind, params: &[f64], bounds: &[(f64, f64)]) -> String {
    let mut out = String::new();
    push_row(&mut out, format!("{:<22} {:>14} {:>24}", "name", "value", "bounds"));
    push_row(&mut out, format!("{:-<22} {:-<14} {:-<24}", "", "", ""));

    for (i, name) in model.param_names().iter().enumerate() {
        let value = params.get(i).copied().unwrap_or(f64::NAN);
        let bound = bounds
            .get(i)
            .map(|(lo, hi)| format!("[{lo:.3}, {hi:.3}]"))
            .unwrap_or_default();
        let flag = if at_bound(value, bounds.get(i)) { " *" } else { "" };
        push_row(&mut out, format!("{name:<22} {value:>14.6} {bound:>24}{flag}"));
    }

    if model == ModelKind::Dual && params.len() == 5 {
        push_row(&mut out, format!("{:<22} {:>14.6}", "bp_high", params[3] + params[4]));
    }

    out
}

/// Per-period observed vs fitted average daily usage.
pub fn format_residuals(rows: &[PeriodResidual]) -> String {
    let mut out = String::new();
    push_row(
        &mut out,
        format!(
            "{:>6} {:>6} {:>10} {:>12} {:>12} {:>12} {:>8}",
            "period", "days", "mean_temp", "observed", "fitted", "residual", "weight"
        ),
    );
    push_row(
        &mut out,
        format!("{:->6} {:->6} {:->10} {:->12} {:->12} {:->12} {:->8}", "", "", "", "", "", "", ""),
    );

    for r in rows {
        push_row(
            &mut out,
            format!(
                "{:>6} {:>6} {:>10.2} {:>12} {:>12.4} {:>12} {:>8.3}",
                r.index,
                r.n_days,
                r.mean_temp,
                fmt_opt(r.observed_avg),
                r.fitted_avg,
                fmt_opt(r.residual),
                r.weight
            ),
        );
    }

    out
}

/// Annualized baseline vs reporting usage.
pub fn format_savings(report: &SavingsReport) -> String {
    let mut out = String::new();
    out.push_str("Savings (annualized over reporting-period weather):\n");
    out.push_str(&format!("- baseline : {:.3}\n", report.baseline_annual));
    out.push_str(&format!("- reporting: {:.3}\n", report.reporting_annual));
    match report.fraction {
        Some(f) => out.push_str(&format!("- savings  : {:.2}%\n", f * 100.0)),
        None => out.push_str("- savings  : n/a (zero baseline)\n"),
    }
    out
}

fn push_row(out: &mut String, row: String) {
    out.push_str(row.trim_end());
    out.push('\n');
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map(|v| format!("{v:.4}")).unwrap_or_else(|| "-".to_string())
}

fn at_bound(value: f64, bound: Option<&(f64, f64)>) -> bool {
    let Some(&(lo, hi)) = bound else {
        return false;
    };
    if hi <= lo {
        return false;
    }
    let tol = 1e-6 * (hi - lo);
    (value - lo).abs() <= tol || (hi - value).abs() <= tol
}
