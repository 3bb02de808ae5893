//! Usage prediction for the heating / cooling / dual balance-point models.
//!
//! Every model predicts a period **total** (not a daily average):
//!
//! - heating: `heating_slope * HDD(reference_temperature) + base_load * n_days`
//! - cooling: `cooling_slope * CDD(reference_temperature) + base_load * n_days`
//! - dual:    `ts_low * HDD(bp_low) + ts_high * CDD(bp_low + bp_diff) + base_load * n_days`
//!
//! The dual model is parameterized by the gap `bp_diff`, never by the raw
//! upper balance point, so `bp_high >= bp_low` whenever `bp_diff >= 0`.

use crate::domain::ModelKind;
use crate::math::{DailyTemperatures, DegreeDaySource};

/// Predict per-period usage totals by scanning the daily temperatures.
///
/// # Panics
/// Panics if `params.len() != model.param_len()`. Callers should validate the
/// parameter vector (the fitter does so before optimizing).
pub fn predict(model: ModelKind, params: &[f64], temps: &[Vec<f64>]) -> Vec<f64> {
    predict_with(model, params, &DailyTemperatures::new(temps))
}

/// Predict per-period usage totals from any degree-day source.
///
/// # Panics
/// Panics if `params.len() != model.param_len()`.
pub fn predict_with<S: DegreeDaySource + ?Sized>(model: ModelKind, params: &[f64], source: &S) -> Vec<f64> {
    assert_eq!(
        params.len(),
        model.param_len(),
        "{} expects {} parameters",
        model.display_name(),
        model.param_len()
    );

    let n = source.period_count();
    match model {
        ModelKind::Heating => {
            let (reference_temperature, base_load, heating_slope) = (params[0], params[1], params[2]);
            let hdd = source.heating(reference_temperature);
            (0..n)
                .map(|j| heating_slope * hdd[j] + base_load * source.day_count(j))
                .collect()
        }
        ModelKind::Cooling => {
            let (reference_temperature, base_load, cooling_slope) = (params[0], params[1], params[2]);
            let cdd = source.cooling(reference_temperature);
            (0..n)
                .map(|j| cooling_slope * cdd[j] + base_load * source.day_count(j))
                .collect()
        }
        ModelKind::Dual => {
            let (ts_low, ts_high, base_load) = (params[0], params[1], params[2]);
            let (bp_low, bp_high) = dual_balance_points(params);
            let hdd = source.heating(bp_low);
            let cdd = source.cooling(bp_high);
            (0..n)
                .map(|j| ts_low * hdd[j] + ts_high * cdd[j] + base_load * source.day_count(j))
                .collect()
        }
    }
}

/// Predict per-period average daily usage (`total / n_days`).
pub fn predict_average_daily(model: ModelKind, params: &[f64], temps: &[Vec<f64>]) -> Vec<f64> {
    predict(model, params, temps)
        .into_iter()
        .zip(temps.iter())
        .map(|(total, days)| total / days.len() as f64)
        .collect()
}

/// Usage of a single day at temperature `temp`.
///
/// This is the model's response curve; plots sample it over a temperature range.
pub fn daily_usage(model: ModelKind, params: &[f64], temp: f64) -> f64 {
    let day = [vec![temp]];
    predict(model, params, &day)[0]
}

/// `(bp_low, bp_high)` of a dual-model parameter vector.
pub fn dual_balance_points(params: &[f64]) -> (f64, f64) {
    let bp_low = params[3];
    (bp_low, bp_low + params[4])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heating_model_constant_temperature_scenario() {
        // Two 30-day periods at a constant 50°F.
        let temps = vec![vec![50.0; 30], vec![50.0; 30]];
        let params = [65.0, 10.0, 2.0];

        let avg = predict_average_daily(ModelKind::Heating, &params, &temps);
        assert_eq!(avg.len(), 2);
        for v in avg {
            assert!((v - 40.0).abs() < 1e-12, "expected 40, got {v}");
        }
    }

    #[test]
    fn dual_model_three_day_scenario() {
        let temps = vec![vec![60.0, 70.0, 80.0]];
        let params = [1.0, 1.0, 0.0, 65.0, 5.0];

        let totals = predict(ModelKind::Dual, &params, &temps);
        assert!((totals[0] - 15.0).abs() < 1e-12);
        assert_eq!(dual_balance_points(&params), (65.0, 70.0));
    }

    #[test]
    fn cooling_model_mirrors_heating() {
        let temps = vec![vec![80.0; 10]];
        let totals = predict(ModelKind::Cooling, &[70.0, 5.0, 3.0], &temps);
        assert!((totals[0] - (3.0 * 100.0 + 5.0 * 10.0)).abs() < 1e-12);
    }

    #[test]
    fn single_day_on_balance_point_is_base_load_only() {
        let temps = vec![vec![65.0]];
        for model in ModelKind::ALL {
            let params: Vec<f64> = match model {
                ModelKind::Heating | ModelKind::Cooling => vec![65.0, 7.0, 4.0],
                ModelKind::Dual => vec![4.0, 4.0, 7.0, 65.0, 0.0],
            };
            let totals = predict(model, &params, &temps);
            assert!((totals[0] - 7.0).abs() < 1e-12, "{model:?}");
        }
    }

    #[test]
    fn daily_usage_traces_the_response_curve() {
        let params = [2.0, 3.0, 10.0, 60.0, 10.0];
        assert!((daily_usage(ModelKind::Dual, &params, 65.0) - 10.0).abs() < 1e-12);
        assert!((daily_usage(ModelKind::Dual, &params, 50.0) - 30.0).abs() < 1e-12);
        assert!((daily_usage(ModelKind::Dual, &params, 80.0) - 40.0).abs() < 1e-12);
    }

    #[test]
    #[should_panic]
    fn wrong_parameter_count_panics() {
        let temps = vec![vec![50.0]];
        predict(ModelKind::Dual, &[1.0, 2.0, 3.0], &temps);
    }
}
