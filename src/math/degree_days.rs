//! Heating / cooling degree-day kernel.
//!
//! For a balance point `bp` and the daily temperatures `t_d` of one period:
//!
//! - `HDD(bp) = Σ max(bp - t_d, 0)`
//! - `CDD(bp) = Σ max(t_d - bp, 0)`
//!
//! A day sitting exactly on the balance point contributes zero to both sums.

/// Heating degree days of a single period.
pub fn heating_degree_days(balance_point: f64, temps: &[f64]) -> f64 {
    temps.iter().map(|&t| (balance_point - t).max(0.0)).sum()
}

/// Cooling degree days of a single period.
pub fn cooling_degree_days(balance_point: f64, temps: &[f64]) -> f64 {
    temps.iter().map(|&t| (t - balance_point).max(0.0)).sum()
}

/// Heating degree days for every period of a series.
pub fn heating_degree_days_per_period(balance_point: f64, periods: &[Vec<f64>]) -> Vec<f64> {
    periods
        .iter()
        .map(|temps| heating_degree_days(balance_point, temps))
        .collect()
}

/// Cooling degree days for every period of a series.
pub fn cooling_degree_days_per_period(balance_point: f64, periods: &[Vec<f64>]) -> Vec<f64> {
    periods
        .iter()
        .map(|temps| cooling_degree_days(balance_point, temps))
        .collect()
}

/// Number of days in every period, as `f64` for use in model arithmetic.
pub fn day_counts(periods: &[Vec<f64>]) -> Vec<f64> {
    periods.iter().map(|temps| temps.len() as f64).collect()
}

/// Source of per-period degree-day totals.
///
/// Model prediction only needs HDD/CDD vectors at a balance point plus the
/// number of days in each period. The brute-force [`DailyTemperatures`] view
/// and the precomputed grid (`fit::grid::DegreeDayGrid`) both provide them,
/// so the same prediction code runs on either.
pub trait DegreeDaySource {
    /// Number of billing periods.
    fn period_count(&self) -> usize;

    /// Number of days in period `period`.
    fn day_count(&self, period: usize) -> f64;

    /// Heating degree days per period at `balance_point`.
    fn heating(&self, balance_point: f64) -> Vec<f64>;

    /// Cooling degree days per period at `balance_point`.
    fn cooling(&self, balance_point: f64) -> Vec<f64>;
}

/// Brute-force degree-day source scanning every daily reading on each call.
#[derive(Debug, Clone, Copy)]
pub struct DailyTemperatures<'a> {
    periods: &'a [Vec<f64>],
}

impl<'a> DailyTemperatures<'a> {
    pub fn new(periods: &'a [Vec<f64>]) -> Self {
        Self { periods }
    }

    pub fn periods(&self) -> &'a [Vec<f64>] {
        self.periods
    }
}

impl DegreeDaySource for DailyTemperatures<'_> {
    fn period_count(&self) -> usize {
        self.periods.len()
    }

    fn day_count(&self, period: usize) -> f64 {
        self.periods[period].len() as f64
    }

    fn heating(&self, balance_point: f64) -> Vec<f64> {
        heating_degree_days_per_period(balance_point, self.periods)
    }

    fn cooling(&self, balance_point: f64) -> Vec<f64> {
        cooling_degree_days_per_period(balance_point, self.periods)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_on_balance_point_contributes_nothing() {
        let temps = [65.0; 10];
        assert_eq!(heating_degree_days(65.0, &temps), 0.0);
        assert_eq!(cooling_degree_days(65.0, &temps), 0.0);
    }

    #[test]
    fn mixed_period_splits_into_hdd_and_cdd() {
        let temps = [60.0, 70.0, 80.0];
        assert_eq!(heating_degree_days(65.0, &temps), 5.0);
        assert_eq!(cooling_degree_days(70.0, &temps), 10.0);
        // Single-day period.
        assert_eq!(heating_degree_days(65.0, &[64.5]), 0.5);
        assert_eq!(cooling_degree_days(65.0, &[64.5]), 0.0);
    }

    #[test]
    fn degree_days_are_monotone_in_balance_point() {
        let temps = [41.0, 48.5, 55.0, 63.0, 70.0, 71.5, 88.0];
        let mut prev_hdd = f64::NEG_INFINITY;
        let mut prev_cdd = f64::INFINITY;
        for i in 0..=120 {
            let bp = 30.0 + i as f64 * 0.5;
            let hdd = heating_degree_days(bp, &temps);
            let cdd = cooling_degree_days(bp, &temps);
            assert!(hdd >= prev_hdd, "HDD decreased at bp={bp}");
            assert!(cdd <= prev_cdd, "CDD increased at bp={bp}");
            prev_hdd = hdd;
            prev_cdd = cdd;
        }
    }

    #[test]
    fn brute_force_source_matches_free_functions() {
        let periods = vec![vec![50.0, 52.0], vec![75.0], vec![60.0, 66.0, 72.0]];
        let src = DailyTemperatures::new(&periods);
        assert_eq!(src.period_count(), 3);
        assert_eq!(src.day_count(2), 3.0);
        assert_eq!(src.heating(65.0), vec![28.0, 0.0, 5.0]);
        assert_eq!(src.cooling(65.0), vec![0.0, 10.0, 8.0]);
        assert_eq!(day_counts(&periods), vec![2.0, 1.0, 3.0]);
    }
}
