//! Precomputed degree-day grid.
//!
//! The optimizer evaluates the objective tens to hundreds of times per fit.
//! Scanning every daily reading each time costs O(total days); this module
//! trades that for a one-time precomputation on a uniform grid of candidate
//! balance points (spacing `1 / scale`), after which a query costs
//! O(number of periods).
//!
//! For every grid value and every period we store:
//!
//! - the degree-day total at that grid value
//! - the margin: the number of days that contribute for any balance point
//!   strictly between this grid value and its neighbour in the query
//!   direction (heating: days with `t <= r`; cooling: days with `t >= c`)
//!
//! Heating query at `bp`: with `r = floor(bp * scale) / scale`,
//! `HDD(bp) = HDD(r) + (bp - r) * margin(r)`.
//! Cooling query at `bp`: with `c = ceil(bp * scale) / scale`,
//! `CDD(bp) = CDD(c) + (c - bp) * margin(c)`.
//!
//! Both are exact when the daily temperatures themselves lie on the grid: no
//! reading can fall strictly between two neighbouring grid values, so every
//! marginal day contributes linearly across the sub-grid offset. For finer
//! source data the result is a close approximation.
//!
//! Rows are built eagerly and indexed by the integer grid index `k`
//! (grid value `k / scale`); the grid is immutable after construction.

use tracing::debug;

use crate::domain::ModelKind;
use crate::error::FitError;
use crate::math::DegreeDaySource;

/// Upper limit on rows per side, to keep absurd bounds from exhausting memory.
pub const MAX_GRID_ROWS: usize = 200_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Heating,
    Cooling,
}

/// Precomputed rows for one side (heating or cooling) of the grid.
#[derive(Debug, Clone)]
struct GridSide {
    k_min: i64,
    k_max: i64,
    /// `totals[k - k_min][period]`
    totals: Vec<Vec<f64>>,
    /// `margins[k - k_min][period]`
    margins: Vec<Vec<f64>>,
}

impl GridSide {
    fn build(side: Side, range: (f64, f64), scale: f64, periods: &[Vec<f64>]) -> Result<Self, FitError> {
        let (lo, hi) = range;
        if !(lo.is_finite() && hi.is_finite() && lo <= hi) {
            return Err(FitError::config(format!(
                "Invalid degree-day grid range: [{lo}, {hi}]."
            )));
        }

        // Widen by one grid step on each end so queries at the bounds never clip.
        let k_min = (lo * scale).floor() as i64 - 1;
        let k_max = (hi * scale).ceil() as i64 + 1;
        let rows = (k_max - k_min + 1) as usize;
        if rows > MAX_GRID_ROWS {
            return Err(FitError::config(format!(
                "Degree-day grid would need {rows} rows (limit {MAX_GRID_ROWS}); tighten the balance-point bounds or lower the grid scale."
            )));
        }

        // Per-period extremes decide which periods can contribute at a grid value.
        let extremes: Vec<f64> = periods
            .iter()
            .map(|temps| match side {
                Side::Heating => temps.iter().copied().fold(f64::INFINITY, f64::min),
                Side::Cooling => temps.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            })
            .collect();

        let mut totals = Vec::with_capacity(rows);
        let mut margins = Vec::with_capacity(rows);
        for k in k_min..=k_max {
            let g = k as f64 / scale;
            let mut total_row = vec![0.0; periods.len()];
            let mut margin_row = vec![0.0; periods.len()];

            for (j, temps) in periods.iter().enumerate() {
                let (total, margin) = match side {
                    // No day at or below `g`: no heating here or just above.
                    Side::Heating if g < extremes[j] => continue,
                    Side::Cooling if g > extremes[j] => continue,
                    Side::Heating => temps.iter().fold((0.0, 0.0), |(sum, count), &t| {
                        if t <= g { (sum + (g - t), count + 1.0) } else { (sum, count) }
                    }),
                    Side::Cooling => temps.iter().fold((0.0, 0.0), |(sum, count), &t| {
                        if t >= g { (sum + (t - g), count + 1.0) } else { (sum, count) }
                    }),
                };
                total_row[j] = total;
                margin_row[j] = margin;
            }

            totals.push(total_row);
            margins.push(margin_row);
        }

        Ok(Self {
            k_min,
            k_max,
            totals,
            margins,
        })
    }

    fn range(&self, scale: f64) -> (f64, f64) {
        (self.k_min as f64 / scale, self.k_max as f64 / scale)
    }

    fn query(&self, side: Side, balance_point: f64, scale: f64) -> Vec<f64> {
        // Bounded solvers can step marginally outside the box; clamp rather than fail.
        let (lo, hi) = self.range(scale);
        let bp = balance_point.clamp(lo, hi);

        let k = match side {
            Side::Heating => (bp * scale).floor() as i64,
            Side::Cooling => (bp * scale).ceil() as i64,
        }
        .clamp(self.k_min, self.k_max);

        let g = k as f64 / scale;
        let remainder = match side {
            Side::Heating => bp - g,
            Side::Cooling => g - bp,
        };

        let row = (k - self.k_min) as usize;
        self.totals[row]
            .iter()
            .zip(self.margins[row].iter())
            .map(|(&total, &margin)| total + remainder * margin)
            .collect()
    }
}

/// Degree-day accelerator built once per fit.
#[derive(Debug, Clone)]
pub struct DegreeDayGrid {
    scale: f64,
    day_counts: Vec<f64>,
    heating: Option<GridSide>,
    cooling: Option<GridSide>,
}

impl DegreeDayGrid {
    /// Build a grid covering the given heating and cooling balance-point ranges.
    ///
    /// A side whose range is `None` is not built; querying it panics.
    pub fn new(
        periods: &[Vec<f64>],
        heating_range: Option<(f64, f64)>,
        cooling_range: Option<(f64, f64)>,
        scale: u32,
    ) -> Result<Self, FitError> {
        if scale == 0 {
            return Err(FitError::config("Grid scale must be >= 1."));
        }
        if periods.iter().any(|temps| temps.is_empty()) {
            return Err(FitError::config("Every period needs at least one daily temperature."));
        }
        let scale_f = scale as f64;

        let heating = heating_range
            .map(|range| GridSide::build(Side::Heating, range, scale_f, periods))
            .transpose()?;
        let cooling = cooling_range
            .map(|range| GridSide::build(Side::Cooling, range, scale_f, periods))
            .transpose()?;

        debug!(
            periods = periods.len(),
            scale,
            heating_rows = heating.as_ref().map_or(0, |s| s.totals.len()),
            cooling_rows = cooling.as_ref().map_or(0, |s| s.totals.len()),
            "built degree-day grid"
        );

        Ok(Self {
            scale: scale_f,
            day_counts: periods.iter().map(|temps| temps.len() as f64).collect(),
            heating,
            cooling,
        })
    }

    /// Build the grid a model needs, with ranges implied by its bounds.
    ///
    /// - heating: heating side over the reference-temperature bound
    /// - cooling: cooling side over the reference-temperature bound
    /// - dual: heating side over the `bp_low` bound, cooling side over
    ///   `[bp_low.min + bp_diff.min, bp_low.max + bp_diff.max]`
    pub fn for_model(
        model: ModelKind,
        periods: &[Vec<f64>],
        bounds: &[(f64, f64)],
        scale: u32,
    ) -> Result<Self, FitError> {
        if bounds.len() != model.param_len() {
            return Err(FitError::config(format!(
                "{} expects {} bounds, got {}.",
                model.display_name(),
                model.param_len(),
                bounds.len()
            )));
        }
        match model {
            ModelKind::Heating => Self::new(periods, Some(bounds[0]), None, scale),
            ModelKind::Cooling => Self::new(periods, None, Some(bounds[0]), scale),
            ModelKind::Dual => {
                let (low, diff) = (bounds[3], bounds[4]);
                let cooling = (low.0 + diff.0, low.1 + diff.1);
                Self::new(periods, Some(low), Some(cooling), scale)
            }
        }
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Balance-point range covered by the heating side, if built.
    pub fn heating_range(&self) -> Option<(f64, f64)> {
        self.heating.as_ref().map(|s| s.range(self.scale))
    }

    /// Balance-point range covered by the cooling side, if built.
    pub fn cooling_range(&self) -> Option<(f64, f64)> {
        self.cooling.as_ref().map(|s| s.range(self.scale))
    }
}

impl DegreeDaySource for DegreeDayGrid {
    fn period_count(&self) -> usize {
        self.day_counts.len()
    }

    fn day_count(&self, period: usize) -> f64 {
        self.day_counts[period]
    }

    fn heating(&self, balance_point: f64) -> Vec<f64> {
        match &self.heating {
            Some(side) => side.query(Side::Heating, balance_point, self.scale),
            None => panic!("degree-day grid was built without a heating side"),
        }
    }

    fn cooling(&self, balance_point: f64) -> Vec<f64> {
        match &self.cooling {
            Some(side) => side.query(Side::Cooling, balance_point, self.scale),
            None => panic!("degree-day grid was built without a cooling side"),
        }
    }
}
