//! Weighted linear least squares.
//!
//! With the balance points held fixed every usage model is linear in its
//! slopes and base load, so the initial-guess search solves many small
//! problems of the form
//!
//! ```text
//! minimize Σ w_i (y_i - x_i^T β)^2
//! ```
//!
//! Rows are scaled by `sqrt(w_i)` and the resulting ordinary problem is solved
//! through an SVD, which copes with tall and rank-deficient design matrices
//! (e.g. a cooling regressor that is zero in every period).

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Weighted least squares over row-major regressors.
///
/// `rows[i]` holds the regressors of observation `i`; every row must have the
/// same length. Returns the coefficients and the weighted SSE, or `None` when
/// there are no rows or the solve fails.
pub fn weighted_least_squares(rows: &[Vec<f64>], y: &[f64], w: &[f64]) -> Option<(Vec<f64>, f64)> {
    let n = rows.len();
    let p = rows.first()?.len();
    if p == 0 || y.len() != n || w.len() != n {
        return None;
    }

    let mut xw = DMatrix::<f64>::zeros(n, p);
    let mut yw = DVector::<f64>::zeros(n);
    for (i, row) in rows.iter().enumerate() {
        let sw = w[i].max(0.0).sqrt();
        for (j, &v) in row.iter().enumerate() {
            xw[(i, j)] = v * sw;
        }
        yw[i] = y[i] * sw;
    }

    let beta = solve_least_squares(&xw, &yw)?;
    let coefs: Vec<f64> = beta.iter().copied().collect();

    let sse: f64 = rows
        .iter()
        .zip(y.iter().zip(w.iter()))
        .map(|(row, (&yi, &wi))| {
            let fit: f64 = row.iter().zip(coefs.iter()).map(|(a, b)| a * b).sum();
            wi * (yi - fit).powi(2)
        })
        .sum();

    sse.is_finite().then_some((coefs, sse))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn zero_weight_rows_are_ignored() {
        // The third row is an outlier but carries no weight.
        let rows = vec![vec![1.0, 0.0], vec![1.0, 1.0], vec![1.0, 2.0], vec![1.0, 3.0]];
        let y = [10.0, 12.0, 500.0, 16.0];
        let w = [1.0, 1.0, 0.0, 1.0];

        let (coefs, sse) = weighted_least_squares(&rows, &y, &w).unwrap();
        assert!((coefs[0] - 10.0).abs() < 1e-9);
        assert!((coefs[1] - 2.0).abs() < 1e-9);
        assert!(sse < 1e-12);
    }

    #[test]
    fn rank_deficient_design_still_solves() {
        // Second regressor is identically zero (e.g. no cooling degree days).
        let rows = vec![vec![1.0, 0.0], vec![1.0, 0.0], vec![1.0, 0.0]];
        let y = [4.0, 6.0, 5.0];
        let w = [1.0; 3];

        let (coefs, _) = weighted_least_squares(&rows, &y, &w).unwrap();
        assert!((coefs[0] - 5.0).abs() < 1e-9);
        assert!(coefs[1].abs() < 1e-9);
    }
}
