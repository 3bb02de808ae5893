//! Bounded minimization backend (argmin L-BFGS).
//!
//! argmin's L-BFGS is unconstrained, so the bounds box is handled by a
//! change of variables: each bounded parameter `x ∈ [lo, hi]` is written as
//!
//! ```text
//! x = lo + (hi - lo) * σ(z),   σ(z) = 1 / (1 + e^{-z})
//! ```
//!
//! and the solver works on `z ∈ ℝ^p`. Gradients are central finite
//! differences (`finitediff`), since the degree-day objective is only
//! piecewise smooth in the balance points.
//!
//! The best point seen by any cost evaluation is tracked outside the solver.
//! A line search that gives up at a kink therefore still yields the best
//! parameters found so far instead of an error, and a few warm restarts from
//! that point are run while they keep improving the cost.

use std::cell::RefCell;

use argmin::core::{CostFunction, Error, Executor, Gradient, State, TerminationReason, TerminationStatus};
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::quasinewton::LBFGS;
use finitediff::FiniteDiff;
use tracing::{debug, warn};

use crate::error::FitError;
use crate::fit::objective::Objective;

pub type Theta = Vec<f64>;

pub type MoreThuenteLS = MoreThuenteLineSearch<Theta, Theta, f64>;

pub type Lbfgs = LBFGS<MoreThuenteLS, Theta, Theta, f64>;

/// Default L-BFGS history size.
pub const DEFAULT_LBFGS_MEM: usize = 7;

/// Fraction of the bound width kept between the initial guess and the bounds;
/// the logistic map is flat at the edges of the box.
const EDGE_FRACTION: f64 = 1e-3;

/// Relative cost improvement below which warm restarts stop.
const RESTART_REL_TOL: f64 = 1e-12;

/// Solver settings.
#[derive(Debug, Clone)]
pub struct SolverOptions {
    pub max_iters: u64,
    pub tol_grad: Option<f64>,
    pub tol_cost: Option<f64>,
    pub lbfgs_mem: usize,
    /// Warm restarts after the first solve.
    pub restarts: usize,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            max_iters: 500,
            tol_grad: None,
            tol_cost: None,
            lbfgs_mem: DEFAULT_LBFGS_MEM,
            restarts: 2,
        }
    }
}

/// What the solver produced.
#[derive(Debug, Clone)]
pub struct SolverOutcome {
    /// Best parameter vector, inside the bounds.
    pub params: Vec<f64>,
    pub cost: f64,
    pub iterations: u64,
    pub termination: String,
    pub converged: bool,
}

/// Logistic change of variables between `ℝ^p` and the bounds box.
#[derive(Debug, Clone)]
pub struct BoxTransform {
    bounds: Vec<(f64, f64)>,
}

impl BoxTransform {
    pub fn new(bounds: &[(f64, f64)]) -> Self {
        Self {
            bounds: bounds.to_vec(),
        }
    }

    /// Map unconstrained coordinates into the box.
    pub fn to_box(&self, z: &[f64]) -> Vec<f64> {
        z.iter()
            .zip(self.bounds.iter())
            .map(|(&zi, &(lo, hi))| lo + (hi - lo) * sigmoid(zi))
            .collect()
    }

    /// Map a point of the box to unconstrained coordinates.
    ///
    /// Points on (or beyond) a bound are pulled slightly inside first.
    pub fn from_box(&self, x: &[f64]) -> Vec<f64> {
        x.iter()
            .zip(self.bounds.iter())
            .map(|(&xi, &(lo, hi))| {
                let width = hi - lo;
                if width <= 0.0 {
                    return 0.0;
                }
                let u = ((xi - lo) / width).clamp(EDGE_FRACTION, 1.0 - EDGE_FRACTION);
                (u / (1.0 - u)).ln()
            })
            .collect()
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Lowest-cost point seen so far, in box coordinates.
#[derive(Debug, Clone, Default)]
struct BestPoint {
    cost: f64,
    params: Option<Vec<f64>>,
}

/// argmin problem: the objective seen through the box transform.
struct BoxedProblem<'a> {
    objective: &'a Objective<'a>,
    transform: &'a BoxTransform,
    best: &'a RefCell<BestPoint>,
}

impl CostFunction for BoxedProblem<'_> {
    type Param = Theta;
    type Output = f64;

    fn cost(&self, z: &Self::Param) -> Result<Self::Output, Error> {
        let x = self.transform.to_box(z);
        let cost = self.objective.sse(&x);
        if !cost.is_finite() {
            return Err(FitError::solver(format!("objective returned a non-finite value ({cost})")).into());
        }

        let mut best = self.best.borrow_mut();
        if best.params.is_none() || cost < best.cost {
            best.cost = cost;
            best.params = Some(x);
        }
        Ok(cost)
    }
}

impl Gradient for BoxedProblem<'_> {
    type Param = Theta;
    type Gradient = Theta;

    fn gradient(&self, z: &Self::Param) -> Result<Self::Gradient, Error> {
        let first_err: RefCell<Option<Error>> = RefCell::new(None);
        let cost_fn = |p: &Theta| -> f64 {
            match self.cost(p) {
                Ok(v) => v,
                Err(e) => {
                    first_err.borrow_mut().get_or_insert(e);
                    f64::NAN
                }
            }
        };
        let grad = z.central_diff(&cost_fn);
        if let Some(err) = first_err.into_inner() {
            return Err(err);
        }
        if let Some((i, g)) = grad.iter().enumerate().find(|(_, g)| !g.is_finite()) {
            return Err(FitError::solver(format!("non-finite gradient component {i} ({g})")).into());
        }
        Ok(grad)
    }
}

fn build_lbfgs(opts: &SolverOptions) -> Result<Lbfgs, FitError> {
    let mut solver = Lbfgs::new(MoreThuenteLS::new(), opts.lbfgs_mem.max(1));
    if let Some(tol) = opts.tol_grad {
        solver = solver
            .with_tolerance_grad(tol)
            .map_err(|e| FitError::config(format!("invalid gradient tolerance: {e}")))?;
    }
    if let Some(tol) = opts.tol_cost {
        solver = solver
            .with_tolerance_cost(tol)
            .map_err(|e| FitError::config(format!("invalid cost tolerance: {e}")))?;
    }
    Ok(solver)
}

/// Minimize `objective` over its bounds box starting from `x0`.
pub fn minimize(objective: &Objective<'_>, x0: &[f64], opts: &SolverOptions) -> Result<SolverOutcome, FitError> {
    if opts.max_iters == 0 {
        return Err(FitError::config("max_iters must be >= 1."));
    }

    let transform = BoxTransform::new(objective.bounds());
    let best = RefCell::new(BestPoint::default());

    let mut start = objective.clamp(x0);
    let mut iterations = 0;
    let mut termination = String::from("not started");
    let mut converged = false;
    let mut prev_cost = f64::INFINITY;

    for pass in 0..=opts.restarts {
        let problem = BoxedProblem {
            objective,
            transform: &transform,
            best: &best,
        };
        let z0 = transform.from_box(&start);
        let solver = build_lbfgs(opts)?;

        match Executor::new(problem, solver)
            .configure(|state| state.param(z0).max_iters(opts.max_iters))
            .run()
        {
            Ok(result) => {
                let state = result.state();
                iterations += state.get_iter();
                let status = state.get_termination_status();
                converged = matches!(
                    status,
                    TerminationStatus::Terminated(TerminationReason::SolverConverged)
                );
                termination = format!("{status:?}");
            }
            Err(err) => {
                // Line searches can fail at kinks of the objective; keep the best point.
                warn!(pass, error = %err, "L-BFGS stopped early; keeping best point found");
                converged = false;
                termination = format!("stopped early: {err}");
            }
        }

        let snapshot = best.borrow().clone();
        let Some(params) = snapshot.params else {
            return Err(FitError::solver(format!("no finite objective value was produced ({termination})")));
        };

        let improved = prev_cost - snapshot.cost > RESTART_REL_TOL * prev_cost.abs().max(1e-300);
        debug!(pass, cost = snapshot.cost, iterations, "L-BFGS pass finished");
        prev_cost = snapshot.cost;
        start = params;
        if !improved && pass > 0 {
            break;
        }
    }

    let best = best.into_inner();
    let params = best.params.ok_or_else(|| FitError::solver("no finite objective value was produced"))?;

    Ok(SolverOutcome {
        params,
        cost: best.cost,
        iterations,
        termination,
        converged,
    })
}
