//! Model fitting.
//!
//! Responsibilities:
//!
//! - precompute degree days on a temperature grid (`grid`)
//! - masked, weighted SSE objective (`objective`)
//! - bounded L-BFGS minimization (`solver`)
//! - initial-guess search over balance points (`seed`)
//! - single and batch fits (`fitter`)

pub mod fitter;
pub mod grid;
pub mod objective;
pub mod seed;
pub mod solver;

pub use fitter::*;
pub use grid::*;
pub use objective::*;
pub use seed::*;
pub use solver::*;
