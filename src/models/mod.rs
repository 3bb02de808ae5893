//! Degree-day balance-point model implementations.
//!
//! Models are small, pure functions selected by `ModelKind` so that fitting
//! and reporting code can stay generic over the model shape.

pub mod model;

pub use model::*;
