//! Input/output helpers.
//!
//! - problem JSON read + fit JSON read/write (`problem`)
//! - per-period result export (CSV) (`export`)

pub mod export;
pub mod problem;

pub use export::*;
pub use problem::*;
