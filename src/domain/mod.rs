//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - model selection and options (`ModelKind`, `Accelerator`, `FitConfig`)
//! - problem inputs (`FitProblem`, `PeriodRecord`)
//! - fit outputs (`FitQuality`, `FitFile`, `PeriodResidual`)

pub mod types;

pub use types::*;
