//! `ddfit` library crate.
//!
//! Degree-day balance-point models of energy usage: heating, cooling and dual
//! (heating + cooling) shapes, fitted to billing-period usage against daily
//! outdoor temperatures.
//!
//! The binary (`ddfit`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the fitting engine is usable on its own (`fit::BalancePointModel`)

pub mod app;
pub mod cli;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
