//! Error types.
//!
//! - `FitError` is what the library returns from fitting and validation.
//! - `AppError` is what the binary reports: a message plus a process exit code.
//!
//! Exit codes used by the binary:
//! - `2`: configuration or input file problems
//! - `3`: degenerate data (nothing left to fit)
//! - `4`: solver failures and output errors

/// Failure modes of a fit.
#[derive(Debug, Clone, PartialEq)]
pub enum FitError {
    /// Inputs or options are inconsistent (lengths, bounds, weights, ...).
    Config(String),
    /// The objective is undefined: every period masked, or zero total weight.
    Degenerate(String),
    /// The optimization backend failed.
    Solver(String),
}

impl FitError {
    pub fn config(message: impl Into<String>) -> Self {
        FitError::Config(message.into())
    }

    pub fn degenerate(message: impl Into<String>) -> Self {
        FitError::Degenerate(message.into())
    }

    pub fn solver(message: impl Into<String>) -> Self {
        FitError::Solver(message.into())
    }

    /// Exit code used when this error reaches the binary.
    pub fn exit_code(&self) -> u8 {
        match self {
            FitError::Config(_) => 2,
            FitError::Degenerate(_) => 3,
            FitError::Solver(_) => 4,
        }
    }
}

impl std::fmt::Display for FitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FitError::Config(msg) => write!(f, "Invalid fit configuration: {msg}"),
            FitError::Degenerate(msg) => write!(f, "Degenerate fit objective: {msg}"),
            FitError::Solver(msg) => write!(f, "Optimizer failed: {msg}"),
        }
    }
}

impl std::error::Error for FitError {}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<FitError> for AppError {
    fn from(err: FitError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
