//! # Forecast Math
//!
//! Numeric building blocks used by the sales forecasting pipeline.
//! Nothing in this crate knows about dates, transactions or models; it works
//! on plain `f64` slices.
//!
//! - [`stats`]: descriptive statistics (unbiased sample variance by default)
//! - [`rolling`]: trailing-window mean and standard deviation
//! - [`difference`]: regular/seasonal differencing expressed as lag polynomials
//! - [`optimize`]: bounded Nelder-Mead simplex minimisation

use thiserror::Error;

pub mod difference;
pub mod optimize;
pub mod rolling;
pub mod stats;

/// Errors that can occur in numeric calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for numeric operations
pub type Result<T> = std::result::Result<T, MathError>;
