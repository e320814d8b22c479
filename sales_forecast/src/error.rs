//! Error types for the sales_forecast crate

use polars::prelude::PolarsError;
use thiserror::Error;

/// Custom error types for the sales_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Input could not be read or parsed at all
    #[error("Data load error: {0}")]
    DataLoadError(String),

    /// No usable observations remain after cleaning or grouping
    #[error("Empty series: {0}")]
    EmptySeriesError(String),

    /// `predict` was called before `fit`
    #[error("Model not fitted: {0} must be fitted before prediction")]
    ModelNotFittedError(String),

    /// A capability was requested from a model variant that lacks it
    #[error("Unsupported operation: {operation} is not available for {model}")]
    UnsupportedOperationError { model: String, operation: String },

    /// The underlying estimation routine failed
    #[error("Failed to fit {model}: {reason}")]
    ModelFitError { model: String, reason: String },

    /// Error related to data validation
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),

    /// Error from JSON (de)serialization
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Error from the numeric building blocks
    #[error("Math error: {0}")]
    MathError(#[from] forecast_math::MathError),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<PolarsError> for ForecastError {
    fn from(err: PolarsError) -> Self {
        ForecastError::PolarsError(err.to_string())
    }
}

impl From<serde_json::Error> for ForecastError {
    fn from(err: serde_json::Error) -> Self {
        ForecastError::SerializationError(err.to_string())
    }
}

impl From<csv::Error> for ForecastError {
    fn from(err: csv::Error) -> Self {
        ForecastError::DataLoadError(err.to_string())
    }
}

impl ForecastError {
    /// Attach a model name to a failure raised inside an estimation routine
    pub fn fit_failure(model: &str, reason: impl std::fmt::Display) -> Self {
        ForecastError::ModelFitError {
            model: model.to_string(),
            reason: reason.to_string(),
        }
    }
}
