//! # Sales Forecast
//!
//! A Rust library for forecasting retail sales from transaction records.
//!
//! ## Features
//!
//! - CSV loading with UTF-8 / Windows-1252 fallback
//! - Data quality gate (duplicates, missing values) with a side-channel report
//! - Aggregation into contiguous daily, weekly or monthly series
//! - Calendar, cyclical, lag and rolling-window features
//! - Candidate models: naive and mean baselines, seasonal ARIMA, linear
//!   regression and random forest
//! - Evaluation (RMSE, MAE, MAPE, R²) and model ranking
//! - Forecast tables as polars DataFrames
//!
//! ## Quick Start
//!
//! ```no_run
//! use sales_forecast::{ForecastPipeline, PipelineConfig};
//!
//! let pipeline = ForecastPipeline::new(PipelineConfig::default())?;
//! let report = pipeline.run_csv("sales.csv")?;
//!
//! println!("{}", report.comparison);
//! report.write_tables("output")?;
//! # Ok::<(), sales_forecast::ForecastError>(())
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod features;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod quality;
pub mod series;
pub mod tables;

// Re-export commonly used types
pub use crate::config::{ColumnConfig, PipelineConfig};
pub use crate::data::{DataLoader, RawRecord, RawRow};
pub use crate::error::{ForecastError, Result};
pub use crate::features::{FeatureDeriver, FeatureRow, FeatureSet};
pub use crate::metrics::{EvaluationResult, Evaluator, MetricBundle, ModelComparison};
pub use crate::models::{ForecastModel, ForecastResult, PredictionInput, TrainingData};
pub use crate::pipeline::{ForecastPipeline, PipelineReport};
pub use crate::quality::{CleanRows, DataQualityGate, QualityReport};
pub use crate::series::{DailySeries, Frequency, TimeSeriesBuilder};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
