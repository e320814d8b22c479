//! # Sales Forecast Workspace
//!
//! Umbrella crate re-exporting the workspace members:
//!
//! - [`forecast_math`]: rolling statistics, differencing and Nelder-Mead
//! - [`sales_forecast`]: loading, cleaning, features, models and evaluation
//!
//! ## Example
//!
//! ```
//! use sales_forecast_workspace::sales_forecast::{DailySeries, Frequency, ForecastModel};
//! use sales_forecast_workspace::sales_forecast::models::{PredictionInput, TrainingData};
//! use chrono::NaiveDate;
//!
//! let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let dates = (0..3).map(|i| start + chrono::Duration::days(i)).collect();
//! let series = DailySeries::new(dates, vec![10.0, 12.0, 42.0], Frequency::Daily).unwrap();
//!
//! let mut model = ForecastModel::naive();
//! model.fit(TrainingData::Series(&series)).unwrap();
//! assert_eq!(model.predict(PredictionInput::Horizon(2)).unwrap(), vec![42.0, 42.0]);
//! ```

pub use forecast_math;
pub use sales_forecast;

/// Version of the workspace crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
