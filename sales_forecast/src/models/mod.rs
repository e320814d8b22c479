//! Forecasting models for sales series
//!
//! Every strategy follows the same lifecycle: construct with
//! hyperparameters, `fit` once, then `predict` any number of times.
//! Series models forecast a number of future periods; regression models map
//! feature rows to values. [`ForecastModel`] is the closed set of variants
//! used by the pipeline.

use crate::error::{ForecastError, Result};
use crate::features::FeatureSet;
use crate::series::DailySeries;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

pub mod arima;
pub mod baseline;
pub mod decision_tree;
pub mod random_forest;
pub mod regression;

pub use arima::{ArimaModel, ArimaOrder, SeasonalOrder};
pub use baseline::{BaselineModel, BaselineStrategy};
pub use random_forest::{ForestParams, RandomForestRegressor};
pub use regression::{LinearRegression, RegressionModel};

/// Forecast result containing predicted values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    values: Vec<f64>,
    horizons: usize,
    intervals: Option<Vec<(f64, f64)>>,
    dates: Option<Vec<NaiveDate>>,
}

impl ForecastResult {
    /// Create a new forecast result
    pub fn new(values: Vec<f64>, horizons: usize) -> Result<Self> {
        if values.len() != horizons {
            return Err(ForecastError::ValidationError(format!(
                "Values length ({}) doesn't match horizons ({})",
                values.len(),
                horizons
            )));
        }

        Ok(Self {
            values,
            horizons,
            intervals: None,
            dates: None,
        })
    }

    /// Create a new forecast result with confidence intervals
    pub fn new_with_intervals(
        values: Vec<f64>,
        horizons: usize,
        intervals: Vec<(f64, f64)>,
    ) -> Result<Self> {
        let mut result = Self::new(values, horizons)?;
        if intervals.len() != result.values.len() {
            return Err(ForecastError::ValidationError(format!(
                "Values length ({}) doesn't match intervals length ({})",
                result.values.len(),
                intervals.len()
            )));
        }
        result.intervals = Some(intervals);
        Ok(result)
    }

    /// Attach period labels
    pub fn with_dates(mut self, dates: Vec<NaiveDate>) -> Result<Self> {
        if dates.len() != self.values.len() {
            return Err(ForecastError::ValidationError(format!(
                "Values length ({}) doesn't match dates length ({})",
                self.values.len(),
                dates.len()
            )));
        }
        self.dates = Some(dates);
        Ok(self)
    }

    /// Get the forecasted values
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Get the number of periods forecasted
    pub fn horizons(&self) -> usize {
        self.horizons
    }

    /// Get the confidence intervals, if available
    pub fn intervals(&self) -> Option<&[(f64, f64)]> {
        self.intervals.as_deref()
    }

    /// Get the period labels, if available
    pub fn dates(&self) -> Option<&[NaiveDate]> {
        self.dates.as_deref()
    }

    /// Consume the result and return its values
    pub fn into_values(self) -> Vec<f64> {
        self.values
    }

    /// Calculate mean absolute error between forecast and actual values
    pub fn mean_absolute_error(&self, actual: &[f64]) -> Result<f64> {
        self.check_len(actual)?;
        let sum: f64 = self
            .values
            .iter()
            .zip(actual.iter())
            .map(|(f, a)| (f - a).abs())
            .sum();
        Ok(sum / self.values.len() as f64)
    }

    /// Calculate mean squared error between forecast and actual values
    pub fn mean_squared_error(&self, actual: &[f64]) -> Result<f64> {
        self.check_len(actual)?;
        let sum: f64 = self
            .values
            .iter()
            .zip(actual.iter())
            .map(|(f, a)| (f - a).powi(2))
            .sum();
        Ok(sum / self.values.len() as f64)
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    fn check_len(&self, actual: &[f64]) -> Result<()> {
        if self.values.len() != actual.len() || actual.is_empty() {
            return Err(ForecastError::ValidationError(format!(
                "Forecast length ({}) doesn't match actual length ({})",
                self.values.len(),
                actual.len()
            )));
        }
        Ok(())
    }
}

/// A model that forecasts future periods of a series
pub trait SeriesForecaster: Debug {
    /// Name of the model
    fn name(&self) -> &str;

    /// Learn parameters from a training series
    fn fit(&mut self, series: &DailySeries) -> Result<()>;

    /// Forecast the next `horizon` periods
    fn forecast(&self, horizon: usize) -> Result<ForecastResult>;

    /// Whether `fit` has succeeded
    fn is_fitted(&self) -> bool;
}

/// A supervised model mapping feature rows to sales values
pub trait FeatureRegressor: Debug {
    /// Name of the model
    fn name(&self) -> &str;

    /// Learn from rows whose targets are known
    fn fit(&mut self, features: &FeatureSet) -> Result<()>;

    /// Predict one value per row
    fn predict(&self, features: &FeatureSet) -> Result<Vec<f64>>;

    /// Whether `fit` has succeeded
    fn is_fitted(&self) -> bool;
}

/// Training input for [`ForecastModel::fit`]
#[derive(Debug, Clone, Copy)]
pub enum TrainingData<'a> {
    Series(&'a DailySeries),
    Features(&'a FeatureSet),
}

/// Prediction input for [`ForecastModel::predict`]
#[derive(Debug, Clone, Copy)]
pub enum PredictionInput<'a> {
    /// Number of future periods
    Horizon(usize),
    /// One row per point to predict
    Features(&'a FeatureSet),
}

/// The closed family of forecasting strategies
#[derive(Debug, Clone)]
pub enum ForecastModel {
    Baseline(BaselineModel),
    Arima(ArimaModel),
    Regression(RegressionModel),
}

impl ForecastModel {
    /// Naive baseline: repeat the last observation
    pub fn naive() -> Self {
        ForecastModel::Baseline(BaselineModel::new(BaselineStrategy::Naive))
    }

    /// Mean baseline: repeat the historical mean
    pub fn mean() -> Self {
        ForecastModel::Baseline(BaselineModel::new(BaselineStrategy::Mean))
    }

    pub fn arima(order: ArimaOrder, seasonal: Option<SeasonalOrder>) -> Self {
        ForecastModel::Arima(ArimaModel::with_seasonal(order, seasonal))
    }

    pub fn linear_regression() -> Self {
        ForecastModel::Regression(RegressionModel::Linear(LinearRegression::new()))
    }

    pub fn random_forest(params: ForestParams) -> Self {
        ForecastModel::Regression(RegressionModel::RandomForest(RandomForestRegressor::new(
            params,
        )))
    }

    pub fn name(&self) -> &str {
        match self {
            ForecastModel::Baseline(m) => SeriesForecaster::name(m),
            ForecastModel::Arima(m) => SeriesForecaster::name(m),
            ForecastModel::Regression(m) => FeatureRegressor::name(m),
        }
    }

    pub fn is_fitted(&self) -> bool {
        match self {
            ForecastModel::Baseline(m) => SeriesForecaster::is_fitted(m),
            ForecastModel::Arima(m) => SeriesForecaster::is_fitted(m),
            ForecastModel::Regression(m) => FeatureRegressor::is_fitted(m),
        }
    }

    /// Whether the variant forecasts from a series alone
    pub fn is_series_model(&self) -> bool {
        !matches!(self, ForecastModel::Regression(_))
    }

    /// Fit on a series (baseline, ARIMA) or a feature set (regression)
    pub fn fit(&mut self, data: TrainingData<'_>) -> Result<()> {
        match (self, data) {
            (ForecastModel::Baseline(m), TrainingData::Series(s)) => m.fit(s),
            (ForecastModel::Arima(m), TrainingData::Series(s)) => m.fit(s),
            (ForecastModel::Regression(m), TrainingData::Features(f)) => m.fit(f),
            (model, _) => Err(ForecastError::InvalidParameter(format!(
                "{} cannot be trained on this kind of input",
                model.name()
            ))),
        }
    }

    /// Predict a horizon (series models) or one value per feature row
    pub fn predict(&self, input: PredictionInput<'_>) -> Result<Vec<f64>> {
        match (self, input) {
            (ForecastModel::Baseline(m), PredictionInput::Horizon(h)) => {
                Ok(m.forecast(h)?.into_values())
            }
            (ForecastModel::Arima(m), PredictionInput::Horizon(h)) => {
                Ok(m.forecast(h)?.into_values())
            }
            (ForecastModel::Regression(m), PredictionInput::Features(f)) => m.predict(f),
            (model, _) => Err(ForecastError::InvalidParameter(format!(
                "{} cannot predict from this kind of input",
                model.name()
            ))),
        }
    }

    /// Forecast with intervals where the variant supports them
    pub fn forecast(&self, horizon: usize, confidence_level: f64) -> Result<ForecastResult> {
        match self {
            ForecastModel::Baseline(m) => m.forecast(horizon),
            ForecastModel::Arima(m) => m.predict_with_intervals(horizon, confidence_level),
            ForecastModel::Regression(m) => Err(ForecastError::UnsupportedOperationError {
                model: FeatureRegressor::name(m).to_string(),
                operation: "forecasting without future features".to_string(),
            }),
        }
    }

    /// Feature importances, highest first
    pub fn feature_importance(&self) -> Result<Vec<(String, f64)>> {
        match self {
            ForecastModel::Regression(m) => m.feature_importance(),
            other => Err(ForecastError::UnsupportedOperationError {
                model: other.name().to_string(),
                operation: "feature_importance".to_string(),
            }),
        }
    }

    /// A fresh, unfitted copy with the same hyperparameters
    pub fn unfitted(&self) -> Self {
        match self {
            ForecastModel::Baseline(m) => ForecastModel::Baseline(BaselineModel::new(m.strategy())),
            ForecastModel::Arima(m) => {
                ForecastModel::Arima(ArimaModel::with_seasonal(m.order(), m.seasonal_order()))
            }
            ForecastModel::Regression(m) => ForecastModel::Regression(m.unfitted()),
        }
    }
}
