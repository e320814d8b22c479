//! Pipeline configuration

use crate::error::{ForecastError, Result};
use crate::models::arima::{ArimaOrder, SeasonalOrder};
use crate::models::random_forest::ForestParams;
use crate::quality::QualityPolicy;
use crate::series::Frequency;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Names of the source columns the loader reads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    /// Order date column
    pub date: String,
    /// Sales amount column
    pub value: String,
    /// Optional category column
    pub category: Option<String>,
    /// Optional region column
    pub region: Option<String>,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            date: "Order Date".to_string(),
            value: "Sales".to_string(),
            category: Some("Category".to_string()),
            region: Some("Region".to_string()),
        }
    }
}

/// Settings for a full forecasting run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Source column names
    pub columns: ColumnConfig,
    /// Aggregation frequency of the series
    pub frequency: Frequency,
    /// Lag depths for the regression features
    pub lag_depths: Vec<usize>,
    /// Trailing windows for rolling mean/std features
    pub rolling_windows: Vec<usize>,
    /// Share of the series held out for evaluation
    pub test_ratio: f64,
    /// Periods to forecast after the last observation
    pub forecast_horizon: usize,
    /// Confidence level for forecast intervals
    pub confidence_level: f64,
    /// Non-seasonal ARIMA order
    pub arima_order: ArimaOrder,
    /// Seasonal ARIMA order, if any
    pub seasonal_order: Option<SeasonalOrder>,
    /// Random forest hyperparameters
    pub random_forest: ForestParams,
    /// Include the linear regression candidate
    pub include_linear: bool,
    /// Include the random forest candidate
    pub include_random_forest: bool,
    /// Data quality policy
    pub quality: QualityPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            columns: ColumnConfig::default(),
            frequency: Frequency::Daily,
            lag_depths: vec![1, 7, 14, 30],
            rolling_windows: vec![7, 30],
            test_ratio: 0.2,
            forecast_horizon: 90,
            confidence_level: 0.95,
            arima_order: ArimaOrder::new(1, 1, 1),
            seasonal_order: None,
            random_forest: ForestParams::default(),
            include_linear: true,
            include_random_forest: true,
            quality: QualityPolicy::default(),
        }
    }
}

impl PipelineConfig {
    /// Parse a configuration from JSON; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.columns.date.trim().is_empty() || self.columns.value.trim().is_empty() {
            return Err(ForecastError::InvalidParameter(
                "Date and value column names must not be empty".to_string(),
            ));
        }
        if !(self.test_ratio > 0.0 && self.test_ratio < 1.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "Test ratio must be between 0 and 1, got {}",
                self.test_ratio
            )));
        }
        if self.forecast_horizon == 0 {
            return Err(ForecastError::InvalidParameter(
                "Forecast horizon must be at least 1".to_string(),
            ));
        }
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "Confidence level must be between 0 and 1, got {}",
                self.confidence_level
            )));
        }
        if self.lag_depths.contains(&0) {
            return Err(ForecastError::InvalidParameter(
                "Lag depths must be at least 1".to_string(),
            ));
        }
        if self.rolling_windows.iter().any(|&w| w < 2) {
            return Err(ForecastError::InvalidParameter(
                "Rolling windows must be at least 2".to_string(),
            ));
        }
        self.random_forest.validate()?;
        Ok(())
    }
}
