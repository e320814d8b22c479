//! Naive and mean baselines

use crate::error::{ForecastError, Result};
use crate::models::{ForecastResult, SeriesForecaster};
use crate::series::DailySeries;
use serde::{Deserialize, Serialize};

/// Which scalar the baseline repeats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaselineStrategy {
    /// Last observed value
    Naive,
    /// Historical mean
    Mean,
}

/// Forecasts a single learned value for every future period
#[derive(Debug, Clone)]
pub struct BaselineModel {
    name: String,
    strategy: BaselineStrategy,
    level: Option<f64>,
}

impl BaselineModel {
    pub fn new(strategy: BaselineStrategy) -> Self {
        let name = match strategy {
            BaselineStrategy::Naive => "Naive",
            BaselineStrategy::Mean => "Mean",
        };
        Self {
            name: name.to_string(),
            strategy,
            level: None,
        }
    }

    pub fn strategy(&self) -> BaselineStrategy {
        self.strategy
    }

    /// The learned value, once fitted
    pub fn level(&self) -> Option<f64> {
        self.level
    }
}

impl SeriesForecaster for BaselineModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn fit(&mut self, series: &DailySeries) -> Result<()> {
        if series.is_empty() {
            return Err(ForecastError::EmptySeriesError(
                "Cannot fit a baseline on an empty series".to_string(),
            ));
        }

        self.level = Some(match self.strategy {
            BaselineStrategy::Naive => series.last_value(),
            BaselineStrategy::Mean => series.mean(),
        });
        Ok(())
    }

    fn forecast(&self, horizon: usize) -> Result<ForecastResult> {
        let level = self
            .level
            .ok_or_else(|| ForecastError::ModelNotFittedError(self.name.clone()))?;
        ForecastResult::new(vec![level; horizon], horizon)
    }

    fn is_fitted(&self) -> bool {
        self.level.is_some()
    }
}
