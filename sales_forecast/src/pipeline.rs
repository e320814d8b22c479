//! End-to-end forecasting run
//!
//! rows -> quality gate -> series -> train/test split -> candidate models ->
//! evaluation -> comparison -> final forecast and output tables.

use crate::config::PipelineConfig;
use crate::data::{DataLoader, RawRecord, RawRow};
use crate::error::{ForecastError, Result};
use crate::features::{FeatureDeriver, FeatureSet};
use crate::metrics::{EvaluationResult, Evaluator, ModelComparison};
use crate::models::{ForecastModel, ForecastResult, PredictionInput, TrainingData};
use crate::quality::{summarize, DataQualityGate, DataSummary, QualityReport};
use crate::series::{DailySeries, Frequency, TimeSeriesBuilder};
use crate::tables;
use chrono::NaiveDate;
use polars::prelude::DataFrame;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

/// Held-out predictions of one candidate
#[derive(Debug, Clone, PartialEq)]
pub struct TestPredictions {
    pub model_name: String,
    pub dates: Vec<NaiveDate>,
    pub actual: Vec<f64>,
    pub predicted: Vec<f64>,
}

/// Everything a run produces
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub quality: QualityReport,
    pub summary: DataSummary,
    pub series: DailySeries,
    pub evaluation: EvaluationResult,
    pub comparison: ModelComparison,
    pub test_predictions: Vec<TestPredictions>,
    /// Name of the series model used for the final forecast
    pub forecast_model: String,
    pub forecast: ForecastResult,
    /// Random forest importances, when that candidate ran
    pub feature_importance: Option<Vec<(String, f64)>>,
    /// Per-category forecast values, when the data carries categories
    pub category_forecasts: Option<BTreeMap<String, Vec<f64>>>,
}

impl PipelineReport {
    /// Held-out predictions of the overall best model
    pub fn best_test_predictions(&self) -> Option<&TestPredictions> {
        let best = &self.comparison.best()?.model_name;
        self.test_predictions.iter().find(|p| &p.model_name == best)
    }

    pub fn daily_forecast_table(&self) -> Result<DataFrame> {
        tables::daily_forecast_table(&self.forecast)
    }

    pub fn monthly_forecast_table(&self) -> Result<DataFrame> {
        tables::monthly_forecast_table(&self.forecast)
    }

    pub fn category_forecast_table(&self) -> Result<Option<DataFrame>> {
        self.category_forecasts
            .as_ref()
            .map(tables::category_forecast_table)
            .transpose()
    }

    pub fn model_comparison_table(&self) -> Result<DataFrame> {
        tables::model_comparison_table(&self.comparison)
    }

    pub fn test_predictions_table(&self) -> Result<DataFrame> {
        let best = self.best_test_predictions().ok_or_else(|| {
            ForecastError::ValidationError("No held-out predictions for the best model".to_string())
        })?;
        tables::test_predictions_table(&best.dates, &best.actual, &best.predicted)
    }

    /// Write every table as CSV into `dir`
    pub fn write_tables<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        // Both tables are laid out per calendar day
        if self.series.frequency() == Frequency::Daily {
            tables::write_csv(&mut self.daily_forecast_table()?, dir.join("daily_forecast.csv"))?;
            tables::write_csv(&mut self.monthly_forecast_table()?, dir.join("monthly_forecast.csv"))?;
        } else {
            warn!(
                frequency = ?self.series.frequency(),
                "Skipping daily and monthly tables for a non-daily series"
            );
        }
        tables::write_csv(&mut self.model_comparison_table()?, dir.join("model_comparison.csv"))?;
        tables::write_csv(&mut self.test_predictions_table()?, dir.join("test_predictions.csv"))?;
        if let Some(mut df) = self.category_forecast_table()? {
            tables::write_csv(&mut df, dir.join("category_forecast.csv"))?;
        }

        info!(dir = %dir.display(), "Wrote output tables");
        Ok(())
    }
}

/// Runs the full forecasting workflow for one configuration
#[derive(Debug, Clone)]
pub struct ForecastPipeline {
    config: PipelineConfig,
}

impl ForecastPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load a CSV file and run on its rows
    pub fn run_csv<P: AsRef<Path>>(&self, path: P) -> Result<PipelineReport> {
        let loaded = DataLoader::from_csv(path, &self.config.columns)?;
        self.run(loaded.rows)
    }

    /// Run on already-parsed rows
    pub fn run(&self, rows: Vec<RawRow>) -> Result<PipelineReport> {
        let cleaned = DataQualityGate::new(self.config.quality).clean(rows);
        if cleaned.records.is_empty() {
            return Err(ForecastError::EmptySeriesError(
                "No rows left after the quality check".to_string(),
            ));
        }
        let records = cleaned.records;
        let summary = summarize(&records)?;

        let builder = TimeSeriesBuilder::new(self.config.frequency);
        let series = builder.build(&records)?;
        let (train, test) = series.train_test_split(self.config.test_ratio)?;
        info!(
            periods = series.len(),
            train = train.len(),
            test = test.len(),
            start = %series.first_date(),
            end = %series.last_date(),
            "Prepared series"
        );

        let mut evaluation = EvaluationResult::new();
        let mut test_predictions = Vec::new();
        let mut candidates = self.series_candidates();

        for model in candidates.iter_mut() {
            model.fit(TrainingData::Series(&train))?;
            let predicted = model.predict(PredictionInput::Horizon(test.len()))?;
            evaluation.insert(Evaluator::evaluate(test.values(), &predicted, model.name())?);
            test_predictions.push(TestPredictions {
                model_name: model.name().to_string(),
                dates: test.dates().to_vec(),
                actual: test.values().to_vec(),
                predicted,
            });
        }

        let mut feature_importance = None;
        if let Some((features_train, features_test)) = self.regression_split(&series, &test)? {
            for mut model in self.regression_candidates() {
                model.fit(TrainingData::Features(&features_train))?;
                let predicted = model.predict(PredictionInput::Features(&features_test))?;
                let actual = features_test.targets();
                evaluation.insert(Evaluator::evaluate(&actual, &predicted, model.name())?);
                if let Ok(importance) = model.feature_importance() {
                    feature_importance = Some(importance);
                }
                test_predictions.push(TestPredictions {
                    model_name: model.name().to_string(),
                    dates: features_test.dates(),
                    actual,
                    predicted,
                });
            }
        }

        let comparison = Evaluator::compare(&evaluation)?;
        let final_model = self.best_series_model(&comparison, &candidates)?;
        let forecast = self.final_forecast(&final_model, &series)?;
        let category_forecasts = self.category_forecasts(&builder, &records, &final_model)?;

        info!(
            best = ?comparison.best().map(|b| b.model_name.as_str()),
            forecast_model = %final_model.name(),
            horizon = self.config.forecast_horizon,
            "Forecast run completed"
        );

        Ok(PipelineReport {
            quality: cleaned.report,
            summary,
            series,
            evaluation,
            comparison,
            test_predictions,
            forecast_model: final_model.name().to_string(),
            forecast,
            feature_importance,
            category_forecasts,
        })
    }

    fn series_candidates(&self) -> Vec<ForecastModel> {
        vec![
            ForecastModel::naive(),
            ForecastModel::mean(),
            ForecastModel::arima(self.config.arima_order, self.config.seasonal_order),
        ]
    }

    fn regression_candidates(&self) -> Vec<ForecastModel> {
        let mut models = Vec::new();
        if self.config.include_linear {
            models.push(ForecastModel::linear_regression());
        }
        if self.config.include_random_forest {
            models.push(ForecastModel::random_forest(self.config.random_forest.clone()));
        }
        models
    }

    /// Feature rows before and from the first test date, or `None` when
    /// either side is empty
    fn regression_split(
        &self,
        series: &DailySeries,
        test: &DailySeries,
    ) -> Result<Option<(FeatureSet, FeatureSet)>> {
        if !self.config.include_linear && !self.config.include_random_forest {
            return Ok(None);
        }

        let deriver = FeatureDeriver::new(
            self.config.lag_depths.clone(),
            self.config.rolling_windows.clone(),
        )?;
        let features = match deriver.derive(series) {
            Ok(f) => f,
            Err(ForecastError::EmptySeriesError(reason)) => {
                warn!(%reason, "Skipping regression models");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let (features_train, features_test) = features.split_at_date(test.first_date());
        if features_train.is_empty() || features_test.is_empty() {
            warn!(
                train_rows = features_train.len(),
                test_rows = features_test.len(),
                "Not enough feature rows on both sides of the split, skipping regression models"
            );
            return Ok(None);
        }
        Ok(Some((features_train, features_test)))
    }

    /// The best-ranked model that can forecast from the series alone
    fn best_series_model(
        &self,
        comparison: &ModelComparison,
        candidates: &[ForecastModel],
    ) -> Result<ForecastModel> {
        comparison
            .ranking()
            .iter()
            .find_map(|bundle| candidates.iter().find(|m| m.name() == bundle.model_name))
            .map(ForecastModel::unfitted)
            .ok_or_else(|| {
                ForecastError::ValidationError("No series model was evaluated".to_string())
            })
    }

    fn final_forecast(&self, model: &ForecastModel, series: &DailySeries) -> Result<ForecastResult> {
        let mut model = model.unfitted();
        model.fit(TrainingData::Series(series))?;
        model
            .forecast(self.config.forecast_horizon, self.config.confidence_level)?
            .with_dates(series.future_dates(self.config.forecast_horizon))
    }

    fn category_forecasts(
        &self,
        builder: &TimeSeriesBuilder,
        records: &[RawRecord],
        model: &ForecastModel,
    ) -> Result<Option<BTreeMap<String, Vec<f64>>>> {
        if records.iter().all(|r| r.category.is_none()) {
            return Ok(None);
        }

        let grouped = builder.build_grouped(records, |r| r.category.clone())?;
        let mut forecasts = BTreeMap::new();
        for (category, series) in grouped {
            let mut category_model = model.unfitted();
            category_model.fit(TrainingData::Series(&series))?;
            let values =
                category_model.predict(PredictionInput::Horizon(self.config.forecast_horizon))?;
            forecasts.insert(category, values);
        }
        Ok(Some(forecasts))
    }
}
