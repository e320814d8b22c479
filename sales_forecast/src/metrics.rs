//! Metrics for evaluating and ranking forecast models

use crate::error::{ForecastError, Result};
use crate::models::{ForecastModel, PredictionInput, TrainingData};
use crate::series::DailySeries;
use forecast_math::stats;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{info, warn};

/// Non-fatal findings reported alongside a metric bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetricDiagnostic {
    /// Periods with a zero actual were left out of MAPE
    MapeExcludedZeros { excluded: usize },
    /// Every actual was zero, so MAPE has no terms
    MapeUndefined,
    /// Actuals have zero variance, so R² has no denominator
    R2Undefined,
}

/// Error metrics for one model against one held-out series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricBundle {
    pub model_name: String,
    /// Root mean squared error
    pub rmse: f64,
    /// Mean absolute error
    pub mae: f64,
    /// Mean absolute percentage error over non-zero actuals, in percent
    pub mape: Option<f64>,
    /// Coefficient of determination
    pub r2: Option<f64>,
    pub diagnostics: Vec<MetricDiagnostic>,
}

impl std::fmt::Display for MetricBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{} Performance:", self.model_name)?;
        writeln!(f, "  RMSE:  {:.2}", self.rmse)?;
        writeln!(f, "  MAE:   {:.2}", self.mae)?;
        writeln!(f, "  MAPE:  {}", fmt_optional(self.mape, "%"))?;
        writeln!(f, "  R²:    {}", fmt_optional(self.r2, ""))?;
        Ok(())
    }
}

fn fmt_optional(value: Option<f64>, suffix: &str) -> String {
    match value {
        Some(v) => format!("{:.4}{}", v, suffix),
        None => "undefined".to_string(),
    }
}

/// Computes metric bundles and ranks models
#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator;

impl Evaluator {
    /// Score `predicted` against `actual`
    pub fn evaluate(actual: &[f64], predicted: &[f64], model_name: &str) -> Result<MetricBundle> {
        if actual.len() != predicted.len() || actual.is_empty() {
            return Err(ForecastError::ValidationError(format!(
                "Actual ({}) and predicted ({}) values must have the same non-zero length",
                actual.len(),
                predicted.len()
            )));
        }

        let n = actual.len() as f64;
        let mut diagnostics = Vec::new();

        let sse: f64 = actual
            .iter()
            .zip(predicted.iter())
            .map(|(a, p)| (a - p).powi(2))
            .sum();
        let rmse = (sse / n).sqrt();
        let mae = actual
            .iter()
            .zip(predicted.iter())
            .map(|(a, p)| (a - p).abs())
            .sum::<f64>()
            / n;

        let pct_errors: Vec<f64> = actual
            .iter()
            .zip(predicted.iter())
            .filter(|(a, _)| **a != 0.0)
            .map(|(a, p)| ((a - p) / a).abs())
            .collect();
        let excluded = actual.len() - pct_errors.len();
        let mape = if pct_errors.is_empty() {
            diagnostics.push(MetricDiagnostic::MapeUndefined);
            None
        } else {
            if excluded > 0 {
                diagnostics.push(MetricDiagnostic::MapeExcludedZeros { excluded });
            }
            Some(pct_errors.iter().sum::<f64>() / pct_errors.len() as f64 * 100.0)
        };

        let ss_tot = stats::total_sum_of_squares(actual);
        let r2 = if ss_tot == 0.0 {
            diagnostics.push(MetricDiagnostic::R2Undefined);
            None
        } else {
            Some(1.0 - sse / ss_tot)
        };

        if !diagnostics.is_empty() {
            warn!(model = model_name, ?diagnostics, "Metric diagnostics");
        }
        info!(
            model = model_name,
            rmse,
            mae,
            mape = ?mape,
            r2 = ?r2,
            "Evaluated model"
        );

        Ok(MetricBundle {
            model_name: model_name.to_string(),
            rmse,
            mae,
            mape,
            r2,
            diagnostics,
        })
    }

    /// Rank bundles by ascending RMSE.
    ///
    /// The sort is stable, so models with equal RMSE keep insertion order and
    /// the first inserted wins. NaN RMSE ranks last.
    pub fn compare(results: &EvaluationResult) -> Result<ModelComparison> {
        if results.is_empty() {
            return Err(ForecastError::ValidationError(
                "No models to compare".to_string(),
            ));
        }

        let mut ranking = results.bundles.clone();
        ranking.sort_by(|a, b| compare_rmse(a.rmse, b.rmse));

        let best = &ranking[0];
        info!(
            model = %best.model_name,
            rmse = best.rmse,
            mape = ?best.mape,
            "Best model"
        );

        Ok(ModelComparison { ranking })
    }
}

fn compare_rmse(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.total_cmp(&b),
    }
}

/// Metric bundles keyed by model name, in insertion order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    bundles: Vec<MetricBundle>,
}

impl EvaluationResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a bundle; a bundle with the same model name is replaced in place
    pub fn insert(&mut self, bundle: MetricBundle) {
        match self
            .bundles
            .iter_mut()
            .find(|b| b.model_name == bundle.model_name)
        {
            Some(existing) => *existing = bundle,
            None => self.bundles.push(bundle),
        }
    }

    pub fn get(&self, model_name: &str) -> Option<&MetricBundle> {
        self.bundles.iter().find(|b| b.model_name == model_name)
    }

    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetricBundle> {
        self.bundles.iter()
    }

    pub fn model_names(&self) -> Vec<&str> {
        self.bundles.iter().map(|b| b.model_name.as_str()).collect()
    }
}

impl FromIterator<MetricBundle> for EvaluationResult {
    fn from_iter<I: IntoIterator<Item = MetricBundle>>(iter: I) -> Self {
        let mut result = Self::new();
        for bundle in iter {
            result.insert(bundle);
        }
        result
    }
}

/// Bundles ranked best first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelComparison {
    ranking: Vec<MetricBundle>,
}

impl ModelComparison {
    /// The minimum-RMSE model, `None` only for an empty ranking
    pub fn best(&self) -> Option<&MetricBundle> {
        self.ranking.first()
    }

    pub fn ranking(&self) -> &[MetricBundle] {
        &self.ranking
    }

    /// Model names, best first
    pub fn order(&self) -> Vec<&str> {
        self.ranking.iter().map(|b| b.model_name.as_str()).collect()
    }
}

impl std::fmt::Display for ModelComparison {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let width = self
            .ranking
            .iter()
            .map(|b| b.model_name.len())
            .max()
            .unwrap_or(5)
            .max(5);
        writeln!(f, "Model Comparison:")?;
        writeln!(
            f,
            "  {:<width$}  {:>12}  {:>12}  {:>10}  {:>8}",
            "Model", "RMSE", "MAE", "MAPE", "R2"
        )?;
        for b in &self.ranking {
            writeln!(
                f,
                "  {:<width$}  {:>12.2}  {:>12.2}  {:>10}  {:>8}",
                b.model_name,
                b.rmse,
                b.mae,
                b.mape.map_or("NaN".to_string(), |v| format!("{:.2}%", v)),
                b.r2.map_or("NaN".to_string(), |v| format!("{:.4}", v)),
            )?;
        }
        if let Some(best) = self.best() {
            writeln!(f, "  Best model: {}", best.model_name)?;
        }
        Ok(())
    }
}

/// Fit a series model on `train`, forecast the length of `test`, and score it
pub fn evaluate_series_model(
    model: &mut ForecastModel,
    train: &DailySeries,
    test: &DailySeries,
) -> Result<MetricBundle> {
    model.fit(TrainingData::Series(train))?;
    let forecast = model.predict(PredictionInput::Horizon(test.len()))?;
    Evaluator::evaluate(test.values(), &forecast, model.name())
}
