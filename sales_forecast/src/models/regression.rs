//! Regression models trained on derived features

use crate::error::{ForecastError, Result};
use crate::features::FeatureSet;
use crate::models::random_forest::RandomForestRegressor;
use crate::models::FeatureRegressor;
use ndarray::{Array1, Array2, Axis};
use tracing::debug;

/// Relative ridge added to the normal equations so collinear calendar
/// columns (e.g. `quarter` and `month`) still yield a solution
const RIDGE: f64 = 1e-10;

/// Solve the symmetric positive-definite system `a x = b` by Cholesky
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    if n != a.ncols() || n != b.len() {
        return None;
    }

    let mut l = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let sum: f64 = (0..j).map(|k| l[[i, k]] * l[[j, k]]).sum();
            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 0.0 {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    let mut y = Array1::<f64>::zeros(n);
    for i in 0..n {
        let sum: f64 = (0..i).map(|j| l[[i, j]] * y[j]).sum();
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let sum: f64 = ((i + 1)..n).map(|j| l[[j, i]] * x[j]).sum();
        x[i] = (y[i] - sum) / l[[i, i]];
    }

    Some(x)
}

/// Gauss-Jordan elimination with partial pivoting, used when Cholesky fails
fn gauss_jordan_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    let mut aug = Array2::<f64>::zeros((n, n + 1));
    for i in 0..n {
        for j in 0..n {
            aug[[i, j]] = a[[i, j]];
        }
        aug[[i, n]] = b[i];
    }

    for col in 0..n {
        let pivot_row = (col..n).max_by(|&r1, &r2| {
            aug[[r1, col]].abs().total_cmp(&aug[[r2, col]].abs())
        })?;
        if aug[[pivot_row, col]].abs() < 1e-12 {
            return None;
        }
        if pivot_row != col {
            for j in 0..=n {
                aug.swap([col, j], [pivot_row, j]);
            }
        }

        let pivot = aug[[col, col]];
        for j in 0..=n {
            aug[[col, j]] /= pivot;
        }
        for row in 0..n {
            if row != col {
                let factor = aug[[row, col]];
                for j in 0..=n {
                    aug[[row, j]] -= factor * aug[[col, j]];
                }
            }
        }
    }

    Some(aug.column(n).to_owned())
}

/// Fitted linear model state
#[derive(Debug, Clone)]
struct LinearFit {
    coefficients: Array1<f64>,
    intercept: f64,
    feature_names: Vec<String>,
}

/// Ordinary least squares with an intercept
#[derive(Debug, Clone, Default)]
pub struct LinearRegression {
    fit: Option<LinearFit>,
}

impl LinearRegression {
    pub fn new() -> Self {
        Self { fit: None }
    }

    /// Fitted coefficients in feature order
    pub fn coefficients(&self) -> Option<&Array1<f64>> {
        self.fit.as_ref().map(|f| &f.coefficients)
    }

    pub fn intercept(&self) -> Option<f64> {
        self.fit.as_ref().map(|f| f.intercept)
    }

    /// Fit on a design matrix and target vector
    pub fn fit_matrix(&mut self, x: &Array2<f64>, y: &Array1<f64>, feature_names: Vec<String>) -> Result<()> {
        let n_samples = x.nrows();
        let n_features = x.ncols();
        if n_samples != y.len() {
            return Err(ForecastError::ValidationError(format!(
                "Design matrix has {} rows but target has {}",
                n_samples,
                y.len()
            )));
        }
        if n_samples == 0 {
            return Err(ForecastError::EmptySeriesError(
                "No rows to fit Linear Regression on".to_string(),
            ));
        }

        let x_mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| ForecastError::fit_failure("Linear Regression", "empty design matrix"))?;
        let y_mean = y.mean().unwrap_or(0.0);
        let x_centered = x - &x_mean.clone().insert_axis(Axis(0));
        let y_centered = y - y_mean;

        let mut xtx = x_centered.t().dot(&x_centered);
        let xty = x_centered.t().dot(&y_centered);
        let scale = (0..n_features).map(|i| xtx[[i, i]]).fold(0.0, f64::max).max(1.0);
        for i in 0..n_features {
            xtx[[i, i]] += RIDGE * scale;
        }

        let coefficients = cholesky_solve(&xtx, &xty)
            .or_else(|| gauss_jordan_solve(&xtx, &xty))
            .ok_or_else(|| {
                ForecastError::fit_failure("Linear Regression", "normal equations are singular")
            })?;
        let intercept = y_mean - coefficients.dot(&x_mean);

        debug!(features = n_features, samples = n_samples, intercept, "Fitted linear regression");

        self.fit = Some(LinearFit {
            coefficients,
            intercept,
            feature_names,
        });
        Ok(())
    }

    /// Predict from a design matrix
    pub fn predict_matrix(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let fit = self
            .fit
            .as_ref()
            .ok_or_else(|| ForecastError::ModelNotFittedError("Linear Regression".to_string()))?;
        if x.ncols() != fit.coefficients.len() {
            return Err(ForecastError::ValidationError(format!(
                "Expected {} features, got {}",
                fit.coefficients.len(),
                x.ncols()
            )));
        }
        Ok(x.dot(&fit.coefficients) + fit.intercept)
    }
}

impl FeatureRegressor for LinearRegression {
    fn name(&self) -> &str {
        "Linear Regression"
    }

    fn fit(&mut self, features: &FeatureSet) -> Result<()> {
        let x = features.to_matrix()?;
        let y = features.target_array();
        self.fit_matrix(&x, &y, features.feature_names().to_vec())
    }

    fn predict(&self, features: &FeatureSet) -> Result<Vec<f64>> {
        let fit = self
            .fit
            .as_ref()
            .ok_or_else(|| ForecastError::ModelNotFittedError(self.name().to_string()))?;
        check_schema(&fit.feature_names, features)?;
        Ok(self.predict_matrix(&features.to_matrix()?)?.to_vec())
    }

    fn is_fitted(&self) -> bool {
        self.fit.is_some()
    }
}

/// Reject feature sets whose columns differ from the training schema
pub(crate) fn check_schema(trained: &[String], features: &FeatureSet) -> Result<()> {
    if trained != features.feature_names() {
        return Err(ForecastError::ValidationError(format!(
            "Feature schema mismatch: trained on [{}], got [{}]",
            trained.join(", "),
            features.feature_names().join(", ")
        )));
    }
    Ok(())
}

/// The supervised regression variants
#[derive(Debug, Clone)]
pub enum RegressionModel {
    Linear(LinearRegression),
    RandomForest(RandomForestRegressor),
}

impl RegressionModel {
    /// Feature importances, highest first; only tree ensembles have them
    pub fn feature_importance(&self) -> Result<Vec<(String, f64)>> {
        match self {
            RegressionModel::RandomForest(m) => m.feature_importance(),
            RegressionModel::Linear(m) => Err(ForecastError::UnsupportedOperationError {
                model: m.name().to_string(),
                operation: "feature_importance".to_string(),
            }),
        }
    }

    /// A fresh, unfitted copy with the same hyperparameters
    pub fn unfitted(&self) -> Self {
        match self {
            RegressionModel::Linear(_) => RegressionModel::Linear(LinearRegression::new()),
            RegressionModel::RandomForest(m) => {
                RegressionModel::RandomForest(RandomForestRegressor::new(m.params().clone()))
            }
        }
    }
}

impl FeatureRegressor for RegressionModel {
    fn name(&self) -> &str {
        match self {
            RegressionModel::Linear(m) => m.name(),
            RegressionModel::RandomForest(m) => m.name(),
        }
    }

    fn fit(&mut self, features: &FeatureSet) -> Result<()> {
        match self {
            RegressionModel::Linear(m) => m.fit(features),
            RegressionModel::RandomForest(m) => m.fit(features),
        }
    }

    fn predict(&self, features: &FeatureSet) -> Result<Vec<f64>> {
        match self {
            RegressionModel::Linear(m) => m.predict(features),
            RegressionModel::RandomForest(m) => m.predict(features),
        }
    }

    fn is_fitted(&self) -> bool {
        match self {
            RegressionModel::Linear(m) => m.is_fitted(),
            RegressionModel::RandomForest(m) => m.is_fitted(),
        }
    }
}
