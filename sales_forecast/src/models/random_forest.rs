//! Random forest regressor

use crate::error::{ForecastError, Result};
use crate::features::FeatureSet;
use crate::models::decision_tree::{RegressionTree, TreeLimits};
use crate::models::regression::check_schema;
use crate::models::FeatureRegressor;
use ndarray::Array2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Random forest hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    /// Number of trees
    pub n_estimators: usize,
    /// Maximum depth per tree; unlimited when `None`
    pub max_depth: Option<usize>,
    /// Minimum samples to split a node
    pub min_samples_split: usize,
    /// Minimum samples in a leaf
    pub min_samples_leaf: usize,
    /// Features considered per split; all when `None`
    pub max_features: Option<usize>,
    /// Train each tree on a bootstrap sample
    pub bootstrap: bool,
    /// Base seed; tree `i` uses `seed + i`
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            bootstrap: true,
            seed: 42,
        }
    }
}

impl ForestParams {
    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(ForecastError::InvalidParameter(
                "Random forest needs at least one tree".to_string(),
            ));
        }
        if self.min_samples_split < 2 {
            return Err(ForecastError::InvalidParameter(
                "min_samples_split must be at least 2".to_string(),
            ));
        }
        if self.min_samples_leaf == 0 {
            return Err(ForecastError::InvalidParameter(
                "min_samples_leaf must be at least 1".to_string(),
            ));
        }
        if self.max_features == Some(0) || self.max_depth == Some(0) {
            return Err(ForecastError::InvalidParameter(
                "max_features and max_depth must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct Forest {
    trees: Vec<RegressionTree>,
    feature_names: Vec<String>,
    importances: Vec<f64>,
}

/// Bagged ensemble of regression trees
#[derive(Debug, Clone)]
pub struct RandomForestRegressor {
    params: ForestParams,
    forest: Option<Forest>,
}

impl Default for RandomForestRegressor {
    fn default() -> Self {
        Self::new(ForestParams::default())
    }
}

impl RandomForestRegressor {
    pub fn new(params: ForestParams) -> Self {
        Self {
            params,
            forest: None,
        }
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    /// Number of fitted trees
    pub fn n_trees(&self) -> usize {
        self.forest.as_ref().map_or(0, |f| f.trees.len())
    }

    /// Mean decrease in impurity per feature, sorted highest first
    pub fn feature_importance(&self) -> Result<Vec<(String, f64)>> {
        let forest = self
            .forest
            .as_ref()
            .ok_or_else(|| ForecastError::ModelNotFittedError(self.name().to_string()))?;

        let mut ranked: Vec<(String, f64)> = forest
            .feature_names
            .iter()
            .cloned()
            .zip(forest.importances.iter().copied())
            .collect();
        // Stable, so equal importances keep column order
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        Ok(ranked)
    }

    fn grow_trees(&self, x: &Array2<f64>, y: &[f64]) -> Vec<RegressionTree> {
        let n_samples = x.nrows();
        let n_features = x.ncols();
        let limits = TreeLimits {
            max_depth: self.params.max_depth,
            min_samples_split: self.params.min_samples_split,
            min_samples_leaf: self.params.min_samples_leaf,
            max_features: self.params.max_features.unwrap_or(n_features).min(n_features),
        };

        (0..self.params.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let mut rng = ChaCha8Rng::seed_from_u64(self.params.seed.wrapping_add(tree_idx as u64));
                let sample: Vec<usize> = if self.params.bootstrap {
                    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
                } else {
                    (0..n_samples).collect()
                };
                RegressionTree::fit(x, y, &sample, limits, &mut rng)
            })
            .collect()
    }
}

impl FeatureRegressor for RandomForestRegressor {
    fn name(&self) -> &str {
        "Random Forest"
    }

    fn fit(&mut self, features: &FeatureSet) -> Result<()> {
        self.params.validate()?;
        if features.is_empty() {
            return Err(ForecastError::EmptySeriesError(
                "No rows to fit Random Forest on".to_string(),
            ));
        }

        let x = features.to_matrix()?;
        let y = features.targets();
        let trees = self.grow_trees(&x, &y);

        let mut importances = vec![0.0; x.ncols()];
        for tree in &trees {
            for (total, v) in importances.iter_mut().zip(tree.feature_importances()) {
                *total += v;
            }
        }
        let n_trees = trees.len() as f64;
        importances.iter_mut().for_each(|v| *v /= n_trees);
        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            importances.iter_mut().for_each(|v| *v /= total);
        }

        debug!(
            trees = trees.len(),
            samples = x.nrows(),
            features = x.ncols(),
            "Fitted random forest"
        );

        self.forest = Some(Forest {
            trees,
            feature_names: features.feature_names().to_vec(),
            importances,
        });
        Ok(())
    }

    fn predict(&self, features: &FeatureSet) -> Result<Vec<f64>> {
        let forest = self
            .forest
            .as_ref()
            .ok_or_else(|| ForecastError::ModelNotFittedError(self.name().to_string()))?;
        check_schema(&forest.feature_names, features)?;

        let x = features.to_matrix()?;
        let n_trees = forest.trees.len() as f64;
        Ok(x.outer_iter()
            .map(|row| {
                forest
                    .trees
                    .iter()
                    .map(|tree| tree.predict_row(row))
                    .sum::<f64>()
                    / n_trees
            })
            .collect())
    }

    fn is_fitted(&self) -> bool {
        self.forest.is_some()
    }
}
