//! Regression tree used by the random forest

use ndarray::{Array2, ArrayView1};
use rand::seq::index;
use rand::Rng;

/// Tree node
#[derive(Debug, Clone)]
pub enum TreeNode {
    Leaf {
        value: f64,
        n_samples: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
    },
}

impl TreeNode {
    fn predict(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mut node = self;
        loop {
            match node {
                TreeNode::Leaf { value, .. } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    node = if row[*feature] <= *threshold { left.as_ref() } else { right.as_ref() };
                }
            }
        }
    }

    pub fn n_samples(&self) -> usize {
        match self {
            TreeNode::Leaf { n_samples, .. } | TreeNode::Split { n_samples, .. } => *n_samples,
        }
    }

    /// Depth of the deepest leaf, counting the root as 0
    pub fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 0,
            TreeNode::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }
}

/// Growth limits for a single tree
#[derive(Debug, Clone, Copy)]
pub struct TreeLimits {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features examined per split
    pub max_features: usize,
}

/// Variance-reduction (MSE) regression tree
#[derive(Debug, Clone)]
pub struct RegressionTree {
    root: TreeNode,
    importances: Vec<f64>,
}

struct Candidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl RegressionTree {
    /// Grow a tree on the rows listed in `indices`
    pub fn fit<R: Rng>(
        x: &Array2<f64>,
        y: &[f64],
        indices: &[usize],
        limits: TreeLimits,
        rng: &mut R,
    ) -> Self {
        let mut importances = vec![0.0; x.ncols()];
        let mut builder = Builder {
            x,
            y,
            limits,
            rng,
            importances: &mut importances,
        };
        let root = builder.grow(indices.to_vec(), 0);

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            importances.iter_mut().for_each(|v| *v /= total);
        }

        Self { root, importances }
    }

    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        self.root.predict(row)
    }

    /// Impurity decrease per feature, normalised to sum to 1 (all zero for a stump)
    pub fn feature_importances(&self) -> &[f64] {
        &self.importances
    }

    pub fn root(&self) -> &TreeNode {
        &self.root
    }
}

struct Builder<'a, R: Rng> {
    x: &'a Array2<f64>,
    y: &'a [f64],
    limits: TreeLimits,
    rng: &'a mut R,
    importances: &'a mut [f64],
}

impl<'a, R: Rng> Builder<'a, R> {
    fn grow(&mut self, indices: Vec<usize>, depth: usize) -> TreeNode {
        let n = indices.len();
        let (sum, sq_sum) = indices.iter().fold((0.0, 0.0), |(s, q), &i| {
            (s + self.y[i], q + self.y[i] * self.y[i])
        });
        let mean = sum / n as f64;
        let parent_sse = (sq_sum - sum * sum / n as f64).max(0.0);

        let stop = n < self.limits.min_samples_split
            || n < 2 * self.limits.min_samples_leaf
            || self.limits.max_depth.map_or(false, |d| depth >= d)
            || parent_sse <= 1e-12 * (1.0 + sq_sum);
        if stop {
            return TreeNode::Leaf {
                value: mean,
                n_samples: n,
            };
        }

        let best = match self.best_split(&indices, parent_sse) {
            Some(c) => c,
            None => {
                return TreeNode::Leaf {
                    value: mean,
                    n_samples: n,
                }
            }
        };

        self.importances[best.feature] += best.gain;

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| self.x[[i, best.feature]] <= best.threshold);

        let left = Box::new(self.grow(left_idx, depth + 1));
        let right = Box::new(self.grow(right_idx, depth + 1));
        TreeNode::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
            n_samples: n,
        }
    }

    fn best_split(&mut self, indices: &[usize], parent_sse: f64) -> Option<Candidate> {
        let n_features = self.x.ncols();
        let k = self.limits.max_features.clamp(1, n_features);
        let features = index::sample(&mut *self.rng, n_features, k);

        let n = indices.len();
        let min_leaf = self.limits.min_samples_leaf.max(1);
        let mut best: Option<Candidate> = None;
        let mut sorted = indices.to_vec();

        for feature in features.iter() {
            sorted.sort_by(|&a, &b| self.x[[a, feature]].total_cmp(&self.x[[b, feature]]));

            let total_sum: f64 = sorted.iter().map(|&i| self.y[i]).sum();
            let total_sq: f64 = sorted.iter().map(|&i| self.y[i] * self.y[i]).sum();
            let mut left_sum = 0.0;
            let mut left_sq = 0.0;

            for pos in 0..n - 1 {
                let yi = self.y[sorted[pos]];
                left_sum += yi;
                left_sq += yi * yi;

                let left_n = pos + 1;
                let right_n = n - left_n;
                if left_n < min_leaf || right_n < min_leaf {
                    continue;
                }

                let here = self.x[[sorted[pos], feature]];
                let next = self.x[[sorted[pos + 1], feature]];
                if next <= here {
                    continue;
                }

                let right_sum = total_sum - left_sum;
                let right_sq = total_sq - left_sq;
                let left_sse = left_sq - left_sum * left_sum / left_n as f64;
                let right_sse = right_sq - right_sum * right_sum / right_n as f64;
                let gain = parent_sse - (left_sse + right_sse);

                if gain > best.as_ref().map_or(1e-12, |b| b.gain) {
                    best = Some(Candidate {
                        feature,
                        threshold: (here + next) / 2.0,
                        gain,
                    });
                }
            }
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn limits(n_features: usize) -> TreeLimits {
        TreeLimits {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: n_features,
        }
    }

    #[test]
    fn test_step_function() {
        let x = array![[1.0], [2.0], [3.0], [10.0], [11.0], [12.0]];
        let y = [5.0, 5.0, 5.0, 20.0, 20.0, 20.0];
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let tree = RegressionTree::fit(&x, &y, &[0, 1, 2, 3, 4, 5], limits(1), &mut rng);

        assert_eq!(tree.root().depth(), 1);
        assert_eq!(tree.predict_row(array![2.5].view()), 5.0);
        assert_eq!(tree.predict_row(array![11.5].view()), 20.0);
        assert_eq!(tree.feature_importances(), &[1.0]);
    }

    #[test]
    fn test_ignores_noise_feature() {
        let x = array![
            [1.0, 7.0],
            [2.0, 3.0],
            [3.0, 9.0],
            [10.0, 1.0],
            [11.0, 8.0],
            [12.0, 2.0]
        ];
        let y = [5.0, 5.0, 5.0, 20.0, 20.0, 20.0];
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let tree = RegressionTree::fit(&x, &y, &[0, 1, 2, 3, 4, 5], limits(2), &mut rng);

        let imp = tree.feature_importances();
        assert!(imp[0] > 0.99);
    }

    #[test]
    fn test_constant_target_is_a_leaf() {
        let x = array![[1.0], [2.0], [3.0]];
        let y = [4.0, 4.0, 4.0];
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let tree = RegressionTree::fit(&x, &y, &[0, 1, 2], limits(1), &mut rng);
        assert_eq!(tree.root().depth(), 0);
        assert_eq!(tree.feature_importances(), &[0.0]);
    }
}
