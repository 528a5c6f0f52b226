//! Gradient boosted decision trees for binary classification.
//!
//! Logistic loss, second-order (Newton) leaf values and depth-limited
//! regression trees, with the usual LightGBM-style defaults. Training is
//! deterministic for a given seed.

use crate::error::{Result, RiskError};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// GBM hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GbmParams {
    /// Number of boosting iterations (trees)
    pub n_estimators: usize,
    /// Learning rate (shrinkage)
    pub learning_rate: f64,
    /// Maximum depth of each tree
    pub max_depth: usize,
    /// Minimum samples required in a leaf node
    pub min_samples_leaf: usize,
    /// Minimum hessian sum required in a child
    pub min_child_weight: f64,
    /// L2 regularisation on leaf values
    pub lambda_l2: f64,
    /// Row subsample ratio per tree
    pub subsample: f64,
    pub seed: u64,
}

impl Default for GbmParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 5,
            min_samples_leaf: 20,
            min_child_weight: 1e-3,
            lambda_l2: 0.0,
            subsample: 1.0,
            seed: 42,
        }
    }
}

impl GbmParams {
    fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(RiskError::InvalidArgument("n_estimators must be >= 1".into()));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(RiskError::InvalidArgument(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if self.max_depth == 0 || self.min_samples_leaf == 0 {
            return Err(RiskError::InvalidArgument(
                "max_depth and min_samples_leaf must be >= 1".into(),
            ));
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return Err(RiskError::InvalidArgument(format!(
                "subsample must be in (0, 1], got {}",
                self.subsample
            )));
        }
        if self.min_child_weight < 0.0 || self.lambda_l2 < 0.0 {
            return Err(RiskError::InvalidArgument(
                "min_child_weight and lambda_l2 must be non-negative".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Regression tree stored as a flat node list, root at index 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    fn predict(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    /// Children always point forward, so traversal terminates.
    fn is_well_formed(&self, n_features: usize) -> bool {
        !self.nodes.is_empty()
            && self.nodes.iter().enumerate().all(|(i, node)| match node {
                Node::Leaf { value } => value.is_finite(),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    *feature < n_features
                        && !threshold.is_nan()
                        && *left > i
                        && *right > i
                        && *left < self.nodes.len()
                        && *right < self.nodes.len()
                }
            })
    }
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

struct TreeBuilder<'a> {
    x: &'a [Vec<f64>],
    grad: &'a [f64],
    hess: &'a [f64],
    params: &'a GbmParams,
    n_features: usize,
    nodes: Vec<Node>,
    split_counts: Vec<usize>,
}

impl<'a> TreeBuilder<'a> {
    fn leaf_value(&self, g: f64, h: f64) -> f64 {
        let denom = h + self.params.lambda_l2;
        if denom <= 0.0 {
            0.0
        } else {
            -self.params.learning_rate * g / denom
        }
    }

    fn score(&self, g: f64, h: f64) -> f64 {
        let denom = h + self.params.lambda_l2;
        if denom <= 0.0 {
            0.0
        } else {
            g * g / denom
        }
    }

    fn build(&mut self, indices: Vec<usize>, depth: usize) -> usize {
        let g: f64 = indices.iter().map(|&i| self.grad[i]).sum();
        let h: f64 = indices.iter().map(|&i| self.hess[i]).sum();

        let node_id = self.nodes.len();
        self.nodes.push(Node::Leaf {
            value: self.leaf_value(g, h),
        });

        if depth >= self.params.max_depth || indices.len() < 2 * self.params.min_samples_leaf {
            return node_id;
        }

        let Some(split) = self.best_split(&indices, g, h) else {
            return node_id;
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| self.x[i][split.feature] <= split.threshold);

        self.split_counts[split.feature] += 1;
        let left = self.build(left_idx, depth + 1);
        let right = self.build(right_idx, depth + 1);
        self.nodes[node_id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        node_id
    }

    fn best_split(&self, indices: &[usize], g_total: f64, h_total: f64) -> Option<SplitCandidate> {
        let min_leaf = self.params.min_samples_leaf;
        let parent_score = self.score(g_total, h_total);
        let mut best: Option<SplitCandidate> = None;

        for feature in 0..self.n_features {
            let mut column: Vec<(f64, f64, f64)> = indices
                .iter()
                .map(|&i| (self.x[i][feature], self.grad[i], self.hess[i]))
                .collect();
            column.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut g_left = 0.0;
            let mut h_left = 0.0;
            for k in 1..column.len() {
                g_left += column[k - 1].1;
                h_left += column[k - 1].2;

                if column[k].0 == column[k - 1].0 {
                    continue;
                }
                let n_right = column.len() - k;
                if k < min_leaf || n_right < min_leaf {
                    continue;
                }
                let g_right = g_total - g_left;
                let h_right = h_total - h_left;
                if h_left < self.params.min_child_weight || h_right < self.params.min_child_weight {
                    continue;
                }

                let gain = self.score(g_left, h_left) + self.score(g_right, h_right) - parent_score;
                if gain > 1e-12 && best.as_ref().map_or(true, |b| gain > b.gain) {
                    best = Some(SplitCandidate {
                        feature,
                        threshold: (column[k - 1].0 + column[k].0) / 2.0,
                        gain,
                    });
                }
            }
        }

        best
    }
}

/// Gradient boosting classifier for binary targets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GbmClassifier {
    params: GbmParams,
    n_features: usize,
    /// Log-odds of the positive rate in the training data
    init_score: f64,
    trees: Vec<RegressionTree>,
    split_counts: Vec<usize>,
}

impl GbmClassifier {
    /// Train on a row-major feature matrix and 0/1 targets.
    pub fn fit(x: &[Vec<f64>], y: &[u8], params: GbmParams) -> Result<Self> {
        params.validate()?;

        if x.is_empty() {
            return Err(RiskError::TrainingFailed("empty training set".into()));
        }
        if x.len() != y.len() {
            return Err(RiskError::TrainingFailed(format!(
                "{} feature rows but {} targets",
                x.len(),
                y.len()
            )));
        }
        let n_features = x[0].len();
        if n_features == 0 || x.iter().any(|row| row.len() != n_features) {
            return Err(RiskError::TrainingFailed("ragged or empty feature rows".into()));
        }
        if x.iter().flatten().any(|v| !v.is_finite()) {
            return Err(RiskError::TrainingFailed("non-finite feature value".into()));
        }
        if y.iter().any(|&t| t > 1) {
            return Err(RiskError::TrainingFailed("targets must be 0 or 1".into()));
        }

        let n = x.len();
        let positives = y.iter().filter(|&&t| t == 1).count();
        if positives == 0 || positives == n {
            return Err(RiskError::TrainingFailed(format!(
                "target has a single class ({} positives out of {})",
                positives, n
            )));
        }

        let base_rate = positives as f64 / n as f64;
        let init_score = (base_rate / (1.0 - base_rate)).ln();

        info!(
            "Training GBM classifier with {} samples and {} features",
            n, n_features
        );
        debug!("Parameters: {:?}", params);

        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut raw = vec![init_score; n];
        let mut grad = vec![0.0; n];
        let mut hess = vec![0.0; n];
        let mut trees = Vec::with_capacity(params.n_estimators);
        let mut split_counts = vec![0; n_features];
        let bag_size = ((n as f64 * params.subsample).round() as usize).clamp(1, n);

        for round in 0..params.n_estimators {
            for i in 0..n {
                let p = sigmoid(raw[i]);
                grad[i] = p - f64::from(y[i]);
                hess[i] = p * (1.0 - p);
            }

            let indices: Vec<usize> = if bag_size < n {
                let mut bag = rand::seq::index::sample(&mut rng, n, bag_size).into_vec();
                bag.sort_unstable();
                bag
            } else {
                (0..n).collect()
            };

            let mut builder = TreeBuilder {
                x,
                grad: &grad,
                hess: &hess,
                params: &params,
                n_features,
                nodes: Vec::new(),
                split_counts: vec![0; n_features],
            };
            builder.build(indices, 0);

            let tree = RegressionTree {
                nodes: builder.nodes,
            };
            for (total, c) in split_counts.iter_mut().zip(builder.split_counts) {
                *total += c;
            }
            for (score, row) in raw.iter_mut().zip(x) {
                *score += tree.predict(row);
            }
            trees.push(tree);

            if (round + 1) % 25 == 0 {
                debug!("round {}: train log-loss {:.4}", round + 1, log_loss(&raw, y));
            }
        }

        info!("Model training completed: {} trees", trees.len());

        Ok(Self {
            params,
            n_features,
            init_score,
            trees,
            split_counts,
        })
    }

    fn check_row(&self, row: &[f64]) -> Result<()> {
        if row.len() != self.n_features {
            return Err(RiskError::InvalidArgument(format!(
                "feature length mismatch: got {}, expected {}",
                row.len(),
                self.n_features
            )));
        }
        if row.iter().any(|v| !v.is_finite()) {
            return Err(RiskError::InvalidArgument("non-finite feature value".into()));
        }
        Ok(())
    }

    /// Raw additive score (log-odds).
    pub fn decision_function(&self, row: &[f64]) -> Result<f64> {
        self.check_row(row)?;
        Ok(self.init_score + self.trees.iter().map(|t| t.predict(row)).sum::<f64>())
    }

    /// Probability of the positive class, in [0, 1].
    pub fn predict_proba(&self, row: &[f64]) -> Result<f64> {
        Ok(sigmoid(self.decision_function(row)?))
    }

    pub fn predict(&self, row: &[f64]) -> Result<u8> {
        Ok(u8::from(self.predict_proba(row)? > 0.5))
    }

    /// Fraction of rows classified correctly.
    pub fn accuracy(&self, x: &[Vec<f64>], y: &[u8]) -> Result<f64> {
        if x.is_empty() || x.len() != y.len() {
            return Err(RiskError::InvalidArgument(format!(
                "cannot score {} rows against {} targets",
                x.len(),
                y.len()
            )));
        }
        let mut correct = 0;
        for (row, &target) in x.iter().zip(y) {
            if self.predict(row)? == target {
                correct += 1;
            }
        }
        Ok(correct as f64 / x.len() as f64)
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn params(&self) -> &GbmParams {
        &self.params
    }

    /// Number of splits made on each feature across all trees.
    pub fn split_counts(&self) -> &[usize] {
        &self.split_counts
    }

    pub(crate) fn is_well_formed(&self) -> bool {
        self.n_features > 0
            && self.init_score.is_finite()
            && self.split_counts.len() == self.n_features
            && self.trees.iter().all(|t| t.is_well_formed(self.n_features))
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

fn log_loss(raw: &[f64], y: &[u8]) -> f64 {
    let eps = 1e-15;
    let total: f64 = raw
        .iter()
        .zip(y)
        .map(|(&z, &t)| {
            let p = sigmoid(z).clamp(eps, 1.0 - eps);
            if t == 1 {
                -p.ln()
            } else {
                -(1.0 - p).ln()
            }
        })
        .sum();
    total / raw.len() as f64
}
