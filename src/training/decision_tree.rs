//! Regression tree built by variance reduction
//!
//! Each node draws features in random order and scans them until it has
//! seen `max_features` non-constant ones, keeping the split with the lowest
//! summed squared error of the two children.

use crate::error::{PricerError, Result};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node with prediction value
    Leaf {
        value: f64,
        n_samples: usize,
    },
    /// Internal node with split
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
        impurity: f64,
    },
}

/// Regression tree model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    /// Tree root
    root: Option<TreeNode>,
    /// Maximum depth
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Maximum informative features to consider per split
    pub max_features: Option<usize>,
    /// Seed for feature sampling when fitted standalone
    pub random_state: Option<u64>,
    /// Number of features
    n_features: usize,
    /// Feature importances
    feature_importances: Option<Array1<f64>>,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Split found for a node
#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature_idx: usize,
    threshold: f64,
    children_sse: f64,
}

/// Stopping and sampling parameters copied out of the tree for the builder
#[derive(Debug, Clone, Copy)]
struct GrowParams {
    max_depth: Option<usize>,
    min_samples_split: usize,
    min_samples_leaf: usize,
    max_features: usize,
}

struct TreeBuilder<'a, 'r> {
    x: ArrayView2<'a, f64>,
    y: ArrayView1<'a, f64>,
    params: GrowParams,
    rng: &'r mut ChaCha8Rng,
    feature_order: Vec<usize>,
    importances: Vec<f64>,
    scratch: Vec<(f64, f64)>,
}

impl TreeBuilder<'_, '_> {
    fn build(&mut self, indices: &mut [usize], depth: usize) -> TreeNode {
        let n_samples = indices.len();
        let (sum, sq_sum) = indices.iter().fold((0.0, 0.0), |(s, sq), &i| {
            let yi = self.y[i];
            (s + yi, sq + yi * yi)
        });
        let n = n_samples as f64;
        let value = sum / n;
        let node_sse = (sq_sum - sum * sum / n).max(0.0);

        let should_stop = n_samples < self.params.min_samples_split
            || n_samples < 2 * self.params.min_samples_leaf
            || self.params.max_depth.map_or(false, |d| depth >= d)
            || node_sse <= 1e-12;

        if should_stop {
            return TreeNode::Leaf { value, n_samples };
        }

        let Some(split) = self.find_best_split(indices, sum, sq_sum, node_sse) else {
            return TreeNode::Leaf { value, n_samples };
        };

        // Partition in place: rows going left end up at the front
        let mut left_len = 0;
        for k in 0..n_samples {
            if self.x[[indices[k], split.feature_idx]] <= split.threshold {
                indices.swap(k, left_len);
                left_len += 1;
            }
        }

        self.importances[split.feature_idx] += node_sse - split.children_sse;

        let (left_idx, right_idx) = indices.split_at_mut(left_len);
        let left = Box::new(self.build(left_idx, depth + 1));
        let right = Box::new(self.build(right_idx, depth + 1));

        TreeNode::Split {
            feature_idx: split.feature_idx,
            threshold: split.threshold,
            left,
            right,
            n_samples,
            impurity: node_sse / n,
        }
    }

    fn find_best_split(
        &mut self,
        indices: &[usize],
        sum: f64,
        sq_sum: f64,
        node_sse: f64,
    ) -> Option<SplitCandidate> {
        let n_samples = indices.len();
        let min_leaf = self.params.min_samples_leaf.max(1);
        let mut best: Option<SplitCandidate> = None;
        let mut informative_seen = 0;

        self.feature_order.shuffle(&mut *self.rng);

        for pos in 0..self.feature_order.len() {
            if informative_seen >= self.params.max_features {
                break;
            }
            let feature_idx = self.feature_order[pos];

            let first = self.x[[indices[0], feature_idx]];
            if indices.iter().all(|&i| self.x[[i, feature_idx]] == first) {
                continue;
            }
            informative_seen += 1;

            self.scratch.clear();
            self.scratch
                .extend(indices.iter().map(|&i| (self.x[[i, feature_idx]], self.y[i])));
            self.scratch.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_sum = 0.0;
            let mut left_sq = 0.0;
            for k in 0..n_samples - 1 {
                let (value, yi) = self.scratch[k];
                left_sum += yi;
                left_sq += yi * yi;

                let next = self.scratch[k + 1].0;
                if next <= value {
                    continue;
                }

                let left_n = k + 1;
                let right_n = n_samples - left_n;
                if left_n < min_leaf || right_n < min_leaf {
                    continue;
                }

                let right_sum = sum - left_sum;
                let right_sq = sq_sum - left_sq;
                let children_sse = (left_sq - left_sum * left_sum / left_n as f64)
                    + (right_sq - right_sum * right_sum / right_n as f64);

                if children_sse < node_sse
                    && best.map_or(true, |b| children_sse < b.children_sse)
                {
                    let mid = (value + next) / 2.0;
                    let threshold = if mid >= next { value } else { mid };
                    best = Some(SplitCandidate {
                        feature_idx,
                        threshold,
                        children_sse,
                    });
                }
            }
        }

        best
    }
}

impl DecisionTree {
    /// Create a new regression tree
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            random_state: None,
            n_features: 0,
            feature_importances: None,
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    /// Set number of features considered per split
    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features);
        self
    }

    /// Set random state
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Fit the tree to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let indices: Vec<usize> = (0..x.nrows()).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state.unwrap_or(0));
        self.fit_indices(x.view(), y.view(), indices, &mut rng)
    }

    /// Fit on a subset of rows (duplicates allowed, as in a bootstrap sample)
    pub(crate) fn fit_indices<'a>(
        &mut self,
        x: ArrayView2<'a, f64>,
        y: ArrayView1<'a, f64>,
        mut indices: Vec<usize>,
        rng: &mut ChaCha8Rng,
    ) -> Result<&mut Self> {
        let n_features = x.ncols();

        if x.nrows() != y.len() {
            return Err(PricerError::ShapeError {
                expected: format!("y length = {}", x.nrows()),
                actual: format!("y length = {}", y.len()),
            });
        }

        if indices.is_empty() || n_features == 0 {
            return Err(PricerError::ValidationError(
                "cannot fit a tree on an empty training set".to_string(),
            ));
        }

        self.n_features = n_features;

        let params = GrowParams {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split.max(2),
            min_samples_leaf: self.min_samples_leaf.max(1),
            max_features: self.max_features.unwrap_or(n_features).clamp(1, n_features),
        };

        let mut builder = TreeBuilder {
            x,
            y,
            params,
            rng,
            feature_order: (0..n_features).collect(),
            importances: vec![0.0; n_features],
            scratch: Vec::with_capacity(indices.len()),
        };

        let root = builder.build(&mut indices, 0);
        let mut importances = builder.importances;

        // Normalize feature importances
        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }

        self.root = Some(root);
        self.feature_importances = Some(Array1::from_vec(importances));
        Ok(self)
    }

    /// Make predictions
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(PricerError::ModelNotFitted)?;

        if x.ncols() != self.n_features {
            return Err(PricerError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        Ok(x.rows()
            .into_iter()
            .map(|sample| Self::predict_sample(root, sample))
            .collect())
    }

    fn predict_sample(node: &TreeNode, sample: ArrayView1<'_, f64>) -> f64 {
        let mut node = node;
        loop {
            match node {
                TreeNode::Leaf { value, .. } => return *value,
                TreeNode::Split { feature_idx, threshold, left, right, .. } => {
                    node = if sample[*feature_idx] <= *threshold { left } else { right };
                }
            }
        }
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    /// Get tree depth
    pub fn get_depth(&self) -> usize {
        match &self.root {
            None => 0,
            Some(node) => Self::node_depth(node),
        }
    }

    fn node_depth(node: &TreeNode) -> usize {
        match node {
            TreeNode::Leaf { .. } => 0,
            TreeNode::Split { left, right, .. } => {
                1 + Self::node_depth(left).max(Self::node_depth(right))
            }
        }
    }

    /// Get number of leaves
    pub fn get_n_leaves(&self) -> usize {
        match &self.root {
            None => 0,
            Some(node) => Self::count_leaves(node),
        }
    }

    fn count_leaves(node: &TreeNode) -> usize {
        match node {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => {
                Self::count_leaves(left) + Self::count_leaves(right)
            }
        }
    }

    /// Smallest leaf, in training samples
    pub fn min_leaf_size(&self) -> Option<usize> {
        fn walk(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { n_samples, .. } => *n_samples,
                TreeNode::Split { left, right, .. } => walk(left).min(walk(right)),
            }
        }
        self.root.as_ref().map(walk)
    }
}
