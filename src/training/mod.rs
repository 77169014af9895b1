//! Model training module
//!
//! Provides the offline training job:
//! - Regression trees and random forests
//! - Seeded hold-out split and k-fold cross-validation
//! - Randomized hyperparameter search maximizing R²
//! - The end-to-end [`TrainEngine`]

mod config;
mod engine;
mod metrics;
pub mod cross_validation;
pub mod decision_tree;
pub mod random_forest;
pub mod search;

pub use config::{IntRange, SearchConfig, SearchSpace, TrainingConfig};
pub use engine::{TrainEngine, TrainingReport};
pub use metrics::{r2, RegressionMetrics};
pub use cross_validation::{train_test_split, CVResults, CVSplit, KFold, TrainTestSplit};
pub use decision_tree::{DecisionTree, TreeNode};
pub use random_forest::{ForestParams, MaxFeatures, RandomForest};
pub use search::{RandomizedSearch, Study, TrialResult};
