//! Randomized hyperparameter search scored by k-fold R²

use crate::error::{PricerError, Result};
use crate::preprocessing::{FeatureEncoder, FeatureTable};
use super::config::SearchConfig;
use super::cross_validation::{CVResults, CVSplit, KFold};
use super::metrics::r2;
use super::random_forest::{ForestParams, RandomForest};
use ndarray::Array1;
use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Result of a single candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialResult {
    pub trial_id: usize,
    pub params: ForestParams,
    /// Mean R² across folds, `-inf` when the trial failed
    pub value: f64,
    pub fold_scores: Vec<f64>,
    pub duration_secs: f64,
    /// Set when the trial errored; it never becomes the best trial
    pub error: Option<String>,
}

impl TrialResult {
    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

/// All trials of a search, tracking the best one
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Study {
    pub trials: Vec<TrialResult>,
    pub best_trial_idx: Option<usize>,
    pub total_duration_secs: f64,
}

impl Study {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the best trial
    pub fn best_trial(&self) -> Option<&TrialResult> {
        self.best_trial_idx.map(|idx| &self.trials[idx])
    }

    /// Get the best value
    pub fn best_value(&self) -> Option<f64> {
        self.best_trial().map(|t| t.value)
    }

    /// Get the best parameters
    pub fn best_params(&self) -> Option<&ForestParams> {
        self.best_trial().map(|t| &t.params)
    }

    /// Add a trial result. Ties keep the earlier trial.
    pub fn add_trial(&mut self, result: TrialResult) {
        let idx = self.trials.len();

        let is_better = !result.failed()
            && match self.best_value() {
                None => true,
                Some(best) => result.value > best,
            };

        if is_better {
            self.best_trial_idx = Some(idx);
        }

        self.trials.push(result);
    }
}

/// Randomized search over [`SearchSpace`](super::config::SearchSpace)
pub struct RandomizedSearch {
    config: SearchConfig,
    random_state: u64,
}

impl RandomizedSearch {
    pub fn new(config: SearchConfig, random_state: u64) -> Self {
        Self {
            config,
            random_state,
        }
    }

    /// Draw `n_iter` candidates; the same seed always yields the same list
    pub fn sample_candidates(&self) -> Vec<ForestParams> {
        let space = &self.config.space;
        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);

        (0..self.config.n_iter)
            .map(|_| ForestParams {
                n_estimators: rng.gen_range(space.n_estimators.low..space.n_estimators.high),
                max_depth: Some(rng.gen_range(space.max_depth.low..space.max_depth.high)),
                min_samples_split: rng
                    .gen_range(space.min_samples_split.low..space.min_samples_split.high),
                min_samples_leaf: rng
                    .gen_range(space.min_samples_leaf.low..space.min_samples_leaf.high),
                max_features: space
                    .max_features
                    .choose(&mut rng)
                    .copied()
                    .unwrap_or_default(),
            })
            .collect()
    }

    /// Score every candidate with k-fold cross-validation and keep the one
    /// with the highest mean R². Fails only when every trial fails.
    pub fn fit(&self, features: &FeatureTable, y: &Array1<f64>) -> Result<Study> {
        self.config.space.validate()?;

        let start = Instant::now();
        let folds = KFold::new(self.config.cv_folds).split(features.len())?;
        let mut study = Study::new();

        for (trial_id, params) in self.sample_candidates().into_iter().enumerate() {
            let trial_start = Instant::now();

            let trial = match cross_validate(features, y, &params, &folds, self.random_state) {
                Ok(cv) => TrialResult {
                    trial_id,
                    params,
                    value: cv.mean_score,
                    fold_scores: cv.scores,
                    duration_secs: trial_start.elapsed().as_secs_f64(),
                    error: None,
                },
                Err(e) => {
                    warn!(trial = trial_id, error = %e, "Trial failed");
                    TrialResult {
                        trial_id,
                        params,
                        value: f64::NEG_INFINITY,
                        fold_scores: Vec::new(),
                        duration_secs: trial_start.elapsed().as_secs_f64(),
                        error: Some(e.to_string()),
                    }
                }
            };

            info!(
                trial = trial_id,
                r2 = trial.value,
                best = study.best_value().unwrap_or(trial.value).max(trial.value),
                params = %trial.params,
                "Search trial finished"
            );

            study.add_trial(trial);
        }

        study.total_duration_secs = start.elapsed().as_secs_f64();

        if study.best_trial_idx.is_none() {
            let cause = study
                .trials
                .last()
                .and_then(|t| t.error.clone())
                .unwrap_or_else(|| "no candidates".to_string());
            return Err(PricerError::TrainingError(format!(
                "every search trial failed, last error: {}",
                cause
            )));
        }

        Ok(study)
    }
}

/// Mean R² of `params` across `folds`. The encoder is refitted on each
/// training fold so held-out categories are treated as unseen.
pub fn cross_validate(
    features: &FeatureTable,
    y: &Array1<f64>,
    params: &ForestParams,
    folds: &[CVSplit],
    seed: u64,
) -> Result<CVResults> {
    let mut scores = Vec::with_capacity(folds.len());

    for fold in folds {
        let train = features.take(&fold.train_indices);
        let test = features.take(&fold.test_indices);
        let y_train: Array1<f64> = fold.train_indices.iter().map(|&i| y[i]).collect();
        let y_test: Array1<f64> = fold.test_indices.iter().map(|&i| y[i]).collect();

        let mut encoder = FeatureEncoder::new();
        let x_train = encoder.fit_transform(&train)?;
        let x_test = encoder.transform(&test)?;

        let mut forest = RandomForest::from_params(params, seed);
        forest.fit(&x_train, &y_train)?;
        let score = r2(&y_test, &forest.predict(&x_test)?)?;

        debug!(fold = fold.fold_idx, r2 = score, "Fold scored");
        scores.push(score);
    }

    Ok(CVResults::from_scores(scores))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::FeatureRow;
    use crate::training::config::{IntRange, SearchSpace};
    use crate::training::random_forest::MaxFeatures;

    fn small_config(n_iter: usize) -> SearchConfig {
        SearchConfig {
            n_iter,
            cv_folds: 3,
            space: SearchSpace {
                n_estimators: IntRange::new(3, 6),
                max_depth: IntRange::new(2, 6),
                min_samples_split: IntRange::new(2, 4),
                min_samples_leaf: IntRange::new(1, 3),
                max_features: vec![MaxFeatures::Sqrt, MaxFeatures::All],
            },
        }
    }

    fn dataset(n: usize) -> (FeatureTable, Array1<f64>) {
        let fuels = ["Petrol", "Diesel", "Hybrid"];
        let rows: Vec<FeatureRow> = (0..n)
            .map(|i| FeatureRow {
                numeric: [(i % 15) as f64, (i * 1_000) as f64],
                categorical: [
                    fuels[i % 3].to_string(),
                    if i % 2 == 0 { "Manual" } else { "Automatic" }.to_string(),
                    "Lahore".to_string(),
                    "Punjab".to_string(),
                    "Local".to_string(),
                ],
            })
            .collect();
        let y = rows
            .iter()
            .map(|r| 15.0 - 0.1 * r.age() + if r.categorical[1] == "Automatic" { 0.3 } else { 0.0 })
            .collect();
        (FeatureTable::new(rows), y)
    }

    #[test]
    fn test_candidates_are_seeded_and_in_range() {
        let search = RandomizedSearch::new(small_config(10), 42);
        let a = search.sample_candidates();
        let b = search.sample_candidates();
        assert_eq!(a, b);
        assert_eq!(a.len(), 10);

        for p in &a {
            assert!((3..6).contains(&p.n_estimators));
            assert!((2..6).contains(&p.max_depth.unwrap()));
            assert!((2..4).contains(&p.min_samples_split));
            assert!((1..3).contains(&p.min_samples_leaf));
            assert_ne!(p.max_features, MaxFeatures::Log2);
        }
    }

    #[test]
    fn test_search_picks_highest_mean_r2() {
        let (features, y) = dataset(60);
        let study = RandomizedSearch::new(small_config(4), 42).fit(&features, &y).unwrap();

        assert_eq!(study.trials.len(), 4);
        let best = study.best_value().unwrap();
        assert!(study.trials.iter().all(|t| t.value <= best));
        assert_eq!(study.best_trial().unwrap().fold_scores.len(), 3);
    }

    #[test]
    fn test_failed_trials_never_win() {
        let mut study = Study::new();
        let params = ForestParams::default();
        study.add_trial(TrialResult {
            trial_id: 0,
            params,
            value: f64::NEG_INFINITY,
            fold_scores: vec![],
            duration_secs: 0.0,
            error: Some("boom".to_string()),
        });
        assert!(study.best_trial().is_none());

        study.add_trial(TrialResult {
            trial_id: 1,
            params,
            value: 0.2,
            fold_scores: vec![0.2],
            duration_secs: 0.0,
            error: None,
        });
        study.add_trial(TrialResult {
            trial_id: 2,
            params,
            value: 0.2,
            fold_scores: vec![0.2],
            duration_secs: 0.0,
            error: None,
        });
        assert_eq!(study.best_trial().unwrap().trial_id, 1);
    }

    #[test]
    fn test_search_needs_enough_rows_for_folds() {
        let (features, y) = dataset(2);
        assert!(RandomizedSearch::new(small_config(1), 42).fit(&features, &y).is_err());
    }
}
