//! Column transformer: one-hot categoricals, pass-through numerics
//!
//! Output layout is the one-hot block for each categorical feature in
//! [`CATEGORICAL_FEATURES`] order, followed by `age` and `mileage` unscaled.
//! Categories unseen during fit encode to an all-zero block.

use super::{FeatureTable, CATEGORICAL_FEATURES, NUMERIC_FEATURES};
use crate::error::{PricerError, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureEncoder {
    /// Sorted vocabulary per categorical feature
    categories: Vec<Vec<String>>,
    /// Start column of each one-hot block
    offsets: Vec<usize>,
    is_fitted: bool,
}

impl FeatureEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Learn the vocabulary of every categorical feature
    pub fn fit(&mut self, features: &FeatureTable) -> Result<&mut Self> {
        if features.is_empty() {
            return Err(PricerError::ValidationError(
                "cannot fit encoder on an empty feature table".to_string(),
            ));
        }

        self.categories = (0..CATEGORICAL_FEATURES.len())
            .map(|j| {
                let mut vocab: Vec<String> = features
                    .rows()
                    .iter()
                    .map(|row| row.categorical[j].clone())
                    .collect();
                vocab.sort();
                vocab.dedup();
                vocab
            })
            .collect();

        let mut offset = 0;
        self.offsets = self
            .categories
            .iter()
            .map(|vocab| {
                let start = offset;
                offset += vocab.len();
                start
            })
            .collect();

        self.is_fitted = true;
        Ok(self)
    }

    /// Encode rows into the numeric matrix the regressor consumes
    pub fn transform(&self, features: &FeatureTable) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(PricerError::ModelNotFitted);
        }

        let n_onehot = self.n_onehot_columns();
        let mut x = Array2::zeros((features.len(), self.n_output_features()));

        for (i, row) in features.rows().iter().enumerate() {
            for (j, value) in row.categorical.iter().enumerate() {
                if let Ok(pos) = self.categories[j].binary_search(value) {
                    x[[i, self.offsets[j] + pos]] = 1.0;
                }
            }
            for (k, value) in row.numeric.iter().enumerate() {
                x[[i, n_onehot + k]] = *value;
            }
        }

        Ok(x)
    }

    pub fn fit_transform(&mut self, features: &FeatureTable) -> Result<Array2<f64>> {
        self.fit(features)?;
        self.transform(features)
    }

    fn n_onehot_columns(&self) -> usize {
        self.categories.iter().map(|v| v.len()).sum()
    }

    /// Width of the encoded matrix
    pub fn n_output_features(&self) -> usize {
        self.n_onehot_columns() + NUMERIC_FEATURES.len()
    }

    /// Learned vocabulary of a categorical feature
    pub fn categories(&self, feature: &str) -> Option<&[String]> {
        let j = CATEGORICAL_FEATURES.iter().position(|c| *c == feature)?;
        self.categories.get(j).map(|v| v.as_slice())
    }

    /// Names of the encoded columns, e.g. `city=Lahore`, `age`
    pub fn feature_names(&self) -> Vec<String> {
        let mut names: Vec<String> = CATEGORICAL_FEATURES
            .iter()
            .zip(&self.categories)
            .flat_map(|(col, vocab)| vocab.iter().map(move |v| format!("{}={}", col, v)))
            .collect();
        names.extend(NUMERIC_FEATURES.iter().map(|c| c.to_string()));
        names
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// One vocabulary per categorical feature, with block offsets that match
    pub(crate) fn has_valid_layout(&self) -> bool {
        if self.categories.len() != CATEGORICAL_FEATURES.len()
            || self.offsets.len() != self.categories.len()
        {
            return false;
        }
        let mut offset = 0;
        self.categories.iter().zip(&self.offsets).all(|(vocab, &start)| {
            let ok = start == offset;
            offset += vocab.len();
            ok
        })
    }
}
