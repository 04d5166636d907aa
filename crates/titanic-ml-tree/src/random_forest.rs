use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use titanic_ml_core::{Float, MlError, MlResult, Tensor};
use tracing::debug;

use crate::decision_tree::{normalise, DecisionTreeClassifier};

/// Random forest classifier: bagged decision trees with per-split feature
/// subsampling. Trees grow in parallel, each from a seed drawn up front
/// from the forest seed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "T: Float")]
pub struct RandomForestClassifier<T: Float> {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features_ratio: f64,
    pub bootstrap: bool,
    pub seed: Option<u64>,
    trees: Vec<DecisionTreeClassifier<T>>,
    n_features: usize,
}

impl<T: Float> RandomForestClassifier<T> {
    pub fn new(n_estimators: usize, max_depth: usize, max_features_ratio: f64) -> Self {
        RandomForestClassifier {
            n_estimators,
            max_depth,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features_ratio,
            bootstrap: true,
            seed: Some(42),
            trees: Vec::new(),
            n_features: 0,
        }
    }

    pub fn fit(&mut self, x: &Tensor<T>, y: &Tensor<T>) -> MlResult<()> {
        let ones = vec![T::ONE; y.numel()];
        self.fit_weighted(x, y, &ones)
    }

    pub fn fit_weighted(
        &mut self,
        x: &Tensor<T>,
        y: &Tensor<T>,
        sample_weights: &[T],
    ) -> MlResult<()> {
        let (n, p) = x.shape().as_matrix()?;
        if n == 0 {
            return Err(MlError::EmptyInput);
        }
        if self.n_estimators == 0 {
            return Err(MlError::invalid_parameter("n_estimators", "must be at least 1"));
        }
        if !(self.max_features_ratio > 0.0 && self.max_features_ratio <= 1.0) {
            return Err(MlError::invalid_parameter(
                "max_features_ratio",
                format!("must lie in (0, 1], got {}", self.max_features_ratio),
            ));
        }
        if y.numel() != n || sample_weights.len() != n {
            return Err(MlError::LengthMismatch {
                observed: n,
                predicted: if y.numel() != n { y.numel() } else { sample_weights.len() },
            });
        }
        let max_features =
            ((p as f64 * self.max_features_ratio).ceil() as usize).clamp(1, p.max(1));

        let mut base_rng = match self.seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        let tree_seeds: Vec<u64> = (0..self.n_estimators).map(|_| base_rng.gen()).collect();

        let trees = tree_seeds
            .into_par_iter()
            .map(|seed| {
                let mut rng = StdRng::seed_from_u64(seed);
                let sample: Vec<usize> = if self.bootstrap {
                    (0..n).map(|_| rng.gen_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };
                let x_sub = x.select_rows(&sample)?;
                let y_sub = y.select_rows(&sample)?;
                let w_sub: Vec<T> = sample.iter().map(|&i| sample_weights[i]).collect();

                let mut tree = DecisionTreeClassifier::new(
                    self.max_depth,
                    self.min_samples_split,
                    self.min_samples_leaf,
                )
                .with_max_features(max_features, rng.gen());
                tree.fit_weighted(&x_sub, &y_sub, &w_sub)?;
                Ok(tree)
            })
            .collect::<MlResult<Vec<_>>>()?;

        debug!(trees = trees.len(), max_features, rows = n, "random forest fitted");
        self.trees = trees;
        self.n_features = p;
        Ok(())
    }

    /// Mean of the trees' leaf probabilities.
    pub fn predict_proba(&self, x: &Tensor<T>) -> MlResult<Tensor<T>> {
        if self.trees.is_empty() {
            return Err(MlError::NotFitted);
        }
        let n = x.nrows()?;
        let per_tree = self
            .trees
            .par_iter()
            .map(|tree| tree.predict_proba(x))
            .collect::<MlResult<Vec<_>>>()?;

        let k = T::from_usize(per_tree.len());
        let proba: Vec<T> = (0..n)
            .map(|i| per_tree.iter().map(|p| p.data()[i]).sum::<T>() / k)
            .collect();
        Ok(Tensor::from_vec(proba))
    }

    pub fn predict(&self, x: &Tensor<T>) -> MlResult<Tensor<T>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.apply(|p| if p >= T::HALF { T::ONE } else { T::ZERO }))
    }

    /// Mean impurity decrease per feature over all trees, summing to 1.
    pub fn feature_importances(&self) -> MlResult<Vec<f64>> {
        if self.trees.is_empty() {
            return Err(MlError::NotFitted);
        }
        let mut total = vec![0.0; self.n_features];
        for tree in &self.trees {
            for (t, v) in total.iter_mut().zip(tree.feature_importances()) {
                *t += v;
            }
        }
        Ok(normalise(&total))
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}
