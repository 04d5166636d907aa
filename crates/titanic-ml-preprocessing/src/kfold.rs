use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use titanic_ml_core::{Float, MlError, MlResult};

use crate::split::{class_indices, rng_from};

/// One train/test partition of row indices. Both lists are sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fold {
    pub index: usize,
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// K-fold splitter that keeps the class balance of every test fold within
/// one sample of the overall balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StratifiedKFold {
    pub n_splits: usize,
    pub shuffle: bool,
    pub seed: Option<u64>,
}

impl StratifiedKFold {
    pub fn new(n_splits: usize) -> Self {
        StratifiedKFold {
            n_splits,
            shuffle: true,
            seed: Some(42),
        }
    }

    pub fn with_shuffle(mut self, shuffle: bool, seed: Option<u64>) -> Self {
        self.shuffle = shuffle;
        self.seed = seed;
        self
    }

    /// Partition the rows of `y` into `n_splits` folds.
    ///
    /// Each class is dealt round-robin over the folds, continuing where the
    /// previous class stopped, so fold sizes also differ by at most one.
    pub fn split<T: Float>(&self, y: &[T]) -> MlResult<Vec<Fold>> {
        if self.n_splits < 2 {
            return Err(MlError::invalid_parameter(
                "n_splits",
                format!("need at least 2 folds, got {}", self.n_splits),
            ));
        }
        let (negatives, positives) = class_indices(y)?;
        for (name, members) in [("negative", &negatives), ("positive", &positives)] {
            if members.len() < self.n_splits {
                return Err(MlError::invalid_parameter(
                    "n_splits",
                    format!(
                        "{} folds requested but the {} class has only {} members",
                        self.n_splits,
                        name,
                        members.len()
                    ),
                ));
            }
        }

        let mut rng = rng_from(self.seed);
        let mut tests: Vec<Vec<usize>> = vec![Vec::new(); self.n_splits];
        let mut slot = 0;
        for mut class in [negatives, positives] {
            if self.shuffle {
                class.shuffle(&mut rng);
            }
            for idx in class {
                tests[slot].push(idx);
                slot = (slot + 1) % self.n_splits;
            }
        }

        let n = y.len();
        Ok(tests
            .into_iter()
            .enumerate()
            .map(|(index, mut test)| {
                test.sort_unstable();
                let mut in_test = vec![false; n];
                test.iter().for_each(|&i| in_test[i] = true);
                let train = (0..n).filter(|&i| !in_test[i]).collect();
                Fold { index, train, test }
            })
            .collect())
    }
}
