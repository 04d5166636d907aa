use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use titanic_ml_core::{Float, MlError, MlResult, Tensor};

/// A node in the decision tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "T: Float")]
enum TreeNode<T: Float> {
    /// Internal node: rows with `x[feature_idx] <= threshold` go left.
    Split {
        feature_idx: usize,
        threshold: T,
        left: Box<TreeNode<T>>,
        right: Box<TreeNode<T>>,
    },
    /// Leaf: weighted fraction of positive rows that reached it.
    Leaf { probability: T },
}

/// Weighted class totals of a set of rows.
#[derive(Debug, Clone, Copy, Default)]
struct ClassWeight {
    positive: f64,
    total: f64,
}

impl ClassWeight {
    fn gini(&self) -> f64 {
        if self.total <= 0.0 {
            return 0.0;
        }
        let p = self.positive / self.total;
        2.0 * p * (1.0 - p)
    }

    fn probability(&self) -> f64 {
        if self.total <= 0.0 {
            0.0
        } else {
            self.positive / self.total
        }
    }
}

struct BestSplit<T> {
    feature: usize,
    threshold: T,
    decrease: f64,
    left: Vec<usize>,
    right: Vec<usize>,
}

/// Binary decision tree classifier (CART, weighted Gini impurity).
///
/// When `max_features` is set, each split only considers that many randomly
/// chosen features, which is how the forest decorrelates its trees.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "T: Float")]
pub struct DecisionTreeClassifier<T: Float> {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: Option<usize>,
    pub seed: u64,
    tree: Option<TreeNode<T>>,
    importances: Vec<f64>,
}

impl<T: Float> DecisionTreeClassifier<T> {
    pub fn new(max_depth: usize, min_samples_split: usize, min_samples_leaf: usize) -> Self {
        DecisionTreeClassifier {
            max_depth,
            min_samples_split,
            min_samples_leaf: min_samples_leaf.max(1),
            max_features: None,
            seed: 42,
            tree: None,
            importances: Vec::new(),
        }
    }

    pub fn with_max_features(mut self, max_features: usize, seed: u64) -> Self {
        self.max_features = Some(max_features);
        self.seed = seed;
        self
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
        if y.numel() != n || sample_weights.len() != n {
            return Err(MlError::LengthMismatch {
                observed: n,
                predicted: if y.numel() != n { y.numel() } else { sample_weights.len() },
            });
        }
        let labels: Vec<bool> = y
            .data()
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                v.as_binary().ok_or(MlError::NonBinaryLabel {
                    index: i,
                    value: v.to_f64(),
                })
            })
            .collect::<MlResult<_>>()?;
        let weights: Vec<f64> = sample_weights.iter().map(|w| w.to_f64()).collect();

        let mut builder = Builder {
            params: self,
            x,
            labels: &labels,
            weights: &weights,
            rng: StdRng::seed_from_u64(self.seed),
            importances: vec![0.0; p],
        };
        let indices: Vec<usize> = (0..n).collect();
        let root = builder.build(&indices, 0)?;
        let importances = builder.importances;

        self.tree = Some(root);
        self.importances = importances;
        Ok(())
    }

    /// Probability of the positive class for every row.
    pub fn predict_proba(&self, x: &Tensor<T>) -> MlResult<Tensor<T>> {
        let tree = self.tree.as_ref().ok_or(MlError::NotFitted)?;
        let n = x.nrows()?;
        let mut proba = Vec::with_capacity(n);
        for i in 0..n {
            proba.push(Self::traverse(tree, x.row_slice(i)?)?);
        }
        Ok(Tensor::from_vec(proba))
    }

    pub fn predict(&self, x: &Tensor<T>) -> MlResult<Tensor<T>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.apply(|p| if p >= T::HALF { T::ONE } else { T::ZERO }))
    }

    fn traverse(node: &TreeNode<T>, row: &[T]) -> MlResult<T> {
        match node {
            TreeNode::Leaf { probability } => Ok(*probability),
            TreeNode::Split {
                feature_idx,
                threshold,
                left,
                right,
            } => {
                let val = *row.get(*feature_idx).ok_or(MlError::IndexOutOfBounds {
                    index: *feature_idx,
                    axis: 1,
                    size: row.len(),
                })?;
                if val <= *threshold {
                    Self::traverse(left, row)
                } else {
                    Self::traverse(right, row)
                }
            }
        }
    }

    /// Impurity-decrease importances normalised to sum to 1 (all zero for a
    /// tree that never split).
    pub fn feature_importances(&self) -> Vec<f64> {
        normalise(&self.importances)
    }

    pub fn depth(&self) -> usize {
        fn depth_of<T: Float>(node: &TreeNode<T>) -> usize {
            match node {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + depth_of(left).max(depth_of(right)),
            }
        }
        self.tree.as_ref().map_or(0, depth_of)
    }
}

pub(crate) fn normalise(values: &[f64]) -> Vec<f64> {
    let total: f64 = values.iter().sum();
    if total > 0.0 {
        values.iter().map(|v| v / total).collect()
    } else {
        vec![0.0; values.len()]
    }
}

struct Builder<'a, T: Float> {
    params: &'a DecisionTreeClassifier<T>,
    x: &'a Tensor<T>,
    labels: &'a [bool],
    weights: &'a [f64],
    rng: StdRng,
    importances: Vec<f64>,
}

impl<'a, T: Float> Builder<'a, T> {
    fn class_weight(&self, indices: &[usize]) -> ClassWeight {
        indices.iter().fold(ClassWeight::default(), |mut acc, &i| {
            acc.total += self.weights[i];
            if self.labels[i] {
                acc.positive += self.weights[i];
            }
            acc
        })
    }

    fn build(&mut self, indices: &[usize], depth: usize) -> MlResult<TreeNode<T>> {
        let node = self.class_weight(indices);
        let leaf = TreeNode::Leaf {
            probability: T::from_f64(node.probability()),
        };

        if depth >= self.params.max_depth
            || indices.len() < self.params.min_samples_split.max(2)
            || node.gini() <= 0.0
        {
            return Ok(leaf);
        }

        let Some(best) = self.best_split(indices, node)? else {
            return Ok(leaf);
        };

        self.importances[best.feature] += best.decrease;
        let left = self.build(&best.left, depth + 1)?;
        let right = self.build(&best.right, depth + 1)?;
        Ok(TreeNode::Split {
            feature_idx: best.feature,
            threshold: best.threshold,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn candidate_features(&mut self) -> MlResult<Vec<usize>> {
        let p = self.x.ncols()?;
        let mut features: Vec<usize> = (0..p).collect();
        if let Some(k) = self.params.max_features {
            features.shuffle(&mut self.rng);
            features.truncate(k.clamp(1, p.max(1)));
        }
        Ok(features)
    }

    /// Exhaustive search over midpoints between consecutive distinct values.
    fn best_split(
        &mut self,
        indices: &[usize],
        node: ClassWeight,
    ) -> MlResult<Option<BestSplit<T>>> {
        let min_leaf = self.params.min_samples_leaf;
        let parent = node.total * node.gini();
        let mut best: Option<(usize, T, f64)> = None;

        for feature in self.candidate_features()? {
            let mut sorted: Vec<(T, usize)> = indices
                .iter()
                .map(|&i| Ok((self.x.get(&[i, feature])?, i)))
                .collect::<MlResult<_>>()?;
            sorted.sort_by(|a, b| a.0.to_f64().total_cmp(&b.0.to_f64()));

            let mut left = ClassWeight::default();
            for k in 0..sorted.len() - 1 {
                let (value, i) = sorted[k];
                left.total += self.weights[i];
                if self.labels[i] {
                    left.positive += self.weights[i];
                }
                let next = sorted[k + 1].0;
                if next <= value {
                    continue;
                }
                let n_left = k + 1;
                if n_left < min_leaf || sorted.len() - n_left < min_leaf {
                    continue;
                }
                let right = ClassWeight {
                    positive: node.positive - left.positive,
                    total: node.total - left.total,
                };
                let decrease = parent - left.total * left.gini() - right.total * right.gini();
                if best.map_or(true, |(_, _, d)| decrease > d) {
                    best = Some((feature, (value + next) / T::TWO, decrease));
                }
            }
        }

        let Some((feature, threshold, decrease)) = best else {
            return Ok(None);
        };
        let mut left = Vec::new();
        let mut right = Vec::new();
        for &i in indices {
            if self.x.get(&[i, feature])? <= threshold {
                left.push(i);
            } else {
                right.push(i);
            }
        }
        if left.is_empty() || right.is_empty() {
            return Ok(None);
        }
        Ok(Some(BestSplit {
            feature,
            threshold,
            decrease: decrease.max(0.0),
            left,
            right,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_tree_classifier() {
        let x: Tensor<f64> = Tensor::from_vec2d(&[
            vec![0.0], vec![1.0], vec![2.0], vec![3.0],
            vec![4.0], vec![5.0], vec![6.0], vec![7.0],
        ]).unwrap();
        let y: Tensor<f64> = Tensor::from_slice(&[0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0]);

        let mut tree = DecisionTreeClassifier::new(10, 2, 1);
        tree.fit(&x, &y).unwrap();
        let pred = tree.predict(&x).unwrap();

        assert_eq!(pred.data(), y.data());
        assert_eq!(tree.depth(), 1);
    }

    #[test]
    fn test_leaf_probabilities() {
        // depth 0: the root is a leaf with the overall survival rate
        let x: Tensor<f64> =
            Tensor::from_vec2d(&[vec![0.0], vec![1.0], vec![2.0], vec![3.0]]).unwrap();
        let y: Tensor<f64> = Tensor::from_slice(&[0.0, 1.0, 0.0, 0.0]);
        let mut stump = DecisionTreeClassifier::new(0, 2, 1);
        stump.fit(&x, &y).unwrap();
        let proba = stump.predict_proba(&x).unwrap();
        assert!(proba.data().iter().all(|&p| (p - 0.25).abs() < 1e-12));

        let mut weighted = DecisionTreeClassifier::new(0, 2, 1);
        weighted.fit_weighted(&x, &y, &[1.0, 3.0, 1.0, 1.0]).unwrap();
        assert!((weighted.predict_proba(&x).unwrap().data()[0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_importance_goes_to_informative_feature() {
        // feature 0 is noise, feature 1 decides the label
        let x: Tensor<f64> = Tensor::from_vec2d(&[
            vec![3.0, 0.0], vec![1.0, 0.1], vec![2.0, 0.2], vec![0.0, 0.3],
            vec![2.0, 1.0], vec![0.0, 1.1], vec![3.0, 1.2], vec![1.0, 1.3],
        ]).unwrap();
        let y: Tensor<f64> = Tensor::from_slice(&[0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0]);
        let mut tree = DecisionTreeClassifier::new(5, 2, 1);
        tree.fit(&x, &y).unwrap();
        let imp = tree.feature_importances();
        assert_eq!(imp, vec![0.0, 1.0]);
    }

    #[test]
    fn test_min_samples_leaf_blocks_small_splits() {
        let x: Tensor<f64> = Tensor::from_vec2d(&[vec![0.0], vec![1.0], vec![2.0]]).unwrap();
        let y: Tensor<f64> = Tensor::from_slice(&[1.0, 0.0, 0.0]);
        let mut tree = DecisionTreeClassifier::new(5, 2, 2);
        tree.fit(&x, &y).unwrap();
        assert_eq!(tree.depth(), 0);
    }

    #[test]
    fn test_errors() {
        let x: Tensor<f64> = Tensor::from_vec2d(&[vec![0.0], vec![1.0]]).unwrap();
        let tree: DecisionTreeClassifier<f64> = DecisionTreeClassifier::new(3, 2, 1);
        assert_eq!(tree.predict(&x).unwrap_err(), MlError::NotFitted);

        let mut tree = DecisionTreeClassifier::new(3, 2, 1);
        assert!(tree.fit(&x, &Tensor::from_slice(&[0.0, 2.0])).is_err());
    }
}
