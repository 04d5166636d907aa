//! Class-imbalance handling: random under/over-sampling, SMOTE and
//! balanced class weights. Resampling is meant for training rows only.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use titanic_ml_core::{Float, MlError, MlResult, Tensor};
use tracing::debug;

use crate::split::{class_indices, rng_from};

/// Minority and majority row indices, the minority being the smaller class
/// (positives on ties).
fn minority_majority<T: Float>(y: &Tensor<T>) -> MlResult<(Vec<usize>, Vec<usize>)> {
    let (negatives, positives) = class_indices(y.data())?;
    if negatives.is_empty() || positives.is_empty() {
        return Err(MlError::InvalidOperation(
            "resampling needs both classes present".into(),
        ));
    }
    if positives.len() <= negatives.len() {
        Ok((positives, negatives))
    } else {
        Ok((negatives, positives))
    }
}

fn check_rows<T: Float>(x: &Tensor<T>, y: &Tensor<T>) -> MlResult<()> {
    let n = x.nrows()?;
    if n != y.numel() {
        return Err(MlError::LengthMismatch {
            observed: y.numel(),
            predicted: n,
        });
    }
    Ok(())
}

/// Shrink the majority class to `target` rows (default: minority size) by
/// sampling without replacement. All minority rows are kept.
pub fn random_under_sample<T: Float>(
    x: &Tensor<T>,
    y: &Tensor<T>,
    target: Option<usize>,
    seed: Option<u64>,
) -> MlResult<(Tensor<T>, Tensor<T>)> {
    check_rows(x, y)?;
    let (minority, mut majority) = minority_majority(y)?;
    let target = target.unwrap_or(minority.len());
    if target == 0 || target > majority.len() {
        return Err(MlError::invalid_parameter(
            "target",
            format!("must be in 1..={}, got {}", majority.len(), target),
        ));
    }

    let mut rng = rng_from(seed);
    majority.shuffle(&mut rng);
    majority.truncate(target);

    let mut rows = minority;
    rows.extend(majority);
    rows.shuffle(&mut rng);
    debug!(rows = rows.len(), target, "under-sampled majority class");
    Ok((x.select_rows(&rows)?, y.select_rows(&rows)?))
}

/// Grow the minority class to `target` rows (default: majority size) by
/// duplicating randomly chosen minority rows.
pub fn random_over_sample<T: Float>(
    x: &Tensor<T>,
    y: &Tensor<T>,
    target: Option<usize>,
    seed: Option<u64>,
) -> MlResult<(Tensor<T>, Tensor<T>)> {
    check_rows(x, y)?;
    let (minority, majority) = minority_majority(y)?;
    let target = target.unwrap_or(majority.len());
    if target < minority.len() {
        return Err(MlError::invalid_parameter(
            "target",
            format!("must be at least the minority size {}, got {}", minority.len(), target),
        ));
    }

    let mut rng = rng_from(seed);
    let extra: Vec<usize> = (0..target - minority.len())
        .map(|_| minority[rng.gen_range(0..minority.len())])
        .collect();

    let mut rows = majority;
    rows.extend(&minority);
    rows.extend(extra);
    rows.shuffle(&mut rng);
    debug!(rows = rows.len(), target, "over-sampled minority class");
    Ok((x.select_rows(&rows)?, y.select_rows(&rows)?))
}

/// Synthetic Minority Over-sampling Technique.
///
/// Each synthetic row lies on the segment between a random minority row and
/// one of its `k_neighbors` nearest minority neighbours (Euclidean).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Smote {
    pub k_neighbors: usize,
    pub seed: Option<u64>,
}

impl Default for Smote {
    fn default() -> Self {
        Smote {
            k_neighbors: 5,
            seed: Some(42),
        }
    }
}

impl Smote {
    pub fn new(k_neighbors: usize, seed: Option<u64>) -> Self {
        Smote { k_neighbors, seed }
    }

    /// Append synthetic minority rows until the classes are balanced (or the
    /// minority reaches `target`). Original rows come first, unchanged.
    pub fn fit_resample<T: Float>(
        &self,
        x: &Tensor<T>,
        y: &Tensor<T>,
        target: Option<usize>,
    ) -> MlResult<(Tensor<T>, Tensor<T>)> {
        check_rows(x, y)?;
        if self.k_neighbors == 0 {
            return Err(MlError::invalid_parameter("k_neighbors", "must be at least 1"));
        }
        let (minority, majority) = minority_majority(y)?;
        if minority.len() < 2 {
            return Err(MlError::InvalidOperation(
                "SMOTE needs at least two minority rows".into(),
            ));
        }
        let target = target.unwrap_or(majority.len());
        if target < minority.len() {
            return Err(MlError::invalid_parameter(
                "target",
                format!("must be at least the minority size {}, got {}", minority.len(), target),
            ));
        }
        let n_synthetic = target - minority.len();
        let minority_label = y.data()[minority[0]];
        let k = self.k_neighbors.min(minority.len() - 1);
        let neighbours = nearest_neighbours(x, &minority, k)?;

        let cols = x.ncols()?;
        let mut rng = rng_from(self.seed);
        let mut synthetic = Vec::with_capacity(n_synthetic * cols);
        for _ in 0..n_synthetic {
            let a = rng.gen_range(0..minority.len());
            let b = neighbours[a][rng.gen_range(0..k)];
            let gap = T::from_f64(rng.gen::<f64>());
            let row_a = x.row_slice(minority[a])?;
            let row_b = x.row_slice(minority[b])?;
            synthetic.extend(row_a.iter().zip(row_b).map(|(&va, &vb)| va + gap * (vb - va)));
        }

        let x_new = Tensor::new(synthetic, vec![n_synthetic, cols])?;
        let y_new = Tensor::full(vec![n_synthetic], minority_label);
        debug!(synthetic = n_synthetic, k, "generated SMOTE rows");
        Ok((Tensor::vstack(&[x, &x_new])?, Tensor::vstack(&[y, &y_new])?))
    }
}

/// For each member of `rows`, positions (into `rows`) of its `k` nearest
/// other members.
fn nearest_neighbours<T: Float>(
    x: &Tensor<T>,
    rows: &[usize],
    k: usize,
) -> MlResult<Vec<Vec<usize>>> {
    let mut result = Vec::with_capacity(rows.len());
    for (a, &ra) in rows.iter().enumerate() {
        let row_a = x.row_slice(ra)?;
        let mut dists: Vec<(f64, usize)> = Vec::with_capacity(rows.len() - 1);
        for (b, &rb) in rows.iter().enumerate() {
            if a == b {
                continue;
            }
            let d: f64 = row_a
                .iter()
                .zip(x.row_slice(rb)?)
                .map(|(&u, &v)| {
                    let diff = (u - v).to_f64();
                    diff * diff
                })
                .sum();
            dists.push((d, b));
        }
        dists.sort_by(|p, q| p.0.total_cmp(&q.0).then(p.1.cmp(&q.1)));
        result.push(dists.into_iter().take(k).map(|(_, b)| b).collect());
    }
    Ok(result)
}

/// Per-class loss weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassWeights {
    pub negative: f64,
    pub positive: f64,
}

impl Default for ClassWeights {
    fn default() -> Self {
        ClassWeights {
            negative: 1.0,
            positive: 1.0,
        }
    }
}

impl ClassWeights {
    /// Weights inversely proportional to class frequency: `n / (2 * n_c)`.
    pub fn balanced<T: Float>(y: &[T]) -> MlResult<Self> {
        let (negatives, positives) = class_indices(y)?;
        if negatives.is_empty() || positives.is_empty() {
            return Err(MlError::InvalidOperation(
                "balanced class weights need both classes present".into(),
            ));
        }
        let n = y.len() as f64;
        Ok(ClassWeights {
            negative: n / (2.0 * negatives.len() as f64),
            positive: n / (2.0 * positives.len() as f64),
        })
    }

    /// One weight per row of `y`.
    pub fn sample_weights<T: Float>(&self, y: &[T]) -> MlResult<Vec<T>> {
        y.iter()
            .enumerate()
            .map(|(i, &v)| match v.as_binary() {
                Some(true) => Ok(T::from_f64(self.positive)),
                Some(false) => Ok(T::from_f64(self.negative)),
                None => Err(MlError::NonBinaryLabel {
                    index: i,
                    value: v.to_f64(),
                }),
            })
            .collect()
    }
}
