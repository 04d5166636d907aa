use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use titanic_ml_core::{Float, MlError, MlResult, Tensor};

/// Row indices of the negative and positive class, in ascending order.
///
/// Fails on any label that is not 0 or 1.
pub fn class_indices<T: Float>(y: &[T]) -> MlResult<(Vec<usize>, Vec<usize>)> {
    let mut negatives = Vec::new();
    let mut positives = Vec::new();
    for (i, &v) in y.iter().enumerate() {
        match v.as_binary() {
            Some(true) => positives.push(i),
            Some(false) => negatives.push(i),
            None => {
                return Err(MlError::NonBinaryLabel {
                    index: i,
                    value: v.to_f64(),
                })
            }
        }
    }
    Ok((negatives, positives))
}

pub(crate) fn rng_from(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

fn check_rows<T: Float>(x: &Tensor<T>, y: &Tensor<T>) -> MlResult<usize> {
    let n = x.nrows()?;
    if n != y.numel() {
        return Err(MlError::LengthMismatch {
            observed: y.numel(),
            predicted: n,
        });
    }
    Ok(n)
}

fn check_ratio(test_ratio: f64) -> MlResult<()> {
    if !(test_ratio > 0.0 && test_ratio < 1.0) {
        return Err(MlError::invalid_parameter(
            "test_ratio",
            format!("must lie strictly between 0 and 1, got {}", test_ratio),
        ));
    }
    Ok(())
}

/// Feature/label pairs for training and testing.
#[derive(Debug, Clone)]
pub struct TrainTestSplit<T: Float> {
    pub x_train: Tensor<T>,
    pub x_test: Tensor<T>,
    pub y_train: Tensor<T>,
    pub y_test: Tensor<T>,
}

impl<T: Float> TrainTestSplit<T> {
    pub fn from_indices(
        x: &Tensor<T>,
        y: &Tensor<T>,
        train: &[usize],
        test: &[usize],
    ) -> MlResult<Self> {
        Ok(TrainTestSplit {
            x_train: x.select_rows(train)?,
            x_test: x.select_rows(test)?,
            y_train: y.select_rows(train)?,
            y_test: y.select_rows(test)?,
        })
    }
}

/// Shuffle rows and hold out `round(n * test_ratio)` of them for testing.
pub fn train_test_split<T: Float>(
    x: &Tensor<T>,
    y: &Tensor<T>,
    test_ratio: f64,
    seed: Option<u64>,
) -> MlResult<TrainTestSplit<T>> {
    check_ratio(test_ratio)?;
    let n = check_rows(x, y)?;

    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut rng_from(seed));

    let test_size = (n as f64 * test_ratio).round() as usize;
    let (test, train) = indices.split_at(test_size);
    TrainTestSplit::from_indices(x, y, train, test)
}

/// Like [`train_test_split`], but each class is split separately so the
/// survival rate is preserved in both parts.
pub fn stratified_train_test_split<T: Float>(
    x: &Tensor<T>,
    y: &Tensor<T>,
    test_ratio: f64,
    seed: Option<u64>,
) -> MlResult<TrainTestSplit<T>> {
    check_ratio(test_ratio)?;
    check_rows(x, y)?;
    let (negatives, positives) = class_indices(y.data())?;
    let mut rng = rng_from(seed);

    let mut train = Vec::new();
    let mut test = Vec::new();
    for mut class in [negatives, positives] {
        class.shuffle(&mut rng);
        let k = (class.len() as f64 * test_ratio).round() as usize;
        test.extend_from_slice(&class[..k]);
        train.extend_from_slice(&class[k..]);
    }
    train.shuffle(&mut rng);
    test.shuffle(&mut rng);
    TrainTestSplit::from_indices(x, y, &train, &test)
}
