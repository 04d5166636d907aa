use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use titanic_ml_core::{MlError, MlResult, Tensor};
use titanic_ml_metrics::{
    binary_metrics, predict_at_threshold, roc_auc, BinaryMetrics, MetricsSummary,
};
use titanic_ml_pipeline::{Classifier, ModelConfig};
use tracing::info;

use crate::cross_validation::{check_rows, fit_fold, mean_std, CvOptions};

/// Train and held-out performance at one training-set size, averaged over
/// folds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningCurvePoint {
    pub train_fraction: f64,
    /// Mean number of (pre-resampling) training rows per fold.
    pub train_size: f64,
    pub train: MetricsSummary,
    pub test: MetricsSummary,
    #[serde(deserialize_with = "titanic_ml_metrics::nullable::float")]
    pub test_auc: f64,
}

/// Stratified subsample: `ceil(fraction × class size)` rows of each class.
fn subsample(rows: &[usize], y: &Tensor<f64>, fraction: f64, rng: &mut StdRng) -> Vec<usize> {
    let (mut pos, mut neg): (Vec<usize>, Vec<usize>) =
        rows.iter().copied().partition(|&i| y.data()[i] == 1.0);
    pos.shuffle(rng);
    neg.shuffle(rng);
    let take = |n: usize| ((n as f64 * fraction).ceil() as usize).clamp(n.min(1), n);
    pos.truncate(take(pos.len()));
    neg.truncate(take(neg.len()));
    let mut out = pos;
    out.extend(neg);
    out.sort_unstable();
    out
}

/// Cross-validated metrics for growing fractions of each training fold.
///
/// Test folds stay whole; only the training rows are subsampled (stratified)
/// before the imbalance strategy is applied.
pub fn learning_curve(
    config: &ModelConfig,
    x: &Tensor<f64>,
    y: &Tensor<f64>,
    fractions: &[f64],
    options: &CvOptions,
) -> MlResult<Vec<LearningCurvePoint>> {
    check_rows(x, y)?;
    options.validate()?;
    if let Some(&bad) = fractions.iter().find(|f| !(**f > 0.0 && **f <= 1.0)) {
        return Err(MlError::invalid_parameter(
            "fractions",
            format!("must lie in (0, 1], got {}", bad),
        ));
    }
    let folds = options.folds(y)?;

    fractions
        .iter()
        .map(|&fraction| {
            let per_fold = folds
                .par_iter()
                .map(|fold| {
                    let seed = options.fold_seed(fold.index);
                    let mut rng = StdRng::seed_from_u64(seed.unwrap_or(0));
                    let rows = subsample(&fold.train, y, fraction, &mut rng);
                    let x_train = x.select_rows(&rows)?;
                    let y_train = y.select_rows(&rows)?;
                    let (model, _) = fit_fold(config, &x_train, &y_train, options.strategy, seed)?;

                    let train_proba = model.predict_proba(&x_train)?;
                    let train_pred = predict_at_threshold(train_proba.data(), options.threshold);
                    let train_metrics = binary_metrics(y_train.data(), &train_pred)?;

                    let y_test = y.select_rows(&fold.test)?;
                    let proba = model.predict_proba(&x.select_rows(&fold.test)?)?;
                    let test_pred = predict_at_threshold(proba.data(), options.threshold);
                    let test_metrics = binary_metrics(y_test.data(), &test_pred)?;
                    let auc = roc_auc(y_test.data(), proba.data())?;
                    Ok((rows.len(), train_metrics, test_metrics, auc))
                })
                .collect::<MlResult<Vec<(usize, BinaryMetrics, BinaryMetrics, f64)>>>()?;

            let train: Vec<BinaryMetrics> = per_fold.iter().map(|r| r.1).collect();
            let test: Vec<BinaryMetrics> = per_fold.iter().map(|r| r.2).collect();
            let aucs: Vec<f64> = per_fold.iter().map(|r| r.3).collect();
            let train_size =
                per_fold.iter().map(|r| r.0 as f64).sum::<f64>() / per_fold.len() as f64;

            let point = LearningCurvePoint {
                train_fraction: fraction,
                train_size,
                train: MetricsSummary::from_trials(&train).ok_or(MlError::EmptyInput)?,
                test: MetricsSummary::from_trials(&test).ok_or(MlError::EmptyInput)?,
                test_auc: mean_std(&aucs).0,
            };
            info!(
                fraction,
                train_size,
                train_accuracy = point.train.mean.accuracy,
                test_accuracy = point.test.mean.accuracy,
                "learning curve point"
            );
            Ok(point)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use titanic_ml_datasets::make_imbalanced_classification;
    use titanic_ml_pipeline::ForestConfig;

    #[test]
    fn test_subsample_is_stratified() {
        let y = Tensor::from_vec(vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let rows: Vec<usize> = (0..10).collect();
        let mut rng = StdRng::seed_from_u64(0);
        let half = subsample(&rows, &y, 0.5, &mut rng);
        // ceil(0.5 * 2) positives and ceil(0.5 * 8) negatives
        assert_eq!(half.len(), 5);
        assert_eq!(half.iter().filter(|&&i| y.data()[i] == 1.0).count(), 1);
        // tiny fractions still keep one row of each class
        let tiny = subsample(&rows, &y, 0.01, &mut rng);
        assert_eq!(tiny.len(), 2);
    }

    #[test]
    fn test_learning_curve_grows_training_set() {
        let (x, y) = make_imbalanced_classification(100, 2, 0.4, 2.5, Some(8)).unwrap();
        let cfg = ModelConfig::RandomForest(ForestConfig {
            n_estimators: 10,
            ..ForestConfig::default()
        });
        let curve = learning_curve(&cfg, &x, &y, &[0.2, 0.6, 1.0], &CvOptions::default()).unwrap();
        assert_eq!(curve.len(), 3);
        assert!(curve[0].train_size < curve[1].train_size);
        assert!(curve[1].train_size < curve[2].train_size);
        assert_eq!(curve[2].train_size, 80.0);
        for point in &curve {
            assert_eq!(point.test.n_trials, 5);
            assert!(point.train.mean.accuracy >= 0.5);
        }
    }

    #[test]
    fn test_invalid_fraction() {
        let (x, y) = make_imbalanced_classification(40, 2, 0.5, 2.0, Some(1)).unwrap();
        let cfg = ModelConfig::default();
        assert!(learning_curve(&cfg, &x, &y, &[0.0], &CvOptions::default()).is_err());
    }
}
