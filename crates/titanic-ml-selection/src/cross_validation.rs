use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use titanic_ml_core::{MlError, MlResult, Tensor};
use titanic_ml_metrics::{
    binary_metrics, log_loss, nullable, predict_at_threshold, roc_auc, BinaryMetrics,
    MetricsSummary,
};
use titanic_ml_pipeline::{Classifier, ModelConfig, Pipeline};
use titanic_ml_preprocessing::{Fold, StratifiedKFold};
use tracing::{debug, info};

use crate::imbalance::ImbalanceStrategy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CvOptions {
    pub n_splits: usize,
    pub seed: Option<u64>,
    /// Probability at or above which a row is labelled positive.
    pub threshold: f64,
    pub strategy: ImbalanceStrategy,
}

impl Default for CvOptions {
    fn default() -> Self {
        CvOptions {
            n_splits: 5,
            seed: Some(42),
            threshold: 0.5,
            strategy: ImbalanceStrategy::None,
        }
    }
}

impl CvOptions {
    pub(crate) fn validate(&self) -> MlResult<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(MlError::invalid_parameter(
                "threshold",
                format!("must lie in [0, 1], got {}", self.threshold),
            ));
        }
        Ok(())
    }

    pub(crate) fn folds(&self, y: &Tensor<f64>) -> MlResult<Vec<Fold>> {
        StratifiedKFold::new(self.n_splits)
            .with_shuffle(true, self.seed)
            .split(y.data())
    }

    /// Seed for resampling and training inside fold `index`.
    pub(crate) fn fold_seed(&self, index: usize) -> Option<u64> {
        self.seed.map(|s| s.wrapping_add(index as u64 + 1))
    }
}

/// Evaluation of one held-out fold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldResult {
    pub fold: usize,
    /// Training rows after rebalancing.
    pub train_size: usize,
    pub test_size: usize,
    pub metrics: BinaryMetrics,
    #[serde(deserialize_with = "nullable::float")]
    pub auc: f64,
    #[serde(deserialize_with = "nullable::float")]
    pub log_loss: f64,
    pub test_indices: Vec<usize>,
    pub probabilities: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvReport {
    pub model: String,
    pub strategy: ImbalanceStrategy,
    pub threshold: f64,
    pub folds: Vec<FoldResult>,
    pub summary: MetricsSummary,
    #[serde(deserialize_with = "nullable::float")]
    pub mean_auc: f64,
    #[serde(deserialize_with = "nullable::float")]
    pub std_auc: f64,
}

impl CvReport {
    /// Held-out probability for every row, in original row order.
    pub fn out_of_fold_probabilities(&self) -> Vec<f64> {
        let n: usize = self.folds.iter().map(|f| f.test_size).sum();
        let mut proba = vec![f64::NAN; n];
        for fold in &self.folds {
            for (&row, &p) in fold.test_indices.iter().zip(&fold.probabilities) {
                if let Some(slot) = proba.get_mut(row) {
                    *slot = p;
                }
            }
        }
        proba
    }
}

/// Mean and sample standard deviation.
pub(crate) fn mean_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if values.len() < 2 {
        // no spread to measure, but NaN stays NaN
        return (mean, if mean.is_finite() { 0.0 } else { f64::NAN });
    }
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / (n - 1.0);
    (mean, var.sqrt())
}

pub(crate) fn check_rows(x: &Tensor<f64>, y: &Tensor<f64>) -> MlResult<usize> {
    let n = x.nrows()?;
    if n != y.numel() {
        return Err(MlError::LengthMismatch {
            observed: y.numel(),
            predicted: n,
        });
    }
    if n == 0 {
        return Err(MlError::EmptyInput);
    }
    Ok(n)
}

/// Rebalance the training rows, fit a fresh model and return it with the
/// number of rows it was trained on. A `seed` drives both the resampling and
/// the model's own randomness.
pub(crate) fn fit_fold(
    config: &ModelConfig,
    x_train: &Tensor<f64>,
    y_train: &Tensor<f64>,
    strategy: ImbalanceStrategy,
    seed: Option<u64>,
) -> MlResult<(Pipeline, usize)> {
    let train = strategy.apply(x_train, y_train, seed)?;
    let mut model = config.build();
    if let Some(s) = seed {
        model.reseed(s);
    }
    model.fit_weighted(&train.x, &train.y, &train.weights)?;
    Ok((model, train.y.numel()))
}

fn run_fold(
    config: &ModelConfig,
    x: &Tensor<f64>,
    y: &Tensor<f64>,
    fold: &Fold,
    options: &CvOptions,
) -> MlResult<FoldResult> {
    let (model, train_size) = fit_fold(
        config,
        &x.select_rows(&fold.train)?,
        &y.select_rows(&fold.train)?,
        options.strategy,
        options.fold_seed(fold.index),
    )?;

    let y_test = y.select_rows(&fold.test)?;
    let proba = model.predict_proba(&x.select_rows(&fold.test)?)?;
    let predicted = predict_at_threshold(proba.data(), options.threshold);
    let metrics = binary_metrics(y_test.data(), &predicted)?;
    let result = FoldResult {
        fold: fold.index,
        train_size,
        test_size: fold.test.len(),
        metrics,
        auc: roc_auc(y_test.data(), proba.data())?,
        log_loss: log_loss(y_test.data(), proba.data())?,
        test_indices: fold.test.clone(),
        probabilities: proba.into_data(),
    };
    debug!(fold = fold.index, accuracy = metrics.accuracy, auc = result.auc, "fold evaluated");
    Ok(result)
}

/// Stratified k-fold cross-validation of `config`.
///
/// Folds run in parallel; every fold gets a fresh model and its own seed, and
/// results are returned in fold order.
pub fn cross_validate(
    config: &ModelConfig,
    x: &Tensor<f64>,
    y: &Tensor<f64>,
    options: &CvOptions,
) -> MlResult<CvReport> {
    check_rows(x, y)?;
    options.validate()?;
    let folds = options.folds(y)?;

    let results = folds
        .par_iter()
        .map(|fold| run_fold(config, x, y, fold, options))
        .collect::<MlResult<Vec<_>>>()?;

    let trials: Vec<BinaryMetrics> = results.iter().map(|r| r.metrics).collect();
    let summary = MetricsSummary::from_trials(&trials).ok_or(MlError::EmptyInput)?;
    let aucs: Vec<f64> = results.iter().map(|r| r.auc).collect();
    let (mean_auc, std_auc) = mean_std(&aucs);

    info!(
        model = config.name(),
        strategy = %options.strategy,
        folds = results.len(),
        accuracy = summary.mean.accuracy,
        auc = mean_auc,
        "cross-validation finished"
    );

    Ok(CvReport {
        model: config.name().to_string(),
        strategy: options.strategy,
        threshold: options.threshold,
        folds: results,
        summary,
        mean_auc,
        std_auc,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use titanic_ml_datasets::make_imbalanced_classification;
    use titanic_ml_pipeline::{ForestConfig, LogisticConfig};

    #[test]
    fn test_cross_validate_logistic() {
        let (x, y) = make_imbalanced_classification(150, 3, 0.3, 3.0, Some(5)).unwrap();
        let report =
            cross_validate(&ModelConfig::default(), &x, &y, &CvOptions::default()).unwrap();

        assert_eq!(report.folds.len(), 5);
        assert_eq!(report.summary.n_trials, 5);
        for (i, fold) in report.folds.iter().enumerate() {
            assert_eq!(fold.fold, i);
            assert_eq!(fold.probabilities.len(), fold.test_size);
        }
        assert!(report.summary.mean.accuracy > 0.85);
        assert!(report.mean_auc > 0.9);

        let oof = report.out_of_fold_probabilities();
        assert_eq!(oof.len(), 150);
        assert!(oof.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn test_cross_validate_is_reproducible() {
        let (x, y) = make_imbalanced_classification(80, 2, 0.4, 2.0, Some(9)).unwrap();
        let cfg = ModelConfig::RandomForest(ForestConfig {
            n_estimators: 10,
            max_depth: 4,
            ..ForestConfig::default()
        });
        let a = cross_validate(&cfg, &x, &y, &CvOptions::default()).unwrap();
        let b = cross_validate(&cfg, &x, &y, &CvOptions::default()).unwrap();
        assert_eq!(a.out_of_fold_probabilities(), b.out_of_fold_probabilities());
    }

    #[test]
    fn test_fold_seed_reaches_the_model() {
        let (x, y) = make_imbalanced_classification(60, 3, 0.4, 1.0, Some(4)).unwrap();
        let cfg = ModelConfig::RandomForest(ForestConfig {
            n_estimators: 5,
            max_depth: 3,
            ..ForestConfig::default()
        });
        let fit = |seed| {
            let (model, _) = fit_fold(&cfg, &x, &y, ImbalanceStrategy::None, seed).unwrap();
            model.predict_proba(&x).unwrap()
        };
        assert_eq!(fit(Some(1)), fit(Some(1)));
        assert_ne!(fit(Some(1)), fit(Some(999)));
    }

    #[test]
    fn test_training_strategy_only_changes_train_rows() {
        let (x, y) = make_imbalanced_classification(100, 2, 0.2, 2.0, Some(2)).unwrap();
        let opts = CvOptions {
            strategy: ImbalanceStrategy::OverSample,
            ..CvOptions::default()
        };
        let cfg = ModelConfig::Logistic(LogisticConfig::default());
        let report = cross_validate(&cfg, &x, &y, &opts).unwrap();
        let tested: usize = report.folds.iter().map(|f| f.test_size).sum();
        assert_eq!(tested, 100);
        // 80 training rows of which 16 positive, oversampled to 64 + 64
        assert!(report.folds.iter().all(|f| f.train_size > 80));
    }

    #[test]
    fn test_invalid_options() {
        let (x, y) = make_imbalanced_classification(40, 2, 0.5, 2.0, Some(2)).unwrap();
        let bad_threshold = CvOptions { threshold: 1.5, ..CvOptions::default() };
        assert!(cross_validate(&ModelConfig::default(), &x, &y, &bad_threshold).is_err());
        let one_fold = CvOptions { n_splits: 1, ..CvOptions::default() };
        assert!(cross_validate(&ModelConfig::default(), &x, &y, &one_fold).is_err());
    }

    #[test]
    fn test_mean_std() {
        let (m, s) = mean_std(&[1.0, 2.0, 3.0]);
        assert_abs_diff_eq!(m, 2.0);
        assert_abs_diff_eq!(s, 1.0);
        assert_eq!(mean_std(&[4.0]), (4.0, 0.0));
    }
}
