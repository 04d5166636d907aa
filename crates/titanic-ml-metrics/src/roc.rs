use serde::{Deserialize, Serialize};
use titanic_ml_core::{Float, MlError, MlResult};

use crate::binary::{binary_metrics, predict_at_threshold, BinaryMetrics};

/// Receiver operating characteristic curve.
///
/// Points are ordered by decreasing threshold. The first point sits at
/// threshold `+inf`, which is `(0, 0)` whenever both classes are present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RocCurve {
    #[serde(deserialize_with = "crate::nullable::floats")]
    pub fpr: Vec<f64>,
    #[serde(deserialize_with = "crate::nullable::floats")]
    pub tpr: Vec<f64>,
    /// The leading `+inf` reads back from JSON as NaN.
    #[serde(deserialize_with = "crate::nullable::floats")]
    pub thresholds: Vec<f64>,
}

impl RocCurve {
    /// Area under the curve by the trapezoidal rule.
    pub fn auc(&self) -> f64 {
        self.fpr
            .windows(2)
            .zip(self.tpr.windows(2))
            .map(|(f, t)| (f[1] - f[0]) * (t[1] + t[0]) / 2.0)
            .sum()
    }

    pub fn len(&self) -> usize {
        self.thresholds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.thresholds.is_empty()
    }
}

fn check_scored_labels<T: Float>(observed: &[T], scores: &[T]) -> MlResult<Vec<bool>> {
    if observed.len() != scores.len() {
        return Err(MlError::LengthMismatch {
            observed: observed.len(),
            predicted: scores.len(),
        });
    }
    if observed.is_empty() {
        return Err(MlError::EmptyInput);
    }
    if scores.iter().any(|s| s.is_nan()) {
        return Err(MlError::InvalidOperation("scores contain NaN".into()));
    }
    observed
        .iter()
        .enumerate()
        .map(|(i, &o)| {
            o.as_binary().ok_or(MlError::NonBinaryLabel {
                index: i,
                value: o.to_f64(),
            })
        })
        .collect()
}

/// Compute the ROC curve of `scores` against binary `observed` labels.
///
/// With no observed positives (or negatives) the TPR (or FPR) column is NaN.
pub fn roc_curve<T: Float>(observed: &[T], scores: &[T]) -> MlResult<RocCurve> {
    let labels = check_scored_labels(observed, scores)?;

    // (score, label) pairs sorted by score descending
    let mut pairs: Vec<(f64, bool)> = scores
        .iter()
        .map(|s| s.to_f64())
        .zip(labels.iter().copied())
        .collect();
    pairs.sort_by(|a, b| b.0.total_cmp(&a.0));

    let total_pos = labels.iter().filter(|&&l| l).count() as f64;
    let total_neg = labels.len() as f64 - total_pos;

    let mut fpr = vec![0.0 / total_neg];
    let mut tpr = vec![0.0 / total_pos];
    let mut thresholds = vec![f64::INFINITY];

    let mut tp = 0.0;
    let mut fp = 0.0;
    for (i, &(score, label)) in pairs.iter().enumerate() {
        if label {
            tp += 1.0;
        } else {
            fp += 1.0;
        }
        // emit a point only after the last sample sharing this score
        let last_of_run = pairs.get(i + 1).map_or(true, |next| next.0 != score);
        if last_of_run {
            fpr.push(fp / total_neg);
            tpr.push(tp / total_pos);
            thresholds.push(score);
        }
    }

    Ok(RocCurve {
        fpr,
        tpr,
        thresholds,
    })
}

/// ROC AUC; NaN when either class is absent from `observed`.
pub fn roc_auc<T: Float>(observed: &[T], scores: &[T]) -> MlResult<f64> {
    Ok(roc_curve(observed, scores)?.auc())
}

/// Metrics obtained at one probability cutoff.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdPoint {
    pub threshold: f64,
    pub metrics: BinaryMetrics,
}

/// Evaluate `probabilities` at every cutoff in `thresholds`.
pub fn threshold_sweep<T: Float>(
    observed: &[T],
    probabilities: &[T],
    thresholds: &[f64],
) -> MlResult<Vec<ThresholdPoint>> {
    thresholds
        .iter()
        .map(|&threshold| {
            let predicted = predict_at_threshold(probabilities, T::from_f64(threshold));
            Ok(ThresholdPoint {
                threshold,
                metrics: binary_metrics(observed, &predicted)?,
            })
        })
        .collect()
}

/// `n` evenly spaced cutoffs from 0 to 1 inclusive.
pub fn thresholds_linspace(n: usize) -> Vec<f64> {
    match n {
        0 => vec![],
        1 => vec![0.5],
        _ => (0..n).map(|i| i as f64 / (n - 1) as f64).collect(),
    }
}
