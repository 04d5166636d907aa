//! Binary classification accuracy statistics.
//!
//! Every ratio is plain IEEE division over the confusion counts: a zero
//! denominator yields `NaN` (0/0) or `±inf` (x/0) instead of an error, so
//! degenerate trials (a fold with no survivors, a cutoff that predicts
//! nobody survives) still produce a full record that can be aggregated.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use titanic_ml_core::{Float, MlError, MlResult, Tensor};

/// True/false positive/negative counts over paired observed and predicted labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConfusionCounts {
    pub true_positives: usize,
    pub false_positives: usize,
    pub true_negatives: usize,
    pub false_negatives: usize,
}

impl ConfusionCounts {
    /// Tally label pairs.
    ///
    /// Both sequences must be non-empty, of equal length, and contain only
    /// 0 or 1.
    pub fn from_labels<T: Float>(observed: &[T], predicted: &[T]) -> MlResult<Self> {
        if observed.len() != predicted.len() {
            return Err(MlError::LengthMismatch {
                observed: observed.len(),
                predicted: predicted.len(),
            });
        }
        if observed.is_empty() {
            return Err(MlError::EmptyInput);
        }

        let mut counts = ConfusionCounts::default();
        for (i, (&o, &p)) in observed.iter().zip(predicted).enumerate() {
            let o = o.as_binary().ok_or(MlError::NonBinaryLabel {
                index: i,
                value: o.to_f64(),
            })?;
            let p = p.as_binary().ok_or(MlError::NonBinaryLabel {
                index: i,
                value: p.to_f64(),
            })?;
            match (o, p) {
                (true, true) => counts.true_positives += 1,
                (false, true) => counts.false_positives += 1,
                (false, false) => counts.true_negatives += 1,
                (true, false) => counts.false_negatives += 1,
            }
        }
        Ok(counts)
    }

    pub fn total(&self) -> usize {
        self.true_positives + self.false_positives + self.true_negatives + self.false_negatives
    }

    pub fn observed_positives(&self) -> usize {
        self.true_positives + self.false_negatives
    }

    pub fn observed_negatives(&self) -> usize {
        self.true_negatives + self.false_positives
    }

    pub fn predicted_positives(&self) -> usize {
        self.true_positives + self.false_positives
    }

    pub fn predicted_negatives(&self) -> usize {
        self.true_negatives + self.false_negatives
    }

    /// Derive the full metric record.
    pub fn metrics(&self) -> BinaryMetrics {
        let tp = self.true_positives as f64;
        let fp = self.false_positives as f64;
        let tn = self.true_negatives as f64;
        let fn_ = self.false_negatives as f64;
        let n = self.total() as f64;
        let observed_positives = self.observed_positives() as f64;
        let observed_negatives = self.observed_negatives() as f64;

        let observed_positive_rate = observed_positives / n;
        let observed_negative_rate = observed_negatives / n;
        let predicted_positive_rate = self.predicted_positives() as f64 / n;
        let predicted_negative_rate = self.predicted_negatives() as f64 / n;

        let accuracy = (tp + tn) / n;
        let precision = tp / (tp + fp);
        let recall = tp / (tp + fn_);
        let specificity = tn / (tn + fp);
        let f1 = 2.0 * precision * recall / (precision + recall);
        // predictive values are taken over the observed classes
        let positive_predictive_value = tp / observed_positives;
        let negative_predictive_value = tn / observed_negatives;

        BinaryMetrics {
            observed_positive_rate,
            observed_negative_rate,
            predicted_positive_rate,
            predicted_negative_rate,
            accuracy,
            precision,
            recall,
            f1,
            sensitivity: recall,
            specificity,
            positive_likelihood: recall / (1.0 - specificity),
            negative_likelihood: (1.0 - recall) / specificity,
            false_positive_rate: 1.0 - specificity,
            false_negative_rate: 1.0 - recall,
            true_positive_rate: recall,
            true_negative_rate: specificity,
            positive_predictive_value,
            negative_predictive_value,
        }
    }
}

/// Accuracy statistics for one binary classification trial.
///
/// JSON has no NaN or infinity; serde_json writes them as `null`, which
/// deserialises back as NaN.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BinaryMetrics {
    pub observed_positive_rate: f64,
    pub observed_negative_rate: f64,
    pub predicted_positive_rate: f64,
    pub predicted_negative_rate: f64,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub sensitivity: f64,
    pub specificity: f64,
    pub positive_likelihood: f64,
    pub negative_likelihood: f64,
    pub false_positive_rate: f64,
    pub false_negative_rate: f64,
    pub true_positive_rate: f64,
    pub true_negative_rate: f64,
    pub positive_predictive_value: f64,
    pub negative_predictive_value: f64,
}

impl BinaryMetrics {
    pub const FIELD_COUNT: usize = 18;

    /// Metric names in the order used by [`BinaryMetrics::values`].
    pub const FIELD_NAMES: [&'static str; Self::FIELD_COUNT] = [
        "observed_positive_rate",
        "observed_negative_rate",
        "predicted_positive_rate",
        "predicted_negative_rate",
        "accuracy",
        "precision",
        "recall",
        "f1",
        "sensitivity",
        "specificity",
        "positive_likelihood",
        "negative_likelihood",
        "false_positive_rate",
        "false_negative_rate",
        "true_positive_rate",
        "true_negative_rate",
        "positive_predictive_value",
        "negative_predictive_value",
    ];

    pub fn values(&self) -> [f64; Self::FIELD_COUNT] {
        [
            self.observed_positive_rate,
            self.observed_negative_rate,
            self.predicted_positive_rate,
            self.predicted_negative_rate,
            self.accuracy,
            self.precision,
            self.recall,
            self.f1,
            self.sensitivity,
            self.specificity,
            self.positive_likelihood,
            self.negative_likelihood,
            self.false_positive_rate,
            self.false_negative_rate,
            self.true_positive_rate,
            self.true_negative_rate,
            self.positive_predictive_value,
            self.negative_predictive_value,
        ]
    }

    pub fn from_values(v: [f64; Self::FIELD_COUNT]) -> Self {
        BinaryMetrics {
            observed_positive_rate: v[0],
            observed_negative_rate: v[1],
            predicted_positive_rate: v[2],
            predicted_negative_rate: v[3],
            accuracy: v[4],
            precision: v[5],
            recall: v[6],
            f1: v[7],
            sensitivity: v[8],
            specificity: v[9],
            positive_likelihood: v[10],
            negative_likelihood: v[11],
            false_positive_rate: v[12],
            false_negative_rate: v[13],
            true_positive_rate: v[14],
            true_negative_rate: v[15],
            positive_predictive_value: v[16],
            negative_predictive_value: v[17],
        }
    }

    /// `(name, value)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> {
        Self::FIELD_NAMES.into_iter().zip(self.values())
    }

    /// Look up a metric by its field name.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }
}

impl<'de> Deserialize<'de> for BinaryMetrics {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = BTreeMap::<String, Option<f64>>::deserialize(deserializer)?;
        let mut values = [f64::NAN; Self::FIELD_COUNT];
        for (slot, name) in values.iter_mut().zip(Self::FIELD_NAMES) {
            match map.get(name) {
                Some(v) => *slot = v.unwrap_or(f64::NAN),
                None => return Err(D::Error::missing_field(name)),
            }
        }
        Ok(Self::from_values(values))
    }
}

/// Compute [`BinaryMetrics`] from observed and predicted labels.
pub fn binary_metrics<T: Float>(observed: &[T], predicted: &[T]) -> MlResult<BinaryMetrics> {
    Ok(ConfusionCounts::from_labels(observed, predicted)?.metrics())
}

/// [`binary_metrics`] over 1-D tensors.
pub fn binary_metrics_tensor<T: Float>(
    observed: &Tensor<T>,
    predicted: &Tensor<T>,
) -> MlResult<BinaryMetrics> {
    binary_metrics(observed.data(), predicted.data())
}

/// Map probabilities to labels: `p >= threshold` is positive.
pub fn predict_at_threshold<T: Float>(probabilities: &[T], threshold: T) -> Vec<T> {
    probabilities
        .iter()
        .map(|&p| if p >= threshold { T::ONE } else { T::ZERO })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_worked_example() {
        let observed = [1.0, 1.0, 0.0, 0.0, 1.0];
        let predicted = [1.0, 0.0, 0.0, 1.0, 1.0];

        let counts = ConfusionCounts::from_labels(&observed, &predicted).unwrap();
        assert_eq!(counts.true_positives, 2);
        assert_eq!(counts.false_positives, 1);
        assert_eq!(counts.false_negatives, 1);
        assert_eq!(counts.true_negatives, 1);

        let m = counts.metrics();
        assert_abs_diff_eq!(m.accuracy, 0.6, epsilon = 1e-12);
        assert_abs_diff_eq!(m.precision, 2.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(m.recall, 2.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(m.specificity, 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(m.f1, 2.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(m.negative_predictive_value, 0.5, epsilon = 1e-12);
        // 2/3 / 0.5 and (1/3) / 0.5
        assert_abs_diff_eq!(m.positive_likelihood, 4.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(m.negative_likelihood, 2.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_f1_matches_definition() {
        let observed = [1.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0];
        let predicted = [1.0, 1.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0];
        let m = binary_metrics(&observed, &predicted).unwrap();
        let expected = 2.0 * m.precision * m.recall / (m.precision + m.recall);
        assert_eq!(m.f1, expected);
    }

    #[test]
    fn test_perfect_agreement() {
        let y = [0.0, 1.0, 1.0, 0.0, 1.0];
        let m = binary_metrics(&y, &y).unwrap();
        assert_eq!(m.accuracy, 1.0);
        assert_eq!(m.false_positive_rate, 0.0);
        assert_eq!(m.false_negative_rate, 0.0);
        // perfect specificity makes the positive likelihood infinite
        assert!(m.positive_likelihood.is_infinite());
    }

    #[test]
    fn test_complement_has_zero_accuracy() {
        let observed = [0.0_f32, 1.0, 1.0, 0.0];
        let predicted: Vec<f32> = observed.iter().map(|v| 1.0 - v).collect();
        let m = binary_metrics(&observed, &predicted).unwrap();
        assert_eq!(m.accuracy, 0.0);
        // precision + recall == 0
        assert!(m.f1.is_nan());
    }

    #[test]
    fn test_rates_partition() {
        let observed = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0];
        let predicted = [1.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let m = binary_metrics(&observed, &predicted).unwrap();
        assert_abs_diff_eq!(
            m.observed_positive_rate + m.observed_negative_rate,
            1.0,
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(
            m.predicted_positive_rate + m.predicted_negative_rate,
            1.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_no_observed_positives() {
        let observed = [0.0, 0.0, 0.0, 0.0];
        let predicted = [0.0, 0.0, 1.0, 0.0];
        let m = binary_metrics(&observed, &predicted).unwrap();
        assert_abs_diff_eq!(m.accuracy, 0.75, epsilon = 1e-12);
        assert_abs_diff_eq!(m.specificity, 0.75, epsilon = 1e-12);
        assert_abs_diff_eq!(m.false_positive_rate, 0.25, epsilon = 1e-12);
        assert!(m.recall.is_nan());
        assert!(m.false_negative_rate.is_nan());
    }

    #[test]
    fn test_all_negative_observed_and_predicted() {
        let y = [0.0, 0.0, 0.0];
        let m = binary_metrics(&y, &y).unwrap();
        assert!(m.recall.is_nan());
        assert!(m.precision.is_nan());
        assert!(m.positive_predictive_value.is_nan());
        assert_eq!(m.specificity, 1.0);
        assert_eq!(m.negative_predictive_value, 1.0);
    }

    #[test]
    fn test_all_negative_observed_leaves_ppv_undefined() {
        let observed = [0.0, 0.0, 0.0, 0.0];
        let predicted = [0.0, 0.0, 1.0, 0.0];
        let counts = ConfusionCounts::from_labels(&observed, &predicted).unwrap();
        assert_eq!(counts.observed_positives(), 0);
        assert_eq!(counts.observed_negatives(), 4);
        assert_eq!(counts.predicted_positives(), 1);
        assert_eq!(counts.predicted_negatives(), 3);

        let m = counts.metrics();
        assert!(m.recall.is_nan());
        assert!(m.positive_predictive_value.is_nan());
        // one false alarm: precision is 0/1, not 0/0
        assert_eq!(m.precision, 0.0);
        assert_abs_diff_eq!(m.specificity, 0.75, epsilon = 1e-12);
        assert_abs_diff_eq!(m.negative_predictive_value, 0.75, epsilon = 1e-12);
    }

    /// Every {0,1} sequence of length `n`.
    fn all_label_sequences(n: usize) -> Vec<Vec<f64>> {
        (0..1u32 << n)
            .map(|bits| (0..n).map(|i| f64::from((bits >> i) & 1)).collect())
            .collect()
    }

    #[test]
    fn test_bounds_hold_for_every_short_input() {
        let in_unit = |v: f64| v.is_nan() || (0.0..=1.0).contains(&v);
        for n in 1..=4 {
            let sequences = all_label_sequences(n);
            for observed in &sequences {
                assert_eq!(binary_metrics(observed, observed).unwrap().accuracy, 1.0);
                for predicted in &sequences {
                    let m = binary_metrics(observed, predicted).unwrap();
                    assert!((0.0..=1.0).contains(&m.accuracy), "{:?} {:?}", observed, predicted);
                    for v in [m.precision, m.recall, m.specificity, m.f1] {
                        assert!(in_unit(v), "{:?} {:?}: {}", observed, predicted, v);
                    }
                    assert_abs_diff_eq!(
                        m.observed_positive_rate + m.observed_negative_rate,
                        1.0,
                        epsilon = 1e-12
                    );
                }
            }
        }
    }

    #[test]
    fn test_no_observed_negatives() {
        let observed = [1.0, 1.0];
        let predicted = [1.0, 0.0];
        let m = binary_metrics(&observed, &predicted).unwrap();
        assert!(m.specificity.is_nan());
        assert!(m.negative_likelihood.is_nan());
        assert_abs_diff_eq!(m.recall, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(matches!(
            binary_metrics(&[1.0, 0.0], &[1.0]),
            Err(MlError::LengthMismatch { observed: 2, predicted: 1 })
        ));
        assert!(matches!(
            binary_metrics::<f64>(&[], &[]),
            Err(MlError::EmptyInput)
        ));
        assert!(matches!(
            binary_metrics(&[1.0, 2.0], &[1.0, 0.0]),
            Err(MlError::NonBinaryLabel { index: 1, .. })
        ));
    }

    #[test]
    fn test_named_lookup() {
        let m = binary_metrics(&[1.0, 0.0], &[1.0, 1.0]).unwrap();
        assert_eq!(m.get("accuracy"), Some(0.5));
        assert_eq!(m.get("nope"), None);
        assert_eq!(BinaryMetrics::from_values(m.values()).accuracy, m.accuracy);
    }

    #[test]
    fn test_tensor_input_matches_slices() {
        let observed = Tensor::from_vec(vec![1.0, 1.0, 0.0, 0.0, 1.0]);
        let predicted = Tensor::from_vec(vec![1.0, 0.0, 0.0, 1.0, 1.0]);
        let m = binary_metrics_tensor(&observed, &predicted).unwrap();
        assert_eq!(m, binary_metrics(observed.data(), predicted.data()).unwrap());
    }

    #[test]
    fn test_predict_at_threshold() {
        let p = [0.1, 0.5, 0.7, 0.49];
        assert_eq!(predict_at_threshold(&p, 0.5), vec![0.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_json_null_reads_back_as_nan() {
        // no observed positives: recall is 0/0
        let m = binary_metrics(&[0.0, 0.0, 0.0, 0.0], &[0.0, 0.0, 1.0, 0.0]).unwrap();
        let json = serde_json::to_string(&m).unwrap();
        assert!(json.contains("\"recall\":null"));
        let back: BinaryMetrics = serde_json::from_str(&json).unwrap();
        assert!(back.recall.is_nan());
        assert_eq!(back.accuracy, m.accuracy);
        assert!(serde_json::from_str::<BinaryMetrics>("{\"accuracy\":1.0}").is_err());
    }
}
