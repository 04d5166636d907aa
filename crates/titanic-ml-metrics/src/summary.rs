use serde::{Deserialize, Serialize};

use crate::binary::BinaryMetrics;

/// Mean and sample standard deviation of each metric over repeated trials.
///
/// NaN in any trial propagates into that metric's mean and deviation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub n_trials: usize,
    pub mean: BinaryMetrics,
    pub std: BinaryMetrics,
}

impl MetricsSummary {
    /// Returns `None` when `trials` is empty.
    pub fn from_trials(trials: &[BinaryMetrics]) -> Option<Self> {
        if trials.is_empty() {
            return None;
        }
        let n = trials.len() as f64;

        let mut mean = [0.0; BinaryMetrics::FIELD_COUNT];
        for t in trials {
            for (m, v) in mean.iter_mut().zip(t.values()) {
                *m += v;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let mut std = [0.0; BinaryMetrics::FIELD_COUNT];
        if trials.len() > 1 {
            for t in trials {
                for ((s, v), m) in std.iter_mut().zip(t.values()).zip(mean) {
                    *s += (v - m) * (v - m);
                }
            }
            std.iter_mut().for_each(|s| *s = (*s / (n - 1.0)).sqrt());
        } else {
            // a single trial has no spread, but NaN inputs stay NaN
            for (s, m) in std.iter_mut().zip(mean) {
                *s = m - m;
            }
        }

        Some(MetricsSummary {
            n_trials: trials.len(),
            mean: BinaryMetrics::from_values(mean),
            std: BinaryMetrics::from_values(std),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::binary_metrics;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_mean_and_std() {
        let a = binary_metrics(&[1.0, 0.0], &[1.0, 0.0]).unwrap();
        let b = binary_metrics(&[1.0, 0.0], &[0.0, 0.0]).unwrap();
        let s = MetricsSummary::from_trials(&[a, b]).unwrap();
        assert_eq!(s.n_trials, 2);
        assert_abs_diff_eq!(s.mean.accuracy, 0.75, epsilon = 1e-12);
        // accuracies 1.0 and 0.5 → sample std = 0.5 / sqrt(2)
        assert_abs_diff_eq!(s.std.accuracy, 0.5 / 2f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_nan_propagates() {
        let a = binary_metrics(&[0.0, 0.0], &[0.0, 0.0]).unwrap();
        let b = binary_metrics(&[1.0, 0.0], &[1.0, 0.0]).unwrap();
        let s = MetricsSummary::from_trials(&[a, b]).unwrap();
        assert!(s.mean.recall.is_nan());
        assert_eq!(s.mean.accuracy, 1.0);
        assert_eq!(s.std.accuracy, 0.0);
    }

    #[test]
    fn test_single_and_empty() {
        assert!(MetricsSummary::from_trials(&[]).is_none());
        let a = binary_metrics(&[1.0, 0.0], &[1.0, 1.0]).unwrap();
        let s = MetricsSummary::from_trials(&[a]).unwrap();
        assert_eq!(s.std.accuracy, 0.0);
        assert_eq!(s.mean.accuracy, a.accuracy);
        // 0/0 negative likelihood stays undefined
        assert!(s.mean.negative_likelihood.is_nan());
    }
}
