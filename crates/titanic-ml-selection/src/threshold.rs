use serde::{Deserialize, Serialize};
use titanic_ml_core::{MlError, MlResult, Tensor};
use titanic_ml_metrics::{nullable, roc_curve, threshold_sweep, RocCurve, ThresholdPoint};

use crate::cross_validation::CvReport;

/// Metrics at each cutoff, computed on the pooled out-of-fold probabilities
/// of a cross-validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdAnalysis {
    pub points: Vec<ThresholdPoint>,
    pub roc: RocCurve,
    #[serde(deserialize_with = "nullable::float")]
    pub auc: f64,
}

impl ThresholdAnalysis {
    /// The cutoff maximising metric `name` (NaN values never win). `None` for
    /// an unknown metric or when every value is NaN.
    pub fn best_by(&self, name: &str) -> Option<&ThresholdPoint> {
        self.points
            .iter()
            .filter_map(|p| p.metrics.get(name).filter(|v| !v.is_nan()).map(|v| (v, p)))
            .fold(None, |best: Option<(f64, &ThresholdPoint)>, (v, p)| match best {
                Some((bv, _)) if bv >= v => best,
                _ => Some((v, p)),
            })
            .map(|(_, p)| p)
    }
}

/// Sweep `thresholds` over the out-of-fold probabilities in `report`.
/// `y` must be the label vector the report was produced from.
pub fn threshold_analysis(
    report: &CvReport,
    y: &Tensor<f64>,
    thresholds: &[f64],
) -> MlResult<ThresholdAnalysis> {
    let proba = report.out_of_fold_probabilities();
    if proba.len() != y.numel() {
        return Err(MlError::LengthMismatch {
            observed: y.numel(),
            predicted: proba.len(),
        });
    }
    if let Some(&bad) = thresholds.iter().find(|t| !(0.0..=1.0).contains(*t)) {
        return Err(MlError::invalid_parameter(
            "thresholds",
            format!("cutoffs must lie in [0, 1], got {}", bad),
        ));
    }
    let roc = roc_curve(y.data(), &proba)?;
    Ok(ThresholdAnalysis {
        points: threshold_sweep(y.data(), &proba, thresholds)?,
        auc: roc.auc(),
        roc,
    })
}
