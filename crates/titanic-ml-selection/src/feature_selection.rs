use serde::{Deserialize, Serialize};
use titanic_ml_core::{MlError, MlResult, Tensor};
use titanic_ml_pipeline::ModelConfig;
use tracing::{debug, info};

use crate::cross_validation::{check_rows, cross_validate, CvOptions};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureScore {
    pub index: usize,
    pub name: String,
    /// NaN for a constant feature.
    #[serde(deserialize_with = "titanic_ml_metrics::nullable::float")]
    pub score: f64,
}

/// Pearson correlation; NaN when either input is constant.
pub fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len()) as f64;
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;
    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (&u, &v) in a.iter().zip(b) {
        cov += (u - mean_a) * (v - mean_b);
        var_a += (u - mean_a) * (u - mean_a);
        var_b += (v - mean_b) * (v - mean_b);
    }
    if var_a == 0.0 || var_b == 0.0 {
        return f64::NAN;
    }
    cov / (var_a.sqrt() * var_b.sqrt())
}

fn check_names(x: &Tensor<f64>, names: &[String]) -> MlResult<usize> {
    let p = x.ncols()?;
    if names.len() != p {
        return Err(MlError::LengthMismatch {
            observed: p,
            predicted: names.len(),
        });
    }
    Ok(p)
}

/// Features ranked by absolute correlation with the label, strongest first.
/// Constant features score NaN and sort last.
pub fn univariate_ranking(
    x: &Tensor<f64>,
    y: &Tensor<f64>,
    names: &[String],
) -> MlResult<Vec<FeatureScore>> {
    check_rows(x, y)?;
    let p = check_names(x, names)?;
    let mut scores = (0..p)
        .map(|j| {
            Ok(FeatureScore {
                index: j,
                name: names[j].clone(),
                score: pearson(x.col(j)?.data(), y.data()).abs(),
            })
        })
        .collect::<MlResult<Vec<_>>>()?;
    scores.sort_by(|a, b| match (a.score.is_nan(), b.score.is_nan()) {
        (false, false) => b.score.total_cmp(&a.score),
        (nan_a, nan_b) => nan_a.cmp(&nan_b),
    });
    Ok(scores)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionStep {
    pub added: usize,
    pub name: String,
    #[serde(deserialize_with = "titanic_ml_metrics::nullable::float")]
    pub mean_auc: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForwardSelection {
    /// Chosen column indices in the order they were added.
    pub selected: Vec<usize>,
    pub steps: Vec<SelectionStep>,
}

impl ForwardSelection {
    pub fn best_auc(&self) -> f64 {
        self.steps.last().map_or(f64::NAN, |s| s.mean_auc)
    }

    pub fn selected_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name.as_str()).collect()
    }
}

/// Greedy forward selection: repeatedly add the feature that most improves
/// mean cross-validated ROC AUC. Stops when no candidate improves the score
/// or `max_features` columns are chosen.
pub fn forward_selection(
    config: &ModelConfig,
    x: &Tensor<f64>,
    y: &Tensor<f64>,
    names: &[String],
    options: &CvOptions,
    max_features: usize,
) -> MlResult<ForwardSelection> {
    check_rows(x, y)?;
    let p = check_names(x, names)?;
    if max_features == 0 {
        return Err(MlError::invalid_parameter("max_features", "must be at least 1"));
    }

    let mut selected: Vec<usize> = Vec::new();
    let mut steps: Vec<SelectionStep> = Vec::new();
    let mut best_auc = f64::NEG_INFINITY;

    while selected.len() < max_features.min(p) {
        let mut round_best: Option<(usize, f64)> = None;
        for candidate in (0..p).filter(|j| !selected.contains(j)) {
            let mut columns = selected.clone();
            columns.push(candidate);
            let auc = cross_validate(config, &x.select_cols(&columns)?, y, options)?.mean_auc;
            debug!(feature = %names[candidate], auc, "candidate scored");
            if !auc.is_nan() && round_best.map_or(true, |(_, b)| auc > b) {
                round_best = Some((candidate, auc));
            }
        }

        match round_best {
            Some((feature, auc)) if auc > best_auc => {
                best_auc = auc;
                selected.push(feature);
                info!(feature = %names[feature], auc, n_selected = selected.len(), "feature added");
                steps.push(SelectionStep {
                    added: feature,
                    name: names[feature].clone(),
                    mean_auc: auc,
                });
            }
            _ => break,
        }
    }

    Ok(ForwardSelection { selected, steps })
}
