use serde::{Deserialize, Serialize};
use std::fmt;
use titanic_ml_core::{MlError, MlResult, Tensor};
use titanic_ml_pipeline::ModelConfig;
use titanic_ml_preprocessing::{random_over_sample, random_under_sample, ClassWeights, Smote};
use tracing::info;

use crate::cross_validation::{cross_validate, CvOptions, CvReport};

/// How the training rows of each fold are rebalanced before fitting.
/// Test rows are never touched.
///
/// Deserialises from a bare name (`"smote"` uses 5 neighbours) or from the
/// tagged form it serialises to, `{ smote = { k_neighbors = 3 } }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "StrategyForm")]
pub enum ImbalanceStrategy {
    #[default]
    None,
    UnderSample,
    OverSample,
    Smote {
        k_neighbors: usize,
    },
    /// Keep every row but weight classes inversely to their frequency.
    ClassWeight,
}

const DEFAULT_K_NEIGHBORS: usize = 5;

fn default_k_neighbors() -> usize {
    DEFAULT_K_NEIGHBORS
}

#[derive(Deserialize)]
struct SmoteParams {
    #[serde(default = "default_k_neighbors")]
    k_neighbors: usize,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StrategyForm {
    Name(String),
    Smote { smote: SmoteParams },
}

impl TryFrom<StrategyForm> for ImbalanceStrategy {
    type Error = MlError;

    fn try_from(form: StrategyForm) -> MlResult<Self> {
        match form {
            StrategyForm::Name(name) => ImbalanceStrategy::from_name(&name),
            StrategyForm::Smote { smote } => Ok(ImbalanceStrategy::Smote {
                k_neighbors: smote.k_neighbors,
            }),
        }
    }
}

/// Training rows after rebalancing, with one weight per row.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSet {
    pub x: Tensor<f64>,
    pub y: Tensor<f64>,
    pub weights: Vec<f64>,
}

impl ImbalanceStrategy {
    /// Every strategy with default settings.
    pub fn all() -> Vec<ImbalanceStrategy> {
        vec![
            ImbalanceStrategy::None,
            ImbalanceStrategy::UnderSample,
            ImbalanceStrategy::OverSample,
            ImbalanceStrategy::Smote {
                k_neighbors: DEFAULT_K_NEIGHBORS,
            },
            ImbalanceStrategy::ClassWeight,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            ImbalanceStrategy::None => "none",
            ImbalanceStrategy::UnderSample => "under_sample",
            ImbalanceStrategy::OverSample => "over_sample",
            ImbalanceStrategy::Smote { .. } => "smote",
            ImbalanceStrategy::ClassWeight => "class_weight",
        }
    }

    pub fn from_name(name: &str) -> MlResult<Self> {
        match name {
            "none" => Ok(ImbalanceStrategy::None),
            "under_sample" | "under" => Ok(ImbalanceStrategy::UnderSample),
            "over_sample" | "over" => Ok(ImbalanceStrategy::OverSample),
            "smote" => Ok(ImbalanceStrategy::Smote {
                k_neighbors: DEFAULT_K_NEIGHBORS,
            }),
            "class_weight" => Ok(ImbalanceStrategy::ClassWeight),
            other => Err(MlError::invalid_parameter(
                "strategy",
                format!("unknown imbalance strategy '{}'", other),
            )),
        }
    }

    pub fn apply(
        &self,
        x: &Tensor<f64>,
        y: &Tensor<f64>,
        seed: Option<u64>,
    ) -> MlResult<TrainingSet> {
        let (x, y) = match *self {
            ImbalanceStrategy::None => (x.clone(), y.clone()),
            ImbalanceStrategy::UnderSample => random_under_sample(x, y, None, seed)?,
            ImbalanceStrategy::OverSample => random_over_sample(x, y, None, seed)?,
            ImbalanceStrategy::Smote { k_neighbors } => {
                Smote::new(k_neighbors, seed).fit_resample(x, y, None)?
            }
            ImbalanceStrategy::ClassWeight => {
                let weights = ClassWeights::balanced(y.data())?.sample_weights(y.data())?;
                return Ok(TrainingSet {
                    x: x.clone(),
                    y: y.clone(),
                    weights,
                });
            }
        };
        let weights = vec![1.0; y.numel()];
        Ok(TrainingSet { x, y, weights })
    }
}

impl fmt::Display for ImbalanceStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Cross-validate the same model once per strategy.
pub fn imbalance_sweep(
    config: &ModelConfig,
    x: &Tensor<f64>,
    y: &Tensor<f64>,
    options: &CvOptions,
    strategies: &[ImbalanceStrategy],
) -> MlResult<Vec<CvReport>> {
    strategies
        .iter()
        .map(|&strategy| {
            let opts = CvOptions {
                strategy,
                ..options.clone()
            };
            let report = cross_validate(config, x, y, &opts)?;
            info!(
                %strategy,
                recall = report.summary.mean.recall,
                precision = report.summary.mean.precision,
                "imbalance strategy evaluated"
            );
            Ok(report)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use titanic_ml_datasets::make_imbalanced_classification;

    fn positives(t: &TrainingSet) -> usize {
        t.y.data().iter().filter(|&&v| v == 1.0).count()
    }

    #[test]
    fn test_strategies_rebalance() {
        let (x, y) = make_imbalanced_classification(60, 2, 0.2, 3.0, Some(1)).unwrap();

        let none = ImbalanceStrategy::None.apply(&x, &y, Some(0)).unwrap();
        assert_eq!(none.y.numel(), 60);
        assert_eq!(positives(&none), 12);

        let under = ImbalanceStrategy::UnderSample.apply(&x, &y, Some(0)).unwrap();
        assert_eq!((under.y.numel(), positives(&under)), (24, 12));

        let over = ImbalanceStrategy::OverSample.apply(&x, &y, Some(0)).unwrap();
        assert_eq!((over.y.numel(), positives(&over)), (96, 48));

        let smote = ImbalanceStrategy::Smote { k_neighbors: 3 }.apply(&x, &y, Some(0)).unwrap();
        assert_eq!((smote.y.numel(), positives(&smote)), (96, 48));

        let weighted = ImbalanceStrategy::ClassWeight.apply(&x, &y, Some(0)).unwrap();
        assert_eq!(weighted.y.numel(), 60);
        let pos_weight: f64 = weighted
            .weights
            .iter()
            .zip(weighted.y.data())
            .filter(|(_, &l)| l == 1.0)
            .map(|(w, _)| w)
            .sum();
        assert!((pos_weight - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_names_roundtrip() {
        for s in ImbalanceStrategy::all() {
            assert_eq!(ImbalanceStrategy::from_name(s.name()).unwrap(), s);
        }
        assert!(ImbalanceStrategy::from_name("tomek").is_err());
    }

    #[test]
    fn test_serde_form() {
        let json = serde_json::to_string(&ImbalanceStrategy::Smote { k_neighbors: 4 }).unwrap();
        assert_eq!(json, r#"{"smote":{"k_neighbors":4}}"#);
        let back: ImbalanceStrategy = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ImbalanceStrategy::Smote { k_neighbors: 4 });
        let back: ImbalanceStrategy = serde_json::from_str("\"class_weight\"").unwrap();
        assert_eq!(back, ImbalanceStrategy::ClassWeight);
    }

    #[test]
    fn test_bare_names_deserialize() {
        let smote: ImbalanceStrategy = serde_json::from_str("\"smote\"").unwrap();
        assert_eq!(smote, ImbalanceStrategy::Smote { k_neighbors: 5 });
        let smote: ImbalanceStrategy = serde_json::from_str(r#"{"smote":{}}"#).unwrap();
        assert_eq!(smote, ImbalanceStrategy::Smote { k_neighbors: 5 });
        let err = serde_json::from_str::<ImbalanceStrategy>("\"tomek\"").unwrap_err();
        assert!(err.to_string().contains("tomek"));
    }
}
