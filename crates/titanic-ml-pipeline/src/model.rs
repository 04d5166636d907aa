use serde::{Deserialize, Serialize};
use titanic_ml_core::{MlError, MlResult};
use titanic_ml_linear::LogisticRegression;
use titanic_ml_nn::MlpClassifier;
use titanic_ml_preprocessing::StandardScaler;
use titanic_ml_tree::RandomForestClassifier;

use crate::bagging::BaggingClassifier;
use crate::pipeline::Pipeline;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogisticConfig {
    pub learning_rate: f64,
    pub max_iter: usize,
    /// Inverse L2 strength; absent means unregularised.
    pub c: Option<f64>,
}

impl Default for LogisticConfig {
    fn default() -> Self {
        LogisticConfig {
            learning_rate: 0.1,
            max_iter: 1000,
            c: Some(1.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    pub max_features_ratio: f64,
    pub seed: Option<u64>,
}

impl Default for ForestConfig {
    fn default() -> Self {
        ForestConfig {
            n_estimators: 100,
            max_depth: 8,
            min_samples_leaf: 1,
            max_features_ratio: 0.5,
            seed: Some(42),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MlpConfig {
    pub hidden_layers: Vec<usize>,
    pub learning_rate: f64,
    pub epochs: usize,
    pub batch_size: usize,
    pub alpha: f64,
    pub seed: u64,
}

impl Default for MlpConfig {
    fn default() -> Self {
        MlpConfig {
            hidden_layers: vec![16, 8],
            learning_rate: 1e-3,
            epochs: 200,
            batch_size: 32,
            alpha: 1e-4,
            seed: 42,
        }
    }
}

impl MlpConfig {
    fn build(&self) -> MlpClassifier {
        MlpClassifier::new(self.hidden_layers.clone())
            .with_learning_rate(self.learning_rate)
            .with_epochs(self.epochs)
            .with_batch_size(self.batch_size)
            .with_alpha(self.alpha)
            .with_seed(self.seed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaggingMlpConfig {
    pub n_estimators: usize,
    pub max_samples: f64,
    pub seed: Option<u64>,
    pub mlp: MlpConfig,
}

impl Default for BaggingMlpConfig {
    fn default() -> Self {
        BaggingMlpConfig {
            n_estimators: 10,
            max_samples: 1.0,
            seed: Some(42),
            mlp: MlpConfig::default(),
        }
    }
}

/// Which model to train, with its hyper-parameters. Deserialises from a
/// tagged table, e.g. `{ kind = "random_forest", n_estimators = 200 }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelConfig {
    Logistic(LogisticConfig),
    RandomForest(ForestConfig),
    Mlp(MlpConfig),
    BaggingMlp(BaggingMlpConfig),
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig::Logistic(LogisticConfig::default())
    }
}

impl ModelConfig {
    pub fn name(&self) -> &'static str {
        match self {
            ModelConfig::Logistic(_) => "logistic",
            ModelConfig::RandomForest(_) => "random_forest",
            ModelConfig::Mlp(_) => "mlp",
            ModelConfig::BaggingMlp(_) => "bagging_mlp",
        }
    }

    /// Parse a model name with default hyper-parameters.
    pub fn from_name(name: &str) -> MlResult<Self> {
        match name {
            "logistic" => Ok(ModelConfig::Logistic(LogisticConfig::default())),
            "random_forest" | "rf" => Ok(ModelConfig::RandomForest(ForestConfig::default())),
            "mlp" => Ok(ModelConfig::Mlp(MlpConfig::default())),
            "bagging_mlp" => Ok(ModelConfig::BaggingMlp(BaggingMlpConfig::default())),
            other => Err(MlError::invalid_parameter(
                "model",
                format!(
                    "unknown model '{}' (expected logistic, random_forest, mlp or bagging_mlp)",
                    other
                ),
            )),
        }
    }

    /// Fresh, unfitted pipeline. Gradient-trained models are preceded by a
    /// standard scaler; the forest sees raw features.
    pub fn build(&self) -> Pipeline {
        match self {
            ModelConfig::Logistic(c) => {
                let mut model = LogisticRegression::new(c.learning_rate, c.max_iter);
                if let Some(strength) = c.c {
                    model = model.with_c(strength);
                }
                Pipeline::new()
                    .add_transformer(Box::new(StandardScaler::<f64>::new()))
                    .set_classifier(Box::new(model))
            }
            ModelConfig::RandomForest(c) => {
                let mut forest = RandomForestClassifier::<f64>::new(
                    c.n_estimators,
                    c.max_depth,
                    c.max_features_ratio,
                );
                forest.min_samples_leaf = c.min_samples_leaf;
                forest.seed = c.seed;
                Pipeline::new().set_classifier(Box::new(forest))
            }
            ModelConfig::Mlp(c) => Pipeline::new()
                .add_transformer(Box::new(StandardScaler::<f64>::new()))
                .set_classifier(Box::new(c.build())),
            ModelConfig::BaggingMlp(c) => {
                let bag = BaggingClassifier::new(Box::new(c.mlp.build()), c.n_estimators)
                    .with_max_samples(c.max_samples)
                    .with_seed(c.seed);
                Pipeline::new()
                    .add_transformer(Box::new(StandardScaler::<f64>::new()))
                    .set_classifier(Box::new(bag))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::Classifier;
    use titanic_ml_core::Tensor;

    #[test]
    fn test_config_from_toml() {
        let cfg: ModelConfig =
            toml::from_str("kind = \"random_forest\"\nn_estimators = 25\n").unwrap();
        match &cfg {
            ModelConfig::RandomForest(f) => {
                assert_eq!(f.n_estimators, 25);
                assert_eq!(f.max_depth, ForestConfig::default().max_depth);
            }
            other => panic!("unexpected config {:?}", other),
        }
        assert_eq!(cfg.name(), "random_forest");
    }

    #[test]
    fn test_config_json_roundtrip() {
        let cfg = ModelConfig::BaggingMlp(BaggingMlpConfig::default());
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(json.contains("\"kind\":\"bagging_mlp\""));
        let back: ModelConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn test_from_name() {
        assert_eq!(ModelConfig::from_name("mlp").unwrap().name(), "mlp");
        assert!(ModelConfig::from_name("svm").is_err());
    }

    #[test]
    fn test_build_every_model() {
        let rows: Vec<Vec<f64>> = (0..12).map(|i| vec![i as f64, (i % 3) as f64]).collect();
        let x = Tensor::from_vec2d(&rows).unwrap();
        let y = Tensor::from_vec((0..12).map(|i| if i >= 6 { 1.0 } else { 0.0 }).collect());
        let small_mlp = MlpConfig { epochs: 3, hidden_layers: vec![4], ..MlpConfig::default() };
        let configs = vec![
            ModelConfig::default(),
            ModelConfig::RandomForest(ForestConfig { n_estimators: 5, ..ForestConfig::default() }),
            ModelConfig::Mlp(small_mlp.clone()),
            ModelConfig::BaggingMlp(BaggingMlpConfig {
                n_estimators: 2,
                mlp: small_mlp,
                ..BaggingMlpConfig::default()
            }),
        ];
        for cfg in configs {
            let mut model = cfg.build();
            model.fit(&x, &y).unwrap();
            let proba = model.predict_proba(&x).unwrap();
            assert_eq!(proba.numel(), 12);
            assert!(proba.data().iter().all(|p| (0.0..=1.0).contains(p)));
        }
    }
}
