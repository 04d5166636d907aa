//! Experiment configuration (`titanic-ml.toml`).
//!
//! ```toml
//! [data]
//! path = "train.csv"
//! label = "Survived"
//! drop = ["PassengerId", "Name", "Ticket", "Cabin"]
//! one_hot = ["Sex", "Embarked"]
//! impute_median = ["Age"]
//!
//! [model]
//! kind = "random_forest"
//! n_estimators = 200
//!
//! [cv]
//! n_splits = 5
//! threshold = 0.5
//! strategy = "class_weight"
//! ```
//!
//! `strategy = "smote"` uses five neighbours; set them with
//! `strategy = { smote = { k_neighbors = 3 } }`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use titanic_ml::pipeline::ModelConfig;
use titanic_ml::selection::CvOptions;

/// How to turn the raw passenger CSV into a numeric feature matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub path: Option<PathBuf>,
    pub label: String,
    pub drop: Vec<String>,
    pub one_hot: Vec<String>,
    pub impute_median: Vec<String>,
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            path: None,
            label: "Survived".to_string(),
            drop: Vec::new(),
            one_hot: Vec::new(),
            impute_median: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub data: DataConfig,
    pub model: ModelConfig,
    pub cv: CvOptions,
}

impl ExperimentConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: ExperimentConfig =
            toml::from_str(&text).with_context(|| format!("Invalid config {}", path.display()))?;
        debug!(path = %path.display(), model = config.model.name(), "loaded experiment config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use titanic_ml::selection::ImbalanceStrategy;

    #[test]
    fn test_full_config() {
        let text = r#"
[data]
path = "train.csv"
drop = ["PassengerId", "Name"]
one_hot = ["Sex"]
impute_median = ["Age"]

[model]
kind = "mlp"
hidden_layers = [8]

[cv]
n_splits = 10
strategy = { smote = { k_neighbors = 3 } }
"#;
        let cfg: ExperimentConfig = toml::from_str(text).unwrap();
        assert_eq!(cfg.data.label, "Survived");
        assert_eq!(cfg.data.drop, vec!["PassengerId", "Name"]);
        assert_eq!(cfg.model.name(), "mlp");
        assert_eq!(cfg.cv.n_splits, 10);
        assert_eq!(cfg.cv.threshold, 0.5);
        assert_eq!(cfg.cv.strategy, ImbalanceStrategy::Smote { k_neighbors: 3 });
    }

    #[test]
    fn test_strategy_by_name() {
        let cfg: ExperimentConfig = toml::from_str("[cv]\nstrategy = \"smote\"\n").unwrap();
        assert_eq!(cfg.cv.strategy, ImbalanceStrategy::Smote { k_neighbors: 5 });
        assert!(toml::from_str::<ExperimentConfig>("[cv]\nstrategy = \"tomek\"\n").is_err());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let cfg: ExperimentConfig = toml::from_str("").unwrap();
        assert_eq!(cfg, ExperimentConfig::default());
    }

    #[test]
    fn test_load_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[cv]\nn_splits = \"five\"\n").unwrap();
        let err = ExperimentConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("bad.toml"));
    }
}
